//! Fixture scheduling.
//!
//! Double round robin by the circle method: team ids are sorted ascending,
//! the first id holds the fixed slot and the rest rotate one step per round.
//! The second half mirrors the first with home and away swapped. Matchdays
//! are a week apart starting from the league's season kickoff date.

use chrono::{Duration, NaiveDate};

use crate::models::events::EventPayload;
use crate::models::fixture::{Importance, Weather};
use crate::models::{League, World};
use crate::query;
use crate::rng;

/// One league-season's `MatchScheduled` payloads, matchday by matchday.
///
/// Weather is part of the schedule (a forecastable world fact, drawn from
/// `(seed, match id, "weather")`), so the engine receives it as an input.
pub fn season_payloads(
    world: &World,
    league: &League,
    season: u32,
    kickoff: NaiveDate,
) -> Vec<EventPayload> {
    let mut team_ids = league.team_ids.clone();
    team_ids.sort();
    let rounds = build_rounds(&team_ids);

    let mut payloads = Vec::new();
    for (round_idx, round) in rounds.iter().enumerate() {
        let matchday = round_idx as u32 + 1;
        let date = kickoff + Duration::days(7 * round_idx as i64);
        for (home_id, away_id) in round {
            let match_id = format!(
                "match-s{}-{}-md{}-{}-v-{}",
                season,
                league.id.trim_start_matches("league-"),
                matchday,
                home_id.trim_start_matches("team-"),
                away_id.trim_start_matches("team-"),
            );
            let mut weather_rng = rng::derive(world.seed, &[&match_id, "weather"]);
            let weather =
                Weather::ALL[weather_rng.uniform(Weather::ALL.len() as u32) as usize];
            let importance = classify(world, league, home_id, away_id);
            payloads.push(EventPayload::MatchScheduled {
                match_id,
                league_id: league.id.clone(),
                season,
                matchday,
                home_id: home_id.clone(),
                away_id: away_id.clone(),
                date,
                weather,
                importance,
            });
        }
    }
    payloads
}

/// Circle-method rounds for the first half, then the mirrored second half.
/// For odd team counts a bye slot sits in the circle and its pairings drop.
fn build_rounds(team_ids: &[String]) -> Vec<Vec<(String, String)>> {
    let mut slots: Vec<Option<&String>> = team_ids.iter().map(Some).collect();
    if slots.len() % 2 == 1 {
        slots.push(None);
    }
    let n = slots.len();
    if n < 2 {
        return Vec::new();
    }

    let mut first_half = Vec::with_capacity(n - 1);
    for round in 0..n - 1 {
        let mut pairs = Vec::with_capacity(n / 2);
        for k in 0..n / 2 {
            let a = slots[k];
            let b = slots[n - 1 - k];
            let (Some(a), Some(b)) = (a, b) else { continue };
            // Alternate the anchor pairing so the fixed team is not always
            // at home; the same parity rule settles every other pair.
            if (round + k) % 2 == 0 {
                pairs.push((a.clone(), b.clone()));
            } else {
                pairs.push((b.clone(), a.clone()));
            }
        }
        first_half.push(pairs);
        // Rotate everything but the fixed first slot.
        slots[1..].rotate_right(1);
    }

    let mut rounds = first_half.clone();
    for round in &first_half {
        rounds.push(round.iter().map(|(h, a)| (a.clone(), h.clone())).collect());
    }
    rounds
}

/// Pure billing classification over the current table and rivalry config.
/// Evaluated at scheduling time for the stored fixture and re-evaluated by
/// the orchestrator on matchday for atmosphere.
pub fn classify(world: &World, league: &League, home_id: &str, away_id: &str) -> Importance {
    if league.is_rivalry(home_id, away_id) {
        return Importance::Derby;
    }
    let table = match query::league_table(world, &league.id) {
        Ok(table) => table,
        Err(_) => return Importance::Normal,
    };
    if table.len() < 6 {
        return Importance::Normal;
    }
    let pos = |id: &str| table.iter().position(|row| row.team_id == id);
    let (Some(home_pos), Some(away_pos)) = (pos(home_id), pos(away_id)) else {
        return Importance::Normal;
    };
    let played = table.iter().any(|row| row.played > 0);
    if played {
        let top3 = home_pos < 3 && away_pos < 3;
        let gap = (table[home_pos].points as i64 - table[away_pos].points as i64).abs();
        if top3 && gap <= 3 {
            return Importance::TitleRace;
        }
        let bottom = table.len() - 3;
        if home_pos >= bottom && away_pos >= bottom {
            return Importance::Relegation;
        }
    }
    Importance::Normal
}

/// The next matchday with unplayed fixtures, if the season still has one.
pub fn next_matchday(world: &World, league: &League) -> Option<u32> {
    (league.current_matchday..=league.last_matchday()).find(|md| {
        league.fixtures_for(*md).iter().any(|f| {
            world
                .matches
                .get(&f.match_id)
                .map(|m| !m.finished && !m.aborted)
                .unwrap_or(false)
        })
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;
    use std::collections::BTreeSet;

    fn ids(n: usize) -> Vec<String> {
        (0..n).map(|i| format!("team-{:02}", i)).collect()
    }

    #[test]
    fn ten_teams_eighteen_rounds() {
        let rounds = build_rounds(&ids(10));
        assert_eq!(rounds.len(), 18, "2(n-1) matchdays");
        for round in &rounds {
            assert_eq!(round.len(), 5, "five fixtures per matchday");
        }
    }

    #[test]
    fn every_team_plays_once_per_round() {
        let teams = ids(10);
        for (idx, round) in build_rounds(&teams).iter().enumerate() {
            let mut seen = BTreeSet::new();
            for (home, away) in round {
                assert!(seen.insert(home.clone()), "duplicate {} in round {}", home, idx);
                assert!(seen.insert(away.clone()), "duplicate {} in round {}", away, idx);
            }
            assert_eq!(seen.len(), teams.len());
        }
    }

    #[test]
    fn every_ordered_pair_exactly_once() {
        let teams = ids(10);
        let rounds = build_rounds(&teams);
        let mut pairs = BTreeSet::new();
        for round in &rounds {
            for (home, away) in round {
                assert!(
                    pairs.insert((home.clone(), away.clone())),
                    "ordered pair ({}, {}) repeated",
                    home,
                    away
                );
            }
        }
        assert_eq!(pairs.len(), teams.len() * (teams.len() - 1));
    }

    #[test]
    fn second_half_mirrors_home_and_away() {
        let teams = ids(6);
        let rounds = build_rounds(&teams);
        let half = rounds.len() / 2;
        for (first, second) in rounds[..half].iter().zip(&rounds[half..]) {
            for (home, away) in first {
                assert!(
                    second.iter().any(|(h, a)| h == away && a == home),
                    "mirror of ({}, {}) missing",
                    home,
                    away
                );
            }
        }
    }

    #[test]
    fn odd_team_count_gets_a_bye() {
        let rounds = build_rounds(&ids(5));
        // 2(n-1) rounds over the padded circle of 6.
        assert_eq!(rounds.len(), 10);
        for round in &rounds {
            assert_eq!(round.len(), 2, "one team rests per round");
        }
    }

    proptest! {
        #[test]
        fn round_robin_properties_hold(n in 4usize..13) {
            let teams = ids(n);
            let rounds = build_rounds(&teams);
            let even = n % 2 == 0;
            let expected_rounds = if even { 2 * (n - 1) } else { 2 * n };
            prop_assert_eq!(rounds.len(), expected_rounds);

            let mut pairs = BTreeSet::new();
            for round in &rounds {
                for (home, away) in round {
                    prop_assert!(home != away, "team paired with itself");
                    prop_assert!(pairs.insert((home.clone(), away.clone())));
                }
            }
            prop_assert_eq!(pairs.len(), n * (n - 1));
        }
    }
}
