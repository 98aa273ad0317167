//! Read-side projections.
//!
//! Everything here is a pure fold: either over the in-memory world or, via
//! [`rebuild_world`], over the raw event log. The two agree by construction
//! and the replay tests hold them to it.

use serde::Serialize;
use std::collections::BTreeMap;

use crate::data;
use crate::error::Result;
use crate::models::player::SeasonStats;
use crate::models::team::HeadToHead;
use crate::models::{Event, EventPayload, World};

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct TableRow {
    pub position: u32,
    pub team_id: String,
    pub name: String,
    pub played: u32,
    pub wins: u32,
    pub draws: u32,
    pub losses: u32,
    pub goals_for: u32,
    pub goals_against: u32,
    pub goal_difference: i64,
    pub points: u32,
}

/// League table: points desc, goal difference desc, goals for desc, name asc.
pub fn league_table(world: &World, league_id: &str) -> Result<Vec<TableRow>> {
    let league = world.league(league_id)?;
    let mut rows = Vec::with_capacity(league.team_ids.len());
    for team_id in &league.team_ids {
        let team = world.team(team_id)?;
        rows.push(TableRow {
            position: 0,
            team_id: team.id.clone(),
            name: team.name.clone(),
            played: team.record.matches_played(),
            wins: team.record.wins,
            draws: team.record.draws,
            losses: team.record.losses,
            goals_for: team.record.goals_for,
            goals_against: team.record.goals_against,
            goal_difference: team.record.goal_difference(),
            points: team.record.points(),
        });
    }
    rows.sort_by(|a, b| {
        b.points
            .cmp(&a.points)
            .then_with(|| b.goal_difference.cmp(&a.goal_difference))
            .then_with(|| b.goals_for.cmp(&a.goals_for))
            .then_with(|| a.name.cmp(&b.name))
    });
    for (idx, row) in rows.iter_mut().enumerate() {
        row.position = idx as u32 + 1;
    }
    Ok(rows)
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct PlayerStatRow {
    pub player_id: String,
    pub name: String,
    pub team_id: String,
    pub count: u32,
}

pub fn top_scorers(
    world: &World,
    league_id: &str,
    season: u32,
    limit: usize,
) -> Result<Vec<PlayerStatRow>> {
    player_leaderboard(world, league_id, season, limit, |stats| stats.goals)
}

pub fn top_assisters(
    world: &World,
    league_id: &str,
    season: u32,
    limit: usize,
) -> Result<Vec<PlayerStatRow>> {
    player_leaderboard(world, league_id, season, limit, |stats| stats.assists)
}

fn player_leaderboard(
    world: &World,
    league_id: &str,
    season: u32,
    limit: usize,
    metric: impl Fn(&SeasonStats) -> u32,
) -> Result<Vec<PlayerStatRow>> {
    let league = world.league(league_id)?;
    let mut rows = Vec::new();
    for team_id in &league.team_ids {
        let team = world.team(team_id)?;
        for player_id in &team.squad {
            let player = world.player(player_id)?;
            let count = player.season_stats.get(&season).map(&metric).unwrap_or(0);
            if count > 0 {
                rows.push(PlayerStatRow {
                    player_id: player.id.clone(),
                    name: player.name.clone(),
                    team_id: team.id.clone(),
                    count,
                });
            }
        }
    }
    rows.sort_by(|a, b| b.count.cmp(&a.count).then_with(|| a.name.cmp(&b.name)));
    rows.truncate(limit);
    Ok(rows)
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct DefenseRow {
    pub team_id: String,
    pub name: String,
    pub played: u32,
    pub goals_against: u32,
    pub clean_sheets: u32,
}

/// Fewest conceded first, clean sheets as the tie-break.
pub fn best_defense(world: &World, league_id: &str) -> Result<Vec<DefenseRow>> {
    let league = world.league(league_id)?;
    let mut rows = Vec::with_capacity(league.team_ids.len());
    for team_id in &league.team_ids {
        let team = world.team(team_id)?;
        rows.push(DefenseRow {
            team_id: team.id.clone(),
            name: team.name.clone(),
            played: team.record.matches_played(),
            goals_against: team.record.goals_against,
            clean_sheets: team.record.clean_sheets,
        });
    }
    rows.sort_by(|a, b| {
        a.goals_against
            .cmp(&b.goals_against)
            .then_with(|| b.clean_sheets.cmp(&a.clean_sheets))
            .then_with(|| a.name.cmp(&b.name))
    });
    Ok(rows)
}

pub fn head_to_head(world: &World, team_id: &str) -> Result<BTreeMap<String, HeadToHead>> {
    Ok(world.team(team_id)?.head_to_head.clone())
}

pub fn player_season_stats(world: &World, player_id: &str, season: u32) -> Result<SeasonStats> {
    Ok(world.player(player_id)?.season_stats.get(&season).cloned().unwrap_or_default())
}

/// Events for one match in log order.
pub fn match_events(events: &[(i64, Event)], match_id: &str) -> Vec<Event> {
    events
        .iter()
        .filter(|(_, e)| e.payload.match_id() == Some(match_id))
        .map(|(_, e)| e.clone())
        .collect()
}

/// Full-scan head-to-head from `MatchEnded` events; equal by construction to
/// the incrementally-maintained map on `Team`, and tests assert exactly that.
pub fn head_to_head_from_events(
    events: &[(i64, Event)],
    team_id: &str,
) -> BTreeMap<String, HeadToHead> {
    let mut out: BTreeMap<String, HeadToHead> = BTreeMap::new();
    let mut sides: BTreeMap<String, (String, String)> = BTreeMap::new();
    for (_, event) in events {
        match &event.payload {
            EventPayload::MatchScheduled { match_id, home_id, away_id, .. } => {
                sides.insert(match_id.clone(), (home_id.clone(), away_id.clone()));
            }
            EventPayload::MatchEnded { match_id, home_score, away_score, .. } => {
                let Some((home_id, away_id)) = sides.get(match_id) else { continue };
                let (opponent, scored, conceded) = if home_id == team_id {
                    (away_id.clone(), home_score, away_score)
                } else if away_id == team_id {
                    (home_id.clone(), away_score, home_score)
                } else {
                    continue;
                };
                let entry = out.entry(opponent).or_default();
                if scored > conceded {
                    entry.wins += 1;
                } else if scored == conceded {
                    entry.draws += 1;
                } else {
                    entry.losses += 1;
                }
            }
            _ => {}
        }
    }
    out
}

/// Rebuild the world from genesis and a log suffix-free event sequence.
/// This is the replay-identity anchor: fold equals cache.
pub fn rebuild_world(seed: u64, events: &[(i64, Event)]) -> Result<World> {
    let mut world = data::genesis(seed);
    for (_, event) in events {
        world.apply(event)?;
    }
    Ok(world)
}

/// Rebuild preferring a snapshot when one covers a prefix of the log.
pub fn rebuild_from_store(seed: u64, store: &crate::store::EventStore) -> Result<World> {
    let (mut world, from_seq) = match store.load_snapshot()? {
        Some((world, seq)) => (world, seq + 1),
        None => (data::genesis(seed), 1),
    };
    for (_, event) in store.read_from(from_seq)? {
        world.apply(&event)?;
    }
    Ok(world)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::team::TeamRecord;

    fn world_with_table() -> World {
        let mut world = data::genesis(42);
        let league_id = world.leagues.keys().next().unwrap().clone();
        let ids = world.leagues[&league_id].team_ids.clone();
        // Hand-craft records that exercise every tie-break level.
        let mut set = |id: &str, w: u32, d: u32, l: u32, gf: u32, ga: u32| {
            let team = world.teams.get_mut(id).unwrap();
            team.record = TeamRecord { wins: w, draws: d, losses: l, goals_for: gf, goals_against: ga, ..Default::default() };
        };
        set(&ids[0], 2, 0, 0, 4, 1); // 6 pts, +3
        set(&ids[1], 2, 0, 0, 6, 2); // 6 pts, +4 -> above ids[0]
        set(&ids[2], 1, 1, 0, 3, 1); // 4 pts
        world
    }

    #[test]
    fn table_sorts_by_points_then_gd_then_gf_then_name() {
        let world = world_with_table();
        let league_id = world.leagues.keys().next().unwrap().clone();
        let ids = world.leagues[&league_id].team_ids.clone();
        let table = league_table(&world, &league_id).unwrap();
        assert_eq!(table[0].team_id, ids[1], "better goal difference leads");
        assert_eq!(table[1].team_id, ids[0]);
        assert_eq!(table[2].team_id, ids[2]);
        assert_eq!(table[0].position, 1);
        assert_eq!(table.len(), 10);
        for row in &table {
            assert_eq!(row.points, 3 * row.wins + row.draws);
            assert_eq!(row.goal_difference, row.goals_for as i64 - row.goals_against as i64);
        }
    }

    #[test]
    fn equal_records_break_by_name() {
        let world = data::genesis(42);
        let league_id = world.leagues.keys().next().unwrap().clone();
        // Everyone at zero: pure name order expected.
        let table = league_table(&world, &league_id).unwrap();
        let names: Vec<&String> = table.iter().map(|r| &r.name).collect();
        let mut sorted = names.clone();
        sorted.sort();
        assert_eq!(names, sorted);
        world.check_invariants().unwrap();
    }

    #[test]
    fn top_scorers_filters_zeroes_and_sorts() {
        let mut world = data::genesis(42);
        let league_id = world.leagues.keys().next().unwrap().clone();
        let team_id = world.leagues[&league_id].team_ids[0].clone();
        let squad = world.teams[&team_id].squad.clone();
        world.players.get_mut(&squad[0]).unwrap().season_entry(1).goals = 7;
        world.players.get_mut(&squad[1]).unwrap().season_entry(1).goals = 3;

        let scorers = top_scorers(&world, &league_id, 1, 10).unwrap();
        assert_eq!(scorers.len(), 2);
        assert_eq!(scorers[0].player_id, squad[0]);
        assert_eq!(scorers[0].count, 7);

        assert!(top_scorers(&world, &league_id, 2, 10).unwrap().is_empty());
    }

    #[test]
    fn unknown_league_is_not_found() {
        let world = data::genesis(42);
        let err = league_table(&world, "league-mars").unwrap_err();
        assert!(err.is_not_found());
    }
}
