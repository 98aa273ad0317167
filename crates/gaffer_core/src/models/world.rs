//! The root aggregate and its single mutating pathway.
//!
//! The world is a cache: the durable truth is the event log, and
//! [`World::apply`] is the fold. It performs no I/O, consumes no randomness,
//! and never reads the clock, so folding the same event sequence over the
//! same genesis always rebuilds the same world.

use chrono::{Duration, NaiveDate};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::{CoreError, Result};

use super::collateral::{MediaOutlet, NewsItem, Owner, StaffMember, NEWS_FEED_CAP};
use super::events::{Event, EventPayload, TargetKind};
use super::fixture::{Fixture, Match};
use super::league::League;
use super::player::Player;
use super::team::{MatchOutcome, Team};

/// Days between the final whistle of one season and the first kickoff of the
/// next.
pub const SEASON_BREAK_DAYS: i64 = 56;

/// Hard stop for the calendar; `advance` past this is a user error.
pub const MAX_SEASONS: u32 = 100;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct World {
    pub season: u32,
    pub current_date: NaiveDate,
    pub seed: u64,
    pub leagues: BTreeMap<String, League>,
    pub teams: BTreeMap<String, Team>,
    pub players: BTreeMap<String, Player>,
    pub matches: BTreeMap<String, Match>,
    pub owners: BTreeMap<String, Owner>,
    pub staff: BTreeMap<String, StaffMember>,
    pub media: BTreeMap<String, MediaOutlet>,
    /// Bounded narrative feed, newest last.
    pub news: Vec<NewsItem>,
}

impl World {
    pub fn league(&self, id: &str) -> Result<&League> {
        self.leagues
            .get(id)
            .ok_or_else(|| CoreError::UnknownEntity { kind: "league", id: id.to_string() })
    }

    pub fn team(&self, id: &str) -> Result<&Team> {
        self.teams
            .get(id)
            .ok_or_else(|| CoreError::UnknownEntity { kind: "team", id: id.to_string() })
    }

    pub fn player(&self, id: &str) -> Result<&Player> {
        self.players
            .get(id)
            .ok_or_else(|| CoreError::UnknownEntity { kind: "player", id: id.to_string() })
    }

    pub fn match_record(&self, id: &str) -> Result<&Match> {
        self.matches
            .get(id)
            .ok_or_else(|| CoreError::UnknownEntity { kind: "match", id: id.to_string() })
    }

    fn team_mut(&mut self, id: &str) -> Result<&mut Team> {
        self.teams
            .get_mut(id)
            .ok_or_else(|| CoreError::InvariantViolation(format!("unresolvable team id {id}")))
    }

    fn player_mut(&mut self, id: &str) -> Result<&mut Player> {
        self.players
            .get_mut(id)
            .ok_or_else(|| CoreError::InvariantViolation(format!("unresolvable player id {id}")))
    }

    fn match_mut(&mut self, id: &str) -> Result<&mut Match> {
        self.matches
            .get_mut(id)
            .ok_or_else(|| CoreError::InvariantViolation(format!("unresolvable match id {id}")))
    }

    /// All unplayed fixtures on every league's current matchday, in
    /// deterministic league order.
    pub fn pending_fixtures(&self) -> Vec<Fixture> {
        let mut pending = Vec::new();
        for league in self.leagues.values() {
            for fixture in league.fixtures_for(league.current_matchday) {
                let settled = self
                    .matches
                    .get(&fixture.match_id)
                    .map(|m| m.finished || m.aborted)
                    .unwrap_or(false);
                if !settled {
                    pending.push(fixture.clone());
                }
            }
        }
        pending
    }

    /// A matchday is complete when its fixture list exists and every match is
    /// settled (finished or aborted).
    pub fn matchday_complete(&self, league: &League) -> bool {
        let fixtures = league.fixtures_for(league.current_matchday);
        !fixtures.is_empty()
            && fixtures.iter().all(|f| {
                self.matches
                    .get(&f.match_id)
                    .map(|m| m.finished || m.aborted)
                    .unwrap_or(false)
            })
    }

    /// Season is over once every league has settled its final matchday.
    pub fn season_complete(&self) -> bool {
        self.leagues.values().all(|l| {
            l.current_matchday == l.last_matchday() && self.matchday_complete(l)
        })
    }

    /// The fold. Pure over (world, event); returns a fatal error on an event
    /// that cannot possibly apply to this world (a corrupt or foreign log).
    pub fn apply(&mut self, event: &Event) -> Result<()> {
        match &event.payload {
            EventPayload::MatchScheduled {
                match_id,
                league_id,
                season,
                matchday,
                home_id,
                away_id,
                date,
                weather,
                importance,
            } => {
                self.team(home_id).map_err(not_resolvable)?;
                self.team(away_id).map_err(not_resolvable)?;
                let fixture = Fixture {
                    match_id: match_id.clone(),
                    league_id: league_id.clone(),
                    season: *season,
                    matchday: *matchday,
                    home_id: home_id.clone(),
                    away_id: away_id.clone(),
                    date: *date,
                    importance: *importance,
                };
                self.matches
                    .insert(match_id.clone(), Match::from_fixture(&fixture, *weather));
                let league = self.leagues.get_mut(league_id).ok_or_else(|| {
                    CoreError::InvariantViolation(format!("unresolvable league id {league_id}"))
                })?;
                league.fixtures.entry(*matchday).or_default().push(fixture);
            }

            EventPayload::MatchStarted { match_id, attendance, atmosphere } => {
                let m = self.match_mut(match_id)?;
                m.attendance = Some(*attendance);
                m.atmosphere = Some(*atmosphere);
            }

            EventPayload::KickOff { .. } => {}

            EventPayload::Goal { match_id, team_id, scorer_id, assist_id, .. } => {
                let season = self.season;
                {
                    let m = self.match_mut(match_id)?;
                    if m.finished {
                        return Err(CoreError::InvariantViolation(format!(
                            "goal applied to sealed match {match_id}"
                        )));
                    }
                    if *team_id == m.home_id {
                        m.home_score += 1;
                    } else {
                        m.away_score += 1;
                    }
                }
                self.player_mut(scorer_id)?.season_entry(season).goals += 1;
                if let Some(assist_id) = assist_id {
                    self.player_mut(assist_id)?.season_entry(season).assists += 1;
                }
            }

            EventPayload::YellowCard { player_id, .. } => {
                let season = self.season;
                let p = self.player_mut(player_id)?;
                p.yellow_cards_season += 1;
                p.season_entry(season).yellows += 1;
            }

            EventPayload::RedCard { player_id, .. } => {
                let season = self.season;
                let p = self.player_mut(player_id)?;
                p.red_cards_season += 1;
                p.season_entry(season).reds += 1;
            }

            EventPayload::Substitution { .. } => {}

            EventPayload::Injury { match_id, player_id, severity, .. } => {
                let (season, matchday) = {
                    let m = self.match_record(match_id).map_err(not_resolvable)?;
                    (m.season, m.matchday)
                };
                let p = self.player_mut(player_id)?;
                p.injured = true;
                p.injury_matchdays_left = severity.matchdays_out();
                p.injury_history.push(super::player::InjuryRecord {
                    season,
                    matchday,
                    severity: *severity,
                });
            }

            EventPayload::CornerKick { .. }
            | EventPayload::Foul { .. }
            | EventPayload::FreeKick { .. }
            | EventPayload::PenaltyAwarded { .. }
            | EventPayload::Offside { .. } => {}

            EventPayload::MatchEnded { match_id, home_score, away_score, stats, player_ratings, .. } => {
                self.seal_match(match_id, *home_score, *away_score)?;
                let season = self.season;
                for (player_id, minutes) in &stats.minutes {
                    let rating = player_ratings.get(player_id).copied().unwrap_or(6.0);
                    self.player_mut(player_id)?
                        .season_entry(season)
                        .record_appearance(*minutes, rating);
                }
                self.advance_calendar_if_due();
            }

            EventPayload::MatchAborted { match_id, reason } => {
                log::warn!("match {} aborted: {}", match_id, reason);
                self.match_mut(match_id)?.aborted = true;
                self.advance_calendar_if_due();
            }

            EventPayload::SoftStateUpdated { target_kind, target_id, field, value } => {
                self.apply_soft_update(*target_kind, target_id, *field, *value)?;
            }

            EventPayload::ValidationFailed { .. } => {}

            EventPayload::SeasonEnded {
                league_id,
                season,
                champion_id,
                top_scorer,
                top_assister,
                ..
            } => {
                let league = self.leagues.get_mut(league_id).ok_or_else(|| {
                    CoreError::InvariantViolation(format!("unresolvable league id {league_id}"))
                })?;
                league.champions_by_season.insert(*season, champion_id.clone());
                if let Some((scorer_id, goals)) = top_scorer {
                    league.top_scorers_by_season.insert(*season, (scorer_id.clone(), *goals));
                }
                let golden_boot = top_scorer.clone();
                let playmaker = top_assister.clone();
                if let Some((scorer_id, _)) = golden_boot {
                    self.player_mut(&scorer_id)?
                        .awards
                        .push(super::player::Award { season: *season, name: "Golden Boot".into() });
                }
                if let Some((assister_id, _)) = playmaker {
                    self.player_mut(&assister_id)?
                        .awards
                        .push(super::player::Award { season: *season, name: "Playmaker".into() });
                }
                self.roll_over_if_due(*season);
            }

            EventPayload::MediaStory { outlet_id, headline, body, .. } => {
                self.push_news(Some(outlet_id.clone()), headline.clone(), body.clone());
            }

            EventPayload::OwnerStatement { owner_id, quote, .. } => {
                let headline = self
                    .owners
                    .get(owner_id)
                    .map(|o| format!("{} speaks", o.name))
                    .unwrap_or_else(|| "Owner speaks".to_string());
                self.push_news(None, headline, quote.clone());
            }

            EventPayload::HeadToHeadUpdated { team_id, opponent_id, wins, draws, losses } => {
                let entry = self.team_mut(team_id)?.head_to_head_entry(opponent_id);
                entry.wins = *wins;
                entry.draws = *draws;
                entry.losses = *losses;
            }
        }
        Ok(())
    }

    fn seal_match(&mut self, match_id: &str, home_score: u32, away_score: u32) -> Result<()> {
        let (home_id, away_id, attendance) = {
            let m = self.match_mut(match_id)?;
            if m.finished {
                return Err(CoreError::InvariantViolation(format!(
                    "match {match_id} sealed twice"
                )));
            }
            if m.home_score != home_score || m.away_score != away_score {
                return Err(CoreError::InvariantViolation(format!(
                    "final score {}-{} disagrees with goal events {}-{} for {match_id}",
                    home_score, away_score, m.home_score, m.away_score
                )));
            }
            m.finished = true;
            (m.home_id.clone(), m.away_id.clone(), m.attendance.unwrap_or(0) as i64)
        };

        let home_outcome = outcome(home_score, away_score);
        let away_outcome = outcome(away_score, home_score);

        {
            let home = self.team_mut(&home_id)?;
            home.record.record_result(home_score, away_score, true);
            home.push_form(home_outcome);
            let h2h = home.head_to_head_entry(&away_id);
            bump_h2h(h2h, home_outcome);
            home.finances.balance += attendance * home.finances.ticket_price as i64;
            home.finances.balance += home.finances.sponsor_income_weekly - home.finances.weekly_wages;
        }
        {
            let away = self.team_mut(&away_id)?;
            away.record.record_result(away_score, home_score, false);
            away.push_form(away_outcome);
            let h2h = away.head_to_head_entry(&home_id);
            bump_h2h(h2h, away_outcome);
            away.finances.balance += away.finances.sponsor_income_weekly - away.finances.weekly_wages;
        }
        Ok(())
    }

    /// Lock-step calendar: once every league has settled its current
    /// matchday, the unfinished ones advance together and the date moves a
    /// week. A league already past its final matchday just waits for the
    /// others; the final matchday itself holds until season rollover.
    fn advance_calendar_if_due(&mut self) {
        if self.leagues.is_empty() {
            return;
        }
        let all_settled = self.leagues.values().all(|l| self.matchday_complete(l));
        let any_remaining =
            self.leagues.values().any(|l| l.current_matchday < l.last_matchday());
        if !all_settled || !any_remaining {
            return;
        }
        for league in self.leagues.values_mut() {
            if league.current_matchday < league.last_matchday() {
                league.current_matchday += 1;
            }
        }
        self.current_date += Duration::days(7);
        self.tick_injuries();
    }

    /// Once every league has a champion recorded for `season`, reset the
    /// per-season state and open the next campaign.
    fn roll_over_if_due(&mut self, season: u32) {
        let all_crowned = self
            .leagues
            .values()
            .all(|l| l.champions_by_season.contains_key(&season));
        if !all_crowned || season != self.season {
            return;
        }
        self.season += 1;
        self.current_date += Duration::days(SEASON_BREAK_DAYS);
        for league in self.leagues.values_mut() {
            league.current_matchday = 1;
            league.fixtures.clear();
        }
        for team in self.teams.values_mut() {
            team.reset_season_counters();
        }
        for player in self.players.values_mut() {
            player.reset_season_counters();
            // The break heals everything.
            player.injured = false;
            player.injury_matchdays_left = 0;
        }
        log::info!("season {} opened, kicking off {}", self.season, self.current_date);
    }

    fn tick_injuries(&mut self) {
        for player in self.players.values_mut() {
            if player.injured {
                player.injury_matchdays_left = player.injury_matchdays_left.saturating_sub(1);
                if player.injury_matchdays_left == 0 {
                    player.injured = false;
                }
            }
        }
    }

    fn apply_soft_update(
        &mut self,
        target_kind: TargetKind,
        target_id: &str,
        field: super::events::SoftField,
        value: u8,
    ) -> Result<()> {
        use super::events::SoftField;
        match (target_kind, field) {
            (TargetKind::Player, SoftField::Form) => self.player_mut(target_id)?.form = value,
            (TargetKind::Player, SoftField::Morale) => self.player_mut(target_id)?.morale = value,
            (TargetKind::Player, SoftField::Fitness) => self.player_mut(target_id)?.fitness = value,
            (TargetKind::Player, SoftField::Reputation) => {
                self.player_mut(target_id)?.reputation = value.clamp(1, 100)
            }
            (TargetKind::Team, SoftField::Morale) => self.team_mut(target_id)?.morale = value,
            (TargetKind::Team, SoftField::TeamRapport) => self.team_mut(target_id)?.rapport = value,
            (TargetKind::Team, SoftField::Reputation) => {
                self.team_mut(target_id)?.reputation = value.clamp(1, 100)
            }
            (TargetKind::Owner, SoftField::PublicApproval) => {
                self.owners
                    .get_mut(target_id)
                    .ok_or_else(|| {
                        CoreError::InvariantViolation(format!("unresolvable owner id {target_id}"))
                    })?
                    .public_approval = value
            }
            (kind, field) => {
                // The validator never emits these; reaching here means the
                // log was written by something else.
                return Err(CoreError::InvariantViolation(format!(
                    "soft update {:?}/{} not applicable",
                    kind,
                    field.name()
                )));
            }
        }
        Ok(())
    }

    fn push_news(&mut self, outlet_id: Option<String>, headline: String, body: String) {
        self.news.push(NewsItem { date: self.current_date, outlet_id, headline, body });
        if self.news.len() > NEWS_FEED_CAP {
            let excess = self.news.len() - NEWS_FEED_CAP;
            self.news.drain(..excess);
        }
    }

    /// Structural invariants checked by tests and on load.
    pub fn check_invariants(&self) -> Result<()> {
        for league in self.leagues.values() {
            for team_id in &league.team_ids {
                self.team(team_id).map_err(not_resolvable)?;
            }
        }
        for team in self.teams.values() {
            self.league(&team.league_id).map_err(not_resolvable)?;
            for player_id in &team.squad {
                self.player(player_id).map_err(not_resolvable)?;
            }
            if team.recent_form.len() > super::team::RECENT_FORM_LEN {
                return Err(CoreError::InvariantViolation(format!(
                    "recent form overflow for {}",
                    team.id
                )));
            }
        }
        for player in self.players.values() {
            if player.potential < player.overall_rating() {
                return Err(CoreError::InvariantViolation(format!(
                    "potential below overall for {}",
                    player.id
                )));
            }
        }
        Ok(())
    }
}

fn outcome(scored: u32, conceded: u32) -> MatchOutcome {
    if scored > conceded {
        MatchOutcome::W
    } else if scored == conceded {
        MatchOutcome::D
    } else {
        MatchOutcome::L
    }
}

fn bump_h2h(h2h: &mut super::team::HeadToHead, outcome: MatchOutcome) {
    match outcome {
        MatchOutcome::W => h2h.wins += 1,
        MatchOutcome::D => h2h.draws += 1,
        MatchOutcome::L => h2h.losses += 1,
    }
}

fn not_resolvable(err: CoreError) -> CoreError {
    CoreError::InvariantViolation(err.to_string())
}
