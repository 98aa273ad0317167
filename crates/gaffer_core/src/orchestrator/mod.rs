//! Matchday orchestration: the single write path into the world.
//!
//! `advance` runs one matchday end to end: pre-match soft state, parallel
//! match simulation, canonical-order append and apply, post-match soft
//! state, narrative, season end. Workers are pure functions of
//! `(snapshot, derived seed)` and share nothing; the driver reimposes a
//! total `(league_id, home_id, away_id)` order on their results before
//! anything touches the log, so worker completion order can never leak into
//! the event sequence.

mod narrative;

use chrono::NaiveDateTime;
use rayon::prelude::*;
use std::collections::BTreeMap;
use std::sync::mpsc;
use std::sync::Arc;
use std::time::Duration;

use crate::config::Config;
use crate::engine::{EngineError, MatchEngine, MatchPlan, MatchReport, TeamSheet};
use crate::error::{CoreError, Result};
use crate::models::fixture::Fixture;
use crate::models::{Event, EventPayload, World, MAX_SEASONS};
use crate::query;
use crate::schedule;
use crate::softstate::{
    MatchBrief, MatchdayContext, MatchdayPhase, ReputationLedger, SoftStateCollaborator,
};
use crate::store::{EventStore, SNAPSHOT_INTERVAL};
use crate::{data, softstate};

/// Default timeout for one collaborator call.
pub const COLLABORATOR_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum AdvanceStatus {
    Simulated,
    NoOp,
}

#[derive(Debug, Clone, serde::Serialize)]
pub struct AdvanceSummary {
    pub status: AdvanceStatus,
    pub season: u32,
    pub matches_played: u32,
    pub matches_aborted: u32,
    pub events_appended: u64,
    pub season_ended: bool,
}

/// World + log + collaborator, driven from one thread.
pub struct SimContext {
    pub world: World,
    pub store: EventStore,
    pub collaborator: Arc<dyn SoftStateCollaborator>,
    pub collaborator_timeout: Duration,
}

impl SimContext {
    /// Open (or resume) a simulation from configuration: reset if asked,
    /// rebuild the world from snapshot + log, schedule season one on a
    /// fresh store.
    pub fn bootstrap(config: &Config) -> Result<Self> {
        let mut store = EventStore::open(&config.db_path)?;
        if config.reset_db {
            store.reset()?;
        }
        let world = query::rebuild_from_store(config.world_seed, &store)?;
        let mut ctx = SimContext {
            world,
            store,
            collaborator: softstate::from_config(config),
            collaborator_timeout: COLLABORATOR_TIMEOUT,
        };
        ctx.ensure_scheduled()?;
        Ok(ctx)
    }

    /// In-memory context for tests and `gaffer test`.
    pub fn ephemeral(seed: u64, collaborator: Arc<dyn SoftStateCollaborator>) -> Result<Self> {
        let mut ctx = SimContext {
            world: data::genesis(seed),
            store: EventStore::open_in_memory()?,
            collaborator,
            collaborator_timeout: COLLABORATOR_TIMEOUT,
        };
        ctx.ensure_scheduled()?;
        Ok(ctx)
    }

    /// Fresh stores get season one on the books.
    fn ensure_scheduled(&mut self) -> Result<()> {
        if self.store.event_count()? == 0 {
            self.schedule_current_season()?;
        }
        Ok(())
    }

    fn schedule_current_season(&mut self) -> Result<u64> {
        let season = self.world.season;
        let kickoff = self.world.current_date;
        let mut payloads = Vec::new();
        for league in self.world.leagues.values() {
            payloads.extend(schedule::season_payloads(&self.world, league, season, kickoff));
        }
        let stamp = self.world.current_date.and_hms_opt(9, 0, 0).expect("static time");
        let appended = self.append_and_apply(payloads, stamp)?;
        log::info!("season {} scheduled ({} fixtures)", season, appended);
        Ok(appended)
    }

    /// Append a payload batch under one transaction, then fold it into the
    /// in-memory world. The log is written before the cache moves, so a
    /// failure between the two leaves the log authoritative.
    fn append_and_apply(
        &mut self,
        payloads: Vec<EventPayload>,
        timestamp: NaiveDateTime,
    ) -> Result<u64> {
        if payloads.is_empty() {
            return Ok(0);
        }
        let events: Vec<Event> = payloads
            .into_iter()
            .map(|payload| {
                let minutes = payload_minute(&payload).unwrap_or(0) as i64;
                Event::new(timestamp + chrono::Duration::minutes(minutes), payload)
            })
            .collect();
        self.store.append_batch(&events)?;
        for event in &events {
            self.world.apply(event)?;
        }
        Ok(events.len() as u64)
    }

    /// Run one matchday. No pending fixtures and nothing to roll over means
    /// a no-op summary, never an error.
    pub fn advance(&mut self) -> Result<AdvanceSummary> {
        if self.world.season > MAX_SEASONS {
            return Err(CoreError::CalendarExhausted { season: self.world.season });
        }

        let pending = self.world.pending_fixtures();
        if pending.is_empty() {
            return Ok(AdvanceSummary {
                status: AdvanceStatus::NoOp,
                season: self.world.season,
                matches_played: 0,
                matches_aborted: 0,
                events_appended: 0,
                season_ended: false,
            });
        }

        let season = self.world.season;
        let matchday_date = pending[0].date;
        let mut events_appended = 0u64;
        let mut ledger = ReputationLedger::new();

        // Soft state, pre-match.
        let ctx = self.matchday_context(&pending, &[]);
        events_appended += self.run_collaborator(
            MatchdayPhase::PreMatch,
            ctx,
            &mut ledger,
            matchday_date.and_hms_opt(10, 0, 0).expect("static time"),
        )?;

        // Fan out: one pure task per match, then a canonical merge.
        let plans = self.build_plans(&pending)?;
        let mut outcomes: Vec<(Fixture, std::result::Result<MatchReport, EngineError>)> = plans
            .into_par_iter()
            .map(|(fixture, plan)| {
                let outcome = MatchEngine::new(plan).and_then(|mut engine| engine.simulate());
                (fixture, outcome)
            })
            .collect();
        outcomes.sort_by(|(a, _), (b, _)| {
            (&a.league_id, &a.home_id, &a.away_id).cmp(&(&b.league_id, &b.home_id, &b.away_id))
        });

        let mut matches_played = 0u32;
        let mut matches_aborted = 0u32;
        let mut briefs = Vec::new();
        let kickoff = matchday_date.and_hms_opt(15, 0, 0).expect("static time");
        for (fixture, outcome) in outcomes {
            match outcome {
                Ok(report) => {
                    briefs.push(brief_of(&fixture, &report));
                    events_appended += self.append_and_apply(report.payloads, kickoff)?;
                    matches_played += 1;
                }
                Err(err) => {
                    // Fatal to this match only; the batch for it is never
                    // appended, so the log shows the abort and nothing else.
                    log::error!("match {} aborted: {}", fixture.match_id, err);
                    matches_aborted += 1;
                    events_appended += self.append_and_apply(
                        vec![EventPayload::MatchAborted {
                            match_id: fixture.match_id.clone(),
                            reason: err.to_string(),
                        }],
                        kickoff,
                    )?;
                }
            }
        }

        // Head-to-head deltas, from the now-updated world.
        let h2h_payloads: Vec<EventPayload> = briefs
            .iter()
            .filter_map(|brief| {
                let team = self.world.teams.get(&brief.home_id)?;
                let entry = team.head_to_head.get(&brief.away_id)?;
                Some(EventPayload::HeadToHeadUpdated {
                    team_id: brief.home_id.clone(),
                    opponent_id: brief.away_id.clone(),
                    wins: entry.wins,
                    draws: entry.draws,
                    losses: entry.losses,
                })
            })
            .collect();
        events_appended += self
            .append_and_apply(h2h_payloads, matchday_date.and_hms_opt(17, 0, 0).expect("static time"))?;

        // Soft state, post-match.
        let ctx = self.matchday_context(&pending, &briefs);
        events_appended += self.run_collaborator(
            MatchdayPhase::PostMatch,
            ctx,
            &mut ledger,
            matchday_date.and_hms_opt(18, 0, 0).expect("static time"),
        )?;

        // Press and boardroom reactions.
        let stories = narrative::matchday_stories(&self.world, &pending, &briefs);
        events_appended += self
            .append_and_apply(stories, matchday_date.and_hms_opt(19, 0, 0).expect("static time"))?;

        let mut season_ended = false;
        if self.world.season_complete() {
            events_appended += self.close_season(season, matchday_date.and_hms_opt(20, 0, 0).expect("static time"))?;
            events_appended += self.schedule_current_season()?;
            season_ended = true;
        }

        self.maybe_snapshot()?;

        Ok(AdvanceSummary {
            status: AdvanceStatus::Simulated,
            season,
            matches_played,
            matches_aborted,
            events_appended,
            season_ended,
        })
    }

    fn build_plans(&self, pending: &[Fixture]) -> Result<Vec<(Fixture, MatchPlan)>> {
        let mut plans = Vec::with_capacity(pending.len());
        for fixture in pending {
            let record = self.world.match_record(&fixture.match_id)?;
            let league = self.world.league(&fixture.league_id)?;
            let plan = MatchPlan {
                match_id: fixture.match_id.clone(),
                home: TeamSheet::snapshot(&self.world, &fixture.home_id)?,
                away: TeamSheet::snapshot(&self.world, &fixture.away_id)?,
                weather: record.weather,
                // Billing is live: a fixture tagged normal in August can be
                // a title decider by May.
                importance: schedule::classify(
                    &self.world,
                    league,
                    &fixture.home_id,
                    &fixture.away_id,
                ),
                world_seed: self.world.seed,
            };
            plans.push((fixture.clone(), plan));
        }
        Ok(plans)
    }

    fn matchday_context(&self, pending: &[Fixture], briefs: &[MatchBrief]) -> MatchdayContext {
        let mut matchdays = BTreeMap::new();
        for fixture in pending {
            matchdays.insert(fixture.league_id.clone(), fixture.matchday);
        }
        MatchdayContext {
            season: self.world.season,
            matchdays,
            results: briefs.to_vec(),
        }
    }

    /// Call the collaborator on a worker thread under the timeout, validate
    /// whatever comes back, and append. Timeouts and failures degrade to an
    /// empty update plus a logged `ValidationFailed`.
    fn run_collaborator(
        &mut self,
        phase: MatchdayPhase,
        ctx: MatchdayContext,
        ledger: &mut ReputationLedger,
        timestamp: NaiveDateTime,
    ) -> Result<u64> {
        let proposals = match self.call_with_timeout(phase, ctx) {
            Ok(proposals) => proposals,
            Err(reason) => {
                log::warn!("collaborator {} failed ({}): {}", self.collaborator.name(), phase.label(), reason);
                return self.append_and_apply(
                    vec![EventPayload::ValidationFailed { context: phase.label().into(), reason }],
                    timestamp,
                );
            }
        };
        let payloads = softstate::validate_batch(&self.world, phase, proposals, ledger);
        self.append_and_apply(payloads, timestamp)
    }

    fn call_with_timeout(
        &self,
        phase: MatchdayPhase,
        ctx: MatchdayContext,
    ) -> std::result::Result<Vec<softstate::SoftStateProposal>, String> {
        let (tx, rx) = mpsc::channel();
        let collaborator = Arc::clone(&self.collaborator);
        let world = self.world.clone();
        std::thread::spawn(move || {
            let outcome = collaborator.propose(&world, phase, &ctx);
            let _ = tx.send(outcome);
        });
        match rx.recv_timeout(self.collaborator_timeout) {
            Ok(Ok(proposals)) => Ok(proposals),
            Ok(Err(err)) => Err(err.to_string()),
            Err(_) => Err(format!("no response within {:?}", self.collaborator_timeout)),
        }
    }

    /// Crown every league, which triggers the rollover inside `apply` once
    /// the last champion lands.
    fn close_season(&mut self, season: u32, timestamp: NaiveDateTime) -> Result<u64> {
        let mut payloads = Vec::new();
        for league_id in self.world.leagues.keys().cloned().collect::<Vec<_>>() {
            let table = query::league_table(&self.world, &league_id)?;
            let champion = table
                .first()
                .ok_or_else(|| CoreError::InvariantViolation("empty league table".into()))?;
            let top_scorer = query::top_scorers(&self.world, &league_id, season, 1)?
                .first()
                .map(|row| (row.player_id.clone(), row.count));
            let top_assister = query::top_assisters(&self.world, &league_id, season, 1)?
                .first()
                .map(|row| (row.player_id.clone(), row.count));
            let most_clean_sheets = query::best_defense(&self.world, &league_id)?
                .iter()
                .max_by(|a, b| {
                    a.clean_sheets
                        .cmp(&b.clean_sheets)
                        .then_with(|| b.name.cmp(&a.name))
                })
                .map(|row| (row.team_id.clone(), row.clean_sheets));
            log::info!(
                "season {}: {} crowned in {}",
                season,
                champion.name,
                league_id
            );
            payloads.push(EventPayload::SeasonEnded {
                league_id,
                season,
                champion_id: champion.team_id.clone(),
                top_scorer,
                top_assister,
                most_clean_sheets,
            });
        }
        self.append_and_apply(payloads, timestamp)
    }

    fn maybe_snapshot(&mut self) -> Result<()> {
        let last_seq = self.store.last_sequence()?;
        let last_snap = self.store.last_snapshot_sequence()?.unwrap_or(0);
        if last_seq - last_snap >= SNAPSHOT_INTERVAL {
            self.store.save_snapshot(&self.world, last_seq)?;
        }
        Ok(())
    }
}

fn brief_of(fixture: &Fixture, report: &MatchReport) -> MatchBrief {
    let participants = report
        .payloads
        .iter()
        .find_map(|p| match p {
            EventPayload::MatchEnded { stats, .. } => {
                Some(stats.minutes.keys().cloned().collect::<Vec<_>>())
            }
            _ => None,
        })
        .unwrap_or_default();
    MatchBrief {
        match_id: fixture.match_id.clone(),
        home_id: fixture.home_id.clone(),
        away_id: fixture.away_id.clone(),
        home_score: report.home_score,
        away_score: report.away_score,
        participants,
    }
}

/// In-match minute of a payload, for timestamp offsets within the batch.
fn payload_minute(payload: &EventPayload) -> Option<u8> {
    match payload {
        EventPayload::Goal { minute, .. }
        | EventPayload::YellowCard { minute, .. }
        | EventPayload::RedCard { minute, .. }
        | EventPayload::Substitution { minute, .. }
        | EventPayload::Injury { minute, .. }
        | EventPayload::CornerKick { minute, .. }
        | EventPayload::Foul { minute, .. }
        | EventPayload::FreeKick { minute, .. }
        | EventPayload::PenaltyAwarded { minute, .. }
        | EventPayload::Offside { minute, .. } => Some(*minute),
        EventPayload::MatchEnded { .. } => Some(90),
        _ => None,
    }
}
