//! Match simulation engine.
//!
//! One call, one match: a [`MatchEngine`] consumes immutable team snapshots
//! and a stream derived from `(world seed, match id)`, walks minutes 1..=90,
//! and returns the full event payload sequence ending in exactly one
//! `MatchEnded`. The engine owns no world state and performs no I/O; two
//! engines never share anything, which is what lets a matchday fan out
//! across worker threads without locks.
//!
//! ## Model
//!
//! Each minute either resolves into an event or passes quietly. A resolved
//! minute samples a category from the fixed weighted table in
//! [`constants::EVENT_WEIGHTS`], picks the acting side by cubed effective
//! strength (home side boosted by [`constants::HOME_ADVANTAGE`]), then
//! resolves actors by attribute-weighted draws with lexicographic id
//! tie-breaks. Events within a minute carry a fixed sub-order (kick-off,
//! fouls, cards, goals, substitutions last).

pub mod commentary;
pub mod constants;
pub mod lineup;
pub mod ratings;

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use thiserror::Error;

use crate::error::Result as CoreResult;
use crate::models::events::{
    CardReason, EventPayload, FoulSeverity, FreeKickKind, FreeKickLocation, MatchStats,
    TeamMatchStats,
};
use crate::models::fixture::{Importance, Weather, ATMOSPHERE_MAX, ATMOSPHERE_MIN, MIN_ATTENDANCE};
use crate::models::player::{Attributes, InjurySeverity, PlayerTrait, Position};
use crate::models::World;
use crate::rng::{self, DetRng};

use constants::*;

#[derive(Error, Debug)]
pub enum EngineError {
    #[error("illegal match phase transition: {from:?} -> {to:?}")]
    IllegalTransition { from: MatchPhase, to: MatchPhase },

    #[error("starting eleven cannot be formed: {0}")]
    LineupUnfillable(String),

    #[error("malformed team snapshot: {0}")]
    SnapshotMalformed(String),
}

/// `Created -> KickedOff -> Running -> Ended`, no shortcuts, no reversals.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchPhase {
    Created,
    KickedOff,
    Running,
    Ended,
}

/// Immutable view of one player, detached from the world.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PlayerSnapshot {
    pub id: String,
    pub name: String,
    pub position: Position,
    pub attributes: Attributes,
    pub overall: u8,
    pub form: u8,
    pub morale: u8,
    pub fitness: u8,
    pub traits: Vec<PlayerTrait>,
    pub injured: bool,
}

/// Immutable view of one club on matchday.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamSheet {
    pub team_id: String,
    pub name: String,
    pub reputation: u8,
    pub morale: u8,
    pub tactical_familiarity: u8,
    pub stadium_capacity: u32,
    pub players: Vec<PlayerSnapshot>,
}

impl TeamSheet {
    /// Borrow a read-only snapshot out of the world.
    pub fn snapshot(world: &World, team_id: &str) -> CoreResult<Self> {
        let team = world.team(team_id)?;
        let mut players = Vec::with_capacity(team.squad.len());
        for player_id in &team.squad {
            let p = world.player(player_id)?;
            players.push(PlayerSnapshot {
                id: p.id.clone(),
                name: p.name.clone(),
                position: p.position,
                attributes: p.attributes,
                overall: p.overall_rating(),
                form: p.form,
                morale: p.morale,
                fitness: p.fitness,
                traits: p.traits.clone(),
                injured: p.injured,
            });
        }
        Ok(TeamSheet {
            team_id: team.id.clone(),
            name: team.name.clone(),
            reputation: team.reputation,
            morale: team.morale,
            tactical_familiarity: team.tactical_familiarity,
            stadium_capacity: team.stadium.capacity,
            players,
        })
    }
}

#[derive(Debug, Clone)]
pub struct MatchPlan {
    pub match_id: String,
    pub home: TeamSheet,
    pub away: TeamSheet,
    pub weather: Weather,
    pub importance: Importance,
    pub world_seed: u64,
}

/// Everything the orchestrator needs to append and apply one played match.
#[derive(Debug, Clone)]
pub struct MatchReport {
    pub match_id: String,
    pub home_score: u32,
    pub away_score: u32,
    /// `MatchStarted`, `KickOff`, play-by-play, `MatchEnded` — in order.
    pub payloads: Vec<EventPayload>,
}

#[derive(Debug, Clone, Default)]
struct Tally {
    goals: u32,
    assists: u32,
    yellows: u32,
    reds: u32,
}

#[derive(Debug)]
struct SideState {
    sheet: TeamSheet,
    on_field: Vec<usize>,
    bench: Vec<usize>,
    subs_used: u8,
    /// Live fitness per squad index; drains while on the field.
    fitness: Vec<f64>,
    /// Squad index -> minute entered (0 for starters) / minute exited.
    entered: BTreeMap<usize, u8>,
    exited: BTreeMap<usize, u8>,
    booked: BTreeSet<usize>,
    score: u32,
    stats: TeamMatchStats,
    tallies: BTreeMap<usize, Tally>,
    index_by_id: BTreeMap<String, usize>,
}

impl SideState {
    fn new(sheet: TeamSheet) -> Result<Self, EngineError> {
        let picked = lineup::select(&sheet.players)?;
        let fitness = sheet.players.iter().map(|p| p.fitness as f64).collect();
        let mut entered = BTreeMap::new();
        for &i in &picked.starters {
            entered.insert(i, 0u8);
        }
        let index_by_id =
            sheet.players.iter().enumerate().map(|(i, p)| (p.id.clone(), i)).collect();
        Ok(SideState {
            on_field: picked.starters,
            bench: picked.bench,
            subs_used: 0,
            fitness,
            entered,
            exited: BTreeMap::new(),
            booked: BTreeSet::new(),
            score: 0,
            stats: TeamMatchStats::default(),
            tallies: BTreeMap::new(),
            index_by_id,
            sheet,
        })
    }

    fn player(&self, idx: usize) -> &PlayerSnapshot {
        &self.sheet.players[idx]
    }

    fn outfielders(&self) -> impl Iterator<Item = usize> + '_ {
        self.on_field.iter().copied().filter(|&i| !self.player(i).position.is_goalkeeper())
    }

    /// Attack quality of the current eleven: attribute mix scaled by form,
    /// morale and live fitness.
    fn attack_strength(&self) -> f64 {
        let mut total = 0.0;
        let mut n = 0u32;
        for i in self.outfielders() {
            let p = self.player(i);
            let mix = p.attributes.shooting as f64 * 0.45
                + p.attributes.pace as f64 * 0.30
                + p.attributes.passing as f64 * 0.25;
            let form_scale = 0.90 + p.form as f64 / 500.0;
            let fitness_scale = 0.80 + self.fitness[i].clamp(0.0, 100.0) / 500.0;
            total += mix * form_scale * fitness_scale;
            n += 1;
        }
        if n == 0 {
            return 1.0;
        }
        let cohesion = self.sheet.morale as f64 + self.sheet.tactical_familiarity as f64 * 0.5;
        let cohesion_scale = 0.95 + cohesion / 1500.0;
        (total / n as f64) * cohesion_scale
    }

    fn overall_strength(&self) -> f64 {
        let mut total = 0.0;
        let mut n = 0u32;
        for &i in &self.on_field {
            let p = self.player(i);
            total += p.overall as f64 * (0.80 + self.fitness[i].clamp(0.0, 100.0) / 500.0);
            n += 1;
        }
        if n == 0 {
            1.0
        } else {
            total / n as f64
        }
    }

    fn fitness_mean(&self) -> f64 {
        if self.on_field.is_empty() {
            return 0.0;
        }
        let total: f64 = self.on_field.iter().map(|&i| self.fitness[i]).sum();
        total / self.on_field.len() as f64
    }

    fn drain_fitness(&mut self) {
        for &i in &self.on_field {
            self.fitness[i] = (self.fitness[i] - FITNESS_DRAIN_PER_MINUTE).max(0.0);
        }
    }

    fn remove_from_field(&mut self, idx: usize, minute: u8) {
        self.on_field.retain(|&i| i != idx);
        self.exited.insert(idx, minute);
    }

    fn tally(&mut self, idx: usize) -> &mut Tally {
        self.tallies.entry(idx).or_default()
    }

    /// Minutes on the pitch for everyone who appeared.
    fn minutes_played(&self) -> BTreeMap<String, u32> {
        let mut minutes = BTreeMap::new();
        for (&idx, &entered) in &self.entered {
            let exited = self.exited.get(&idx).copied().unwrap_or(90);
            minutes.insert(
                self.player(idx).id.clone(),
                (exited.saturating_sub(entered)).max(1) as u32,
            );
        }
        minutes
    }
}

#[derive(Debug)]
pub struct MatchEngine {
    plan_match_id: String,
    weather: Weather,
    importance: Importance,
    phase: MatchPhase,
    play_rng: DetRng,
    color_rng: DetRng,
    home: SideState,
    away: SideState,
    events: Vec<(u8, u8, EventPayload)>,
    commentary: Vec<String>,
    possession_home_acc: f64,
    possession_minutes: u32,
    attendance: u32,
    atmosphere: u8,
}

// Sub-order within a minute. Kick-off, fouls, cards, goals, substitutions.
const ORD_KICK_OFF: u8 = 0;
const ORD_FOUL: u8 = 1;
const ORD_FREE_KICK: u8 = 2;
const ORD_YELLOW: u8 = 3;
const ORD_RED: u8 = 4;
const ORD_CORNER: u8 = 5;
const ORD_OFFSIDE: u8 = 6;
const ORD_PENALTY: u8 = 7;
const ORD_GOAL: u8 = 8;
const ORD_INJURY: u8 = 9;
const ORD_SUB: u8 = 10;

impl MatchEngine {
    pub fn new(plan: MatchPlan) -> Result<Self, EngineError> {
        if plan.home.players.is_empty() || plan.away.players.is_empty() {
            return Err(EngineError::SnapshotMalformed("empty squad snapshot".into()));
        }
        if plan.home.team_id == plan.away.team_id {
            return Err(EngineError::SnapshotMalformed("a team cannot host itself".into()));
        }
        let play_rng = rng::derive(plan.world_seed, &[&plan.match_id]);
        let color_rng = rng::derive(plan.world_seed, &[&plan.match_id, "commentary"]);
        let home = SideState::new(plan.home)?;
        let away = SideState::new(plan.away)?;
        Ok(MatchEngine {
            plan_match_id: plan.match_id,
            weather: plan.weather,
            importance: plan.importance,
            phase: MatchPhase::Created,
            play_rng,
            color_rng,
            home,
            away,
            events: Vec::new(),
            commentary: Vec::new(),
            possession_home_acc: 0.0,
            possession_minutes: 0,
            attendance: 0,
            atmosphere: ATMOSPHERE_MIN,
        })
    }

    fn transition(&mut self, to: MatchPhase) -> Result<(), EngineError> {
        let legal = matches!(
            (self.phase, to),
            (MatchPhase::Created, MatchPhase::KickedOff)
                | (MatchPhase::KickedOff, MatchPhase::Running)
                | (MatchPhase::Running, MatchPhase::Ended)
        );
        if !legal {
            return Err(EngineError::IllegalTransition { from: self.phase, to });
        }
        self.phase = to;
        Ok(())
    }

    /// Run the full match. Consumes the engine's single lifecycle; calling
    /// it twice is an illegal transition.
    pub fn simulate(&mut self) -> Result<MatchReport, EngineError> {
        self.kick_off()?;
        self.transition(MatchPhase::Running)?;
        for minute in 1..=90u8 {
            self.tick(minute);
            self.home.drain_fitness();
            self.away.drain_fitness();
        }
        self.transition(MatchPhase::Ended)?;
        Ok(self.build_report())
    }

    fn kick_off(&mut self) -> Result<(), EngineError> {
        self.transition(MatchPhase::KickedOff)?;

        // Gate and mood are fixed at kickoff from reputation and billing.
        let importance_pull = match self.importance {
            Importance::Derby => 0.15,
            Importance::TitleRace => 0.12,
            Importance::Relegation => 0.08,
            Importance::Normal => 0.0,
        };
        let capacity = self.home.sheet.stadium_capacity.max(MIN_ATTENDANCE);
        let fill = 0.40
            + 0.35 * self.home.sheet.reputation as f64 / 100.0
            + importance_pull
            + self.play_rng.jitter(0.08);
        self.attendance =
            ((capacity as f64 * fill) as u32).clamp(MIN_ATTENDANCE, capacity);
        let fill_ratio = self.attendance as f64 / capacity as f64;
        let atmosphere = 30.0 + fill_ratio * 45.0 + importance_pull * 60.0;
        self.atmosphere =
            (atmosphere.round() as u8).clamp(ATMOSPHERE_MIN, ATMOSPHERE_MAX);

        self.events.push((
            0,
            ORD_KICK_OFF,
            EventPayload::MatchStarted {
                match_id: self.plan_match_id.clone(),
                attendance: self.attendance,
                atmosphere: self.atmosphere,
            },
        ));
        self.events.push((
            1,
            ORD_KICK_OFF,
            EventPayload::KickOff { match_id: self.plan_match_id.clone() },
        ));
        self.commentary
            .push(commentary::kick_off(&self.home.sheet.name, &self.away.sheet.name));
        Ok(())
    }

    fn tick(&mut self, minute: u8) {
        // Possession sampling is independent of whether anything happens.
        let hs = self.home.overall_strength();
        let as_ = self.away.overall_strength();
        let mut share = hs / (hs + as_).max(1.0);
        share = (share + self.play_rng.jitter(POSSESSION_JITTER)).clamp(0.05, 0.95);
        self.possession_home_acc += share;
        self.possession_minutes += 1;

        let home_attack = self.home.attack_strength() * HOME_ADVANTAGE;
        let away_attack = self.away.attack_strength();
        let modulation = ((home_attack + away_attack) / 140.0)
            .clamp(EVENT_RATE_MOD_MIN, EVENT_RATE_MOD_MAX);
        if !self.play_rng.chance(BASE_EVENT_RATE * modulation) {
            return;
        }

        // Cubed so a real quality gap shows up in results, not just in vibes.
        let home_cubed = home_attack.powi(3);
        let away_cubed = away_attack.powi(3);
        let p_home_attack = home_cubed / (home_cubed + away_cubed);
        let home_attacking = self.play_rng.chance(p_home_attack);

        let category = match self.play_rng.weighted(&EVENT_WEIGHTS) {
            Some(tag) => tag,
            None => return,
        };
        match category {
            "goal" => self.resolve_goal_chance(minute, home_attacking),
            "foul" => self.resolve_foul(minute, home_attacking),
            "yellow" => self.resolve_yellow(minute, home_attacking),
            "red" => self.resolve_straight_red(minute, home_attacking),
            "substitution" => self.resolve_substitution(minute),
            "corner" => self.resolve_corner(minute, home_attacking),
            "free_kick" => self.resolve_free_kick(minute, home_attacking),
            "offside" => self.resolve_offside(minute, home_attacking),
            "injury" => self.resolve_injury(minute),
            "penalty" => self.resolve_penalty(minute, home_attacking),
            _ => self.resolve_idle_attack(home_attacking),
        }
    }

    fn side(&mut self, home: bool) -> &mut SideState {
        if home {
            &mut self.home
        } else {
            &mut self.away
        }
    }

    fn side_ref(&self, home: bool) -> &SideState {
        if home {
            &self.home
        } else {
            &self.away
        }
    }

    fn resolve_goal_chance(&mut self, minute: u8, home_attacking: bool) {
        let fitness_mean = self.side_ref(home_attacking).fitness_mean();
        let weather_drag = match self.weather {
            Weather::Rainy | Weather::Snowy | Weather::Foggy => WEATHER_CONVERSION_PENALTY,
            _ => 0.0,
        };
        let conversion =
            GOAL_FITNESS_BASE + GOAL_FITNESS_SPAN * fitness_mean / 100.0 - weather_drag;
        if !self.play_rng.chance(conversion) {
            // A real chance, but saved or dragged wide.
            let on_target = self.play_rng.chance(SHOT_ON_TARGET_RATE);
            let side = self.side(home_attacking);
            side.stats.shots += 1;
            if on_target {
                side.stats.shots_on_target += 1;
            }
            return;
        }

        let scorer_idx = match self.pick_scorer(home_attacking) {
            Some(i) => i,
            None => return,
        };
        let assist_idx = self.pick_assister(home_attacking, scorer_idx);

        let (team_id, scorer_id, scorer_name) = {
            let side = self.side_ref(home_attacking);
            (
                side.sheet.team_id.clone(),
                side.player(scorer_idx).id.clone(),
                side.player(scorer_idx).name.clone(),
            )
        };
        let assist = assist_idx.map(|i| {
            let side = self.side_ref(home_attacking);
            (side.player(i).id.clone(), side.player(i).name.clone())
        });

        {
            let side = self.side(home_attacking);
            side.score += 1;
            side.stats.shots += 1;
            side.stats.shots_on_target += 1;
            side.tally(scorer_idx).goals += 1;
            if let Some(i) = assist_idx {
                side.tally(i).assists += 1;
            }
        }

        let side_name = self.side_ref(home_attacking).sheet.name.clone();
        let mut line = commentary::goal(
            &mut self.color_rng,
            minute,
            &scorer_name,
            &side_name,
            false,
        );
        if let Some((_, ref assist_name)) = assist {
            line.push_str(&commentary::assist_suffix(assist_name));
        }
        self.commentary.push(line);

        self.events.push((
            minute,
            ORD_GOAL,
            EventPayload::Goal {
                match_id: self.plan_match_id.clone(),
                minute,
                team_id,
                scorer_id,
                assist_id: assist.map(|(id, _)| id),
                penalty: false,
            },
        ));
    }

    fn pick_scorer(&mut self, home_attacking: bool) -> Option<usize> {
        let use_attacking_pool = self.play_rng.chance(SCORER_ATTACKING_POOL_RATE);
        let side = self.side_ref(home_attacking);
        let pool: Vec<usize> = if use_attacking_pool {
            let attackers: Vec<usize> =
                side.outfielders().filter(|&i| side.player(i).position.is_attacking()).collect();
            if attackers.is_empty() {
                side.outfielders().collect()
            } else {
                attackers
            }
        } else {
            side.outfielders().collect()
        };
        if pool.is_empty() {
            return None;
        }
        let weights: Vec<(String, f64)> = pool
            .iter()
            .map(|&i| {
                let p = side.player(i);
                let mut w = p.attributes.shooting as f64
                    + p.attributes.pace as f64
                    + p.form as f64;
                if p.traits.contains(&PlayerTrait::Clinical) {
                    w *= CLINICAL_SCORER_BONUS;
                }
                (p.id.clone(), w)
            })
            .collect();
        let id = self.play_rng.weighted_id(&weights)?;
        self.side_ref(home_attacking).index_by_id.get(&id).copied()
    }

    fn pick_assister(&mut self, home_attacking: bool, scorer_idx: usize) -> Option<usize> {
        if !self.play_rng.chance(ASSIST_RATE) {
            return None;
        }
        let side = self.side_ref(home_attacking);
        let weights: Vec<(String, f64)> = side
            .outfielders()
            .filter(|&i| i != scorer_idx)
            .map(|i| {
                let p = side.player(i);
                let mut w = p.attributes.passing as f64;
                if p.traits.contains(&PlayerTrait::Playmaker) {
                    w *= PLAYMAKER_ASSIST_BONUS;
                }
                (p.id.clone(), w)
            })
            .collect();
        let id = self.play_rng.weighted_id(&weights)?;
        self.side_ref(home_attacking).index_by_id.get(&id).copied()
    }

    fn resolve_foul(&mut self, minute: u8, home_attacking: bool) {
        // Fouls come from the side out of possession.
        let fouling_home = !home_attacking;
        let side = self.side_ref(fouling_home);
        let weights: Vec<(String, f64)> = side
            .outfielders()
            .map(|i| {
                let p = side.player(i);
                (p.id.clone(), (100.0 - p.attributes.defending as f64).max(1.0))
            })
            .collect();
        let Some(player_id) = self.play_rng.weighted_id(&weights) else { return };
        let severity = match self.play_rng.weighted(&[
            ("hard", 35.0),
            ("reckless", 10.0),
            ("soft", 55.0),
        ]) {
            Some("hard") => FoulSeverity::Hard,
            Some("reckless") => FoulSeverity::Reckless,
            _ => FoulSeverity::Soft,
        };
        let team_id = self.side_ref(fouling_home).sheet.team_id.clone();
        self.side(fouling_home).stats.fouls += 1;
        self.events.push((
            minute,
            ORD_FOUL,
            EventPayload::Foul {
                match_id: self.plan_match_id.clone(),
                minute,
                team_id,
                player_id,
                severity,
            },
        ));
    }

    fn resolve_yellow(&mut self, minute: u8, home_attacking: bool) {
        let carded_home = !home_attacking;
        let dissent = self.play_rng.chance(YELLOW_DISSENT_RATE);
        let side = self.side_ref(carded_home);
        let weights: Vec<(String, f64)> = side
            .outfielders()
            .map(|i| {
                let p = side.player(i);
                let mut w = if dissent {
                    (100.0 - p.morale as f64).max(1.0)
                } else {
                    (100.0 - p.attributes.defending as f64).max(1.0)
                };
                if dissent && p.traits.contains(&PlayerTrait::Temperamental) {
                    w *= TEMPERAMENTAL_DISSENT_BONUS;
                }
                (p.id.clone(), w)
            })
            .collect();
        let Some(player_id) = self.play_rng.weighted_id(&weights) else { return };
        let idx = self.side_ref(carded_home).index_by_id[&player_id];
        let player_name = self.side_ref(carded_home).player(idx).name.clone();
        let team_id = self.side_ref(carded_home).sheet.team_id.clone();

        let second = self.side_ref(carded_home).booked.contains(&idx);
        {
            let side = self.side(carded_home);
            side.booked.insert(idx);
            side.stats.yellow_cards += 1;
            side.tally(idx).yellows += 1;
        }
        self.commentary
            .push(commentary::yellow_card(&mut self.color_rng, minute, &player_name, dissent));
        self.events.push((
            minute,
            ORD_YELLOW,
            EventPayload::YellowCard {
                match_id: self.plan_match_id.clone(),
                minute,
                team_id: team_id.clone(),
                player_id: player_id.clone(),
                reason: if dissent { CardReason::Dissent } else { CardReason::Foul },
            },
        ));

        if second {
            {
                let side = self.side(carded_home);
                side.stats.red_cards += 1;
                side.tally(idx).reds += 1;
                side.remove_from_field(idx, minute);
            }
            self.commentary.push(commentary::red_card(minute, &player_name, true));
            self.events.push((
                minute,
                ORD_RED,
                EventPayload::RedCard {
                    match_id: self.plan_match_id.clone(),
                    minute,
                    team_id,
                    player_id,
                    second_yellow: true,
                },
            ));
        }
    }

    fn resolve_straight_red(&mut self, minute: u8, home_attacking: bool) {
        let carded_home = !home_attacking;
        let side = self.side_ref(carded_home);
        let weights: Vec<(String, f64)> = side
            .outfielders()
            .map(|i| {
                let p = side.player(i);
                (p.id.clone(), (100.0 - p.attributes.defending as f64).max(1.0))
            })
            .collect();
        let Some(player_id) = self.play_rng.weighted_id(&weights) else { return };
        let idx = self.side_ref(carded_home).index_by_id[&player_id];
        let player_name = self.side_ref(carded_home).player(idx).name.clone();
        let team_id = self.side_ref(carded_home).sheet.team_id.clone();
        {
            let side = self.side(carded_home);
            side.stats.red_cards += 1;
            side.tally(idx).reds += 1;
            side.remove_from_field(idx, minute);
        }
        self.commentary.push(commentary::red_card(minute, &player_name, false));
        self.events.push((
            minute,
            ORD_RED,
            EventPayload::RedCard {
                match_id: self.plan_match_id.clone(),
                minute,
                team_id,
                player_id,
                second_yellow: false,
            },
        ));
    }

    fn resolve_substitution(&mut self, minute: u8) {
        if minute < SUB_EARLIEST_MINUTE {
            return;
        }
        // The wearier bench acts first.
        let home_low = lowest_fitness_outfielder(&self.home);
        let away_low = lowest_fitness_outfielder(&self.away);
        let subbing_home = match (home_low, away_low) {
            (Some((_, hf)), Some((_, af))) => hf <= af,
            (Some(_), None) => true,
            (None, Some(_)) => false,
            (None, None) => return,
        };
        self.make_substitution(minute, subbing_home);
    }

    fn make_substitution(&mut self, minute: u8, subbing_home: bool) {
        let side = self.side_ref(subbing_home);
        if side.subs_used >= MAX_SUBS || side.bench.is_empty() {
            return;
        }
        let Some((off_idx, _)) = lowest_fitness_outfielder(side) else { return };
        let off_pos = side.player(off_idx).position;

        // Like-for-like first, then best available.
        let on_idx = side
            .bench
            .iter()
            .copied()
            .filter(|&i| same_family(side.player(i).position, off_pos))
            .max_by(|&a, &b| {
                side.player(a)
                    .overall
                    .cmp(&side.player(b).overall)
                    .then_with(|| side.player(b).id.cmp(&side.player(a).id))
            })
            .or_else(|| {
                side.bench
                    .iter()
                    .copied()
                    .filter(|&i| !side.player(i).position.is_goalkeeper())
                    .max_by(|&a, &b| {
                        side.player(a)
                            .overall
                            .cmp(&side.player(b).overall)
                            .then_with(|| side.player(b).id.cmp(&side.player(a).id))
                    })
            });
        let Some(on_idx) = on_idx else { return };

        let (team_id, team_name, off_id, off_name, on_id, on_name) = {
            let side = self.side_ref(subbing_home);
            (
                side.sheet.team_id.clone(),
                side.sheet.name.clone(),
                side.player(off_idx).id.clone(),
                side.player(off_idx).name.clone(),
                side.player(on_idx).id.clone(),
                side.player(on_idx).name.clone(),
            )
        };
        {
            let side = self.side(subbing_home);
            side.remove_from_field(off_idx, minute);
            side.bench.retain(|&i| i != on_idx);
            side.on_field.push(on_idx);
            side.entered.insert(on_idx, minute);
            side.subs_used += 1;
        }
        self.commentary.push(commentary::substitution(minute, &off_name, &on_name, &team_name));
        self.events.push((
            minute,
            ORD_SUB,
            EventPayload::Substitution {
                match_id: self.plan_match_id.clone(),
                minute,
                team_id,
                off_id,
                on_id,
            },
        ));
    }

    fn resolve_corner(&mut self, minute: u8, home_attacking: bool) {
        let team_id = self.side_ref(home_attacking).sheet.team_id.clone();
        let team_name = self.side_ref(home_attacking).sheet.name.clone();
        self.side(home_attacking).stats.corners += 1;
        self.commentary.push(commentary::corner(&mut self.color_rng, minute, &team_name));
        self.events.push((
            minute,
            ORD_CORNER,
            EventPayload::CornerKick { match_id: self.plan_match_id.clone(), minute, team_id },
        ));
    }

    fn resolve_free_kick(&mut self, minute: u8, home_attacking: bool) {
        let kick = if self.play_rng.chance(FREE_KICK_DIRECT_RATE) {
            FreeKickKind::Direct
        } else {
            FreeKickKind::Indirect
        };
        let location = if self.play_rng.chance(FREE_KICK_DANGEROUS_RATE) {
            FreeKickLocation::Dangerous
        } else {
            FreeKickLocation::Safe
        };
        let team_id = self.side_ref(home_attacking).sheet.team_id.clone();
        let team_name = self.side_ref(home_attacking).sheet.name.clone();
        self.side(home_attacking).stats.free_kicks += 1;
        self.commentary.push(commentary::free_kick(
            minute,
            &team_name,
            location == FreeKickLocation::Dangerous,
        ));
        self.events.push((
            minute,
            ORD_FREE_KICK,
            EventPayload::FreeKick {
                match_id: self.plan_match_id.clone(),
                minute,
                team_id,
                kick,
                location,
            },
        ));
    }

    fn resolve_offside(&mut self, minute: u8, home_attacking: bool) {
        let team_id = self.side_ref(home_attacking).sheet.team_id.clone();
        let team_name = self.side_ref(home_attacking).sheet.name.clone();
        self.side(home_attacking).stats.offsides += 1;
        self.commentary.push(commentary::offside(minute, &team_name));
        self.events.push((
            minute,
            ORD_OFFSIDE,
            EventPayload::Offside { match_id: self.plan_match_id.clone(), minute, team_id },
        ));
    }

    fn resolve_injury(&mut self, minute: u8) {
        let injured_home = self.play_rng.chance(0.5);
        let side = self.side_ref(injured_home);
        // Outfielders only; the contact game barely touches the keeper.
        let weights: Vec<(String, f64)> = side
            .outfielders()
            .map(|i| {
                let p = side.player(i);
                let mut w = 1.0 + (100.0 - side.fitness[i]) / 100.0;
                if p.traits.contains(&PlayerTrait::InjuryProne) {
                    w *= INJURY_PRONE_BONUS;
                }
                (p.id.clone(), w)
            })
            .collect();
        let Some(player_id) = self.play_rng.weighted_id(&weights) else { return };
        let idx = self.side_ref(injured_home).index_by_id[&player_id];
        let player_name = self.side_ref(injured_home).player(idx).name.clone();
        let team_id = self.side_ref(injured_home).sheet.team_id.clone();
        let severity = match self.play_rng.weighted(&[
            ("knock", 60.0),
            ("moderate", 30.0),
            ("severe", 10.0),
        ]) {
            Some("moderate") => InjurySeverity::Moderate,
            Some("severe") => InjurySeverity::Severe,
            _ => InjurySeverity::Knock,
        };
        self.side(injured_home).remove_from_field(idx, minute);
        self.commentary.push(commentary::injury(minute, &player_name));
        self.events.push((
            minute,
            ORD_INJURY,
            EventPayload::Injury {
                match_id: self.plan_match_id.clone(),
                minute,
                team_id,
                player_id,
                severity,
            },
        ));
        // Forced change if the bench allows it; injuries ignore the tactical
        // substitution window.
        if self.side_ref(injured_home).subs_used < MAX_SUBS {
            self.make_injury_replacement(minute, injured_home, idx);
        }
    }

    fn make_injury_replacement(&mut self, minute: u8, subbing_home: bool, off_idx: usize) {
        let side = self.side_ref(subbing_home);
        let off_pos = side.player(off_idx).position;
        let on_idx = side
            .bench
            .iter()
            .copied()
            .filter(|&i| {
                same_family(side.player(i).position, off_pos)
                    || (!off_pos.is_goalkeeper() && !side.player(i).position.is_goalkeeper())
            })
            .max_by(|&a, &b| {
                let fam_a = same_family(side.player(a).position, off_pos);
                let fam_b = same_family(side.player(b).position, off_pos);
                fam_a
                    .cmp(&fam_b)
                    .then_with(|| side.player(a).overall.cmp(&side.player(b).overall))
                    .then_with(|| side.player(b).id.cmp(&side.player(a).id))
            });
        let Some(on_idx) = on_idx else { return };

        let (team_id, team_name, off_id, off_name, on_id, on_name) = {
            let side = self.side_ref(subbing_home);
            (
                side.sheet.team_id.clone(),
                side.sheet.name.clone(),
                side.player(off_idx).id.clone(),
                side.player(off_idx).name.clone(),
                side.player(on_idx).id.clone(),
                side.player(on_idx).name.clone(),
            )
        };
        {
            let side = self.side(subbing_home);
            side.bench.retain(|&i| i != on_idx);
            side.on_field.push(on_idx);
            side.entered.insert(on_idx, minute);
            side.subs_used += 1;
        }
        self.commentary.push(commentary::substitution(minute, &off_name, &on_name, &team_name));
        self.events.push((
            minute,
            ORD_SUB,
            EventPayload::Substitution {
                match_id: self.plan_match_id.clone(),
                minute,
                team_id,
                off_id,
                on_id,
            },
        ));
    }

    fn resolve_penalty(&mut self, minute: u8, home_attacking: bool) {
        let side = self.side_ref(home_attacking);
        let taker_idx = side
            .outfielders()
            .max_by(|&a, &b| {
                side.player(a)
                    .attributes
                    .shooting
                    .cmp(&side.player(b).attributes.shooting)
                    .then_with(|| side.player(b).id.cmp(&side.player(a).id))
            });
        let Some(taker_idx) = taker_idx else { return };
        let converted = self.play_rng.chance(PENALTY_CONVERSION);

        let (team_id, team_name, taker_id, taker_name) = {
            let side = self.side_ref(home_attacking);
            (
                side.sheet.team_id.clone(),
                side.sheet.name.clone(),
                side.player(taker_idx).id.clone(),
                side.player(taker_idx).name.clone(),
            )
        };
        {
            let side = self.side(home_attacking);
            side.stats.penalties_awarded += 1;
            side.stats.shots += 1;
            side.stats.shots_on_target += 1;
        }
        self.commentary.push(commentary::penalty_awarded(minute, &team_name, converted));
        self.events.push((
            minute,
            ORD_PENALTY,
            EventPayload::PenaltyAwarded {
                match_id: self.plan_match_id.clone(),
                minute,
                team_id: team_id.clone(),
                taker_id: taker_id.clone(),
                converted,
            },
        ));

        if converted {
            {
                let side = self.side(home_attacking);
                side.score += 1;
                side.stats.penalties_scored += 1;
                side.tally(taker_idx).goals += 1;
            }
            self.commentary.push(commentary::goal(
                &mut self.color_rng,
                minute,
                &taker_name,
                &team_name,
                true,
            ));
            self.events.push((
                minute,
                ORD_GOAL,
                EventPayload::Goal {
                    match_id: self.plan_match_id.clone(),
                    minute,
                    team_id,
                    scorer_id: taker_id,
                    assist_id: None,
                    penalty: true,
                },
            ));
        }
    }

    fn resolve_idle_attack(&mut self, home_attacking: bool) {
        // A half-chance: counts a shot, no event.
        let on_target = self.play_rng.chance(SHOT_ON_TARGET_RATE);
        let side = self.side(home_attacking);
        side.stats.shots += 1;
        if on_target {
            side.stats.shots_on_target += 1;
        }
    }

    fn build_report(&mut self) -> MatchReport {
        let home_possession = ((self.possession_home_acc
            / self.possession_minutes.max(1) as f64)
            * 100.0)
            .round()
            .clamp(1.0, 99.0) as u8;
        self.home.stats.possession = home_possession;
        self.away.stats.possession = 100 - home_possession;

        self.commentary.push(commentary::full_time(
            &self.home.sheet.name,
            self.home.score,
            &self.away.sheet.name,
            self.away.score,
        ));

        let mut minutes = self.home.minutes_played();
        minutes.extend(self.away.minutes_played());

        let mut player_ratings = BTreeMap::new();
        for (side, conceded) in
            [(&self.home, self.away.score), (&self.away, self.home.score)]
        {
            for (&idx, _) in &side.entered {
                let p = side.player(idx);
                let tally = side.tallies.get(&idx).cloned().unwrap_or_default();
                let rating = ratings::rate(&ratings::RatingInput {
                    goals: tally.goals,
                    assists: tally.assists,
                    yellows: tally.yellows,
                    reds: tally.reds,
                    is_keeper: p.position.is_goalkeeper(),
                    team_conceded: conceded,
                    form: p.form,
                    fitness: side.fitness[idx],
                });
                player_ratings.insert(p.id.clone(), rating);
            }
        }

        self.events.sort_by_key(|(minute, order, _)| (*minute, *order));
        let mut payloads: Vec<EventPayload> =
            self.events.drain(..).map(|(_, _, p)| p).collect();
        payloads.push(EventPayload::MatchEnded {
            match_id: self.plan_match_id.clone(),
            home_score: self.home.score,
            away_score: self.away.score,
            stats: MatchStats {
                home: self.home.stats.clone(),
                away: self.away.stats.clone(),
                minutes,
            },
            commentary: std::mem::take(&mut self.commentary),
            player_ratings,
        });

        MatchReport {
            match_id: self.plan_match_id.clone(),
            home_score: self.home.score,
            away_score: self.away.score,
            payloads,
        }
    }
}

fn lowest_fitness_outfielder(side: &SideState) -> Option<(usize, f64)> {
    side.outfielders()
        .map(|i| (i, side.fitness[i]))
        .min_by(|(ia, fa), (ib, fb)| {
            fa.partial_cmp(fb)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| side.player(*ia).id.cmp(&side.player(*ib).id))
        })
}

fn same_family(a: Position, b: Position) -> bool {
    (a.is_goalkeeper() && b.is_goalkeeper())
        || (a.is_defender() && b.is_defender())
        || (a.is_midfielder() && b.is_midfielder())
        || (a.is_forward() && b.is_forward())
}
