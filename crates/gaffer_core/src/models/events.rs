//! The event vocabulary.
//!
//! Every state change in the world is one of these variants, appended to the
//! durable log and folded back through [`crate::models::World::apply`]. The
//! serialized payload is self-describing: the `kind` field is the serde tag,
//! duplicated into the store's `kind` column for querying. Events are
//! immutable once appended.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::fixture::{Importance, Weather};
use super::player::InjurySeverity;

/// Envelope around a payload; the timestamp is derived from the match
/// calendar, never from the wall clock.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Event {
    pub timestamp: NaiveDateTime,
    #[serde(flatten)]
    pub payload: EventPayload,
}

impl Event {
    pub fn new(timestamp: NaiveDateTime, payload: EventPayload) -> Self {
        Self { timestamp, payload }
    }

    pub fn kind(&self) -> &'static str {
        self.payload.kind()
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CardReason {
    Foul,
    Dissent,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FoulSeverity {
    Soft,
    Hard,
    Reckless,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FreeKickKind {
    Direct,
    Indirect,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum FreeKickLocation {
    Dangerous,
    Safe,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum TargetKind {
    Player,
    Team,
    Owner,
}

/// Soft fields the collaborator may propose against; everything else is
/// engine-owned hard state.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum SoftField {
    Form,
    Morale,
    Fitness,
    Reputation,
    PublicApproval,
    TeamRapport,
}

impl SoftField {
    pub fn name(&self) -> &'static str {
        match self {
            SoftField::Form => "form",
            SoftField::Morale => "morale",
            SoftField::Fitness => "fitness",
            SoftField::Reputation => "reputation",
            SoftField::PublicApproval => "public_approval",
            SoftField::TeamRapport => "team_rapport",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OwnerMood {
    Delighted,
    Content,
    Concerned,
    Furious,
}

/// One side's final-whistle numbers.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct TeamMatchStats {
    pub possession: u8,
    pub shots: u32,
    pub shots_on_target: u32,
    pub corners: u32,
    pub fouls: u32,
    pub offsides: u32,
    pub free_kicks: u32,
    pub penalties_awarded: u32,
    pub penalties_scored: u32,
    pub yellow_cards: u32,
    pub red_cards: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct MatchStats {
    pub home: TeamMatchStats,
    pub away: TeamMatchStats,
    /// Minutes on the pitch per participating player id.
    pub minutes: BTreeMap<String, u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum EventPayload {
    MatchScheduled {
        match_id: String,
        league_id: String,
        season: u32,
        matchday: u32,
        home_id: String,
        away_id: String,
        date: NaiveDate,
        weather: Weather,
        importance: Importance,
    },
    MatchStarted {
        match_id: String,
        attendance: u32,
        atmosphere: u8,
    },
    KickOff {
        match_id: String,
    },
    Goal {
        match_id: String,
        minute: u8,
        team_id: String,
        scorer_id: String,
        assist_id: Option<String>,
        penalty: bool,
    },
    YellowCard {
        match_id: String,
        minute: u8,
        team_id: String,
        player_id: String,
        reason: CardReason,
    },
    RedCard {
        match_id: String,
        minute: u8,
        team_id: String,
        player_id: String,
        second_yellow: bool,
    },
    Substitution {
        match_id: String,
        minute: u8,
        team_id: String,
        off_id: String,
        on_id: String,
    },
    Injury {
        match_id: String,
        minute: u8,
        team_id: String,
        player_id: String,
        severity: InjurySeverity,
    },
    CornerKick {
        match_id: String,
        minute: u8,
        team_id: String,
    },
    Foul {
        match_id: String,
        minute: u8,
        team_id: String,
        player_id: String,
        severity: FoulSeverity,
    },
    FreeKick {
        match_id: String,
        minute: u8,
        team_id: String,
        #[serde(rename = "free_kick_kind")]
        kick: FreeKickKind,
        location: FreeKickLocation,
    },
    PenaltyAwarded {
        match_id: String,
        minute: u8,
        team_id: String,
        taker_id: String,
        converted: bool,
    },
    Offside {
        match_id: String,
        minute: u8,
        team_id: String,
    },
    MatchEnded {
        match_id: String,
        home_score: u32,
        away_score: u32,
        stats: MatchStats,
        commentary: Vec<String>,
        /// Final rating per participating player id, one decimal in [1.0, 10.0].
        player_ratings: BTreeMap<String, f64>,
    },
    MatchAborted {
        match_id: String,
        reason: String,
    },
    SoftStateUpdated {
        target_kind: TargetKind,
        target_id: String,
        field: SoftField,
        value: u8,
    },
    ValidationFailed {
        context: String,
        reason: String,
    },
    SeasonEnded {
        league_id: String,
        season: u32,
        champion_id: String,
        top_scorer: Option<(String, u32)>,
        top_assister: Option<(String, u32)>,
        most_clean_sheets: Option<(String, u32)>,
    },
    MediaStory {
        outlet_id: String,
        headline: String,
        body: String,
        subject_team_id: Option<String>,
    },
    OwnerStatement {
        owner_id: String,
        team_id: String,
        mood: OwnerMood,
        quote: String,
    },
    HeadToHeadUpdated {
        team_id: String,
        opponent_id: String,
        wins: u32,
        draws: u32,
        losses: u32,
    },
}

impl EventPayload {
    /// Stable kind tag; must match the serde discriminator exactly.
    pub fn kind(&self) -> &'static str {
        match self {
            EventPayload::MatchScheduled { .. } => "match_scheduled",
            EventPayload::MatchStarted { .. } => "match_started",
            EventPayload::KickOff { .. } => "kick_off",
            EventPayload::Goal { .. } => "goal",
            EventPayload::YellowCard { .. } => "yellow_card",
            EventPayload::RedCard { .. } => "red_card",
            EventPayload::Substitution { .. } => "substitution",
            EventPayload::Injury { .. } => "injury",
            EventPayload::CornerKick { .. } => "corner_kick",
            EventPayload::Foul { .. } => "foul",
            EventPayload::FreeKick { .. } => "free_kick",
            EventPayload::PenaltyAwarded { .. } => "penalty_awarded",
            EventPayload::Offside { .. } => "offside",
            EventPayload::MatchEnded { .. } => "match_ended",
            EventPayload::MatchAborted { .. } => "match_aborted",
            EventPayload::SoftStateUpdated { .. } => "soft_state_updated",
            EventPayload::ValidationFailed { .. } => "validation_failed",
            EventPayload::SeasonEnded { .. } => "season_ended",
            EventPayload::MediaStory { .. } => "media_story",
            EventPayload::OwnerStatement { .. } => "owner_statement",
            EventPayload::HeadToHeadUpdated { .. } => "head_to_head_updated",
        }
    }

    /// Match id for match-scoped events, if any.
    pub fn match_id(&self) -> Option<&str> {
        match self {
            EventPayload::MatchScheduled { match_id, .. }
            | EventPayload::MatchStarted { match_id, .. }
            | EventPayload::KickOff { match_id }
            | EventPayload::Goal { match_id, .. }
            | EventPayload::YellowCard { match_id, .. }
            | EventPayload::RedCard { match_id, .. }
            | EventPayload::Substitution { match_id, .. }
            | EventPayload::Injury { match_id, .. }
            | EventPayload::CornerKick { match_id, .. }
            | EventPayload::Foul { match_id, .. }
            | EventPayload::FreeKick { match_id, .. }
            | EventPayload::PenaltyAwarded { match_id, .. }
            | EventPayload::Offside { match_id, .. }
            | EventPayload::MatchEnded { match_id, .. }
            | EventPayload::MatchAborted { match_id, .. } => Some(match_id),
            _ => None,
        }
    }
}
