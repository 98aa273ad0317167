//! Soft-state proposals: the only door nondeterminism gets into the world,
//! and it is a narrow one. A collaborator (LLM-backed or offline) returns
//! raw `{target, field, value}` proposals; the validator clamps and
//! sanity-checks them into `SoftStateUpdated` events or rejects them with
//! `ValidationFailed`. Validation is pure: no RNG, no I/O, stable order.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;
use thiserror::Error;

use crate::config::Config;
use crate::models::events::{EventPayload, SoftField, TargetKind};
use crate::models::World;

/// Raw collaborator output, deliberately stringly-typed: the provider is
/// outside the trust boundary and may emit anything.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SoftStateProposal {
    pub target_kind: String,
    pub target_id: String,
    pub field: String,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MatchdayPhase {
    PreMatch,
    PostMatch,
}

impl MatchdayPhase {
    pub fn label(&self) -> &'static str {
        match self {
            MatchdayPhase::PreMatch => "pre_match",
            MatchdayPhase::PostMatch => "post_match",
        }
    }
}

/// One settled match as the collaborator sees it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchBrief {
    pub match_id: String,
    pub home_id: String,
    pub away_id: String,
    pub home_score: u32,
    pub away_score: u32,
    /// Player ids who got minutes.
    pub participants: Vec<String>,
}

/// What the orchestrator shows the collaborator for one matchday.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct MatchdayContext {
    pub season: u32,
    /// League id -> matchday being played.
    pub matchdays: BTreeMap<String, u32>,
    /// Empty pre-match; the settled batch post-match.
    pub results: Vec<MatchBrief>,
}

#[derive(Error, Debug)]
#[error("soft-state collaborator failed: {0}")]
pub struct CollaboratorError(pub String);

/// The capability boundary. Implementations must be pure output: same
/// inputs, same proposals, no hidden state.
pub trait SoftStateCollaborator: Send + Sync {
    fn name(&self) -> &'static str;

    fn propose(
        &self,
        world: &World,
        phase: MatchdayPhase,
        ctx: &MatchdayContext,
    ) -> Result<Vec<SoftStateProposal>, CollaboratorError>;
}

/// Reputation may move at most this much per target per matchday.
pub const REPUTATION_MATCHDAY_CAP: i64 = 5;

/// Tracks reputation movement already granted this matchday, keyed by
/// target id. Owned by the orchestrator for the span of one `advance`.
pub type ReputationLedger = BTreeMap<String, i64>;

/// Clamp and check a proposal batch into events.
///
/// Accepted proposals become `SoftStateUpdated`; everything else becomes a
/// `ValidationFailed` (never an error - a bad proposal must not take the
/// matchday down). Batch application order is stable `(target_id, field)`.
pub fn validate_batch(
    world: &World,
    phase: MatchdayPhase,
    mut proposals: Vec<SoftStateProposal>,
    ledger: &mut ReputationLedger,
) -> Vec<EventPayload> {
    proposals.sort_by(|a, b| {
        a.target_id.cmp(&b.target_id).then_with(|| a.field.cmp(&b.field))
    });

    let mut out = Vec::with_capacity(proposals.len());
    for proposal in proposals {
        match validate_one(world, &proposal, ledger) {
            Ok(payload) => out.push(payload),
            Err(reason) => {
                log::debug!("proposal rejected ({}): {}", phase.label(), reason);
                out.push(EventPayload::ValidationFailed {
                    context: phase.label().to_string(),
                    reason,
                });
            }
        }
    }
    out
}

fn validate_one(
    world: &World,
    proposal: &SoftStateProposal,
    ledger: &mut ReputationLedger,
) -> Result<EventPayload, String> {
    if !proposal.value.is_finite() {
        return Err(format!(
            "non-finite value for {}.{}",
            proposal.target_id, proposal.field
        ));
    }

    let target_kind = match proposal.target_kind.as_str() {
        "player" => TargetKind::Player,
        "team" => TargetKind::Team,
        "owner" => TargetKind::Owner,
        other => return Err(format!("unknown target kind `{}`", other)),
    };

    // Derived-only fields are never LLM-writable, whatever the target.
    if matches!(proposal.field.as_str(), "recent_form" | "head_to_head") {
        return Err(format!("field `{}` is derived, not writable", proposal.field));
    }

    let field = match proposal.field.as_str() {
        "form" => SoftField::Form,
        "morale" => SoftField::Morale,
        "fitness" => SoftField::Fitness,
        "reputation" => SoftField::Reputation,
        "public_approval" => SoftField::PublicApproval,
        "team_rapport" => SoftField::TeamRapport,
        other => return Err(format!("unknown field `{}`", other)),
    };

    let current: u8 = match (target_kind, field) {
        (TargetKind::Player, SoftField::Form) => lookup_player(world, proposal)?.form,
        (TargetKind::Player, SoftField::Morale) => lookup_player(world, proposal)?.morale,
        (TargetKind::Player, SoftField::Fitness) => lookup_player(world, proposal)?.fitness,
        (TargetKind::Player, SoftField::Reputation) => lookup_player(world, proposal)?.reputation,
        (TargetKind::Team, SoftField::Morale) => lookup_team(world, proposal)?.morale,
        (TargetKind::Team, SoftField::TeamRapport) => lookup_team(world, proposal)?.rapport,
        (TargetKind::Team, SoftField::Reputation) => lookup_team(world, proposal)?.reputation,
        (TargetKind::Owner, SoftField::PublicApproval) => world
            .owners
            .get(&proposal.target_id)
            .ok_or_else(|| format!("unknown owner id `{}`", proposal.target_id))?
            .public_approval,
        (kind, field) => {
            return Err(format!(
                "field `{}` not writable on target kind `{:?}`",
                field.name(),
                kind
            ))
        }
    };

    let value = if field == SoftField::Reputation {
        let desired = proposal.value.round().clamp(1.0, 100.0) as i64;
        let requested_delta = desired - current as i64;
        let used: i64 = ledger.get(&proposal.target_id).copied().unwrap_or(0);
        let remaining = (REPUTATION_MATCHDAY_CAP - used.abs()).max(0);
        if remaining == 0 && requested_delta != 0 {
            return Err(format!(
                "reputation change for `{}` exceeds the per-matchday cap",
                proposal.target_id
            ));
        }
        let granted = requested_delta.clamp(-remaining, remaining);
        *ledger.entry(proposal.target_id.clone()).or_default() += granted;
        (current as i64 + granted).clamp(1, 100) as u8
    } else {
        proposal.value.round().clamp(0.0, 100.0) as u8
    };

    Ok(EventPayload::SoftStateUpdated {
        target_kind,
        target_id: proposal.target_id.clone(),
        field,
        value,
    })
}

fn lookup_player<'w>(
    world: &'w World,
    proposal: &SoftStateProposal,
) -> Result<&'w crate::models::Player, String> {
    world
        .players
        .get(&proposal.target_id)
        .ok_or_else(|| format!("unknown player id `{}`", proposal.target_id))
}

fn lookup_team<'w>(
    world: &'w World,
    proposal: &SoftStateProposal,
) -> Result<&'w crate::models::Team, String> {
    world
        .teams
        .get(&proposal.target_id)
        .ok_or_else(|| format!("unknown team id `{}`", proposal.target_id))
}

/// No collaborator at all: every phase returns an empty batch.
pub struct NoopCollaborator;

impl SoftStateCollaborator for NoopCollaborator {
    fn name(&self) -> &'static str {
        "none"
    }

    fn propose(
        &self,
        _world: &World,
        _phase: MatchdayPhase,
        _ctx: &MatchdayContext,
    ) -> Result<Vec<SoftStateProposal>, CollaboratorError> {
        Ok(Vec::new())
    }
}

/// Offline rule-based collaborator; stands in for the LLM provider and
/// satisfies the same contract, so the two are interchangeable.
///
/// Post-match: winners' dressing rooms lift, losers' sag, and everyone who
/// played is tired. Pre-match: a week of training recovers fitness. Values
/// are proposed raw; the validator owns the clamping.
pub struct FormGuideCollaborator;

impl SoftStateCollaborator for FormGuideCollaborator {
    fn name(&self) -> &'static str {
        "offline"
    }

    fn propose(
        &self,
        world: &World,
        phase: MatchdayPhase,
        ctx: &MatchdayContext,
    ) -> Result<Vec<SoftStateProposal>, CollaboratorError> {
        let mut proposals = Vec::new();
        match phase {
            MatchdayPhase::PreMatch => {
                for player in world.players.values() {
                    if player.fitness < 95 {
                        proposals.push(SoftStateProposal {
                            target_kind: "player".into(),
                            target_id: player.id.clone(),
                            field: "fitness".into(),
                            value: player.fitness as f64 + 12.0,
                        });
                    }
                }
            }
            MatchdayPhase::PostMatch => {
                for brief in &ctx.results {
                    let (winner, loser) = if brief.home_score > brief.away_score {
                        (Some(&brief.home_id), Some(&brief.away_id))
                    } else if brief.away_score > brief.home_score {
                        (Some(&brief.away_id), Some(&brief.home_id))
                    } else {
                        (None, None)
                    };
                    if let Some(winner) = winner {
                        if let Some(team) = world.teams.get(winner) {
                            proposals.push(SoftStateProposal {
                                target_kind: "team".into(),
                                target_id: team.id.clone(),
                                field: "morale".into(),
                                value: team.morale as f64 + 4.0,
                            });
                        }
                    }
                    if let Some(loser) = loser {
                        if let Some(team) = world.teams.get(loser) {
                            proposals.push(SoftStateProposal {
                                target_kind: "team".into(),
                                target_id: team.id.clone(),
                                field: "morale".into(),
                                value: team.morale as f64 - 4.0,
                            });
                        }
                    }
                    for player_id in &brief.participants {
                        if let Some(player) = world.players.get(player_id) {
                            proposals.push(SoftStateProposal {
                                target_kind: "player".into(),
                                target_id: player.id.clone(),
                                field: "fitness".into(),
                                value: player.fitness as f64 - 15.0,
                            });
                        }
                    }
                }
            }
        }
        Ok(proposals)
    }
}

/// Pick the collaborator the environment asked for.
pub fn from_config(config: &Config) -> Arc<dyn SoftStateCollaborator> {
    match config.llm_provider.as_str() {
        "none" => Arc::new(NoopCollaborator),
        other => {
            if other != "offline" {
                log::warn!("unknown LLM_PROVIDER `{}`; using the offline collaborator", other);
            }
            Arc::new(FormGuideCollaborator)
        }
    }
}
