//! Engine tuning constants.
//!
//! Public so the statistical tests can assert the produced distributions
//! against the same numbers the sampler consumes.

/// Chance that a minute resolves into an event at all, before strength
/// modulation.
pub const BASE_EVENT_RATE: f64 = 0.42;

/// Strength modulation bounds applied to [`BASE_EVENT_RATE`].
pub const EVENT_RATE_MOD_MIN: f64 = 0.85;
pub const EVENT_RATE_MOD_MAX: f64 = 1.15;

/// Home side strength multiplier.
pub const HOME_ADVANTAGE: f64 = 1.15;

/// Per-resolved-minute category weights, in percent. They sum to 100.
pub const GOAL_WEIGHT: f64 = 6.0;
pub const FOUL_WEIGHT: f64 = 24.0;
pub const YELLOW_WEIGHT: f64 = 8.5;
pub const RED_WEIGHT: f64 = 0.5;
pub const SUBSTITUTION_WEIGHT: f64 = 6.0;
pub const CORNER_WEIGHT: f64 = 16.0;
pub const FREE_KICK_WEIGHT: f64 = 15.0;
pub const OFFSIDE_WEIGHT: f64 = 6.0;
pub const INJURY_WEIGHT: f64 = 1.5;
pub const PENALTY_WEIGHT: f64 = 0.5;
pub const IDLE_WEIGHT: f64 = 16.0;

pub const EVENT_WEIGHTS: [(&str, f64); 11] = [
    ("goal", GOAL_WEIGHT),
    ("foul", FOUL_WEIGHT),
    ("yellow", YELLOW_WEIGHT),
    ("red", RED_WEIGHT),
    ("substitution", SUBSTITUTION_WEIGHT),
    ("corner", CORNER_WEIGHT),
    ("free_kick", FREE_KICK_WEIGHT),
    ("offside", OFFSIDE_WEIGHT),
    ("injury", INJURY_WEIGHT),
    ("penalty", PENALTY_WEIGHT),
    ("idle", IDLE_WEIGHT),
];

/// Goal conversion scale from the attacking lineup's live fitness mean.
pub const GOAL_FITNESS_BASE: f64 = 0.55;
pub const GOAL_FITNESS_SPAN: f64 = 0.45;

/// Conversion drag in bad conditions.
pub const WEATHER_CONVERSION_PENALTY: f64 = 0.05;

/// Scorer sampling: share drawn from the attacking-position pool.
pub const SCORER_ATTACKING_POOL_RATE: f64 = 0.85;
/// Share of goals carrying an assist.
pub const ASSIST_RATE: f64 = 0.60;

pub const PENALTY_CONVERSION: f64 = 0.75;
/// Non-goal shots that still test the keeper.
pub const SHOT_ON_TARGET_RATE: f64 = 0.45;

pub const FREE_KICK_DIRECT_RATE: f64 = 0.80;
pub const FREE_KICK_DANGEROUS_RATE: f64 = 0.30;

/// Card mix inside the yellow category.
pub const YELLOW_DISSENT_RATE: f64 = 0.30;

/// Substitutions: earliest minute and per-team cap.
pub const SUB_EARLIEST_MINUTE: u8 = 45;
pub const MAX_SUBS: u8 = 3;

/// On-field fitness drain per simulated minute.
pub const FITNESS_DRAIN_PER_MINUTE: f64 = 0.5;

/// Possession jitter bound per minute (fraction of share).
pub const POSSESSION_JITTER: f64 = 0.05;

/// Trait multipliers.
pub const CLINICAL_SCORER_BONUS: f64 = 1.15;
pub const PLAYMAKER_ASSIST_BONUS: f64 = 1.15;
pub const TEMPERAMENTAL_DISSENT_BONUS: f64 = 1.5;
pub const INJURY_PRONE_BONUS: f64 = 1.5;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn category_weights_sum_to_one_hundred() {
        let total: f64 = EVENT_WEIGHTS.iter().map(|(_, w)| w).sum();
        assert!((total - 100.0).abs() < 1e-9, "weights sum to {}", total);
    }
}
