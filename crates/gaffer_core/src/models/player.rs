use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Pitch position register.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(test, derive(strum_macros::EnumIter))]
#[serde(rename_all = "UPPERCASE")]
pub enum Position {
    GK,
    CB,
    LB,
    RB,
    CM,
    LM,
    RM,
    CAM,
    LW,
    RW,
    ST,
}

impl Position {
    pub fn is_goalkeeper(&self) -> bool {
        matches!(self, Position::GK)
    }

    pub fn is_defender(&self) -> bool {
        matches!(self, Position::CB | Position::LB | Position::RB)
    }

    pub fn is_midfielder(&self) -> bool {
        matches!(self, Position::CM | Position::LM | Position::RM | Position::CAM)
    }

    pub fn is_forward(&self) -> bool {
        matches!(self, Position::LW | Position::RW | Position::ST)
    }

    /// Positions that dominate the scorer pool (85% of goal samples).
    pub fn is_attacking(&self) -> bool {
        matches!(self, Position::CAM | Position::LW | Position::RW | Position::ST)
    }

    pub fn code(&self) -> &'static str {
        match self {
            Position::GK => "GK",
            Position::CB => "CB",
            Position::LB => "LB",
            Position::RB => "RB",
            Position::CM => "CM",
            Position::LM => "LM",
            Position::RM => "RM",
            Position::CAM => "CAM",
            Position::LW => "LW",
            Position::RW => "RW",
            Position::ST => "ST",
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum PreferredFoot {
    Left,
    #[default]
    Right,
    Both,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum WorkRate {
    Low,
    #[default]
    Medium,
    High,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum PlayerTrait {
    Leader,
    Clinical,
    Playmaker,
    Workhorse,
    InjuryProne,
    Temperamental,
    FanFavourite,
    BigGamePlayer,
}

/// Five core attributes.
/// - Range: 1..=99 each
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Attributes {
    pub pace: u8,
    pub shooting: u8,
    pub passing: u8,
    pub defending: u8,
    pub physicality: u8,
}

impl Attributes {
    pub fn clamped(self) -> Self {
        Self {
            pace: self.pace.clamp(1, 99),
            shooting: self.shooting.clamp(1, 99),
            passing: self.passing.clamp(1, 99),
            defending: self.defending.clamp(1, 99),
            physicality: self.physicality.clamp(1, 99),
        }
    }

    pub fn mean(&self) -> f64 {
        (self.pace as f64
            + self.shooting as f64
            + self.passing as f64
            + self.defending as f64
            + self.physicality as f64)
            / 5.0
    }
}

/// Per-season aggregates, keyed by season in [`Player::season_stats`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SeasonStats {
    pub apps: u32,
    pub goals: u32,
    pub assists: u32,
    pub yellows: u32,
    pub reds: u32,
    pub minutes: u32,
    /// Mean match rating over `apps`, one decimal.
    pub avg_rating: f64,
}

impl SeasonStats {
    /// Fold one appearance into the running average.
    pub fn record_appearance(&mut self, minutes: u32, rating: f64) {
        let total = self.avg_rating * self.apps as f64 + rating;
        self.apps += 1;
        self.minutes += minutes;
        self.avg_rating = (total / self.apps as f64 * 10.0).round() / 10.0;
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord)]
#[serde(rename_all = "snake_case")]
pub enum InjurySeverity {
    Knock,
    Moderate,
    Severe,
}

impl InjurySeverity {
    /// Matchdays out, used by the recovery pass.
    pub fn matchdays_out(&self) -> u32 {
        match self {
            InjurySeverity::Knock => 1,
            InjurySeverity::Moderate => 2,
            InjurySeverity::Severe => 5,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InjuryRecord {
    pub season: u32,
    pub matchday: u32,
    pub severity: InjurySeverity,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Award {
    pub season: u32,
    pub name: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Player {
    pub id: String,
    pub name: String,
    pub team_id: String,
    pub position: Position,
    pub age: u8,
    pub attributes: Attributes,
    /// Soft state, LLM-adjustable through the validator.
    /// - Range: 0..=100 each
    pub form: u8,
    pub morale: u8,
    pub fitness: u8,
    /// - Range: 1..=100
    pub reputation: u8,
    pub preferred_foot: PreferredFoot,
    /// - Range: 1..=5
    pub weak_foot: u8,
    /// - Range: 1..=5
    pub skill_moves: u8,
    pub traits: Vec<PlayerTrait>,
    pub work_rate: (WorkRate, WorkRate),
    /// Ceiling; never drops below the derived overall rating.
    pub potential: u8,
    pub injured: bool,
    /// Matchdays until fit again; 0 when healthy.
    #[serde(default)]
    pub injury_matchdays_left: u32,
    pub yellow_cards_season: u32,
    pub red_cards_season: u32,
    pub season_stats: BTreeMap<u32, SeasonStats>,
    pub injury_history: Vec<InjuryRecord>,
    pub awards: Vec<Award>,
}

impl Player {
    /// Derived overall, weighted by position family.
    pub fn overall_rating(&self) -> u8 {
        let a = &self.attributes;
        let (pace, shoot, pass, def, phys) = (
            a.pace as f64,
            a.shooting as f64,
            a.passing as f64,
            a.defending as f64,
            a.physicality as f64,
        );
        let overall = if self.position.is_goalkeeper() {
            def * 0.45 + phys * 0.30 + pass * 0.15 + pace * 0.10
        } else if self.position.is_defender() {
            def * 0.45 + phys * 0.25 + pace * 0.15 + pass * 0.15
        } else if self.position.is_midfielder() {
            pass * 0.40 + shoot * 0.20 + pace * 0.15 + def * 0.10 + phys * 0.15
        } else {
            shoot * 0.40 + pace * 0.30 + pass * 0.15 + phys * 0.15
        };
        (overall.round() as u8).clamp(1, 99)
    }

    pub fn has_trait(&self, t: PlayerTrait) -> bool {
        self.traits.contains(&t)
    }

    /// Clamp every mutable range field and restore `potential >= overall`.
    pub fn normalize(&mut self) {
        self.attributes = self.attributes.clamped();
        self.form = self.form.min(100);
        self.morale = self.morale.min(100);
        self.fitness = self.fitness.min(100);
        self.reputation = self.reputation.clamp(1, 100);
        self.weak_foot = self.weak_foot.clamp(1, 5);
        self.skill_moves = self.skill_moves.clamp(1, 5);
        self.potential = self.potential.max(self.overall_rating());
    }

    pub fn season_entry(&mut self, season: u32) -> &mut SeasonStats {
        self.season_stats.entry(season).or_default()
    }

    /// Per-season counters wiped at rollover.
    pub fn reset_season_counters(&mut self) {
        self.yellow_cards_season = 0;
        self.red_cards_season = 0;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_player() -> Player {
        Player {
            id: "player-test-1".into(),
            name: "Test Player".into(),
            team_id: "team-test".into(),
            position: Position::ST,
            age: 24,
            attributes: Attributes {
                pace: 80,
                shooting: 85,
                passing: 70,
                defending: 35,
                physicality: 75,
            },
            form: 60,
            morale: 60,
            fitness: 95,
            reputation: 55,
            preferred_foot: PreferredFoot::Right,
            weak_foot: 3,
            skill_moves: 4,
            traits: vec![PlayerTrait::Clinical],
            work_rate: (WorkRate::High, WorkRate::Low),
            potential: 90,
            injured: false,
            injury_matchdays_left: 0,
            yellow_cards_season: 0,
            red_cards_season: 0,
            season_stats: BTreeMap::new(),
            injury_history: Vec::new(),
            awards: Vec::new(),
        }
    }

    #[test]
    fn overall_weights_striker_toward_shooting() {
        let striker = sample_player();
        let mut stopper = sample_player();
        stopper.position = Position::CB;
        assert!(
            striker.overall_rating() > stopper.overall_rating(),
            "same attributes should rate higher in the attacking role: {} vs {}",
            striker.overall_rating(),
            stopper.overall_rating()
        );
    }

    #[test]
    fn normalize_clamps_and_preserves_potential_floor() {
        let mut p = sample_player();
        p.form = 250;
        p.reputation = 0;
        p.weak_foot = 9;
        p.potential = 1;
        p.normalize();
        assert_eq!(p.form, 100);
        assert_eq!(p.reputation, 1);
        assert_eq!(p.weak_foot, 5);
        assert!(p.potential >= p.overall_rating(), "potential floor broken");
    }

    #[test]
    fn appearance_average_keeps_one_decimal() {
        let mut stats = SeasonStats::default();
        stats.record_appearance(90, 7.0);
        stats.record_appearance(90, 8.0);
        assert_eq!(stats.apps, 2);
        assert_eq!(stats.minutes, 180);
        assert_eq!(stats.avg_rating, 7.5);
    }

    #[test]
    fn every_position_lands_in_exactly_one_family() {
        use strum::IntoEnumIterator;
        for position in Position::iter() {
            let families = [
                position.is_goalkeeper(),
                position.is_defender(),
                position.is_midfielder(),
                position.is_forward(),
            ];
            assert_eq!(
                families.iter().filter(|&&f| f).count(),
                1,
                "{:?} must belong to exactly one family",
                position
            );
            let mut p = sample_player();
            p.position = position;
            assert!((1..=99).contains(&p.overall_rating()));
        }
    }

    proptest::proptest! {
        #[test]
        fn normalize_always_lands_in_bounds(
            pace in 0u8..=255,
            shooting in 0u8..=255,
            form in 0u8..=255,
            reputation in 0u8..=255,
            weak_foot in 0u8..=255,
            potential in 0u8..=255,
        ) {
            let mut p = sample_player();
            p.attributes.pace = pace;
            p.attributes.shooting = shooting;
            p.form = form;
            p.reputation = reputation;
            p.weak_foot = weak_foot;
            p.potential = potential;
            p.normalize();

            proptest::prop_assert!((1..=99).contains(&p.attributes.pace));
            proptest::prop_assert!((1..=99).contains(&p.attributes.shooting));
            proptest::prop_assert!(p.form <= 100);
            proptest::prop_assert!((1..=100).contains(&p.reputation));
            proptest::prop_assert!((1..=5).contains(&p.weak_foot));
            proptest::prop_assert!(p.potential >= p.overall_rating());
        }
    }
}
