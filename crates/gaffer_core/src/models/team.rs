use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, VecDeque};

/// Result letter kept in the recent-form FIFO.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub enum MatchOutcome {
    W,
    D,
    L,
}

pub const RECENT_FORM_LEN: usize = 5;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct HeadToHead {
    pub wins: u32,
    pub draws: u32,
    pub losses: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct SplitRecord {
    pub wins: u32,
    pub draws: u32,
    pub losses: u32,
    pub goals_for: u32,
    pub goals_against: u32,
}

/// Season counters. `points`, `matches_played` and `goal_difference` are
/// derived so the table arithmetic cannot drift.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct TeamRecord {
    pub wins: u32,
    pub draws: u32,
    pub losses: u32,
    pub goals_for: u32,
    pub goals_against: u32,
    pub clean_sheets: u32,
    pub home: SplitRecord,
    pub away: SplitRecord,
    /// Positive = consecutive wins, negative = consecutive losses, 0 after a draw.
    pub current_streak: i32,
    pub longest_win_streak: u32,
    pub longest_unbeaten: u32,
    /// Running unbeaten counter feeding `longest_unbeaten`.
    pub unbeaten_run: u32,
}

impl TeamRecord {
    pub fn matches_played(&self) -> u32 {
        self.wins + self.draws + self.losses
    }

    pub fn points(&self) -> u32 {
        3 * self.wins + self.draws
    }

    pub fn goal_difference(&self) -> i64 {
        self.goals_for as i64 - self.goals_against as i64
    }

    pub fn record_result(&mut self, goals_for: u32, goals_against: u32, at_home: bool) {
        self.goals_for += goals_for;
        self.goals_against += goals_against;
        if goals_against == 0 {
            self.clean_sheets += 1;
        }

        let split = if at_home { &mut self.home } else { &mut self.away };
        split.goals_for += goals_for;
        split.goals_against += goals_against;

        if goals_for > goals_against {
            self.wins += 1;
            split.wins += 1;
            self.current_streak = self.current_streak.max(0) + 1;
            self.longest_win_streak = self.longest_win_streak.max(self.current_streak as u32);
            self.unbeaten_run += 1;
        } else if goals_for == goals_against {
            self.draws += 1;
            split.draws += 1;
            self.current_streak = 0;
            self.unbeaten_run += 1;
        } else {
            self.losses += 1;
            split.losses += 1;
            self.current_streak = self.current_streak.min(0) - 1;
            self.unbeaten_run = 0;
        }
        self.longest_unbeaten = self.longest_unbeaten.max(self.unbeaten_run);
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Finances {
    /// Pennies; signed because clubs do go under.
    pub balance: i64,
    pub weekly_wages: i64,
    pub ticket_price: u32,
    pub sponsor_income_weekly: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Stadium {
    pub name: String,
    pub capacity: u32,
    /// - Range: 1..=100
    pub training_quality: u8,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Team {
    pub id: String,
    pub name: String,
    pub league_id: String,
    /// Player ids; cross-entity relations are id-indirected, never pointers.
    pub squad: Vec<String>,
    /// - Range: 0..=100
    pub tactical_familiarity: u8,
    /// Soft state (team morale / dressing-room rapport), LLM-adjustable.
    /// - Range: 0..=100
    pub morale: u8,
    pub rapport: u8,
    /// - Range: 1..=100
    pub reputation: u8,
    pub finances: Finances,
    pub stadium: Stadium,
    pub record: TeamRecord,
    /// Last five results, oldest first.
    pub recent_form: VecDeque<MatchOutcome>,
    pub head_to_head: BTreeMap<String, HeadToHead>,
}

impl Team {
    pub fn push_form(&mut self, outcome: MatchOutcome) {
        self.recent_form.push_back(outcome);
        while self.recent_form.len() > RECENT_FORM_LEN {
            self.recent_form.pop_front();
        }
    }

    pub fn head_to_head_entry(&mut self, opponent_id: &str) -> &mut HeadToHead {
        self.head_to_head.entry(opponent_id.to_string()).or_default()
    }

    /// Wipe season counters at rollover; head-to-head and finances persist.
    pub fn reset_season_counters(&mut self) {
        self.record = TeamRecord::default();
        self.recent_form.clear();
    }

    pub fn normalize(&mut self) {
        self.tactical_familiarity = self.tactical_familiarity.min(100);
        self.morale = self.morale.min(100);
        self.rapport = self.rapport.min(100);
        self.reputation = self.reputation.clamp(1, 100);
    }
}
