use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::fixture::Fixture;

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct League {
    pub id: String,
    pub name: String,
    /// Member team ids, ascending; the scheduler's rotation anchor.
    pub team_ids: Vec<String>,
    /// - Range: 1..=`2 * (n - 1)` for n teams
    pub current_matchday: u32,
    /// Matchday -> ordered fixture list for the running season.
    pub fixtures: BTreeMap<u32, Vec<Fixture>>,
    pub champions_by_season: BTreeMap<u32, String>,
    /// Season -> (player id, goals).
    pub top_scorers_by_season: BTreeMap<u32, (String, u32)>,
    /// Unordered rivalry pairs; fixtures between them bill as derbies.
    pub rivalries: Vec<(String, String)>,
}

impl League {
    /// Double round robin: `2(n-1)` matchdays.
    pub fn last_matchday(&self) -> u32 {
        2 * (self.team_ids.len().saturating_sub(1)) as u32
    }

    pub fn fixtures_for(&self, matchday: u32) -> &[Fixture] {
        self.fixtures.get(&matchday).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn is_rivalry(&self, a: &str, b: &str) -> bool {
        self.rivalries
            .iter()
            .any(|(x, y)| (x == a && y == b) || (x == b && y == a))
    }
}
