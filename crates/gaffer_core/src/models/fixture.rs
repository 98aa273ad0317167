use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Weather {
    Sunny,
    Cloudy,
    Rainy,
    Snowy,
    Windy,
    Foggy,
}

impl Weather {
    pub const ALL: [Weather; 6] = [
        Weather::Sunny,
        Weather::Cloudy,
        Weather::Rainy,
        Weather::Snowy,
        Weather::Windy,
        Weather::Foggy,
    ];
}

/// Fixture billing, used for atmosphere and narrative weighting.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum Importance {
    #[default]
    Normal,
    TitleRace,
    Derby,
    Relegation,
}

/// An unplayed match reference, held in the league's matchday lists.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Fixture {
    pub match_id: String,
    pub league_id: String,
    pub season: u32,
    pub matchday: u32,
    pub home_id: String,
    pub away_id: String,
    pub date: NaiveDate,
    pub importance: Importance,
}

/// Minimum believable crowd; clamped from below at kickoff.
pub const MIN_ATTENDANCE: u32 = 1000;
/// - Range: 30..=90
pub const ATMOSPHERE_MIN: u8 = 30;
pub const ATMOSPHERE_MAX: u8 = 90;

/// Match lifecycle: created by the scheduler, sealed exactly once by the
/// orchestrator when the final whistle event is applied.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Match {
    pub id: String,
    pub league_id: String,
    pub season: u32,
    pub matchday: u32,
    pub home_id: String,
    pub away_id: String,
    pub date: NaiveDate,
    pub weather: Weather,
    pub finished: bool,
    pub aborted: bool,
    pub home_score: u32,
    pub away_score: u32,
    /// Set by the kickoff event; `None` while scheduled.
    pub attendance: Option<u32>,
    pub atmosphere: Option<u8>,
}

impl Match {
    pub fn from_fixture(fixture: &Fixture, weather: Weather) -> Self {
        Self {
            id: fixture.match_id.clone(),
            league_id: fixture.league_id.clone(),
            season: fixture.season,
            matchday: fixture.matchday,
            home_id: fixture.home_id.clone(),
            away_id: fixture.away_id.clone(),
            date: fixture.date,
            weather,
            finished: false,
            aborted: false,
            home_score: 0,
            away_score: 0,
            attendance: None,
            atmosphere: None,
        }
    }
}
