pub mod collateral;
pub mod events;
pub mod fixture;
pub mod league;
pub mod player;
pub mod team;
pub mod world;

pub use collateral::{MediaOutlet, MediaStyle, NewsItem, Owner, StaffMember, StaffRole};
pub use events::{Event, EventPayload, MatchStats, SoftField, TargetKind, TeamMatchStats};
pub use fixture::{Fixture, Importance, Match, Weather};
pub use league::League;
pub use player::{Attributes, InjurySeverity, Player, PlayerTrait, Position};
pub use team::{HeadToHead, MatchOutcome, Team, TeamRecord};
pub use world::{World, MAX_SEASONS, SEASON_BREAK_DAYS};
