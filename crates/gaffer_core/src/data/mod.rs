//! World genesis.
//!
//! Builds the season-one world from a seed and nothing else: leagues, clubs,
//! squads, owners, staff and press, every value drawn from streams derived
//! off `(seed, "genesis", ...)`. Fixtures are not created here; they arrive
//! as `MatchScheduled` events from the scheduler so that replay owns them.

pub mod names;

use chrono::NaiveDate;
use std::collections::BTreeMap;

use crate::models::collateral::{MediaOutlet, MediaStyle, Owner, StaffMember, StaffRole};
use crate::models::player::{
    Attributes, Player, PlayerTrait, Position, PreferredFoot, WorkRate,
};
use crate::models::team::{Finances, Stadium, Team, TeamRecord};
use crate::models::{League, World};
use crate::rng::{self, DetRng};

/// Season one always kicks off on the same date; the calendar advances only
/// through applied events after that.
pub fn genesis_kickoff_date() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 8, 2).expect("static genesis date")
}

#[derive(Debug, Clone)]
pub struct GenesisSpec {
    pub league_count: usize,
    pub teams_per_league: usize,
    pub squad_size: usize,
}

impl Default for GenesisSpec {
    fn default() -> Self {
        Self { league_count: 2, teams_per_league: 10, squad_size: 18 }
    }
}

/// Squad template: two keepers and cover everywhere else.
const SQUAD_POSITIONS: [Position; 18] = [
    Position::GK,
    Position::GK,
    Position::CB,
    Position::CB,
    Position::CB,
    Position::CB,
    Position::LB,
    Position::RB,
    Position::CM,
    Position::CM,
    Position::CM,
    Position::CAM,
    Position::LM,
    Position::RM,
    Position::LW,
    Position::RW,
    Position::ST,
    Position::ST,
];

pub fn genesis(seed: u64) -> World {
    genesis_with(seed, &GenesisSpec::default())
}

pub fn genesis_with(seed: u64, spec: &GenesisSpec) -> World {
    let mut world = World {
        season: 1,
        current_date: genesis_kickoff_date(),
        seed,
        leagues: BTreeMap::new(),
        teams: BTreeMap::new(),
        players: BTreeMap::new(),
        matches: BTreeMap::new(),
        owners: BTreeMap::new(),
        staff: BTreeMap::new(),
        media: BTreeMap::new(),
        news: Vec::new(),
    };

    for (outlet_id, outlet_name) in names::MEDIA_OUTLETS {
        let style = match outlet_id {
            "media-sunday-whistle" => MediaStyle::Tabloid,
            "media-national-gazette" => MediaStyle::Broadsheet,
            _ => MediaStyle::FanBlog,
        };
        world.media.insert(
            outlet_id.to_string(),
            MediaOutlet { id: outlet_id.to_string(), name: outlet_name.to_string(), style },
        );
    }

    let mut town_cursor = 0usize;
    for league_idx in 0..spec.league_count.min(names::LEAGUE_NAMES.len()) {
        let (league_id, league_name) = names::LEAGUE_NAMES[league_idx];
        let mut rng = rng::derive(seed, &["genesis", league_id]);

        let mut team_ids = Vec::new();
        for _ in 0..spec.teams_per_league {
            let town = if town_cursor < names::TOWN_ROOTS.len() {
                names::TOWN_ROOTS[town_cursor].to_string()
            } else {
                // Larger worlds than the name pool: disambiguate the reuse.
                format!(
                    "{} {}",
                    names::TOWN_ROOTS[town_cursor % names::TOWN_ROOTS.len()],
                    town_cursor / names::TOWN_ROOTS.len() + 1
                )
            };
            let team = build_team(&mut world, &mut rng, league_id, &town, spec.squad_size);
            team_ids.push(team);
            town_cursor += 1;
        }
        team_ids.sort();

        // The first two town pairs in each league share old grudges.
        let mut rivalries = Vec::new();
        if team_ids.len() >= 4 {
            rivalries.push((team_ids[0].clone(), team_ids[1].clone()));
            rivalries.push((team_ids[2].clone(), team_ids[3].clone()));
        }

        world.leagues.insert(
            league_id.to_string(),
            League {
                id: league_id.to_string(),
                name: league_name.to_string(),
                team_ids,
                current_matchday: 1,
                fixtures: BTreeMap::new(),
                champions_by_season: BTreeMap::new(),
                top_scorers_by_season: BTreeMap::new(),
                rivalries,
            },
        );
    }

    world
}

fn build_team(
    world: &mut World,
    rng: &mut DetRng,
    league_id: &str,
    town: &str,
    squad_size: usize,
) -> String {
    let suffix = names::CLUB_SUFFIXES[rng.uniform(names::CLUB_SUFFIXES.len() as u32) as usize];
    let name = format!("{} {}", town, suffix);
    let team_id = format!("team-{}", town.to_lowercase().replace(' ', "-"));

    // Club quality tiers keep every league from being flat.
    let reputation = (35 + rng.uniform(51) as u8).clamp(1, 100);
    let quality_base = 48 + (reputation as i64 - 35) / 2;

    let stadium_pattern =
        names::STADIUM_PATTERNS[rng.uniform(names::STADIUM_PATTERNS.len() as u32) as usize];
    let stadium_name = stadium_pattern.replace("{}", town);
    let capacity = 8_000 + rng.uniform(42_000) + reputation as u32 * 100;

    let mut squad = Vec::new();
    for (slot, position) in SQUAD_POSITIONS.iter().take(squad_size).enumerate() {
        let player_id = build_player(world, rng, &team_id, *position, quality_base, slot);
        squad.push(player_id);
    }

    let owner_name = names::OWNER_NAMES[rng.uniform(names::OWNER_NAMES.len() as u32) as usize];
    let owner_id = format!("owner-{}", town.to_lowercase().replace(' ', "-"));
    world.owners.insert(
        owner_id.clone(),
        Owner {
            id: owner_id,
            name: owner_name.to_string(),
            team_id: team_id.clone(),
            public_approval: 50 + rng.uniform(26) as u8,
            ambition: 40 + rng.uniform(56) as u8,
        },
    );

    for role in [StaffRole::Manager, StaffRole::AssistantCoach, StaffRole::Physio, StaffRole::ChiefScout]
    {
        let first = names::FIRST_NAMES[rng.uniform(names::FIRST_NAMES.len() as u32) as usize];
        let last = names::LAST_NAMES[rng.uniform(names::LAST_NAMES.len() as u32) as usize];
        let staff_id =
            format!("staff-{}-{:?}", town.to_lowercase().replace(' ', "-"), role).to_lowercase();
        world.staff.insert(
            staff_id.clone(),
            StaffMember {
                id: staff_id,
                name: format!("{} {}", first, last),
                team_id: team_id.clone(),
                role,
                quality: (quality_base as u8).saturating_add(rng.uniform(15) as u8).clamp(1, 100),
            },
        );
    }

    world.teams.insert(
        team_id.clone(),
        Team {
            id: team_id.clone(),
            name,
            league_id: league_id.to_string(),
            squad,
            tactical_familiarity: 40 + rng.uniform(41) as u8,
            morale: 45 + rng.uniform(31) as u8,
            rapport: 45 + rng.uniform(31) as u8,
            reputation,
            finances: Finances {
                balance: 2_000_000 + rng.range(0, 8_000_000),
                weekly_wages: 40_000 + reputation as i64 * 2_000,
                ticket_price: 18 + reputation as u32 / 4,
                sponsor_income_weekly: 30_000 + reputation as i64 * 1_500,
            },
            stadium: Stadium {
                name: stadium_name,
                capacity,
                training_quality: (30 + reputation / 2 + rng.uniform(15) as u8).clamp(1, 100),
            },
            record: TeamRecord::default(),
            recent_form: Default::default(),
            head_to_head: BTreeMap::new(),
        },
    );
    team_id
}

fn build_player(
    world: &mut World,
    rng: &mut DetRng,
    team_id: &str,
    position: Position,
    quality_base: i64,
    slot: usize,
) -> String {
    let first = names::FIRST_NAMES[rng.uniform(names::FIRST_NAMES.len() as u32) as usize];
    let last = names::LAST_NAMES[rng.uniform(names::LAST_NAMES.len() as u32) as usize];
    let id = format!("player-{}-{:02}", team_id.trim_start_matches("team-"), slot);

    let age = 17 + rng.uniform(19) as u8;
    let spread = |rng: &mut DetRng, lo: i64, hi: i64| {
        (quality_base + rng.range(lo, hi)).clamp(20, 95) as u8
    };

    // Position archetypes around the club's quality base.
    let attributes = match position {
        Position::GK => Attributes {
            pace: spread(rng, -20, -5),
            shooting: spread(rng, -30, -15),
            passing: spread(rng, -15, 5),
            defending: spread(rng, 5, 20),
            physicality: spread(rng, 0, 15),
        },
        p if p.is_defender() => Attributes {
            pace: spread(rng, -10, 10),
            shooting: spread(rng, -25, -8),
            passing: spread(rng, -10, 8),
            defending: spread(rng, 5, 20),
            physicality: spread(rng, 0, 15),
        },
        p if p.is_midfielder() => Attributes {
            pace: spread(rng, -8, 10),
            shooting: spread(rng, -10, 10),
            passing: spread(rng, 5, 20),
            defending: spread(rng, -15, 5),
            physicality: spread(rng, -8, 10),
        },
        _ => Attributes {
            pace: spread(rng, 5, 20),
            shooting: spread(rng, 5, 20),
            passing: spread(rng, -10, 8),
            defending: spread(rng, -30, -15),
            physicality: spread(rng, -5, 12),
        },
    };

    let mut traits = Vec::new();
    if rng.chance(0.12) {
        traits.push(PlayerTrait::Clinical);
    }
    if rng.chance(0.08) {
        traits.push(PlayerTrait::Leader);
    }
    if rng.chance(0.10) {
        traits.push(PlayerTrait::Playmaker);
    }
    if rng.chance(0.07) {
        traits.push(PlayerTrait::InjuryProne);
    }
    if rng.chance(0.06) {
        traits.push(PlayerTrait::Temperamental);
    }

    let preferred_foot = match rng.uniform(10) {
        0..=2 => PreferredFoot::Left,
        3..=8 => PreferredFoot::Right,
        _ => PreferredFoot::Both,
    };
    let work_rate = |rng: &mut DetRng| match rng.uniform(3) {
        0 => WorkRate::Low,
        1 => WorkRate::Medium,
        _ => WorkRate::High,
    };

    let mut player = Player {
        id: id.clone(),
        name: format!("{} {}", first, last),
        team_id: team_id.to_string(),
        position,
        age,
        attributes,
        form: 40 + rng.uniform(31) as u8,
        morale: 45 + rng.uniform(31) as u8,
        fitness: 85 + rng.uniform(16) as u8,
        reputation: (20 + rng.uniform(60) as u8).clamp(1, 100),
        preferred_foot,
        weak_foot: 1 + rng.uniform(5) as u8,
        skill_moves: 1 + rng.uniform(5) as u8,
        traits,
        work_rate: (work_rate(rng), work_rate(rng)),
        potential: 0,
        injured: false,
        injury_matchdays_left: 0,
        yellow_cards_season: 0,
        red_cards_season: 0,
        season_stats: BTreeMap::new(),
        injury_history: Vec::new(),
        awards: Vec::new(),
    };

    // Headroom decays with age; a 17-year-old can grow, a 33-year-old is done.
    let overall = player.overall_rating();
    let headroom = (28i64 - age as i64).max(0) as u8;
    player.potential = overall
        .saturating_add(headroom)
        .saturating_add(rng.uniform(5) as u8)
        .clamp(overall, 99);
    player.normalize();

    world.players.insert(id.clone(), player);
    id
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn genesis_is_deterministic() {
        let a = genesis(42);
        let b = genesis(42);
        assert_eq!(a, b, "same seed must build the same world");
    }

    #[test]
    fn genesis_respects_spec_counts() {
        let world = genesis(42);
        assert_eq!(world.leagues.len(), 2);
        assert_eq!(world.teams.len(), 20);
        assert_eq!(world.players.len(), 360);
        for team in world.teams.values() {
            assert_eq!(team.squad.len(), 18, "squad size for {}", team.id);
            let gks = team
                .squad
                .iter()
                .filter(|p| world.players[*p].position.is_goalkeeper())
                .count();
            assert_eq!(gks, 2, "two keepers per squad");
        }
        world.check_invariants().expect("genesis world invariants");
    }

    #[test]
    fn different_seeds_differ() {
        let a = genesis(1);
        let b = genesis(2);
        assert_ne!(a, b);
    }

    #[test]
    fn potential_never_below_overall() {
        let world = genesis(7);
        for player in world.players.values() {
            assert!(
                player.potential >= player.overall_rating(),
                "potential floor broken for {}",
                player.id
            );
        }
    }
}
