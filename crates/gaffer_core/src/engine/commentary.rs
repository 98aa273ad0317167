//! Commentary lines, one per meaningful event, `"{minute}' - {verb} {details}"`.
//!
//! Phrasing draws from its own derived stream so flavor never perturbs the
//! play-by-play sampling.

use crate::rng::DetRng;

pub fn goal(rng: &mut DetRng, minute: u8, scorer: &str, team: &str, penalty: bool) -> String {
    if penalty {
        return format!("{}' - GOAL! {} converts the penalty for {}", minute, scorer, team);
    }
    let verb = pick(rng, &["GOAL!", "GOAL!", "What a finish!", "It's in!"]);
    format!("{}' - {} {} scores for {}", minute, verb, scorer, team)
}

pub fn assist_suffix(assister: &str) -> String {
    format!(" ({} with the assist)", assister)
}

pub fn yellow_card(rng: &mut DetRng, minute: u8, player: &str, dissent: bool) -> String {
    if dissent {
        format!("{}' - Booked: {} shown yellow for dissent", minute, player)
    } else {
        let verb = pick(rng, &["Booked:", "Yellow card:", "Into the book:"]);
        format!("{}' - {} {} goes in late", minute, verb, player)
    }
}

pub fn red_card(minute: u8, player: &str, second_yellow: bool) -> String {
    if second_yellow {
        format!("{}' - Sent off! Second yellow for {}", minute, player)
    } else {
        format!("{}' - Straight red! {} is off", minute, player)
    }
}

pub fn substitution(minute: u8, off: &str, on: &str, team: &str) -> String {
    format!("{}' - Change for {}: {} replaces {}", minute, team, on, off)
}

pub fn injury(minute: u8, player: &str) -> String {
    format!("{}' - {} is down and can't continue", minute, player)
}

pub fn corner(rng: &mut DetRng, minute: u8, team: &str) -> String {
    let verb = pick(rng, &["Corner swung in by", "Corner to", "Another corner for"]);
    format!("{}' - {} {}", minute, verb, team)
}

pub fn free_kick(minute: u8, team: &str, dangerous: bool) -> String {
    if dangerous {
        format!("{}' - Free kick in a dangerous spot for {}", minute, team)
    } else {
        format!("{}' - Free kick for {} deep in their own half", minute, team)
    }
}

pub fn penalty_awarded(minute: u8, team: &str, converted: bool) -> String {
    if converted {
        format!("{}' - Penalty to {}!", minute, team)
    } else {
        format!("{}' - Penalty to {} - saved!", minute, team)
    }
}

pub fn offside(minute: u8, team: &str) -> String {
    format!("{}' - Flag up, {} caught offside", minute, team)
}

pub fn kick_off(home: &str, away: &str) -> String {
    format!("1' - Kick off: {} host {}", home, away)
}

pub fn full_time(home: &str, home_score: u32, away: &str, away_score: u32) -> String {
    format!("90' - Full time: {} {} - {} {}", home, home_score, away_score, away)
}

fn pick<'a>(rng: &mut DetRng, options: &[&'a str]) -> &'a str {
    options[rng.uniform(options.len() as u32) as usize]
}
