//! Post-match player ratings.

/// Everything the rating formula needs about one participant.
#[derive(Debug, Clone, Default)]
pub struct RatingInput {
    pub goals: u32,
    pub assists: u32,
    pub yellows: u32,
    pub reds: u32,
    pub is_keeper: bool,
    pub team_conceded: u32,
    /// - Range: 0..=100
    pub form: u8,
    /// Live fitness at the final whistle.
    pub fitness: f64,
}

pub const RATING_BASE: f64 = 6.0;
pub const RATING_MIN: f64 = 1.0;
pub const RATING_MAX: f64 = 10.0;

/// Base 6.0; +1.0 per goal, +0.5 per assist, -0.3 per yellow, -1.5 per red,
/// keeper clean sheet +1.0, keeper shipping four -1.0, form bonus in
/// [-1.0, 1.0], fitness penalty in [-1.0, 0.0]. Clamped, one decimal.
pub fn rate(input: &RatingInput) -> f64 {
    let mut rating = RATING_BASE;
    rating += input.goals as f64 * 1.0;
    rating += input.assists as f64 * 0.5;
    rating -= input.yellows as f64 * 0.3;
    rating -= input.reds as f64 * 1.5;
    if input.is_keeper {
        if input.team_conceded == 0 {
            rating += 1.0;
        } else if input.team_conceded > 3 {
            rating -= 1.0;
        }
    }
    rating += (input.form as f64 / 100.0) * 2.0 - 1.0;
    rating -= (100.0 - input.fitness.clamp(0.0, 100.0)) / 100.0;
    (rating.clamp(RATING_MIN, RATING_MAX) * 10.0).round() / 10.0
}

#[cfg(test)]
mod tests {
    use super::*;

    fn neutral() -> RatingInput {
        RatingInput { form: 50, fitness: 100.0, ..Default::default() }
    }

    #[test]
    fn neutral_outfielder_sits_at_base() {
        // form 50 => bonus 0, full fitness => no penalty
        assert_eq!(rate(&neutral()), 6.0);
    }

    #[test]
    fn goals_and_cards_move_the_needle() {
        let hero = RatingInput { goals: 2, assists: 1, ..neutral() };
        assert_eq!(rate(&hero), 8.5);

        let villain = RatingInput { reds: 1, yellows: 1, ..neutral() };
        assert_eq!(rate(&villain), 4.2);
    }

    #[test]
    fn keeper_clean_sheet_and_collapse() {
        let wall = RatingInput { is_keeper: true, team_conceded: 0, ..neutral() };
        assert_eq!(rate(&wall), 7.0);

        let sieve = RatingInput { is_keeper: true, team_conceded: 5, ..neutral() };
        assert_eq!(rate(&sieve), 5.0);
    }

    #[test]
    fn rating_is_clamped_both_ways() {
        let monster = RatingInput { goals: 6, assists: 4, ..neutral() };
        assert_eq!(rate(&monster), 10.0);

        let disaster = RatingInput {
            reds: 2,
            yellows: 3,
            form: 0,
            fitness: 0.0,
            ..Default::default()
        };
        assert_eq!(rate(&disaster), 1.0);
    }
}
