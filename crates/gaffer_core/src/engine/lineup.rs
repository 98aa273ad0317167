//! Starting-eleven selection.
//!
//! Best-overall pick under the formation floor: exactly one keeper, at least
//! three defenders, at least one forward, the rest on merit. Injured players
//! never start.

use super::{EngineError, PlayerSnapshot};

#[derive(Debug, Clone)]
pub struct Lineup {
    /// Indices into the squad snapshot, starters first.
    pub starters: Vec<usize>,
    /// Remaining fit players by descending overall, substitutes pool.
    pub bench: Vec<usize>,
}

pub const STARTERS: usize = 11;
pub const MIN_DEFENDERS: usize = 3;
pub const MIN_FORWARDS: usize = 1;

pub fn select(squad: &[PlayerSnapshot]) -> Result<Lineup, EngineError> {
    let mut fit: Vec<usize> = (0..squad.len()).filter(|&i| !squad[i].injured).collect();
    // Merit order with id tie-break so equal ratings pick deterministically.
    fit.sort_by(|&a, &b| {
        squad[b]
            .overall
            .cmp(&squad[a].overall)
            .then_with(|| squad[a].id.cmp(&squad[b].id))
    });

    let keeper = fit
        .iter()
        .copied()
        .find(|&i| squad[i].position.is_goalkeeper())
        .ok_or_else(|| EngineError::LineupUnfillable("no fit goalkeeper".into()))?;

    let mut starters = vec![keeper];
    let take = |starters: &mut Vec<usize>, pred: &dyn Fn(usize) -> bool, n: usize| {
        for &i in fit.iter() {
            if starters.len() >= STARTERS {
                break;
            }
            if starters.contains(&i) || squad[i].position.is_goalkeeper() {
                continue;
            }
            if pred(i) && starters.iter().filter(|&&s| pred(s)).count() < n {
                starters.push(i);
            }
        }
    };

    take(&mut starters, &|i| squad[i].position.is_defender(), MIN_DEFENDERS);
    take(&mut starters, &|i| squad[i].position.is_forward(), MIN_FORWARDS);

    // Merit fill; one keeper only.
    for &i in fit.iter() {
        if starters.len() >= STARTERS {
            break;
        }
        if !starters.contains(&i) && !squad[i].position.is_goalkeeper() {
            starters.push(i);
        }
    }

    if starters.len() < STARTERS {
        return Err(EngineError::LineupUnfillable(format!(
            "only {} fit players for eleven places",
            starters.len()
        )));
    }

    let defenders = starters.iter().filter(|&&i| squad[i].position.is_defender()).count();
    let forwards = starters.iter().filter(|&&i| squad[i].position.is_forward()).count();
    if defenders < MIN_DEFENDERS || forwards < MIN_FORWARDS {
        return Err(EngineError::LineupUnfillable(format!(
            "formation floor unmet: {} defenders, {} forwards",
            defenders, forwards
        )));
    }

    let bench = fit.into_iter().filter(|i| !starters.contains(i)).collect();
    Ok(Lineup { starters, bench })
}
