//! Seeded random streams.
//!
//! Every random decision in the simulator draws from a stream derived from
//! `(world seed, purpose tags...)`. The tag tuple is hashed with FxHasher64
//! (version-stable, unlike `DefaultHasher`) and the digest seeds a ChaCha8
//! stream. Same seed + same tags = same stream, on every platform, forever.
//!
//! Nothing in this module touches the wall clock or host entropy.

use fxhash::FxHasher64;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use std::hash::Hasher;

/// Derive a deterministic stream from a seed and a tag tuple.
///
/// The engine uses `derive(world_seed, &[match_id])`, the scheduler
/// `derive(world_seed, &["schedule", season, league_id])`, genesis
/// `derive(seed, &["genesis", ...])`.
pub fn derive(seed: u64, tags: &[&str]) -> DetRng {
    let mut hasher = FxHasher64::default();
    hasher.write_u64(seed);
    for tag in tags {
        hasher.write(tag.as_bytes());
        // Separator byte so ("ab","c") and ("a","bc") hash differently.
        hasher.write_u8(0x1f);
    }
    DetRng { rng: ChaCha8Rng::seed_from_u64(hasher.finish()) }
}

/// Deterministic RNG wrapper used by the engine, scheduler and genesis.
#[derive(Debug, Clone)]
pub struct DetRng {
    rng: ChaCha8Rng,
}

impl DetRng {
    /// Uniform integer in `0..n`. `n` must be > 0.
    pub fn uniform(&mut self, n: u32) -> u32 {
        self.rng.gen_range(0..n)
    }

    /// Uniform integer in `lo..=hi`.
    pub fn range(&mut self, lo: i64, hi: i64) -> i64 {
        self.rng.gen_range(lo..=hi)
    }

    /// Uniform float in `[0, 1)`.
    pub fn fraction(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }

    /// Bernoulli draw with probability `p` (clamped to `[0, 1]`).
    pub fn chance(&mut self, p: f64) -> bool {
        self.fraction() < p.clamp(0.0, 1.0)
    }

    /// Bounded symmetric jitter in `[-bound, bound]`.
    ///
    /// Triangular (sum of two uniforms) so small deviations are more likely,
    /// without pulling in a distribution crate for one call site.
    pub fn jitter(&mut self, bound: f64) -> f64 {
        (self.fraction() + self.fraction() - 1.0) * bound
    }

    /// Weighted choice over `(tag, weight)` pairs.
    ///
    /// Candidates are walked in lexicographic tag order regardless of the
    /// order the caller supplies, so equal-weight ties always break toward
    /// the lexicographically smaller tag and the draw consumes exactly one
    /// stream value. Zero- and negative-weight entries are skipped.
    pub fn weighted<'a>(&mut self, candidates: &[(&'a str, f64)]) -> Option<&'a str> {
        let mut sorted: Vec<&(&str, f64)> =
            candidates.iter().filter(|(_, w)| *w > 0.0).collect();
        if sorted.is_empty() {
            return None;
        }
        sorted.sort_by(|a, b| a.0.cmp(b.0));

        let total: f64 = sorted.iter().map(|(_, w)| w).sum();
        let mut roll = self.fraction() * total;
        for (tag, weight) in &sorted {
            roll -= weight;
            if roll < 0.0 {
                return Some(tag);
            }
        }
        // Floating-point slack lands on the last candidate.
        sorted.last().map(|(tag, _)| *tag)
    }

    /// Weighted choice over owned-id candidates; same tie-break contract as
    /// [`DetRng::weighted`].
    pub fn weighted_id(&mut self, candidates: &[(String, f64)]) -> Option<String> {
        let borrowed: Vec<(&str, f64)> =
            candidates.iter().map(|(id, w)| (id.as_str(), *w)).collect();
        self.weighted(&borrowed).map(str::to_owned)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn same_seed_same_stream() {
        let mut a = derive(42, &["match-1"]);
        let mut b = derive(42, &["match-1"]);
        for _ in 0..100 {
            assert_eq!(a.uniform(1000), b.uniform(1000));
        }
    }

    #[test]
    fn different_tags_different_streams() {
        let mut a = derive(42, &["match-1"]);
        let mut b = derive(42, &["match-2"]);
        let draws_a: Vec<u32> = (0..16).map(|_| a.uniform(u32::MAX)).collect();
        let draws_b: Vec<u32> = (0..16).map(|_| b.uniform(u32::MAX)).collect();
        assert_ne!(draws_a, draws_b, "distinct tags must decorrelate streams");
    }

    #[test]
    fn tag_concatenation_is_not_ambiguous() {
        let mut a = derive(7, &["ab", "c"]);
        let mut b = derive(7, &["a", "bc"]);
        let draws_a: Vec<u32> = (0..16).map(|_| a.uniform(u32::MAX)).collect();
        let draws_b: Vec<u32> = (0..16).map(|_| b.uniform(u32::MAX)).collect();
        assert_ne!(draws_a, draws_b);
    }

    #[test]
    fn weighted_is_order_independent() {
        let forward = [("corner", 14.0), ("foul", 25.0), ("goal", 6.0)];
        let backward = [("goal", 6.0), ("foul", 25.0), ("corner", 14.0)];
        let mut a = derive(9, &["w"]);
        let mut b = derive(9, &["w"]);
        for _ in 0..200 {
            assert_eq!(a.weighted(&forward), b.weighted(&backward));
        }
    }

    #[test]
    fn weighted_skips_nonpositive_and_handles_empty() {
        let mut rng = derive(1, &["w"]);
        assert_eq!(rng.weighted(&[]), None);
        assert_eq!(rng.weighted(&[("a", 0.0), ("b", -1.0)]), None);
        assert_eq!(rng.weighted(&[("a", 0.0), ("b", 3.0)]), Some("b"));
    }

    #[test]
    fn jitter_is_bounded() {
        let mut rng = derive(3, &["jitter"]);
        for _ in 0..1000 {
            let j = rng.jitter(0.05);
            assert!((-0.05..=0.05).contains(&j), "jitter out of bounds: {}", j);
        }
    }

    #[test]
    fn weighted_distribution_tracks_weights() {
        let mut rng = derive(1234, &["dist"]);
        let weights = [("a", 1.0), ("b", 3.0)];
        let mut b_hits = 0usize;
        for _ in 0..10_000 {
            if rng.weighted(&weights) == Some("b") {
                b_hits += 1;
            }
        }
        let share = b_hits as f64 / 10_000.0;
        assert!((0.72..0.78).contains(&share), "expected ~0.75, got {}", share);
    }
}
