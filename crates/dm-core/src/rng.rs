//! Deterministic per-unit and simulation-level RNG wrappers.
//!
//! # Determinism strategy
//!
//! Each unit gets its own independent `SmallRng` seeded by:
//!
//!   seed = global_seed XOR (unit_id * MIXING_CONSTANT)
//!
//! The mixing constant is the 64-bit fractional part of the golden ratio,
//! which spreads consecutive unit IDs uniformly across the seed space.  This
//! means:
//!
//! - Units never share RNG state, so the order in which the kernel resumes
//!   their processes cannot change the values they draw.
//! - Adding units at the end of the fleet does not disturb the seeds of
//!   existing units.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};

use crate::UnitId;

/// 64-bit fractional golden-ratio constant for seed mixing.
const MIXING_CONSTANT: u64 = 0x9e37_79b9_7f4a_7c15;

/// Draw from an exponential distribution with the given `mean` by inverse
/// transform.  `mean <= 0` yields 0.
fn sample_exponential(rng: &mut SmallRng, mean: f64) -> f64 {
    if mean <= 0.0 {
        return 0.0;
    }
    // gen::<f64>() is in [0, 1); flip to (0, 1] so ln() is finite.
    let u: f64 = 1.0 - rng.r#gen::<f64>();
    -u.ln() * mean
}

// ── UnitRng ───────────────────────────────────────────────────────────────────

/// Per-unit deterministic RNG.
pub struct UnitRng(SmallRng);

impl UnitRng {
    /// Seed deterministically from the run's global seed and a unit ID.
    pub fn new(global_seed: u64, unit: UnitId) -> Self {
        let seed = global_seed ^ (unit.0 as u64).wrapping_mul(MIXING_CONSTANT);
        UnitRng(SmallRng::seed_from_u64(seed))
    }

    /// Generate a value uniformly in `range`.
    #[inline]
    pub fn gen_range<T, R>(&mut self, range: R) -> T
    where
        T: rand::distributions::uniform::SampleUniform,
        R: rand::distributions::uniform::SampleRange<T>,
    {
        self.0.gen_range(range)
    }

    /// Exponentially distributed value with the given mean.
    #[inline]
    pub fn exponential(&mut self, mean: f64) -> f64 {
        sample_exponential(&mut self.0, mean)
    }
}

// ── SimRng ────────────────────────────────────────────────────────────────────

/// Simulation-level RNG for global operations (breakdowns, repair times, …).
///
/// Derive one child per independent stream with [`SimRng::child`] so that
/// each stream's draws do not depend on how the kernel interleaves them.
pub struct SimRng(SmallRng);

impl SimRng {
    pub fn new(seed: u64) -> Self {
        SimRng(SmallRng::seed_from_u64(seed))
    }

    /// Derive a child `SimRng` with a different seed offset.
    pub fn child(&mut self, offset: u64) -> SimRng {
        let child_seed: u64 = self.0.r#gen::<u64>() ^ offset.wrapping_mul(MIXING_CONSTANT);
        SimRng(SmallRng::seed_from_u64(child_seed))
    }

    /// Exponentially distributed value with the given mean.
    #[inline]
    pub fn exponential(&mut self, mean: f64) -> f64 {
        sample_exponential(&mut self.0, mean)
    }
}
