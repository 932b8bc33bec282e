//! Park-Miller (Lehmer) pseudo random number generator
//!
//! Every procedural decision on the track draws from this generator, so a
//! given (level, seed) pair always rebuilds the same track.

use serde::{Deserialize, Serialize};

use crate::error::TrackError;

/// Modulus of the generator, also the exclusive upper bound of its output
pub const PRNG_MODULUS: u32 = i32::MAX as u32;
const MULTIPLIER: u64 = 16807;

/// Seeds that replace the `level + 1` rule for a few hand-tuned levels
const LEVEL_SEED_OVERRIDES: [(u32, u32); 3] = [(5, 100), (10, 101), (15, 105)];

/// Seed used for a level id
pub fn level_seed(level: u32) -> u32 {
    LEVEL_SEED_OVERRIDES
        .iter()
        .find(|(l, _)| *l == level)
        .map(|(_, seed)| *seed)
        .unwrap_or_else(|| level.saturating_add(1).min(PRNG_MODULUS - 1))
}

/// Lehmer generator: `state = state * 16807 mod (2^31 - 1)`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Prng {
    state: u32,
}

impl Default for Prng {
    fn default() -> Self {
        Self { state: 1 }
    }
}

impl Prng {
    /// Create a generator with the given seed
    pub fn new(seed: u32) -> Result<Self, TrackError> {
        let mut rng = Self::default();
        rng.set_seed(i64::from(seed))?;
        Ok(rng)
    }

    /// Reseed. Requires `0 < seed < i32::MAX`; the state is untouched otherwise.
    pub fn set_seed(&mut self, seed: i64) -> Result<(), TrackError> {
        if seed <= 0 || seed >= i64::from(PRNG_MODULUS) {
            return Err(TrackError::InvalidSeed(seed));
        }
        self.state = seed as u32;
        Ok(())
    }

    /// Current internal state
    pub fn state(&self) -> u32 {
        self.state
    }

    /// Advance and return the new state, in `[1, 2^31 - 2]`
    pub fn next_uint(&mut self) -> u32 {
        self.state = ((u64::from(self.state) * MULTIPLIER) % u64::from(PRNG_MODULUS)) as u32;
        self.state
    }

    /// Uniform value in `[0, 1)`
    pub fn next_double(&mut self) -> f64 {
        f64::from(self.next_uint()) / f64::from(PRNG_MODULUS)
    }

    /// Linear interpolation between `min` and `max`
    pub fn next_double_range(&mut self, min: f64, max: f64) -> f64 {
        min + (max - min) * self.next_double()
    }

    /// Rounded integer in `[min, max]`, both ends inclusive
    pub fn next_int_range(&mut self, min: i32, max: i32) -> i32 {
        let lo = f64::from(min) - 0.4999;
        let hi = f64::from(max) + 0.4999;
        self.next_double_range(lo, hi).round() as i32
    }

    /// `next_double_range` narrowed to `f32`, the precision track geometry uses
    pub fn next_f32_range(&mut self, min: f32, max: f32) -> f32 {
        self.next_double_range(f64::from(min), f64::from(max)) as f32
    }

    /// Non-negative count in `[min, max]`
    pub fn next_count(&mut self, min: usize, max: usize) -> usize {
        self.next_int_range(min as i32, max.max(min) as i32).max(0) as usize
    }

    /// +1.0 or -1.0 with equal odds
    pub fn next_sign(&mut self) -> f32 {
        if self.next_double() < 0.5 { -1.0 } else { 1.0 }
    }
}
