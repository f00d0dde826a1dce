//! Random sources for the recorder's event emitter.
//!
//! The emitter only ever asks two questions: "roll a number in `[0, 1)`" and
//! "pick an index below `len`". Keeping that behind a trait lets tests script
//! the outcome of every roll.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::collections::VecDeque;

pub trait RandomSource: Send + Sync {
    /// A uniformly distributed value in `[0, 1)`.
    fn next_unit(&mut self) -> f64;

    /// A uniformly distributed index in `0..len`. `len` must be non-zero.
    fn pick_index(&mut self, len: usize) -> usize;
}

/// A `StdRng`-backed source, either entropy-seeded or fixed-seeded.
pub struct StdRandom {
    rng: StdRng,
}

impl StdRandom {
    pub fn from_entropy() -> Self {
        Self {
            rng: StdRng::from_entropy(),
        }
    }

    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
        }
    }

    /// Seeded when a seed is given, entropy-seeded otherwise.
    pub fn from_seed_option(seed: Option<u64>) -> Self {
        match seed {
            Some(seed) => Self::seeded(seed),
            None => Self::from_entropy(),
        }
    }
}

impl RandomSource for StdRandom {
    fn next_unit(&mut self) -> f64 {
        self.rng.gen::<f64>()
    }

    fn pick_index(&mut self, len: usize) -> usize {
        self.rng.gen_range(0..len)
    }
}

/// Replays a fixed script of rolls and picks.
///
/// When a script runs dry the source falls back to `0.0` for rolls and `0`
/// for picks. Picks are clamped to `len - 1`.
#[derive(Debug, Default, Clone)]
pub struct ScriptedRandom {
    units: VecDeque<f64>,
    indices: VecDeque<usize>,
    fallback_unit: f64,
}

impl ScriptedRandom {
    pub fn new() -> Self {
        Self::default()
    }

    /// Always rolls `value`. Useful for forcing or suppressing emission.
    pub fn constant(value: f64) -> Self {
        Self {
            fallback_unit: value,
            ..Self::default()
        }
    }

    pub fn with_units(mut self, units: impl IntoIterator<Item = f64>) -> Self {
        self.units.extend(units);
        self
    }

    pub fn with_indices(mut self, indices: impl IntoIterator<Item = usize>) -> Self {
        self.indices.extend(indices);
        self
    }
}

impl RandomSource for ScriptedRandom {
    fn next_unit(&mut self) -> f64 {
        self.units.pop_front().unwrap_or(self.fallback_unit)
    }

    fn pick_index(&mut self, len: usize) -> usize {
        let index = self.indices.pop_front().unwrap_or(0);
        index.min(len.saturating_sub(1))
    }
}
