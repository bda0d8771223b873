//! Centralized random number generation.
//!
//! Centralizes all sampling in one generator seeded from config; every
//! consumer receives a handle, never touches a global. This is what yields
//! the identical-run determinism property: two runs with identical inputs
//! and the same seed produce identical event traces.

use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Owns the engine's single random source. Cloned handles are not shared;
/// callers that need independent substreams derive a new seed from this
/// generator instead of reaching for a global.
pub struct EngineRng {
    inner: ChaCha8Rng,
}

impl EngineRng {
    /// Builds a deterministic generator from an explicit seed, or from
    /// entropy when `seed` is `None` (non-reproducible run).
    pub fn new(seed: Option<u64>) -> Self {
        let inner = match seed {
            Some(s) => ChaCha8Rng::seed_from_u64(s),
            None => ChaCha8Rng::from_entropy(),
        };
        Self { inner }
    }

    /// Uniform float in `[low, high)`.
    pub fn uniform(&mut self, low: f64, high: f64) -> f64 {
        self.inner.gen_range(low..high)
    }

    /// Bernoulli draw with the given success probability.
    pub fn chance(&mut self, probability: f64) -> bool {
        self.inner.gen_bool(probability.clamp(0.0, 1.0))
    }

    /// Uniform integer in `[low, high]` inclusive.
    pub fn uniform_int(&mut self, low: i64, high: i64) -> i64 {
        if low >= high {
            return low;
        }
        self.inner.gen_range(low..=high)
    }

    /// Weighted choice among `(weight, value)` pairs. Weights need not sum
    /// to 1.0; they are normalized internally.
    pub fn weighted_choice<'a, T>(&mut self, items: &'a [(f64, T)]) -> &'a T {
        let total: f64 = items.iter().map(|(w, _)| w).sum();
        let mut roll = self.uniform(0.0, total);
        for (weight, value) in items {
            if roll < *weight {
                return value;
            }
            roll -= weight;
        }
        &items.last().expect("non-empty weighted choice").1
    }

    /// Triangular distribution draw over `(min, avg, max)`, used for
    /// exception handling-time sampling.
    pub fn triangular(&mut self, min: f64, mode: f64, max: f64) -> f64 {
        let u = self.uniform(0.0, 1.0);
        let fc = (mode - min) / (max - min);
        if u < fc {
            min + (u * (max - min) * (mode - min)).sqrt()
        } else {
            max - ((1.0 - u) * (max - min) * (max - mode)).sqrt()
        }
    }
}
