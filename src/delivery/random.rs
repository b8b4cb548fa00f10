//! Lock-guarded random helper owned by each pipeline.

use std::sync::Mutex;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Random source shared by a pipeline's generator calls.
#[derive(Debug)]
pub struct RandomSource {
    rng: Mutex<StdRng>,
}

impl RandomSource {
    /// Seeded from OS entropy.
    pub fn new() -> Self {
        Self {
            rng: Mutex::new(StdRng::from_entropy()),
        }
    }

    /// Deterministic source for tests.
    pub fn seeded(seed: u64) -> Self {
        Self {
            rng: Mutex::new(StdRng::seed_from_u64(seed)),
        }
    }

    /// Uniform pick; the empty string for an empty slice.
    pub fn pick<'a>(&self, items: &'a [String]) -> &'a str {
        if items.is_empty() {
            return "";
        }
        let idx = self.below(items.len());
        &items[idx]
    }

    /// Uniform integer in `[0, n)`; zero when `n` is zero.
    pub fn below(&self, n: usize) -> usize {
        if n == 0 {
            return 0;
        }
        self.rng
            .lock()
            .expect("random source mutex poisoned")
            .gen_range(0..n)
    }

    /// Uniform non-negative 31-bit integer.
    pub fn next_i31(&self) -> i32 {
        self.rng
            .lock()
            .expect("random source mutex poisoned")
            .gen_range(0..=i32::MAX)
    }
}

impl Default for RandomSource {
    fn default() -> Self {
        Self::new()
    }
}
