//! Resampling and per-task random streams.
//!
//! Every subsample task gets its own `StdRng` derived from a single seed and the
//! task index, so a parallel run is reproducible regardless of which worker
//! picks up which task.

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

use crate::data::Dataset;

/// Seed from which per-task random streams are derived.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RandomContext {
    seed: u64,
}

impl RandomContext {
    pub fn new(seed: u64) -> Self {
        Self { seed }
    }

    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Independent stream for task `index`.
    pub fn for_task(&self, index: usize) -> StdRng {
        StdRng::seed_from_u64(splitmix64(self.seed ^ splitmix64(index as u64)))
    }
}

impl Default for RandomContext {
    fn default() -> Self {
        Self::new(0x5EED_CA05)
    }
}

fn splitmix64(mut z: u64) -> u64 {
    z = z.wrapping_add(0x9E37_79B9_7F4A_7C15);
    z = (z ^ (z >> 30)).wrapping_mul(0xBF58_476D_1CE4_E5B9);
    z = (z ^ (z >> 27)).wrapping_mul(0x94D0_49BB_1331_11EB);
    z ^ (z >> 31)
}

/// Produces a resampled copy of a dataset without touching the source.
pub trait Resampler: Send + Sync {
    fn resample(&self, data: &Dataset, rng: &mut StdRng) -> Dataset;
}

/// Draws `n_rows` rows with replacement (nonparametric bootstrap).
#[derive(Debug, Clone, Copy, Default)]
pub struct BootstrapSampler;

impl Resampler for BootstrapSampler {
    fn resample(&self, data: &Dataset, rng: &mut StdRng) -> Dataset {
        let n = data.num_rows();
        if n == 0 {
            return data.clone();
        }
        let rows: Vec<usize> = (0..n).map(|_| rng.gen_range(0..n)).collect();
        data.select_rows(&rows)
    }
}
