//! Common test utilities for gam-native integration tests.
#![allow(dead_code)]

use ndarray::Array2;
use rand::prelude::*;

/// Deterministic generator so failures reproduce.
pub fn seeded_rng(seed: u64) -> StdRng {
    StdRng::seed_from_u64(seed)
}

/// Bin indices uniformly drawn from `0..bin_count`.
pub fn random_bins(rng: &mut StdRng, count: usize, bin_count: usize) -> Vec<usize> {
    (0..count).map(|_| rng.gen_range(0..bin_count)).collect()
}

/// Raw scores in `[-range, range)`.
pub fn random_scores(rng: &mut StdRng, rows: usize, cols: usize, range: f64) -> Array2<f64> {
    Array2::from_shape_fn((rows, cols), |_| rng.gen_range(-range..range))
}

/// Labels in `{0, 1}`.
pub fn binary_targets(rng: &mut StdRng, rows: usize, cols: usize) -> Array2<f64> {
    Array2::from_shape_fn((rows, cols), |_| if rng.gen_bool(0.5) { 1.0 } else { 0.0 })
}

/// One class index per row.
pub fn class_targets(rng: &mut StdRng, rows: usize, num_classes: usize) -> Array2<f64> {
    Array2::from_shape_fn((rows, 1), |_| rng.gen_range(0..num_classes) as f64)
}

/// Continuous regression targets.
pub fn regression_targets(rng: &mut StdRng, rows: usize) -> Array2<f64> {
    Array2::from_shape_fn((rows, 1), |_| rng.gen_range(-10.0..10.0))
}
