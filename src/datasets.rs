//! Seeded synthetic datasets, for tests, benches and demos.

use crate::{ColumnMajorMatrix, Dataset};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use rand_distr::StandardNormal;

/// Regression problem: the features are standard gaussians, and the target is a linear
/// combination of the first `n_informative` features plus a gaussian noise of standard
/// deviation `noise`. The coefficients are uniform in [0, 100).
pub fn make_regression(
    n_samples: usize,
    n_features: usize,
    n_informative: usize,
    noise: f64,
    seed: u64,
) -> Dataset {
    let mut rng = StdRng::seed_from_u64(seed);
    let n_informative = n_informative.min(n_features);

    let columns: Vec<Vec<f64>> = (0..n_features)
        .map(|_| {
            (0..n_samples)
                .map(|_| rng.sample::<f64, _>(StandardNormal))
                .collect()
        })
        .collect();
    let coefs: Vec<f64> = (0..n_informative)
        .map(|_| 100. * rng.gen::<f64>())
        .collect();

    let target = (0..n_samples)
        .map(|row| {
            let signal: f64 = coefs
                .iter()
                .zip(&columns)
                .map(|(coef, column)| coef * column[row])
                .sum();
            signal + noise * rng.sample::<f64, _>(StandardNormal)
        })
        .collect();

    Dataset {
        features: ColumnMajorMatrix::from_function(n_samples, n_features, |row, col| {
            columns[col][row]
        }),
        target,
    }
}

/// Binary classification problem: two gaussian clusters of unit variance centered on
/// `-1` and `+1` on every feature, with labels 0 and 1 drawn with equal probability.
pub fn make_classification(n_samples: usize, n_features: usize, seed: u64) -> Dataset {
    let mut rng = StdRng::seed_from_u64(seed);
    let target: Vec<f64> = (0..n_samples)
        .map(|_| if rng.gen_bool(0.5) { 1. } else { 0. })
        .collect();
    let mut rows = Vec::with_capacity(n_samples);
    for &label in &target {
        let center = 2. * label - 1.;
        let row: Vec<f64> = (0..n_features)
            .map(|_| center + rng.sample::<f64, _>(StandardNormal))
            .collect();
        rows.push(row);
    }
    let features = ColumnMajorMatrix::from_function(n_samples, n_features, |row, col| rows[row][col]);
    Dataset { features, target }
}
