//! Shuffled train/test and k-fold index splits

use crate::core::{Result, TabmlError};
use rand::rngs::StdRng;
use rand::seq::SliceRandom;
use rand::SeedableRng;

/// Seed used for every shuffle unless overridden
pub const DEFAULT_SEED: u64 = 42;

/// Share of rows held out for evaluation
pub const DEFAULT_TEST_FRACTION: f64 = 0.2;

fn shuffled(n: usize, seed: u64) -> Vec<usize> {
    let mut indices: Vec<usize> = (0..n).collect();
    let mut rng = StdRng::seed_from_u64(seed);
    indices.shuffle(&mut rng);
    indices
}

/// Shuffled (train, test) row positions; the test side gets
/// `ceil(n * test_fraction)` rows
pub fn train_test_indices(
    n: usize,
    test_fraction: f64,
    seed: u64,
) -> Result<(Vec<usize>, Vec<usize>)> {
    if test_fraction <= 0.0 || test_fraction >= 1.0 {
        return Err(TabmlError::InvalidParameter(format!(
            "Test fraction must be between 0 and 1, got: {test_fraction}"
        )));
    }

    let n_test = (n as f64 * test_fraction).ceil() as usize;
    if n_test == 0 || n_test >= n {
        return Err(TabmlError::InvalidDataset(format!(
            "Cannot split {n} rows into train and test sets"
        )));
    }

    let indices = shuffled(n, seed);
    let test = indices[..n_test].to_vec();
    let train = indices[n_test..].to_vec();
    Ok((train, test))
}

/// Shuffled k-fold (train, validation) row positions; the first `n % k`
/// folds get one extra row
pub fn k_fold_indices(n: usize, k: usize, seed: u64) -> Result<Vec<(Vec<usize>, Vec<usize>)>> {
    if k < 2 {
        return Err(TabmlError::InvalidParameter(format!(
            "Cross-validation needs at least 2 folds, got: {k}"
        )));
    }
    if n < k {
        return Err(TabmlError::InvalidDataset(format!(
            "Cannot split {n} rows into {k} folds"
        )));
    }

    let indices = shuffled(n, seed);
    let base = n / k;
    let extra = n % k;

    let mut folds = Vec::with_capacity(k);
    let mut start = 0;
    for fold in 0..k {
        let size = base + usize::from(fold < extra);
        let validation = indices[start..start + size].to_vec();
        let train = indices[..start]
            .iter()
            .chain(&indices[start + size..])
            .copied()
            .collect();
        folds.push((train, validation));
        start += size;
    }
    Ok(folds)
}
