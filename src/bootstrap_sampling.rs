//! Monte Carlo path generation from an observed return sequence.
//!
//! Two schemes share the same step returns:
//!
//! - **Permutation**: a uniform random reordering of the returns. Destroys all
//!   serial structure.
//! - **Block bootstrap**: contiguous blocks drawn with replacement and
//!   concatenated to length N. Keeps short-range serial correlation.
//!
//! Each scheme owns a seeded [`SecureRng`]; the block stream is seeded with
//! `seed + 1` so the two schemes never share a random stream.

use crate::math_utils::cumulative_sum;
use crate::secure_rng::SecureRng;

/// Resampled cumulative-equity paths, permutation paths first.
#[derive(Debug, Clone, PartialEq)]
pub struct ResampledPaths {
    /// Every path has exactly the length of the source returns
    pub paths: Vec<Vec<f64>>,
    /// Number of leading paths produced by the permutation scheme
    pub permutation_runs: usize,
}

impl ResampledPaths {
    /// Total number of paths.
    pub fn len(&self) -> usize {
        self.paths.len()
    }

    /// True when no paths were generated.
    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}

/// Split `runs` between the schemes: half to permutation, the remainder to
/// block bootstrap.
pub fn split_runs(runs: usize) -> (usize, usize) {
    let permutation = runs / 2;
    (permutation, runs - permutation)
}

/// Generate `runs` paths from `returns`, split across both schemes.
pub fn generate_resampled_paths(
    returns: &[f64],
    runs: usize,
    block: usize,
    seed: u64,
) -> ResampledPaths {
    let (permutation_runs, block_runs) = split_runs(runs);

    let mut paths = permutation_paths(returns, permutation_runs, seed);
    paths.extend(block_bootstrap_paths(
        returns,
        block_runs,
        block,
        seed.wrapping_add(1),
    ));

    log::debug!(
        "Generated {} permutation and {} block-bootstrap paths of length {}",
        permutation_runs,
        block_runs,
        returns.len()
    );

    ResampledPaths {
        paths,
        permutation_runs,
    }
}

/// `runs` permutation paths from one seeded stream.
pub fn permutation_paths(returns: &[f64], runs: usize, seed: u64) -> Vec<Vec<f64>> {
    let mut rng = SecureRng::with_seed(seed);
    (0..runs)
        .map(|_| cumulative_sum(&permuted_returns_with_rng(returns, &mut rng)))
        .collect()
}

/// `runs` block-bootstrap paths from one seeded stream.
pub fn block_bootstrap_paths(
    returns: &[f64],
    runs: usize,
    block: usize,
    seed: u64,
) -> Vec<Vec<f64>> {
    let mut rng = SecureRng::with_seed(seed);
    (0..runs)
        .map(|_| cumulative_sum(&block_bootstrap_sample_with_rng(returns, block, &mut rng)))
        .collect()
}

/// Reorder `returns` by a uniform random permutation of their indices.
pub fn permuted_returns_with_rng(returns: &[f64], rng: &mut SecureRng) -> Vec<f64> {
    let mut indices: Vec<usize> = (0..returns.len()).collect();
    rng.shuffle(&mut indices);
    indices.into_iter().map(|i| returns[i]).collect()
}

/// Concatenate randomly placed contiguous blocks until length N, then truncate.
///
/// The block length is clamped to `1..=N`, so any block size (including one
/// larger than the data) yields a sample of exactly N values.
pub fn block_bootstrap_sample_with_rng(
    data: &[f64],
    block_size: usize,
    rng: &mut SecureRng,
) -> Vec<f64> {
    let n = data.len();
    if n == 0 {
        return Vec::new();
    }
    let block_size = block_size.max(1).min(n);
    let mut sample = Vec::with_capacity(n + block_size);

    while sample.len() < n {
        let start_max = n - block_size;
        let start = if start_max == 0 {
            0
        } else {
            rng.usize(0..start_max + 1)
        };
        sample.extend_from_slice(&data[start..start + block_size]);
    }

    sample.truncate(n);
    sample
}
