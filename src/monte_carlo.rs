//! Monte Carlo distribution of performance metrics.
//!
//! Every resampled path is scored with [`PerformanceMetrics`] and the results
//! are reduced to the percentiles carried in the report. Scoring is pure per
//! path, so with the `parallel` feature it runs on the rayon pool; results are
//! collected in path order and the reduction is identical either way.

use crate::bootstrap_sampling::ResampledPaths;
use crate::math_utils::{mean, percentile_of};
use crate::performance::PerformanceMetrics;
use serde::{Deserialize, Serialize};

/// Distribution summary over every resampled path.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MonteCarloSummary {
    /// Number of scored paths
    pub runs: usize,
    /// Mean Sharpe across paths
    pub sharpe_mean: f64,
    /// 5th percentile of Sharpe
    pub sharpe_p05: f64,
    /// 95th percentile of Sharpe
    pub sharpe_p95: f64,
    /// Mean max drawdown across paths
    pub maxdd_mean: f64,
    /// 95th percentile of max drawdown
    pub maxdd_p95: f64,
}

impl MonteCarloSummary {
    /// Summary for zero paths.
    pub fn empty() -> Self {
        Self {
            runs: 0,
            sharpe_mean: 0.0,
            sharpe_p05: 0.0,
            sharpe_p95: 0.0,
            maxdd_mean: 0.0,
            maxdd_p95: 0.0,
        }
    }

    /// Reduce per-path metrics to the summary.
    pub fn from_metrics(metrics: &[PerformanceMetrics]) -> Self {
        if metrics.is_empty() {
            return Self::empty();
        }
        let sharpes: Vec<f64> = metrics.iter().map(|m| m.sharpe).collect();
        let drawdowns: Vec<f64> = metrics.iter().map(|m| m.max_dd).collect();
        Self {
            runs: metrics.len(),
            sharpe_mean: mean(&sharpes),
            sharpe_p05: percentile_of(&sharpes, 0.05),
            sharpe_p95: percentile_of(&sharpes, 0.95),
            maxdd_mean: mean(&drawdowns),
            maxdd_p95: percentile_of(&drawdowns, 0.95),
        }
    }
}

/// Score every path, preserving path order.
pub fn score_paths(
    paths: &ResampledPaths,
    annualization: f64,
    parallel: bool,
) -> Vec<PerformanceMetrics> {
    #[cfg(feature = "parallel")]
    {
        if parallel {
            use rayon::prelude::*;
            return paths
                .paths
                .par_iter()
                .map(|path| PerformanceMetrics::from_equity_with(path, annualization))
                .collect();
        }
    }
    #[cfg(not(feature = "parallel"))]
    let _ = parallel;

    paths
        .paths
        .iter()
        .map(|path| PerformanceMetrics::from_equity_with(path, annualization))
        .collect()
}

/// Score all paths and summarize.
pub fn monte_carlo_summary(
    paths: &ResampledPaths,
    annualization: f64,
    parallel: bool,
) -> MonteCarloSummary {
    MonteCarloSummary::from_metrics(&score_paths(paths, annualization, parallel))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bootstrap_sampling::generate_resampled_paths;
    use crate::performance::DEFAULT_ANNUALIZATION;

    #[test]
    fn test_empty_summary() {
        let summary = MonteCarloSummary::from_metrics(&[]);
        assert_eq!(summary, MonteCarloSummary::empty());
    }

    #[test]
    fn test_percentiles_are_ordered() {
        let returns: Vec<f64> = (0..60).map(|i| ((i * 13) % 7) as f64 - 2.5).collect();
        let paths = generate_resampled_paths(&returns, 200, 5, 11);
        let summary = monte_carlo_summary(&paths, DEFAULT_ANNUALIZATION, false);
        assert_eq!(summary.runs, 200);
        assert!(summary.sharpe_p05 <= summary.sharpe_p95);
        assert!(summary.maxdd_mean >= 0.0);
        assert!(summary.maxdd_p95 >= 0.0);
    }

    #[test]
    fn test_parallel_and_sequential_agree() {
        let returns: Vec<f64> = (0..30).map(|i| (i as f64 * 0.7).sin()).collect();
        let paths = generate_resampled_paths(&returns, 64, 4, 2);
        let sequential = score_paths(&paths, DEFAULT_ANNUALIZATION, false);
        let parallel = score_paths(&paths, DEFAULT_ANNUALIZATION, true);
        assert_eq!(sequential, parallel);
    }
}
