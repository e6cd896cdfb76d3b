//! Hour-filter and leverage uplift across resampled paths.
//!
//! For every resampled equity path the step returns are recovered, returns in
//! the worst hours are zeroed, returns in the best hours are scaled by the
//! leverage factor, and the Sharpe difference (adjusted minus raw) is the
//! path's uplift. Position `i` of a path carries the hour of step `i` in the
//! observed sequence.

use crate::bootstrap_sampling::ResampledPaths;
use crate::math_utils::{mean, percentile_of, returns_from_equity};
use crate::performance::sharpe_ratio;
use serde::{Deserialize, Serialize};

/// Default multiplier for returns in the best hours.
pub const DEFAULT_LEVERAGE: f64 = 1.25;

/// Hour filter applied to each path.
#[derive(Debug, Clone, PartialEq)]
pub struct HourFilterRule {
    /// Hours whose returns are leveraged
    pub best_hours: Vec<u8>,
    /// Hours whose returns are dropped (wins over `best_hours`)
    pub worst_hours: Vec<u8>,
    /// Multiplier for best-hour returns
    pub leverage: f64,
}

impl HourFilterRule {
    /// Rule with the default leverage.
    pub fn new(best_hours: Vec<u8>, worst_hours: Vec<u8>) -> Self {
        Self {
            best_hours,
            worst_hours,
            leverage: DEFAULT_LEVERAGE,
        }
    }

    /// Override the leverage factor.
    pub fn with_leverage(mut self, leverage: f64) -> Self {
        self.leverage = leverage;
        self
    }

    /// Apply the rule to `returns`, where `hours[i]` is the hour of `returns[i]`.
    ///
    /// Positions beyond `hours` are left unchanged.
    pub fn apply(&self, returns: &[f64], hours: &[u8]) -> Vec<f64> {
        returns
            .iter()
            .enumerate()
            .map(|(i, &r)| match hours.get(i) {
                Some(h) if self.worst_hours.contains(h) => 0.0,
                Some(h) if self.best_hours.contains(h) => r * self.leverage,
                _ => r,
            })
            .collect()
    }
}

/// Uplift distribution across paths.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct LeverageabilityResult {
    /// Mean Sharpe uplift
    pub uplift_mean: f64,
    /// 95th percentile of uplift
    pub uplift_p95: f64,
    /// Fraction of paths with strictly positive uplift
    pub uplift_frac_positive: f64,
    /// Number of paths tested
    pub n_paths: usize,
}

impl LeverageabilityResult {
    /// Result over zero paths.
    pub fn empty() -> Self {
        Self {
            uplift_mean: 0.0,
            uplift_p95: 0.0,
            uplift_frac_positive: 0.0,
            n_paths: 0,
        }
    }

    /// Aggregate per-path uplifts.
    pub fn from_uplifts(uplifts: &[f64]) -> Self {
        if uplifts.is_empty() {
            return Self::empty();
        }
        let positive = uplifts.iter().filter(|&&u| u > 0.0).count();
        Self {
            uplift_mean: mean(uplifts),
            uplift_p95: percentile_of(uplifts, 0.95),
            uplift_frac_positive: positive as f64 / uplifts.len() as f64,
            n_paths: uplifts.len(),
        }
    }
}

/// Sharpe uplift of `rule` on one equity path.
pub fn path_uplift(path: &[f64], hours: &[u8], rule: &HourFilterRule, annualization: f64) -> f64 {
    let raw = returns_from_equity(path);
    let adjusted = rule.apply(&raw, hours);
    sharpe_ratio(&adjusted, annualization) - sharpe_ratio(&raw, annualization)
}

/// Run the uplift test over every resampled path.
pub fn leverageability_test(
    paths: &ResampledPaths,
    hours: &[u8],
    rule: &HourFilterRule,
    annualization: f64,
    parallel: bool,
) -> LeverageabilityResult {
    let uplifts = compute_uplifts(paths, hours, rule, annualization, parallel);
    LeverageabilityResult::from_uplifts(&uplifts)
}

fn compute_uplifts(
    paths: &ResampledPaths,
    hours: &[u8],
    rule: &HourFilterRule,
    annualization: f64,
    parallel: bool,
) -> Vec<f64> {
    #[cfg(feature = "parallel")]
    {
        if parallel {
            use rayon::prelude::*;
            return paths
                .paths
                .par_iter()
                .map(|path| path_uplift(path, hours, rule, annualization))
                .collect();
        }
    }
    #[cfg(not(feature = "parallel"))]
    let _ = parallel;

    paths
        .paths
        .iter()
        .map(|path| path_uplift(path, hours, rule, annualization))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::bootstrap_sampling::generate_resampled_paths;
    use crate::performance::DEFAULT_ANNUALIZATION;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_rule_apply() {
        let rule = HourFilterRule::new(vec![9], vec![14]);
        let adjusted = rule.apply(&[10.0, -5.0, 8.0, -3.0], &[9, 14, 9, 20]);
        assert_eq!(adjusted, vec![12.5, 0.0, 10.0, -3.0]);
    }

    #[test]
    fn test_worst_hours_win_over_best() {
        let rule = HourFilterRule::new(vec![9], vec![9]);
        assert_eq!(rule.apply(&[4.0], &[9]), vec![0.0]);
    }

    #[test]
    fn test_empty_paths() {
        let paths = ResampledPaths {
            paths: Vec::new(),
            permutation_runs: 0,
        };
        let rule = HourFilterRule::new(vec![1], vec![2]);
        assert_eq!(
            leverageability_test(&paths, &[], &rule, DEFAULT_ANNUALIZATION, false),
            LeverageabilityResult::empty()
        );
    }

    #[test]
    fn test_bounds_and_path_count() {
        let returns: Vec<f64> = (0..48).map(|i| ((i * 7) % 11) as f64 - 4.0).collect();
        let hours: Vec<u8> = (0..48).map(|i| (i % 24) as u8).collect();
        let paths = generate_resampled_paths(&returns, 101, 3, 5);
        let rule = HourFilterRule::new(vec![1, 2, 3], vec![4, 5, 6]);

        let result = leverageability_test(&paths, &hours, &rule, DEFAULT_ANNUALIZATION, false);
        assert_eq!(result.n_paths, 101);
        assert!((0.0..=1.0).contains(&result.uplift_frac_positive));
        assert!(result.uplift_mean.is_finite());

        let parallel = leverageability_test(&paths, &hours, &rule, DEFAULT_ANNUALIZATION, true);
        assert_eq!(result, parallel);
    }

    #[test]
    fn test_neutral_rule_has_zero_uplift() {
        let rule = HourFilterRule::new(Vec::new(), Vec::new());
        let uplift = path_uplift(&[1.0, 3.0, 2.0, 5.0], &[0, 1, 2, 3], &rule, 252.0);
        assert_approx_eq!(uplift, 0.0);
    }
}
