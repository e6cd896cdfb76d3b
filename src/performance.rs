//! Performance metrics computed from an equity curve.
//!
//! All functions are pure and tolerate degenerate input (empty, single point,
//! constant series) by returning their natural boundary value.

use crate::math_utils::{drawdown_series, mean, returns_from_equity, sample_std, EPSILON};
use serde::{Deserialize, Serialize};

/// Default number of periods per year used to annualize Sharpe.
pub const DEFAULT_ANNUALIZATION: f64 = 252.0;

/// Summary metrics for one equity curve.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PerformanceMetrics {
    /// Annualized Sharpe ratio of the step returns
    pub sharpe: f64,
    /// Largest peak-to-trough decline, as a non-negative magnitude
    pub max_dd: f64,
    /// Root-mean-square drawdown
    pub ulcer: f64,
    /// Number of steps
    pub trades: usize,
}

impl PerformanceMetrics {
    /// Compute all metrics from an equity curve with the default annualization.
    pub fn from_equity(equity: &[f64]) -> Self {
        Self::from_equity_with(equity, DEFAULT_ANNUALIZATION)
    }

    /// Compute all metrics with a custom annualization factor.
    pub fn from_equity_with(equity: &[f64], annualization: f64) -> Self {
        let returns = returns_from_equity(equity);
        Self {
            sharpe: sharpe_ratio(&returns, annualization),
            max_dd: max_drawdown(equity),
            ulcer: ulcer_index(equity),
            trades: returns.len(),
        }
    }
}

/// Annualized Sharpe ratio of a return series.
///
/// `mean / (sample_std + 1e-9) * sqrt(annualization)`; 0.0 with fewer than two points.
pub fn sharpe_ratio(returns: &[f64], annualization: f64) -> f64 {
    if returns.len() < 2 {
        return 0.0;
    }
    mean(returns) / (sample_std(returns) + EPSILON) * annualization.sqrt()
}

/// Maximum drawdown magnitude: `-min(equity - running_max(equity))`.
pub fn max_drawdown(equity: &[f64]) -> f64 {
    drawdown_series(equity)
        .into_iter()
        .fold(0.0_f64, |worst, dd| worst.min(dd))
        .abs()
}

/// Ulcer index: RMS of the drawdown series.
pub fn ulcer_index(equity: &[f64]) -> f64 {
    if equity.is_empty() {
        return 0.0;
    }
    let dd = drawdown_series(equity);
    (dd.iter().map(|d| d * d).sum::<f64>() / dd.len() as f64).sqrt()
}
