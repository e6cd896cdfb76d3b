//! # Analysis Configuration
//!
//! Every tunable used by the analysis pipeline lives in [`AnalysisConfig`]. The
//! struct deserializes with defaults filled in, so a JSON config file only needs
//! the fields it wants to override.

use crate::errors::{validate_parameter, validate_positive, PatternResult};
use serde::{Deserialize, Serialize};

/// How an equity curve's first value is turned into a step return.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EquityBaseline {
    /// `step_return[0] = equity[0]`; the curve is its own cumulative sum.
    #[default]
    FirstValueAsReturn,
    /// `step_return[0] = 0`; `equity[0]` is treated as the starting balance.
    Rebased,
}

/// Configuration for a single analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AnalysisConfig {
    /// Total resampled paths, split between permutation and block bootstrap
    pub runs: usize,
    /// Block length for the block bootstrap
    pub block: usize,
    /// Motif discovery window width
    pub window: usize,
    /// Base seed for every random stream
    pub seed: u64,
    /// Ljung-Box lags
    pub ljung_box_lags: usize,
    /// Distance under which two z-normalized windows count as a match
    pub motif_threshold: f64,
    /// Maximum number of sampled window positions
    pub motif_samples: usize,
    /// Number of motifs reported
    pub motif_top: usize,
    /// Shortest drawdown episode that is clustered
    pub min_drawdown_len: usize,
    /// Fixed length each drawdown episode is resampled to
    pub drawdown_resample_len: usize,
    /// Requested K-Means cluster count (clamped to the episode count)
    pub drawdown_clusters: usize,
    /// K-Means iteration cap
    pub kmeans_max_iterations: usize,
    /// Multiplier applied to returns in the best hours
    pub leverage: f64,
    /// How many best/worst hours are reported
    pub hour_rank_count: usize,
    /// Periods per year used to annualize Sharpe
    pub annualization: f64,
    /// First-value convention for equity inputs
    pub equity_baseline: EquityBaseline,
    /// Score resampled paths on the rayon pool
    pub parallel: bool,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self::standard()
    }
}

impl AnalysisConfig {
    /// Quick look: fewer resampled paths and motif samples.
    pub fn light() -> Self {
        Self {
            runs: 200,
            motif_samples: 50,
            ..Self::standard()
        }
    }

    /// Standard configuration (default)
    pub fn standard() -> Self {
        Self {
            runs: 1000,
            block: 10,
            window: 20,
            seed: 42,
            ljung_box_lags: 20,
            motif_threshold: 5.0,
            motif_samples: 200,
            motif_top: 3,
            min_drawdown_len: 5,
            drawdown_resample_len: 50,
            drawdown_clusters: 3,
            kmeans_max_iterations: 100,
            leverage: 1.25,
            hour_rank_count: 3,
            annualization: 252.0,
            equity_baseline: EquityBaseline::FirstValueAsReturn,
            parallel: true,
        }
    }

    /// Deep configuration: more paths and motif samples.
    pub fn deep() -> Self {
        Self {
            runs: 5000,
            motif_samples: 500,
            ..Self::standard()
        }
    }

    /// Set the number of resampled paths.
    pub fn with_runs(mut self, runs: usize) -> Self {
        self.runs = runs;
        self
    }

    /// Set the bootstrap block length.
    pub fn with_block(mut self, block: usize) -> Self {
        self.block = block;
        self
    }

    /// Set the motif window width.
    pub fn with_window(mut self, window: usize) -> Self {
        self.window = window;
        self
    }

    /// Set the base seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    /// Set the motif match threshold.
    pub fn with_motif_threshold(mut self, threshold: f64) -> Self {
        self.motif_threshold = threshold;
        self
    }

    /// Set the equity first-value convention.
    pub fn with_equity_baseline(mut self, baseline: EquityBaseline) -> Self {
        self.equity_baseline = baseline;
        self
    }

    /// Reject configurations that would make the pipeline meaningless.
    pub fn validate(&self) -> PatternResult<()> {
        let positive_counts = [
            ("runs", self.runs),
            ("block", self.block),
            ("window", self.window),
            ("ljung_box_lags", self.ljung_box_lags),
            ("drawdown_resample_len", self.drawdown_resample_len),
        ];
        for (name, value) in positive_counts {
            validate_positive(value as f64, name)?;
        }

        validate_positive(self.motif_threshold, "motif_threshold")?;
        validate_positive(self.leverage, "leverage")?;
        validate_positive(self.annualization, "annualization")?;
        validate_parameter(self.hour_rank_count as f64, 0.0, 24.0, "hour_rank_count")?;

        Ok(())
    }
}
