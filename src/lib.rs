//! # Monte Carlo Pattern Analysis
//!
//! Statistical robustness reports for trade and equity sequences.
//!
//! A single observed sequence of trade P&L (or an equity curve) says little
//! about whether its Sharpe ratio or drawdown profile would survive a different
//! ordering of the same trades. This crate resamples the sequence many times,
//! runs a battery of pattern detectors over the observed data, and packages
//! everything into one JSON report.
//!
//! ## Key Features
//!
//! - **Resampling**: full-shuffle permutation and block bootstrap, seeded and reproducible
//! - **Performance Metrics**: Sharpe, max drawdown and Ulcer index per path
//! - **Hour-of-Day Effect**: per-hour statistics and a Kruskal-Wallis test
//! - **Serial Structure**: Ljung-Box autocorrelation and Wald-Wolfowitz runs test
//! - **Motifs**: recurring and anomalous windows of the equity curve
//! - **Drawdown Shapes**: K-Means clusters of depth-normalized drawdown episodes
//! - **Leverageability**: Sharpe uplift of an hour filter plus leverage across resampled paths
//! - **Batch**: directory-level analysis with per-file failure isolation
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use mc_pattern_analysis::{analyze, SequenceInput, TradeRecord};
//!
//! fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let input = SequenceInput::trades(vec![
//!         TradeRecord::with_pnl(10.0).at_hour(9),
//!         TradeRecord::with_pnl(-5.0).at_hour(14),
//!         TradeRecord::with_pnl(8.0).at_hour(9),
//!         TradeRecord::with_pnl(-3.0).at_hour(20),
//!     ]);
//!
//!     let report = analyze(&input, 1000, 10, 20, 42)?;
//!     println!("base Sharpe {:.2}", report.base_metrics.sharpe);
//!     println!("best hours {:?}", report.patterns.hour_of_day.best_hours);
//!     println!("{}", report.to_json_pretty()?);
//!     Ok(())
//! }
//! ```
//!
//! ## Determinism
//!
//! Every random stream is a locally constructed, seeded ChaCha20 generator.
//! For a fixed input and configuration two analyses agree on every statistic;
//! only `run_id` and `timestamp` differ.

#![warn(missing_docs)]
#![warn(clippy::all)]

// Core infrastructure
pub mod config;
pub mod errors;
pub mod math_utils;
pub mod preprocessing;
pub mod results;
pub mod secure_rng;

// Metrics and resampling
pub mod bootstrap_sampling;
pub mod monte_carlo;
pub mod performance;

// Pattern detection
pub mod drawdown_clusters;
pub mod leverageability;
pub mod motifs;
pub mod pattern_detectors;
pub mod statistical_tests;

// Orchestration
pub mod analyzer;
pub mod batch;

pub use analyzer::{analyze, analyze_with_config, MonteCarloPatternAnalyzer};
pub use config::{AnalysisConfig, EquityBaseline};
pub use errors::{DegradedStatistic, PatternAnalysisError, PatternResult};
pub use preprocessing::{normalize_sequence, NormalizedSequence, SequenceInput, TradeRecord};
pub use results::{PatternReport, Report};

pub use bootstrap_sampling::{generate_resampled_paths, ResampledPaths};
pub use monte_carlo::{monte_carlo_summary, MonteCarloSummary};
pub use performance::{max_drawdown, sharpe_ratio, ulcer_index, PerformanceMetrics};

pub use drawdown_clusters::{cluster_drawdowns, DrawdownClusterResult};
pub use leverageability::{leverageability_test, HourFilterRule, LeverageabilityResult};
pub use motifs::{discover_motifs, Discord, Motif, MotifResult};
pub use pattern_detectors::{
    autocorrelation_detector, hour_of_day_effect, runs_test_detector, AutocorrelationResult,
    HourOfDayResult, HourStats, RunsTestRecord,
};

pub use batch::{analyze_directory, analyze_file, summarize_reports, BatchSummary, SharpeGrade};
