//! # Monte Carlo Pattern Analyzer
//!
//! [`MonteCarloPatternAnalyzer`] is the entry point that turns one trade or
//! equity sequence into a [`Report`]. It runs, in order:
//!
//! 1. normalization of the input into a [`NormalizedSequence`]
//! 2. base performance metrics
//! 3. permutation and block-bootstrap resampling
//! 4. per-path metrics reduced to the Monte Carlo summary
//! 5. the pattern detectors on the observed sequence
//! 6. the leverageability test over the resampled paths, using the best and
//!    worst hours from the hour-of-day detector
//!
//! Only invalid input or configuration aborts an analysis. A detector that
//! cannot compute its statistic contributes its neutral record and the report
//! is still produced.
//!
//! ## Usage Example
//!
//! ```rust,no_run
//! use mc_pattern_analysis::{AnalysisConfig, MonteCarloPatternAnalyzer, SequenceInput};
//! use mc_pattern_analysis::errors::PatternAnalysisError;
//!
//! # fn main() -> Result<(), PatternAnalysisError> {
//! let input = SequenceInput::from_json_str(r#"{"equity": [100.0, 110.0, 105.0, 120.0]}"#)?;
//! let analyzer = MonteCarloPatternAnalyzer::with_config(AnalysisConfig::light().with_seed(7));
//! let report = analyzer.analyze(&input)?;
//! println!("{}", report.to_json_pretty()?);
//! # Ok(())
//! # }
//! ```

use crate::bootstrap_sampling::{generate_resampled_paths, ResampledPaths};
use crate::config::AnalysisConfig;
use crate::drawdown_clusters::{cluster_drawdowns, DrawdownClusterConfig, DrawdownClusterResult};
use crate::errors::PatternResult;
use crate::leverageability::{leverageability_test, HourFilterRule, LeverageabilityResult};
use crate::monte_carlo::monte_carlo_summary;
use crate::motifs::{discover_motifs, MotifConfig, MotifResult};
use crate::pattern_detectors::{
    autocorrelation_detector, hour_of_day_effect, runs_test_detector, AutocorrelationResult,
    RunsTestRecord,
};
use crate::performance::PerformanceMetrics;
use crate::preprocessing::{normalize_sequence, NormalizedSequence, SequenceInput};
use crate::results::{PatternReport, Report};
use crate::secure_rng::{mix_seed, SecureRng};

/// Stream index for motif window sampling.
const MOTIF_STREAM: usize = 2;
/// Stream index for K-Means seeding.
const KMEANS_STREAM: usize = 3;

/// Runs the full analysis pipeline under one configuration.
#[derive(Debug, Clone, Default)]
pub struct MonteCarloPatternAnalyzer {
    config: AnalysisConfig,
}

impl MonteCarloPatternAnalyzer {
    /// Analyzer with the standard configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Analyzer with a custom configuration.
    pub fn with_config(config: AnalysisConfig) -> Self {
        Self { config }
    }

    /// Current configuration.
    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Analyze one input sequence.
    pub fn analyze(&self, input: &SequenceInput) -> PatternResult<Report> {
        let config = &self.config;
        config.validate()?;

        let sequence = normalize_sequence(input, config.equity_baseline)?;
        let base_metrics = PerformanceMetrics::from_equity_with(&sequence.equity, config.annualization);

        let paths = generate_resampled_paths(&sequence.step_return, config.runs, config.block, config.seed);
        let mc = monte_carlo_summary(&paths, config.annualization, config.parallel);

        let patterns = self.detect_patterns(&sequence);
        let leverageability = self.test_leverageability(&sequence, &paths, &patterns);

        let report = Report::new(base_metrics, mc, patterns, leverageability);
        log::info!(
            "Analysis {} complete: {} steps, base Sharpe {:.3}, MC Sharpe p05/p95 {:.3}/{:.3}, uplift>0 in {:.1}% of {} paths",
            report.run_id,
            sequence.len(),
            report.base_metrics.sharpe,
            report.mc.sharpe_p05,
            report.mc.sharpe_p95,
            report.leverageability.uplift_frac_positive * 100.0,
            report.leverageability.n_paths
        );
        Ok(report)
    }

    /// Run every detector on the observed sequence.
    pub fn detect_patterns(&self, sequence: &NormalizedSequence) -> PatternReport {
        let config = &self.config;

        let hour_of_day = hour_of_day_effect(sequence, config.hour_rank_count);

        let autocorr = autocorrelation_detector(sequence, config.ljung_box_lags).unwrap_or_else(|degraded| {
            log::debug!("{}", degraded);
            AutocorrelationResult::neutral(config.ljung_box_lags)
        });

        let runs_test = runs_test_detector(sequence).unwrap_or_else(|degraded| {
            log::debug!("{}", degraded);
            RunsTestRecord::neutral()
        });

        let motif_config = MotifConfig {
            window: config.window,
            threshold: config.motif_threshold,
            samples: config.motif_samples,
            top: config.motif_top,
        };
        let mut motif_rng = SecureRng::with_seed(mix_seed(config.seed, MOTIF_STREAM));
        let motifs = discover_motifs(&sequence.equity, &motif_config, &mut motif_rng).unwrap_or_else(|degraded| {
            log::debug!("{}", degraded);
            MotifResult::neutral()
        });

        let cluster_config = DrawdownClusterConfig {
            clusters: config.drawdown_clusters,
            min_len: config.min_drawdown_len,
            resample_len: config.drawdown_resample_len,
            max_iterations: config.kmeans_max_iterations,
        };
        let mut kmeans_rng = SecureRng::with_seed(mix_seed(config.seed, KMEANS_STREAM));
        let drawdown_clusters = cluster_drawdowns(&sequence.equity, &cluster_config, &mut kmeans_rng)
            .unwrap_or_else(|degraded| {
                log::debug!("{}", degraded);
                DrawdownClusterResult::neutral()
            });

        PatternReport {
            hour_of_day,
            autocorr,
            runs_test,
            motifs,
            drawdown_clusters,
        }
    }

    fn test_leverageability(
        &self,
        sequence: &NormalizedSequence,
        paths: &ResampledPaths,
        patterns: &PatternReport,
    ) -> LeverageabilityResult {
        let rule = HourFilterRule::new(
            patterns.hour_of_day.best_hours.clone(),
            patterns.hour_of_day.worst_hours.clone(),
        )
        .with_leverage(self.config.leverage);
        leverageability_test(
            paths,
            &sequence.hour,
            &rule,
            self.config.annualization,
            self.config.parallel,
        )
    }
}

/// Analyze `input` with the standard configuration and the given core parameters.
pub fn analyze(
    input: &SequenceInput,
    runs: usize,
    block: usize,
    window: usize,
    seed: u64,
) -> PatternResult<Report> {
    let config = AnalysisConfig::standard()
        .with_runs(runs)
        .with_block(block)
        .with_window(window)
        .with_seed(seed);
    analyze_with_config(input, &config)
}

/// Analyze `input` under `config`.
pub fn analyze_with_config(input: &SequenceInput, config: &AnalysisConfig) -> PatternResult<Report> {
    MonteCarloPatternAnalyzer::with_config(config.clone()).analyze(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::PatternAnalysisError;
    use crate::preprocessing::TradeRecord;

    #[test]
    fn test_invalid_config_rejected() {
        let input = SequenceInput::equity(vec![1.0, 2.0, 3.0]);
        let result = analyze(&input, 0, 10, 20, 42);
        assert!(matches!(result, Err(PatternAnalysisError::InvalidParameter { .. })));
    }

    #[test]
    fn test_missing_pnl_rejected() {
        let input = SequenceInput::trades(vec![TradeRecord::default()]);
        match analyze(&input, 10, 2, 2, 1) {
            Err(PatternAnalysisError::ValidationError { field, .. }) => assert_eq!(field, "trades[0].pnl"),
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn test_short_sequence_uses_neutral_detectors() {
        let input = SequenceInput::equity(vec![100.0, 101.0, 99.0]);
        let analyzer = MonteCarloPatternAnalyzer::with_config(AnalysisConfig::light());
        let report = analyzer.analyze(&input).unwrap();

        assert_eq!(report.patterns.autocorr.lb_stat.len(), 20);
        assert!(report.patterns.autocorr.lb_stat.iter().all(|v| v.is_nan()));
        assert!(report.patterns.motifs.motifs.is_empty());
        assert!(report.patterns.motifs.discord.is_none());
        assert_eq!(report.patterns.drawdown_clusters.k, 0);
        assert_eq!(report.mc.runs, 200);
        assert_eq!(report.leverageability.n_paths, 200);
    }
}
