//! Batch analysis over directories of trade or equity files.
//!
//! Each file is analyzed independently; with the `parallel` feature files are
//! processed on the rayon pool. A file that cannot be read, parsed or analyzed
//! is logged and recorded as a failure, and the batch carries on. Reports are
//! written as `mc_report_<run_id>.json`, so concurrent writers never collide.

use crate::analyzer::analyze_with_config;
use crate::config::AnalysisConfig;
use crate::errors::{PatternAnalysisError, PatternResult};
use crate::preprocessing::SequenceInput;
use crate::results::Report;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// Prefix of report files, skipped when scanning for inputs.
const REPORT_PREFIX: &str = "mc_report_";

/// One successfully analyzed file.
#[derive(Debug, Clone)]
pub struct BatchItem {
    /// Input file
    pub source: PathBuf,
    /// Where the report was written, if an output directory was given
    pub written_to: Option<PathBuf>,
    /// The report
    pub report: Report,
}

/// One file that could not be analyzed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BatchItemFailure {
    /// Input file
    pub source: PathBuf,
    /// Error text
    pub error: String,
}

/// Outcome of a directory batch.
#[derive(Debug, Clone, Default)]
pub struct BatchSummary {
    /// Number of files analyzed successfully
    pub succeeded: usize,
    /// Files that failed, in path order
    pub failed: Vec<BatchItemFailure>,
    /// Successful reports, in path order
    pub reports: Vec<BatchItem>,
}

impl BatchSummary {
    /// Total files attempted.
    pub fn total(&self) -> usize {
        self.succeeded + self.failed.len()
    }
}

/// Read and analyze one input file.
pub fn analyze_file(path: &Path, config: &AnalysisConfig) -> PatternResult<Report> {
    let text = fs::read_to_string(path)
        .map_err(|e| PatternAnalysisError::io(format!("read {}", path.display()), e))?;
    let input = SequenceInput::from_json_str(&text)?;
    analyze_with_config(&input, config)
}

/// Analyze every `*.json` input in `dir`, optionally writing reports to `out_dir`.
///
/// Fails only if `dir` itself cannot be listed.
pub fn analyze_directory(
    dir: &Path,
    config: &AnalysisConfig,
    out_dir: Option<&Path>,
) -> PatternResult<BatchSummary> {
    config.validate()?;
    let files = input_files(dir)?;
    log::info!("Batch over {} input files in {}", files.len(), dir.display());

    let outcomes = run_items(&files, config, out_dir);

    let mut summary = BatchSummary::default();
    for (source, outcome) in files.into_iter().zip(outcomes) {
        match outcome {
            Ok((report, written_to)) => {
                summary.succeeded += 1;
                summary.reports.push(BatchItem {
                    source,
                    written_to,
                    report,
                });
            }
            Err(error) => {
                log::warn!("Skipping {}: {}", source.display(), error);
                summary.failed.push(BatchItemFailure {
                    source,
                    error: error.to_string(),
                });
            }
        }
    }

    log::info!(
        "Batch finished: {} succeeded, {} failed",
        summary.succeeded,
        summary.failed.len()
    );
    Ok(summary)
}

type ItemOutcome = PatternResult<(Report, Option<PathBuf>)>;

fn run_items(files: &[PathBuf], config: &AnalysisConfig, out_dir: Option<&Path>) -> Vec<ItemOutcome> {
    let process = |path: &PathBuf| -> ItemOutcome {
        let report = analyze_file(path, config)?;
        let written_to = match out_dir {
            Some(dir) => Some(report.write_to_dir(dir)?),
            None => None,
        };
        Ok((report, written_to))
    };

    #[cfg(feature = "parallel")]
    {
        if config.parallel {
            use rayon::prelude::*;
            return files.par_iter().map(process).collect();
        }
    }

    files.iter().map(process).collect()
}

fn input_files(dir: &Path) -> PatternResult<Vec<PathBuf>> {
    let entries = fs::read_dir(dir)
        .map_err(|e| PatternAnalysisError::io(format!("list {}", dir.display()), e))?;

    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && has_json_extension(path))
        .filter(|path| !is_report_file(path))
        .collect();
    files.sort();
    Ok(files)
}

fn has_json_extension(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map_or(false, |ext| ext.eq_ignore_ascii_case("json"))
}

fn is_report_file(path: &Path) -> bool {
    path.file_name()
        .and_then(|name| name.to_str())
        .map_or(false, |name| name.starts_with(REPORT_PREFIX))
}

/// Presentation grade for a Sharpe ratio.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SharpeGrade {
    /// Sharpe >= 2.0
    Excellent,
    /// Sharpe >= 1.0
    Good,
    /// Sharpe >= 0.0
    Marginal,
    /// Negative or undefined Sharpe
    Poor,
}

impl SharpeGrade {
    /// Grade a Sharpe ratio.
    pub fn from_sharpe(sharpe: f64) -> Self {
        if sharpe >= 2.0 {
            SharpeGrade::Excellent
        } else if sharpe >= 1.0 {
            SharpeGrade::Good
        } else if sharpe >= 0.0 {
            SharpeGrade::Marginal
        } else {
            SharpeGrade::Poor
        }
    }
}

impl fmt::Display for SharpeGrade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            SharpeGrade::Excellent => "excellent",
            SharpeGrade::Good => "good",
            SharpeGrade::Marginal => "marginal",
            SharpeGrade::Poor => "poor",
        };
        f.write_str(label)
    }
}

/// One line of a batch summary table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportSummaryRow {
    /// Report file
    pub file: PathBuf,
    /// Report run id
    pub run_id: String,
    /// Base Sharpe
    pub sharpe: f64,
    /// Base max drawdown
    pub max_dd: f64,
    /// Monte Carlo Sharpe 5th percentile
    pub mc_sharpe_p05: f64,
    /// Monte Carlo Sharpe 95th percentile
    pub mc_sharpe_p95: f64,
    /// Fraction of paths where the hour filter helped
    pub uplift_frac_positive: f64,
    /// Best hours from the hour-of-day detector
    pub best_hours: Vec<u8>,
    /// Grade of the base Sharpe
    pub grade: SharpeGrade,
}

impl ReportSummaryRow {
    /// Summarize one report.
    pub fn from_report(file: PathBuf, report: &Report) -> Self {
        Self {
            file,
            run_id: report.run_id.clone(),
            sharpe: report.base_metrics.sharpe,
            max_dd: report.base_metrics.max_dd,
            mc_sharpe_p05: report.mc.sharpe_p05,
            mc_sharpe_p95: report.mc.sharpe_p95,
            uplift_frac_positive: report.leverageability.uplift_frac_positive,
            best_hours: report.patterns.hour_of_day.best_hours.clone(),
            grade: SharpeGrade::from_sharpe(report.base_metrics.sharpe),
        }
    }
}

/// Read every report in `dir` and summarize them, best Sharpe first.
///
/// JSON files that are not reports are skipped with a warning.
pub fn summarize_reports(dir: &Path) -> PatternResult<Vec<ReportSummaryRow>> {
    let entries = fs::read_dir(dir)
        .map_err(|e| PatternAnalysisError::io(format!("list {}", dir.display()), e))?;
    let mut files: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok().map(|e| e.path()))
        .filter(|path| path.is_file() && has_json_extension(path))
        .collect();
    files.sort();

    let mut rows = Vec::with_capacity(files.len());
    for path in files {
        let parsed = fs::read_to_string(&path)
            .map_err(|e| PatternAnalysisError::io(format!("read {}", path.display()), e))
            .and_then(|text| Report::from_json_str(&text));
        match parsed {
            Ok(report) => rows.push(ReportSummaryRow::from_report(path, &report)),
            Err(e) => log::warn!("Not a report, skipping {}: {}", path.display(), e),
        }
    }

    rows.sort_by(|a, b| b.sharpe.total_cmp(&a.sharpe));
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sharpe_grades() {
        assert_eq!(SharpeGrade::from_sharpe(2.0), SharpeGrade::Excellent);
        assert_eq!(SharpeGrade::from_sharpe(1.5), SharpeGrade::Good);
        assert_eq!(SharpeGrade::from_sharpe(0.0), SharpeGrade::Marginal);
        assert_eq!(SharpeGrade::from_sharpe(-0.1), SharpeGrade::Poor);
        assert_eq!(SharpeGrade::from_sharpe(f64::NAN), SharpeGrade::Poor);
        assert_eq!(SharpeGrade::Good.to_string(), "good");
    }

    #[test]
    fn test_input_files_sorted_and_filtered() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.json", "a.JSON", "notes.txt", "mc_report_1234abcd.json"] {
            fs::write(dir.path().join(name), "{}").unwrap();
        }
        let files = input_files(dir.path()).unwrap();
        let names: Vec<_> = files
            .iter()
            .map(|p| p.file_name().unwrap().to_str().unwrap().to_string())
            .collect();
        assert_eq!(names, vec!["a.JSON", "b.json"]);
    }

    #[test]
    fn test_missing_directory_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("absent");
        assert!(matches!(
            analyze_directory(&missing, &AnalysisConfig::light(), None),
            Err(PatternAnalysisError::IoError { .. })
        ));
    }
}
