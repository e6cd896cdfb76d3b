//! # Report Structures
//!
//! The report is the only persisted output of an analysis. Its JSON field
//! names and nesting are consumed by external renderers and by
//! [`crate::batch::summarize_reports`], so every key here is fixed.
//!
//! Statistics that could not be computed are NaN in memory and `null` on the
//! wire; see [`nullable`].

use crate::drawdown_clusters::DrawdownClusterResult;
use crate::errors::{PatternAnalysisError, PatternResult};
use crate::leverageability::LeverageabilityResult;
use crate::monte_carlo::MonteCarloSummary;
use crate::motifs::MotifResult;
use crate::pattern_detectors::{AutocorrelationResult, HourOfDayResult, RunsTestRecord};
use crate::performance::PerformanceMetrics;
use chrono::{SecondsFormat, Utc};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Serde helpers mapping non-finite floats to JSON `null` and back to NaN.
pub mod nullable {
    use serde::{Deserialize, Deserializer, Serializer};

    /// Serialize a float, writing `null` when it is not finite.
    pub fn serialize<S: Serializer>(value: &f64, serializer: S) -> Result<S::Ok, S::Error> {
        if value.is_finite() {
            serializer.serialize_f64(*value)
        } else {
            serializer.serialize_none()
        }
    }

    /// Deserialize a float, reading `null` as NaN.
    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<f64, D::Error> {
        Ok(Option::<f64>::deserialize(deserializer)?.unwrap_or(f64::NAN))
    }

    /// The same mapping applied element-wise to a `Vec<f64>`.
    pub mod vec {
        use serde::{Deserialize, Deserializer, Serializer};

        /// Serialize each element, non-finite values as `null`.
        pub fn serialize<S: Serializer>(values: &[f64], serializer: S) -> Result<S::Ok, S::Error> {
            serializer.collect_seq(values.iter().map(|v| v.is_finite().then_some(*v)))
        }

        /// Deserialize each element, `null` as NaN.
        pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec<f64>, D::Error> {
            let values = Vec::<Option<f64>>::deserialize(deserializer)?;
            Ok(values.into_iter().map(|v| v.unwrap_or(f64::NAN)).collect())
        }
    }
}

/// Outputs of every pattern detector, co-located without cross-detector invariants.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PatternReport {
    /// Hour-of-day effect
    pub hour_of_day: HourOfDayResult,
    /// Ljung-Box autocorrelation
    pub autocorr: AutocorrelationResult,
    /// Wald-Wolfowitz runs test
    pub runs_test: RunsTestRecord,
    /// Motifs and discord
    pub motifs: MotifResult,
    /// Drawdown shape clusters
    pub drawdown_clusters: DrawdownClusterResult,
}

/// Complete analysis report.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Report {
    /// 8-character process-random identifier
    pub run_id: String,
    /// Creation time, ISO-8601 UTC
    pub timestamp: String,
    /// Metrics of the observed sequence
    pub base_metrics: PerformanceMetrics,
    /// Monte Carlo distribution summary
    pub mc: MonteCarloSummary,
    /// Pattern detector outputs
    pub patterns: PatternReport,
    /// Hour filter uplift test
    pub leverageability: LeverageabilityResult,
}

impl Report {
    /// Assemble a report with a fresh run id and the current UTC time.
    pub fn new(
        base_metrics: PerformanceMetrics,
        mc: MonteCarloSummary,
        patterns: PatternReport,
        leverageability: LeverageabilityResult,
    ) -> Self {
        Self {
            run_id: generate_run_id(),
            timestamp: Utc::now().to_rfc3339_opts(SecondsFormat::Secs, true),
            base_metrics,
            mc,
            patterns,
            leverageability,
        }
    }

    /// File name this report is stored under.
    pub fn file_name(&self) -> String {
        format!("mc_report_{}.json", self.run_id)
    }

    /// Pretty-printed JSON.
    pub fn to_json_pretty(&self) -> PatternResult<String> {
        serde_json::to_string_pretty(self).map_err(|e| PatternAnalysisError::SerializationError {
            format: "json".to_string(),
            reason: e.to_string(),
        })
    }

    /// Parse a report previously written by [`Report::to_json_pretty`].
    pub fn from_json_str(text: &str) -> PatternResult<Self> {
        serde_json::from_str(text).map_err(|e| PatternAnalysisError::SerializationError {
            format: "json".to_string(),
            reason: e.to_string(),
        })
    }

    /// Write the report into `dir` (created if missing) and return its path.
    pub fn write_to_dir(&self, dir: &Path) -> PatternResult<PathBuf> {
        fs::create_dir_all(dir)
            .map_err(|e| PatternAnalysisError::io(format!("create directory {}", dir.display()), e))?;
        let path = dir.join(self.file_name());
        fs::write(&path, self.to_json_pretty()?)
            .map_err(|e| PatternAnalysisError::io(format!("write {}", path.display()), e))?;
        Ok(path)
    }
}

/// First 8 hex characters of a random UUID.
pub fn generate_run_id() -> String {
    let mut id = uuid::Uuid::new_v4().simple().to_string();
    id.truncate(8);
    id
}
