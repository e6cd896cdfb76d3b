//! Hour-of-day, autocorrelation and runs-test detectors over a normalized sequence.
//!
//! Each detector is a pure function returning `Result<Record, DegradedStatistic>`.
//! The `neutral` constructor on each record is the value the report carries
//! when the detector degrades.

use crate::errors::DegradedStatistic;
use crate::math_utils::{float_total_cmp, mean, sample_std};
use crate::preprocessing::NormalizedSequence;
use crate::results::nullable;
use crate::statistical_tests::{kruskal_wallis_test, ljung_box_test, runs_test};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Per-hour return statistics.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct HourStats {
    /// Hour bucket
    pub hour: u8,
    /// Mean step return
    pub mean: f64,
    /// Sample standard deviation (0.0 for a single observation)
    pub std: f64,
    /// Number of steps in this hour
    pub count: usize,
}

/// Hour-of-day effect result.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HourOfDayResult {
    /// One row per observed hour, ascending by hour
    pub table: Vec<HourStats>,
    /// Kruskal-Wallis H (NaN / `null` when not computable)
    #[serde(rename = "kruskal_H", with = "nullable")]
    pub kruskal_h: f64,
    /// Kruskal-Wallis p-value
    pub p_value: f64,
    /// Highest-mean hours, best first
    pub best_hours: Vec<u8>,
    /// Lowest-mean hours, worst first
    pub worst_hours: Vec<u8>,
}

impl HourOfDayResult {
    /// Empty result with the neutral test outcome.
    pub fn neutral() -> Self {
        Self {
            table: Vec::new(),
            kruskal_h: f64::NAN,
            p_value: 1.0,
            best_hours: Vec::new(),
            worst_hours: Vec::new(),
        }
    }
}

/// Ljung-Box result at every lag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AutocorrelationResult {
    /// Q statistic per lag (NaN / `null` when degraded)
    #[serde(with = "nullable::vec")]
    pub lb_stat: Vec<f64>,
    /// p-value per lag
    pub lb_p: Vec<f64>,
}

impl AutocorrelationResult {
    /// NaN statistics and p = 1 at every lag.
    pub fn neutral(lags: usize) -> Self {
        Self {
            lb_stat: vec![f64::NAN; lags],
            lb_p: vec![1.0; lags],
        }
    }
}

/// Runs-test result.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RunsTestRecord {
    /// z score
    pub z: f64,
    /// Two-sided p-value
    pub p: f64,
    /// Observed runs
    pub runs: usize,
    /// Positive returns
    pub n_pos: usize,
    /// Negative returns
    pub n_neg: usize,
}

impl RunsTestRecord {
    /// z = 0, p = 1, no runs.
    pub fn neutral() -> Self {
        Self {
            z: 0.0,
            p: 1.0,
            runs: 0,
            n_pos: 0,
            n_neg: 0,
        }
    }
}

/// Group step returns by hour and test for a difference between hours.
///
/// The Kruskal-Wallis part may degrade on its own; the table and best/worst
/// hours are still reported in that case.
pub fn hour_of_day_effect(sequence: &NormalizedSequence, rank_count: usize) -> HourOfDayResult {
    let mut groups: BTreeMap<u8, Vec<f64>> = BTreeMap::new();
    for (&hour, &ret) in sequence.hour.iter().zip(&sequence.step_return) {
        groups.entry(hour).or_default().push(ret);
    }

    let table: Vec<HourStats> = groups
        .iter()
        .map(|(&hour, values)| HourStats {
            hour,
            mean: mean(values),
            std: sample_std(values),
            count: values.len(),
        })
        .collect();

    let mut by_mean = table.clone();
    // stable: equal means keep ascending-hour order
    by_mean.sort_by(|a, b| float_total_cmp(&b.mean, &a.mean));
    let best_hours = by_mean.iter().take(rank_count).map(|s| s.hour).collect();
    by_mean.sort_by(|a, b| float_total_cmp(&a.mean, &b.mean));
    let worst_hours = by_mean.iter().take(rank_count).map(|s| s.hour).collect();

    let group_values: Vec<Vec<f64>> = groups.into_values().collect();
    let (kruskal_h, p_value) = match kruskal_wallis_test(&group_values) {
        Ok(result) => (result.statistic, result.p_value),
        Err(degraded) => {
            log::debug!("{}", degraded);
            (f64::NAN, 1.0)
        }
    };

    HourOfDayResult {
        table,
        kruskal_h,
        p_value,
        best_hours,
        worst_hours,
    }
}

/// Ljung-Box test on the step returns.
pub fn autocorrelation_detector(
    sequence: &NormalizedSequence,
    lags: usize,
) -> Result<AutocorrelationResult, DegradedStatistic> {
    let result = ljung_box_test(&sequence.step_return, lags)?;
    Ok(AutocorrelationResult {
        lb_stat: result.statistics,
        lb_p: result.p_values,
    })
}

/// Wald-Wolfowitz runs test on the signs of the step returns.
pub fn runs_test_detector(sequence: &NormalizedSequence) -> Result<RunsTestRecord, DegradedStatistic> {
    let result = runs_test(&sequence.step_return)?;
    Ok(RunsTestRecord {
        z: result.z,
        p: result.p_value,
        runs: result.runs,
        n_pos: result.n_pos,
        n_neg: result.n_neg,
    })
}
