//! Nonparametric hypothesis tests used by the pattern detectors.
//!
//! Each test returns `Result<_, DegradedStatistic>`: when the data cannot
//! support the test (too few groups, too short, no sign variation) the caller
//! gets a typed degraded outcome instead of a panic or a NaN leaking through.

use crate::errors::DegradedStatistic;
use crate::math_utils::{mean, rank_with_ties, EPSILON};
use statrs::distribution::{ChiSquared, ContinuousCDF, Normal};

/// Kruskal-Wallis H statistic and its chi-squared p-value.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KruskalWallisResult {
    /// Tie-corrected H statistic
    pub statistic: f64,
    /// Upper-tail p-value with `groups - 1` degrees of freedom
    pub p_value: f64,
    /// Number of groups that entered the test
    pub groups: usize,
}

/// Ljung-Box statistics for lags `1..=lags`.
#[derive(Debug, Clone, PartialEq)]
pub struct LjungBoxResult {
    /// Cumulative Q statistic at each lag
    pub statistics: Vec<f64>,
    /// p-value at each lag (chi-squared with `lag` degrees of freedom)
    pub p_values: Vec<f64>,
}

/// Wald-Wolfowitz runs test on the signs of a series.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RunsTestResult {
    /// Normal-approximation z score
    pub z: f64,
    /// Two-sided p-value
    pub p_value: f64,
    /// Observed number of runs
    pub runs: usize,
    /// Count of positive values
    pub n_pos: usize,
    /// Count of negative values
    pub n_neg: usize,
}

fn chi_squared_sf(statistic: f64, degrees_of_freedom: f64) -> Option<f64> {
    let chi_sq = ChiSquared::new(degrees_of_freedom).ok()?;
    Some((1.0 - chi_sq.cdf(statistic)).clamp(0.0, 1.0))
}

/// Kruskal-Wallis H-test across groups.
///
/// Only groups with more than one observation take part; at least two such
/// groups are required.
pub fn kruskal_wallis_test(groups: &[Vec<f64>]) -> Result<KruskalWallisResult, DegradedStatistic> {
    const NAME: &str = "kruskal_wallis";

    let eligible: Vec<&Vec<f64>> = groups.iter().filter(|g| g.len() > 1).collect();
    if eligible.len() < 2 {
        return Err(DegradedStatistic::new(
            NAME,
            format!(
                "need at least 2 groups with more than one observation, got {}",
                eligible.len()
            ),
        ));
    }

    let pooled: Vec<f64> = eligible.iter().flat_map(|g| g.iter().copied()).collect();
    let n = pooled.len() as f64;
    let (ranks, tie_term) = rank_with_ties(&pooled);

    let mut offset = 0;
    let mut rank_term = 0.0;
    for group in &eligible {
        let rank_sum: f64 = ranks[offset..offset + group.len()].iter().sum();
        rank_term += rank_sum * rank_sum / group.len() as f64;
        offset += group.len();
    }

    let h = 12.0 / (n * (n + 1.0)) * rank_term - 3.0 * (n + 1.0);
    let correction = 1.0 - tie_term / (n * n * n - n);
    if correction <= EPSILON {
        return Err(DegradedStatistic::new(NAME, "all observations are tied"));
    }
    let statistic = h / correction;

    let df = (eligible.len() - 1) as f64;
    let p_value = chi_squared_sf(statistic, df)
        .ok_or_else(|| DegradedStatistic::new(NAME, "invalid chi-squared degrees of freedom"))?;

    Ok(KruskalWallisResult {
        statistic,
        p_value,
        groups: eligible.len(),
    })
}

/// Ljung-Box portmanteau test reported at every lag up to `lags`.
///
/// `r_k = sum((x_t - m)(x_{t-k} - m)) / sum((x_t - m)^2)` and
/// `Q_k = n(n+2) * sum_{j<=k} r_j^2 / (n - j)`.
pub fn ljung_box_test(data: &[f64], lags: usize) -> Result<LjungBoxResult, DegradedStatistic> {
    const NAME: &str = "ljung_box";

    if lags == 0 {
        return Err(DegradedStatistic::new(NAME, "lags must be > 0"));
    }
    let n = data.len();
    if n <= lags {
        return Err(DegradedStatistic::new(
            NAME,
            format!("need more than {} observations, got {}", lags, n),
        ));
    }

    let m = mean(data);
    let variance: f64 = data.iter().map(|x| (x - m).powi(2)).sum();

    // No variance means no serial correlation to detect
    if variance.abs() < 1e-12 {
        return Ok(LjungBoxResult {
            statistics: vec![0.0; lags],
            p_values: vec![1.0; lags],
        });
    }

    let nf = n as f64;
    let mut statistics = Vec::with_capacity(lags);
    let mut p_values = Vec::with_capacity(lags);
    let mut q = 0.0;
    for k in 1..=lags {
        let mut autocorr = 0.0;
        for i in k..n {
            autocorr += (data[i] - m) * (data[i - k] - m);
        }
        autocorr /= variance;
        q += autocorr.powi(2) * nf * (nf + 2.0) / (n - k) as f64;

        let p = chi_squared_sf(q, k as f64)
            .ok_or_else(|| DegradedStatistic::new(NAME, "invalid chi-squared degrees of freedom"))?;
        statistics.push(q);
        p_values.push(p);
    }

    Ok(LjungBoxResult {
        statistics,
        p_values,
    })
}

/// Wald-Wolfowitz runs test on the signs of `data`, ignoring zeros.
///
/// With fewer than two non-zero values the test degrades. When every value has
/// the same sign there is one run, zero variance under the null, and the
/// guarded z score is 0 with p = 1.
pub fn runs_test(data: &[f64]) -> Result<RunsTestResult, DegradedStatistic> {
    let signs: Vec<bool> = data.iter().filter(|&&x| x != 0.0).map(|&x| x > 0.0).collect();
    if signs.len() < 2 {
        return Err(DegradedStatistic::new(
            "runs_test",
            format!("need at least 2 non-zero values, got {}", signs.len()),
        ));
    }

    let runs = 1 + signs.windows(2).filter(|w| w[0] != w[1]).count();
    let n_pos = signs.iter().filter(|&&s| s).count();
    let n_neg = signs.len() - n_pos;

    let n1 = n_pos as f64;
    let n2 = n_neg as f64;
    let n = n1 + n2;
    let expected = 2.0 * n1 * n2 / n + 1.0;
    let variance = 2.0 * n1 * n2 * (2.0 * n1 * n2 - n) / (n * n * (n - 1.0));

    let z = (runs as f64 - expected) / (variance.max(0.0).sqrt() + EPSILON);
    let p_value = match Normal::new(0.0, 1.0) {
        Ok(normal) => (2.0 * (1.0 - normal.cdf(z.abs()))).clamp(0.0, 1.0),
        Err(_) => 1.0,
    };

    Ok(RunsTestResult {
        z,
        p_value,
        runs,
        n_pos,
        n_neg,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::secure_rng::SecureRng;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_kruskal_wallis_known_value() {
        // Three groups without ties: ranks 1..9
        let groups = vec![
            vec![1.0, 2.0, 3.0],
            vec![4.0, 5.0, 6.0],
            vec![7.0, 8.0, 9.0],
        ];
        let result = kruskal_wallis_test(&groups).unwrap();
        // rank sums 6, 15, 24 -> H = 12/90 * (12 + 75 + 192) - 30 = 7.2
        assert_approx_eq!(result.statistic, 7.2, 1e-9);
        assert_approx_eq!(result.p_value, (-7.2f64 / 2.0).exp(), 1e-6);
        assert_eq!(result.groups, 3);
    }

    #[test]
    fn test_kruskal_wallis_needs_two_groups() {
        let groups = vec![vec![1.0, 2.0], vec![3.0]];
        let degraded = kruskal_wallis_test(&groups).unwrap_err();
        assert_eq!(degraded.test_name, "kruskal_wallis");

        let tied = vec![vec![1.0, 1.0], vec![1.0, 1.0]];
        assert!(kruskal_wallis_test(&tied).is_err());
    }

    #[test]
    fn test_ljung_box_on_white_noise() {
        let mut rng = SecureRng::with_seed(42);
        let data: Vec<f64> = (0..500).map(|_| rng.f64() * 2.0 - 1.0).collect();
        let result = ljung_box_test(&data, 10).unwrap();
        assert_eq!(result.statistics.len(), 10);
        assert!(result.statistics.windows(2).all(|w| w[1] >= w[0]));
        assert!(result.p_values[9] > 0.001, "p = {}", result.p_values[9]);
    }

    #[test]
    fn test_ljung_box_detects_persistence() {
        let data: Vec<f64> = (0..200).map(|i| (i as f64 / 15.0).sin()).collect();
        let result = ljung_box_test(&data, 5).unwrap();
        assert!(result.p_values.iter().all(|&p| p < 1e-6));
    }

    #[test]
    fn test_ljung_box_short_series_degrades() {
        assert!(ljung_box_test(&[1.0, 2.0, 3.0], 20).is_err());
        assert!(ljung_box_test(&[1.0, 2.0, 3.0], 0).is_err());
    }

    #[test]
    fn test_runs_test_alternating() {
        let data: Vec<f64> = (0..20).map(|i| if i % 2 == 0 { 1.0 } else { -1.0 }).collect();
        let result = runs_test(&data).unwrap();
        assert_eq!(result.runs, 20);
        assert_eq!(result.n_pos, 10);
        assert_eq!(result.n_neg, 10);
        assert!(result.z > 0.0);
        assert!(result.p_value < 0.01);
    }

    #[test]
    fn test_runs_test_single_sign() {
        let result = runs_test(&[1.0, 2.0, 0.0, 3.0]).unwrap();
        assert_eq!(result.runs, 1);
        assert_eq!(result.n_neg, 0);
        assert!(result.z.is_finite());
        assert_approx_eq!(result.z, 0.0);
        assert_approx_eq!(result.p_value, 1.0);
    }

    #[test]
    fn test_runs_test_too_few_signs() {
        assert!(runs_test(&[0.0, 0.0, 5.0]).is_err());
        assert!(runs_test(&[]).is_err());
    }
}
