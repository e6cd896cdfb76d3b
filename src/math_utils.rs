//! Mathematical utility functions shared by the metric, resampling and pattern
//! modules.

/// Small constant added to denominators that can legitimately be zero.
pub const EPSILON: f64 = 1e-9;

/// Safe comparison for floating point values (handles NaN)
pub fn float_total_cmp(a: &f64, b: &f64) -> std::cmp::Ordering {
    match (a.is_nan(), b.is_nan()) {
        (true, true) => std::cmp::Ordering::Equal,
        (true, false) => std::cmp::Ordering::Greater, // push NaN to end
        (false, true) => std::cmp::Ordering::Less,
        (false, false) => a.partial_cmp(b).unwrap_or(std::cmp::Ordering::Equal),
    }
}

/// Calculate percentile from sorted data using linear interpolation.
///
/// `p` is a fraction in [0, 1]. Matches the default linear method of the common
/// statistical packages.
pub fn percentile(sorted_data: &[f64], p: f64) -> f64 {
    if sorted_data.is_empty() {
        return f64::NAN;
    }

    if p <= 0.0 {
        return sorted_data[0];
    }

    if p >= 1.0 {
        return sorted_data[sorted_data.len() - 1];
    }

    let n = sorted_data.len();
    let index = p * (n - 1) as f64;
    let lower = index.floor() as usize;
    let upper = index.ceil() as usize;

    if lower == upper {
        sorted_data[lower]
    } else {
        let weight = index - lower as f64;
        sorted_data[lower] * (1.0 - weight) + sorted_data[upper] * weight
    }
}

/// Percentile of unsorted data; returns 0.0 for empty input.
pub fn percentile_of(values: &[f64], p: f64) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let mut sorted = values.to_vec();
    sorted.sort_by(float_total_cmp);
    percentile(&sorted, p)
}

/// Arithmetic mean; 0.0 for empty input.
pub fn mean(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    data.iter().sum::<f64>() / data.len() as f64
}

/// Sample standard deviation (n - 1 denominator); 0.0 with fewer than two points.
pub fn sample_std(data: &[f64]) -> f64 {
    let n = data.len();
    if n < 2 {
        return 0.0;
    }
    let m = mean(data);
    let ss: f64 = data.iter().map(|x| (x - m).powi(2)).sum();
    (ss / (n - 1) as f64).sqrt()
}

/// Population standard deviation (n denominator); 0.0 for empty input.
pub fn population_std(data: &[f64]) -> f64 {
    if data.is_empty() {
        return 0.0;
    }
    let m = mean(data);
    let ss: f64 = data.iter().map(|x| (x - m).powi(2)).sum();
    (ss / data.len() as f64).sqrt()
}

/// Running sum, same length as the input.
pub fn cumulative_sum(data: &[f64]) -> Vec<f64> {
    data.iter()
        .scan(0.0, |acc, &x| {
            *acc += x;
            Some(*acc)
        })
        .collect()
}

/// Differences of an equity curve with an implicit leading zero, so the output
/// has the same length and `out[0] == equity[0]`.
pub fn returns_from_equity(equity: &[f64]) -> Vec<f64> {
    let mut previous = 0.0;
    equity
        .iter()
        .map(|&value| {
            let step = value - previous;
            previous = value;
            step
        })
        .collect()
}

/// Running maximum of a series.
pub fn running_max(data: &[f64]) -> Vec<f64> {
    let mut peak = f64::NEG_INFINITY;
    data.iter()
        .map(|&x| {
            peak = peak.max(x);
            peak
        })
        .collect()
}

/// Distance below the running peak at each point (always <= 0).
pub fn drawdown_series(equity: &[f64]) -> Vec<f64> {
    equity
        .iter()
        .zip(running_max(equity))
        .map(|(value, peak)| value - peak)
        .collect()
}

/// Z-normalize a series using the population standard deviation.
pub fn z_normalize(data: &[f64]) -> Vec<f64> {
    let m = mean(data);
    let sd = population_std(data);
    data.iter().map(|x| (x - m) / (sd + EPSILON)).collect()
}

/// Euclidean distance between two equal-length slices.
pub fn euclidean_distance(a: &[f64], b: &[f64]) -> f64 {
    a.iter()
        .zip(b)
        .map(|(x, y)| (x - y).powi(2))
        .sum::<f64>()
        .sqrt()
}

/// Resample a series to `target_len` evenly spaced points by linear interpolation.
pub fn linear_resample(data: &[f64], target_len: usize) -> Vec<f64> {
    match (data.len(), target_len) {
        (_, 0) => Vec::new(),
        (0, _) => vec![0.0; target_len],
        (1, _) => vec![data[0]; target_len],
        (n, 1) => vec![data[n - 1]],
        (n, m) => {
            let scale = (n - 1) as f64 / (m - 1) as f64;
            (0..m)
                .map(|i| {
                    let position = i as f64 * scale;
                    let lower = (position.floor() as usize).min(n - 1);
                    let upper = (lower + 1).min(n - 1);
                    let weight = position - lower as f64;
                    data[lower] * (1.0 - weight) + data[upper] * weight
                })
                .collect()
        }
    }
}

/// Average ranks (1-based) with ties sharing the mean of their positions.
///
/// Also returns the tie correction term `sum(t^3 - t)` over tie groups.
pub fn rank_with_ties(data: &[f64]) -> (Vec<f64>, f64) {
    let n = data.len();
    let mut order: Vec<usize> = (0..n).collect();
    order.sort_by(|&a, &b| float_total_cmp(&data[a], &data[b]));

    let mut ranks = vec![0.0; n];
    let mut tie_term = 0.0;
    let mut i = 0;
    while i < n {
        let mut j = i;
        while j + 1 < n && data[order[j + 1]] == data[order[i]] {
            j += 1;
        }
        // positions i..=j share the average rank
        let average = (i + j) as f64 / 2.0 + 1.0;
        for &idx in &order[i..=j] {
            ranks[idx] = average;
        }
        let t = (j - i + 1) as f64;
        tie_term += t * t * t - t;
        i = j + 1;
    }

    (ranks, tie_term)
}
