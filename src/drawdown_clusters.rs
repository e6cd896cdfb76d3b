//! Drawdown episode extraction and shape clustering.
//!
//! An episode runs from the peak preceding a dip below the running maximum to
//! the point where equity recovers that peak (or the end of the series). Each
//! qualifying episode is scaled by its depth, resampled to a fixed length and
//! clustered with K-Means (k-means++ seeding).

use crate::errors::DegradedStatistic;
use crate::math_utils::{drawdown_series, euclidean_distance, linear_resample, EPSILON};
use crate::secure_rng::SecureRng;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Convergence tolerance on centroid movement.
const KMEANS_TOLERANCE: f64 = 1e-6;

/// One contiguous drawdown.
#[derive(Debug, Clone, PartialEq)]
pub struct DrawdownEpisode {
    /// Index of the peak the drawdown starts from
    pub start: usize,
    /// Recovery index, or the last index if never recovered
    pub end: usize,
    /// Drawdown values over `start..=end` (all <= 0)
    pub values: Vec<f64>,
}

impl DrawdownEpisode {
    /// Number of points in the episode.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// True for an empty episode.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Deepest point as a non-negative magnitude.
    pub fn depth(&self) -> f64 {
        self.values.iter().fold(0.0_f64, |d, &v| d.min(v)).abs()
    }

    /// Depth-scaled shape resampled to `len` points, values in [-1, 0].
    pub fn shape(&self, len: usize) -> Vec<f64> {
        let scale = self.depth() + EPSILON;
        let scaled: Vec<f64> = self.values.iter().map(|v| v / scale).collect();
        linear_resample(&scaled, len)
    }
}

/// Parameters for drawdown clustering.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DrawdownClusterConfig {
    /// Requested cluster count
    pub clusters: usize,
    /// Minimum episode length
    pub min_len: usize,
    /// Resampled shape length
    pub resample_len: usize,
    /// K-Means iteration cap
    pub max_iterations: usize,
}

impl Default for DrawdownClusterConfig {
    fn default() -> Self {
        Self {
            clusters: 3,
            min_len: 5,
            resample_len: 50,
            max_iterations: 100,
        }
    }
}

/// Clustering output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DrawdownClusterResult {
    /// Number of clusters actually fitted
    pub k: usize,
    /// Episode count per cluster id
    pub counts: BTreeMap<String, usize>,
    /// Cluster centers, each of the resampled length
    pub centers: Vec<Vec<f64>>,
}

impl DrawdownClusterResult {
    /// No clusters.
    pub fn neutral() -> Self {
        Self {
            k: 0,
            counts: BTreeMap::new(),
            centers: Vec::new(),
        }
    }
}

/// K-Means fit.
#[derive(Debug, Clone, PartialEq)]
pub struct KMeansFit {
    /// Final centroids
    pub centers: Vec<Vec<f64>>,
    /// Cluster index per point
    pub labels: Vec<usize>,
}

/// Extract every contiguous drawdown episode from an equity curve.
pub fn extract_drawdown_episodes(equity: &[f64]) -> Vec<DrawdownEpisode> {
    let dd = drawdown_series(equity);
    let mut episodes = Vec::new();
    let mut current: Option<usize> = None;

    for (i, &value) in dd.iter().enumerate() {
        match (current, value < 0.0) {
            (None, true) => current = Some(i.saturating_sub(1)),
            (Some(start), false) => {
                episodes.push(DrawdownEpisode {
                    start,
                    end: i,
                    values: dd[start..=i].to_vec(),
                });
                current = None;
            }
            _ => {}
        }
    }

    if let Some(start) = current {
        let end = dd.len() - 1;
        episodes.push(DrawdownEpisode {
            start,
            end,
            values: dd[start..=end].to_vec(),
        });
    }

    episodes
}

/// Cluster the shapes of all qualifying drawdown episodes.
pub fn cluster_drawdowns(
    equity: &[f64],
    config: &DrawdownClusterConfig,
    rng: &mut SecureRng,
) -> Result<DrawdownClusterResult, DegradedStatistic> {
    const NAME: &str = "drawdown_clusters";

    let shapes: Vec<Vec<f64>> = extract_drawdown_episodes(equity)
        .iter()
        .filter(|episode| episode.len() >= config.min_len)
        .map(|episode| episode.shape(config.resample_len))
        .collect();

    if shapes.is_empty() {
        return Err(DegradedStatistic::new(
            NAME,
            format!("no drawdown episodes of length >= {}", config.min_len),
        ));
    }
    if config.clusters == 0 {
        return Err(DegradedStatistic::new(NAME, "requested cluster count is 0"));
    }

    // k never exceeds the number of episodes
    let k = config.clusters.min(shapes.len());
    let fit = kmeans(&shapes, k, config.max_iterations, rng);

    let mut counts: BTreeMap<String, usize> = (0..k).map(|c| (c.to_string(), 0)).collect();
    for label in &fit.labels {
        *counts.entry(label.to_string()).or_insert(0) += 1;
    }

    Ok(DrawdownClusterResult {
        k,
        counts,
        centers: fit.centers,
    })
}

/// Lloyd's K-Means with k-means++ initialization.
///
/// Precondition: `1 <= k <= points.len()` and all points share one length.
pub fn kmeans(points: &[Vec<f64>], k: usize, max_iterations: usize, rng: &mut SecureRng) -> KMeansFit {
    let mut centers = initialize_centroids_plus_plus(points, k, rng);
    let mut labels = vec![0; points.len()];

    for _ in 0..max_iterations.max(1) {
        // Assignment step
        for (label, point) in labels.iter_mut().zip(points) {
            *label = nearest_center(point, &centers).0;
        }

        // Update step
        let dims = centers[0].len();
        let mut sums = vec![vec![0.0; dims]; k];
        let mut counts = vec![0usize; k];
        for (point, &label) in points.iter().zip(&labels) {
            for (acc, value) in sums[label].iter_mut().zip(point) {
                *acc += value;
            }
            counts[label] += 1;
        }

        let mut max_change = 0.0_f64;
        for c in 0..k {
            if counts[c] == 0 {
                // keep empty clusters where they are
                continue;
            }
            let updated: Vec<f64> = sums[c].iter().map(|s| s / counts[c] as f64).collect();
            max_change = max_change.max(euclidean_distance(&updated, &centers[c]));
            centers[c] = updated;
        }

        if max_change < KMEANS_TOLERANCE {
            break;
        }
    }

    for (label, point) in labels.iter_mut().zip(points) {
        *label = nearest_center(point, &centers).0;
    }

    KMeansFit { centers, labels }
}

fn nearest_center(point: &[f64], centers: &[Vec<f64>]) -> (usize, f64) {
    let mut best = (0, f64::INFINITY);
    for (j, center) in centers.iter().enumerate() {
        let dist = euclidean_distance(point, center);
        if dist < best.1 {
            best = (j, dist);
        }
    }
    best
}

fn initialize_centroids_plus_plus(points: &[Vec<f64>], k: usize, rng: &mut SecureRng) -> Vec<Vec<f64>> {
    let mut centers = Vec::with_capacity(k);
    centers.push(points[rng.usize(0..points.len())].clone());

    while centers.len() < k {
        let weights: Vec<f64> = points
            .iter()
            .map(|p| nearest_center(p, &centers).1.powi(2))
            .collect();
        let total: f64 = weights.iter().sum();

        let chosen = if total <= EPSILON {
            // every point coincides with a center
            rng.usize(0..points.len())
        } else {
            let target = rng.f64() * total;
            let mut cumulative = 0.0;
            weights
                .iter()
                .position(|w| {
                    cumulative += w;
                    cumulative >= target
                })
                .unwrap_or(points.len() - 1)
        };
        centers.push(points[chosen].clone());
    }

    centers
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_approx_eq::assert_approx_eq;

    #[test]
    fn test_extract_episodes() {
        let equity = vec![1.0, 3.0, 2.0, 1.0, 4.0, 3.0, 3.5];
        let episodes = extract_drawdown_episodes(&equity);
        assert_eq!(episodes.len(), 2);
        assert_eq!(episodes[0].start, 1);
        assert_eq!(episodes[0].end, 4);
        assert_eq!(episodes[0].values, vec![0.0, -1.0, -2.0, 0.0]);
        assert_approx_eq!(episodes[0].depth(), 2.0);
        // second episode never recovers
        assert_eq!(episodes[1].start, 4);
        assert_eq!(episodes[1].end, 6);
    }

    #[test]
    fn test_monotonic_curve_has_no_episodes() {
        let equity: Vec<f64> = (0..20).map(|i| i as f64).collect();
        assert!(extract_drawdown_episodes(&equity).is_empty());
        let mut rng = SecureRng::with_seed(1);
        assert!(cluster_drawdowns(&equity, &DrawdownClusterConfig::default(), &mut rng).is_err());
    }

    #[test]
    fn test_shape_is_depth_scaled() {
        let episode = DrawdownEpisode {
            start: 0,
            end: 4,
            values: vec![0.0, -5.0, -10.0, -5.0, 0.0],
        };
        let shape = episode.shape(50);
        assert_eq!(shape.len(), 50);
        assert_approx_eq!(shape[0], 0.0);
        assert_approx_eq!(shape[49], 0.0);
        // 50 grid points straddle the trough at the midpoint
        let min = shape.iter().cloned().fold(f64::INFINITY, f64::min);
        assert!((-1.0..=-0.97).contains(&min), "min = {}", min);

        // 49 points put a sample exactly on the trough
        let odd = episode.shape(49);
        assert_approx_eq!(odd[24], -1.0, 1e-6);
        assert!(odd.iter().all(|v| (-1.0..=0.0).contains(v)));
    }

    #[test]
    fn test_k_clamped_to_episode_count() {
        // two V-shaped drawdowns of length 7
        let mut equity = Vec::new();
        let mut level = 0.0;
        for _ in 0..2 {
            for step in [1.0, -1.0, -1.0, -1.0, 1.0, 1.0, 1.0, 1.0] {
                level += step;
                equity.push(level);
            }
        }
        let mut rng = SecureRng::with_seed(4);
        let result = cluster_drawdowns(&equity, &DrawdownClusterConfig::default(), &mut rng).unwrap();
        assert_eq!(result.k, 2);
        assert_eq!(result.centers.len(), 2);
        assert!(result.centers.iter().all(|c| c.len() == 50));
        assert_eq!(result.counts.values().sum::<usize>(), 2);
    }

    #[test]
    fn test_kmeans_separates_groups() {
        let mut points = Vec::new();
        for i in 0..10 {
            points.push(vec![0.0 + i as f64 * 0.01, 0.0]);
            points.push(vec![10.0 + i as f64 * 0.01, 10.0]);
        }
        let mut rng = SecureRng::with_seed(9);
        let fit = kmeans(&points, 2, 100, &mut rng);
        for pair in fit.labels.chunks(2) {
            assert_ne!(pair[0], pair[1]);
        }
        assert!(fit.labels.iter().step_by(2).all(|&l| l == fit.labels[0]));
    }
}
