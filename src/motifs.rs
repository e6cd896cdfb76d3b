//! Motif and discord discovery on the equity curve.
//!
//! The equity curve is z-normalized and cut into overlapping windows of fixed
//! width. A random subset of window positions (seeded) is compared against every
//! non-overlapping window: the count of neighbours within the distance
//! threshold is the motif score, and the sampled window whose nearest
//! neighbour is farthest away is the discord.
//!
//! Cost is O(samples x windows x width), which dominates analysis time on very
//! long sequences.

use crate::errors::DegradedStatistic;
use crate::math_utils::{euclidean_distance, float_total_cmp, z_normalize};
use crate::secure_rng::SecureRng;
use serde::{Deserialize, Serialize};

/// Parameters for motif discovery.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct MotifConfig {
    /// Window width
    pub window: usize,
    /// Euclidean distance under which two windows match
    pub threshold: f64,
    /// Maximum sampled window positions
    pub samples: usize,
    /// Number of motifs reported
    pub top: usize,
}

impl Default for MotifConfig {
    fn default() -> Self {
        Self {
            window: 20,
            threshold: 5.0,
            samples: 200,
            top: 3,
        }
    }
}

/// A recurring window.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Motif {
    /// Start index in the sequence
    pub start: usize,
    /// Window width
    pub len: usize,
    /// Number of matching non-overlapping windows
    pub score: f64,
}

/// The most isolated sampled window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Discord {
    /// Start index in the sequence
    pub start: usize,
    /// Window width
    pub len: usize,
}

/// Motif discovery output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MotifResult {
    /// Top motifs by score, best first (score > 0 only)
    pub motifs: Vec<Motif>,
    /// Anomalous window, or `null`
    pub discord: Option<Discord>,
}

impl MotifResult {
    /// No motifs and no discord.
    pub fn neutral() -> Self {
        Self {
            motifs: Vec::new(),
            discord: None,
        }
    }
}

/// Search for motifs and a discord in `equity`.
///
/// Requires `equity.len() >= 3 * window`.
pub fn discover_motifs(
    equity: &[f64],
    config: &MotifConfig,
    rng: &mut SecureRng,
) -> Result<MotifResult, DegradedStatistic> {
    const NAME: &str = "motif_discovery";

    let width = config.window;
    if width == 0 {
        return Err(DegradedStatistic::new(NAME, "window must be > 0"));
    }
    let n = equity.len();
    match width.checked_mul(3) {
        Some(required) if n >= required => {}
        _ => {
            return Err(DegradedStatistic::new(
                NAME,
                format!("need at least 3 x {} points, got {}", width, n),
            ))
        }
    }

    let normalized = z_normalize(equity);
    let windows: Vec<Vec<f64>> = normalized.windows(width).map(z_normalize).collect();
    let sampled = rng.sample_indices(windows.len(), config.samples);

    let mut scored: Vec<(usize, f64)> = Vec::with_capacity(sampled.len());
    let mut discord: Option<(usize, f64)> = None;

    for &i in &sampled {
        let mut matches = 0usize;
        let mut nearest = f64::INFINITY;
        for (j, other) in windows.iter().enumerate() {
            if i.abs_diff(j) < width {
                continue;
            }
            let distance = euclidean_distance(&windows[i], other);
            if distance < config.threshold {
                matches += 1;
            }
            nearest = nearest.min(distance);
        }
        scored.push((i, matches as f64));

        if nearest.is_finite() && discord.map_or(true, |(_, best)| nearest > best) {
            discord = Some((i, nearest));
        }
    }

    // stable: equal scores keep ascending start order
    scored.sort_by(|a, b| float_total_cmp(&b.1, &a.1));
    let motifs = scored
        .into_iter()
        .filter(|&(_, score)| score > 0.0)
        .take(config.top)
        .map(|(start, score)| Motif {
            start,
            len: width,
            score,
        })
        .collect();

    Ok(MotifResult {
        motifs,
        discord: discord.map(|(start, _)| Discord { start, len: width }),
    })
}
