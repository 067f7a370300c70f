//! Importance resampling against the color histogram.
//!
//! Each sample is binned into the histogram and drawn with probability
//! proportional to `1 / (1 + count)` of its bin, so colors that are common
//! in the reference density are drawn less often and rare ones more often.

use rand::Rng;
use rand::distr::Distribution;
use rand::distr::weighted::WeightedIndex;
use tracing::{debug, info};

use crate::color_space::Feature;
use crate::error::{PaletteError, Result};
use crate::histogram::WeightTable;

/// Bin of `value` along an axis with the given edges, treating intervals as
/// right-open. Values outside the covered range land in the first or last
/// bin.
#[inline]
pub fn bin_index(edges: &[f64], value: f64) -> usize {
    let last = edges.len().saturating_sub(2);
    edges.partition_point(|e| *e <= value).saturating_sub(1).min(last)
}

/// Weight of every sample, looked up from its 3-axis bin.
pub fn sample_weights(samples: &[Feature], table: &WeightTable) -> Vec<f64> {
    samples
        .iter()
        .map(|s| {
            let index = [0, 1, 2].map(|axis| bin_index(table.edges(axis), f64::from(s[axis])));
            table.get(index)
        })
        .collect()
}

/// Sample weights normalized over the current pool.
pub fn sample_probabilities(samples: &[Feature], table: &WeightTable) -> Result<Vec<f64>> {
    if samples.is_empty() {
        return Err(PaletteError::DegenerateWeights("sample pool is empty".to_string()));
    }

    let mut weights = sample_weights(samples, table);
    let total: f64 = weights.iter().sum();
    if total <= 0.0 || !total.is_finite() {
        return Err(PaletteError::DegenerateWeights(format!(
            "weights of {} samples sum to {total}",
            samples.len()
        )));
    }

    weights.iter_mut().for_each(|w| *w /= total);
    Ok(weights)
}

/// Draw `samples.len()` samples with replacement, each with its normalized
/// weight as probability.
pub fn resample<R: Rng + ?Sized>(samples: &[Feature], table: &WeightTable, rng: &mut R) -> Result<Vec<Feature>> {
    let probs = sample_probabilities(samples, table)?;
    let dist = WeightedIndex::new(&probs).map_err(|e| PaletteError::DegenerateWeights(e.to_string()))?;

    let resampled: Vec<Feature> = (0..samples.len()).map(|_| samples[dist.sample(rng)]).collect();

    let (min, max) = probs
        .iter()
        .fold((f64::INFINITY, 0.0f64), |(lo, hi), p| (lo.min(*p), hi.max(*p)));
    debug!(min_probability = min, max_probability = max, "sample probabilities");
    info!(samples = resampled.len(), "resampled pool against histogram");
    Ok(resampled)
}
