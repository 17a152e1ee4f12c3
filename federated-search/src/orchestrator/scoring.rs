//! Score calibration between the two providers.
//!
//! The providers score with unrelated functions, so raw magnitudes are not
//! comparable. Before a relevance-ordered merge, secondary scores are
//! rescaled so both buffered distributions share mean and spread:
//!
//! ```text
//! s' = s * (σ_primary / σ_secondary)          (skipped when σ_secondary == 0)
//! s'' = s' + (μ_primary - μ'_secondary)
//! ```

use crate::types::Hit;

/// Mean and population standard deviation of a score list.
///
/// Returns `(0.0, 0.0)` for an empty list.
pub fn mean_and_std(scores: impl Iterator<Item = f64> + Clone) -> (f64, f64) {
    let n = scores.clone().count();
    if n == 0 {
        return (0.0, 0.0);
    }
    let n = n as f64;
    let mean = scores.clone().sum::<f64>() / n;
    let variance = scores.map(|s| (s - mean).powi(2)).sum::<f64>() / n;
    (mean, variance.sqrt())
}

/// Rescale `secondary` scores in place to the distribution of `primary`.
///
/// No-op when either side is empty.
pub fn calibrate(primary: &[Hit], secondary: &mut [Hit]) {
    if primary.is_empty() || secondary.is_empty() {
        return;
    }
    let (primary_mean, primary_std) = mean_and_std(primary.iter().map(|h| h.score));
    let (_, secondary_std) = mean_and_std(secondary.iter().map(|h| h.score));

    if secondary_std != 0.0 {
        let factor = primary_std / secondary_std;
        for hit in secondary.iter_mut() {
            hit.score *= factor;
        }
    }

    let (scaled_mean, _) = mean_and_std(secondary.iter().map(|h| h.score));
    let delta = primary_mean - scaled_mean;
    for hit in secondary.iter_mut() {
        hit.score += delta;
    }

    tracing::debug!(factor_applied = secondary_std != 0.0, delta, "secondary scores calibrated");
}
