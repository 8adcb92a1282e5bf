//! Spike detection algorithms: a metric paired with a thresholding rule.
//!
//! Every algorithm implements [`SpikeAlgorithm`]. Single-metric detectors are
//! [`MetricAlgorithm`] values; composite detectors live in [`combine`]. All of
//! them are resolved by name through an [`AlgorithmRegistry`].

pub mod combine;
mod registry;

pub use combine::{AndCombinator, ExtendCombinator, OrCombinator};
pub use registry::AlgorithmRegistry;

use crate::data::{validate_indices, validate_signal, IndexSet};
use crate::error::{DespikeError, Result};
use crate::metric::MetricFn;
use std::fmt;

/// A named anomaly detector.
///
/// Implementations are stateless and shared across threads behind `Arc`.
pub trait SpikeAlgorithm: Send + Sync + fmt::Debug {
    /// Unique registry key.
    fn name(&self) -> &str;

    /// Threshold used when the caller does not supply one.
    fn default_threshold(&self) -> f64;

    /// One-line human readable description.
    fn description(&self) -> &str {
        ""
    }

    /// Per-sample anomaly score, same length as `y`.
    fn metric(&self, y: &[f64]) -> Result<Vec<f64>>;

    /// Flagged positions for `y` at the given or default threshold.
    ///
    /// The default implementation flags every position whose score is strictly
    /// greater than the threshold.
    fn indices(&self, y: &[f64], threshold: Option<f64>) -> Result<IndexSet> {
        let t = resolve_threshold(threshold, self.default_threshold())?;
        let scores = self.metric(y)?;
        Ok(indices_above(&scores, t))
    }
}

/// Resolve an optional caller threshold against an algorithm default.
///
/// Overrides must be finite and strictly positive.
pub fn resolve_threshold(threshold: Option<f64>, default: f64) -> Result<f64> {
    match threshold {
        None => Ok(default),
        Some(t) if t.is_finite() && t > 0.0 => Ok(t),
        Some(t) => Err(DespikeError::InvalidThreshold(t)),
    }
}

/// Positions whose score is strictly greater than `threshold`.
pub fn indices_above(scores: &[f64], threshold: f64) -> IndexSet {
    scores
        .iter()
        .enumerate()
        .filter(|(_, s)| **s > threshold)
        .map(|(i, _)| i)
        .collect()
}

/// Flag `y` with `algorithm`, rejecting positions outside the signal.
///
/// Spectrum-level operations go through here so that a misbehaving
/// user-registered detector surfaces as `InvalidInput` rather than a panic.
pub fn checked_indices(
    algorithm: &dyn SpikeAlgorithm,
    y: &[f64],
    threshold: Option<f64>,
) -> Result<IndexSet> {
    let flagged = algorithm.indices(y, threshold)?;
    validate_indices(&flagged, y.len())?;
    Ok(flagged)
}

/// A detector built from a single metric function.
#[derive(Clone)]
pub struct MetricAlgorithm {
    name: String,
    description: String,
    metric: MetricFn,
    default_threshold: f64,
}

impl MetricAlgorithm {
    /// Create a detector from a metric function and its default threshold.
    pub fn new(name: &str, metric: MetricFn, default_threshold: f64) -> Self {
        Self {
            name: name.to_string(),
            description: String::new(),
            metric,
            default_threshold,
        }
    }

    /// Attach a description shown in algorithm listings.
    pub fn with_description(mut self, description: &str) -> Self {
        self.description = description.to_string();
        self
    }
}

impl fmt::Debug for MetricAlgorithm {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MetricAlgorithm")
            .field("name", &self.name)
            .field("default_threshold", &self.default_threshold)
            .finish()
    }
}

impl SpikeAlgorithm for MetricAlgorithm {
    fn name(&self) -> &str {
        &self.name
    }

    fn default_threshold(&self) -> f64 {
        self.default_threshold
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn metric(&self, y: &[f64]) -> Result<Vec<f64>> {
        validate_signal(y)?;
        let scores = (self.metric)(y)?;
        if scores.len() != y.len() {
            return Err(DespikeError::DimensionMismatch {
                expected: y.len(),
                actual: scores.len(),
            });
        }
        Ok(scores)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metric::gg_1spike;

    #[test]
    fn test_resolve_threshold() {
        assert_eq!(resolve_threshold(None, 12.0).unwrap(), 12.0);
        assert_eq!(resolve_threshold(Some(3.0), 12.0).unwrap(), 3.0);
        for bad in [0.0, -1.0, f64::NAN, f64::INFINITY] {
            assert!(matches!(
                resolve_threshold(Some(bad), 12.0),
                Err(DespikeError::InvalidThreshold(_))
            ));
        }
    }

    #[test]
    fn test_indices_above_is_strict() {
        let scores = [0.0, 12.0, 12.5, 3.0, 40.0];
        let idx = indices_above(&scores, 12.0);
        assert_eq!(idx.into_iter().collect::<Vec<_>>(), vec![2, 4]);
    }

    #[test]
    fn test_metric_algorithm_indices_match_metric() {
        let alg = MetricAlgorithm::new("gg_1spike", gg_1spike, 12.0);
        let mut y = vec![1.0; 30];
        y[7] = 20.0;
        y[21] = 6.0;
        for t in [1.0, 5.0, 12.0, 30.0] {
            let scores = alg.metric(&y).unwrap();
            let expected = indices_above(&scores, t);
            assert_eq!(alg.indices(&y, Some(t)).unwrap(), expected);
        }
    }

    #[test]
    fn test_metric_algorithm_rejects_short_signal() {
        let alg = MetricAlgorithm::new("gg_1spike", gg_1spike, 12.0);
        assert!(matches!(alg.metric(&[1.0, 2.0]), Err(DespikeError::InvalidInput(_))));
    }
}
