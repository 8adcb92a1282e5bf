//! Named-result analysis calls: scores and flagged positions for a spectrum.

use crate::algorithm::{checked_indices, resolve_threshold, AlgorithmRegistry};
use crate::data::{validate_pair, IndexSet, NamedResults, Spectrum};
use crate::error::{DespikeError, Result};
use serde::{Deserialize, Serialize};

/// Anomaly scores of `spectrum` under algorithm `method`.
pub fn spikes_metric(
    registry: &AlgorithmRegistry,
    spectrum: &Spectrum,
    method: &str,
) -> Result<Vec<f64>> {
    registry.lookup(method)?.metric(spectrum.y())
}

/// Positions of `spectrum` flagged by algorithm `method`.
pub fn spikes_indices(
    registry: &AlgorithmRegistry,
    spectrum: &Spectrum,
    method: &str,
    threshold: Option<f64>,
) -> Result<IndexSet> {
    let algorithm = registry.lookup(method)?;
    checked_indices(algorithm.as_ref(), spectrum.y(), threshold)
}

/// Scores and flags of one algorithm on one spectrum.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpikeReport {
    /// Algorithm name.
    pub method: String,
    /// Threshold actually applied.
    pub threshold: f64,
    /// Number of samples analysed.
    pub n_samples: usize,
    /// Flagged positions, ascending.
    pub indices: Vec<usize>,
    /// Axis values at the flagged positions.
    pub locations: Vec<f64>,
    /// Per-sample scores.
    pub scores: Vec<f64>,
}

impl SpikeReport {
    /// Number of flagged samples.
    pub fn n_flagged(&self) -> usize {
        self.indices.len()
    }

    /// Report as a name → value mapping.
    pub fn to_named_results(&self) -> NamedResults {
        NamedResults::new()
            .with("method", self.method.as_str())
            .with("threshold", self.threshold)
            .with("n_samples", self.n_samples as f64)
            .with("spike_indices", self.indices.clone())
            .with("spike_locations", self.locations.clone())
            .with("spike_metric", self.scores.clone())
    }

    /// Serialize to pretty-printed JSON.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

impl std::fmt::Display for SpikeReport {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "Spike report ({})", self.method)?;
        writeln!(f, "  Threshold: {}", self.threshold)?;
        writeln!(f, "  Samples:   {}", self.n_samples)?;
        writeln!(f, "  Flagged:   {}", self.n_flagged())?;
        for (i, x) in self.indices.iter().zip(self.locations.iter()) {
            writeln!(f, "    index {:>6}  x = {:<12.4} score = {:.3}", i, x, self.scores[*i])?;
        }
        Ok(())
    }
}

/// Score and flag `spectrum` with algorithm `method` in one pass.
pub fn analyze_spikes(
    registry: &AlgorithmRegistry,
    spectrum: &Spectrum,
    method: &str,
    threshold: Option<f64>,
) -> Result<SpikeReport> {
    validate_pair(spectrum.x(), spectrum.y())?;
    let algorithm = registry.lookup(method)?;
    let applied = resolve_threshold(threshold, algorithm.default_threshold())?;
    let scores = algorithm.metric(spectrum.y())?;
    if scores.len() != spectrum.len() {
        return Err(DespikeError::DimensionMismatch {
            expected: spectrum.len(),
            actual: scores.len(),
        });
    }
    let flagged = checked_indices(algorithm.as_ref(), spectrum.y(), Some(applied))?;
    let indices: Vec<usize> = flagged.into_iter().collect();
    let locations = indices.iter().map(|&i| spectrum.x()[i]).collect();

    Ok(SpikeReport {
        method: method.to_string(),
        threshold: applied,
        n_samples: spectrum.len(),
        indices,
        locations,
        scores,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::algorithm::SpikeAlgorithm;
    use crate::data::ResultValue;

    /// Reports a position one past the end plus a few.
    #[derive(Debug)]
    struct OverReach;

    impl SpikeAlgorithm for OverReach {
        fn name(&self) -> &str {
            "over_reach"
        }

        fn default_threshold(&self) -> f64 {
            1.0
        }

        fn metric(&self, y: &[f64]) -> Result<Vec<f64>> {
            Ok(vec![0.0; y.len()])
        }

        fn indices(&self, y: &[f64], _threshold: Option<f64>) -> Result<IndexSet> {
            Ok([y.len() + 5].into_iter().collect())
        }
    }

    fn spiked() -> Spectrum {
        let x: Vec<f64> = (0..50).map(|i| 400.0 + 2.0 * i as f64).collect();
        let mut y = vec![100.0; 50];
        y[20] = 180.0;
        Spectrum::new(x, y).unwrap()
    }

    #[test]
    fn test_analyze_spikes() {
        let registry = AlgorithmRegistry::builtin().unwrap();
        let report = analyze_spikes(&registry, &spiked(), "gg_1spike", None).unwrap();
        assert_eq!(report.threshold, 12.0);
        assert_eq!(report.indices, vec![20]);
        assert_eq!(report.locations, vec![440.0]);
        assert_eq!(report.scores.len(), 50);

        let named = report.to_named_results();
        assert_eq!(named.get("spike_indices"), Some(&ResultValue::Indices(vec![20])));
        assert!(named.to_json().unwrap().contains("spike_metric"));
    }

    #[test]
    fn test_analyze_spikes_rejects_bad_threshold() {
        let registry = AlgorithmRegistry::builtin().unwrap();
        assert!(analyze_spikes(&registry, &spiked(), "gg_1spike", Some(f64::NAN)).is_err());
    }

    #[test]
    fn test_spikes_indices_and_metric_agree() {
        let registry = AlgorithmRegistry::builtin().unwrap();
        let spe = spiked();
        let scores = spikes_metric(&registry, &spe, "laplacian").unwrap();
        let idx = spikes_indices(&registry, &spe, "laplacian", Some(10.0)).unwrap();
        assert_eq!(idx, crate::algorithm::indices_above(&scores, 10.0));
    }

    #[test]
    fn test_out_of_range_flags_are_rejected() {
        let registry = AlgorithmRegistry::new().register(OverReach).unwrap();
        let spe = spiked();
        assert!(matches!(
            analyze_spikes(&registry, &spe, "over_reach", None),
            Err(DespikeError::InvalidInput(_))
        ));
        assert!(matches!(
            spikes_indices(&registry, &spe, "over_reach", None),
            Err(DespikeError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_deserialized_mismatch_never_reaches_analysis() {
        let json = r#"{"x":[0.0,1.0],"y":[1,1,1,1,1,90,1,1,1,1]}"#;
        assert!(serde_json::from_str::<Spectrum>(json).is_err());
    }
}
