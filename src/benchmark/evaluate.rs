//! Detection and repair scoring against known spike positions.

use super::generate::SyntheticSpectrum;
use crate::algorithm::{checked_indices, AlgorithmRegistry, SpikeAlgorithm};
use crate::correct::{interpolate_fix, InterpKind};
use crate::data::IndexSet;
use crate::error::{DespikeError, Result};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Detection quality of one algorithm over one or more synthetic spectra.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectionEvaluation {
    /// Algorithm name.
    pub method: String,
    /// Threshold actually used.
    pub threshold: f64,
    /// Number of spectra evaluated.
    pub n_spectra: usize,

    // Detection counts
    /// Flagged positions within tolerance of a true spike position.
    pub true_positives: usize,
    /// Flagged positions with no true spike nearby.
    pub false_positives: usize,
    /// True spike positions with a flagged position nearby.
    pub spikes_found: usize,
    /// True spike positions with no flagged position nearby.
    pub false_negatives: usize,

    // Derived rates
    /// Precision = TP / (TP + FP).
    pub precision: f64,
    /// Recall = found / (found + FN).
    pub recall: f64,
    /// F1 score = 2 * precision * recall / (precision + recall).
    pub f1_score: f64,

    // Repair quality
    /// Mean RMSE of the spiked signal against the noisy unspiked trace.
    pub rmse_before: f64,
    /// Mean RMSE after linear interpolation over the flagged samples, over
    /// the spectra where the repair succeeded.
    pub rmse_after: Option<f64>,
    /// Spectra on which the interpolation repair failed.
    pub repair_failures: usize,
}

impl DetectionEvaluation {
    /// Check if this represents good performance.
    pub fn is_good(&self) -> bool {
        self.recall >= 0.9 && self.precision >= 0.9
    }

    fn empty(method: &str, threshold: f64) -> Self {
        Self {
            method: method.to_string(),
            threshold,
            n_spectra: 0,
            true_positives: 0,
            false_positives: 0,
            spikes_found: 0,
            false_negatives: 0,
            precision: 0.0,
            recall: 0.0,
            f1_score: 0.0,
            rmse_before: 0.0,
            rmse_after: None,
            repair_failures: 0,
        }
    }

    fn compute_rates(&mut self) {
        let flagged = self.true_positives + self.false_positives;
        self.precision = if flagged > 0 {
            self.true_positives as f64 / flagged as f64
        } else {
            0.0
        };
        let truth = self.spikes_found + self.false_negatives;
        self.recall = if truth > 0 {
            self.spikes_found as f64 / truth as f64
        } else {
            0.0
        };
        self.f1_score = if self.precision + self.recall > 0.0 {
            2.0 * self.precision * self.recall / (self.precision + self.recall)
        } else {
            0.0
        };
    }
}

impl std::fmt::Display for DetectionEvaluation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(
            f,
            "{} (threshold {}, {} spectra)",
            self.method, self.threshold, self.n_spectra
        )?;
        writeln!(
            f,
            "  TP: {}, FP: {}, FN: {}",
            self.true_positives, self.false_positives, self.false_negatives
        )?;
        writeln!(f, "  Precision: {:.1}%", self.precision * 100.0)?;
        writeln!(f, "  Recall:    {:.1}%", self.recall * 100.0)?;
        writeln!(f, "  F1:        {:.3}", self.f1_score)?;
        match self.rmse_after {
            Some(after) => writeln!(f, "  RMSE:      {:.3} -> {:.3}", self.rmse_before, after)?,
            None => writeln!(f, "  RMSE:      {:.3} -> n/a", self.rmse_before)?,
        }
        if self.repair_failures > 0 {
            writeln!(f, "  Repair failures: {}", self.repair_failures)?;
        }
        Ok(())
    }
}

fn rmse(a: &[f64], b: &[f64]) -> f64 {
    let n = a.len().min(b.len());
    if n == 0 {
        return 0.0;
    }
    let sse: f64 = a.iter().zip(b).map(|(u, v)| (u - v).powi(2)).sum();
    (sse / n as f64).sqrt()
}

fn near(set: &IndexSet, i: usize, tolerance: usize) -> bool {
    set.range(i.saturating_sub(tolerance)..=i + tolerance)
        .next()
        .is_some()
}

/// Per-spectrum counts and errors, merged into a [`DetectionEvaluation`].
struct SpectrumScore {
    true_positives: usize,
    false_positives: usize,
    spikes_found: usize,
    false_negatives: usize,
    rmse_before: f64,
    rmse_after: Option<f64>,
}

fn score_spectrum(
    algorithm: &dyn SpikeAlgorithm,
    threshold: Option<f64>,
    synthetic: &SyntheticSpectrum,
    tolerance: usize,
) -> Result<SpectrumScore> {
    let spectrum = &synthetic.spectrum;
    let flagged = checked_indices(algorithm, spectrum.y(), threshold)?;
    let truth = &synthetic.truth;

    let true_positives = flagged.iter().filter(|&&i| near(truth, i, tolerance)).count();
    let spikes_found = truth.iter().filter(|&&i| near(&flagged, i, tolerance)).count();

    let rmse_after = match interpolate_fix(spectrum.x(), spectrum.y(), &flagged, InterpKind::Linear)
    {
        Ok(fixed) => Some(rmse(&fixed, &synthetic.unspiked)),
        Err(e) => {
            log::debug!("{}: repair failed on {}: {}", algorithm.name(), synthetic.name, e);
            None
        }
    };

    Ok(SpectrumScore {
        true_positives,
        false_positives: flagged.len() - true_positives,
        spikes_found,
        false_negatives: truth.len() - spikes_found,
        rmse_before: rmse(spectrum.y(), &synthetic.unspiked),
        rmse_after,
    })
}

/// Evaluate one algorithm over a set of synthetic spectra.
///
/// A flagged position counts as a true positive when a true spike position
/// lies within `tolerance` samples of it, and a true position counts as found
/// when a flagged position lies within `tolerance` samples of it.
pub fn evaluate_detection(
    registry: &AlgorithmRegistry,
    method: &str,
    threshold: Option<f64>,
    data: &[SyntheticSpectrum],
    tolerance: usize,
) -> Result<DetectionEvaluation> {
    if data.is_empty() {
        return Err(DespikeError::InvalidInput(
            "No synthetic spectra to evaluate".to_string(),
        ));
    }
    let algorithm = registry.lookup(method)?;
    let mut eval = DetectionEvaluation::empty(
        method,
        threshold.unwrap_or_else(|| algorithm.default_threshold()),
    );

    let mut before_sum = 0.0;
    let mut after_sum = 0.0;
    let mut after_count = 0usize;
    for synthetic in data {
        let score = score_spectrum(algorithm.as_ref(), threshold, synthetic, tolerance)?;
        eval.n_spectra += 1;
        eval.true_positives += score.true_positives;
        eval.false_positives += score.false_positives;
        eval.spikes_found += score.spikes_found;
        eval.false_negatives += score.false_negatives;
        before_sum += score.rmse_before;
        match score.rmse_after {
            Some(v) => {
                after_sum += v;
                after_count += 1;
            }
            None => eval.repair_failures += 1,
        }
    }

    eval.rmse_before = before_sum / eval.n_spectra as f64;
    eval.rmse_after = (after_count > 0).then(|| after_sum / after_count as f64);
    eval.compute_rates();
    Ok(eval)
}

/// Evaluate every registered algorithm at its default threshold.
///
/// Algorithms are evaluated in parallel; results come back in registry
/// (name) order.
pub fn benchmark_registry(
    registry: &AlgorithmRegistry,
    data: &[SyntheticSpectrum],
    tolerance: usize,
) -> Result<Vec<DetectionEvaluation>> {
    let names = registry.names();
    log::info!(
        "Benchmarking {} algorithms on {} spectra",
        names.len(),
        data.len()
    );
    names
        .par_iter()
        .map(|name| evaluate_detection(registry, name, None, data, tolerance))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::benchmark::{generate_synthetic, PeakLine, SyntheticConfig};
    use approx::assert_relative_eq;

    fn clean_data() -> Vec<SyntheticSpectrum> {
        (1..=3)
            .map(|seed| {
                let config = SyntheticConfig::clean()
                    .with_lines(vec![PeakLine::new(1500.0, 300.0, 200.0)])
                    .with_seed(seed);
                generate_synthetic(&config).unwrap()
            })
            .collect()
    }

    #[test]
    fn test_reference_metric_on_clean_data() {
        let registry = AlgorithmRegistry::builtin().unwrap();
        let data = clean_data();
        let eval = evaluate_detection(&registry, "gg_1spike", None, &data, 0).unwrap();

        assert_eq!(eval.n_spectra, 3);
        assert_relative_eq!(eval.recall, 1.0);
        assert_eq!(eval.false_positives, 0);
        assert!(eval.rmse_after.unwrap() < 0.1);
        assert!(eval.rmse_before > 1.0);
    }

    #[test]
    fn test_counts_are_consistent() {
        let registry = AlgorithmRegistry::builtin().unwrap();
        let data = vec![generate_synthetic(&SyntheticConfig::noisy()).unwrap()];
        let eval = evaluate_detection(&registry, "first_derivative", None, &data, 1).unwrap();
        assert_eq!(eval.spikes_found + eval.false_negatives, data[0].truth.len());
        assert!(eval.precision >= 0.0 && eval.precision <= 1.0);
    }

    #[test]
    fn test_unknown_method() {
        let registry = AlgorithmRegistry::builtin().unwrap();
        let data = clean_data();
        assert!(matches!(
            evaluate_detection(&registry, "nope", None, &data, 0),
            Err(DespikeError::UnknownAlgorithm(_))
        ));
    }

    #[test]
    fn test_benchmark_covers_registry() {
        let registry = AlgorithmRegistry::builtin().unwrap();
        let data = clean_data();
        let results = benchmark_registry(&registry, &data, 1).unwrap();
        assert_eq!(results.len(), registry.len());
        let names: Vec<&str> = results.iter().map(|r| r.method.as_str()).collect();
        assert_eq!(names, registry.names());
    }

    #[test]
    fn test_near() {
        let set: IndexSet = [5, 10].into_iter().collect();
        assert!(near(&set, 5, 0));
        assert!(!near(&set, 6, 0));
        assert!(near(&set, 7, 2));
        assert!(near(&set, 0, 5));
        assert!(!near(&set, 0, 4));
    }
}
