//! Synthetic spectra with known spike positions.
//!
//! Spectra are a sum of Lorentzian lines on a flat baseline plus seeded
//! Gaussian noise; spikes are injected afterwards, so the clean trace and the
//! spike positions are both known exactly.

use crate::correct::{inject_values, SpikeInjection};
use crate::data::{IndexSet, Spectrum};
use crate::error::{DespikeError, Result};
use serde::{Deserialize, Serialize};

/// A Lorentzian line.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PeakLine {
    /// Line centre on the axis.
    pub center: f64,
    /// Peak height.
    pub amplitude: f64,
    /// Half width at half maximum, in axis units.
    pub hwhm: f64,
}

impl PeakLine {
    pub fn new(center: f64, amplitude: f64, hwhm: f64) -> Self {
        Self {
            center,
            amplitude,
            hwhm,
        }
    }

    fn eval(&self, x: f64) -> f64 {
        let t = (x - self.center) / self.hwhm;
        self.amplitude / (1.0 + t * t)
    }
}

/// Configuration for synthetic spectrum generation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SyntheticConfig {
    /// Name/identifier for this dataset.
    pub name: String,
    /// Number of samples.
    pub n_points: usize,
    /// First axis value.
    pub x_start: f64,
    /// Last axis value.
    pub x_end: f64,
    /// Constant baseline level.
    pub baseline: f64,
    /// Real spectral lines.
    pub lines: Vec<PeakLine>,
    /// Standard deviation of additive Gaussian noise.
    pub noise_sd: f64,
    /// Number of spikes to inject.
    pub n_spikes: usize,
    /// Smallest spike height.
    pub spike_min: f64,
    /// Largest spike height.
    pub spike_max: f64,
    /// Samples per spike (1 for single-point spikes).
    pub spike_width: usize,
    /// Random seed for reproducibility.
    pub seed: u64,
}

impl Default for SyntheticConfig {
    fn default() -> Self {
        Self {
            name: "synthetic".to_string(),
            n_points: 1000,
            x_start: 100.0,
            x_end: 3000.0,
            baseline: 100.0,
            lines: vec![
                PeakLine::new(520.0, 400.0, 8.0),
                PeakLine::new(1001.0, 900.0, 6.0),
                PeakLine::new(1600.0, 250.0, 20.0),
                PeakLine::new(2900.0, 600.0, 15.0),
            ],
            noise_sd: 1.0,
            n_spikes: 10,
            spike_min: 100.0,
            spike_max: 500.0,
            spike_width: 1,
            seed: 42,
        }
    }
}

impl SyntheticConfig {
    /// Create a new config with the given name.
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            ..Default::default()
        }
    }

    /// Set the axis range and number of samples.
    pub fn with_axis(mut self, x_start: f64, x_end: f64, n_points: usize) -> Self {
        self.x_start = x_start;
        self.x_end = x_end;
        self.n_points = n_points;
        self
    }

    /// Replace the spectral lines.
    pub fn with_lines(mut self, lines: Vec<PeakLine>) -> Self {
        self.lines = lines;
        self
    }

    /// Set noise level.
    pub fn with_noise(mut self, noise_sd: f64) -> Self {
        self.noise_sd = noise_sd.max(0.0);
        self
    }

    /// Set spike count, height range, and width in samples.
    pub fn with_spikes(mut self, n: usize, min: f64, max: f64, width: usize) -> Self {
        self.n_spikes = n;
        self.spike_min = min;
        self.spike_max = max.max(min);
        self.spike_width = width.max(1);
        self
    }

    /// Set random seed.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }

    // Preset configurations

    /// Noise-free lines with tall single-sample spikes.
    pub fn clean() -> Self {
        Self::new("clean").with_noise(0.0).with_spikes(10, 200.0, 500.0, 1)
    }

    /// Noisy lines with moderate single-sample spikes.
    pub fn noisy() -> Self {
        Self::new("noisy").with_noise(3.0).with_spikes(10, 60.0, 300.0, 1)
    }

    /// Two-sample spikes, which single-point detectors tend to miss.
    pub fn double() -> Self {
        Self::new("double").with_noise(1.0).with_spikes(8, 150.0, 400.0, 2)
    }
}

/// A generated spectrum with its ground truth.
#[derive(Debug, Clone)]
pub struct SyntheticSpectrum {
    /// Name of the configuration that produced it.
    pub name: String,
    /// Spectrum with noise and spikes.
    pub spectrum: Spectrum,
    /// Noise and spike free signal.
    pub clean: Vec<f64>,
    /// Signal with noise but without spikes.
    pub unspiked: Vec<f64>,
    /// Positions touched by injected spikes.
    pub truth: IndexSet,
    /// Individual injections.
    pub injections: Vec<SpikeInjection>,
}

/// Simple deterministic RNG (xorshift64).
struct Rng {
    state: u64,
}

impl Rng {
    fn new(seed: u64) -> Self {
        Self { state: seed.max(1) }
    }

    fn next_u64(&mut self) -> u64 {
        let mut x = self.state;
        x ^= x << 13;
        x ^= x >> 7;
        x ^= x << 17;
        self.state = x;
        x
    }

    fn next_f64(&mut self) -> f64 {
        (self.next_u64() as f64) / (u64::MAX as f64)
    }

    /// Normal variate via Box-Muller.
    fn next_normal(&mut self, mean: f64, std: f64) -> f64 {
        let u1 = self.next_f64().max(1e-10);
        let u2 = self.next_f64();
        let z = (-2.0 * u1.ln()).sqrt() * (2.0 * std::f64::consts::PI * u2).cos();
        mean + std * z
    }

    fn shuffle<T>(&mut self, vec: &mut [T]) {
        for i in (1..vec.len()).rev() {
            let j = (self.next_u64() as usize) % (i + 1);
            vec.swap(i, j);
        }
    }
}

/// Generate a synthetic spectrum with known spike positions.
///
/// Spikes keep at least three samples from either end and at least
/// `spike_width + 3` samples from each other.
pub fn generate_synthetic(config: &SyntheticConfig) -> Result<SyntheticSpectrum> {
    let n = config.n_points;
    if n < 10 {
        return Err(DespikeError::InvalidParameter(format!(
            "Synthetic spectra need at least 10 points, got {}",
            n
        )));
    }
    if !(config.spike_min > 0.0) {
        return Err(DespikeError::InvalidParameter(
            "Spike heights must be positive".to_string(),
        ));
    }
    let mut rng = Rng::new(config.seed);

    let step = (config.x_end - config.x_start) / (n - 1) as f64;
    let x: Vec<f64> = (0..n).map(|i| config.x_start + step * i as f64).collect();
    let clean: Vec<f64> = x
        .iter()
        .map(|&xv| config.baseline + config.lines.iter().map(|l| l.eval(xv)).sum::<f64>())
        .collect();
    let unspiked: Vec<f64> = clean
        .iter()
        .map(|&v| {
            if config.noise_sd > 0.0 {
                rng.next_normal(v, config.noise_sd)
            } else {
                v
            }
        })
        .collect();

    // Candidate centres, shuffled, then greedily spaced out.
    let width = config.spike_width.max(1);
    let margin = 3 + width;
    let spacing = width + 3;
    let mut candidates: Vec<usize> = (margin..n.saturating_sub(margin)).collect();
    rng.shuffle(&mut candidates);
    let mut centres: Vec<usize> = Vec::with_capacity(config.n_spikes);
    for c in candidates {
        if centres.len() == config.n_spikes {
            break;
        }
        if centres.iter().all(|&p| p.abs_diff(c) >= spacing) {
            centres.push(c);
        }
    }
    if centres.len() < config.n_spikes {
        return Err(DespikeError::InvalidParameter(format!(
            "Cannot place {} spikes in {} points",
            config.n_spikes, n
        )));
    }
    centres.sort_unstable();

    let mut y = unspiked.clone();
    let mut truth = IndexSet::new();
    let mut injections = Vec::with_capacity(centres.len());
    for c in centres {
        let height = config.spike_min + (config.spike_max - config.spike_min) * rng.next_f64();
        let values = vec![height; width];
        let (spiked, injection) = inject_values(&x, &y, x[c], &values)?;
        y = spiked;
        truth.extend(injection.positions());
        injections.push(injection);
    }

    let spectrum = Spectrum::new(x, y)?.with_metadata("synthetic", &config.name);
    Ok(SyntheticSpectrum {
        name: config.name.clone(),
        spectrum,
        clean,
        unspiked,
        truth,
        injections,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generate_is_deterministic() {
        let config = SyntheticConfig::noisy().with_seed(7);
        let a = generate_synthetic(&config).unwrap();
        let b = generate_synthetic(&config).unwrap();
        assert_eq!(a.spectrum, b.spectrum);
        assert_eq!(a.truth, b.truth);
    }

    #[test]
    fn test_truth_matches_injections() {
        let synth = generate_synthetic(&SyntheticConfig::double()).unwrap();
        assert_eq!(synth.injections.len(), 8);
        assert_eq!(synth.truth.len(), 16);
        for &i in &synth.truth {
            assert!(synth.spectrum.y()[i] - synth.unspiked[i] >= 150.0 - 1e-9);
        }
        let n = synth.spectrum.len();
        for i in (0..n).filter(|i| !synth.truth.contains(i)) {
            assert_eq!(synth.spectrum.y()[i], synth.unspiked[i]);
        }
    }

    #[test]
    fn test_clean_preset_has_no_noise() {
        let synth = generate_synthetic(&SyntheticConfig::clean()).unwrap();
        assert_eq!(synth.clean, synth.unspiked);
    }

    #[test]
    fn test_too_many_spikes() {
        let config = SyntheticConfig::new("crowded")
            .with_axis(0.0, 1.0, 20)
            .with_spikes(10, 10.0, 20.0, 1);
        assert!(generate_synthetic(&config).is_err());
    }
}
