//! Synthetic spike injection for building known-answer signals.

use crate::data::{validate_pair, NamedResults, Spectrum};
use crate::error::{DespikeError, Result};
use serde::{Deserialize, Serialize};

/// Where a spike was injected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpikeInjection {
    /// Requested axis location.
    pub location: f64,
    /// Sample nearest to `location`.
    pub index: usize,
    /// First sample the values were added to.
    pub start: usize,
    /// Values added, starting at `start`.
    pub values: Vec<f64>,
}

impl SpikeInjection {
    /// Positions touched by the injection.
    pub fn positions(&self) -> std::ops::Range<usize> {
        self.start..self.start + self.values.len()
    }

    /// Injection metadata as named results.
    pub fn to_named_results(&self) -> NamedResults {
        NamedResults::new()
            .with("spike_location", self.location)
            .with("spike_index", self.index as f64)
            .with("spike_positions", self.positions().collect::<Vec<usize>>())
            .with("spike_values", self.values.clone())
    }
}

/// Index of the axis sample nearest to `location` (first one on ties).
pub fn nearest_index(x: &[f64], location: f64) -> Option<usize> {
    x.iter()
        .enumerate()
        .fold(None, |best: Option<(usize, f64)>, (i, &v)| {
            let d = (v - location).abs();
            match best {
                Some((_, bd)) if bd <= d => best,
                _ => Some((i, d)),
            }
        })
        .map(|(i, _)| i)
}

/// Add `values` centred on the sample nearest `location`.
///
/// Odd-length runs are placed symmetrically; even-length runs put
/// `len / 2` samples before the centre and `len / 2 - 1` after it.
pub fn inject_values(
    x: &[f64],
    y: &[f64],
    location: f64,
    values: &[f64],
) -> Result<(Vec<f64>, SpikeInjection)> {
    validate_pair(x, y)?;
    if values.is_empty() {
        return Err(DespikeError::InvalidInput(
            "Spike values must not be empty".to_string(),
        ));
    }
    if !location.is_finite() {
        return Err(DespikeError::InvalidInput(format!(
            "Spike location {} is not finite",
            location
        )));
    }
    let index = nearest_index(x, location)
        .ok_or_else(|| DespikeError::InvalidInput("Empty axis".to_string()))?;

    let half = values.len() / 2;
    if index < half || index - half + values.len() > y.len() {
        return Err(DespikeError::InvalidInput(format!(
            "{} spike values centred at index {} do not fit in {} samples",
            values.len(),
            index,
            y.len()
        )));
    }
    let start = index - half;

    let mut out = y.to_vec();
    for (slot, v) in out[start..start + values.len()].iter_mut().zip(values) {
        *slot += v;
    }
    Ok((
        out,
        SpikeInjection {
            location,
            index,
            start,
            values: values.to_vec(),
        },
    ))
}

/// Inject a spike into `spectrum`, returning the new spectrum and where the
/// values landed.
pub fn add_spike(
    spectrum: &Spectrum,
    location: f64,
    values: &[f64],
) -> Result<(Spectrum, SpikeInjection)> {
    let (y, injection) = inject_values(spectrum.x(), spectrum.y(), location, values)?;
    let step = format!("add_spike(location={}, n={})", location, values.len());
    let spiked = spectrum.derive_signal(&step, move |_, _| Ok(y))?;
    Ok((spiked, injection))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_nearest_index() {
        let x = [100.0, 101.0, 102.0, 103.0];
        assert_eq!(nearest_index(&x, 101.4), Some(1));
        assert_eq!(nearest_index(&x, 101.5), Some(1));
        assert_eq!(nearest_index(&x, -5.0), Some(0));
        assert_eq!(nearest_index(&[], 1.0), None);
    }

    #[test]
    fn test_nearest_index_decreasing_axis() {
        let x = [10.0, 8.0, 6.0, 4.0];
        assert_eq!(nearest_index(&x, 6.9), Some(2));
    }

    #[test]
    fn test_odd_length_is_symmetric() {
        let x: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let y = vec![0.0; 10];
        let (out, inj) = inject_values(&x, &y, 5.0, &[1.0, 2.0, 3.0]).unwrap();
        assert_eq!(inj.index, 5);
        assert_eq!(inj.positions(), 4..7);
        assert_eq!(&out[3..8], &[0.0, 1.0, 2.0, 3.0, 0.0]);
    }

    #[test]
    fn test_even_length_split() {
        let x: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let y = vec![0.0; 10];
        let (out, inj) = inject_values(&x, &y, 5.0, &[1.0, 2.0]).unwrap();
        assert_eq!(inj.positions(), 4..6);
        assert_eq!(&out[3..7], &[0.0, 1.0, 2.0, 0.0]);
    }

    #[test]
    fn test_injection_out_of_bounds() {
        let x: Vec<f64> = (0..5).map(|i| i as f64).collect();
        let y = vec![0.0; 5];
        assert!(inject_values(&x, &y, 0.0, &[1.0, 1.0, 1.0]).is_err());
        assert!(inject_values(&x, &y, 4.0, &[1.0, 1.0, 1.0]).is_err());
        assert!(inject_values(&x, &y, 2.0, &[]).is_err());
    }

    #[test]
    fn test_injection_rejects_mismatched_pair() {
        let x: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let y = vec![0.0; 5];
        assert!(matches!(
            inject_values(&x, &y, 2.0, &[50.0]),
            Err(DespikeError::DimensionMismatch {
                expected: 10,
                actual: 5
            })
        ));
    }

    #[test]
    fn test_add_spike_keeps_source() {
        let spe = Spectrum::from_signal(vec![10.0; 20]).unwrap();
        let (spiked, inj) = add_spike(&spe, 7.2, &[50.0]).unwrap();
        assert_eq!(inj.index, 7);
        assert_eq!(spiked.y()[7], 60.0);
        assert_eq!(spe.y()[7], 10.0);

        let named = inj.to_named_results();
        assert_eq!(named.len(), 4);
    }
}
