//! Isolate the anomalous contribution of flagged samples.

use super::interp::{InterpKind, Interpolator, OutOfRange};
use crate::algorithm::{checked_indices, AlgorithmRegistry};
use crate::data::{validate_indices, validate_pair, IndexSet, Spectrum};
use crate::error::{DespikeError, Result};

/// `y - linear_interp(unflagged)(x)`.
///
/// Unflagged positions come out as exactly zero. Positions beyond the
/// outermost unflagged sample take the nearest unflagged value as baseline.
pub fn spikes_only_signal(x: &[f64], y: &[f64], flagged: &IndexSet) -> Result<Vec<f64>> {
    validate_pair(x, y)?;
    validate_indices(flagged, y.len())?;
    if flagged.is_empty() {
        return Ok(vec![0.0; y.len()]);
    }

    let (kx, ky): (Vec<f64>, Vec<f64>) = x
        .iter()
        .zip(y.iter())
        .enumerate()
        .filter(|(i, _)| !flagged.contains(i))
        .map(|(_, (&xv, &yv))| (xv, yv))
        .unzip();

    let mut out = vec![0.0; y.len()];
    match kx.len() {
        0 => {
            return Err(DespikeError::InterpolationFailure {
                index: None,
                reason: "every sample is flagged".to_string(),
            })
        }
        1 => {
            for &i in flagged {
                out[i] = y[i] - ky[0];
            }
        }
        _ => {
            let baseline = Interpolator::fit(&kx, &ky, InterpKind::Linear)?;
            for &i in flagged {
                out[i] = y[i] - baseline.eval(x[i], OutOfRange::Nearest)?;
            }
        }
    }
    Ok(out)
}

/// Keep only what algorithm `method` attributes to spikes.
pub fn spikes_only(
    registry: &AlgorithmRegistry,
    spectrum: &Spectrum,
    method: &str,
    threshold: Option<f64>,
) -> Result<Spectrum> {
    let algorithm = registry.lookup(method)?;
    let flagged = checked_indices(algorithm.as_ref(), spectrum.y(), threshold)?;
    log::debug!("{}: isolating {} flagged samples", method, flagged.len());
    spectrum.derive_signal(&format!("spikes_only({})", method), |x, y| {
        spikes_only_signal(x, y, &flagged)
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_spikes_only_interior() {
        let x: Vec<f64> = (0..8).map(|i| i as f64).collect();
        let mut y: Vec<f64> = x.iter().map(|v| v * 3.0).collect();
        y[4] += 25.0;
        let flagged: IndexSet = [4].into_iter().collect();
        let out = spikes_only_signal(&x, &y, &flagged).unwrap();
        assert_relative_eq!(out[4], 25.0);
        assert!(out.iter().enumerate().all(|(i, &v)| i == 4 || v == 0.0));
    }

    #[test]
    fn test_spikes_only_edge_uses_nearest() {
        let x: Vec<f64> = (0..6).map(|i| i as f64).collect();
        let y = vec![40.0, 2.0, 3.0, 4.0, 5.0, 6.0];
        let flagged: IndexSet = [0].into_iter().collect();
        let out = spikes_only_signal(&x, &y, &flagged).unwrap();
        assert_relative_eq!(out[0], 38.0);
    }

    #[test]
    fn test_spikes_only_rejects_out_of_range_flag() {
        let x: Vec<f64> = (0..10).map(|i| i as f64).collect();
        let y = vec![1.0; 10];
        let flagged: IndexSet = [3, 15].into_iter().collect();
        assert!(matches!(
            spikes_only_signal(&x, &y, &flagged),
            Err(DespikeError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_spikes_only_all_flagged_fails() {
        let x = [0.0, 1.0, 2.0];
        let y = [1.0, 2.0, 3.0];
        let flagged: IndexSet = (0..3).collect();
        assert!(spikes_only_signal(&x, &y, &flagged).is_err());
    }
}
