//! Remove flagged samples from the axis and the signal.

use crate::algorithm::{checked_indices, AlgorithmRegistry};
use crate::data::{validate_indices, validate_pair, IndexSet, Spectrum};
use crate::error::Result;

/// Remove every flagged position from both `x` and `y`, preserving order.
pub fn drop_indices(x: &[f64], y: &[f64], flagged: &IndexSet) -> Result<(Vec<f64>, Vec<f64>)> {
    validate_pair(x, y)?;
    validate_indices(flagged, y.len())?;
    let (kept_x, kept_y): (Vec<f64>, Vec<f64>) = x
        .iter()
        .zip(y.iter())
        .enumerate()
        .filter(|(i, _)| !flagged.contains(i))
        .map(|(_, (&xv, &yv))| (xv, yv))
        .unzip();
    Ok((kept_x, kept_y))
}

/// Drop the samples that algorithm `method` flags in `spectrum`.
///
/// The output is shorter than the input whenever anything is flagged.
pub fn spikes_drop(
    registry: &AlgorithmRegistry,
    spectrum: &Spectrum,
    method: &str,
    threshold: Option<f64>,
) -> Result<Spectrum> {
    let algorithm = registry.lookup(method)?;
    let flagged = checked_indices(algorithm.as_ref(), spectrum.y(), threshold)?;
    log::debug!("{}: dropping {} flagged samples", method, flagged.len());
    spectrum.derive(&format!("spikes_drop({})", method), |x, y| {
        drop_indices(x, y, &flagged)
    })
}
