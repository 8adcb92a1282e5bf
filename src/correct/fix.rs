//! Replace flagged samples with interpolated values.

use super::interp::{InterpKind, Interpolator, OutOfRange};
use crate::algorithm::{checked_indices, AlgorithmRegistry};
use crate::data::{validate_indices, validate_pair, IndexSet, Spectrum};
use crate::error::{DespikeError, Result};
use serde::{Deserialize, Serialize};

/// Default half-width of the multi-spike repair window.
pub const DEFAULT_WINDOW: usize = 10;

/// What to do when a single flagged sample cannot be repaired.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Fail the whole operation.
    #[default]
    Abort,
    /// Leave the sample uncorrected and report it.
    Skip,
}

/// Parameters of the windowed multi-spike repair.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MultiSpikeParams {
    /// Half-width W of the `2W + 1` sample window around each flag.
    pub window: usize,
    /// Kernel fitted on the clean samples of the window.
    pub kind: InterpKind,
    /// Behaviour when a window has too few clean samples.
    pub on_failure: FailurePolicy,
}

impl Default for MultiSpikeParams {
    fn default() -> Self {
        Self {
            window: DEFAULT_WINDOW,
            kind: InterpKind::Linear,
            on_failure: FailurePolicy::Abort,
        }
    }
}

impl MultiSpikeParams {
    /// Set the window half-width.
    pub fn with_window(mut self, window: usize) -> Self {
        self.window = window;
        self
    }

    /// Set the interpolation kernel.
    pub fn with_kind(mut self, kind: InterpKind) -> Self {
        self.kind = kind;
        self
    }

    /// Set the failure policy.
    pub fn with_policy(mut self, on_failure: FailurePolicy) -> Self {
        self.on_failure = on_failure;
        self
    }
}

/// Repaired signal plus the flagged positions that were left as-is.
#[derive(Debug, Clone)]
pub struct MultiSpikeOutcome {
    pub y: Vec<f64>,
    pub skipped: Vec<usize>,
}

/// Spectrum-level result of [`spikes_multi_spike_fix`].
#[derive(Debug, Clone)]
pub struct MultiSpikeFix {
    pub spectrum: Spectrum,
    pub flagged: IndexSet,
    pub skipped: Vec<usize>,
}

/// Rebuild the signal by interpolating over the unflagged samples.
///
/// Unflagged samples are returned unchanged. Fails if fewer survivors than the
/// kernel needs remain, or if a flagged position lies outside their axis range.
pub fn interpolate_fix(
    x: &[f64],
    y: &[f64],
    flagged: &IndexSet,
    kind: InterpKind,
) -> Result<Vec<f64>> {
    validate_pair(x, y)?;
    validate_indices(flagged, y.len())?;
    if flagged.is_empty() {
        return Ok(y.to_vec());
    }

    let (kx, ky): (Vec<f64>, Vec<f64>) = x
        .iter()
        .zip(y.iter())
        .enumerate()
        .filter(|(i, _)| !flagged.contains(i))
        .map(|(_, (&xv, &yv))| (xv, yv))
        .unzip();
    let interpolator = Interpolator::fit(&kx, &ky, kind)?;

    let mut out = y.to_vec();
    for &i in flagged {
        out[i] = interpolator
            .eval(x[i], OutOfRange::Fail)
            .map_err(|e| DespikeError::interpolation_at(i, e.to_string()))?;
    }
    Ok(out)
}

/// Repair each flagged sample from the clean samples around it.
///
/// Flags are visited in ascending order against one working copy, so every
/// fit sees the repairs made before it. A flag fails when its window holds
/// fewer than `max(2, kind.min_support())` clean samples or when the clean
/// samples do not bracket it.
pub fn multi_spike_fix(
    x: &[f64],
    y: &[f64],
    flagged: &IndexSet,
    params: &MultiSpikeParams,
) -> Result<MultiSpikeOutcome> {
    validate_pair(x, y)?;
    validate_indices(flagged, y.len())?;
    if params.window == 0 {
        return Err(DespikeError::InvalidParameter(
            "Multi-spike window must be at least 1".to_string(),
        ));
    }

    let n = y.len();
    let min_clean = params.kind.min_support().max(2);
    let mut working = y.to_vec();
    let mut skipped = Vec::new();

    for &i in flagged {
        let lo = i.saturating_sub(params.window);
        let hi = (i + params.window).min(n - 1);
        let clean: Vec<usize> = (lo..=hi).filter(|j| !flagged.contains(j)).collect();

        let repaired = if clean.len() < min_clean {
            Err(format!(
                "{} clean samples in window [{}, {}], need {}",
                clean.len(),
                lo,
                hi,
                min_clean
            ))
        } else {
            let kx: Vec<f64> = clean.iter().map(|&j| x[j]).collect();
            let ky: Vec<f64> = clean.iter().map(|&j| working[j]).collect();
            let interpolator = Interpolator::fit(&kx, &ky, params.kind)?;
            if interpolator.covers(x[i]) {
                interpolator
                    .eval(x[i], OutOfRange::Fail)
                    .map_err(|e| e.to_string())
            } else {
                Err("clean samples lie on one side only".to_string())
            }
        };

        match (repaired, params.on_failure) {
            (Ok(value), _) => working[i] = value,
            (Err(reason), FailurePolicy::Abort) => {
                return Err(DespikeError::interpolation_at(i, reason));
            }
            (Err(reason), FailurePolicy::Skip) => {
                log::warn!("Skipping spike at index {}: {}", i, reason);
                skipped.push(i);
            }
        }
    }

    Ok(MultiSpikeOutcome {
        y: working,
        skipped,
    })
}

/// Interpolate over the samples algorithm `method` flags in `spectrum`.
pub fn spikes_fix_interp(
    registry: &AlgorithmRegistry,
    spectrum: &Spectrum,
    method: &str,
    threshold: Option<f64>,
    kind: InterpKind,
) -> Result<Spectrum> {
    let algorithm = registry.lookup(method)?;
    let flagged = checked_indices(algorithm.as_ref(), spectrum.y(), threshold)?;
    log::debug!(
        "{}: {} interpolation over {} flagged samples",
        method,
        kind.name(),
        flagged.len()
    );
    spectrum.derive_signal(
        &format!("spikes_fix_interp({}, {})", method, kind.name()),
        |x, y| interpolate_fix(x, y, &flagged, kind),
    )
}

/// Windowed repair of the samples algorithm `method` flags in `spectrum`.
pub fn spikes_multi_spike_fix(
    registry: &AlgorithmRegistry,
    spectrum: &Spectrum,
    method: &str,
    threshold: Option<f64>,
    params: &MultiSpikeParams,
) -> Result<MultiSpikeFix> {
    let algorithm = registry.lookup(method)?;
    let flagged = checked_indices(algorithm.as_ref(), spectrum.y(), threshold)?;
    let outcome = multi_spike_fix(spectrum.x(), spectrum.y(), &flagged, params)?;
    log::debug!(
        "{}: repaired {} of {} flagged samples",
        method,
        flagged.len() - outcome.skipped.len(),
        flagged.len()
    );

    let step = format!(
        "spikes_multi_spike_fix({}, window={}, {})",
        method,
        params.window,
        params.kind.name()
    );
    let MultiSpikeOutcome { y, skipped } = outcome;
    let spectrum = spectrum.derive_signal(&step, move |_, _| Ok(y))?;
    Ok(MultiSpikeFix {
        spectrum,
        flagged,
        skipped,
    })
}
