//! Per-sample anomaly metrics.
//!
//! Every metric maps a signal of length n to a score of length n. Positions
//! where the local stencil does not fit (at least the first two and last two)
//! carry [`NEUTRAL`]. Scores are never NaN.

mod curvature;
mod derivative;
mod regression;
mod zscore;

pub use curvature::{gg_1spike, gg_2spike, gg_lin_reg_extrap};
pub use derivative::{first_derivative, laplacian};
pub use regression::{gg_lr_n2o1, gg_lr_n2o2, gg_lr_n3o1, gg_lr_n3o2, lr_residual, LocalRegression};
pub use zscore::{mod_z_scores, MOD_Z_WINDOW};

use crate::data::validate_signal;
use crate::error::Result;

/// Score assigned wherever a metric is undefined.
pub const NEUTRAL: f64 = 0.0;

/// Smallest neutral margin shared by all metrics.
pub const MIN_MARGIN: usize = 2;

/// Signature shared by all metric functions.
pub type MetricFn = fn(&[f64]) -> Result<Vec<f64>>;

/// Evaluate `score(y, i)` on interior positions, leaving `margin` neutral
/// samples at each end.
///
/// `margin` is raised to [`MIN_MARGIN`]. Non-finite scores are mapped to
/// [`NEUTRAL`] so they never take part in threshold comparisons.
pub(crate) fn interior_scores<F>(y: &[f64], margin: usize, score: F) -> Result<Vec<f64>>
where
    F: Fn(&[f64], usize) -> f64,
{
    validate_signal(y)?;
    let n = y.len();
    let margin = margin.max(MIN_MARGIN);
    let mut m = vec![NEUTRAL; n];
    if n <= 2 * margin {
        return Ok(m);
    }
    for (i, slot) in m.iter_mut().enumerate().take(n - margin).skip(margin) {
        let v = score(y, i);
        *slot = if v.is_finite() { v } else { NEUTRAL };
    }
    Ok(m)
}
