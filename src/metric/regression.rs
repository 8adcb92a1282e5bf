//! Regression-residual metrics.
//!
//! A polynomial of order `o` is fitted by least squares to the `n` samples on
//! each side of position `i` (the sample itself excluded) and evaluated at `i`.
//! The score is the squared residual of the actual sample against that
//! prediction.

use super::interior_scores;
use crate::error::{DespikeError, Result};
use nalgebra::DMatrix;

/// Precomputed least-squares predictor for a symmetric neighbourhood.
#[derive(Debug, Clone)]
pub struct LocalRegression {
    half_width: usize,
    order: usize,
    /// Weights applied to samples at offsets `-n..-1, 1..n`.
    weights: Vec<f64>,
}

impl LocalRegression {
    /// Build the predictor for `half_width` neighbours per side and the given
    /// polynomial order.
    pub fn new(half_width: usize, order: usize) -> Result<Self> {
        if half_width == 0 {
            return Err(DespikeError::InvalidParameter(
                "Regression half-width must be at least 1".to_string(),
            ));
        }
        let n_points = 2 * half_width;
        if order + 1 > n_points {
            return Err(DespikeError::InvalidParameter(format!(
                "Polynomial order {} needs more than {} neighbours",
                order, n_points
            )));
        }

        let offsets = neighbour_offsets(half_width);
        let design = DMatrix::from_fn(n_points, order + 1, |r, c| offsets[r].powi(c as i32));
        let pinv = design
            .pseudo_inverse(1e-12)
            .map_err(|e| DespikeError::Numerical(format!("Regression design: {}", e)))?;

        // Prediction at offset 0 is the intercept, i.e. the first row of the
        // pseudo-inverse applied to the neighbour values.
        let weights = pinv.row(0).iter().copied().collect();
        Ok(Self {
            half_width,
            order,
            weights,
        })
    }

    /// Number of neighbours used on each side.
    pub fn half_width(&self) -> usize {
        self.half_width
    }

    /// Polynomial order.
    pub fn order(&self) -> usize {
        self.order
    }

    /// Predict `s[i]` from its neighbours. Caller guarantees the stencil fits.
    fn predict(&self, s: &[f64], i: usize) -> f64 {
        let n = self.half_width;
        let left = &s[i - n..i];
        let right = &s[i + 1..=i + n];
        left.iter()
            .chain(right.iter())
            .zip(self.weights.iter())
            .map(|(v, w)| v * w)
            .sum()
    }

    /// Squared prediction residual at every position.
    pub fn squared_residuals(&self, y: &[f64]) -> Result<Vec<f64>> {
        interior_scores(y, self.half_width, |s, i| {
            let r = s[i] - self.predict(s, i);
            r * r
        })
    }
}

fn neighbour_offsets(half_width: usize) -> Vec<f64> {
    let n = half_width as i64;
    (-n..=n).filter(|&t| t != 0).map(|t| t as f64).collect()
}

/// Squared residual metric for an arbitrary neighbourhood and order.
pub fn lr_residual(y: &[f64], half_width: usize, order: usize) -> Result<Vec<f64>> {
    LocalRegression::new(half_width, order)?.squared_residuals(y)
}

/// Two neighbours per side, linear fit.
pub fn gg_lr_n2o1(y: &[f64]) -> Result<Vec<f64>> {
    lr_residual(y, 2, 1)
}

/// Two neighbours per side, quadratic fit.
pub fn gg_lr_n2o2(y: &[f64]) -> Result<Vec<f64>> {
    lr_residual(y, 2, 2)
}

/// Three neighbours per side, linear fit.
pub fn gg_lr_n3o1(y: &[f64]) -> Result<Vec<f64>> {
    lr_residual(y, 3, 1)
}

/// Three neighbours per side, quadratic fit.
pub fn gg_lr_n3o2(y: &[f64]) -> Result<Vec<f64>> {
    lr_residual(y, 3, 2)
}
