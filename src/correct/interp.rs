//! One-dimensional interpolation kernels used by the correction strategies.

use crate::error::{DespikeError, Result};
use serde::{Deserialize, Serialize};

/// Interpolation kernel.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InterpKind {
    /// Piecewise linear.
    #[default]
    Linear,
    /// Piecewise quadratic through the three knots nearest the query.
    Quadratic,
    /// Natural cubic spline.
    Cubic,
}

impl InterpKind {
    /// Minimum number of support points the kernel can be fitted on.
    pub fn min_support(&self) -> usize {
        match self {
            Self::Linear => 2,
            Self::Quadratic => 3,
            Self::Cubic => 4,
        }
    }

    /// Lowercase name, as used in configuration files.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Linear => "linear",
            Self::Quadratic => "quadratic",
            Self::Cubic => "cubic",
        }
    }
}

/// What to do with a query outside the knot range.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutOfRange {
    /// Return an interpolation failure.
    Fail,
    /// Return the value of the nearest knot.
    Nearest,
}

/// A fitted interpolant over strictly monotonic knots.
#[derive(Debug, Clone)]
pub struct Interpolator {
    kind: InterpKind,
    /// Knots, always stored in increasing order.
    xs: Vec<f64>,
    ys: Vec<f64>,
    /// Second derivatives at the knots (cubic only).
    second: Vec<f64>,
}

impl Interpolator {
    /// Fit `kind` on the knots `(xs, ys)`.
    ///
    /// `xs` may be increasing or decreasing but must be strictly monotonic.
    pub fn fit(xs: &[f64], ys: &[f64], kind: InterpKind) -> Result<Self> {
        if xs.len() != ys.len() {
            return Err(DespikeError::DimensionMismatch {
                expected: xs.len(),
                actual: ys.len(),
            });
        }
        if xs.len() < kind.min_support() {
            return Err(DespikeError::InterpolationFailure {
                index: None,
                reason: format!(
                    "{} interpolation needs {} support points, got {}",
                    kind.name(),
                    kind.min_support(),
                    xs.len()
                ),
            });
        }

        let (mut xs, mut ys) = (xs.to_vec(), ys.to_vec());
        if xs[0] > xs[xs.len() - 1] {
            xs.reverse();
            ys.reverse();
        }
        if xs.windows(2).any(|w| w[1] <= w[0]) {
            return Err(DespikeError::InvalidInput(
                "Interpolation knots must be strictly monotonic".to_string(),
            ));
        }

        let second = match kind {
            InterpKind::Cubic => natural_spline_second_derivatives(&xs, &ys),
            _ => Vec::new(),
        };
        Ok(Self {
            kind,
            xs,
            ys,
            second,
        })
    }

    /// Lowest knot.
    pub fn x_min(&self) -> f64 {
        self.xs[0]
    }

    /// Highest knot.
    pub fn x_max(&self) -> f64 {
        self.xs[self.xs.len() - 1]
    }

    /// Whether `x` lies within the knot range.
    pub fn covers(&self, x: f64) -> bool {
        x >= self.x_min() && x <= self.x_max()
    }

    /// Evaluate at a single point.
    pub fn eval(&self, x: f64, out_of_range: OutOfRange) -> Result<f64> {
        if !self.covers(x) {
            return match out_of_range {
                OutOfRange::Nearest if x < self.x_min() => Ok(self.ys[0]),
                OutOfRange::Nearest => Ok(self.ys[self.ys.len() - 1]),
                OutOfRange::Fail => Err(DespikeError::InterpolationFailure {
                    index: None,
                    reason: format!(
                        "x = {} outside support [{}, {}]",
                        x,
                        self.x_min(),
                        self.x_max()
                    ),
                }),
            };
        }

        let k = self.segment(x);
        Ok(match self.kind {
            InterpKind::Linear => self.linear(k, x),
            InterpKind::Quadratic => self.quadratic(k, x),
            InterpKind::Cubic => self.cubic(k, x),
        })
    }

    /// Evaluate at many points.
    pub fn eval_many(&self, xs: &[f64], out_of_range: OutOfRange) -> Result<Vec<f64>> {
        xs.iter().map(|&x| self.eval(x, out_of_range)).collect()
    }

    /// Index `k` of the segment `[xs[k], xs[k + 1]]` containing `x`.
    fn segment(&self, x: f64) -> usize {
        let last = self.xs.len() - 2;
        match self.xs.partition_point(|&v| v <= x) {
            0 => 0,
            p => (p - 1).min(last),
        }
    }

    fn linear(&self, k: usize, x: f64) -> f64 {
        let (x0, x1) = (self.xs[k], self.xs[k + 1]);
        let t = (x - x0) / (x1 - x0);
        self.ys[k] + t * (self.ys[k + 1] - self.ys[k])
    }

    fn quadratic(&self, k: usize, x: f64) -> f64 {
        // Use knots k-1, k, k+1 or k, k+1, k+2, whichever third knot is closer.
        let n = self.xs.len();
        let start = if k == 0 {
            0
        } else if k + 2 >= n {
            n - 3
        } else if (x - self.xs[k - 1]) <= (self.xs[k + 2] - x) {
            k - 1
        } else {
            k
        };
        let (x0, x1, x2) = (self.xs[start], self.xs[start + 1], self.xs[start + 2]);
        let (y0, y1, y2) = (self.ys[start], self.ys[start + 1], self.ys[start + 2]);
        y0 * (x - x1) * (x - x2) / ((x0 - x1) * (x0 - x2))
            + y1 * (x - x0) * (x - x2) / ((x1 - x0) * (x1 - x2))
            + y2 * (x - x0) * (x - x1) / ((x2 - x0) * (x2 - x1))
    }

    fn cubic(&self, k: usize, x: f64) -> f64 {
        let h = self.xs[k + 1] - self.xs[k];
        let a = (self.xs[k + 1] - x) / h;
        let b = (x - self.xs[k]) / h;
        a * self.ys[k]
            + b * self.ys[k + 1]
            + ((a * a * a - a) * self.second[k] + (b * b * b - b) * self.second[k + 1]) * h * h
                / 6.0
    }
}

/// Second derivatives of the natural cubic spline through the knots.
///
/// Solves the tridiagonal system with the Thomas algorithm; the end
/// conditions are zero curvature.
fn natural_spline_second_derivatives(xs: &[f64], ys: &[f64]) -> Vec<f64> {
    let n = xs.len();
    let mut m = vec![0.0; n];
    if n < 3 {
        return m;
    }

    let interior = n - 2;
    let mut diag = vec![0.0; interior];
    let mut upper = vec![0.0; interior];
    let mut rhs = vec![0.0; interior];
    for j in 0..interior {
        let i = j + 1;
        let h0 = xs[i] - xs[i - 1];
        let h1 = xs[i + 1] - xs[i];
        diag[j] = 2.0 * (h0 + h1);
        upper[j] = h1;
        rhs[j] = 6.0 * ((ys[i + 1] - ys[i]) / h1 - (ys[i] - ys[i - 1]) / h0);
    }

    // Forward sweep; the sub-diagonal entry of row j is h0 of row j, which
    // equals the super-diagonal entry of row j - 1.
    for j in 1..interior {
        let w = upper[j - 1] / diag[j - 1];
        diag[j] -= w * upper[j - 1];
        rhs[j] -= w * rhs[j - 1];
    }
    // Back substitution
    let mut sol = vec![0.0; interior];
    sol[interior - 1] = rhs[interior - 1] / diag[interior - 1];
    for j in (0..interior - 1).rev() {
        sol[j] = (rhs[j] - upper[j] * sol[j + 1]) / diag[j];
    }

    m[1..n - 1].copy_from_slice(&sol);
    m
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_min_support() {
        for kind in [InterpKind::Linear, InterpKind::Quadratic, InterpKind::Cubic] {
            let n = kind.min_support();
            let xs: Vec<f64> = (0..n - 1).map(|i| i as f64).collect();
            let result = Interpolator::fit(&xs, &xs, kind);
            assert!(matches!(result, Err(DespikeError::InterpolationFailure { .. })));

            let xs: Vec<f64> = (0..n).map(|i| i as f64).collect();
            assert!(Interpolator::fit(&xs, &xs, kind).is_ok());
        }
    }

    #[test]
    fn test_linear_midpoints() {
        let xs = [0.0, 1.0, 3.0];
        let ys = [0.0, 10.0, 30.0];
        let it = Interpolator::fit(&xs, &ys, InterpKind::Linear).unwrap();
        assert_relative_eq!(it.eval(0.5, OutOfRange::Fail).unwrap(), 5.0);
        assert_relative_eq!(it.eval(2.0, OutOfRange::Fail).unwrap(), 20.0);
        assert_relative_eq!(it.eval(3.0, OutOfRange::Fail).unwrap(), 30.0);
    }

    #[test]
    fn test_decreasing_knots() {
        let xs = [3.0, 2.0, 1.0, 0.0];
        let ys = [30.0, 20.0, 10.0, 0.0];
        let it = Interpolator::fit(&xs, &ys, InterpKind::Linear).unwrap();
        assert_relative_eq!(it.eval(1.5, OutOfRange::Fail).unwrap(), 15.0);
    }

    #[test]
    fn test_out_of_range_policies() {
        let xs = [1.0, 2.0, 3.0];
        let ys = [5.0, 6.0, 7.0];
        let it = Interpolator::fit(&xs, &ys, InterpKind::Linear).unwrap();
        assert!(it.eval(0.0, OutOfRange::Fail).is_err());
        assert_eq!(it.eval(0.0, OutOfRange::Nearest).unwrap(), 5.0);
        assert_eq!(it.eval(9.0, OutOfRange::Nearest).unwrap(), 7.0);
    }

    #[test]
    fn test_quadratic_reproduces_parabola() {
        let xs: Vec<f64> = vec![0.0, 1.0, 2.5, 4.0, 5.0, 7.0];
        let ys: Vec<f64> = xs.iter().map(|x| 2.0 * x * x - x + 3.0).collect();
        let it = Interpolator::fit(&xs, &ys, InterpKind::Quadratic).unwrap();
        for x in [0.3, 1.7, 3.3, 4.5, 6.9] {
            assert_relative_eq!(
                it.eval(x, OutOfRange::Fail).unwrap(),
                2.0 * x * x - x + 3.0,
                epsilon = 1e-9
            );
        }
    }

    #[test]
    fn test_cubic_reproduces_line_and_knots() {
        let xs: Vec<f64> = (0..8).map(|i| i as f64 * 0.5).collect();
        let ys: Vec<f64> = xs.iter().map(|x| 4.0 * x - 2.0).collect();
        let it = Interpolator::fit(&xs, &ys, InterpKind::Cubic).unwrap();
        for x in [0.1, 1.25, 3.4] {
            let v = it.eval(x, OutOfRange::Fail).unwrap();
            assert_relative_eq!(v, 4.0 * x - 2.0, epsilon = 1e-9);
        }

        let ys: Vec<f64> = xs.iter().map(|x| x.sin()).collect();
        let it = Interpolator::fit(&xs, &ys, InterpKind::Cubic).unwrap();
        for (x, y) in xs.iter().zip(ys.iter()) {
            assert_relative_eq!(it.eval(*x, OutOfRange::Fail).unwrap(), *y, epsilon = 1e-12);
        }
        let mid = it.eval(1.75, OutOfRange::Fail).unwrap();
        assert_relative_eq!(mid, 1.75f64.sin(), epsilon = 1e-2);
    }
}
