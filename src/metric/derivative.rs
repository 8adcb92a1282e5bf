//! Finite-difference metrics.

use super::interior_scores;
use crate::error::Result;

/// Backward first-difference magnitude, `|s[i] - s[i-1]|`.
pub fn first_derivative(y: &[f64]) -> Result<Vec<f64>> {
    interior_scores(y, 2, |s, i| (s[i] - s[i - 1]).abs())
}

/// Magnitude of the five-point second-derivative stencil.
///
/// `|-s[i-2] + 16 s[i-1] - 30 s[i] + 16 s[i+1] - s[i+2]| / 12`
pub fn laplacian(y: &[f64]) -> Result<Vec<f64>> {
    interior_scores(y, 2, |s, i| {
        (-s[i - 2] + 16.0 * s[i - 1] - 30.0 * s[i] + 16.0 * s[i + 1] - s[i + 2]).abs() / 12.0
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_first_derivative() {
        let y = vec![0.0, 1.0, 3.0, 6.0, 10.0, 15.0];
        let m = first_derivative(&y).unwrap();
        assert_eq!(m, vec![0.0, 0.0, 2.0, 3.0, 0.0, 0.0]);
    }

    #[test]
    fn test_laplacian_zero_on_quadratic_free_data() {
        let y: Vec<f64> = (0..10).map(|i| 2.0 * i as f64 - 7.0).collect();
        let m = laplacian(&y).unwrap();
        assert!(m.iter().all(|&v| v.abs() < 1e-12));
    }

    #[test]
    fn test_laplacian_spike() {
        let mut y = vec![0.0; 9];
        y[4] = 12.0;
        let m = laplacian(&y).unwrap();
        assert_relative_eq!(m[4], 30.0);
        assert_relative_eq!(m[3], 16.0);
    }
}
