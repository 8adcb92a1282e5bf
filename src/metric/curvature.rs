//! Curvature-based single and double spike metrics.

use super::interior_scores;
use crate::error::Result;

/// Single-point spike metric.
///
/// `m[i] = |2 s[i] - s[i-1] - s[i+1]| - |s[i+1] - s[i-1]|`
///
/// Local curvature rewards an isolated outlying sample; subtracting the
/// central first difference discounts steep but smooth slopes. The two
/// leading and two trailing positions are neutral.
pub fn gg_1spike(y: &[f64]) -> Result<Vec<f64>> {
    interior_scores(y, 2, |s, i| {
        (-s[i - 1] - s[i + 1] + 2.0 * s[i]).abs() - (s[i + 1] - s[i - 1]).abs()
    })
}

/// Two-sample spike metric, scored at the first sample of the pair.
///
/// `m[i] = |s[i] + s[i+1] - s[i-1] - s[i+2]| - |s[i+2] - s[i-1]|`
pub fn gg_2spike(y: &[f64]) -> Result<Vec<f64>> {
    interior_scores(y, 2, |s, i| {
        (s[i] + s[i + 1] - s[i - 1] - s[i + 2]).abs() - (s[i + 2] - s[i - 1]).abs()
    })
}

/// Deviation from straight-line extrapolation of both neighbouring pairs.
///
/// A spike sits off the line continued from the left pair and off the line
/// continued from the right pair; the smaller of the two deviations is the
/// score, so a genuine slope change on one side alone scores low.
pub fn gg_lin_reg_extrap(y: &[f64]) -> Result<Vec<f64>> {
    interior_scores(y, 2, |s, i| {
        let from_left = 2.0 * s[i - 1] - s[i - 2];
        let from_right = 2.0 * s[i + 1] - s[i + 2];
        (s[i] - from_left).abs().min((s[i] - from_right).abs())
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn flat_with_spike(n: usize, at: usize, height: f64) -> Vec<f64> {
        let mut y = vec![10.0; n];
        y[at] += height;
        y
    }

    #[test]
    fn test_gg_1spike_isolated_spike() {
        let y = flat_with_spike(11, 5, 50.0);
        let m = gg_1spike(&y).unwrap();
        assert_relative_eq!(m[5], 100.0);
        // Neighbours: curvature and asymmetry cancel
        assert_relative_eq!(m[4], 0.0);
        assert_relative_eq!(m[6], 0.0);
        assert_eq!(&m[..2], &[0.0, 0.0]);
        assert_eq!(&m[9..], &[0.0, 0.0]);
    }

    #[test]
    fn test_gg_1spike_linear_ramp_scores_nonpositive() {
        let y: Vec<f64> = (0..20).map(|i| 5.0 * i as f64).collect();
        let m = gg_1spike(&y).unwrap();
        assert!(m.iter().all(|&v| v <= 0.0));
    }

    #[test]
    fn test_gg_2spike_pair() {
        let mut y = vec![0.0; 10];
        y[4] = 30.0;
        y[5] = 30.0;
        let m = gg_2spike(&y).unwrap();
        assert_relative_eq!(m[4], 60.0);
        assert!(m[3] < m[4]);
        assert!(m[5] < m[4]);
    }

    #[test]
    fn test_gg_lin_reg_extrap_ignores_ramp() {
        let y: Vec<f64> = (0..12).map(|i| 3.0 * i as f64 + 1.0).collect();
        let m = gg_lin_reg_extrap(&y).unwrap();
        for v in m {
            assert_relative_eq!(v, 0.0, epsilon = 1e-12);
        }
    }

    #[test]
    fn test_gg_lin_reg_extrap_spike() {
        let y = flat_with_spike(12, 6, 40.0);
        let m = gg_lin_reg_extrap(&y).unwrap();
        assert_relative_eq!(m[6], 40.0);
    }
}
