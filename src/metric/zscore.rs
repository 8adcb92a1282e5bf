//! Modified z-score of first differences over a local window.

use super::interior_scores;
use crate::error::Result;

/// Half-width of the window of differences used for the robust statistics.
pub const MOD_Z_WINDOW: usize = 10;

/// Consistency constant relating MAD to the standard deviation.
const MAD_SCALE: f64 = 0.6745;

/// Consistency constant relating mean absolute deviation to the standard
/// deviation; used when MAD collapses to zero.
const MEAN_AD_SCALE: f64 = 1.253314;

/// Modified z-score of the first difference `d[i] = s[i] - s[i-1]`.
///
/// Median and MAD are taken over the differences within
/// [`MOD_Z_WINDOW`] positions of `i`. When MAD is zero the scaled mean
/// absolute deviation is used instead; when that is zero too the score is
/// neutral. A single spike raises the score at its own position and at the
/// sample right after it.
pub fn mod_z_scores(y: &[f64]) -> Result<Vec<f64>> {
    let n = y.len();
    let diffs: Vec<f64> = y.windows(2).map(|w| w[1] - w[0]).collect();

    interior_scores(y, 2, |_, i| {
        // diffs[k] holds d[k + 1]
        let lo = i.saturating_sub(MOD_Z_WINDOW).max(1);
        let hi = (i + MOD_Z_WINDOW).min(n - 1);
        let window = &diffs[lo - 1..hi];
        let d = diffs[i - 1];

        let med = median(window);
        let deviations: Vec<f64> = window.iter().map(|v| (v - med).abs()).collect();
        let mad = median(&deviations);
        if mad > 0.0 {
            return (MAD_SCALE * (d - med) / mad).abs();
        }
        let mean_ad = deviations.iter().sum::<f64>() / deviations.len() as f64;
        if mean_ad > 0.0 {
            (d - med).abs() / (MEAN_AD_SCALE * mean_ad)
        } else {
            0.0
        }
    })
}

fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let n = sorted.len();
    if n == 0 {
        return 0.0;
    }
    if n % 2 == 0 {
        (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
    } else {
        sorted[n / 2]
    }
}
