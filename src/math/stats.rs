//! NaN-aware ensemble statistics.
//!
//! Poisoned bootstrap samples are stored as all-NaN records, so every estimator here
//! drops NaNs before looking at the data. An ensemble with no finite values yields NaN.

use std::cmp::Ordering;

/// Fraction of the distribution enclosed by the asymmetric error band.
pub const CONFIDENCE: f64 = 0.68;

/// Central value plus asymmetric spread.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Estimate {
    pub central: f64,
    /// Distance from `central` down to the lower quantile.
    pub err_low: f64,
    /// Distance from `central` up to the upper quantile.
    pub err_high: f64,
}

impl Estimate {
    pub fn nan() -> Self {
        Self {
            central: f64::NAN,
            err_low: f64::NAN,
            err_high: f64::NAN,
        }
    }

    /// Larger of the two one-sided errors.
    pub fn symmetric(&self) -> f64 {
        self.err_low.max(self.err_high)
    }
}

/// Which central value accompanies the spread.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CentralValue {
    Median,
    Mean,
}

fn sorted_non_nan(values: &[f64]) -> Vec<f64> {
    let mut v: Vec<f64> = values.iter().copied().filter(|x| !x.is_nan()).collect();
    v.sort_by(|a, b| a.partial_cmp(b).unwrap_or(Ordering::Equal));
    v
}

fn median_sorted(v: &[f64]) -> f64 {
    if v.is_empty() {
        return f64::NAN;
    }
    let mid = v.len() / 2;
    if v.len() % 2 == 1 {
        v[mid]
    } else {
        (v[mid - 1] + v[mid]) / 2.0
    }
}

/// Median ignoring NaNs.
pub fn nan_median(values: &[f64]) -> f64 {
    median_sorted(&sorted_non_nan(values))
}

/// Arithmetic mean ignoring NaNs.
pub fn nan_mean(values: &[f64]) -> f64 {
    let mut n = 0usize;
    let mut sum = 0.0;
    for v in values.iter().filter(|v| !v.is_nan()) {
        n += 1;
        sum += v;
    }
    if n == 0 { f64::NAN } else { sum / n as f64 }
}

/// Distances from the median to the lower and upper edges of the central
/// [`CONFIDENCE`] band of the empirical distribution.
///
/// Order statistics are taken at indices `floor((n−1)/2 − n·c/2)` and
/// `ceil((n−1)/2 + n·c/2)`, clamped to the sample.
pub fn dev_by_dist_both(values: &[f64]) -> (f64, f64) {
    let v = sorted_non_nan(values);
    let n = v.len();
    if n == 0 {
        return (f64::NAN, f64::NAN);
    }
    let median = median_sorted(&v);
    let half_width = n as f64 * CONFIDENCE / 2.0;
    let centre = (n as f64 - 1.0) / 2.0;
    let lo = (centre - half_width).floor().max(0.0) as usize;
    let hi = ((centre + half_width).ceil() as usize).min(n - 1);
    (median - v[lo], v[hi] - median)
}

/// Symmetric distribution-based deviation: the larger of the two one-sided errors.
pub fn dev_by_dist(values: &[f64]) -> f64 {
    let (lo, hi) = dev_by_dist_both(values);
    lo.max(hi)
}

/// Central value and asymmetric spread of one ensemble column.
pub fn estimate(values: &[f64], central: CentralValue) -> Estimate {
    let (err_low, err_high) = dev_by_dist_both(values);
    let central = match central {
        CentralValue::Median => nan_median(values),
        CentralValue::Mean => nan_mean(values),
    };
    Estimate {
        central,
        err_low,
        err_high,
    }
}

/// Apply [`estimate`] column-wise to a stack of equally long rows.
///
/// Blocks until every row is present; columns are order statistics over the whole
/// ensemble.
pub fn estimate_columns(rows: &[Vec<f64>], central: CentralValue) -> Vec<Estimate> {
    let Some(width) = rows.first().map(Vec::len) else {
        return Vec::new();
    };
    let mut column = Vec::with_capacity(rows.len());
    (0..width)
        .map(|j| {
            column.clear();
            column.extend(rows.iter().map(|r| r.get(j).copied().unwrap_or(f64::NAN)));
            estimate(&column, central)
        })
        .collect()
}
