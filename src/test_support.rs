//! Fixtures shared by unit tests.

use crate::domain::{FitConfig, SpfModel};
use crate::math::CubicSpline;

/// Log-spaced grid of `n` points on `[lo, hi]`.
pub fn log_grid(lo: f64, hi: f64, n: usize) -> Vec<f64> {
    let (a, b) = (lo.ln(), hi.ln());
    (0..n)
        .map(|i| (a + (b - a) * i as f64 / (n - 1) as f64).exp())
        .collect()
}

/// Toy UV curve `Φ(ω) = 0.01 ω³` tabulated on `[1e-3, 150]`.
pub fn cubic_uv() -> CubicSpline {
    let x = log_grid(1e-3, 150.0, 400);
    let y = x.iter().map(|w| 0.01 * w * w * w).collect();
    CubicSpline::new(x, y).expect("fixture spline")
}

pub fn config(model: SpfModel) -> FitConfig {
    FitConfig::new(model, cubic_uv(), false).expect("fixture config")
}
