//! Trigonometric basis for the series-modulated spectral function models.
//!
//! The series lives in a monotone reparametrization of the frequency axis
//!
//! - `x(ω) = ln(1 + ω/πT)`
//! - `y(ω) = x / (1 + x)`
//!
//! which maps `[0, ∞)` onto `[0, 1)`. Two basis families are available:
//!
//! - `alpha`: `E_n(ω) = sin(π n y)`
//! - `beta`:  `E_n(ω) = sin(π y) · sin(π n y)`

use std::f64::consts::PI;

use crate::domain::SeriesBasis;

/// Monotone reparametrization `y(ω/T) ∈ [0, 1)`.
pub fn series_coordinate(omega_by_t: f64) -> f64 {
    let x = (omega_by_t / PI).ln_1p();
    x / (1.0 + x)
}

/// Basis function `E_n(ω/T)`.
pub fn series_term(n: usize, omega_by_t: f64, basis: SeriesBasis) -> f64 {
    let y = series_coordinate(omega_by_t);
    let n = n as f64;
    match basis {
        SeriesBasis::Alpha => (PI * n * y).sin(),
        SeriesBasis::Beta => (PI * y).sin() * (PI * n * y).sin(),
    }
}
