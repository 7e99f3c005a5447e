//! Integral kernel and correlator normalization.
//!
//! The Euclidean correlator at separation `τT` is related to the spectral function by
//!
//! ```text
//! G(τT) = ∫ dω/T · K(ω/T, τT) · ρ(ω/T) / π
//! K(ω/T, τT) = cosh(ω/2T − ωτ) / sinh(ω/2T)
//! ```
//!
//! Numerical notes:
//! - `cosh` and `sinh` overflow separately above `ω/T ≈ 1420` even though their ratio
//!   is tiny. We evaluate the algebraically identical form
//!   `(e^{−ωτ} + e^{−ω(1−τ)}) / (1 − e^{−ω})`, which is finite for every `ω/T > 0`.
//! - `ω/T = 0` is a pole of the kernel; callers keep it out of the integration range.

use std::f64::consts::PI;

/// Transform kernel `K(ω/T, τT)`.
///
/// Defined for `ω/T > 0`.
pub fn kernel(omega_by_t: f64, tau_t: f64) -> f64 {
    let w = omega_by_t;
    let numer = (-w * tau_t).exp() + (-w * (1.0 - tau_t)).exp();
    let denom = -(-w).exp_m1();
    numer / denom
}

/// Perturbative normalization of the correlator, `G_norm(τT)`.
///
/// Diverges as `τT → 0`. Data at `τT = 0` and `τT = 0.5` is excluded upstream.
pub fn gnorm(tau_t: f64) -> f64 {
    let s = (PI * tau_t).sin();
    let c = (PI * tau_t).cos();
    PI * PI * (c * c / s.powi(4) + 1.0 / (3.0 * s * s))
}

/// True if `τT` lies strictly inside `(0, 0.5)`.
pub fn is_valid_separation(tau_t: f64) -> bool {
    tau_t.is_finite() && tau_t > 0.0 && tau_t < 0.5
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kernel_naive(w: f64, tau: f64) -> f64 {
        (w / 2.0 - w * tau).cosh() / (w / 2.0).sinh()
    }

    #[test]
    fn kernel_matches_cosh_over_sinh() {
        for &w in &[1e-3, 0.1, 1.0, 5.0, 40.0, 300.0] {
            for &tau in &[0.05, 0.2, 0.25, 0.4, 0.5] {
                let a = kernel(w, tau);
                let b = kernel_naive(w, tau);
                assert!(
                    ((a - b) / b).abs() < 1e-10,
                    "w={w} tau={tau}: {a} vs {b}"
                );
            }
        }
    }

    #[test]
    fn kernel_is_finite_where_cosh_overflows() {
        let v = kernel(5000.0, 0.3);
        assert!(v.is_finite());
        assert!(v >= 0.0);
        assert!(kernel_naive(5000.0, 0.3).is_nan());
    }

    #[test]
    fn kernel_is_symmetric_around_half() {
        for &w in &[0.5, 3.0, 20.0] {
            let a = kernel(w, 0.2);
            let b = kernel(w, 0.8);
            assert!((a - b).abs() < 1e-12 * a.abs().max(1.0));
        }
    }

    #[test]
    fn gnorm_known_values() {
        // sin(π/4)^2 = 1/2, cos(π/4)^2 = 1/2 → π² (0.5/0.25 + 1/(3·0.5)) = π² · 8/3
        let v = gnorm(0.25);
        assert!((v - PI * PI * 8.0 / 3.0).abs() < 1e-12);
        // At τT = 0.5 only the second term survives.
        assert!((gnorm(0.5) - PI * PI / 3.0).abs() < 1e-12);
        assert!(gnorm(1e-4) > 1e12);
    }

    #[test]
    fn separation_validity() {
        assert!(is_valid_separation(0.25));
        assert!(!is_valid_separation(0.0));
        assert!(!is_valid_separation(0.5));
        assert!(!is_valid_separation(f64::NAN));
    }
}
