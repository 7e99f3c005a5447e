//! Forward transform: model SPF → predicted correlator.
//!
//! `G(τT) = ∫_{Ω_min}^{Ω_max} dω/T · K(ω/T, τT) · ρ(ω/T) / π`, integrated
//! independently for each separation with adaptive quadrature.

use std::f64::consts::PI;

use crate::domain::FitConfig;
use crate::error::SpfError;
use crate::math::{QuadOptions, integrate, kernel};
use crate::models::spf_by_t3;

/// `K(ω/T, τT) · ρ(ω/T) / π`.
pub fn integrand(omega_by_t: f64, tau_t: f64, config: &FitConfig, params: &[f64]) -> Result<f64, SpfError> {
    Ok(kernel(omega_by_t, tau_t) * spf_by_t3(omega_by_t, config, params)? / PI)
}

/// Predicted correlator at every separation in `taus`.
///
/// An integrand overflow at any separation makes the whole prediction `+∞`. Every
/// other error (including infeasible `plaw` endpoints) is returned to the caller.
pub fn target_corr(taus: &[f64], config: &FitConfig, params: &[f64]) -> Result<Vec<f64>, SpfError> {
    let opts = QuadOptions::default();
    let mut out = Vec::with_capacity(taus.len());
    for &tau in taus {
        let res = integrate(
            |w| integrand(w, tau, config, params),
            config.omega_min,
            config.omega_max,
            opts,
        );
        match res {
            Ok(r) => {
                if !r.converged {
                    log::debug!(
                        "quadrature hit {} subintervals at tauT={tau} (error estimate {:.3e})",
                        r.intervals,
                        r.abs_error
                    );
                }
                out.push(r.value);
            }
            Err(SpfError::Overflow { omega }) => {
                log::debug!("integrand overflow at omega/T={omega} for tauT={tau}");
                return Ok(vec![f64::INFINITY; taus.len()]);
            }
            Err(e) => return Err(e),
        }
    }
    Ok(out)
}
