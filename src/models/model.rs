//! Spectral-function model evaluation.
//!
//! The fitter relies on two primitive operations:
//! - build the initial parameter vector for a model
//! - evaluate `ρ(ω/T)/T³` for a parameter vector
//!
//! Both match exhaustively over [`SpfModel`], so adding a model forces every
//! consumer to handle it.
//!
//! Infeasible parameter points are reported in one of two ways: the series models
//! return `+∞` where their modulation becomes negative, and `plaw` returns
//! [`SpfError::PowerLawMatch`] when its endpoints cannot be joined in log space.

use crate::domain::{FitConfig, SeriesBasis, SpfModel};
use crate::error::SpfError;
use crate::math::series_term;

/// Infrared transport term `κ/2 · ω/T`.
pub fn phi_ir(omega_by_t: f64, kappa: f64) -> f64 {
    kappa / 2.0 * omega_by_t
}

/// Initial guess: `kappa = 1`, UV amplitudes `1`, series coefficients `0`.
pub fn initial_guess(model: &SpfModel) -> Vec<f64> {
    match model {
        SpfModel::Max
        | SpfModel::Smax
        | SpfModel::Sum
        | SpfModel::Pnorm { .. }
        | SpfModel::Line { .. }
        | SpfModel::Plaw { .. }
        | SpfModel::StepAny => vec![1.0, 1.0],
        SpfModel::Step { .. } => vec![1.0],
        SpfModel::Fourier { .. } => {
            let mut x0 = vec![1.0];
            x0.resize(1 + model.free_coefficients(), 0.0);
            x0
        }
        SpfModel::Trig { .. } => {
            let mut x0 = vec![1.0, 1.0];
            x0.resize(2 + model.free_coefficients(), 0.0);
            x0
        }
    }
}

/// Evaluate the model SPF at `omega_by_t`.
///
/// `params` must have length `config.model.param_count()`.
pub fn spf_by_t3(omega_by_t: f64, config: &FitConfig, params: &[f64]) -> Result<f64, SpfError> {
    debug_assert_eq!(params.len(), config.model.param_count());
    let w = omega_by_t;
    let kappa = params[0];
    let uv = |x: f64| config.uv.value(x);

    match config.model {
        SpfModel::Max => Ok(phi_ir(w, kappa).max(params[1] * uv(w)?)),
        SpfModel::Smax => Ok(phi_ir(w, kappa).hypot(params[1] * uv(w)?)),
        SpfModel::Sum => Ok(phi_ir(w, kappa) + params[1] * uv(w)?),
        SpfModel::Pnorm { p } => Ok(p_norm(phi_ir(w, kappa), params[1] * uv(w)?, p)),
        SpfModel::Line { omega_ir, omega_uv } => {
            let (x1, x2) = (omega_ir, omega_uv);
            if w <= x1 {
                return Ok(phi_ir(w, kappa));
            }
            if w >= x2 {
                return Ok(params[1] * uv(w)?);
            }
            let y1 = phi_ir(x1, kappa);
            let y2 = params[1] * uv(x2)?;
            let slope = (y2 - y1) / (x2 - x1);
            let intercept = (y1 * x2 - y2 * x1) / (x2 - x1);
            Ok(slope * w + intercept)
        }
        SpfModel::Plaw { omega_ir, omega_uv } => {
            let (x1, x2) = (omega_ir, omega_uv);
            let y1 = phi_ir(x1, kappa);
            let y2 = params[1] * uv(x2)?;
            if !(y1 > 0.0 && y2 > 0.0) {
                return Err(SpfError::PowerLawMatch { y1, y2 });
            }
            if w <= x1 {
                return Ok(phi_ir(w, kappa));
            }
            if w >= x2 {
                return Ok(params[1] * uv(w)?);
            }
            let exponent = (y1 / y2).ln() / (x1 / x2).ln();
            let prefactor = y1 / x1.powf(exponent);
            Ok(prefactor * w.powf(exponent))
        }
        SpfModel::Step { omega_uv } => step(w, kappa, omega_uv, config),
        SpfModel::StepAny => {
            let brk = params[1];
            if !(brk > 0.0 && brk >= config.omega_min && brk <= config.omega_max) {
                return Ok(f64::INFINITY);
            }
            step(w, kappa, brk, config)
        }
        SpfModel::Fourier {
            basis, constrain, ..
        } => {
            let coeffs = &params[1..];
            let mut coef = 1.0 + series_sum(coeffs, w, basis);
            if constrain {
                let n_last = coeffs.len() + 1;
                let c_last = constrained_coefficient(config, kappa, coeffs, basis)?;
                coef += c_last * series_term(n_last, w, basis);
            }
            if coef < 0.0 {
                return Ok(f64::INFINITY);
            }
            Ok((0.5 * kappa * w).hypot(uv(w)?) * coef)
        }
        SpfModel::Trig { basis, .. } => {
            let coef = 1.0 + series_sum(&params[2..], w, basis);
            if coef < 0.0 {
                return Ok(f64::INFINITY);
            }
            Ok((0.5 * kappa * w).hypot(params[1] * uv(w)?) * coef)
        }
    }
}

/// Evaluate the SPF on every point of `grid`.
pub fn spf_on_grid(grid: &[f64], config: &FitConfig, params: &[f64]) -> Result<Vec<f64>, SpfError> {
    grid.iter().map(|w| spf_by_t3(*w, config, params)).collect()
}

/// Coefficient of the highest series term in constrained mode.
///
/// Chosen so that `coef(Ω_max) = Φ(Ω_max) / sqrt((κΩ_max/2)² + Φ(Ω_max)²)`, i.e. the
/// SPF meets the UV curve at the upper integration bound.
pub fn constrained_coefficient(
    config: &FitConfig,
    kappa: f64,
    free: &[f64],
    basis: SeriesBasis,
) -> Result<f64, SpfError> {
    let w_max = config.omega_max;
    let phi_max = config.uv.value(w_max)?;
    let target = phi_max / (0.5 * kappa * w_max).hypot(phi_max);
    let current = 1.0 + series_sum(free, w_max, basis);
    Ok((target - current) / series_term(free.len() + 1, w_max, basis))
}

/// `Σ_{n≥1} c_n E_n(ω)`.
fn series_sum(coeffs: &[f64], omega_by_t: f64, basis: SeriesBasis) -> f64 {
    coeffs
        .iter()
        .enumerate()
        .map(|(i, c)| c * series_term(i + 1, omega_by_t, basis))
        .sum()
}

/// IR line scaled to meet `κ·Φ_UV` continuously at `brk`.
fn step(w: f64, kappa: f64, brk: f64, config: &FitConfig) -> Result<f64, SpfError> {
    if w < brk {
        Ok(kappa * config.uv.value(brk)? / brk * w)
    } else {
        Ok(kappa * config.uv.value(w)?)
    }
}

/// `(|a|^p + |b|^p)^(1/p)`, scaled by the larger magnitude to stay finite for large `p`.
fn p_norm(a: f64, b: f64, p: f64) -> f64 {
    let (a, b) = (a.abs(), b.abs());
    let m = a.max(b);
    if m == 0.0 {
        return 0.0;
    }
    m * ((a / m).powf(p) + (b / m).powf(p)).powf(1.0 / p)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{config, log_grid};

    const ALL_MODELS: [SpfModel; 10] = [
        SpfModel::Max,
        SpfModel::Smax,
        SpfModel::Sum,
        SpfModel::Pnorm { p: 3.0 },
        SpfModel::Line {
            omega_ir: 0.4,
            omega_uv: 2.2,
        },
        SpfModel::Plaw {
            omega_ir: 0.4,
            omega_uv: 2.2,
        },
        SpfModel::Step { omega_uv: 2.2 },
        SpfModel::StepAny,
        SpfModel::Fourier {
            basis: SeriesBasis::Alpha,
            nmax: 3,
            constrain: false,
        },
        SpfModel::Trig {
            basis: SeriesBasis::Beta,
            nmax: 2,
        },
    ];

    #[test]
    fn initial_guess_matches_parameter_count() {
        for model in ALL_MODELS {
            let x0 = initial_guess(&model);
            assert_eq!(x0.len(), model.param_count(), "{model:?}");
            assert_eq!(x0[0], 1.0);
        }
        let f = initial_guess(&SpfModel::Fourier {
            basis: SeriesBasis::Alpha,
            nmax: 3,
            constrain: true,
        });
        assert_eq!(f, vec![1.0, 0.0, 0.0]);
        let t = initial_guess(&SpfModel::Trig {
            basis: SeriesBasis::Alpha,
            nmax: 2,
        });
        assert_eq!(t, vec![1.0, 1.0, 0.0, 0.0]);
    }

    #[test]
    fn spf_vanishes_towards_zero_frequency() {
        for model in ALL_MODELS {
            let cfg = config(model);
            let mut x0 = initial_guess(&model);
            if model == SpfModel::StepAny {
                x0[1] = 2.2;
            }
            let w = cfg.omega_min;
            let v = spf_by_t3(w, &cfg, &x0).unwrap();
            assert!(v.abs() < 1e-3, "{model:?}: {v}");
        }
    }

    #[test]
    fn max_smax_sum_are_ordered() {
        let params = [1.3, 0.7];
        let (cmax, csmax, csum) = (config(SpfModel::Max), config(SpfModel::Smax), config(SpfModel::Sum));
        for w in log_grid(0.01, 100.0, 50) {
            let a = spf_by_t3(w, &cmax, &params).unwrap();
            let b = spf_by_t3(w, &csmax, &params).unwrap();
            let c = spf_by_t3(w, &csum, &params).unwrap();
            assert!(a <= b * (1.0 + 1e-14) && b <= c * (1.0 + 1e-14), "w={w}: {a} {b} {c}");
        }
    }

    #[test]
    fn pnorm_interpolates_between_smax_and_max() {
        let params = [1.3, 0.7];
        let p2 = config(SpfModel::Pnorm { p: 2.0 });
        let pbig = config(SpfModel::Pnorm { p: 500.0 });
        let smax = config(SpfModel::Smax);
        let max = config(SpfModel::Max);
        for w in log_grid(0.01, 100.0, 30) {
            let s = spf_by_t3(w, &smax, &params).unwrap();
            assert!((spf_by_t3(w, &p2, &params).unwrap() - s).abs() <= 1e-12 * s.max(1.0));
            let m = spf_by_t3(w, &max, &params).unwrap();
            assert!((spf_by_t3(w, &pbig, &params).unwrap() - m).abs() <= 2e-3 * m);
        }
    }

    #[test]
    fn step_is_continuous_at_the_breakpoint() {
        let cfg = config(SpfModel::Step { omega_uv: 2.2 });
        let params = [1.7];
        let below = spf_by_t3(2.2 * (1.0 - 1e-12), &cfg, &params).unwrap();
        let at = spf_by_t3(2.2, &cfg, &params).unwrap();
        assert!((below - at).abs() < 1e-9 * at);
    }

    #[test]
    fn step_any_outside_the_grid_is_infeasible() {
        let cfg = config(SpfModel::StepAny);
        assert!(spf_by_t3(1.0, &cfg, &[1.0, 5.0]).unwrap().is_finite());
        assert_eq!(spf_by_t3(1.0, &cfg, &[1.0, 500.0]).unwrap(), f64::INFINITY);
        assert_eq!(spf_by_t3(1.0, &cfg, &[1.0, -1.0]).unwrap(), f64::INFINITY);
    }

    #[test]
    fn line_and_plaw_are_continuous_at_both_breakpoints() {
        for model in [
            SpfModel::Line {
                omega_ir: 0.4,
                omega_uv: 2.2,
            },
            SpfModel::Plaw {
                omega_ir: 0.4,
                omega_uv: 2.2,
            },
        ] {
            let cfg = config(model);
            let params = [2.0, 0.8];
            for x in [0.4, 2.2] {
                let lo = spf_by_t3(x * (1.0 - 1e-10), &cfg, &params).unwrap();
                let at = spf_by_t3(x, &cfg, &params).unwrap();
                let hi = spf_by_t3(x * (1.0 + 1e-10), &cfg, &params).unwrap();
                assert!((lo - at).abs() < 1e-7 * at, "{model:?} at {x}: {lo} {at}");
                assert!((hi - at).abs() < 1e-7 * at, "{model:?} at {x}: {hi} {at}");
            }
        }
    }

    #[test]
    fn plaw_rejects_non_positive_endpoints() {
        let cfg = config(SpfModel::Plaw {
            omega_ir: 0.4,
            omega_uv: 2.2,
        });
        let err = spf_by_t3(1.0, &cfg, &[0.0, 1.0]).unwrap_err();
        assert!(matches!(err, SpfError::PowerLawMatch { .. }));
        let err = spf_by_t3(1.0, &cfg, &[1.0, -1.0]).unwrap_err();
        assert!(err.is_infeasible_point());
    }

    #[test]
    fn negative_series_modulation_is_infinite() {
        let cfg = config(SpfModel::Fourier {
            basis: SeriesBasis::Alpha,
            nmax: 1,
            constrain: false,
        });
        // E_1 > 0 for every omega > 0, so c_1 = -10 drives the modulation negative.
        assert_eq!(spf_by_t3(5.0, &cfg, &[1.0, -10.0]).unwrap(), f64::INFINITY);

        let cfg = config(SpfModel::Trig {
            basis: SeriesBasis::Alpha,
            nmax: 1,
        });
        assert_eq!(spf_by_t3(5.0, &cfg, &[1.0, 1.0, -10.0]).unwrap(), f64::INFINITY);
        assert!(spf_by_t3(5.0, &cfg, &[1.0, 1.0, 0.1]).unwrap().is_finite());
    }

    #[test]
    fn constrained_fourier_meets_uv_curve_at_upper_bound() {
        let cfg = config(SpfModel::Fourier {
            basis: SeriesBasis::Alpha,
            nmax: 3,
            constrain: true,
        });
        let params = [0.8, 0.05, -0.02];
        let w = cfg.omega_max;
        let spf = spf_by_t3(w, &cfg, &params).unwrap();
        let phi = cfg.uv.value(w).unwrap();
        assert!((spf - phi).abs() < 1e-9 * phi, "{spf} vs {phi}");
    }

    #[test]
    fn uv_lookup_outside_the_grid_is_a_domain_error() {
        let cfg = config(SpfModel::Max);
        let err = spf_by_t3(cfg.omega_max * 2.0, &cfg, &[1.0, 1.0]).unwrap_err();
        assert!(matches!(err, SpfError::Domain { .. }));
    }
}
