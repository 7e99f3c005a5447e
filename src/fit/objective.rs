//! Chi-square per degree of freedom between data and the forward transform.

use crate::domain::FitConfig;
use crate::error::SpfError;
use crate::fit::transform::target_corr;

/// Floor applied by the overfitting guard.
pub const OVERFIT_FLOOR: f64 = 1.0;

/// `chisq/dof` for one correlator sample.
///
/// Borrowed views only; one `Objective` lives inside one fit task.
#[derive(Debug, Clone, Copy)]
pub struct Objective<'a> {
    config: &'a FitConfig,
    tau: &'a [f64],
    y: &'a [f64],
    err: &'a [f64],
    dof: f64,
}

impl<'a> Objective<'a> {
    pub fn new(config: &'a FitConfig, tau: &'a [f64], y: &'a [f64], err: &'a [f64]) -> Result<Self, SpfError> {
        if y.len() != tau.len() || err.len() != tau.len() {
            return Err(SpfError::Data(format!(
                "separation/value/error lengths differ ({}, {}, {})",
                tau.len(),
                y.len(),
                err.len()
            )));
        }
        let nparam = config.model.param_count();
        if tau.len() <= nparam {
            return Err(SpfError::Config(format!(
                "{} usable separations are not enough for {} fit parameters",
                tau.len(),
                nparam
            )));
        }
        Ok(Self {
            config,
            tau,
            y,
            err,
            dof: (tau.len() - nparam) as f64,
        })
    }

    /// Raw `Σ((y − G)/σ)² / (N − n_param)` without the overfitting guard.
    pub fn raw_chisq_dof(&self, params: &[f64]) -> Result<f64, SpfError> {
        let pred = match target_corr(self.tau, self.config, params) {
            Ok(p) => p,
            Err(e) if e.is_infeasible_point() => {
                log::debug!("rejecting parameter point {params:?}: {e}");
                return Ok(f64::INFINITY);
            }
            Err(e) => return Err(e),
        };
        let chisq: f64 = self
            .y
            .iter()
            .zip(&pred)
            .zip(self.err)
            .map(|((y, g), e)| ((y - g) / e).powi(2))
            .sum();
        Ok(chisq / self.dof)
    }

    /// `chisq/dof`, clamped to [`OVERFIT_FLOOR`] from below when the guard is on.
    ///
    /// Every evaluation is logged at `trace` (`RUST_LOG=spf_fit::fit=trace`).
    pub fn chisq_dof(&self, params: &[f64]) -> Result<f64, SpfError> {
        let raw = self.raw_chisq_dof(params)?;
        let v = if self.config.prevent_overfitting && raw < OVERFIT_FLOOR {
            OVERFIT_FLOOR
        } else {
            raw
        };
        log::trace!("params {params:?} chisq/dof {v}");
        Ok(v)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::SpfModel;
    use crate::test_support::cubic_uv;

    fn exact_data(config: &FitConfig, params: &[f64]) -> (Vec<f64>, Vec<f64>, Vec<f64>) {
        let tau = vec![0.2, 0.25, 0.3, 0.35, 0.4, 0.45];
        let y = target_corr(&tau, config, params).unwrap();
        let err = y.iter().map(|v| 0.01 * v).collect();
        (tau, y, err)
    }

    #[test]
    fn exact_data_has_zero_chisq_without_guard() {
        let cfg = FitConfig::new(SpfModel::Max, cubic_uv(), false).unwrap();
        let (tau, y, err) = exact_data(&cfg, &[2.0, 0.5]);
        let obj = Objective::new(&cfg, &tau, &y, &err).unwrap();
        assert!(obj.chisq_dof(&[2.0, 0.5]).unwrap() < 1e-12);
        assert!(obj.chisq_dof(&[2.5, 0.5]).unwrap() > 1.0);
    }

    #[test]
    fn guard_clamps_to_one() {
        let cfg = FitConfig::new(SpfModel::Max, cubic_uv(), true).unwrap();
        let (tau, y, err) = exact_data(&cfg, &[2.0, 0.5]);
        let obj = Objective::new(&cfg, &tau, &y, &err).unwrap();
        assert_eq!(obj.chisq_dof(&[2.0, 0.5]).unwrap(), 1.0);
        assert!(obj.raw_chisq_dof(&[2.0, 0.5]).unwrap() < 1e-12);
        assert!(obj.chisq_dof(&[3.0, 0.5]).unwrap() > 1.0);
    }

    #[test]
    fn normalised_by_degrees_of_freedom() {
        let cfg = FitConfig::new(SpfModel::Max, cubic_uv(), false).unwrap();
        let (tau, y, err) = exact_data(&cfg, &[2.0, 0.5]);
        // Shift every point by exactly one sigma: chisq = N, dof = N - 2.
        let shifted: Vec<f64> = y.iter().zip(&err).map(|(v, e)| v + e).collect();
        let obj = Objective::new(&cfg, &tau, &shifted, &err).unwrap();
        let v = obj.chisq_dof(&[2.0, 0.5]).unwrap();
        assert!((v - 6.0 / 4.0).abs() < 1e-9, "{v}");
    }

    #[test]
    fn trace_logging_leaves_the_value_unchanged() {
        let _ = env_logger::builder()
            .is_test(true)
            .filter_level(log::LevelFilter::Trace)
            .try_init();
        let cfg = FitConfig::new(SpfModel::Max, cubic_uv(), true).unwrap();
        let (tau, y, err) = exact_data(&cfg, &[2.0, 0.5]);
        let obj = Objective::new(&cfg, &tau, &y, &err).unwrap();
        assert_eq!(obj.chisq_dof(&[2.0, 0.5]).unwrap(), 1.0);
        let raw = obj.raw_chisq_dof(&[3.0, 0.5]).unwrap();
        assert_eq!(obj.chisq_dof(&[3.0, 0.5]).unwrap(), raw);
    }

    #[test]
    fn too_few_separations_is_a_configuration_error() {
        let cfg = FitConfig::new(SpfModel::Max, cubic_uv(), false).unwrap();
        let tau = [0.3, 0.4];
        let err = Objective::new(&cfg, &tau, &[1.0, 1.0], &[0.1, 0.1]).unwrap_err();
        assert!(matches!(err, SpfError::Config(_)));
    }

    #[test]
    fn infeasible_points_score_infinity() {
        let cfg = FitConfig::new(
            SpfModel::Plaw {
                omega_ir: 0.4,
                omega_uv: 2.2,
            },
            cubic_uv(),
            false,
        )
        .unwrap();
        let tau = [0.2, 0.3, 0.4];
        let obj = Objective::new(&cfg, &tau, &[1.0; 3], &[0.1; 3]).unwrap();
        assert_eq!(obj.chisq_dof(&[0.0, 1.0]).unwrap(), f64::INFINITY);
    }
}
