//! Single-sample fit.
//!
//! For one correlator realization:
//! - minimize chisq/dof from the model's initial guess (`kappa >= 0`, rest free)
//! - evaluate the SPF on the UV grid and the fitted correlator (in `G/G_norm` units)
//! - poison the whole result if the SPF is negative anywhere on the grid
//!
//! Domain errors raised inside the objective abort the fit; they are not a property
//! of the parameter point.

use std::cell::RefCell;

use crate::domain::{FitConfig, FitResult, SpfModel};
use crate::error::SpfError;
use crate::fit::objective::Objective;
use crate::fit::transform::target_corr;
use crate::math::{Bound, MinimizerOptions, Termination, gnorm, minimize_bounded};
use crate::models::{initial_guess, spf_on_grid};

/// Fitting options that affect each per-sample minimization.
#[derive(Debug, Clone, Copy, Default)]
pub struct FitOptions {
    pub minimizer: MinimizerOptions,
}

/// Fit one correlator sample.
///
/// `y` and `err` are in `G` units (already multiplied by `G_norm`).
pub fn fit_sample(
    config: &FitConfig,
    tau: &[f64],
    y: &[f64],
    err: &[f64],
    opts: &FitOptions,
) -> Result<FitResult, SpfError> {
    let objective = Objective::new(config, tau, y, err)?;

    let x0 = initial_guess(&config.model);
    let mut bounds = vec![Bound::FREE; x0.len()];
    bounds[0] = Bound::NON_NEGATIVE;

    let fatal: RefCell<Option<SpfError>> = RefCell::new(None);
    let minimum = minimize_bounded(
        |x| {
            if fatal.borrow().is_some() {
                return f64::NAN;
            }
            match objective.chisq_dof(x) {
                Ok(v) => v,
                Err(e) => {
                    *fatal.borrow_mut() = Some(e);
                    f64::NAN
                }
            }
        },
        &x0,
        &bounds,
        &opts.minimizer,
    );
    if let Some(e) = fatal.into_inner() {
        return Err(e);
    }
    if minimum.termination == Termination::InfeasibleStart {
        return Err(SpfError::Data(format!(
            "objective is not finite at the initial guess {x0:?}"
        )));
    }
    if !minimum.converged() {
        log::debug!(
            "minimizer stopped with {:?} after {} iterations (chisq/dof {:.4})",
            minimum.termination,
            minimum.iterations,
            minimum.f
        );
    }

    let mut params = minimum.x;
    let grid = config.uv.x();
    let spf = spf_on_grid(grid, config, &params)?;

    let nparam = params.len();
    if spf.iter().any(|v| *v < 0.0) {
        log::warn!("negative SPF for parameters {params:?}; sample poisoned");
        return Ok(FitResult::poisoned(nparam, grid.len(), tau.len()));
    }

    // kappa enters the fourier model squared, so its sign is not determined by the fit.
    if matches!(config.model, SpfModel::Fourier { .. }) && params[0] < 0.0 {
        params[0] = params[0].abs();
    }

    let corr = target_corr(tau, config, &params)?
        .into_iter()
        .zip(tau)
        .map(|(g, t)| g / gnorm(*t))
        .collect();
    let chisq_dof = objective.chisq_dof(&params)?;

    Ok(FitResult {
        params,
        spf,
        corr,
        chisq_dof,
    })
}
