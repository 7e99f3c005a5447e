//! Resampling driver.
//!
//! Fits every sample of the ensemble independently on a bounded worker pool and
//! aggregates the flat records into central values with asymmetric errors.
//!
//! - bootstrap mode: the stored realizations are fitted as they are; the central value
//!   is the NaN-aware median
//! - mock mode: Gaussian samples are drawn per separation from `(mean, error)` with a
//!   seeded generator before any task starts; the central value is the NaN-aware mean
//!
//! Tasks share only immutable borrows (`&FitConfig`, the sample rows), so no task can
//! observe another. Results are gathered in sample order, and aggregation runs only
//! after every task has finished.

use std::panic::{AssertUnwindSafe, catch_unwind};

use rand::SeedableRng;
use rand::rngs::StdRng;
use rand_distr::{Distribution, Normal};
use rayon::prelude::*;

use crate::domain::{AggregateResult, CorrelatorData, Ensemble, FailurePolicy, FitConfig, SampleFailure};
use crate::error::SpfError;
use crate::fit::fitter::{FitOptions, fit_sample};
use crate::fit::record::RecordLayout;
use crate::math::{CentralValue, estimate_columns};

/// Knobs for one resampling run.
#[derive(Debug, Clone, Copy)]
pub struct ResampleOptions {
    /// Samples to fit. In bootstrap mode this caps the stored ensemble.
    pub nsamples: usize,
    pub nproc: usize,
    pub seed: u64,
    pub failure_policy: FailurePolicy,
    pub fit: FitOptions,
}

/// Everything the result packer needs.
#[derive(Debug, Clone)]
pub struct ResampleOutcome {
    pub layout: RecordLayout,
    /// One flat record per sample, in sample order.
    pub records: Vec<Vec<f64>>,
    pub aggregate: AggregateResult,
    /// Indices whose fit produced a negative SPF.
    pub poisoned: Vec<usize>,
    pub failures: Vec<SampleFailure>,
}

/// Draw `n` Gaussian correlator samples, independent per separation.
pub fn draw_mock_samples(mean: &[f64], err: &[f64], n: usize, seed: u64) -> Result<Vec<Vec<f64>>, SpfError> {
    let dists = mean
        .iter()
        .zip(err)
        .map(|(m, e)| {
            if !(e.is_finite() && *e > 0.0) {
                return Err(SpfError::Data(format!("mock error must be finite and > 0 (got {e})")));
            }
            Normal::new(*m, *e).map_err(|err| SpfError::Data(format!("cannot draw N({m}, {e}): {err}")))
        })
        .collect::<Result<Vec<_>, _>>()?;

    let mut rng = StdRng::seed_from_u64(seed);
    Ok((0..n)
        .map(|_| dists.iter().map(|d| d.sample(&mut rng)).collect())
        .collect())
}

/// Run `f(i)` for `i in 0..n` on a pool of `nproc` threads, results in index order.
///
/// An `Err` or a panic inside `f` becomes a [`SampleFailure`] for that index; the other
/// tasks are unaffected.
pub fn fan_out<T, F>(n: usize, nproc: usize, f: F) -> Result<Vec<Result<T, SampleFailure>>, SpfError>
where
    T: Send,
    F: Fn(usize) -> Result<T, SpfError> + Sync,
{
    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(nproc.max(1))
        .build()
        .map_err(|e| SpfError::Config(format!("cannot start worker pool: {e}")))?;

    Ok(pool.install(|| (0..n).into_par_iter().map(|i| run_guarded(i, &f)).collect()))
}

fn run_guarded<T, F>(index: usize, f: &F) -> Result<T, SampleFailure>
where
    F: Fn(usize) -> Result<T, SpfError>,
{
    match catch_unwind(AssertUnwindSafe(|| f(index))) {
        Ok(Ok(v)) => Ok(v),
        Ok(Err(e)) => Err(SampleFailure {
            index,
            message: e.to_string(),
        }),
        Err(payload) => {
            let message = if let Some(s) = payload.downcast_ref::<&str>() {
                format!("panicked: {s}")
            } else if let Some(s) = payload.downcast_ref::<String>() {
                format!("panicked: {s}")
            } else {
                "panicked".to_string()
            };
            Err(SampleFailure { index, message })
        }
    }
}

/// Column-wise estimates of a record stack, split into named parts.
pub fn aggregate(
    layout: &RecordLayout,
    records: &[Vec<f64>],
    central: CentralValue,
) -> Result<AggregateResult, SpfError> {
    if records.is_empty() {
        return Err(SpfError::Data("no sample records to aggregate".to_string()));
    }
    layout.unflatten_estimates(&estimate_columns(records, central))
}

/// Fit every sample and aggregate.
pub fn run_resampling(
    config: &FitConfig,
    data: &CorrelatorData,
    opts: &ResampleOptions,
) -> Result<ResampleOutcome, SpfError> {
    if opts.nsamples == 0 {
        return Err(SpfError::Config("number of samples must be > 0".to_string()));
    }

    let drawn;
    let samples: &[Vec<f64>] = match &data.ensemble {
        Ensemble::Bootstrap(rows) => &rows[..opts.nsamples.min(rows.len())],
        Ensemble::Mock { mean } => {
            drawn = draw_mock_samples(mean, &data.errors, opts.nsamples, opts.seed)?;
            &drawn
        }
    };

    let layout = RecordLayout::new(config.model.param_count(), config.uv.x().len(), data.nsep());
    log::info!(
        "fitting {} samples on {} worker(s) (record length {})",
        samples.len(),
        opts.nproc.max(1),
        layout.len()
    );

    let outcomes = fan_out(samples.len(), opts.nproc, |i| {
        let r = fit_sample(config, &data.tau, &samples[i], &data.errors, &opts.fit)?;
        log::debug!("sample {i} done: params {:?}, chisq/dof {:.4}", r.params, r.chisq_dof);
        layout.flatten(&r)
    })?;

    let mut records = Vec::with_capacity(outcomes.len());
    let mut poisoned = Vec::new();
    let mut failures = Vec::new();
    for (i, outcome) in outcomes.into_iter().enumerate() {
        match outcome {
            Ok(row) => {
                if row.iter().all(|v| v.is_nan()) {
                    poisoned.push(i);
                }
                records.push(row);
            }
            Err(failure) => {
                log::error!("fit task failed for {failure}");
                records.push(vec![f64::NAN; layout.len()]);
                failures.push(failure);
            }
        }
    }

    if !poisoned.is_empty() {
        log::warn!("{} of {} samples poisoned: {poisoned:?}", poisoned.len(), records.len());
    }
    if !failures.is_empty() && opts.failure_policy == FailurePolicy::Abort {
        let detail = failures
            .iter()
            .map(|f| f.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        return Err(SpfError::TaskFailed {
            count: failures.len(),
            detail,
        });
    }

    let aggregate = aggregate(&layout, &records, data.mode().central_value())?;
    Ok(ResampleOutcome {
        layout,
        records,
        aggregate,
        poisoned,
        failures,
    })
}
