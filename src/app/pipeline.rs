//! Shared fit pipeline.
//!
//! UV curve -> fit config -> correlator ingest -> resampling -> result packer.
//!
//! `spf fit` only adds presentation on top of [`run_fit`]; `spf summary` reuses the
//! aggregation half through [`summarize_run`].

use std::path::{Path, PathBuf};

use chrono::Utc;

use crate::data::{UvProvider, UvTable, read_bootstrap_json, read_mock_table};
use crate::domain::{AggregateResult, BootstrapMode, CorrelatorData, FitConfig, RunConfig, SpfModel};
use crate::error::{AppError, SpfError};
use crate::fit::{FitOptions, ResampleOptions, ResampleOutcome, aggregate, run_resampling};
use crate::io::export::{RunManifest, file_identifier, read_manifest, read_samples, write_run_output};

/// All computed outputs of a single `spf fit` run.
#[derive(Debug, Clone)]
pub struct RunOutput {
    pub config: FitConfig,
    pub data: CorrelatorData,
    pub outcome: ResampleOutcome,
    pub manifest: RunManifest,
    pub output_dir: PathBuf,
}

/// Execute the full pipeline and write the output folder.
pub fn run_fit(run: &RunConfig, model: SpfModel, prevent_overfitting: bool) -> Result<RunOutput, AppError> {
    // 1) UV curve and fit config; fails before any correlator data is touched.
    let curves = UvTable::new(&run.uv_table).curves()?;
    let uv = curves.interpolant(run.uv_order)?;
    let config = FitConfig::new(model, uv, prevent_overfitting)?;
    log::info!(
        "model {} with {} UV curve on omega/T in [{}, {}]",
        model.display_name(),
        run.uv_order.label(),
        config.omega_min,
        config.omega_max
    );

    // 2) Correlator ensemble.
    let data = match run.mode {
        BootstrapMode::Bootstrap => read_bootstrap_json(&run.input_corr, run.min_tau)?,
        BootstrapMode::Mock => read_mock_table(&run.input_corr, run.min_tau)?,
    };
    log::info!("{} separations with tauT >= {}", data.nsep(), run.min_tau);
    let nsamples = resolve_nsamples(run.nsamples, data.available_samples())?;

    // 3) Fit every sample.
    let opts = ResampleOptions {
        nsamples,
        nproc: run.nproc,
        seed: run.seed,
        failure_policy: run.failure_policy,
        fit: FitOptions::default(),
    };
    let outcome = run_resampling(&config, &data, &opts)?;

    // 4) Persist.
    let identifier = file_identifier(&model, run.uv_order, nsamples, run.min_tau, run.suffix.as_deref());
    let manifest = RunManifest {
        tool: concat!("spf ", env!("CARGO_PKG_VERSION")).to_string(),
        created_at: Utc::now(),
        identifier: identifier.clone(),
        model,
        uv_order: run.uv_order,
        uv_coupling: curves.coupling,
        mode: run.mode,
        nsamples,
        nproc: run.nproc,
        seed: run.seed,
        min_tau: run.min_tau,
        prevent_overfitting,
        omega_min: config.omega_min,
        omega_max: config.omega_max,
        poisoned: outcome.poisoned.clone(),
        failures: outcome.failures.clone(),
    };
    let output_dir = write_run_output(&run.output_path.join(&identifier), &config, &data, &outcome, &manifest)?;
    log::info!("wrote {}", output_dir.display());

    Ok(RunOutput {
        config,
        data,
        outcome,
        manifest,
        output_dir,
    })
}

/// Number of samples to fit given the request and the stored ensemble size.
///
/// Mock mode (`available == None`) needs an explicit count. In bootstrap mode the
/// request caps the ensemble and defaults to all of it.
pub fn resolve_nsamples(requested: Option<usize>, available: Option<usize>) -> Result<usize, SpfError> {
    let n = match (requested, available) {
        (None, None) => {
            return Err(SpfError::Config("--nsamples is required with --mock-bootstrap".to_string()));
        }
        (Some(n), None) => n,
        (None, Some(m)) => m,
        (Some(n), Some(m)) => {
            if n < m {
                log::warn!("using the first {n} of {m} bootstrap samples");
            } else if n > m {
                log::warn!("requested {n} samples but the ensemble has {m}; using all of them");
            }
            n.min(m)
        }
    };
    if n == 0 {
        return Err(SpfError::Config("number of samples must be > 0".to_string()));
    }
    Ok(n)
}

/// Re-aggregate the stored records of a finished run.
pub fn summarize_run(dir: &Path) -> Result<(RunManifest, AggregateResult), AppError> {
    let manifest = read_manifest(dir)?;
    let (layout, records) = read_samples(dir)?;
    if records.len() != manifest.nsamples {
        log::warn!(
            "manifest lists {} samples, samples file has {}",
            manifest.nsamples,
            records.len()
        );
    }
    let aggregate = aggregate(&layout, &records, manifest.mode.central_value())?;
    Ok((manifest, aggregate))
}
