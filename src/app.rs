//! Top-level application orchestration.
//!
//! `src/main.rs` stays tiny; this module is the real main that
//! - parses CLI arguments
//! - turns them into validated `RunConfig` and `SpfModel` values
//! - runs the fit pipeline and prints the report

use clap::Parser;

use crate::cli::{Command, FitArgs, SummaryArgs};
use crate::domain::{BootstrapMode, FailurePolicy, ModelName, RunConfig, SpfModel};
use crate::error::{AppError, SpfError};
use crate::report::{RunSummary, format_run_summary};

pub mod pipeline;

/// Entry point for the `spf` binary.
pub fn run() -> Result<(), AppError> {
    let cli = crate::cli::Cli::parse();

    match cli.command {
        Command::Fit(args) => handle_fit(args),
        Command::Summary(args) => handle_summary(args),
    }
}

fn handle_fit(args: FitArgs) -> Result<(), AppError> {
    let model = spf_model_from_args(&args)?;
    let run = run_config_from_args(&args)?;
    log::info!("input {} ({:?} mode)", run.input_corr.display(), run.mode);

    let out = pipeline::run_fit(&run, model, args.prevent_overfitting)?;

    let summary = RunSummary {
        model: &out.manifest.model,
        uv_order: out.manifest.uv_order,
        nsamples: out.manifest.nsamples,
        poisoned: &out.outcome.poisoned,
        failures: &out.outcome.failures,
        output_dir: Some(out.output_dir.as_path()),
    };
    println!("{}", format_run_summary(&summary, &out.outcome.aggregate));
    Ok(())
}

fn handle_summary(args: SummaryArgs) -> Result<(), AppError> {
    let (manifest, aggregate) = pipeline::summarize_run(&args.dir)?;
    let summary = RunSummary {
        model: &manifest.model,
        uv_order: manifest.uv_order,
        nsamples: manifest.nsamples,
        poisoned: &manifest.poisoned,
        failures: &manifest.failures,
        output_dir: Some(args.dir.as_path()),
    };
    println!("{}", format_run_summary(&summary, &aggregate));
    Ok(())
}

/// Build the model variant, requiring exactly the hyper-parameters it uses.
pub fn spf_model_from_args(args: &FitArgs) -> Result<SpfModel, SpfError> {
    let require = |what: &str| SpfError::Config(format!("model {:?} needs {what}", args.model));

    let model = match args.model {
        ModelName::Max => SpfModel::Max,
        ModelName::Smax => SpfModel::Smax,
        ModelName::Sum => SpfModel::Sum,
        ModelName::Pnorm => SpfModel::Pnorm {
            p: args.p.ok_or_else(|| require("--p"))?,
        },
        ModelName::Line => SpfModel::Line {
            omega_ir: args.omega_ir.ok_or_else(|| require("--omega-ir"))?,
            omega_uv: args.omega_uv,
        },
        ModelName::Plaw => SpfModel::Plaw {
            omega_ir: args.omega_ir.ok_or_else(|| require("--omega-ir"))?,
            omega_uv: args.omega_uv,
        },
        ModelName::Step => SpfModel::Step {
            omega_uv: args.omega_uv,
        },
        ModelName::StepAny => SpfModel::StepAny,
        ModelName::Fourier => SpfModel::Fourier {
            basis: args.mu.ok_or_else(|| require("--mu"))?,
            nmax: args.nmax.ok_or_else(|| require("--nmax"))?,
            constrain: args.constrain,
        },
        ModelName::Trig => SpfModel::Trig {
            basis: args.mu.ok_or_else(|| require("--mu"))?,
            nmax: args.nmax.ok_or_else(|| require("--nmax"))?,
        },
    };

    if args.constrain && !matches!(model, SpfModel::Fourier { .. }) {
        log::warn!("--constrain only applies to the fourier model; ignored");
    }
    Ok(model)
}

pub fn run_config_from_args(args: &FitArgs) -> Result<RunConfig, SpfError> {
    let mode = if args.mock_bootstrap {
        BootstrapMode::Mock
    } else {
        BootstrapMode::Bootstrap
    };
    if mode == BootstrapMode::Mock && args.nsamples.is_none() {
        return Err(SpfError::Config("--nsamples is required with --mock-bootstrap".to_string()));
    }
    if args.nsamples == Some(0) {
        return Err(SpfError::Config("--nsamples must be > 0".to_string()));
    }
    if args.nproc == 0 {
        return Err(SpfError::Config("--nproc must be >= 1".to_string()));
    }
    if !(0.0..0.5).contains(&args.min_tau) {
        return Err(SpfError::Config(format!(
            "--min-tau must be in [0, 0.5) (got {})",
            args.min_tau
        )));
    }

    Ok(RunConfig {
        input_corr: args.input_corr.clone(),
        mode,
        uv_table: args.uv_table.clone(),
        uv_order: args.uv_order,
        nsamples: args.nsamples,
        nproc: args.nproc,
        seed: args.seed,
        min_tau: args.min_tau,
        output_path: args.output_path.clone(),
        suffix: args.suffix.clone(),
        failure_policy: if args.strict {
            FailurePolicy::Abort
        } else {
            FailurePolicy::Poison
        },
    })
}
