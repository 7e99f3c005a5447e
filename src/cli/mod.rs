//! Command-line parsing for the spectral function fitter.
//!
//! Argument parsing and command dispatch stay separate from the numeric code; the
//! conversion into validated config values lives in [`crate::app`].

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};

use crate::domain::{ModelName, SeriesBasis, UvOrder};

/// Top-level CLI.
#[derive(Debug, Parser)]
#[command(
    name = "spf",
    version,
    about = "Spectral function reconstruction from Euclidean correlators"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

/// CLI subcommands.
#[derive(Debug, Subcommand)]
pub enum Command {
    /// Fit a spectral function model to every sample of a correlator ensemble.
    Fit(FitArgs),
    /// Re-aggregate and print the parameters of a finished run.
    Summary(SummaryArgs),
}

/// Options for `spf fit`.
#[derive(Debug, Args, Clone)]
pub struct FitArgs {
    /// Correlator input: JSON bootstrap ensemble, or a `tauT G err` table with
    /// `--mock-bootstrap`.
    #[arg(long, value_name = "PATH")]
    pub input_corr: PathBuf,

    /// Treat the input as mean and error and draw Gaussian samples from it.
    #[arg(long)]
    pub mock_bootstrap: bool,

    /// Spectral function model.
    #[arg(long, value_enum)]
    pub model: ModelName,

    /// UV table with columns `omega/T  LO/T^3  NLO/T^3`.
    #[arg(long, value_name = "PATH")]
    pub uv_table: PathBuf,

    /// Perturbative order of the UV curve.
    #[arg(long, value_enum, default_value_t = UvOrder::Nlo)]
    pub uv_order: UvOrder,

    /// Series basis (fourier, trig).
    #[arg(long, value_enum)]
    pub mu: Option<SeriesBasis>,

    /// Number of series coefficients (fourier, trig).
    #[arg(long)]
    pub nmax: Option<usize>,

    /// Match the fourier series to the UV curve at the upper integration bound.
    #[arg(long)]
    pub constrain: bool,

    /// IR matching point (line, plaw).
    #[arg(long, value_name = "OMEGA_BY_T")]
    pub omega_ir: Option<f64>,

    /// UV matching point (line, plaw, step).
    #[arg(long, value_name = "OMEGA_BY_T", default_value_t = 2.2)]
    pub omega_uv: f64,

    /// Exponent of the p-norm model.
    #[arg(long)]
    pub p: Option<f64>,

    /// Clamp chisq/dof below 1 to exactly 1.
    #[arg(long)]
    pub prevent_overfitting: bool,

    /// Samples to fit. Required with `--mock-bootstrap`; otherwise caps the ensemble.
    #[arg(long)]
    pub nsamples: Option<usize>,

    /// Worker threads.
    #[arg(long, env = "SPF_NPROC", default_value_t = 1)]
    pub nproc: usize,

    /// Seed for mock sample generation.
    #[arg(long, env = "SPF_SEED", default_value_t = 0)]
    pub seed: u64,

    /// Drop separations below this tauT.
    #[arg(long, default_value_t = 0.0)]
    pub min_tau: f64,

    /// Parent folder of the run output.
    #[arg(long, value_name = "DIR")]
    pub output_path: PathBuf,

    /// Suffix appended to the output folder name.
    #[arg(long = "add-suffix")]
    pub suffix: Option<String>,

    /// Fail the run if any fit task fails instead of poisoning that sample.
    #[arg(long)]
    pub strict: bool,
}

/// Options for `spf summary`.
#[derive(Debug, Args, Clone)]
pub struct SummaryArgs {
    /// Output folder written by `spf fit`.
    #[arg(long, value_name = "DIR")]
    pub dir: PathBuf,
}
