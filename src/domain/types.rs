//! Shared domain types.
//!
//! Configuration values are built once per run and never mutated afterwards; fit tasks
//! only ever see `&FitConfig`. Per-sample results are plain owned values so they can
//! cross the worker pool boundary and be serialized for the run manifest.

use std::path::PathBuf;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::error::SpfError;
use crate::math::{CentralValue, CubicSpline, Estimate};

/// Basis family for the series-modulated models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum SeriesBasis {
    /// `E_n = sin(π n y)`
    Alpha,
    /// `E_n = sin(π y) · sin(π n y)`
    Beta,
}

impl SeriesBasis {
    pub fn label(self) -> &'static str {
        match self {
            SeriesBasis::Alpha => "alpha",
            SeriesBasis::Beta => "beta",
        }
    }
}

/// Which perturbative curve to take from the UV table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
pub enum UvOrder {
    #[serde(rename = "LO")]
    #[value(name = "lo", alias = "LO")]
    Lo,
    #[serde(rename = "NLO")]
    #[value(name = "nlo", alias = "NLO")]
    Nlo,
}

impl UvOrder {
    pub fn label(self) -> &'static str {
        match self {
            UvOrder::Lo => "LO",
            UvOrder::Nlo => "NLO",
        }
    }
}

/// Model identifier as selected on the command line.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "snake_case")]
pub enum ModelName {
    Max,
    Smax,
    Sum,
    Pnorm,
    Line,
    Plaw,
    Step,
    #[value(name = "step_any")]
    StepAny,
    #[value(alias = "2015")]
    Fourier,
    Trig,
}

/// Closed set of spectral-function parametrizations.
///
/// Each variant carries only the hyper-parameters it needs. Fit parameters always
/// start with `kappa`; the rest is model-specific:
///
/// | model             | parameters                          |
/// |-------------------|-------------------------------------|
/// | max/smax/sum/pnorm| `kappa, c_UV`                       |
/// | line/plaw         | `kappa, c_UV`                       |
/// | step              | `kappa`                             |
/// | step_any          | `kappa, omega_break`                |
/// | fourier           | `kappa, c_1 .. c_free`              |
/// | trig              | `kappa, A_UV, c_1 .. c_nmax`        |
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "model", rename_all = "snake_case")]
pub enum SpfModel {
    Max,
    Smax,
    Sum,
    Pnorm { p: f64 },
    Line { omega_ir: f64, omega_uv: f64 },
    Plaw { omega_ir: f64, omega_uv: f64 },
    Step { omega_uv: f64 },
    StepAny,
    /// With `constrain`, the highest coefficient is solved so the SPF meets the UV
    /// curve at the upper integration bound; `nmax - 1` coefficients remain free.
    Fourier {
        basis: SeriesBasis,
        nmax: usize,
        constrain: bool,
    },
    Trig { basis: SeriesBasis, nmax: usize },
}

impl SpfModel {
    pub fn name(&self) -> ModelName {
        match self {
            SpfModel::Max => ModelName::Max,
            SpfModel::Smax => ModelName::Smax,
            SpfModel::Sum => ModelName::Sum,
            SpfModel::Pnorm { .. } => ModelName::Pnorm,
            SpfModel::Line { .. } => ModelName::Line,
            SpfModel::Plaw { .. } => ModelName::Plaw,
            SpfModel::Step { .. } => ModelName::Step,
            SpfModel::StepAny => ModelName::StepAny,
            SpfModel::Fourier { .. } => ModelName::Fourier,
            SpfModel::Trig { .. } => ModelName::Trig,
        }
    }

    /// Short label used in logs and reports.
    pub fn display_name(&self) -> &'static str {
        match self.name() {
            ModelName::Max => "max",
            ModelName::Smax => "smax",
            ModelName::Sum => "sum",
            ModelName::Pnorm => "pnorm",
            ModelName::Line => "line",
            ModelName::Plaw => "plaw",
            ModelName::Step => "step",
            ModelName::StepAny => "step_any",
            ModelName::Fourier => "fourier",
            ModelName::Trig => "trig",
        }
    }

    /// Number of free series coefficients for the series models, zero otherwise.
    pub fn free_coefficients(&self) -> usize {
        match *self {
            SpfModel::Fourier {
                nmax, constrain, ..
            } => nmax - usize::from(constrain),
            SpfModel::Trig { nmax, .. } => nmax,
            _ => 0,
        }
    }

    /// Length of the fit parameter vector.
    pub fn param_count(&self) -> usize {
        match self {
            SpfModel::Max
            | SpfModel::Smax
            | SpfModel::Sum
            | SpfModel::Pnorm { .. }
            | SpfModel::Line { .. }
            | SpfModel::Plaw { .. }
            | SpfModel::StepAny => 2,
            SpfModel::Step { .. } => 1,
            SpfModel::Fourier { .. } => 1 + self.free_coefficients(),
            SpfModel::Trig { .. } => 2 + self.free_coefficients(),
        }
    }

    /// Model part of the output folder name, e.g. `fourier_NLO_s2_alpha_4`.
    pub fn identifier(&self, uv_order: UvOrder) -> String {
        let uv = uv_order.label();
        match *self {
            SpfModel::Fourier {
                basis,
                nmax,
                constrain,
            } => {
                let s = if constrain { "s2" } else { "s1" };
                format!("fourier_{uv}_{s}_{}_{nmax}", basis.label())
            }
            SpfModel::Trig { basis, nmax } => format!("trig_{uv}_{}_{nmax}", basis.label()),
            SpfModel::Pnorm { p } => format!("pnorm{p}_{uv}"),
            SpfModel::Line { omega_ir, omega_uv } => format!("line_wIR{omega_ir}_wUV{omega_uv}_{uv}"),
            SpfModel::Plaw { omega_ir, omega_uv } => format!("plaw_wIR{omega_ir}_wUV{omega_uv}_{uv}"),
            SpfModel::Step { omega_uv } => format!("step_wUV{omega_uv}_{uv}"),
            _ => format!("{}_{uv}", self.display_name()),
        }
    }
}

/// Immutable fit configuration shared by every fit task.
#[derive(Debug, Clone)]
pub struct FitConfig {
    pub model: SpfModel,
    /// UV reference curve `Φ_UV(ω/T)/T³`, interpolated without extrapolation.
    pub uv: CubicSpline,
    /// Lower integration bound, the first UV grid point.
    pub omega_min: f64,
    /// Upper integration bound, the last UV grid point.
    pub omega_max: f64,
    /// Clamp chisq/dof below 1 to exactly 1.
    pub prevent_overfitting: bool,
}

impl FitConfig {
    /// Bind a model to a UV interpolant, taking the integration range from its domain.
    pub fn new(model: SpfModel, uv: CubicSpline, prevent_overfitting: bool) -> Result<Self, SpfError> {
        let omega_min = uv.min_x();
        let omega_max = uv.max_x();
        if omega_min <= 0.0 {
            return Err(SpfError::Config(format!(
                "UV grid must start above omega/T = 0 (first point is {omega_min})"
            )));
        }

        let in_domain = |w: f64| w >= omega_min && w <= omega_max;
        match model {
            SpfModel::Line { omega_ir, omega_uv } | SpfModel::Plaw { omega_ir, omega_uv } => {
                if !(omega_ir > 0.0 && omega_ir < omega_uv) {
                    return Err(SpfError::Config(format!(
                        "need 0 < omega_IR < omega_UV (got {omega_ir}, {omega_uv})"
                    )));
                }
                if !in_domain(omega_uv) {
                    return Err(SpfError::Config(format!(
                        "omega_UV = {omega_uv} is outside the UV grid [{omega_min}, {omega_max}]"
                    )));
                }
            }
            SpfModel::Step { omega_uv } if !in_domain(omega_uv) => {
                return Err(SpfError::Config(format!(
                    "omega_UV = {omega_uv} is outside the UV grid [{omega_min}, {omega_max}]"
                )));
            }
            SpfModel::Pnorm { p } if !(p > 0.0) => {
                return Err(SpfError::Config(format!("pnorm needs p > 0 (got {p})")));
            }
            SpfModel::Fourier { nmax, constrain, .. } if nmax < 1 + usize::from(constrain) => {
                return Err(SpfError::Config(format!(
                    "fourier needs nmax >= {} (got {nmax})",
                    1 + usize::from(constrain)
                )));
            }
            SpfModel::Trig { nmax, .. } if nmax < 1 => {
                return Err(SpfError::Config("trig needs nmax >= 1".to_string()));
            }
            _ => {}
        }

        Ok(Self {
            model,
            uv,
            omega_min,
            omega_max,
            prevent_overfitting,
        })
    }
}

/// How the sample ensemble is obtained.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BootstrapMode {
    /// Input already holds independent bootstrap realizations.
    Bootstrap,
    /// Input holds mean and error; Gaussian samples are drawn from them.
    Mock,
}

impl BootstrapMode {
    /// Central value used when aggregating this mode's ensemble.
    pub fn central_value(self) -> CentralValue {
        match self {
            BootstrapMode::Bootstrap => CentralValue::Median,
            BootstrapMode::Mock => CentralValue::Mean,
        }
    }
}

/// What to do when a fit task fails outright.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Record the sample as poisoned and keep going.
    Poison,
    /// Fail the run after all tasks finished.
    Abort,
}

/// Run-level settings (paths, ensemble size, pool size).
#[derive(Debug, Clone)]
pub struct RunConfig {
    pub input_corr: PathBuf,
    pub mode: BootstrapMode,
    pub uv_table: PathBuf,
    pub uv_order: UvOrder,
    /// Required in mock mode; optional cap in bootstrap mode.
    pub nsamples: Option<usize>,
    pub nproc: usize,
    pub seed: u64,
    pub min_tau: f64,
    pub output_path: PathBuf,
    pub suffix: Option<String>,
    pub failure_policy: FailurePolicy,
}

/// The sample source after filtering and normalization.
#[derive(Debug, Clone)]
pub enum Ensemble {
    /// One row per bootstrap realization, values multiplied by `G_norm`.
    Bootstrap(Vec<Vec<f64>>),
    /// Mean correlator (multiplied by `G_norm`) to draw Gaussian samples around.
    Mock { mean: Vec<f64> },
}

/// Correlator input ready for fitting.
#[derive(Debug, Clone)]
pub struct CorrelatorData {
    /// Separations `τT`, all inside `(0, 0.5)`.
    pub tau: Vec<f64>,
    pub ensemble: Ensemble,
    /// Per-separation fit errors in the same units as the samples.
    pub errors: Vec<f64>,
    /// Central value in `G/G_norm` units, kept for the output table.
    pub norm_mean: Vec<f64>,
    pub norm_err: Vec<f64>,
}

impl CorrelatorData {
    pub fn nsep(&self) -> usize {
        self.tau.len()
    }

    pub fn mode(&self) -> BootstrapMode {
        match self.ensemble {
            Ensemble::Bootstrap(_) => BootstrapMode::Bootstrap,
            Ensemble::Mock { .. } => BootstrapMode::Mock,
        }
    }

    /// Number of stored realizations (`None` in mock mode).
    pub fn available_samples(&self) -> Option<usize> {
        match &self.ensemble {
            Ensemble::Bootstrap(samples) => Some(samples.len()),
            Ensemble::Mock { .. } => None,
        }
    }
}

/// Fit output for one sample.
#[derive(Debug, Clone, PartialEq)]
pub struct FitResult {
    pub params: Vec<f64>,
    /// SPF on the UV grid.
    pub spf: Vec<f64>,
    /// Fitted correlator in `G/G_norm` units.
    pub corr: Vec<f64>,
    pub chisq_dof: f64,
}

impl FitResult {
    /// All-NaN result with the given shape.
    pub fn poisoned(nparam: usize, nomega: usize, nsep: usize) -> Self {
        Self {
            params: vec![f64::NAN; nparam],
            spf: vec![f64::NAN; nomega],
            corr: vec![f64::NAN; nsep],
            chisq_dof: f64::NAN,
        }
    }

    pub fn is_poisoned(&self) -> bool {
        self.chisq_dof.is_nan()
            && self
                .params
                .iter()
                .chain(&self.spf)
                .chain(&self.corr)
                .all(|v| v.is_nan())
    }
}

/// Ensemble summary, one estimate per output position.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateResult {
    pub params: Vec<Estimate>,
    pub spf: Vec<Estimate>,
    pub corr: Vec<Estimate>,
    pub chisq_dof: Estimate,
}

/// A fit task that returned an error or panicked.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SampleFailure {
    pub index: usize,
    pub message: String,
}

impl std::fmt::Display for SampleFailure {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "sample {}: {}", self.index, self.message)
    }
}
