use thiserror::Error;

/// Application-level error carried up to `main`.
///
/// The exit code convention is:
/// - 2: bad configuration or unreadable/invalid input
/// - 4: numeric or runtime failure during the fit
#[derive(Clone)]
pub struct AppError {
    exit_code: u8,
    message: String,
}

impl AppError {
    pub fn new(exit_code: u8, message: impl Into<String>) -> Self {
        Self {
            exit_code,
            message: message.into(),
        }
    }

    pub fn exit_code(&self) -> u8 {
        self.exit_code
    }
}

impl std::fmt::Display for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::fmt::Debug for AppError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppError")
            .field("exit_code", &self.exit_code)
            .field("message", &self.message)
            .finish()
    }
}

impl std::error::Error for AppError {}

/// Errors raised by the numeric core.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum SpfError {
    /// Invalid or incomplete fit configuration. Always fatal before fitting starts.
    #[error("configuration error: {0}")]
    Config(String),

    /// Input data that cannot drive a fit.
    #[error("data error: {0}")]
    Data(String),

    /// The UV interpolant was evaluated outside its fitted domain.
    #[error("omega/T = {omega} is outside the interpolation domain [{min}, {max}]")]
    Domain { omega: f64, min: f64, max: f64 },

    /// The integrand became non-finite during quadrature.
    #[error("integrand overflow at omega/T = {omega}")]
    Overflow { omega: f64 },

    /// The power-law segment cannot be matched to non-positive endpoint values.
    #[error("power-law segment needs positive endpoint values (y1 = {y1}, y2 = {y2})")]
    PowerLawMatch { y1: f64, y2: f64 },

    #[error("interpolation error: {0}")]
    Interpolation(&'static str),

    #[error("i/o error: {0}")]
    Io(String),

    /// One or more fit tasks failed and the run was asked to stop on failure.
    #[error("{count} fit task(s) failed: {detail}")]
    TaskFailed { count: usize, detail: String },
}

impl SpfError {
    /// True for errors that only make one parameter point unusable.
    ///
    /// The objective maps these to an infinitely bad chisq instead of failing.
    pub fn is_infeasible_point(&self) -> bool {
        matches!(self, SpfError::Overflow { .. } | SpfError::PowerLawMatch { .. })
    }
}

impl From<SpfError> for AppError {
    fn from(err: SpfError) -> Self {
        let code = match err {
            SpfError::Config(_) | SpfError::Data(_) | SpfError::Io(_) => 2,
            _ => 4,
        };
        AppError::new(code, err.to_string())
    }
}
