//! Error types.
//!
//! - `EngineError` is the typed failure surface of the analysis engine.
//! - `AppError` is what the `eis` binary reports: a message plus a process exit code.

use thiserror::Error;

/// Failures reported by the impedance analysis engine.
///
/// None of these are fatal to the process; callers decide whether to retry,
/// re-sequence their calls, or report back to the user.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum EngineError {
    /// Malformed or ambiguous input data.
    #[error("parse error: {0}")]
    Parse(String),

    /// An operation needs a spectrum but none has been loaded.
    #[error("no spectrum loaded; load a CSV first")]
    NotLoaded,

    /// State-of-Health was requested before a successful circuit fit.
    #[error("circuit not fitted; fit the circuit first")]
    NotFitted,

    /// Non-convergence, too few samples, or non-finite residuals.
    #[error("fit error: {0}")]
    Fit(String),

    /// A scalar control supplied by the caller was rejected.
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl EngineError {
    pub fn parse(message: impl Into<String>) -> Self {
        Self::Parse(message.into())
    }

    pub fn fit(message: impl Into<String>) -> Self {
        Self::Fit(message.into())
    }

    pub fn invalid(message: impl Into<String>) -> Self {
        Self::InvalidInput(message.into())
    }

    /// Exit code used by the binary when this error ends a run.
    pub fn exit_code(&self) -> u8 {
        match self {
            EngineError::Parse(_) | EngineError::InvalidInput(_) => 2,
            EngineError::NotLoaded | EngineError::NotFitted => 3,
            EngineError::Fit(_) => 4,
        }
    }
}

pub type EngineResult<T> = Result<T, EngineError>;

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

impl From<EngineError> for AppError {
    fn from(err: EngineError) -> Self {
        AppError::new(err.exit_code(), err.to_string())
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

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn engine_errors_map_to_exit_codes() {
        assert_eq!(AppError::from(EngineError::parse("bad")).exit_code(), 2);
        assert_eq!(AppError::from(EngineError::NotLoaded).exit_code(), 3);
        assert_eq!(AppError::from(EngineError::NotFitted).exit_code(), 3);
        assert_eq!(AppError::from(EngineError::fit("diverged")).exit_code(), 4);
    }

    #[test]
    fn app_error_keeps_engine_message() {
        let err = AppError::from(EngineError::parse("could not identify frequency/real/imaginary columns"));
        assert_eq!(
            err.to_string(),
            "parse error: could not identify frequency/real/imaginary columns"
        );
    }
}
