//! Error types.
//!
//! Two layers:
//!
//! - [`FitError`]: what the numeric library reports (shape problems, solver
//!   failures, degenerate geometry). Callers can match on the variant.
//! - [`AppError`]: what the `lsfit` binary reports, carrying a process exit code.

use thiserror::Error;

/// Result alias for fitting operations.
pub type FitResult<T> = std::result::Result<T, FitError>;

/// Errors raised by the lineshape fitting routines.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FitError {
    /// Input series are mismatched, too short, or contain non-finite values.
    #[error("invalid input: {0}")]
    Shape(String),
    /// The nonlinear solver did not reach a solution.
    #[error("fit did not converge after {iterations} iterations: {reason}")]
    Convergence { iterations: usize, reason: String },
    /// The data geometry makes the requested quantity undefined.
    #[error("degenerate geometry: {0}")]
    Degenerate(String),
}

impl FitError {
    pub fn shape(message: impl Into<String>) -> Self {
        FitError::Shape(message.into())
    }

    pub fn degenerate(message: impl Into<String>) -> Self {
        FitError::Degenerate(message.into())
    }

    pub fn convergence(iterations: usize, reason: impl Into<String>) -> Self {
        FitError::Convergence {
            iterations,
            reason: reason.into(),
        }
    }
}

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

impl From<FitError> for AppError {
    fn from(err: FitError) -> Self {
        let exit_code = match err {
            FitError::Shape(_) => 2,
            FitError::Convergence { .. } | FitError::Degenerate(_) => 4,
        };
        AppError::new(exit_code, err.to_string())
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
    fn fit_errors_map_to_exit_codes() {
        let shape: AppError = FitError::shape("x and y differ in length").into();
        assert_eq!(shape.exit_code(), 2);

        let conv: AppError = FitError::convergence(10, "damping exceeded").into();
        assert_eq!(conv.exit_code(), 4);
        assert!(conv.to_string().contains("10 iterations"));

        let degen: AppError = FitError::degenerate("empty left subset").into();
        assert_eq!(degen.exit_code(), 4);
    }
}
