//! Error types for the sw-app service layer.

use std::path::PathBuf;

/// Application error type wrapping the backend crates' errors.
///
/// The pre-flight variants (`ModelNotFound`, `LibraryNotFound`,
/// `LoadFailed`, `CheckFailed`) stop a sweep before any simulation runs.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Failed to read sweep file: {path}")]
    ConfigRead {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Failed to write sweep file: {path}")]
    ConfigWrite {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("Sweep file error: {0}")]
    Config(String),

    #[error("Sweep validation failed: {0}")]
    Validation(String),

    #[error("Model file not found: {}", .0.display())]
    ModelNotFound(PathBuf),

    #[error("Library not found: {}", .0.display())]
    LibraryNotFound(PathBuf),

    #[error("Failed to load {what}: {detail}")]
    LoadFailed { what: String, detail: String },

    #[error("Model check failed for {model}: {detail}")]
    CheckFailed { model: String, detail: String },

    #[error("Sweep runner is {found}, expected {expected}")]
    InvalidState { expected: String, found: String },

    #[error("Sweep error: {0}")]
    Sweep(String),

    #[error("Session error: {0}")]
    Session(String),

    #[error("Signal error: {0}")]
    Signals(String),

    #[error("Results error: {0}")]
    Results(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for sw-app operations.
pub type AppResult<T> = Result<T, AppError>;

impl From<sw_sweep::SweepError> for AppError {
    fn from(err: sw_sweep::SweepError) -> Self {
        AppError::Sweep(err.to_string())
    }
}

impl From<sw_session::SessionError> for AppError {
    fn from(err: sw_session::SessionError) -> Self {
        AppError::Session(err.to_string())
    }
}

impl From<sw_signals::SignalError> for AppError {
    fn from(err: sw_signals::SignalError) -> Self {
        AppError::Signals(err.to_string())
    }
}

impl From<sw_results::ResultsError> for AppError {
    fn from(err: sw_results::ResultsError) -> Self {
        AppError::Results(err.to_string())
    }
}
