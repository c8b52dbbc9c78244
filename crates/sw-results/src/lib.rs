//! sw-results: sweep run records and their on-disk store.

pub mod hash;
pub mod store;
pub mod types;

pub use hash::compute_sweep_id;
pub use store::SweepStore;
pub use types::*;

pub type ResultsResult<T> = Result<T, ResultsError>;

#[derive(thiserror::Error, Debug)]
pub enum ResultsError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Sweep not found: {sweep_id}")]
    SweepNotFound { sweep_id: String },

    #[error("Invalid path: {message}")]
    InvalidPath { message: String },
}
