//! sw-signals: read-only access to simulation result datasets.
//!
//! A result dataset is a flat namespace of dotted signal names
//! (`body.frame_a.r_0[1]`) holding sample sequences against one shared
//! time axis. Constant signals keep only their start and end samples.
//! Every lookup here is by string pattern since the model structure that
//! produced the names is not available.

pub mod csv;
pub mod dataset;
pub mod names;
pub mod store;

pub use csv::CsvDataset;
pub use dataset::{Dataset, MemoryDataset};
pub use store::{SignalStore, VectorValue};

pub type SignalResult<T> = Result<T, SignalError>;

#[derive(thiserror::Error, Debug)]
pub enum SignalError {
    #[error("Dataset exposes no time axis")]
    NotAvailable,

    #[error("Time {t} outside result range [{start}, {end}]")]
    OutOfRange { t: f64, start: f64, end: f64 },

    #[error("Signal not found: {name}")]
    NotFound { name: String },

    #[error("Vector '{base}' unresolved, missing: {}", missing.join(", "))]
    UnresolvedVector { base: String, missing: Vec<String> },

    #[error("Signal has no samples: {name}")]
    EmptySignal { name: String },

    #[error("Components of '{base}' have mismatched lengths {lengths:?}")]
    ShapeMismatch { base: String, lengths: Vec<usize> },

    #[error("Result file parse error at line {line}: {message}")]
    Parse { line: usize, message: String },

    #[error("Unsupported result format: {}", path.display())]
    UnsupportedFormat { path: std::path::PathBuf },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
