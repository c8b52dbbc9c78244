//! sw-sweep: parameter-sweep elaboration.
//!
//! Turns an ordered set of per-parameter ranges into the full cross-product
//! of concrete parameter assignments, and renders assignments as engine
//! override strings.

pub mod expand;
mod ordered;
pub mod overrides;
pub mod range;
pub mod spec;

pub use expand::{ParameterAssignment, assignment_at, expand};
pub use overrides::{format_override_value, override_lines, override_string, override_tag};
pub use range::{MAX_RANGE_POINTS, RangeSpec};
pub use spec::{MAX_GRID_RUNS, SweepSpec};

pub type SweepResult<T> = Result<T, SweepError>;

#[derive(thiserror::Error, Debug)]
pub enum SweepError {
    #[error("Range resolves to no values: {range}")]
    EmptyRange { range: RangeSpec },

    #[error("Invalid range: {reason}")]
    InvalidRange { reason: String },

    #[error("Parameter '{name}': {source}")]
    Parameter {
        name: String,
        #[source]
        source: Box<SweepError>,
    },

    #[error("Sweep grid exceeds {limit} runs")]
    GridTooLarge { limit: usize },

    #[error("Duplicate parameter: {name}")]
    DuplicateParameter { name: String },

    #[error("Parameter name must not be empty")]
    EmptyName,

    #[error("Assignment index {index} out of range for {count} runs")]
    IndexOutOfRange { index: usize, count: usize },

    #[error(transparent)]
    Core(#[from] sw_core::SwError),
}
