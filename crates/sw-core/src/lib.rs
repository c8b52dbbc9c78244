//! sw-core: shared foundation for sweepflow.
//!
//! Contains:
//! - numeric (Real + finiteness check)
//! - error (shared error types)
//! - timing (sweep progress clock and remaining-time estimate)

pub mod error;
pub mod numeric;
pub mod timing;

pub use error::{SwError, SwResult};
pub use numeric::*;
pub use timing::ProgressClock;
