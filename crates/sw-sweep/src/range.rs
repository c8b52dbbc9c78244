//! Per-parameter range definitions.
//!
//! A range is written as one of three records:
//!
//! - `{start, stop, increment}`: `start, start+increment, ...` strictly below `stop`
//! - `{start, stop, n}`: `n` evenly spaced values, both endpoints included
//! - `{start, stop, logN}`: `n` values evenly spaced in base-10 exponent,
//!   `10^start ..= 10^stop`

use serde::{Deserialize, Serialize};
use std::fmt;
use sw_core::ensure_finite;

use crate::{SweepError, SweepResult};

/// Fractional part below which a step count is treated as whole.
const STEP_COUNT_SLACK: f64 = 1e-9;

/// Largest number of values a single range may resolve to.
pub const MAX_RANGE_POINTS: usize = 1_000_000;

/// Type of sweep progression for a single parameter.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RangeSpecDef", into = "RangeSpecDef")]
pub enum RangeSpec {
    /// Fixed increment, stop excluded
    LinearStep { start: f64, stop: f64, increment: f64 },
    /// Fixed count, uniformly spaced
    LinearCount { start: f64, stop: f64, n: usize },
    /// Fixed count, logarithmically spaced; bounds are base-10 exponents
    LogCount { start: f64, stop: f64, n: usize },
}

impl RangeSpec {
    pub fn linear_step(start: f64, stop: f64, increment: f64) -> Self {
        Self::LinearStep {
            start,
            stop,
            increment,
        }
    }

    pub fn linear_count(start: f64, stop: f64, n: usize) -> Self {
        Self::LinearCount { start, stop, n }
    }

    pub fn log_count(start: f64, stop: f64, n: usize) -> Self {
        Self::LogCount { start, stop, n }
    }

    pub fn start(&self) -> f64 {
        match *self {
            Self::LinearStep { start, .. }
            | Self::LinearCount { start, .. }
            | Self::LogCount { start, .. } => start,
        }
    }

    pub fn stop(&self) -> f64 {
        match *self {
            Self::LinearStep { stop, .. }
            | Self::LinearCount { stop, .. }
            | Self::LogCount { stop, .. } => stop,
        }
    }

    /// Generate all values of the range, in ascending index order.
    ///
    /// An empty result is an error: every parameter must contribute at
    /// least one value.
    pub fn resolve(&self) -> SweepResult<Vec<f64>> {
        let count = self.len()?;
        Ok(match *self {
            Self::LinearStep {
                start, increment, ..
            } => (0..count).map(|i| start + i as f64 * increment).collect(),
            Self::LinearCount { start, stop, .. } => generate_linear(start, stop, count),
            Self::LogCount { start, stop, .. } => generate_linear(start, stop, count)
                .into_iter()
                .map(|exponent| 10f64.powf(exponent))
                .collect(),
        })
    }

    /// Number of values the range resolves to, computed without building them.
    pub fn len(&self) -> SweepResult<usize> {
        ensure_finite(self.start(), "range start")?;
        ensure_finite(self.stop(), "range stop")?;

        let count = match *self {
            Self::LinearStep {
                start,
                stop,
                increment,
            } => stepped_count(start, stop, increment)?,
            Self::LinearCount { n, .. } | Self::LogCount { n, .. } => n,
        };

        if count == 0 {
            return Err(SweepError::EmptyRange { range: *self });
        }
        if count > MAX_RANGE_POINTS {
            return Err(SweepError::InvalidRange {
                reason: format!("{self} exceeds {MAX_RANGE_POINTS} points"),
            });
        }
        Ok(count)
    }
}

fn stepped_count(start: f64, stop: f64, increment: f64) -> SweepResult<usize> {
    let increment = ensure_finite(increment, "range increment")?;
    if increment == 0.0 {
        return Err(SweepError::InvalidRange {
            reason: "increment must be non-zero".to_string(),
        });
    }

    let span = (stop - start) / increment;
    if span <= 0.0 {
        return Ok(0);
    }
    if !span.is_finite() || span > MAX_RANGE_POINTS as f64 {
        return Err(SweepError::InvalidRange {
            reason: format!("{start} to {stop} by {increment} exceeds {MAX_RANGE_POINTS} points"),
        });
    }

    // Ceil, except when floating error nudged an exact count just above a whole number.
    let whole = span.round();
    Ok(if (span - whole).abs() <= STEP_COUNT_SLACK * whole.max(1.0) {
        whole as usize
    } else {
        span.ceil() as usize
    })
}

fn generate_linear(start: f64, stop: f64, n: usize) -> Vec<f64> {
    match n {
        0 => Vec::new(),
        1 => vec![start],
        _ => {
            let delta = (stop - start) / (n - 1) as f64;
            let mut points: Vec<f64> = (0..n).map(|i| start + i as f64 * delta).collect();
            // Ensure exact endpoint
            points[n - 1] = stop;
            points
        }
    }
}

impl fmt::Display for RangeSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::LinearStep {
                start,
                stop,
                increment,
            } => write!(f, "{start} to {stop} by {increment}"),
            Self::LinearCount { start, stop, n } => write!(f, "{start} to {stop}, {n} points"),
            Self::LogCount { start, stop, n } => {
                write!(f, "1e{start} to 1e{stop}, {n} log points")
            }
        }
    }
}

/// Wire form: one record with exactly one of `increment`, `n`, `logN`.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct RangeSpecDef {
    start: f64,
    stop: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    increment: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    n: Option<usize>,
    #[serde(default, rename = "logN", skip_serializing_if = "Option::is_none")]
    log_n: Option<usize>,
}

impl TryFrom<RangeSpecDef> for RangeSpec {
    type Error = SweepError;

    fn try_from(def: RangeSpecDef) -> Result<Self, Self::Error> {
        let RangeSpecDef {
            start,
            stop,
            increment,
            n,
            log_n,
        } = def;
        match (increment, n, log_n) {
            (Some(increment), None, None) => Ok(Self::linear_step(start, stop, increment)),
            (None, Some(n), None) => Ok(Self::linear_count(start, stop, n)),
            (None, None, Some(n)) => Ok(Self::log_count(start, stop, n)),
            _ => Err(SweepError::InvalidRange {
                reason: "exactly one of increment, n, logN must be given".to_string(),
            }),
        }
    }
}

impl From<RangeSpec> for RangeSpecDef {
    fn from(range: RangeSpec) -> Self {
        let (increment, n, log_n) = match range {
            RangeSpec::LinearStep { increment, .. } => (Some(increment), None, None),
            RangeSpec::LinearCount { n, .. } => (None, Some(n), None),
            RangeSpec::LogCount { n, .. } => (None, None, Some(n)),
        };
        Self {
            start: range.start(),
            stop: range.stop(),
            increment,
            n,
            log_n,
        }
    }
}
