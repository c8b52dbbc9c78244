//! Ordered sweep specification.

use serde::{Deserialize, Serialize};

use crate::range::RangeSpec;
use crate::{SweepError, SweepResult};

/// Largest grid a sweep may expand to.
pub const MAX_GRID_RUNS: usize = 1_000_000;

/// Ordered mapping from parameter name to its range.
///
/// Declaration order fixes the enumeration order of the expanded grid: the
/// first parameter is the outermost loop, the last varies fastest.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SweepSpec {
    #[serde(with = "crate::ordered")]
    parameters: Vec<(String, RangeSpec)>,
}

impl SweepSpec {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a parameter. Names must be non-empty and unique.
    pub fn insert(&mut self, name: impl Into<String>, range: RangeSpec) -> SweepResult<()> {
        let name = name.into();
        if name.trim().is_empty() {
            return Err(SweepError::EmptyName);
        }
        if self.get(&name).is_some() {
            return Err(SweepError::DuplicateParameter { name });
        }
        self.parameters.push((name, range));
        Ok(())
    }

    /// Builder form of [`SweepSpec::insert`].
    pub fn with(mut self, name: impl Into<String>, range: RangeSpec) -> SweepResult<Self> {
        self.insert(name, range)?;
        Ok(self)
    }

    pub fn get(&self, name: &str) -> Option<&RangeSpec> {
        self.parameters
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, range)| range)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &RangeSpec)> {
        self.parameters
            .iter()
            .map(|(name, range)| (name.as_str(), range))
    }

    pub fn names(&self) -> Vec<&str> {
        self.parameters.iter().map(|(name, _)| name.as_str()).collect()
    }

    pub fn len(&self) -> usize {
        self.parameters.len()
    }

    pub fn is_empty(&self) -> bool {
        self.parameters.is_empty()
    }

    /// Number of runs the full grid holds (product of per-parameter counts).
    ///
    /// Computed from the range lengths alone; grids above [`MAX_GRID_RUNS`]
    /// are rejected.
    pub fn run_count(&self) -> SweepResult<usize> {
        self.iter().try_fold(1usize, |count, (name, range)| {
            let len = range.len().map_err(|source| SweepError::Parameter {
                name: name.to_string(),
                source: Box::new(source),
            })?;
            count
                .checked_mul(len)
                .filter(|&runs| runs <= MAX_GRID_RUNS)
                .ok_or(SweepError::GridTooLarge {
                    limit: MAX_GRID_RUNS,
                })
        })
    }

    /// Check every name and range without building the grid.
    pub fn validate(&self) -> SweepResult<()> {
        for (name, _) in &self.parameters {
            if name.trim().is_empty() {
                return Err(SweepError::EmptyName);
            }
        }
        self.run_count().map(|_| ())
    }
}

impl TryFrom<Vec<(String, RangeSpec)>> for SweepSpec {
    type Error = SweepError;

    fn try_from(parameters: Vec<(String, RangeSpec)>) -> Result<Self, Self::Error> {
        parameters
            .into_iter()
            .try_fold(SweepSpec::new(), |spec, (name, range)| spec.with(name, range))
    }
}
