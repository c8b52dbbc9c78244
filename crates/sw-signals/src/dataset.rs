//! Dataset read interface.

use std::collections::BTreeMap;

/// Read-only view of one result file.
///
/// Implementations expose the stored signal names, each signal's samples,
/// and the shared time axis if the format has one.
pub trait Dataset {
    fn names(&self) -> Vec<&str>;

    fn data(&self, name: &str) -> Option<&[f64]>;

    fn abscissa(&self) -> Option<&[f64]>;
}

/// Dataset held entirely in memory.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MemoryDataset {
    abscissa: Option<Vec<f64>>,
    signals: BTreeMap<String, Vec<f64>>,
}

impl MemoryDataset {
    /// Dataset with the given time axis and no signals yet.
    pub fn new(time: Vec<f64>) -> Self {
        Self {
            abscissa: Some(time),
            signals: BTreeMap::new(),
        }
    }

    /// Dataset without a time axis.
    pub fn without_axis() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, samples: Vec<f64>) {
        self.signals.insert(name.into(), samples);
    }

    pub fn with_signal(mut self, name: impl Into<String>, samples: Vec<f64>) -> Self {
        self.insert(name, samples);
        self
    }

    /// Constant signal: stored as its start and end samples only.
    pub fn with_constant(self, name: impl Into<String>, value: f64) -> Self {
        self.with_signal(name, vec![value, value])
    }
}

impl Dataset for MemoryDataset {
    fn names(&self) -> Vec<&str> {
        self.signals.keys().map(String::as_str).collect()
    }

    fn data(&self, name: &str) -> Option<&[f64]> {
        self.signals.get(name).map(Vec::as_slice)
    }

    fn abscissa(&self) -> Option<&[f64]> {
        self.abscissa.as_deref()
    }
}
