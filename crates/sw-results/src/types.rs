//! Sweep record types.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;
use sw_sweep::{ParameterAssignment, SweepSpec};

pub type SweepId = String;

/// Outcome of one run of a sweep.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunResult {
    /// Position in the expanded grid
    pub index: usize,
    pub assignment: ParameterAssignment,
    /// Whitespace-free override string, embedded in staged file names
    pub override_tag: String,
    pub success: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub result_file: Option<PathBuf>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub log_file: Option<PathBuf>,
    /// Engine messages, or the reason the run failed
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub diagnostic: Option<String>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub metrics: BTreeMap<String, f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fitness: Option<f64>,
}

impl RunResult {
    /// Record for a run that produced no usable result.
    pub fn failed(
        index: usize,
        assignment: ParameterAssignment,
        override_tag: String,
        diagnostic: impl Into<String>,
    ) -> Self {
        Self {
            index,
            assignment,
            override_tag,
            success: false,
            result_file: None,
            log_file: None,
            diagnostic: Some(diagnostic.into()),
            metrics: BTreeMap::new(),
            fitness: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SweepManifest {
    pub sweep_id: SweepId,
    pub model_name: String,
    pub model_path: PathBuf,
    pub timestamp: String,
    pub spec: SweepSpec,
    pub run_count: usize,
    pub succeeded: usize,
    /// Size bound of the best-N set; `None` keeps every scored run
    pub keep: Option<usize>,
    pub tool_version: String,
}

/// Best-N entry as persisted: the run index and its fitness.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BestEntry {
    pub index: usize,
    pub fitness: f64,
}
