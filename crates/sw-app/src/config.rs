//! Sweep file loading, saving and validation.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use sw_session::SimulationOptions;
use sw_sweep::SweepSpec;

use crate::error::{AppError, AppResult};
use crate::fitness::MetricSuite;

/// How a failed `checkModel` is treated before simulating.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CheckPolicy {
    /// A failed check stops the sweep
    #[default]
    Required,
    /// A failed check is logged and the sweep continues
    Advisory,
    Skip,
}

/// Everything needed to run one sweep.
///
/// ```yaml
/// model_path: models/Motor.mo
/// model_name: Motor
/// libraries: [lib/Drives.mo]
/// result_dir: out
/// keep: 10
/// parameters:
///   R: {start: 1.0, stop: 2.0, n: 5}
///   Lw: {start: -4, stop: -2, logN: 3}
/// fitness:
///   - {kind: sum_abs, signal: diffVa}
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct SweepConfig {
    pub model_path: PathBuf,
    pub model_name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub libraries: Vec<PathBuf>,
    #[serde(default = "default_result_dir")]
    pub result_dir: PathBuf,
    #[serde(default = "default_true")]
    pub load_standard_library: bool,
    /// Explicit options; otherwise read from the model's experiment annotation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<SimulationOptions>,
    #[serde(default)]
    pub check: CheckPolicy,
    /// Best-N bound; absent keeps every scored run
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub keep: Option<usize>,
    pub parameters: SweepSpec,
    #[serde(default, skip_serializing_if = "MetricSuite::is_empty")]
    pub fitness: MetricSuite,
}

fn default_result_dir() -> PathBuf {
    PathBuf::from(".")
}

fn default_true() -> bool {
    true
}

impl SweepConfig {
    pub fn new(model_path: impl Into<PathBuf>, model_name: impl Into<String>, parameters: SweepSpec) -> Self {
        Self {
            model_path: model_path.into(),
            model_name: model_name.into(),
            libraries: Vec::new(),
            result_dir: default_result_dir(),
            load_standard_library: true,
            options: None,
            check: CheckPolicy::default(),
            keep: None,
            parameters,
            fitness: MetricSuite::default(),
        }
    }

    /// Resolve relative paths against `base` (the sweep file's directory).
    pub fn resolve_paths(&mut self, base: &Path) {
        let resolve = |path: &mut PathBuf| {
            if path.is_relative() {
                *path = base.join(&*path);
            }
        };
        resolve(&mut self.model_path);
        resolve(&mut self.result_dir);
        self.libraries.iter_mut().for_each(resolve);
    }
}

/// Load a sweep from a YAML file; relative paths are taken from the file's directory.
pub fn load_config(path: &Path) -> AppResult<SweepConfig> {
    let content = std::fs::read_to_string(path).map_err(|e| AppError::ConfigRead {
        path: path.to_path_buf(),
        source: e,
    })?;

    let mut config: SweepConfig = serde_yaml::from_str(&content)
        .map_err(|e| AppError::Config(format!("Failed to parse sweep YAML: {}", e)))?;

    if let Some(base) = path.parent() {
        config.resolve_paths(base);
    }
    Ok(config)
}

pub fn save_config(path: &Path, config: &SweepConfig) -> AppResult<()> {
    let content = serde_yaml::to_string(config)
        .map_err(|e| AppError::Config(format!("Failed to serialize sweep: {}", e)))?;

    std::fs::write(path, content).map_err(|e| AppError::ConfigWrite {
        path: path.to_path_buf(),
        source: e,
    })?;

    Ok(())
}

/// Structural checks that need no engine.
pub fn validate_config(config: &SweepConfig) -> AppResult<()> {
    if config.model_name.trim().is_empty() {
        return Err(AppError::Validation("model_name must not be empty".to_string()));
    }
    if config.keep == Some(0) {
        return Err(AppError::Validation("keep must be at least 1".to_string()));
    }
    config.parameters.validate()?;
    if let Some(options) = &config.options {
        options.validate()?;
    }
    config.fitness.validate()?;
    Ok(())
}
