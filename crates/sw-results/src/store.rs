//! Sweep storage API.
//!
//! Layout under the store root, one directory per sweep id:
//!
//! ```text
//! <root>/<sweep_id>/manifest.json
//! <root>/<sweep_id>/runs.jsonl     one RunResult per line, grid order
//! <root>/<sweep_id>/best.json      best-N entries, best first
//! ```

use crate::types::{BestEntry, RunResult, SweepManifest};
use crate::{ResultsError, ResultsResult};
use std::fs;
use std::path::{Path, PathBuf};

const MANIFEST_FILE: &str = "manifest.json";
const RUNS_FILE: &str = "runs.jsonl";
const BEST_FILE: &str = "best.json";

#[derive(Debug, Clone)]
pub struct SweepStore {
    root_dir: PathBuf,
}

impl SweepStore {
    pub fn new(root_dir: PathBuf) -> ResultsResult<Self> {
        if !root_dir.exists() {
            fs::create_dir_all(&root_dir)?;
        }
        Ok(Self { root_dir })
    }

    /// Store kept beside the staged result files of a sweep.
    pub fn for_result_dir(result_dir: &Path) -> ResultsResult<Self> {
        if result_dir.as_os_str().is_empty() {
            return Err(ResultsError::InvalidPath {
                message: "result directory is empty".to_string(),
            });
        }
        Self::new(result_dir.join(".sweeps"))
    }

    pub fn root_dir(&self) -> &Path {
        &self.root_dir
    }

    fn sweep_dir(&self, sweep_id: &str) -> PathBuf {
        self.root_dir.join(sweep_id)
    }

    pub fn has_sweep(&self, sweep_id: &str) -> bool {
        self.sweep_dir(sweep_id).join(MANIFEST_FILE).exists()
    }

    pub fn save_sweep(
        &self,
        manifest: &SweepManifest,
        runs: &[RunResult],
        best: &[BestEntry],
    ) -> ResultsResult<()> {
        let sweep_dir = self.sweep_dir(&manifest.sweep_id);
        fs::create_dir_all(&sweep_dir)?;

        let manifest_json = serde_json::to_string_pretty(manifest)?;
        fs::write(sweep_dir.join(MANIFEST_FILE), manifest_json)?;

        let mut runs_content = String::new();
        for run in runs {
            runs_content.push_str(&serde_json::to_string(run)?);
            runs_content.push('\n');
        }
        fs::write(sweep_dir.join(RUNS_FILE), runs_content)?;

        let best_json = serde_json::to_string_pretty(best)?;
        fs::write(sweep_dir.join(BEST_FILE), best_json)?;

        Ok(())
    }

    fn existing_file(&self, sweep_id: &str, file: &str) -> ResultsResult<PathBuf> {
        let path = self.sweep_dir(sweep_id).join(file);
        if !path.exists() {
            return Err(ResultsError::SweepNotFound {
                sweep_id: sweep_id.to_string(),
            });
        }
        Ok(path)
    }

    pub fn load_manifest(&self, sweep_id: &str) -> ResultsResult<SweepManifest> {
        let path = self.existing_file(sweep_id, MANIFEST_FILE)?;
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn load_runs(&self, sweep_id: &str) -> ResultsResult<Vec<RunResult>> {
        let path = self.existing_file(sweep_id, RUNS_FILE)?;
        let content = fs::read_to_string(path)?;
        let mut runs = Vec::new();
        for line in content.lines() {
            if !line.trim().is_empty() {
                runs.push(serde_json::from_str(line)?);
            }
        }
        Ok(runs)
    }

    pub fn load_best(&self, sweep_id: &str) -> ResultsResult<Vec<BestEntry>> {
        let path = self.existing_file(sweep_id, BEST_FILE)?;
        let content = fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    /// Stored sweeps, most recent first; `model_name` filters by model.
    pub fn list_sweeps(&self, model_name: Option<&str>) -> ResultsResult<Vec<SweepManifest>> {
        let mut sweeps = Vec::new();

        if !self.root_dir.exists() {
            return Ok(sweeps);
        }

        for entry in fs::read_dir(&self.root_dir)? {
            let entry = entry?;
            if entry.path().is_dir() {
                let sweep_id = entry.file_name().to_string_lossy().to_string();
                if let Ok(manifest) = self.load_manifest(&sweep_id)
                    && model_name.is_none_or(|name| manifest.model_name == name)
                {
                    sweeps.push(manifest);
                }
            }
        }

        sweeps.sort_by(|a, b| b.timestamp.cmp(&a.timestamp));
        Ok(sweeps)
    }

    pub fn delete_sweep(&self, sweep_id: &str) -> ResultsResult<()> {
        let sweep_dir = self.sweep_dir(sweep_id);
        if sweep_dir.exists() {
            fs::remove_dir_all(sweep_dir)?;
        }
        Ok(())
    }
}
