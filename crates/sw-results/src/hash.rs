//! Content-based hashing for sweep IDs.

use serde::Serialize;
use sha2::{Digest, Sha256};
use std::path::Path;
use sw_sweep::SweepSpec;

/// Hash of everything that determines a sweep's runs.
///
/// The same model file and class, parameter grid, options and tool version
/// always map to the same id, so re-running a sweep overwrites its previous
/// record.
pub fn compute_sweep_id<O: Serialize>(
    model_path: &Path,
    model_name: &str,
    spec: &SweepSpec,
    options: &O,
    tool_version: &str,
) -> String {
    let mut hasher = Sha256::new();

    hasher.update(model_path.to_string_lossy().as_bytes());
    hasher.update([0u8]);

    hasher.update(model_name.as_bytes());
    hasher.update([0u8]);

    let spec_json = serde_json::to_string(spec).unwrap_or_default();
    hasher.update(spec_json.as_bytes());
    hasher.update([0u8]);

    let options_json = serde_json::to_string(options).unwrap_or_default();
    hasher.update(options_json.as_bytes());
    hasher.update([0u8]);

    hasher.update(tool_version.as_bytes());

    let result = hasher.finalize();
    format!("{:x}", result)
}

#[cfg(test)]
mod tests {
    use super::*;
    use sw_sweep::RangeSpec;

    fn spec(stop: f64) -> SweepSpec {
        SweepSpec::new()
            .with("R", RangeSpec::linear_count(1.0, stop, 3))
            .unwrap()
    }

    #[test]
    fn hash_stability() {
        let a = compute_sweep_id(Path::new("Motor.mo"), "Motor", &spec(2.0), &("dassl", 1e-6), "v1");
        let b = compute_sweep_id(Path::new("Motor.mo"), "Motor", &spec(2.0), &("dassl", 1e-6), "v1");
        assert_eq!(a, b);
        assert_eq!(a.len(), 64);
    }

    #[test]
    fn hash_differs_for_different_inputs() {
        let id = |path: &str, model: &str, stop: f64, method: &str, version: &str| {
            compute_sweep_id(Path::new(path), model, &spec(stop), &(method, 1e-6), version)
        };
        let base = id("Motor.mo", "Motor", 2.0, "dassl", "v1");
        assert_ne!(base, id("Motor.mo", "Motor", 3.0, "dassl", "v1"));
        assert_ne!(base, id("Motor.mo", "Pump", 2.0, "dassl", "v1"));
        assert_ne!(base, id("Motor.mo", "Motor", 2.0, "euler", "v1"));
        assert_ne!(base, id("Motor.mo", "Motor", 2.0, "dassl", "v2"));
    }

    #[test]
    fn same_class_in_different_files_gets_distinct_ids() {
        let a = compute_sweep_id(Path::new("a/Motor.mo"), "Motor", &spec(2.0), &"dassl", "v1");
        let b = compute_sweep_id(Path::new("b/Motor.mo"), "Motor", &spec(2.0), &"dassl", "v1");
        assert_ne!(a, b);
    }
}
