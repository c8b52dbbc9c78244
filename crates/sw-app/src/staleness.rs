//! Whether a stored result is older than its model.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::SystemTime;
use tracing::debug;

use crate::error::AppResult;

const RESULT_EXTENSIONS: [&str; 2] = ["csv", "mat"];

/// True when `model` must be simulated again to refresh `result`.
///
/// `result` is a result file or a directory holding exactly one. A missing
/// model cannot be simulated and yields `false`; a missing or ambiguous
/// result yields `true`.
pub fn needs_resimulation(model: &Path, result: &Path) -> AppResult<bool> {
    if !model.exists() {
        debug!(model = %model.display(), "model missing, nothing to resimulate");
        return Ok(false);
    }
    let Some(result_file) = locate_result(result)? else {
        debug!(result = %result.display(), "no result file, resimulating");
        return Ok(true);
    };
    Ok(modified(&result_file)? < modified(model)?)
}

fn modified(path: &Path) -> AppResult<SystemTime> {
    Ok(fs::metadata(path)?.modified()?)
}

fn is_result_file(path: &Path) -> bool {
    path.is_file()
        && path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| RESULT_EXTENSIONS.contains(&ext))
}

fn locate_result(result: &Path) -> AppResult<Option<PathBuf>> {
    if result.is_file() {
        return Ok(Some(result.to_path_buf()));
    }
    if !result.is_dir() {
        return Ok(None);
    }
    let mut found = Vec::new();
    for entry in fs::read_dir(result)? {
        let path = entry?.path();
        if is_result_file(&path) {
            found.push(path);
        }
    }
    Ok(if found.len() == 1 { found.pop() } else { None })
}
