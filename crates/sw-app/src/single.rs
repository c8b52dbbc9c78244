//! One-off simulation outside a sweep.

use std::fs;
use std::path::{Path, PathBuf};

use sw_session::{
    CheckReport, Engine, SimulationOptions, SimulationSession, log_file_name, tagged_file_name,
};
use sw_sweep::{ParameterAssignment, override_tag};
use tracing::{info, warn};

use crate::config::CheckPolicy;
use crate::error::AppResult;
use crate::preflight::{ModelSource, load_model, resolve_options};

pub struct SingleRunRequest<'a> {
    pub model_path: &'a Path,
    pub model_name: &'a str,
    pub libraries: &'a [PathBuf],
    pub result_dir: &'a Path,
    pub options: Option<&'a SimulationOptions>,
    pub overrides: Option<&'a ParameterAssignment>,
    pub check: CheckPolicy,
}

#[derive(Debug, Clone)]
pub struct SingleRunOutcome {
    pub success: bool,
    /// Result file copied into the result directory
    pub result_file: Option<PathBuf>,
    pub log_file: Option<PathBuf>,
    pub messages: String,
    pub check: Option<CheckReport>,
    pub command: String,
}

/// Load, check, simulate once and stage the result and log.
///
/// Load failures are errors; a simulation that does not complete is an
/// outcome with `success == false`.
pub fn simulate_once<E: Engine>(
    session: &mut SimulationSession<E>,
    request: &SingleRunRequest<'_>,
) -> AppResult<SingleRunOutcome> {
    let source = ModelSource {
        model_path: request.model_path,
        model_name: request.model_name,
        libraries: request.libraries,
        load_standard_library: true,
        check: request.check,
    };
    let check = load_model(session, &source)?;

    let mut options = resolve_options(request.options, request.model_path)?;
    let tag = match request.overrides {
        Some(assignment) => {
            options = options.with_run_overrides(&session.override_parameters(assignment));
            override_tag(assignment)
        }
        None => String::new(),
    };

    fs::create_dir_all(request.result_dir)?;
    let outcome = session.run_simulation(request.model_name, &options)?;

    let log = PathBuf::from(log_file_name(request.model_name));
    let log_file = match tagged_file_name(&log, &tag) {
        Some(name) => session.stage_artifact(&log, &request.result_dir.join(name))?,
        None => None,
    };

    let result_file = match (&outcome.result_file, outcome.success) {
        (Some(file), true) => match tagged_file_name(file, &tag) {
            Some(name) => session.stage_artifact(file, &request.result_dir.join(name))?,
            None => None,
        },
        _ => None,
    };

    let success = outcome.success && result_file.is_some();
    match &result_file {
        Some(path) if success => info!(result = %path.display(), "simulation complete"),
        _ => warn!(model = request.model_name, "simulation did not produce a result"),
    }

    Ok(SingleRunOutcome {
        success,
        result_file,
        log_file,
        messages: outcome.messages,
        check,
        command: outcome.command,
    })
}
