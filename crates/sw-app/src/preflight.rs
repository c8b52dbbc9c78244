//! Loading and checking a model before anything is simulated.
//!
//! Every failure here is fatal for the sweep or single run that asked for
//! it: no simulation can be meaningful without the loaded, checked model.

use std::path::{Path, PathBuf};
use sw_session::{CheckReport, Engine, SimulationOptions, SimulationSession};
use tracing::{info, warn};

use crate::config::CheckPolicy;
use crate::error::{AppError, AppResult};

/// The model and what must be loaded alongside it.
#[derive(Debug, Clone)]
pub struct ModelSource<'a> {
    pub model_path: &'a Path,
    pub model_name: &'a str,
    pub libraries: &'a [PathBuf],
    pub load_standard_library: bool,
    pub check: CheckPolicy,
}

/// Load the standard library, every declared library and the model file,
/// then check the model according to the policy.
///
/// File existence is verified before the engine is asked to load anything.
pub fn load_model<E: Engine>(
    session: &mut SimulationSession<E>,
    source: &ModelSource<'_>,
) -> AppResult<Option<CheckReport>> {
    if !source.model_path.is_file() {
        return Err(AppError::ModelNotFound(source.model_path.to_path_buf()));
    }
    if let Some(missing) = source.libraries.iter().find(|lib| !lib.exists()) {
        return Err(AppError::LibraryNotFound(missing.clone()));
    }

    if source.load_standard_library && !session.load_standard_library()? {
        return Err(AppError::LoadFailed {
            what: "standard library".to_string(),
            detail: session.error_string()?,
        });
    }

    for library in source.libraries {
        if !session.load_file(library)? {
            return Err(AppError::LoadFailed {
                what: format!("library {}", library.display()),
                detail: session.error_string()?,
            });
        }
    }

    if !session.load_file(source.model_path)? {
        return Err(AppError::LoadFailed {
            what: format!("model {}", source.model_path.display()),
            detail: session.error_string()?,
        });
    }
    info!(model = source.model_name, "model loaded");

    if source.check == CheckPolicy::Skip {
        return Ok(None);
    }
    let report = session.check_model(source.model_name)?;
    if !report.success {
        let detail = session.error_string()?;
        if source.check == CheckPolicy::Required {
            return Err(AppError::CheckFailed {
                model: source.model_name.to_string(),
                detail,
            });
        }
        warn!(model = source.model_name, %detail, "model check failed, continuing");
    } else {
        info!(
            model = source.model_name,
            equations = ?report.equation_count,
            variables = ?report.variable_count,
            "model check passed"
        );
    }
    Ok(Some(report))
}

/// Explicit options, else the model's experiment annotation, else defaults.
pub fn resolve_options(
    explicit: Option<&SimulationOptions>,
    model_path: &Path,
) -> AppResult<SimulationOptions> {
    if let Some(options) = explicit {
        options.validate()?;
        return Ok(options.clone());
    }
    match SimulationOptions::from_model_file(model_path)? {
        Some(options) => {
            info!(
                start = options.start_time(),
                stop = options.stop_time(),
                intervals = options.intervals(),
                "simulation options from experiment annotation"
            );
            Ok(options)
        }
        None => {
            warn!("no experiment annotation, using default simulation options");
            Ok(SimulationOptions::default())
        }
    }
}
