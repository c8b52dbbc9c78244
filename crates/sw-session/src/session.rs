//! Owned engine session with a private working directory.

use std::fs;
use std::path::{Component, Path, PathBuf};

use sw_sweep::{ParameterAssignment, override_lines, override_string};
use tempfile::TempDir;
use tracing::{debug, info, warn};

use crate::diagnostics::{CheckReport, parse_check_model, simulation_succeeded};
use crate::engine::{Engine, EngineReply};
use crate::options::{SimulationOptions, quote};
use crate::{SessionError, SessionResult};

const OVERRIDE_FILE: &str = "override.txt";

/// What one `simulate` call produced.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulationOutcome {
    /// Exact command sent to the engine
    pub command: String,
    /// Completion marker present and a result file reported
    pub success: bool,
    pub result_file: Option<PathBuf>,
    pub messages: String,
}

/// A session with the engine.
///
/// The session owns a fresh temporary working directory for its lifetime
/// and points the engine at it on construction. Model loads, simulations
/// and override files all live there; nothing else writes to it.
pub struct SimulationSession<E: Engine> {
    engine: E,
    workdir: TempDir,
}

impl<E: Engine> SimulationSession<E> {
    pub fn new(engine: E) -> SessionResult<Self> {
        let workdir = tempfile::Builder::new().prefix("sweep-session-").tempdir()?;
        let mut session = Self { engine, workdir };
        let dir = engine_path(session.workdir.path());
        let reply = session.send(&format!("cd({})", quote(&dir)))?;
        match reply.as_str() {
            Some(current) if !current.is_empty() => {
                info!(dir = current, "engine working directory set");
                Ok(session)
            }
            _ => Err(SessionError::Transport {
                message: format!("engine refused working directory {dir}"),
            }),
        }
    }

    pub fn working_dir(&self) -> &Path {
        self.workdir.path()
    }

    pub fn engine(&self) -> &E {
        &self.engine
    }

    fn send(&mut self, expression: &str) -> SessionResult<EngineReply> {
        debug!(command = expression, "engine command");
        let reply = self.engine.send(expression)?;
        debug!(?reply, "engine reply");
        Ok(reply)
    }

    pub fn load_standard_library(&mut self) -> SessionResult<bool> {
        self.load_model("Modelica")
    }

    /// Load a library or model by class name from the library path.
    pub fn load_model(&mut self, name: &str) -> SessionResult<bool> {
        Ok(self.send(&format!("loadModel({name})"))?.is_true())
    }

    /// Load a model file; the path is submitted relative to the working directory.
    pub fn load_file(&mut self, path: &Path) -> SessionResult<bool> {
        let target = fs::canonicalize(path).map_err(|_| SessionError::PathNotFound {
            path: path.to_path_buf(),
        })?;
        let base = fs::canonicalize(self.workdir.path())?;
        let relative = relative_path(&target, &base).ok_or_else(|| SessionError::NotRelative {
            path: target.clone(),
            base: base.clone(),
        })?;
        let command = format!("loadFile({})", quote(&format!("./{}", engine_path(&relative))));
        let loaded = self.send(&command)?.is_true();
        if !loaded {
            warn!(path = %path.display(), "engine rejected model file");
        }
        Ok(loaded)
    }

    pub fn check_model(&mut self, name: &str) -> SessionResult<CheckReport> {
        let reply = self.send(&format!("checkModel({name})"))?;
        Ok(parse_check_model(reply.as_str().unwrap_or_default()))
    }

    /// Accumulated engine error text since the last call.
    pub fn error_string(&mut self) -> SessionResult<String> {
        let reply = self.send("getErrorString()")?;
        Ok(reply.as_str().unwrap_or_default().to_string())
    }

    /// Run one simulation.
    ///
    /// A reply without the completion marker, or without a result file, is
    /// a failed run even though the transport succeeded.
    pub fn run_simulation(
        &mut self,
        model: &str,
        options: &SimulationOptions,
    ) -> SessionResult<SimulationOutcome> {
        let command = options.simulate_command(model);
        let reply = self.send(&command)?;

        let messages = match reply.field("messages").and_then(EngineReply::as_str) {
            Some(messages) => messages.to_string(),
            None if reply.is_nothing() => self.error_string()?,
            None => String::new(),
        };
        let result_file = reply
            .field("resultFile")
            .and_then(EngineReply::as_str)
            .filter(|file| !file.is_empty())
            .map(|file| self.workdir.path().join(file));
        let success = simulation_succeeded(&messages) && result_file.is_some();
        if !success {
            warn!(model, "simulation did not complete");
        }

        Ok(SimulationOutcome {
            command,
            success,
            result_file,
            messages,
        })
    }

    pub fn modelica_path(&mut self) -> SessionResult<String> {
        let reply = self.send("getModelicaPath()")?;
        Ok(reply.as_str().unwrap_or_default().to_string())
    }

    pub fn set_modelica_path(&mut self, path: &str) -> SessionResult<bool> {
        Ok(self.send(&format!("setModelicaPath({})", quote(path)))?.is_true())
    }

    /// Append a directory to the library path.
    pub fn add_modelica_path(&mut self, path: &Path) -> SessionResult<bool> {
        let current = self.modelica_path()?;
        let added = engine_path(path);
        let joined = if current.is_empty() {
            added
        } else {
            format!("{current}:{added}")
        };
        self.set_modelica_path(&joined)
    }

    pub fn override_parameters(&self, assignment: &ParameterAssignment) -> String {
        override_string(assignment)
    }

    /// Write `name=value` lines to the working directory's override file.
    pub fn write_override_file(&self, assignment: &ParameterAssignment) -> SessionResult<PathBuf> {
        let path = self.workdir.path().join(OVERRIDE_FILE);
        fs::write(&path, override_lines(assignment))?;
        Ok(path)
    }

    /// Copy a working-directory file to `destination`.
    ///
    /// Relative sources are taken from the working directory. A missing
    /// source yields `Ok(None)`.
    pub fn stage_artifact(&self, source: &Path, destination: &Path) -> SessionResult<Option<PathBuf>> {
        let source = if source.is_absolute() {
            source.to_path_buf()
        } else {
            self.workdir.path().join(source)
        };
        if !source.is_file() {
            warn!(source = %source.display(), "artifact to stage does not exist");
            return Ok(None);
        }
        if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        fs::copy(&source, destination)?;
        debug!(from = %source.display(), to = %destination.display(), "staged artifact");
        Ok(Some(destination.to_path_buf()))
    }
}

/// Name of the engine's run log for `model`.
pub fn log_file_name(model: &str) -> String {
    format!("{model}.log")
}

/// `dir/M_res.csv` with tag `a=1` becomes `M_res_a=1.csv`.
pub fn tagged_file_name(path: &Path, tag: &str) -> Option<String> {
    let stem = path.file_stem()?.to_string_lossy();
    let tagged = if tag.is_empty() {
        stem.to_string()
    } else {
        format!("{stem}_{tag}")
    };
    Some(match path.extension() {
        Some(ext) => format!("{tagged}.{}", ext.to_string_lossy()),
        None => tagged,
    })
}

/// Path of `path` relative to directory `base`, both absolute.
///
/// `None` when the paths share no root or `base` is not normalised.
pub fn relative_path(path: &Path, base: &Path) -> Option<PathBuf> {
    if !path.is_absolute() || !base.is_absolute() {
        return None;
    }
    let path_parts: Vec<Component> = path.components().collect();
    let base_parts: Vec<Component> = base.components().collect();
    let common = path_parts
        .iter()
        .zip(&base_parts)
        .take_while(|(a, b)| a == b)
        .count();
    let shares_root = path_parts
        .iter()
        .zip(&base_parts)
        .take(common)
        .any(|(c, _)| matches!(c, Component::RootDir));
    if !shares_root {
        return None;
    }

    let mut relative = PathBuf::new();
    for part in &base_parts[common..] {
        match part {
            Component::Normal(_) => relative.push(".."),
            _ => return None,
        }
    }
    for part in &path_parts[common..] {
        relative.push(part.as_os_str());
    }
    if relative.as_os_str().is_empty() {
        relative.push(".");
    }
    Some(relative)
}

/// Path as the engine expects it: forward slashes.
fn engine_path(path: &Path) -> String {
    path.to_string_lossy().replace('\\', "/")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn relative_paths() {
        assert_eq!(
            relative_path(Path::new("/home/u/models/a.mo"), Path::new("/tmp/s1")),
            Some(PathBuf::from("../../home/u/models/a.mo"))
        );
        assert_eq!(
            relative_path(Path::new("/tmp/s1/a.mo"), Path::new("/tmp/s1")),
            Some(PathBuf::from("a.mo"))
        );
        assert_eq!(
            relative_path(Path::new("/tmp/s1"), Path::new("/tmp/s1")),
            Some(PathBuf::from("."))
        );
        assert_eq!(relative_path(Path::new("a.mo"), Path::new("/tmp")), None);
        assert_eq!(
            relative_path(Path::new("/a/b"), Path::new("/tmp/../x")),
            None
        );
    }

    #[test]
    fn tagged_names() {
        assert_eq!(
            tagged_file_name(Path::new("/tmp/x/Motor_res.csv"), "R=1.350e+00").as_deref(),
            Some("Motor_res_R=1.350e+00.csv")
        );
        assert_eq!(
            tagged_file_name(Path::new("Motor.log"), "").as_deref(),
            Some("Motor.log")
        );
        assert_eq!(tagged_file_name(Path::new("noext"), "a").as_deref(), Some("noext_a"));
    }

    #[test]
    fn log_name() {
        assert_eq!(log_file_name("Pkg.Motor"), "Pkg.Motor.log");
    }
}
