//! Engine backed by the `omc` executable.
//!
//! Each command runs as a fresh `omc` process on a generated `.mos`
//! script, with replayed commands silenced and the requested one echoed.
//! State-changing commands that succeeded earlier (`cd`,
//! `loadModel`, `loadFile`, `setModelicaPath`) are replayed at the top of
//! every script, so the sequence behaves like one long-lived session.
//!
//! Engine error text only lives inside the process that produced it, so
//! every script reads `getErrorString()` right after its command. The text
//! is buffered here and handed out when the session asks for
//! `getErrorString()`.

use std::fs;
use std::path::{Path, PathBuf};
use std::process::Command;

use tempfile::TempDir;
use tracing::debug;
use uuid::Uuid;

use crate::engine::{Engine, EngineReply};
use crate::reply::parse_reply;
use crate::{SessionError, SessionResult};

const REPLY_MARKER: &str = "@@sweep-reply@@";
const ERRORS_MARKER: &str = "@@sweep-errors@@";
const ERROR_STRING: &str = "getErrorString()";
const REPLAYED: [&str; 4] = ["cd(", "loadModel(", "loadFile(", "setModelicaPath("];

pub struct OmcProcess {
    program: PathBuf,
    preamble: Vec<String>,
    pending_errors: String,
    scripts: TempDir,
}

impl OmcProcess {
    /// Engine using `omc` from `PATH`.
    pub fn new() -> SessionResult<Self> {
        Self::with_program("omc")
    }

    pub fn with_program(program: impl AsRef<Path>) -> SessionResult<Self> {
        let scripts = tempfile::Builder::new().prefix("sweep-omc-").tempdir()?;
        Ok(Self {
            program: program.as_ref().to_path_buf(),
            preamble: Vec::new(),
            pending_errors: String::new(),
            scripts,
        })
    }

    pub fn program(&self) -> &Path {
        &self.program
    }

    fn script_for(&self, expression: &str) -> String {
        let mut script = String::new();
        for line in &self.preamble {
            script.push_str(line);
            script.push_str(";\n");
        }
        // Drop messages raised while replaying.
        script.push_str(&format!("{ERROR_STRING};\n"));
        script.push_str(&format!("print(\"{REPLY_MARKER}\\n\");\n"));
        // No trailing semicolon: it would suppress the echoed result.
        script.push_str(expression);
        script.push('\n');
        script.push_str(&format!("print(\"{ERRORS_MARKER}\\n\");\n"));
        script.push_str(ERROR_STRING);
        script.push('\n');
        script
    }
}

/// Split script output into the command's reply and its error text.
fn split_output(stdout: &str) -> SessionResult<(EngineReply, String)> {
    let missing = |marker: &str| SessionError::Transport {
        message: format!("engine output is missing the {marker} marker"),
    };
    let (_, after_reply) = stdout
        .rsplit_once(REPLY_MARKER)
        .ok_or_else(|| missing("reply"))?;
    let (reply_text, error_text) = after_reply
        .rsplit_once(ERRORS_MARKER)
        .ok_or_else(|| missing("errors"))?;
    let reply = parse_reply(reply_text)?;
    let errors = parse_reply(error_text)?
        .as_str()
        .unwrap_or_default()
        .to_string();
    Ok((reply, errors))
}

impl Engine for OmcProcess {
    fn send(&mut self, expression: &str) -> SessionResult<EngineReply> {
        if expression.trim() == ERROR_STRING {
            return Ok(EngineReply::Str(std::mem::take(&mut self.pending_errors)));
        }

        let script_path = self
            .scripts
            .path()
            .join(format!("command-{}.mos", Uuid::new_v4()));
        fs::write(&script_path, self.script_for(expression))?;

        let output = Command::new(&self.program)
            .arg(&script_path)
            .output()
            .map_err(|source| SessionError::Spawn {
                program: self.program.clone(),
                source,
            })?;
        // Best effort; the directory is removed with the engine anyway.
        let _ = fs::remove_file(&script_path);

        if !output.status.success() {
            return Err(SessionError::Transport {
                message: format!(
                    "{} exited with {}: {}",
                    self.program.display(),
                    output.status,
                    String::from_utf8_lossy(&output.stderr).trim()
                ),
            });
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let (reply, errors) = split_output(&stdout)?;
        self.pending_errors.push_str(&errors);
        debug!(expression, "omc round-trip complete");

        let state_changing = REPLAYED.iter().any(|prefix| expression.starts_with(prefix));
        let accepted = match &reply {
            EngineReply::Bool(ok) => *ok,
            EngineReply::Str(dir) => !dir.is_empty(),
            _ => false,
        };
        if state_changing && accepted {
            self.preamble.push(expression.to_string());
        }
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn script_replays_preamble_before_marker() {
        let mut omc = OmcProcess::with_program("omc").unwrap();
        omc.preamble.push("cd(\"/tmp/s\")".to_string());
        omc.preamble.push("loadModel(Modelica)".to_string());
        let script = omc.script_for("checkModel(M)");
        assert_eq!(
            script,
            "cd(\"/tmp/s\");\nloadModel(Modelica);\ngetErrorString();\n\
print(\"@@sweep-reply@@\\n\");\ncheckModel(M)\n\
print(\"@@sweep-errors@@\\n\");\ngetErrorString()\n"
        );
    }

    #[test]
    fn output_carries_reply_and_errors_of_same_process() {
        let stdout = "\"/tmp/s\"\ntrue\n@@sweep-reply@@\nfalse\n@@sweep-errors@@\n\
\"Error: Failed to load package Drives\"\n";
        let (reply, errors) = split_output(stdout).unwrap();
        assert_eq!(reply, EngineReply::Bool(false));
        assert_eq!(errors, "Error: Failed to load package Drives");

        assert!(matches!(
            split_output("true\n@@sweep-reply@@\ntrue\n"),
            Err(SessionError::Transport { .. })
        ));
    }

    #[test]
    fn error_string_is_served_from_buffer() {
        let mut omc = OmcProcess::with_program("/nonexistent/omc-binary").unwrap();
        omc.pending_errors.push_str("Error: Variable R not found");
        assert_eq!(
            omc.send("getErrorString()").unwrap(),
            EngineReply::Str("Error: Variable R not found".to_string())
        );
        assert_eq!(
            omc.send("getErrorString()").unwrap(),
            EngineReply::Str(String::new())
        );
    }

    #[test]
    fn missing_program_is_spawn_error() {
        let mut omc = OmcProcess::with_program("/nonexistent/omc-binary").unwrap();
        assert!(matches!(
            omc.send("getVersion()"),
            Err(SessionError::Spawn { .. })
        ));
    }
}
