//! sw-session: one owned session with the external simulation engine.
//!
//! The engine is driven through textual function-call commands
//! (`loadFile("./pkg.mo")`, `simulate(M, stopTime=1.0)`). Replies come back
//! as text and are parsed into [`EngineReply`] values; free-form diagnostic
//! text is interpreted by the pattern parsers in [`diagnostics`].

pub mod diagnostics;
pub mod engine;
pub mod omc;
pub mod options;
pub mod reply;
pub mod scripted;
pub mod session;

pub use diagnostics::{CheckReport, SUCCESS_MARKER, parse_check_model, simulation_succeeded};
pub use engine::{Engine, EngineReply};
pub use omc::OmcProcess;
pub use options::SimulationOptions;
pub use reply::parse_reply;
pub use scripted::ScriptedEngine;
pub use session::{
    SimulationOutcome, SimulationSession, log_file_name, relative_path, tagged_file_name,
};

use std::path::PathBuf;

pub type SessionResult<T> = Result<T, SessionError>;

#[derive(thiserror::Error, Debug)]
pub enum SessionError {
    #[error("Engine transport failed: {message}")]
    Transport { message: String },

    #[error("Failed to start engine '{program}': {source}")]
    Spawn {
        program: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Malformed engine reply at offset {offset}: {message}")]
    Reply { offset: usize, message: String },

    #[error("Path does not exist: {path}")]
    PathNotFound { path: PathBuf },

    #[error("Path {path} cannot be made relative to {base}")]
    NotRelative { path: PathBuf, base: PathBuf },

    #[error("Invalid simulation options: {reason}")]
    InvalidOptions { reason: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
