//! Shared application service layer for parameter sweeps.
//!
//! Ties the sweep grid, the engine session, result reading and scoring
//! together behind one interface for the CLI: sweep files, the sweep
//! runner, single simulations and result staleness checks.

pub mod best;
pub mod config;
pub mod error;
pub mod fitness;
pub mod preflight;
pub mod progress;
pub mod runner;
pub mod single;
pub mod staleness;

pub use best::BestSet;
pub use config::{CheckPolicy, SweepConfig, load_config, save_config, validate_config};
pub use error::{AppError, AppResult};
pub use fitness::{Evaluation, Fitness, MetricDef, MetricKind, MetricSuite};
pub use preflight::{ModelSource, load_model, resolve_options};
pub use progress::{SweepProgressEvent, SweepStage};
pub use runner::{SweepOutcome, SweepRunner, SweepState, TOOL_VERSION};
pub use single::{SingleRunOutcome, SingleRunRequest, simulate_once};
pub use staleness::needs_resimulation;
