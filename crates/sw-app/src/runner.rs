//! Sweep execution.
//!
//! A runner owns one [`SimulationSession`] and walks a fixed state machine:
//! `Idle -> LoadingModel -> Ready -> Running(0..n) -> Done`. Pre-flight
//! failures in [`SweepRunner::prepare`] are returned as errors before any
//! simulation is issued; a failing run inside the loop is recorded and the
//! sweep moves on.

use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use sw_core::ProgressClock;
use sw_results::{
    BestEntry, RunResult, SweepManifest, SweepStore, compute_sweep_id,
};
use sw_session::{
    CheckReport, Engine, SimulationOptions, SimulationSession, log_file_name, tagged_file_name,
};
use sw_signals::SignalStore;
use sw_sweep::{ParameterAssignment, expand, override_tag};
use tracing::{info, warn};

use crate::best::BestSet;
use crate::config::{SweepConfig, validate_config};
use crate::error::{AppError, AppResult};
use crate::fitness::Fitness;
use crate::preflight::{ModelSource, load_model, resolve_options};
use crate::progress::{SweepProgressEvent, SweepStage};

pub const TOOL_VERSION: &str = env!("CARGO_PKG_VERSION");

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SweepState {
    Idle,
    LoadingModel,
    Ready,
    Running(usize),
    Done,
}

impl fmt::Display for SweepState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Idle => write!(f, "idle"),
            Self::LoadingModel => write!(f, "loading model"),
            Self::Ready => write!(f, "ready"),
            Self::Running(index) => write!(f, "running #{index}"),
            Self::Done => write!(f, "done"),
        }
    }
}

/// Every run of a finished sweep plus the retained best entries.
#[derive(Debug, Clone)]
pub struct SweepOutcome {
    pub manifest: SweepManifest,
    /// One record per grid point, in grid order
    pub runs: Vec<RunResult>,
    /// Best first
    pub best: Vec<BestEntry>,
}

impl SweepOutcome {
    /// Records of the retained runs, best first.
    pub fn best_runs(&self) -> Vec<&RunResult> {
        self.best
            .iter()
            .filter_map(|entry| self.runs.get(entry.index))
            .collect()
    }
}

pub struct SweepRunner<E: Engine> {
    session: SimulationSession<E>,
    config: SweepConfig,
    state: SweepState,
    options: Option<SimulationOptions>,
    assignments: Vec<ParameterAssignment>,
    check: Option<CheckReport>,
    persist: bool,
}

fn emit_progress(
    progress_cb: &mut Option<&mut dyn FnMut(SweepProgressEvent)>,
    event: SweepProgressEvent,
) {
    if let Some(cb) = progress_cb.as_deref_mut() {
        cb(event);
    }
}

impl<E: Engine> SweepRunner<E> {
    pub fn new(session: SimulationSession<E>, config: SweepConfig) -> Self {
        Self {
            session,
            config,
            state: SweepState::Idle,
            options: None,
            assignments: Vec::new(),
            check: None,
            persist: true,
        }
    }

    /// Do not write the sweep record under the result directory.
    pub fn without_persistence(mut self) -> Self {
        self.persist = false;
        self
    }

    pub fn state(&self) -> SweepState {
        self.state
    }

    pub fn config(&self) -> &SweepConfig {
        &self.config
    }

    pub fn session(&self) -> &SimulationSession<E> {
        &self.session
    }

    /// Grid points, available once prepared.
    pub fn assignments(&self) -> &[ParameterAssignment] {
        &self.assignments
    }

    pub fn options(&self) -> Option<&SimulationOptions> {
        self.options.as_ref()
    }

    pub fn check_report(&self) -> Option<&CheckReport> {
        self.check.as_ref()
    }

    fn expect_state(&self, expected: SweepState) -> AppResult<()> {
        if self.state != expected {
            return Err(AppError::InvalidState {
                expected: expected.to_string(),
                found: self.state.to_string(),
            });
        }
        Ok(())
    }

    /// Validate the sweep, expand the grid, load and check the model, and
    /// settle the simulation options.
    ///
    /// Any error here is fatal: the runner returns to `Idle` and no
    /// simulation has been issued.
    pub fn prepare(&mut self) -> AppResult<()> {
        self.prepare_with_progress(None)
    }

    pub fn prepare_with_progress(
        &mut self,
        mut progress_cb: Option<&mut dyn FnMut(SweepProgressEvent)>,
    ) -> AppResult<()> {
        self.expect_state(SweepState::Idle)?;
        self.state = SweepState::LoadingModel;
        match self.load(&mut progress_cb) {
            Ok(()) => {
                self.state = SweepState::Ready;
                Ok(())
            }
            Err(err) => {
                self.state = SweepState::Idle;
                Err(err)
            }
        }
    }

    fn load(&mut self, progress_cb: &mut Option<&mut dyn FnMut(SweepProgressEvent)>) -> AppResult<()> {
        validate_config(&self.config)?;
        let assignments = expand(&self.config.parameters)?;
        let total = assignments.len();

        emit_progress(
            progress_cb,
            SweepProgressEvent::stage(
                SweepStage::LoadingModel,
                total,
                0.0,
                Some(self.config.model_path.display().to_string()),
            ),
        );
        let source = ModelSource {
            model_path: &self.config.model_path,
            model_name: &self.config.model_name,
            libraries: &self.config.libraries,
            load_standard_library: self.config.load_standard_library,
            check: self.config.check,
        };
        self.check = load_model(&mut self.session, &source)?;
        emit_progress(
            progress_cb,
            SweepProgressEvent::stage(SweepStage::CheckingModel, total, 0.0, None),
        );

        self.options = Some(resolve_options(
            self.config.options.as_ref(),
            &self.config.model_path,
        )?);
        fs::create_dir_all(&self.config.result_dir)?;
        self.assignments = assignments;
        info!(runs = total, model = %self.config.model_name, "sweep ready");
        Ok(())
    }

    pub fn run(&mut self, fitness: Option<&dyn Fitness>) -> AppResult<SweepOutcome> {
        self.run_with_progress(fitness, None)
    }

    /// Simulate every grid point in order, score successful runs and keep
    /// the best. Per-run failures are recorded, never returned as errors.
    pub fn run_with_progress(
        &mut self,
        fitness: Option<&dyn Fitness>,
        mut progress_cb: Option<&mut dyn FnMut(SweepProgressEvent)>,
    ) -> AppResult<SweepOutcome> {
        self.expect_state(SweepState::Ready)?;
        let Some(options) = self.options.clone() else {
            return Err(AppError::InvalidState {
                expected: "prepared options".to_string(),
                found: self.state.to_string(),
            });
        };

        let total = self.assignments.len();
        let mut clock = ProgressClock::start(total);
        let mut best = BestSet::new(self.config.keep);
        let mut runs = Vec::with_capacity(total);
        let mut file_tags = HashSet::new();

        for index in 0..total {
            self.state = SweepState::Running(index);
            let assignment = self.assignments[index].clone();
            // Grid points closer than the rendered precision share a tag.
            let tag = override_tag(&assignment);
            let file_tag = if file_tags.contains(&tag) {
                format!("{tag}_run{index}")
            } else {
                tag
            };
            file_tags.insert(file_tag.clone());
            let run = self.run_one(index, assignment, &file_tag, &options, fitness);

            if run.success
                && let Some(value) = run.fitness
            {
                best.offer(index, value);
            }

            clock.tick();
            let status = clock.status_line();
            match &run.result_file {
                Some(path) if run.success => info!("{status} result path: {}", path.display()),
                _ => warn!("{status} run {} failed ({})", index, run.override_tag),
            }
            emit_progress(
                &mut progress_cb,
                SweepProgressEvent {
                    stage: SweepStage::Simulating,
                    completed: clock.completed(),
                    total,
                    elapsed_wall_s: clock.elapsed_s(),
                    remaining_s: Some(clock.remaining_s()),
                    message: Some(run.override_tag.clone()),
                },
            );
            runs.push(run);
        }
        self.state = SweepState::Done;

        let manifest = SweepManifest {
            sweep_id: compute_sweep_id(
                &self.config.model_path,
                &self.config.model_name,
                &self.config.parameters,
                &options,
                TOOL_VERSION,
            ),
            model_name: self.config.model_name.clone(),
            model_path: self.config.model_path.clone(),
            timestamp: chrono::Utc::now().to_rfc3339(),
            spec: self.config.parameters.clone(),
            run_count: runs.len(),
            succeeded: runs.iter().filter(|run| run.success).count(),
            keep: self.config.keep,
            tool_version: TOOL_VERSION.to_string(),
        };
        let outcome = SweepOutcome {
            manifest,
            runs,
            best: best.into_entries(),
        };

        if self.persist {
            emit_progress(
                &mut progress_cb,
                SweepProgressEvent::stage(
                    SweepStage::SavingResults,
                    total,
                    clock.elapsed_s(),
                    None,
                ),
            );
            let store = SweepStore::for_result_dir(&self.config.result_dir)?;
            store.save_sweep(&outcome.manifest, &outcome.runs, &outcome.best)?;
        }

        emit_progress(
            &mut progress_cb,
            SweepProgressEvent {
                stage: SweepStage::Completed,
                completed: total,
                total,
                elapsed_wall_s: clock.elapsed_s(),
                remaining_s: Some(0.0),
                message: Some(format!(
                    "{} of {} runs succeeded",
                    outcome.manifest.succeeded, total
                )),
            },
        );
        Ok(outcome)
    }

    fn run_one(
        &mut self,
        index: usize,
        assignment: ParameterAssignment,
        file_tag: &str,
        options: &SimulationOptions,
        fitness: Option<&dyn Fitness>,
    ) -> RunResult {
        let tag = override_tag(&assignment);
        let run_options = options
            .clone()
            .with_run_overrides(&self.session.override_parameters(&assignment));

        let outcome = match self
            .session
            .run_simulation(&self.config.model_name, &run_options)
        {
            Ok(outcome) => outcome,
            Err(err) => {
                warn!(index, error = %err, "simulate command failed");
                return RunResult::failed(index, assignment, tag, err.to_string());
            }
        };

        if !outcome.success {
            let log_file = self.stage_log(file_tag);
            let mut run = RunResult::failed(index, assignment, tag, outcome.messages);
            run.log_file = log_file;
            return run;
        }

        let staged = match outcome.result_file.as_deref() {
            Some(file) => self.stage_result(file, file_tag),
            None => Err("no result file reported".to_string()),
        };
        let result_file = match staged {
            Ok(path) => path,
            Err(reason) => return RunResult::failed(index, assignment, tag, reason),
        };

        let mut run = RunResult {
            index,
            assignment,
            override_tag: tag,
            success: true,
            result_file: Some(result_file.clone()),
            log_file: None,
            diagnostic: None,
            metrics: Default::default(),
            fitness: None,
        };
        if let Some(fitness) = fitness {
            let scored = SignalStore::open(&result_file)
                .map_err(AppError::from)
                .and_then(|signals| fitness.evaluate(&signals));
            match scored {
                Ok(evaluation) => {
                    run.fitness = Some(evaluation.fitness);
                    run.metrics = evaluation.metrics;
                }
                Err(err) => {
                    warn!(index, error = %err, "scoring failed");
                    run.diagnostic = Some(format!("scoring failed: {err}"));
                }
            }
        }
        run
    }

    fn stage_result(&self, file: &Path, tag: &str) -> Result<PathBuf, String> {
        let name = tagged_file_name(file, tag)
            .ok_or_else(|| format!("result path {} has no file name", file.display()))?;
        let destination = self.config.result_dir.join(name);
        match self.session.stage_artifact(file, &destination) {
            Ok(Some(path)) => Ok(path),
            Ok(None) => Err(format!("result file {} missing", file.display())),
            Err(err) => Err(format!("staging result failed: {err}")),
        }
    }

    fn stage_log(&self, tag: &str) -> Option<PathBuf> {
        let log = PathBuf::from(log_file_name(&self.config.model_name));
        let name = tagged_file_name(&log, tag)?;
        self.session
            .stage_artifact(&log, &self.config.result_dir.join(name))
            .ok()
            .flatten()
    }
}
