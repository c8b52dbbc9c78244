use clap::{Parser, Subcommand};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::Instant;
use sw_app::{
    AppError, AppResult, CheckPolicy, Fitness, ModelSource, SingleRunRequest, SweepProgressEvent,
    SweepRunner, SweepStage, load_config, load_model, simulate_once, validate_config,
};
use sw_results::SweepStore;
use sw_session::{OmcProcess, SimulationSession};
use sw_signals::{SignalStore, VectorValue};
use sw_sweep::{ParameterAssignment, expand, override_tag};
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "sweepflow")]
#[command(about = "SweepFlow - parameter sweeps over Modelica models", long_about = None)]
struct Cli {
    /// Engine executable (defaults to `omc` on PATH)
    #[arg(long, global = true)]
    omc: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// List the grid points of a sweep file without simulating
    Expand {
        /// Path to the sweep YAML file
        sweep_path: PathBuf,
    },
    /// Load and check the model named in a sweep file
    Check {
        /// Path to the sweep YAML file
        sweep_path: PathBuf,
    },
    /// Simulate a model once
    Simulate {
        /// Model source file
        model_path: PathBuf,
        /// Fully qualified model name
        model_name: String,
        /// Directory receiving the result and log
        #[arg(short, long, default_value = ".")]
        out: PathBuf,
        /// Library file loaded before the model (repeatable)
        #[arg(short = 'L', long = "library")]
        libraries: Vec<PathBuf>,
        /// Parameter override `name=value` (repeatable)
        #[arg(short = 'p', long = "param", value_parser = parse_override)]
        overrides: Vec<(String, f64)>,
    },
    /// Run every grid point of a sweep file
    Sweep {
        /// Path to the sweep YAML file
        sweep_path: PathBuf,
        /// Do not record the sweep under the result directory
        #[arg(long)]
        no_save: bool,
    },
    /// List signal names in a result file
    Signals {
        /// CSV result file
        result_path: PathBuf,
        /// Only names containing this text
        #[arg(short, long)]
        filter: Option<String>,
    },
    /// Print one signal, at a time or as a full series
    Sample {
        /// CSV result file
        result_path: PathBuf,
        /// Signal name; partial names sample every match
        name: String,
        /// Sample time in seconds; the whole series when absent
        #[arg(short, long)]
        time: Option<f64>,
    },
    /// Print the 3-vector `base[1..3]`
    Vector {
        /// CSV result file
        result_path: PathBuf,
        /// Vector base name, e.g. `body.frame_a.r_0`
        base: String,
        /// Sample time in seconds; the whole series when absent
        #[arg(short, long)]
        time: Option<f64>,
    },
    /// List entities owning every given field
    Entities {
        /// CSV result file
        result_path: PathBuf,
        /// Field names such as `m` or `L`
        #[arg(required = true)]
        fields: Vec<String>,
    },
    /// List recorded sweeps in a result directory
    Sweeps {
        /// Result directory of the sweep
        result_dir: PathBuf,
        /// Only sweeps of this model
        #[arg(short, long)]
        model: Option<String>,
    },
    /// Show the runs of a recorded sweep
    ShowSweep {
        /// Result directory of the sweep
        result_dir: PathBuf,
        /// Sweep ID to display
        sweep_id: String,
        /// Print the run records as JSON lines
        #[arg(long)]
        json: bool,
    },
}

fn main() -> AppResult<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let omc = cli.omc;

    match cli.command {
        Commands::Expand { sweep_path } => cmd_expand(&sweep_path),
        Commands::Check { sweep_path } => cmd_check(omc.as_deref(), &sweep_path),
        Commands::Simulate {
            model_path,
            model_name,
            out,
            libraries,
            overrides,
        } => cmd_simulate(
            omc.as_deref(),
            &model_path,
            &model_name,
            &out,
            &libraries,
            overrides,
        ),
        Commands::Sweep {
            sweep_path,
            no_save,
        } => cmd_sweep(omc.as_deref(), &sweep_path, !no_save),
        Commands::Signals {
            result_path,
            filter,
        } => cmd_signals(&result_path, filter.as_deref()),
        Commands::Sample {
            result_path,
            name,
            time,
        } => cmd_sample(&result_path, &name, time),
        Commands::Vector {
            result_path,
            base,
            time,
        } => cmd_vector(&result_path, &base, time),
        Commands::Entities {
            result_path,
            fields,
        } => cmd_entities(&result_path, &fields),
        Commands::Sweeps { result_dir, model } => cmd_sweeps(&result_dir, model.as_deref()),
        Commands::ShowSweep {
            result_dir,
            sweep_id,
            json,
        } => cmd_show_sweep(&result_dir, &sweep_id, json),
    }
}

fn parse_override(text: &str) -> Result<(String, f64), String> {
    let (name, value) = text
        .split_once('=')
        .ok_or_else(|| format!("expected name=value, got '{text}'"))?;
    let value: f64 = value
        .trim()
        .parse()
        .map_err(|_| format!("'{value}' is not a number"))?;
    Ok((name.trim().to_string(), value))
}

fn open_session(omc: Option<&Path>) -> AppResult<SimulationSession<OmcProcess>> {
    let engine = match omc {
        Some(program) => OmcProcess::with_program(program)?,
        None => OmcProcess::new()?,
    };
    Ok(SimulationSession::new(engine)?)
}

fn cmd_expand(sweep_path: &Path) -> AppResult<()> {
    let config = load_config(sweep_path)?;
    validate_config(&config)?;
    let assignments = expand(&config.parameters)?;

    println!(
        "Sweep of {} over {}: {} runs",
        config.model_name,
        config.parameters.names().join(", "),
        assignments.len()
    );
    for (index, assignment) in assignments.iter().enumerate() {
        println!("  {:>4}  {}", index, override_tag(assignment));
    }
    Ok(())
}

fn cmd_check(omc: Option<&Path>, sweep_path: &Path) -> AppResult<()> {
    let config = load_config(sweep_path)?;
    validate_config(&config)?;
    let mut session = open_session(omc)?;

    println!("Checking model: {}", config.model_name);
    let source = ModelSource {
        model_path: &config.model_path,
        model_name: &config.model_name,
        libraries: &config.libraries,
        load_standard_library: config.load_standard_library,
        check: CheckPolicy::Advisory,
    };
    let report = load_model(&mut session, &source)?;

    match report {
        Some(report) if report.success => {
            println!("✓ Check passed");
            if let (Some(equations), Some(variables)) = (report.equation_count, report.variable_count) {
                println!("  Equations: {}", equations);
                println!("  Variables: {}", variables);
            }
            if let Some(trivial) = report.trivial_count {
                println!("  Trivial:   {}", trivial);
            }
            Ok(())
        }
        _ => Err(AppError::CheckFailed {
            model: config.model_name.clone(),
            detail: session.error_string()?,
        }),
    }
}

fn cmd_simulate(
    omc: Option<&Path>,
    model_path: &Path,
    model_name: &str,
    out: &Path,
    libraries: &[PathBuf],
    overrides: Vec<(String, f64)>,
) -> AppResult<()> {
    println!("Simulating model: {}", model_name);
    let mut session = open_session(omc)?;
    let assignment: ParameterAssignment = overrides.into_iter().collect();

    let request = SingleRunRequest {
        model_path,
        model_name,
        libraries,
        result_dir: out,
        options: None,
        overrides: (!assignment.is_empty()).then_some(&assignment),
        check: CheckPolicy::Advisory,
    };
    let started = Instant::now();
    let outcome = simulate_once(&mut session, &request)?;

    match &outcome.result_file {
        Some(path) if outcome.success => {
            println!("✓ Simulation completed: {}", path.display());
        }
        _ => {
            println!("✗ Simulation failed");
            print_messages(&outcome.messages);
        }
    }
    if let Some(log) = &outcome.log_file {
        println!("  Log: {}", log.display());
    }
    println!("  Elapsed: {:.2}s", started.elapsed().as_secs_f64());
    Ok(())
}

fn cmd_sweep(omc: Option<&Path>, sweep_path: &Path, save: bool) -> AppResult<()> {
    let config = load_config(sweep_path)?;
    let fitness = config.fitness.clone();
    println!("Running sweep of {}", config.model_name);

    let session = open_session(omc)?;
    let mut runner = SweepRunner::new(session, config);
    if !save {
        runner = runner.without_persistence();
    }

    let mut last_emit = Instant::now();
    let mut last_stage = None;
    let mut render = |event: SweepProgressEvent| {
        let emit_now = last_stage != Some(event.stage)
            || event.stage == SweepStage::Simulating
            || last_emit.elapsed().as_millis() >= 100;
        if emit_now {
            render_cli_progress(&event);
            last_stage = Some(event.stage);
            last_emit = Instant::now();
        }
    };

    runner.prepare_with_progress(Some(&mut render))?;
    let scoring: Option<&dyn Fitness> = if fitness.is_empty() {
        None
    } else {
        Some(&fitness)
    };
    let outcome = runner.run_with_progress(scoring, Some(&mut render))?;
    clear_progress_line();

    let manifest = &outcome.manifest;
    println!(
        "✓ Sweep completed: {} ({}/{} runs succeeded)",
        manifest.sweep_id, manifest.succeeded, manifest.run_count
    );

    let failed: Vec<_> = outcome.runs.iter().filter(|run| !run.success).collect();
    if !failed.is_empty() {
        println!("\nFailed runs:");
        for run in failed {
            println!("  {:>4}  {}", run.index, run.override_tag);
        }
    }

    if !outcome.best.is_empty() {
        println!("\nBest runs:");
        for (rank, run) in outcome.best_runs().into_iter().enumerate() {
            print_run_line(rank + 1, run);
        }
    }
    Ok(())
}

fn cmd_signals(result_path: &Path, filter: Option<&str>) -> AppResult<()> {
    let store = SignalStore::open(result_path)?;
    let names: Vec<&str> = match filter {
        Some(stub) => store.resolve_partial(stub),
        None => store.names().iter().map(String::as_str).collect(),
    };

    if names.is_empty() {
        println!("No matching signals in {}", result_path.display());
    } else {
        for name in names {
            println!("{}", name);
        }
    }
    Ok(())
}

fn cmd_sample(result_path: &Path, name: &str, time: Option<f64>) -> AppResult<()> {
    let store = SignalStore::open(result_path)?;

    let Some(exact) = store.resolve_exact(name) else {
        let t = match time {
            Some(t) => t,
            None => store.time_range()?.1,
        };
        let matches = store.sample_matching(name, t);
        if matches.is_empty() {
            return Err(sw_signals::SignalError::NotFound {
                name: name.to_string(),
            }
            .into());
        }
        println!("t = {}", t);
        for (signal, value) in matches {
            println!("  {} = {}", signal, value);
        }
        return Ok(());
    };

    match time {
        Some(t) => println!("{} = {}", exact, store.sample_at(exact, t)?),
        None => {
            let times = store.time_axis()?;
            let values = store.expanded_series(exact)?;
            println!("time,{}", exact);
            for (t, value) in times.iter().zip(&values) {
                println!("{},{}", t, value);
            }
        }
    }
    Ok(())
}

fn cmd_vector(result_path: &Path, base: &str, time: Option<f64>) -> AppResult<()> {
    let store = SignalStore::open(result_path)?;

    match store.resolve_vector(base, time)? {
        VectorValue::Instant(v) => {
            println!("{} = [{}, {}, {}]", base, v.x, v.y, v.z);
        }
        VectorValue::Series(m) => {
            let times = store.time_axis()?;
            println!("time,{base}[1],{base}[2],{base}[3]");
            for (t, column) in times.iter().zip(m.column_iter()) {
                println!("{},{},{},{}", t, column[0], column[1], column[2]);
            }
        }
    }
    Ok(())
}

fn cmd_entities(result_path: &Path, fields: &[String]) -> AppResult<()> {
    let store = SignalStore::open(result_path)?;
    let fields: Vec<&str> = fields.iter().map(String::as_str).collect();
    let entities = store.resolve_by_fields(&fields);

    if entities.is_empty() {
        println!("No entity has fields: {}", fields.join(", "));
    } else {
        for entity in entities {
            println!("{}", entity);
        }
    }
    Ok(())
}

fn cmd_sweeps(result_dir: &Path, model: Option<&str>) -> AppResult<()> {
    let store = SweepStore::for_result_dir(result_dir)?;
    let sweeps = store.list_sweeps(model)?;

    if sweeps.is_empty() {
        println!("No recorded sweeps in {}", result_dir.display());
    } else {
        println!("Recorded sweeps:");
        for manifest in sweeps {
            println!(
                "  {} {} ({}/{} ok, {})",
                manifest.sweep_id,
                manifest.model_name,
                manifest.succeeded,
                manifest.run_count,
                manifest.timestamp
            );
        }
    }
    Ok(())
}

fn cmd_show_sweep(result_dir: &Path, sweep_id: &str, json: bool) -> AppResult<()> {
    let store = SweepStore::for_result_dir(result_dir)?;
    let manifest = store.load_manifest(sweep_id)?;
    let runs = store.load_runs(sweep_id)?;

    if json {
        for run in &runs {
            let line =
                serde_json::to_string(run).map_err(|e| AppError::Results(e.to_string()))?;
            println!("{}", line);
        }
        return Ok(());
    }

    let best = store.load_best(sweep_id)?;
    println!("Sweep {}", manifest.sweep_id);
    println!("  Model: {} ({})", manifest.model_name, manifest.model_path.display());
    println!("  Parameters: {}", manifest.spec.names().join(", "));
    println!("  Runs: {}/{} succeeded", manifest.succeeded, manifest.run_count);
    println!("  Recorded: {}", manifest.timestamp);

    println!("\nRuns:");
    for run in &runs {
        let status = if run.success { "ok" } else { "FAILED" };
        let fitness = run
            .fitness
            .map(|value| format!("{value:.6e}"))
            .unwrap_or_else(|| "-".to_string());
        println!("  {:>4}  {:<6}  {:>13}  {}", run.index, status, fitness, run.override_tag);
    }

    if !best.is_empty() {
        println!("\nBest runs:");
        for (rank, entry) in best.iter().enumerate() {
            if let Some(run) = runs.get(entry.index) {
                print_run_line(rank + 1, run);
            }
        }
    }
    Ok(())
}

fn print_run_line(rank: usize, run: &sw_results::RunResult) {
    let fitness = run.fitness.map(|value| format!("{value:.6e}")).unwrap_or_default();
    println!("  {:>2}. {}  {}", rank, fitness, run.override_tag);
    if let Some(path) = &run.result_file {
        println!("      {}", path.display());
    }
}

fn print_messages(messages: &str) {
    for line in messages.lines().filter(|line| !line.trim().is_empty()) {
        println!("  {}", line);
    }
}

fn clear_progress_line() {
    print!("\r{}\r", " ".repeat(120));
    let _ = io::stdout().flush();
}

fn render_cli_progress(event: &SweepProgressEvent) {
    match event.stage {
        SweepStage::Simulating if event.total > 0 => {
            let width = 28usize;
            let fraction = event.completed as f64 / event.total as f64;
            let filled = ((fraction * width as f64).round() as usize).min(width);
            let bar = format!(
                "{}{}",
                "#".repeat(filled),
                "-".repeat(width.saturating_sub(filled))
            );
            let mut line = format!(
                "\r[{}] {:>4}/{:<4}  elapsed={:.1}s",
                bar, event.completed, event.total, event.elapsed_wall_s
            );
            if let Some(remaining) = event.remaining_s {
                line.push_str(&format!("  remain={:.1}m", remaining / 60.0));
            }
            if let Some(msg) = &event.message {
                line.push_str(&format!("  {}", msg));
            }
            print!("{}", line);
            let _ = io::stdout().flush();
        }
        _ => {
            let spinner = ['|', '/', '-', '\\'];
            let spin_idx = ((event.elapsed_wall_s * 10.0) as usize) % spinner.len();
            let mut line = format!(
                "\r{} {}  elapsed={:.2}s",
                spinner[spin_idx],
                event.stage.label(),
                event.elapsed_wall_s
            );
            if let Some(msg) = &event.message {
                line.push_str(&format!("  {}", msg));
            }
            print!("{}", line);
            let _ = io::stdout().flush();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_overrides() {
        assert_eq!(parse_override("k=2.5"), Ok(("k".to_string(), 2.5)));
        assert_eq!(parse_override(" a.b = -1e-3"), Ok(("a.b".to_string(), -1e-3)));
        assert!(parse_override("k").is_err());
        assert!(parse_override("k=abc").is_err());
    }

    #[test]
    fn cli_definition_is_consistent() {
        use clap::CommandFactory;
        Cli::command().debug_assert();
    }
}
