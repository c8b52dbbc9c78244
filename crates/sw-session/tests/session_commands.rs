use std::fs;
use std::path::Path;

use sw_session::{
    Engine, EngineReply, ScriptedEngine, SessionError, SimulationOptions, SimulationSession,
};
use sw_sweep::ParameterAssignment;

const SIM_OK: &str = r#"record SimulationResult
    resultFile = "/tmp/work/Motor_res.csv",
    simulationOptions = "startTime = 0.0, stopTime = 1.0",
    messages = "LOG_SUCCESS       | info    | The simulation finished successfully.
"
end SimulationResult;"#;

const SIM_NO_MARKER: &str = r#"record SimulationResult
    resultFile = "/tmp/work/Motor_res.csv",
    messages = "LOG_STATS | info | events: 0
"
end SimulationResult;"#;

fn session(engine: &ScriptedEngine) -> SimulationSession<ScriptedEngine> {
    SimulationSession::new(engine.clone()).expect("session starts")
}

fn assignment(pairs: &[(&str, f64)]) -> ParameterAssignment {
    pairs.iter().map(|(n, v)| (n.to_string(), *v)).collect()
}

#[test]
fn session_moves_engine_into_private_directory() {
    let engine = ScriptedEngine::accepting();
    let session = session(&engine);
    let commands = engine.commands();
    assert_eq!(commands.len(), 1);
    assert!(commands[0].starts_with("cd(\""));
    assert!(commands[0].contains(&*session.working_dir().to_string_lossy()));
}

#[test]
fn refused_working_directory_is_an_error() {
    let engine = ScriptedEngine::new().reply("cd(", "\"\"");
    assert!(matches!(
        SimulationSession::new(engine),
        Err(SessionError::Transport { .. })
    ));
}

#[test]
fn load_file_submits_relative_path() {
    let models = tempfile::tempdir().unwrap();
    let model = models.path().join("Motor.mo");
    fs::write(&model, "model Motor end Motor;").unwrap();

    let engine = ScriptedEngine::accepting();
    let mut s = session(&engine);
    assert!(s.load_file(&model).unwrap());

    let sent = engine.commands_starting_with("loadFile(");
    assert_eq!(sent.len(), 1);
    let relative = sent[0]
        .trim_start_matches("loadFile(\"./")
        .trim_end_matches("\")");
    let resolved = fs::canonicalize(s.working_dir().join(relative)).unwrap();
    assert_eq!(resolved, fs::canonicalize(&model).unwrap());
}

#[test]
fn missing_file_is_surfaced_without_engine_call() {
    let engine = ScriptedEngine::accepting();
    let mut s = session(&engine);
    let err = s.load_file(Path::new("/no/such/model.mo")).unwrap_err();
    assert!(matches!(err, SessionError::PathNotFound { .. }));
    assert!(engine.commands_starting_with("loadFile(").is_empty());
}

#[test]
fn rejected_load_returns_false() {
    let models = tempfile::tempdir().unwrap();
    let model = models.path().join("Broken.mo");
    fs::write(&model, "model Broken").unwrap();

    let engine = ScriptedEngine::accepting().reply("loadFile(", "false");
    let mut s = session(&engine);
    assert!(!s.load_file(&model).unwrap());
}

#[test]
fn check_model_reports_counts() {
    let engine = ScriptedEngine::accepting();
    let mut s = session(&engine);
    let report = s.check_model("Motor").unwrap();
    assert!(report.success);
    assert_eq!(report.equation_count, Some(4));
    assert_eq!(report.trivial_count, Some(1));
}

#[test]
fn simulation_success_needs_marker() {
    let engine = ScriptedEngine::accepting().reply("simulate(", SIM_OK);
    let mut s = session(&engine);
    let options = SimulationOptions::default().with_overrides("R=1.000e+00");
    let outcome = s.run_simulation("Motor", &options).unwrap();
    assert!(outcome.success);
    assert_eq!(
        outcome.result_file.as_deref(),
        Some(Path::new("/tmp/work/Motor_res.csv"))
    );
    assert!(outcome.command.starts_with("simulate(Motor, "));
    assert!(outcome.command.contains("simflags=\"-override R=1.000e+00\""));

    let engine = ScriptedEngine::accepting().reply("simulate(", SIM_NO_MARKER);
    let mut s = session(&engine);
    let outcome = s.run_simulation("Motor", &SimulationOptions::default()).unwrap();
    assert!(!outcome.success);
}

#[test]
fn empty_reply_collects_error_text() {
    let engine = ScriptedEngine::accepting()
        .reply("getErrorString()", "\"Error: class Motor not found\"");
    let mut s = session(&engine);
    let outcome = s.run_simulation("Motor", &SimulationOptions::default()).unwrap();
    assert!(!outcome.success);
    assert_eq!(outcome.result_file, None);
    assert_eq!(outcome.messages, "Error: class Motor not found");
}

#[test]
fn transport_failure_is_an_error() {
    let engine = ScriptedEngine::accepting().fail("simulate(", "connection reset");
    let mut s = session(&engine);
    assert!(s.run_simulation("Motor", &SimulationOptions::default()).is_err());
}

#[test]
fn library_path_is_extended() {
    let engine = ScriptedEngine::accepting();
    let mut s = session(&engine);
    assert_eq!(s.modelica_path().unwrap(), "/usr/lib/omlibrary");
    assert!(s.add_modelica_path(Path::new("/home/u/lib")).unwrap());
    assert_eq!(
        engine.commands_starting_with("setModelicaPath("),
        vec!["setModelicaPath(\"/usr/lib/omlibrary:/home/u/lib\")".to_string()]
    );
}

#[test]
fn override_file_and_string() {
    let engine = ScriptedEngine::accepting();
    let s = session(&engine);
    let a = assignment(&[("R", 1.35), ("Lw", 6e-3)]);
    assert_eq!(s.override_parameters(&a), "R=1.350e+00,Lw=6.000e-03");

    let path = s.write_override_file(&a).unwrap();
    assert!(path.starts_with(s.working_dir()));
    assert_eq!(
        fs::read_to_string(path).unwrap(),
        "R=1.350e+00\nLw=6.000e-03\n"
    );
}

#[test]
fn staging_copies_out_of_working_directory() {
    let engine = ScriptedEngine::accepting();
    let s = session(&engine);
    fs::write(s.working_dir().join("Motor.log"), "log text").unwrap();

    let out = tempfile::tempdir().unwrap();
    let destination = out.path().join("nested").join("Motor_R=1.log");
    let staged = s
        .stage_artifact(Path::new("Motor.log"), &destination)
        .unwrap();
    assert_eq!(staged.as_deref(), Some(destination.as_path()));
    assert_eq!(fs::read_to_string(&destination).unwrap(), "log text");

    assert_eq!(
        s.stage_artifact(Path::new("absent.csv"), &out.path().join("x.csv"))
            .unwrap(),
        None
    );
}

#[test]
fn replies_are_typed() {
    let engine = ScriptedEngine::accepting();
    let mut handle = engine.clone();
    assert_eq!(
        handle.send("getModelicaPath()").unwrap(),
        EngineReply::Str("/usr/lib/omlibrary".to_string())
    );
}
