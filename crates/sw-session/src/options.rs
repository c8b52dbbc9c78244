//! Validated simulation options and the `simulate(...)` command they render.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

use crate::{SessionError, SessionResult};

pub const DEFAULT_METHOD: &str = "dassl";
pub const DEFAULT_OUTPUT_FORMAT: &str = "csv";
/// Output formats whose result files can be read back for scoring.
pub const SUPPORTED_OUTPUT_FORMATS: [&str; 1] = ["csv"];
pub const DEFAULT_CFLAGS: &str = "-Os -fPIC -falign-functions -mfpmath=sse -fno-dollars-in-identifiers";
pub const DEFAULT_RUN_FLAGS: &str = "-v -abortSlowSimulation -alarm=10 -lv=LOG_INIT,LOG_STATS,LOG_SOLVER,LOG_SUCCESS";

/// Options for one `simulate` call.
///
/// Constructed through [`SimulationOptions::new`] or deserialisation; both
/// reject non-finite times, `stop <= start`, zero intervals, a non-positive
/// tolerance and an output format that cannot be read back.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawOptions", into = "RawOptions")]
pub struct SimulationOptions {
    start_time: f64,
    stop_time: f64,
    intervals: u32,
    tolerance: f64,
    method: String,
    output_format: String,
    cflags: String,
    run_flags: String,
    overrides: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct RawOptions {
    #[serde(default)]
    start_time: f64,
    stop_time: f64,
    #[serde(default = "default_intervals")]
    intervals: u32,
    #[serde(default = "default_tolerance")]
    tolerance: f64,
    #[serde(default = "default_method")]
    method: String,
    #[serde(default = "default_output_format")]
    output_format: String,
    #[serde(default = "default_cflags")]
    cflags: String,
    #[serde(default = "default_run_flags")]
    run_flags: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    overrides: Option<String>,
}

fn default_intervals() -> u32 {
    100
}

fn default_tolerance() -> f64 {
    1e-3
}

fn default_method() -> String {
    DEFAULT_METHOD.to_string()
}

fn default_output_format() -> String {
    DEFAULT_OUTPUT_FORMAT.to_string()
}

fn default_cflags() -> String {
    DEFAULT_CFLAGS.to_string()
}

fn default_run_flags() -> String {
    DEFAULT_RUN_FLAGS.to_string()
}

impl TryFrom<RawOptions> for SimulationOptions {
    type Error = SessionError;

    fn try_from(raw: RawOptions) -> SessionResult<Self> {
        let options = Self {
            start_time: raw.start_time,
            stop_time: raw.stop_time,
            intervals: raw.intervals,
            tolerance: raw.tolerance,
            method: raw.method,
            output_format: raw.output_format,
            cflags: raw.cflags,
            run_flags: raw.run_flags,
            overrides: raw.overrides,
        };
        options.validate()?;
        Ok(options)
    }
}

impl From<SimulationOptions> for RawOptions {
    fn from(options: SimulationOptions) -> Self {
        Self {
            start_time: options.start_time,
            stop_time: options.stop_time,
            intervals: options.intervals,
            tolerance: options.tolerance,
            method: options.method,
            output_format: options.output_format,
            cflags: options.cflags,
            run_flags: options.run_flags,
            overrides: options.overrides,
        }
    }
}

impl Default for SimulationOptions {
    fn default() -> Self {
        Self {
            start_time: 0.0,
            stop_time: 1.0,
            intervals: default_intervals(),
            tolerance: default_tolerance(),
            method: default_method(),
            output_format: default_output_format(),
            cflags: default_cflags(),
            run_flags: default_run_flags(),
            overrides: None,
        }
    }
}

impl SimulationOptions {
    pub fn new(start_time: f64, stop_time: f64, intervals: u32, tolerance: f64) -> SessionResult<Self> {
        let options = Self {
            start_time,
            stop_time,
            intervals,
            tolerance,
            ..Self::default()
        };
        options.validate()?;
        Ok(options)
    }

    pub fn validate(&self) -> SessionResult<()> {
        let invalid = |reason: String| Err(SessionError::InvalidOptions { reason });
        for (what, value) in [
            ("start time", self.start_time),
            ("stop time", self.stop_time),
            ("tolerance", self.tolerance),
        ] {
            if !value.is_finite() {
                return invalid(format!("{what} must be finite, got {value}"));
            }
        }
        if self.stop_time <= self.start_time {
            return invalid(format!(
                "stop time {} must be after start time {}",
                self.stop_time, self.start_time
            ));
        }
        if self.intervals == 0 {
            return invalid("at least one output interval is required".to_string());
        }
        if self.tolerance <= 0.0 {
            return invalid(format!("tolerance must be positive, got {}", self.tolerance));
        }
        if self.method.trim().is_empty() {
            return invalid("integration method must not be empty".to_string());
        }
        if !SUPPORTED_OUTPUT_FORMATS.contains(&self.output_format.as_str()) {
            return invalid(format!(
                "unsupported output format '{}', expected one of: {}",
                self.output_format,
                SUPPORTED_OUTPUT_FORMATS.join(", ")
            ));
        }
        Ok(())
    }

    pub fn with_method(mut self, method: impl Into<String>) -> Self {
        self.method = method.into();
        self
    }

    pub fn with_output_format(mut self, format: impl Into<String>) -> Self {
        self.output_format = format.into();
        self
    }

    pub fn with_cflags(mut self, cflags: impl Into<String>) -> Self {
        self.cflags = cflags.into();
        self
    }

    pub fn with_run_flags(mut self, flags: impl Into<String>) -> Self {
        self.run_flags = flags.into();
        self
    }

    /// Parameter overrides (`a=1.000e+00,b=2.000e+00`) passed as `-override`.
    pub fn with_overrides(mut self, overrides: impl Into<String>) -> Self {
        let overrides = overrides.into();
        self.overrides = (!overrides.is_empty()).then_some(overrides);
        self
    }

    /// Layer per-run overrides over the configured ones.
    ///
    /// Configured pairs whose name the run also sets are dropped; the rest
    /// come first, followed by the run's pairs.
    pub fn with_run_overrides(self, run: &str) -> Self {
        let run_names: Vec<&str> = override_pairs(run).map(|(name, _)| name).collect();
        let kept = self
            .overrides
            .as_deref()
            .into_iter()
            .flat_map(override_pairs)
            .filter(|(name, _)| !run_names.contains(name))
            .map(|(name, value)| format!("{name}={value}"));
        let merged: Vec<String> = kept
            .chain(override_pairs(run).map(|(name, value)| format!("{name}={value}")))
            .collect();
        self.with_overrides(merged.join(","))
    }

    pub fn start_time(&self) -> f64 {
        self.start_time
    }

    pub fn stop_time(&self) -> f64 {
        self.stop_time
    }

    pub fn intervals(&self) -> u32 {
        self.intervals
    }

    pub fn tolerance(&self) -> f64 {
        self.tolerance
    }

    pub fn method(&self) -> &str {
        &self.method
    }

    pub fn output_format(&self) -> &str {
        &self.output_format
    }

    pub fn overrides(&self) -> Option<&str> {
        self.overrides.as_deref()
    }

    /// Output step implied by the time range and interval count.
    pub fn interval(&self) -> f64 {
        (self.stop_time - self.start_time) / f64::from(self.intervals)
    }

    /// Render `simulate(model, startTime=..., ...)`.
    pub fn simulate_command(&self, model: &str) -> String {
        let mut args = vec![
            model.to_string(),
            format!("startTime={:?}", self.start_time),
            format!("stopTime={:?}", self.stop_time),
            format!("numberOfIntervals={}", self.intervals),
            format!("tolerance={:e}", self.tolerance),
            format!("method={}", quote(&self.method)),
            format!("outputFormat={}", quote(&self.output_format)),
        ];
        if !self.cflags.is_empty() {
            args.push(format!("cflags={}", quote(&self.cflags)));
        }
        if !self.run_flags.is_empty() {
            args.push(format!("options={}", quote(&self.run_flags)));
        }
        if let Some(overrides) = &self.overrides {
            args.push(format!("simflags={}", quote(&format!("-override {overrides}"))));
        }
        format!("simulate({})", args.join(", "))
    }

    /// Read options from the `experiment(...)` annotation of a model file.
    pub fn from_model_file(path: &Path) -> SessionResult<Option<Self>> {
        let text = fs::read_to_string(path)?;
        Self::from_experiment_annotation(&text)
    }

    /// Options from an `experiment(StartTime=..., StopTime=..., ...)`
    /// annotation; `None` when the text has no recognised setting.
    ///
    /// Unset fields keep their defaults. `NumberOfIntervals` wins over
    /// `Interval`; an interval is converted to the nearest interval count.
    pub fn from_experiment_annotation(text: &str) -> SessionResult<Option<Self>> {
        let Some(body) = experiment_body(text) else {
            return Ok(None);
        };
        let mut options = Self::default();
        let mut interval = None;
        let mut count = None;
        let mut recognised = false;

        for (key, value) in annotation_pairs(body) {
            let number = || value.parse::<f64>().ok();
            match key {
                "StartTime" => {
                    if let Some(v) = number() {
                        options.start_time = v;
                        recognised = true;
                    }
                }
                "StopTime" => {
                    if let Some(v) = number() {
                        options.stop_time = v;
                        recognised = true;
                    }
                }
                "Interval" => {
                    interval = number();
                    recognised |= interval.is_some();
                }
                "NumberOfIntervals" => {
                    count = value.parse::<u32>().ok();
                    recognised |= count.is_some();
                }
                "Tolerance" => {
                    if let Some(v) = number() {
                        options.tolerance = v;
                        recognised = true;
                    }
                }
                _ if key.ends_with("Method") || key.ends_with("Algorithm") => {
                    let method = value.trim_matches(|c| c == '"' || c == '\'');
                    if !method.is_empty() {
                        options.method = method.to_string();
                        recognised = true;
                    }
                }
                _ => {}
            }
        }
        if !recognised {
            return Ok(None);
        }

        if let Some(count) = count {
            options.intervals = count;
        } else if let Some(step) = interval.filter(|s| *s > 0.0) {
            let span = options.stop_time - options.start_time;
            options.intervals = (span / step).round().max(0.0) as u32;
        }
        options.validate()?;
        Ok(Some(options))
    }
}

fn override_pairs(overrides: &str) -> impl Iterator<Item = (&str, &str)> {
    overrides
        .split(',')
        .filter_map(|pair| pair.split_once('='))
        .map(|(name, value)| (name.trim(), value.trim()))
        .filter(|(name, _)| !name.is_empty())
}

/// Engine string literal.
pub(crate) fn quote(text: &str) -> String {
    format!("\"{}\"", text.replace('\\', "\\\\").replace('"', "\\\""))
}

/// Text between the parentheses of the first `experiment(...)`.
fn experiment_body(text: &str) -> Option<&str> {
    text.match_indices("experiment").find_map(|(at, word)| {
        let rest = text[at + word.len()..].trim_start();
        let inner = rest.strip_prefix('(')?;
        let mut depth = 1usize;
        for (offset, c) in inner.char_indices() {
            match c {
                '(' => depth += 1,
                ')' => {
                    depth -= 1;
                    if depth == 0 {
                        return Some(&inner[..offset]);
                    }
                }
                _ => {}
            }
        }
        None
    })
}

/// Top-level `Key=Value` pairs of an annotation body.
fn annotation_pairs(body: &str) -> Vec<(&str, &str)> {
    let mut depth = 0usize;
    let mut start = 0;
    let mut items = Vec::new();
    for (offset, c) in body.char_indices() {
        match c {
            '(' => depth += 1,
            ')' => depth = depth.saturating_sub(1),
            ',' if depth == 0 => {
                items.push(&body[start..offset]);
                start = offset + 1;
            }
            _ => {}
        }
    }
    items.push(&body[start..]);
    items
        .into_iter()
        .filter_map(|item| item.split_once('='))
        .map(|(key, value)| (key.trim(), value.trim()))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn rejects_invalid_ranges() {
        assert!(SimulationOptions::new(0.0, 1.0, 100, 1e-6).is_ok());
        assert!(SimulationOptions::new(1.0, 1.0, 100, 1e-6).is_err());
        assert!(SimulationOptions::new(0.0, 1.0, 0, 1e-6).is_err());
        assert!(SimulationOptions::new(0.0, 1.0, 10, 0.0).is_err());
        assert!(SimulationOptions::new(0.0, f64::NAN, 10, 1e-6).is_err());
    }

    #[test]
    fn renders_simulate_command() {
        let options = SimulationOptions::new(0.0, 0.4, 4000, 1e-3)
            .unwrap()
            .with_cflags("")
            .with_run_flags("-lv=LOG_SUCCESS")
            .with_overrides("R=1.350e+00,Lw=6.000e-03");
        assert_eq!(
            options.simulate_command("Drive"),
            "simulate(Drive, startTime=0.0, stopTime=0.4, numberOfIntervals=4000, \
tolerance=1e-3, method=\"dassl\", outputFormat=\"csv\", options=\"-lv=LOG_SUCCESS\", \
simflags=\"-override R=1.350e+00,Lw=6.000e-03\")"
        );
    }

    #[test]
    fn empty_overrides_are_dropped() {
        let options = SimulationOptions::default().with_overrides("");
        assert_eq!(options.overrides(), None);
        assert!(!options.simulate_command("M").contains("simflags"));
    }

    #[test]
    fn run_overrides_extend_configured_ones() {
        let options = SimulationOptions::default()
            .with_overrides("J=2.000e-02,R=1.000e+00")
            .with_run_overrides("R=5.000e+00,Lw=6.000e-03");
        assert_eq!(
            options.overrides(),
            Some("J=2.000e-02,R=5.000e+00,Lw=6.000e-03")
        );

        let bare = SimulationOptions::default().with_run_overrides("R=5.000e+00");
        assert_eq!(bare.overrides(), Some("R=5.000e+00"));
        let neither = SimulationOptions::default().with_run_overrides("");
        assert_eq!(neither.overrides(), None);
    }

    #[test]
    fn only_readable_output_formats_validate() {
        assert!(SimulationOptions::default().validate().is_ok());
        let mat = SimulationOptions::default().with_output_format("mat");
        assert!(matches!(
            mat.validate(),
            Err(SessionError::InvalidOptions { reason }) if reason.contains("mat")
        ));
        let yaml = "stop_time: 1.0\noutput_format: plt\n";
        assert!(serde_yaml::from_str::<SimulationOptions>(yaml).is_err());
    }

    #[test]
    fn yaml_fills_defaults_and_validates() {
        let options: SimulationOptions = serde_yaml::from_str("stop_time: 2.5\n").unwrap();
        assert_eq!(options.stop_time(), 2.5);
        assert_eq!(options.intervals(), 100);
        assert_eq!(options.method(), "dassl");

        assert!(serde_yaml::from_str::<SimulationOptions>("stop_time: -1.0\n").is_err());
        assert!(serde_yaml::from_str::<SimulationOptions>("stop_time: 1.0\nsolver: x\n").is_err());
    }

    #[test]
    fn experiment_annotation() {
        let model = r#"model Pendulum
  parameter Real L = 1;
  annotation(experiment(StartTime = 0, StopTime = 10, Tolerance = 1e-06,
    Interval = 0.02, __Dymola_Algorithm = "Dassl"));
end Pendulum;"#;
        let options = SimulationOptions::from_experiment_annotation(model)
            .unwrap()
            .unwrap();
        assert_eq!(options.start_time(), 0.0);
        assert_eq!(options.stop_time(), 10.0);
        assert_eq!(options.tolerance(), 1e-6);
        assert_eq!(options.intervals(), 500);
        assert_eq!(options.method(), "Dassl");
    }

    #[test]
    fn interval_count_wins() {
        let text = "annotation(experiment(StopTime=2, Interval=0.5, NumberOfIntervals=40))";
        let options = SimulationOptions::from_experiment_annotation(text)
            .unwrap()
            .unwrap();
        assert_eq!(options.intervals(), 40);
        assert_eq!(options.interval(), 0.05);
    }

    #[test]
    fn no_annotation() {
        assert!(
            SimulationOptions::from_experiment_annotation("model M end M;")
                .unwrap()
                .is_none()
        );
        assert!(
            SimulationOptions::from_experiment_annotation("annotation(experiment())")
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn inconsistent_annotation_is_rejected() {
        let text = "annotation(experiment(StartTime=5, StopTime=1))";
        assert!(SimulationOptions::from_experiment_annotation(text).is_err());
    }
}
