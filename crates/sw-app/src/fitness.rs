//! Scoring a finished run.
//!
//! A [`Fitness`] turns one run's signals into a scalar, lower is better.
//! [`MetricSuite`] is the configurable implementation: a weighted sum of
//! simple per-signal reductions.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use sw_signals::{SignalError, SignalStore};

use crate::error::{AppError, AppResult};

/// Fitness of one run and the named metrics it was derived from.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Evaluation {
    pub fitness: f64,
    pub metrics: BTreeMap<String, f64>,
}

pub trait Fitness {
    fn evaluate(&self, signals: &SignalStore) -> AppResult<Evaluation>;
}

impl<F> Fitness for F
where
    F: Fn(&SignalStore) -> Result<f64, SignalError>,
{
    fn evaluate(&self, signals: &SignalStore) -> AppResult<Evaluation> {
        Ok(Evaluation {
            fitness: self(signals)?,
            metrics: BTreeMap::new(),
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MetricKind {
    /// Sum of absolute sample values
    SumAbs,
    MaxAbs,
    Mean,
    /// Last sample
    Final,
    /// Sample at `time`, at-or-after
    ValueAt,
}

impl MetricKind {
    fn label(self) -> &'static str {
        match self {
            Self::SumAbs => "sum_abs",
            Self::MaxAbs => "max_abs",
            Self::Mean => "mean",
            Self::Final => "final",
            Self::ValueAt => "value_at",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MetricDef {
    pub kind: MetricKind,
    pub signal: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default = "unit_weight")]
    pub weight: f64,
}

fn unit_weight() -> f64 {
    1.0
}

impl MetricDef {
    pub fn new(kind: MetricKind, signal: impl Into<String>) -> Self {
        Self {
            kind,
            signal: signal.into(),
            time: None,
            name: None,
            weight: 1.0,
        }
    }

    pub fn at(mut self, time: f64) -> Self {
        self.time = Some(time);
        self
    }

    pub fn weighted(mut self, weight: f64) -> Self {
        self.weight = weight;
        self
    }

    /// Key in the run's metric map: the explicit name, else `kind(signal)`.
    pub fn key(&self) -> String {
        match &self.name {
            Some(name) => name.clone(),
            None => format!("{}({})", self.kind.label(), self.signal),
        }
    }

    pub fn compute(&self, signals: &SignalStore) -> Result<f64, SignalError> {
        if self.kind == MetricKind::ValueAt {
            let time = self.time.unwrap_or_default();
            return signals.sample_at(&self.signal, time);
        }
        let samples = signals.expanded_series(&self.signal)?;
        if samples.is_empty() {
            return Err(SignalError::EmptySignal {
                name: self.signal.clone(),
            });
        }
        Ok(match self.kind {
            MetricKind::SumAbs => samples.iter().map(|v| v.abs()).sum(),
            MetricKind::MaxAbs => samples.iter().fold(0.0, |acc: f64, v| acc.max(v.abs())),
            MetricKind::Mean => samples.iter().sum::<f64>() / samples.len() as f64,
            MetricKind::Final | MetricKind::ValueAt => samples[samples.len() - 1],
        })
    }
}

/// Weighted sum of metrics.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct MetricSuite {
    pub metrics: Vec<MetricDef>,
}

impl MetricSuite {
    pub fn new(metrics: Vec<MetricDef>) -> Self {
        Self { metrics }
    }

    pub fn is_empty(&self) -> bool {
        self.metrics.is_empty()
    }

    pub fn validate(&self) -> AppResult<()> {
        for metric in &self.metrics {
            if metric.signal.is_empty() {
                return Err(AppError::Validation("metric signal must not be empty".to_string()));
            }
            if !metric.weight.is_finite() {
                return Err(AppError::Validation(format!(
                    "metric {} has non-finite weight",
                    metric.key()
                )));
            }
            match (metric.kind, metric.time) {
                (MetricKind::ValueAt, None) => {
                    return Err(AppError::Validation(format!(
                        "metric {} needs a time",
                        metric.key()
                    )));
                }
                (MetricKind::ValueAt, Some(_)) | (_, None) => {}
                (_, Some(_)) => {
                    return Err(AppError::Validation(format!(
                        "metric {} does not take a time",
                        metric.key()
                    )));
                }
            }
        }
        Ok(())
    }
}

impl Fitness for MetricSuite {
    fn evaluate(&self, signals: &SignalStore) -> AppResult<Evaluation> {
        let mut evaluation = Evaluation::default();
        for metric in &self.metrics {
            let value = metric.compute(signals)?;
            evaluation.fitness += metric.weight * value;
            evaluation.metrics.insert(metric.key(), value);
        }
        Ok(evaluation)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use sw_signals::MemoryDataset;

    fn signals() -> SignalStore {
        SignalStore::new(
            MemoryDataset::new(vec![0.0, 0.5, 1.0])
                .with_signal("diffVa", vec![1.0, -2.0, 0.5])
                .with_signal("diffVb", vec![0.0, 0.25, -0.25])
                .with_constant("gain", 4.0),
        )
    }

    #[test]
    fn sum_of_absolute_differences() {
        let suite = MetricSuite::new(vec![
            MetricDef::new(MetricKind::SumAbs, "diffVa"),
            MetricDef::new(MetricKind::SumAbs, "diffVb"),
        ]);
        let evaluation = suite.evaluate(&signals()).unwrap();
        assert_eq!(evaluation.fitness, 4.0);
        assert_eq!(evaluation.metrics["sum_abs(diffVa)"], 3.5);
        assert_eq!(evaluation.metrics["sum_abs(diffVb)"], 0.5);
    }

    #[test]
    fn reductions() {
        let s = signals();
        let value = |kind, signal: &str| MetricDef::new(kind, signal).compute(&s).unwrap();
        assert_eq!(value(MetricKind::MaxAbs, "diffVa"), 2.0);
        assert_eq!(value(MetricKind::Mean, "diffVb"), 0.0);
        assert_eq!(value(MetricKind::Final, "diffVa"), 0.5);
        assert_eq!(value(MetricKind::SumAbs, "gain"), 12.0);
        assert_eq!(
            MetricDef::new(MetricKind::ValueAt, "diffVa")
                .at(0.2)
                .compute(&s)
                .unwrap(),
            -2.0
        );
    }

    #[test]
    fn weights_and_names() {
        let mut speed = MetricDef::new(MetricKind::Final, "gain").weighted(-0.5);
        speed.name = Some("speed".to_string());
        let suite = MetricSuite::new(vec![speed]);
        let evaluation = suite.evaluate(&signals()).unwrap();
        assert_eq!(evaluation.fitness, -2.0);
        assert_eq!(evaluation.metrics["speed"], 4.0);
    }

    #[test]
    fn missing_signal_fails_scoring() {
        let suite = MetricSuite::new(vec![MetricDef::new(MetricKind::SumAbs, "absent")]);
        assert!(matches!(
            suite.evaluate(&signals()),
            Err(AppError::Signals(_))
        ));
    }

    #[test]
    fn closure_fitness() {
        let f = |s: &SignalStore| s.sample_at("gain", 1.0);
        assert_eq!(f.evaluate(&signals()).unwrap().fitness, 4.0);
    }

    #[test]
    fn validation() {
        let suite = MetricSuite::new(vec![MetricDef::new(MetricKind::ValueAt, "x")]);
        assert!(suite.validate().is_err());
        let suite = MetricSuite::new(vec![MetricDef::new(MetricKind::Final, "x").at(1.0)]);
        assert!(suite.validate().is_err());
        let suite = MetricSuite::new(vec![MetricDef::new(MetricKind::ValueAt, "x").at(1.0)]);
        assert!(suite.validate().is_ok());
    }
}
