//! Signal lookup and sampling over one result dataset.

use nalgebra::{Matrix3xX, Vector3};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::csv::CsvDataset;
use crate::dataset::Dataset;
use crate::names;
use crate::{SignalError, SignalResult};

/// Three-axis quantity, at one instant or across the whole run.
#[derive(Debug, Clone, PartialEq)]
pub enum VectorValue {
    /// Components sampled at a single time
    Instant(Vector3<f64>),
    /// One row per axis, one column per time sample
    Series(Matrix3xX<f64>),
}

impl VectorValue {
    pub fn as_instant(&self) -> Option<&Vector3<f64>> {
        match self {
            Self::Instant(v) => Some(v),
            Self::Series(_) => None,
        }
    }

    pub fn as_series(&self) -> Option<&Matrix3xX<f64>> {
        match self {
            Self::Series(m) => Some(m),
            Self::Instant(_) => None,
        }
    }
}

/// Name resolution and time-indexed sampling over a [`Dataset`].
pub struct SignalStore {
    dataset: Box<dyn Dataset>,
    sorted_names: Vec<String>,
    source: Option<PathBuf>,
}

impl SignalStore {
    pub fn new(dataset: impl Dataset + 'static) -> Self {
        let mut sorted_names: Vec<String> =
            dataset.names().into_iter().map(str::to_string).collect();
        sorted_names.sort();
        Self {
            dataset: Box::new(dataset),
            sorted_names,
            source: None,
        }
    }

    /// Open a result file, choosing the reader from its extension.
    pub fn open(path: &Path) -> SignalResult<Self> {
        match path.extension().and_then(|ext| ext.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => Self::open_csv(path),
            _ => Err(SignalError::UnsupportedFormat {
                path: path.to_path_buf(),
            }),
        }
    }

    /// Open an engine CSV result file.
    pub fn open_csv(path: &Path) -> SignalResult<Self> {
        let dataset = CsvDataset::open(path)?;
        Ok(Self::new(dataset).with_source(path))
    }

    pub fn with_source(mut self, path: &Path) -> Self {
        self.source = Some(path.to_path_buf());
        self
    }

    /// File the dataset was read from, if any.
    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    /// All signal names, sorted.
    pub fn names(&self) -> &[String] {
        &self.sorted_names
    }

    pub fn resolve_exact(&self, name: &str) -> Option<&str> {
        self.sorted_names
            .binary_search_by(|entry| entry.as_str().cmp(name))
            .ok()
            .map(|index| self.sorted_names[index].as_str())
    }

    /// Every name containing `stub`, sorted.
    pub fn resolve_partial(&self, stub: &str) -> Vec<&str> {
        names::partial_matches(stub, self.sorted_names.iter().map(String::as_str))
    }

    /// Names in `within` containing `stub`, in the order given.
    pub fn resolve_partial_within<'a>(&self, stub: &str, within: &[&'a str]) -> Vec<&'a str> {
        names::partial_matches(stub, within.iter().copied())
    }

    /// Parent paths exposing every one of `fields` as a name component.
    pub fn resolve_by_fields(&self, fields: &[&str]) -> Vec<String> {
        names::parents_with_all_fields(fields, self.sorted_names.iter().map(String::as_str))
    }

    pub fn time_axis(&self) -> SignalResult<&[f64]> {
        self.dataset.abscissa().ok_or(SignalError::NotAvailable)
    }

    /// `(first, last)` time of the axis.
    pub fn time_range(&self) -> SignalResult<(f64, f64)> {
        let axis = self.time_axis()?;
        match (axis.first(), axis.last()) {
            (Some(&start), Some(&end)) => Ok((start, end)),
            _ => Err(SignalError::NotAvailable),
        }
    }

    /// First index whose time is at or after `t`.
    pub fn index_at_time(&self, t: f64) -> SignalResult<usize> {
        let axis = self.time_axis()?;
        let (start, end) = self.time_range()?;
        if !(start <= t && t <= end) {
            return Err(SignalError::OutOfRange { t, start, end });
        }
        Ok(axis.partition_point(|&time| time < t))
    }

    /// Stored samples of `name`, two samples for a constant signal.
    pub fn sample_series(&self, name: &str) -> SignalResult<&[f64]> {
        self.dataset
            .data(name)
            .ok_or_else(|| SignalError::NotFound {
                name: name.to_string(),
            })
    }

    /// Value of `name` at the first sample at or after `t`; no interpolation.
    ///
    /// A constant signal (fewer samples than the axis) yields its first sample.
    pub fn sample_at(&self, name: &str, t: f64) -> SignalResult<f64> {
        let samples = self.sample_series(name)?;
        let index = self.index_at_time(t)?;
        let axis_len = self.time_axis()?.len();
        let value = if samples.len() < axis_len {
            samples.first()
        } else {
            samples.get(index)
        };
        value.copied().ok_or_else(|| SignalError::EmptySignal {
            name: name.to_string(),
        })
    }

    /// Samples of `name` aligned with the time axis.
    ///
    /// Constant signals are broadcast to the axis length. Without an axis
    /// the stored samples are returned as-is.
    pub fn expanded_series(&self, name: &str) -> SignalResult<Vec<f64>> {
        let samples = self.sample_series(name)?;
        match self.dataset.abscissa() {
            Some(axis) if samples.len() < axis.len() => {
                let first = samples.first().ok_or_else(|| SignalError::EmptySignal {
                    name: name.to_string(),
                })?;
                Ok(vec![*first; axis.len()])
            }
            _ => Ok(samples.to_vec()),
        }
    }

    /// Sample every partial match of `stub` at `t`, skipping names that fail.
    pub fn sample_matching(&self, stub: &str, t: f64) -> BTreeMap<String, f64> {
        self.resolve_partial(stub)
            .into_iter()
            .filter_map(|name| match self.sample_at(name, t) {
                Ok(value) => Some((name.to_string(), value)),
                Err(err) => {
                    debug!(signal = name, error = %err, "skipping unsampled signal");
                    None
                }
            })
            .collect()
    }

    /// Group `base[1..=3]` (or `base,1..=3]`) into a 3-vector.
    ///
    /// With `t` inside the time range the components are sampled at `t`;
    /// otherwise the full series come back as a 3xT matrix.
    pub fn resolve_vector(&self, base: &str, t: Option<f64>) -> SignalResult<VectorValue> {
        let mut missing = Vec::new();
        let mut resolved = None;
        for candidates in names::vector_component_candidates(base) {
            let absent: Vec<String> = candidates
                .iter()
                .filter(|name| self.resolve_exact(name).is_none())
                .cloned()
                .collect();
            if absent.is_empty() {
                resolved = Some(candidates);
                break;
            }
            missing.extend(absent);
        }
        let components = resolved.ok_or_else(|| SignalError::UnresolvedVector {
            base: base.to_string(),
            missing,
        })?;

        let in_range = match (t, self.time_range()) {
            (Some(t), Ok((start, end))) => start <= t && t <= end,
            _ => false,
        };
        if let (true, Some(t)) = (in_range, t) {
            let mut values = [0.0; 3];
            for (slot, name) in values.iter_mut().zip(&components) {
                *slot = self.sample_at(name, t)?;
            }
            return Ok(VectorValue::Instant(Vector3::from(values)));
        }

        let rows = components
            .iter()
            .map(|name| self.expanded_series(name))
            .collect::<SignalResult<Vec<_>>>()?;
        let columns = rows[0].len();
        if rows.iter().any(|row| row.len() != columns) {
            return Err(SignalError::ShapeMismatch {
                base: base.to_string(),
                lengths: rows.iter().map(Vec::len).collect(),
            });
        }
        Ok(VectorValue::Series(Matrix3xX::from_fn(columns, |r, c| {
            rows[r][c]
        })))
    }
}

impl std::fmt::Debug for SignalStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SignalStore")
            .field("signals", &self.sorted_names.len())
            .field("source", &self.source)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemoryDataset;

    fn store() -> SignalStore {
        let time = vec![0.0, 0.25, 0.5, 0.75, 1.0];
        SignalStore::new(
            MemoryDataset::new(time)
                .with_signal("arm[1]", vec![1.0, 2.0, 3.0, 4.0, 5.0])
                .with_signal("arm[2]", vec![10.0, 20.0, 30.0, 40.0, 50.0])
                .with_signal("arm[3]", vec![-1.0, -2.0, -3.0, -4.0, -5.0])
                .with_signal("box1.height", vec![1.0; 5])
                .with_constant("box1.density", 7800.0)
                .with_constant("box2.height", 2.0)
                .with_constant("R[1,1]", 1.0)
                .with_constant("R[1,2]", 2.0)
                .with_constant("R[1,3]", 3.0),
        )
    }

    #[test]
    fn exact_and_partial() {
        let s = store();
        assert_eq!(s.resolve_exact("box1.height"), Some("box1.height"));
        assert_eq!(s.resolve_exact("box1"), None);
        assert_eq!(s.resolve_partial("height"), vec!["box1.height", "box2.height"]);
        assert!(s.resolve_partial("nothing").is_empty());
    }

    #[test]
    fn partial_within_keeps_given_order() {
        let s = store();
        let within = ["z.x", "a.x", "b.y"];
        assert_eq!(s.resolve_partial_within(".x", &within), vec!["z.x", "a.x"]);
    }

    #[test]
    fn by_fields() {
        let s = store();
        assert_eq!(s.resolve_by_fields(&["height", "density"]), vec!["box1"]);
    }

    #[test]
    fn at_or_after_sampling() {
        let s = store();
        assert_eq!(s.sample_at("arm[1]", 0.0).unwrap(), 1.0);
        assert_eq!(s.sample_at("arm[1]", 0.3).unwrap(), 3.0);
        assert_eq!(s.sample_at("arm[1]", 0.5).unwrap(), 3.0);
        assert_eq!(s.sample_at("arm[1]", 1.0).unwrap(), 5.0);
    }

    #[test]
    fn constant_returns_first_sample() {
        let s = store();
        for t in [0.0, 0.4, 1.0] {
            assert_eq!(s.sample_at("box1.density", t).unwrap(), 7800.0);
        }
    }

    #[test]
    fn out_of_range_is_distinct_from_not_found() {
        let s = store();
        assert!(matches!(
            s.sample_at("arm[1]", 1.5),
            Err(SignalError::OutOfRange { .. })
        ));
        assert!(matches!(
            s.sample_at("arm[1]", f64::NAN),
            Err(SignalError::OutOfRange { .. })
        ));
        assert!(matches!(
            s.sample_at("nope", 0.5),
            Err(SignalError::NotFound { .. })
        ));
    }

    #[test]
    fn missing_axis_is_not_available() {
        let s = SignalStore::new(MemoryDataset::without_axis().with_signal("x", vec![1.0]));
        assert!(matches!(s.time_axis(), Err(SignalError::NotAvailable)));
        assert!(matches!(
            s.sample_at("x", 0.0),
            Err(SignalError::NotAvailable)
        ));
    }

    #[test]
    fn vector_series_and_instant() {
        let s = store();
        let series = s.resolve_vector("arm", None).unwrap();
        let m = series.as_series().unwrap();
        assert_eq!(m.shape(), (3, 5));
        assert_eq!(m[(1, 4)], 50.0);

        let instant = s.resolve_vector("arm", Some(0.3)).unwrap();
        let v = instant.as_instant().unwrap();
        assert_eq!(*v, Vector3::new(3.0, 30.0, -3.0));

        let outside = s.resolve_vector("arm", Some(7.0)).unwrap();
        assert!(outside.as_series().is_some());
    }

    #[test]
    fn vector_comma_convention_broadcasts_constants() {
        let s = store();
        let m = s.resolve_vector("R[1", None).unwrap();
        let m = m.as_series().unwrap();
        assert_eq!(m.shape(), (3, 5));
        assert_eq!(m[(2, 3)], 3.0);
    }

    #[test]
    fn unresolved_vector_lists_missing_names() {
        let s = store();
        match s.resolve_vector("leg", None) {
            Err(SignalError::UnresolvedVector { base, missing }) => {
                assert_eq!(base, "leg");
                assert!(missing.contains(&"leg[1]".to_string()));
                assert!(missing.contains(&"leg,3]".to_string()));
            }
            other => panic!("unexpected: {other:?}"),
        }
    }

    #[test]
    fn matching_samples() {
        let s = store();
        let values = s.sample_matching("height", 0.5);
        assert_eq!(values.len(), 2);
        assert_eq!(values["box2.height"], 2.0);
    }

    #[test]
    fn expanded_constant_matches_axis() {
        let s = store();
        assert_eq!(s.expanded_series("box2.height").unwrap(), vec![2.0; 5]);
    }
}
