//! Cross-product expansion of a sweep specification.

use serde::{Deserialize, Serialize};

use crate::spec::SweepSpec;
use crate::{SweepError, SweepResult};

/// One concrete value per swept parameter, in declaration order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ParameterAssignment {
    #[serde(with = "crate::ordered")]
    values: Vec<(String, f64)>,
}

impl ParameterAssignment {
    pub fn get(&self, name: &str) -> Option<f64> {
        self.values
            .iter()
            .find(|(existing, _)| existing == name)
            .map(|(_, value)| *value)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.values.iter().map(|(name, value)| (name.as_str(), *value))
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    fn extended(&self, name: &str, value: f64) -> Self {
        let mut values = Vec::with_capacity(self.values.len() + 1);
        values.extend(self.values.iter().cloned());
        values.push((name.to_string(), value));
        Self { values }
    }
}

impl FromIterator<(String, f64)> for ParameterAssignment {
    fn from_iter<I: IntoIterator<Item = (String, f64)>>(iter: I) -> Self {
        let mut assignment = Self::default();
        for (name, value) in iter {
            match assignment.values.iter_mut().find(|(existing, _)| *existing == name) {
                Some(slot) => slot.1 = value,
                None => assignment.values.push((name, value)),
            }
        }
        assignment
    }
}

fn resolve_named(name: &str, spec: &crate::RangeSpec) -> SweepResult<Vec<f64>> {
    spec.resolve().map_err(|source| SweepError::Parameter {
        name: name.to_string(),
        source: Box::new(source),
    })
}

/// Expand `spec` into every parameter combination.
///
/// Parameters nest outer-to-inner in declaration order, so the last
/// parameter varies fastest. The result length is the product of the
/// per-parameter value counts; an empty spec yields one empty assignment.
pub fn expand(spec: &SweepSpec) -> SweepResult<Vec<ParameterAssignment>> {
    spec.run_count()?;
    spec.iter()
        .try_fold(vec![ParameterAssignment::default()], |partials, (name, range)| {
            let values = resolve_named(name, range)?;
            Ok(partials
                .iter()
                .flat_map(|partial| values.iter().map(move |&value| partial.extended(name, value)))
                .collect())
        })
}

/// The assignment `expand(spec)[index]` without building the whole grid.
pub fn assignment_at(spec: &SweepSpec, index: usize) -> SweepResult<ParameterAssignment> {
    let count = spec.run_count()?;
    if index >= count {
        return Err(SweepError::IndexOutOfRange { index, count });
    }
    let resolved = spec
        .iter()
        .map(|(name, range)| resolve_named(name, range).map(|values| (name, values)))
        .collect::<SweepResult<Vec<_>>>()?;

    // Mixed-radix decode, last parameter is the least significant digit.
    let mut remainder = index;
    let mut digits = vec![0usize; resolved.len()];
    for (slot, (_, values)) in digits.iter_mut().zip(&resolved).rev() {
        *slot = remainder % values.len();
        remainder /= values.len();
    }

    Ok(resolved
        .iter()
        .zip(digits)
        .map(|((name, values), digit)| (name.to_string(), values[digit]))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::RangeSpec;

    fn two_by_three() -> SweepSpec {
        SweepSpec::new()
            .with("p1", RangeSpec::linear_count(1.0, 2.0, 2))
            .unwrap()
            .with("p2", RangeSpec::linear_count(10.0, 30.0, 3))
            .unwrap()
    }

    #[test]
    fn single_parameter_count() {
        let spec = SweepSpec::new()
            .with("p", RangeSpec::linear_step(0.0, 1.0, 0.25))
            .unwrap();
        let grid = expand(&spec).unwrap();
        assert_eq!(grid.len(), 4);
        let values: Vec<f64> = grid.iter().map(|a| a.get("p").unwrap()).collect();
        assert_eq!(values, vec![0.0, 0.25, 0.5, 0.75]);
    }

    #[test]
    fn last_parameter_varies_fastest() {
        let grid = expand(&two_by_three()).unwrap();
        assert_eq!(grid.len(), 6);
        let pairs: Vec<(f64, f64)> = grid
            .iter()
            .map(|a| (a.get("p1").unwrap(), a.get("p2").unwrap()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                (1.0, 10.0),
                (1.0, 20.0),
                (1.0, 30.0),
                (2.0, 10.0),
                (2.0, 20.0),
                (2.0, 30.0),
            ]
        );
    }

    #[test]
    fn assignments_keep_declaration_order() {
        let grid = expand(&two_by_three()).unwrap();
        let names: Vec<&str> = grid[0].iter().map(|(name, _)| name).collect();
        assert_eq!(names, vec!["p1", "p2"]);
    }

    #[test]
    fn empty_spec_is_one_empty_run() {
        let grid = expand(&SweepSpec::new()).unwrap();
        assert_eq!(grid.len(), 1);
        assert!(grid[0].is_empty());
    }

    #[test]
    fn empty_range_is_a_hard_error() {
        let spec = SweepSpec::new()
            .with("a", RangeSpec::linear_count(0.0, 1.0, 3))
            .unwrap()
            .with("b", RangeSpec::linear_step(1.0, 0.0, 0.5))
            .unwrap();
        let err = expand(&spec).unwrap_err();
        match err {
            SweepError::Parameter { name, source } => {
                assert_eq!(name, "b");
                assert!(matches!(*source, SweepError::EmptyRange { .. }));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn assignment_at_matches_expansion() {
        let spec = two_by_three();
        let grid = expand(&spec).unwrap();
        for (i, expected) in grid.iter().enumerate() {
            assert_eq!(&assignment_at(&spec, i).unwrap(), expected);
        }
        assert!(matches!(
            assignment_at(&spec, 6),
            Err(SweepError::IndexOutOfRange { index: 6, count: 6 })
        ));
    }

    #[test]
    fn assignment_serializes_as_ordered_map() {
        let grid = expand(&two_by_three()).unwrap();
        let json = serde_json::to_string(&grid[1]).unwrap();
        assert_eq!(json, r#"{"p1":1.0,"p2":20.0}"#);
        let back: ParameterAssignment = serde_json::from_str(&json).unwrap();
        assert_eq!(back, grid[1]);
    }
}

#[cfg(test)]
mod proptests {
    use super::*;
    use crate::RangeSpec;
    use proptest::prelude::*;

    proptest! {
        #[test]
        fn grid_size_is_product_of_counts(counts in prop::collection::vec(1usize..5, 0..4)) {
            let mut spec = SweepSpec::new();
            for (i, n) in counts.iter().enumerate() {
                spec.insert(format!("p{i}"), RangeSpec::linear_count(0.0, 1.0, *n)).unwrap();
            }
            let grid = expand(&spec).unwrap();
            let expected: usize = counts.iter().product();
            prop_assert_eq!(grid.len(), expected);
            prop_assert!(grid.iter().all(|a| a.len() == counts.len()));
        }

        #[test]
        fn indexed_lookup_agrees(counts in prop::collection::vec(1usize..4, 1..4), pick in 0usize..64) {
            let mut spec = SweepSpec::new();
            for (i, n) in counts.iter().enumerate() {
                spec.insert(format!("p{i}"), RangeSpec::linear_count(-1.0, 1.0, *n)).unwrap();
            }
            let grid = expand(&spec).unwrap();
            let index = pick % grid.len();
            prop_assert_eq!(&assignment_at(&spec, index).unwrap(), &grid[index]);
        }
    }
}
