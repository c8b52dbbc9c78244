//! Pattern matching over flattened signal names.

use std::collections::BTreeSet;

/// Names containing `stub`, case-sensitive, in the order of `within`.
pub fn partial_matches<'a, I>(stub: &str, within: I) -> Vec<&'a str>
where
    I: IntoIterator<Item = &'a str>,
{
    within.into_iter().filter(|name| name.contains(stub)).collect()
}

/// Parent paths of every dot-separated component of `name` containing `field`.
///
/// `B.frameTranslation.height` with field `height` gives `B.frameTranslation`.
/// A match on the first component has no parent and is skipped.
pub fn parents_with_field(name: &str, field: &str) -> Vec<String> {
    let parts: Vec<&str> = name.split('.').collect();
    parts
        .iter()
        .enumerate()
        .filter(|(i, part)| *i > 0 && part.contains(field))
        .map(|(i, _)| parts[..i].join("."))
        .collect()
}

/// Parents that expose every one of `fields`.
///
/// The first field's parents seed the candidate set; each later field
/// narrows it by intersection. Returned sorted.
pub fn parents_with_all_fields<'a, I>(fields: &[&str], names: I) -> Vec<String>
where
    I: IntoIterator<Item = &'a str> + Clone,
{
    let mut found: Option<BTreeSet<String>> = None;
    for field in fields {
        let parents: BTreeSet<String> = partial_matches(field, names.clone())
            .into_iter()
            .flat_map(|name| parents_with_field(name, field))
            .collect();
        found = Some(match found {
            None => parents,
            Some(previous) => previous.intersection(&parents).cloned().collect(),
        });
        if found.as_ref().is_some_and(BTreeSet::is_empty) {
            break;
        }
    }
    found.map(|set| set.into_iter().collect()).unwrap_or_default()
}

/// Candidate names for the three Cartesian components of `base`, one
/// array per indexing convention, in preference order.
pub fn vector_component_candidates(base: &str) -> [[String; 3]; 2] {
    [
        [1, 2, 3].map(|axis| format!("{base}[{axis}]")),
        [1, 2, 3].map(|axis| format!("{base},{axis}]")),
    ]
}
