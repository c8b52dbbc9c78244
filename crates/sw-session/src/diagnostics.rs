//! Interpretation of the engine's free-form diagnostic text.
//!
//! These parsers are tied to the engine's exact wording. Each pattern is
//! pinned by a test using literal engine output.

use serde::{Deserialize, Serialize};

/// Token the engine logs when a simulation run completes.
pub const SUCCESS_MARKER: &str = "LOG_SUCCESS";

/// Outcome of `checkModel`. Counts are `None` when the engine did not report them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckReport {
    pub success: bool,
    pub equation_count: Option<u32>,
    pub variable_count: Option<u32>,
    pub trivial_count: Option<u32>,
}

/// Parse the text returned by `checkModel(name)`.
///
/// Recognised phrases:
/// - `completed successfully`
/// - `has N equation(s) and M variable(s)`
/// - `K of these are trivial`
pub fn parse_check_model(text: &str) -> CheckReport {
    let success = find_phrase(text, &["completed", "successfully"]).is_some();

    let (equation_count, variable_count) = text
        .match_indices("equation(s)")
        .find_map(|(at, anchor)| {
            let head = &text[..at];
            let equations = number_before(head)?;
            let head = strip_number_and_separator(head)?;
            if !head.ends_with("has") {
                return None;
            }
            let tail = strip_separator(&text[at + anchor.len()..])?;
            let tail = strip_separator(tail.strip_prefix("and")?)?;
            let (variables, tail) = leading_number(tail)?;
            strip_separator(tail)?.starts_with("variable").then_some((equations, variables))
        })
        .map_or((None, None), |(e, v)| (Some(e), Some(v)));

    let trivial_count = find_phrase(text, &["of", "these", "are", "trivial"])
        .and_then(|at| number_before(&text[..at]));

    CheckReport {
        success,
        equation_count,
        variable_count,
        trivial_count,
    }
}

/// True when the simulation messages carry the completion marker.
pub fn simulation_succeeded(messages: &str) -> bool {
    messages.contains(SUCCESS_MARKER)
}

fn is_separator(c: char) -> bool {
    !(c.is_alphanumeric() || c == '_')
}

fn strip_separator(text: &str) -> Option<&str> {
    let mut chars = text.chars();
    chars.next().filter(|c| is_separator(*c))?;
    Some(chars.as_str())
}

/// Byte offset of `words` appearing in order, each pair joined by exactly
/// one non-word character.
fn find_phrase(text: &str, words: &[&str]) -> Option<usize> {
    let (first, others) = words.split_first()?;
    text.match_indices(first).map(|(at, _)| at).find(|&at| {
        let mut rest = &text[at + first.len()..];
        for word in others {
            match strip_separator(rest).and_then(|r| r.strip_prefix(word)) {
                Some(next) => rest = next,
                None => return false,
            }
        }
        true
    })
}

/// Integer immediately before `head`'s final separator character.
fn number_before(head: &str) -> Option<u32> {
    let mut chars = head.chars();
    chars.next_back().filter(|c| is_separator(*c))?;
    let body = chars.as_str();
    let digits_start = body.trim_end_matches(|c: char| c.is_ascii_digit()).len();
    body[digits_start..].parse().ok()
}

fn strip_number_and_separator(head: &str) -> Option<&str> {
    let mut chars = head.chars();
    chars.next_back().filter(|c| is_separator(*c))?;
    let body = chars.as_str().trim_end_matches(|c: char| c.is_ascii_digit());
    let mut chars = body.chars();
    chars.next_back().filter(|c| is_separator(*c))?;
    Some(chars.as_str())
}

fn leading_number(text: &str) -> Option<(u32, &str)> {
    let end = text
        .find(|c: char| !c.is_ascii_digit())
        .unwrap_or(text.len());
    let value = text[..end].parse().ok()?;
    Some((value, &text[end..]))
}
