//! Engine override rendering.
//!
//! Values are written in scientific notation with three decimals in the
//! mantissa and a signed, two-digit minimum exponent (`2.500e-01`).

use crate::expand::ParameterAssignment;

/// Render one value the way the engine override parser expects.
pub fn format_override_value(value: f64) -> String {
    if value.is_nan() {
        return "nan".to_string();
    }
    if value.is_infinite() {
        return if value > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    let raw = format!("{value:.3e}");
    match raw.split_once('e') {
        Some((mantissa, exponent)) => {
            let exponent: i32 = exponent.parse().unwrap_or(0);
            let sign = if exponent < 0 { '-' } else { '+' };
            format!("{mantissa}e{sign}{:02}", exponent.abs())
        }
        None => raw,
    }
}

/// `name=value` pairs joined by commas, no trailing separator.
pub fn override_string(assignment: &ParameterAssignment) -> String {
    assignment
        .iter()
        .map(|(name, value)| format!("{name}={}", format_override_value(value)))
        .collect::<Vec<_>>()
        .join(",")
}

/// Override file body: one `name=value` pair per line.
pub fn override_lines(assignment: &ParameterAssignment) -> String {
    assignment
        .iter()
        .map(|(name, value)| format!("{name}={}\n", format_override_value(value)))
        .collect()
}

/// Override string with whitespace removed, embedded in artifact file names.
pub fn override_tag(assignment: &ParameterAssignment) -> String {
    override_string(assignment)
        .chars()
        .filter(|c| !c.is_whitespace())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assignment(pairs: &[(&str, f64)]) -> ParameterAssignment {
        pairs
            .iter()
            .map(|(name, value)| (name.to_string(), *value))
            .collect()
    }

    #[test]
    fn scientific_formatting() {
        assert_eq!(format_override_value(0.25), "2.500e-01");
        assert_eq!(format_override_value(1500.0), "1.500e+03");
        assert_eq!(format_override_value(-6e-3), "-6.000e-03");
        assert_eq!(format_override_value(0.0), "0.000e+00");
        assert_eq!(format_override_value(1.23456e120), "1.235e+120");
    }

    #[test]
    fn override_string_has_no_trailing_comma() {
        let a = assignment(&[("R", 1.35), ("Lw", 6e-3)]);
        assert_eq!(override_string(&a), "R=1.350e+00,Lw=6.000e-03");
    }

    #[test]
    fn empty_assignment_renders_empty() {
        assert_eq!(override_string(&ParameterAssignment::default()), "");
        assert_eq!(override_lines(&ParameterAssignment::default()), "");
    }

    #[test]
    fn override_lines_one_per_line() {
        let a = assignment(&[("cor", 0.1), ("h", 2.0)]);
        assert_eq!(override_lines(&a), "cor=1.000e-01\nh=2.000e+00\n");
    }

    #[test]
    fn tag_strips_whitespace() {
        let a = assignment(&[("spring.c", 10.0)]);
        assert_eq!(override_tag(&a), "spring.c=1.000e+01");
    }
}
