use crate::SwError;

/// Floating point type used for parameter values and samples.
pub type Real = f64;

pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, SwError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(SwError::NonFinite { what, value: v })
    }
}
