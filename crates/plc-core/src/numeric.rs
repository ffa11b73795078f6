use crate::CoreError;

/// Floating point type used for every parameter value.
pub type Real = f64;

/// Threshold below which a time constant or gain counts as zero.
pub const EPSILON: Real = 1e-9;

/// Reject NaN and infinities produced by a unit's computation before they
/// reach the parameter map.
pub fn ensure_finite(v: Real, what: &'static str) -> Result<Real, CoreError> {
    if v.is_finite() {
        Ok(v)
    } else {
        Err(CoreError::NonFinite { what, value: v })
    }
}

/// `true` when `v` is large enough to be used as a divisor.
#[inline]
pub fn is_significant(v: Real) -> bool {
    v > EPSILON
}
