//! Lossy numeric conversions used for binning and statistics.

/// Converts a count into a `f64`.
#[must_use]
pub fn usize_to_f64(value: usize) -> f64 {
    #[allow(clippy::cast_precision_loss)]
    let newval = value as f64;
    newval
}

/// Converts a (non-negative) `f64` into a `usize` by truncation.
///
/// Negative values and `NaN` saturate to 0.
#[must_use]
pub fn f64_to_usize(value: f64) -> usize {
    #[allow(clippy::cast_possible_truncation)]
    #[allow(clippy::cast_sign_loss)]
    let newval = value as usize;
    newval
}
