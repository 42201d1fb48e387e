//! Elementwise tolerance comparison.
//!
//! Closeness follows the usual numeric-testing definition:
//! `|actual - expected| <= atol + rtol * |expected|`. NaN on either side
//! never compares close. The harness aggregates mismatches into a count
//! per output tensor rather than failing on the first difference.

/// Returns true if `actual` is within tolerance of `expected`.
pub fn is_close(actual: f32, expected: f32, rtol: f32, atol: f32) -> bool {
    if actual.is_nan() || expected.is_nan() {
        return false;
    }
    (actual - expected).abs() <= atol + rtol * expected.abs()
}

/// Counts the elements of `actual` that are out of tolerance.
///
/// A length difference counts every excess or missing element as a
/// mismatch.
pub fn count_mismatches(actual: &[f32], expected: &[f32], rtol: f32, atol: f32) -> usize {
    let common = actual.len().min(expected.len());
    let mut mismatches = actual.len().abs_diff(expected.len());
    for i in 0..common {
        if !is_close(actual[i], expected[i], rtol, atol) {
            mismatches += 1;
        }
    }
    mismatches
}
