//! Data Sanitization
//!
//! Numerical stability utilities.
//!
//! Functions:
//! - Logit clamping before exponentiation
//! - Ability clamping to the configured scale
//! - Score and parameter validation

use crate::types::{EPSILON, MAX_LOGIT};

/// Check whether a slice contains NaN or Inf
pub fn has_invalid_values(arr: &[f64]) -> bool {
    arr.iter().any(|&x| x.is_nan() || x.is_infinite())
}

/// Clamp a logit so `exp(±z)` neither overflows nor rounds P to 0 or 1
pub fn clamp_logit(z: f64) -> f64 {
    if z.is_nan() {
        return 0.0;
    }
    z.clamp(-MAX_LOGIT, MAX_LOGIT)
}

/// Clamp an ability to [min, max]; NaN collapses to the midpoint
pub fn clamp_theta(theta: f64, min: f64, max: f64) -> f64 {
    if theta.is_nan() {
        return (min + max) / 2.0;
    }
    theta.clamp(min, max)
}

/// Map a score into [0, 1]; NaN is scored as incorrect
pub fn sanitize_score(score: f64) -> f64 {
    if score.is_nan() {
        return 0.0;
    }
    score.clamp(0.0, 1.0)
}

/// Discrimination must be finite and strictly positive
pub fn is_valid_discrimination(a: f64) -> bool {
    a.is_finite() && a > EPSILON
}

/// Difficulty must be finite
pub fn is_valid_difficulty(b: f64) -> bool {
    b.is_finite()
}

/// Cut points must be finite and strictly ascending
pub fn is_strictly_ascending(points: &[f64]) -> bool {
    !has_invalid_values(points) && points.windows(2).all(|w| w[0] < w[1])
}
