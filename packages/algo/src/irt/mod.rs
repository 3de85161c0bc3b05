//! Two-Parameter Logistic Response Model
//!
//! Core formulas:
//! - P(correct | θ) = 1 / (1 + exp(-a·(θ - b)))
//! - I(θ) = a² · P(θ) · (1 - P(θ))
//!
//! The logit is clamped before exponentiation so P stays strictly inside (0, 1)
//! for any finite θ, which keeps log-likelihoods and information finite.

use crate::sanitize::{clamp_logit, clamp_theta, sanitize_score};
use crate::types::{
    ItemParams, Observation, EPSILON, RAW_SCORE_PROPORTION_MAX, RAW_SCORE_PROPORTION_MIN,
    UNIT_DIFFICULTY_SPAN,
};

// ==================== Response Model ====================

/// Probability of a correct response at ability `theta`
pub fn probability(theta: f64, params: &ItemParams) -> f64 {
    let z = clamp_logit(params.discrimination * (theta - params.difficulty));
    1.0 / (1.0 + (-z).exp())
}

/// Fisher information of one item at `theta`
pub fn information(theta: f64, params: &ItemParams) -> f64 {
    let p = probability(theta, params);
    params.discrimination * params.discrimination * p * (1.0 - p)
}

/// Sum of item information over a set of items
pub fn test_information<'a, I>(theta: f64, items: I) -> f64
where
    I: IntoIterator<Item = &'a ItemParams>,
{
    items
        .into_iter()
        .map(|params| information(theta, params))
        .sum()
}

/// Log-likelihood of scored responses at `theta`
///
/// Graded scores use the fractional form `u·ln P + (1-u)·ln(1-P)`.
pub fn log_likelihood(theta: f64, observations: &[Observation]) -> f64 {
    observations
        .iter()
        .map(|obs| {
            let p = probability(theta, &obs.params);
            let u = sanitize_score(obs.score);
            u * p.ln() + (1.0 - u) * (1.0 - p).ln()
        })
        .sum()
}

/// Standard error implied by an amount of information
pub fn standard_error(total_information: f64) -> f64 {
    if total_information > EPSILON {
        1.0 / total_information.sqrt()
    } else {
        f64::INFINITY
    }
}

// ==================== Reporting Helpers ====================

/// Reliability coefficient I / (1 + I)
pub fn reliability(total_information: f64) -> f64 {
    let info = total_information.max(0.0);
    info / (1.0 + info)
}

/// Expected percentage correct over `items` at `theta` (0-100)
pub fn expected_score<'a, I>(theta: f64, items: I) -> f64
where
    I: IntoIterator<Item = &'a ItemParams>,
{
    let mut total = 0.0;
    let mut count = 0usize;
    for params in items {
        total += probability(theta, params);
        count += 1;
    }
    if count == 0 {
        return 0.0;
    }
    total / count as f64 * 100.0
}

/// Rough ability from a raw score, for hosts without response history
pub fn raw_score_to_theta(correct: u32, total: u32, theta_min: f64, theta_max: f64) -> f64 {
    if total == 0 {
        return clamp_theta(0.0, theta_min, theta_max);
    }
    let proportion = (correct.min(total) as f64 / total as f64)
        .clamp(RAW_SCORE_PROPORTION_MIN, RAW_SCORE_PROPORTION_MAX);
    let theta = (proportion / (1.0 - proportion)).ln();
    clamp_theta(theta, theta_min, theta_max)
}

/// Map a unit-interval difficulty onto the logit scale
pub fn rescale_unit_difficulty(raw: f64) -> f64 {
    (raw - 0.5) * UNIT_DIFFICULTY_SPAN
}

#[cfg(test)]
mod tests {
    use super::*;

    fn item(a: f64, b: f64) -> ItemParams {
        ItemParams::new(a, b)
    }

    #[test]
    fn test_probability_at_difficulty_is_half() {
        let p = probability(0.7, &item(1.3, 0.7));
        assert!((p - 0.5).abs() < 1e-12);
    }

    #[test]
    fn test_probability_stays_open_interval_at_extremes() {
        let params = item(3.0, 0.0);
        for theta in [-1e6, -50.0, -6.0, 6.0, 50.0, 1e6] {
            let p = probability(theta, &params);
            assert!(p > 0.0 && p < 1.0, "p={} at theta={}", p, theta);
        }
    }

    #[test]
    fn test_probability_monotonic_in_theta() {
        let params = item(1.0, 0.5);
        let low = probability(-1.0, &params);
        let high = probability(1.0, &params);
        assert!(high > low);
    }

    #[test]
    fn test_probability_monotonic_in_difficulty() {
        let easy = probability(0.0, &item(1.0, -1.0));
        let hard = probability(0.0, &item(1.0, 1.0));
        assert!(easy > hard);
    }

    #[test]
    fn test_information_peaks_at_difficulty() {
        let params = item(1.5, 0.4);
        let at_b = information(0.4, &params);
        assert!((at_b - 1.5 * 1.5 * 0.25).abs() < 1e-12);
        assert!(information(1.4, &params) < at_b);
        assert!(information(-0.6, &params) < at_b);
    }

    #[test]
    fn test_information_prefers_closer_difficulty() {
        let near = information(0.0, &item(1.0, 0.5));
        let far = information(0.0, &item(1.0, 0.6));
        assert!(near > far);
    }

    #[test]
    fn test_test_information_is_sum() {
        let items = vec![item(1.0, 0.0), item(2.0, 1.0)];
        let total = test_information(0.5, &items);
        let manual = information(0.5, &items[0]) + information(0.5, &items[1]);
        assert!((total - manual).abs() < 1e-12);
    }

    #[test]
    fn test_log_likelihood_finite_for_extreme_theta() {
        let obs = vec![
            Observation::new(item(2.0, 0.0), 1.0),
            Observation::new(item(2.0, 0.0), 0.0),
        ];
        assert!(log_likelihood(1e6, &obs).is_finite());
        assert!(log_likelihood(-1e6, &obs).is_finite());
    }

    #[test]
    fn test_log_likelihood_graded_between_extremes() {
        let params = item(1.0, 0.0);
        let full = log_likelihood(1.0, &[Observation::new(params, 1.0)]);
        let none = log_likelihood(1.0, &[Observation::new(params, 0.0)]);
        let half = log_likelihood(1.0, &[Observation::new(params, 0.5)]);
        assert!(half < full);
        assert!(half > none);
    }

    #[test]
    fn test_standard_error() {
        assert!((standard_error(4.0) - 0.5).abs() < 1e-12);
        assert!(standard_error(0.0).is_infinite());
    }

    #[test]
    fn test_reliability() {
        assert_eq!(reliability(0.0), 0.0);
        assert!((reliability(1.0) - 0.5).abs() < 1e-12);
        assert!(reliability(100.0) < 1.0);
        assert_eq!(reliability(-3.0), 0.0);
    }

    #[test]
    fn test_expected_score() {
        let items = vec![item(1.0, 0.0), item(1.0, 0.0)];
        assert!((expected_score(0.0, &items) - 50.0).abs() < 1e-9);
        assert_eq!(expected_score(0.0, &Vec::<ItemParams>::new()), 0.0);
    }

    #[test]
    fn test_raw_score_to_theta() {
        assert_eq!(raw_score_to_theta(0, 0, -4.0, 4.0), 0.0);
        assert!((raw_score_to_theta(5, 10, -4.0, 4.0)).abs() < 1e-12);
        assert!(raw_score_to_theta(8, 10, -4.0, 4.0) > 0.0);
        assert!(raw_score_to_theta(2, 10, -4.0, 4.0) < 0.0);
        let ceiling = raw_score_to_theta(10, 10, -4.0, 4.0);
        assert!(ceiling.is_finite() && ceiling <= 4.0);
        assert_eq!(raw_score_to_theta(10, 10, -2.0, 2.0), 2.0);
    }

    #[test]
    fn test_rescale_unit_difficulty() {
        assert_eq!(rescale_unit_difficulty(0.5), 0.0);
        assert_eq!(rescale_unit_difficulty(0.0), -3.0);
        assert_eq!(rescale_unit_difficulty(1.0), 3.0);
    }
}
