//! Posterior Ability Solvers
//!
//! Two estimators over the joint 2PL likelihood with a normal prior:
//! - MAP (Bayes modal) via damped Newton-Raphson, warm-started from the
//!   previous estimate. The prior keeps the mode finite for all-correct or
//!   all-incorrect response patterns.
//! - EAP (expected a posteriori) via fixed-grid quadrature. Always defined,
//!   used directly or as the fallback when Newton does not settle.

use crate::irt::{information, log_likelihood, probability};
use crate::sanitize::{clamp_theta, sanitize_score};
use crate::types::{
    NewtonSolution, NonConvergence, Observation, PosteriorEstimate, Prior, SolverOptions, EPSILON,
};

/// First and second derivative of the log posterior at `theta`
pub fn log_posterior_derivatives(theta: f64, observations: &[Observation], prior: &Prior) -> (f64, f64) {
    let precision = prior.precision();
    let mut gradient = -(theta - prior.mean) * precision;
    let mut hessian = -precision;

    for obs in observations {
        let a = obs.params.discrimination;
        let p = probability(theta, &obs.params);
        gradient += a * (sanitize_score(obs.score) - p);
        hessian -= a * a * p * (1.0 - p);
    }

    (gradient, hessian)
}

/// Observed posterior information (likelihood information plus prior precision)
pub fn posterior_information(theta: f64, observations: &[Observation], prior: &Prior) -> f64 {
    let likelihood: f64 = observations
        .iter()
        .map(|obs| information(theta, &obs.params))
        .sum();
    likelihood + prior.precision()
}

/// Bayes modal estimate via Newton-Raphson
///
/// Steps are capped at `max_step` and iterates are clamped to the ability
/// bounds. Returns `NonConvergence` when the iteration budget runs out or a
/// non-finite derivative shows up; callers decide the fallback.
pub fn map_estimate(
    observations: &[Observation],
    prior: &Prior,
    start: f64,
    options: &SolverOptions,
) -> Result<NewtonSolution, NonConvergence> {
    let mut theta = clamp_theta(start, options.theta_min, options.theta_max);

    for iteration in 1..=options.max_iterations {
        let (gradient, hessian) = log_posterior_derivatives(theta, observations, prior);
        if !gradient.is_finite() || !hessian.is_finite() || hessian > -EPSILON {
            return Err(NonConvergence {
                iterations: iteration,
                last_theta: theta,
            });
        }

        let step = (-gradient / hessian).clamp(-options.max_step, options.max_step);
        let next = clamp_theta(theta + step, options.theta_min, options.theta_max);
        let moved = (next - theta).abs();
        theta = next;

        if moved < options.tolerance {
            let info = posterior_information(theta, observations, prior);
            return Ok(NewtonSolution {
                estimate: PosteriorEstimate {
                    theta,
                    standard_error: 1.0 / info.sqrt(),
                },
                iterations: iteration,
            });
        }
    }

    Err(NonConvergence {
        iterations: options.max_iterations,
        last_theta: theta,
    })
}

/// Expected a posteriori estimate via quadrature over [theta_min, theta_max]
///
/// Reports the posterior mean and posterior standard deviation.
pub fn eap_estimate(
    observations: &[Observation],
    prior: &Prior,
    options: &SolverOptions,
) -> PosteriorEstimate {
    let points = options.quadrature_points.max(2);
    let span = options.theta_max - options.theta_min;
    let step = span / (points - 1) as f64;
    let sd = prior.sd.max(EPSILON);

    let grid: Vec<(f64, f64)> = (0..points)
        .map(|i| {
            let theta = options.theta_min + step * i as f64;
            let z = (theta - prior.mean) / sd;
            (theta, log_likelihood(theta, observations) - 0.5 * z * z)
        })
        .collect();

    let peak = grid
        .iter()
        .map(|&(_, log_weight)| log_weight)
        .fold(f64::NEG_INFINITY, f64::max);

    let mut total = 0.0;
    let mut first = 0.0;
    for &(theta, log_weight) in &grid {
        let weight = (log_weight - peak).exp();
        total += weight;
        first += weight * theta;
    }

    if !(total > EPSILON) || !first.is_finite() {
        return PosteriorEstimate {
            theta: clamp_theta(prior.mean, options.theta_min, options.theta_max),
            standard_error: prior.sd,
        };
    }

    let mean = first / total;
    let second: f64 = grid
        .iter()
        .map(|&(theta, log_weight)| (log_weight - peak).exp() * (theta - mean).powi(2))
        .sum();
    let variance = second / total;

    PosteriorEstimate {
        theta: mean,
        standard_error: variance.sqrt().max(EPSILON),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::ItemParams;

    fn obs(a: f64, b: f64, score: f64) -> Observation {
        Observation::new(ItemParams::new(a, b), score)
    }

    #[test]
    fn test_map_without_observations_returns_prior() {
        let prior = Prior::new(0.3, 1.0);
        let solution = map_estimate(&[], &prior, 0.0, &SolverOptions::default()).unwrap();
        assert!((solution.estimate.theta - 0.3).abs() < 1e-9);
        assert!((solution.estimate.standard_error - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_map_single_incorrect_moves_below_prior() {
        let solution = map_estimate(
            &[obs(1.0, 0.5, 0.0)],
            &Prior::default(),
            0.0,
            &SolverOptions::default(),
        )
        .unwrap();
        assert!(solution.estimate.theta < 0.0);
        assert!(solution.estimate.standard_error < 1.0);
    }

    #[test]
    fn test_map_all_correct_stays_finite() {
        let observations: Vec<Observation> = (0..30).map(|_| obs(1.5, 1.0, 1.0)).collect();
        let solution = map_estimate(
            &observations,
            &Prior::default(),
            0.0,
            &SolverOptions::default(),
        )
        .unwrap();
        assert!(solution.estimate.theta.is_finite());
        assert!(solution.estimate.theta > 1.0);
        assert!(solution.estimate.theta <= SolverOptions::default().theta_max);
    }

    #[test]
    fn test_map_gradient_vanishes_at_mode() {
        let observations = vec![obs(1.0, 0.0, 1.0), obs(1.2, 0.5, 0.0), obs(0.8, -0.5, 1.0)];
        let prior = Prior::default();
        let solution =
            map_estimate(&observations, &prior, 0.0, &SolverOptions::default()).unwrap();
        let (gradient, hessian) =
            log_posterior_derivatives(solution.estimate.theta, &observations, &prior);
        assert!(gradient.abs() < 1e-5);
        assert!(hessian < 0.0);
    }

    #[test]
    fn test_map_reports_non_convergence_when_budget_exhausted() {
        let options = SolverOptions {
            max_iterations: 1,
            ..SolverOptions::default()
        };
        let observations: Vec<Observation> = (0..10).map(|_| obs(1.0, 2.0, 1.0)).collect();
        let result = map_estimate(&observations, &Prior::default(), -3.0, &options);
        let failure = result.unwrap_err();
        assert_eq!(failure.iterations, 1);
    }

    #[test]
    fn test_map_respects_bounds() {
        let options = SolverOptions {
            theta_min: -1.0,
            theta_max: 1.0,
            ..SolverOptions::default()
        };
        let observations: Vec<Observation> = (0..40).map(|_| obs(2.0, 2.0, 1.0)).collect();
        let solution = map_estimate(&observations, &Prior::new(0.0, 3.0), 0.0, &options).unwrap();
        assert_eq!(solution.estimate.theta, 1.0);
    }

    #[test]
    fn test_eap_without_observations_matches_prior() {
        let estimate = eap_estimate(&[], &Prior::default(), &SolverOptions::default());
        assert!(estimate.theta.abs() < 1e-9);
        assert!((estimate.standard_error - 1.0).abs() < 0.01);
    }

    #[test]
    fn test_eap_moves_with_evidence() {
        let prior = Prior::default();
        let options = SolverOptions::default();
        let up = eap_estimate(&[obs(1.0, 0.0, 1.0)], &prior, &options);
        let down = eap_estimate(&[obs(1.0, 0.0, 0.0)], &prior, &options);
        assert!(up.theta > 0.0);
        assert!(down.theta < 0.0);
        assert!((up.theta + down.theta).abs() < 1e-9);
    }

    #[test]
    fn test_eap_close_to_map_with_many_observations() {
        let observations = vec![
            obs(1.0, -1.0, 1.0),
            obs(1.0, -0.5, 1.0),
            obs(1.0, 0.0, 1.0),
            obs(1.0, 0.5, 0.0),
            obs(1.0, 1.0, 0.0),
            obs(1.0, 0.2, 1.0),
        ];
        let prior = Prior::default();
        let options = SolverOptions::default();
        let map = map_estimate(&observations, &prior, 0.0, &options).unwrap();
        let eap = eap_estimate(&observations, &prior, &options);
        assert!((map.estimate.theta - eap.theta).abs() < 0.15);
    }
}
