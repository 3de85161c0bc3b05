//! Ability Estimator
//!
//! Two-state machine (`Provisional` -> `Converged`) over a running posterior.
//! Each update re-solves over every observation recorded so far; MAP solves
//! are warm-started from the previous estimate and fall back to EAP when
//! Newton-Raphson does not settle.

use placement_algo::{
    eap_estimate, map_estimate, ItemParams, Observation, Prior, SolverOptions,
};
use placement_algo::sanitize::{clamp_theta, sanitize_score};

use crate::assessment::config::{EstimationMethod, EstimatorConfig};
use crate::assessment::types::{AbilityEstimate, EstimateSource, EstimatorPhase};

#[derive(Debug, Clone)]
pub struct AbilityEstimator {
    method: EstimationMethod,
    min_responses: u32,
    prior: Prior,
    options: SolverOptions,
    observations: Vec<Observation>,
    current: AbilityEstimate,
    fallback_count: u32,
}

impl AbilityEstimator {
    pub fn new(config: &EstimatorConfig) -> Self {
        let prior = config.prior();
        let options = config.solver_options();
        let current = AbilityEstimate {
            theta: clamp_theta(prior.mean, options.theta_min, options.theta_max),
            standard_error: prior.sd,
            responses: 0,
            phase: phase_for(0, config.min_responses),
            source: EstimateSource::Prior,
        };

        Self {
            method: config.method,
            min_responses: config.min_responses,
            prior,
            options,
            observations: Vec::new(),
            current,
            fallback_count: 0,
        }
    }

    /// Fold one scored response into the posterior and return the new estimate
    pub fn update(&mut self, params: ItemParams, score: f64) -> AbilityEstimate {
        self.observations
            .push(Observation::new(params, sanitize_score(score)));
        let responses = self.observations.len() as u32;

        let (estimate, source) = match self.method {
            EstimationMethod::Eap => (
                eap_estimate(&self.observations, &self.prior, &self.options),
                EstimateSource::Eap,
            ),
            EstimationMethod::Map => match map_estimate(
                &self.observations,
                &self.prior,
                self.current.theta,
                &self.options,
            ) {
                Ok(solution) => (solution.estimate, EstimateSource::Map),
                Err(failure) => {
                    self.fallback_count = self.fallback_count.saturating_add(1);
                    tracing::warn!(
                        iterations = failure.iterations,
                        last_theta = failure.last_theta,
                        responses,
                        "MAP estimate did not converge, using EAP"
                    );
                    (
                        eap_estimate(&self.observations, &self.prior, &self.options),
                        EstimateSource::Fallback,
                    )
                }
            },
        };

        self.current = AbilityEstimate {
            theta: estimate.theta,
            standard_error: estimate.standard_error,
            responses,
            phase: phase_for(responses, self.min_responses),
            source,
        };

        tracing::debug!(
            theta = self.current.theta,
            se = self.current.standard_error,
            responses,
            source = ?source,
            "ability updated"
        );

        self.current
    }

    /// Rebuild from scratch by feeding `observations` one at a time.
    ///
    /// Incremental replay reproduces the warm-start chain of the original
    /// run, so the resulting estimate is bit-identical.
    pub fn replay(&mut self, observations: &[Observation]) -> AbilityEstimate {
        let config_min = self.min_responses;
        self.observations.clear();
        self.fallback_count = 0;
        self.current = AbilityEstimate {
            theta: clamp_theta(self.prior.mean, self.options.theta_min, self.options.theta_max),
            standard_error: self.prior.sd,
            responses: 0,
            phase: phase_for(0, config_min),
            source: EstimateSource::Prior,
        };
        for obs in observations {
            self.update(obs.params, obs.score);
        }
        self.current
    }

    pub fn estimate(&self) -> AbilityEstimate {
        self.current
    }

    pub fn phase(&self) -> EstimatorPhase {
        self.current.phase
    }

    pub fn is_converged(&self) -> bool {
        self.current.phase == EstimatorPhase::Converged
    }

    pub fn response_count(&self) -> u32 {
        self.current.responses
    }

    /// Number of updates that had to fall back from MAP to EAP
    pub fn fallback_count(&self) -> u32 {
        self.fallback_count
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }
}

fn phase_for(responses: u32, min_responses: u32) -> EstimatorPhase {
    if responses >= min_responses {
        EstimatorPhase::Converged
    } else {
        EstimatorPhase::Provisional
    }
}
