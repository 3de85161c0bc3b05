//! Cohort simulation
//!
//! Synthetic learners answer items according to the same 2PL model the
//! engine estimates with, which makes it easy to check how close placements
//! land to the true ability. Each learner gets its own seeded RNG, so a
//! cohort run is reproducible regardless of how rayon schedules it.

use std::collections::BTreeMap;

use placement_algo::probability;
use rand::prelude::*;
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::assessment::bank::Item;
use crate::assessment::engine::PlacementEngine;
use crate::assessment::placement::PlacementResult;
use crate::assessment::session::ItemPresenter;
use crate::assessment::types::{Response, ResponseOutcome, StopReason};
use crate::error::AssessmentResult;

/// Range true abilities are drawn from
const ABILITY_RANGE: (f64, f64) = (-2.5, 2.5);
/// Simulated time spent per item
const RESPONSE_INTERVAL_MS: i64 = 15_000;
/// Open responses are graded in quarter steps
const GRADE_STEPS: f64 = 4.0;

// ==================== Learner ====================

pub struct SimulatedLearner {
    true_theta: f64,
    skip_rate: f64,
    rng: ChaCha8Rng,
    clock_ms: i64,
}

impl SimulatedLearner {
    pub fn new(true_theta: f64, seed: u64) -> Self {
        Self {
            true_theta,
            skip_rate: 0.0,
            rng: ChaCha8Rng::seed_from_u64(seed),
            clock_ms: 0,
        }
    }

    /// Probability of letting an item time out
    pub fn with_skip_rate(mut self, skip_rate: f64) -> Self {
        self.skip_rate = skip_rate.clamp(0.0, 1.0);
        self
    }

    pub fn true_theta(&self) -> f64 {
        self.true_theta
    }

    fn outcome_for(&mut self, item: &Item) -> ResponseOutcome {
        if self.skip_rate > 0.0 && self.rng.gen::<f64>() < self.skip_rate {
            return ResponseOutcome::NoResponse;
        }

        let p = probability(self.true_theta, &item.params());
        if item.is_open_response() {
            // stand-in for the speech recognizer's partial credit
            let noisy = (p + self.rng.gen_range(-0.25..0.25)).clamp(0.0, 1.0);
            let score = (noisy * GRADE_STEPS).round() / GRADE_STEPS;
            return ResponseOutcome::Graded { score };
        }

        if self.rng.gen::<f64>() < p {
            ResponseOutcome::Correct
        } else {
            ResponseOutcome::Incorrect
        }
    }
}

impl ItemPresenter for SimulatedLearner {
    fn present(&mut self, item: &Item) -> Response {
        self.clock_ms += RESPONSE_INTERVAL_MS;
        let outcome = self.outcome_for(item);
        Response::new(item.id(), outcome, self.clock_ms)
    }
}

// ==================== Cohort ====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SimulationOutcome {
    pub learner: usize,
    pub true_theta: f64,
    pub result: PlacementResult,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CohortSummary {
    pub learners: usize,
    pub mean_items: f64,
    pub mean_standard_error: f64,
    pub mean_absolute_error: f64,
    pub rmse: f64,
    pub stop_reasons: BTreeMap<StopReason, u32>,
    pub levels: BTreeMap<u32, u32>,
}

/// Draw `count` true abilities uniformly from the simulation range
pub fn sample_abilities(count: usize, seed: u64) -> Vec<f64> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..count)
        .map(|_| rng.gen_range(ABILITY_RANGE.0..ABILITY_RANGE.1))
        .collect()
}

/// Run one full session per learner, in parallel
pub fn simulate_cohort(
    engine: &PlacementEngine,
    abilities: &[f64],
    seed: u64,
    skip_rate: f64,
) -> AssessmentResult<Vec<SimulationOutcome>> {
    abilities
        .par_iter()
        .enumerate()
        .map(|(learner, &true_theta)| -> AssessmentResult<SimulationOutcome> {
            let mut presenter = SimulatedLearner::new(true_theta, seed.wrapping_add(learner as u64))
                .with_skip_rate(skip_rate);
            let mut session = engine.new_session()?;
            let result = session.run(&mut presenter)?;
            Ok(SimulationOutcome {
                learner,
                true_theta,
                result,
            })
        })
        .collect()
}

pub fn summarize(outcomes: &[SimulationOutcome]) -> CohortSummary {
    let mut stop_reasons = BTreeMap::new();
    let mut levels = BTreeMap::new();
    let mut items = 0.0;
    let mut se = 0.0;
    let mut abs_error = 0.0;
    let mut sq_error = 0.0;

    for outcome in outcomes {
        let result = &outcome.result;
        let error = result.theta - outcome.true_theta;
        items += result.items_administered as f64;
        se += result.standard_error;
        abs_error += error.abs();
        sq_error += error * error;
        *stop_reasons.entry(result.stop_reason).or_insert(0) += 1;
        *levels.entry(result.level).or_insert(0) += 1;
    }

    let n = outcomes.len().max(1) as f64;
    CohortSummary {
        learners: outcomes.len(),
        mean_items: items / n,
        mean_standard_error: se / n,
        mean_absolute_error: abs_error / n,
        rmse: (sq_error / n).sqrt(),
        stop_reasons,
        levels,
    }
}
