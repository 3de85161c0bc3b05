//! Common Types and Constants
//!
//! Shared data structures used by the response model and the posterior solvers.

use serde::{Deserialize, Serialize};

// ==================== Constants ====================

/// Numerical stability epsilon
pub const EPSILON: f64 = 1e-10;

/// Largest logit magnitude fed to `exp`; keeps P strictly inside (0, 1)
pub const MAX_LOGIT: f64 = 30.0;

/// Default lower bound of the ability scale
pub const DEFAULT_THETA_MIN: f64 = -6.0;

/// Default upper bound of the ability scale
pub const DEFAULT_THETA_MAX: f64 = 6.0;

/// Default EAP grid size; 0.1 spacing over the default bounds
pub const DEFAULT_QUADRATURE_POINTS: usize = 121;

/// Width of the logit range a unit-interval difficulty is stretched onto
pub const UNIT_DIFFICULTY_SPAN: f64 = 6.0;

/// Proportion clamp used by the raw-score seed
pub const RAW_SCORE_PROPORTION_MIN: f64 = 0.01;

/// Proportion clamp used by the raw-score seed
pub const RAW_SCORE_PROPORTION_MAX: f64 = 0.99;

// ==================== Item Types ====================

/// 2PL item parameters on the logit scale
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemParams {
    /// Discrimination a (> 0)
    pub discrimination: f64,
    /// Difficulty b (logit)
    pub difficulty: f64,
}

impl ItemParams {
    pub fn new(discrimination: f64, difficulty: f64) -> Self {
        Self {
            discrimination,
            difficulty,
        }
    }
}

/// One scored response against an item
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Observation {
    pub params: ItemParams,
    /// Score in [0, 1]; 1 is fully correct, fractional for graded items
    pub score: f64,
}

impl Observation {
    pub fn new(params: ItemParams, score: f64) -> Self {
        Self { params, score }
    }
}

// ==================== Estimation Types ====================

/// Normal prior over ability
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Prior {
    pub mean: f64,
    /// Standard deviation (> 0)
    pub sd: f64,
}

impl Prior {
    pub fn new(mean: f64, sd: f64) -> Self {
        Self { mean, sd }
    }

    /// Prior precision 1/sd²
    pub fn precision(&self) -> f64 {
        1.0 / (self.sd * self.sd).max(EPSILON)
    }
}

impl Default for Prior {
    fn default() -> Self {
        Self { mean: 0.0, sd: 1.0 }
    }
}

/// Options for the iterative solvers
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SolverOptions {
    /// Newton iteration cap
    pub max_iterations: u32,
    /// Convergence threshold on |Δθ|
    pub tolerance: f64,
    /// Largest single Newton step
    pub max_step: f64,
    pub theta_min: f64,
    pub theta_max: f64,
    /// Grid size for EAP quadrature
    pub quadrature_points: usize,
}

impl Default for SolverOptions {
    fn default() -> Self {
        Self {
            max_iterations: 20,
            tolerance: 1e-6,
            max_step: 1.0,
            theta_min: DEFAULT_THETA_MIN,
            theta_max: DEFAULT_THETA_MAX,
            quadrature_points: DEFAULT_QUADRATURE_POINTS,
        }
    }
}

/// Point estimate with its standard error
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PosteriorEstimate {
    pub theta: f64,
    pub standard_error: f64,
}

/// Result of a converged Newton solve
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewtonSolution {
    pub estimate: PosteriorEstimate,
    pub iterations: u32,
}

/// Newton solve that did not settle within the iteration budget
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NonConvergence {
    pub iterations: u32,
    /// Last iterate (may be non-finite)
    pub last_theta: f64,
}
