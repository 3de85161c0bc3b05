//! # placement-algo - Adaptive placement testing numeric core
//!
//! Pure Rust implementation of the numerics behind adaptive placement tests:
//!
//! - **2PL Response Model** - probability of a correct response and Fisher information
//! - **Posterior Solvers** - Bayes modal (Newton-Raphson) and EAP (quadrature) ability estimates
//! - **Reporting Helpers** - reliability, expected score, raw-score seeding
//!
//! ## Design
//!
//! - **Pure** - no I/O, no logging, no global state; identical inputs give identical outputs
//! - **Numerically guarded** - logits are clamped so probabilities never reach 0 or 1
//! - **Recoverable failures as values** - a Newton solve that does not settle returns
//!   [`NonConvergence`] instead of panicking
//!
//! ## Module Layout
//!
//! - [`irt`] - response model and reporting helpers
//! - [`posterior`] - MAP and EAP ability solvers
//! - [`sanitize`] - clamping and validation helpers
//! - [`types`] - shared types and constants
//!
//! ## Example
//!
//! ```rust
//! use placement_algo::{irt, posterior, ItemParams, Observation, Prior, SolverOptions};
//!
//! let item = ItemParams::new(1.0, 0.5);
//! assert!(irt::probability(0.0, &item) < 0.5);
//!
//! let observations = [Observation::new(item, 0.0)];
//! let solution = posterior::map_estimate(
//!     &observations,
//!     &Prior::default(),
//!     0.0,
//!     &SolverOptions::default(),
//! )
//! .unwrap();
//! assert!(solution.estimate.theta < 0.0);
//! ```

// ============================================================================
// Modules
// ============================================================================

pub mod irt;
pub mod posterior;
pub mod sanitize;
pub mod types;

// ============================================================================
// Re-exports
// ============================================================================

/// Re-export all public types
pub use types::*;

/// Re-export the response model
pub use irt::{information, probability};

/// Re-export the posterior solvers
pub use posterior::{eap_estimate, map_estimate};
