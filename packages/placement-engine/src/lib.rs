//! Adaptive placement-assessment engine.
//!
//! Selects items by maximum Fisher information under a 2PL model, keeps a
//! running Bayesian ability estimate, stops on item count, precision or bank
//! exhaustion, and maps the final estimate onto a curriculum unlock plan.
//!
//! ```
//! use placement_engine::assessment::{AssessmentConfig, PlacementEngine, Response, ResponseOutcome};
//! use placement_engine::assessment::Item;
//!
//! let engine = PlacementEngine::with_sample_data(AssessmentConfig::default()).unwrap();
//! let mut session = engine.new_session().unwrap();
//! let mut presenter = |item: &Item| Response::new(item.id(), ResponseOutcome::Correct, 0);
//! let result = session.run(&mut presenter).unwrap();
//! assert!(result.theta > 0.0);
//! ```

pub mod assessment;
pub mod config;
pub mod error;
pub mod logging;
pub mod simulation;

pub use assessment::{AssessmentSession, PlacementEngine, PlacementResult};
pub use error::{AssessmentError, AssessmentResult};
