//! Adaptive placement assessment
//!
//! bank -> selector -> session -> estimator -> placement, with snapshots for
//! checkpoint and resume.

pub mod bank;
pub mod config;
pub mod engine;
pub mod estimator;
pub mod placement;
pub mod selector;
pub mod session;
pub mod snapshot;
pub mod types;

pub use bank::{DifficultyScale, Item, ItemBank, ItemSpec, Prompt, ResponseFormat};
pub use config::{AssessmentConfig, EstimationMethod};
pub use engine::{PlacementEngine, SharedSession};
pub use estimator::AbilityEstimator;
pub use placement::{
    describe_growth, CategoryAbility, Curriculum, Growth, LearningModule, ModuleDecision,
    ModuleUnlock, PlacementMapper, PlacementResult,
};
pub use selector::{CoverageTracker, ItemSelector};
pub use session::{AssessmentSession, ItemPresenter, NextStep, ResponseReceipt};
pub use snapshot::{restore_session, serialize_session, SessionSnapshot, SNAPSHOT_VERSION};
pub use types::{
    AbilityEstimate, AdministeredItem, Category, EstimateSource, EstimatorPhase, ItemId,
    ModuleId, Response, ResponseOutcome, SessionStatus, StopReason,
};
