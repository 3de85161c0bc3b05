use std::path::PathBuf;

use thiserror::Error;

use crate::assessment::types::{Category, ItemId, ModuleId, SessionStatus};

pub type AssessmentResult<T> = Result<T, AssessmentError>;

/// Fatal configuration problems. Loading aborts; no partial bank is exposed.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("item bank is empty")]
    EmptyBank,
    #[error("duplicate item id {0}")]
    DuplicateItem(ItemId),
    #[error("item {id}: discrimination must be finite and > 0, got {value}")]
    InvalidDiscrimination { id: ItemId, value: f64 },
    #[error("item {id}: difficulty must be finite, got {value}")]
    InvalidDifficulty { id: ItemId, value: f64 },
    #[error("item {id}: {reason}")]
    MalformedItem { id: ItemId, reason: String },
    #[error("curriculum is empty")]
    EmptyCurriculum,
    #[error("curriculum: duplicate module id {0}")]
    DuplicateModule(ModuleId),
    #[error("curriculum: module {0} must have a level >= 1")]
    InvalidModuleLevel(ModuleId),
    #[error("mandatory category {0} has no items in the bank")]
    MissingMandatoryCategory(Category),
    #[error("no eligible items to start a session")]
    NoEligibleItems,
    #[error("invalid configuration: {0}")]
    Invalid(String),
    #[error("failed to parse {what}: {source}")]
    Parse {
        what: &'static str,
        source: serde_json::Error,
    },
    #[error("failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
}

/// Caller misuse of the session state machine. Surfaced, never retried.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SessionStateError {
    #[error("session has not been started")]
    NotStarted,
    #[error("session has already been started")]
    AlreadyStarted,
    #[error("session is completed")]
    Completed,
    #[error("no item is awaiting a response")]
    NoOutstandingItem,
    #[error("response for item {received} does not match outstanding item {expected}")]
    UnexpectedItem { expected: ItemId, received: ItemId },
}

/// A response the engine refuses to score
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ResponseError {
    #[error("item {item_id}: graded score must be within [0, 1], got {score}")]
    ScoreOutOfRange { item_id: ItemId, score: f64 },
}

#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("failed to encode or decode snapshot: {0}")]
    Json(#[source] serde_json::Error),
    #[error("unsupported snapshot version {0}")]
    UnsupportedVersion(u32),
    #[error("snapshot references unknown item {0}")]
    UnknownItem(ItemId),
    #[error("snapshot administers item {0} more than once")]
    DuplicateItem(ItemId),
    #[error("snapshot status {0:?} is inconsistent with its responses")]
    InconsistentStatus(SessionStatus),
    #[error("outstanding item {0} is not the item the session would present")]
    InvalidOutstanding(ItemId),
    #[error("category coverage does not match the recorded responses")]
    CoverageMismatch,
    #[error("cached estimate {cached} does not match recomputed {recomputed}")]
    EstimateMismatch { cached: f64, recomputed: f64 },
}

#[derive(Debug, Error)]
pub enum AssessmentError {
    #[error("configuration error: {0}")]
    Configuration(#[from] ConfigError),
    #[error("invalid session state: {0}")]
    InvalidSessionState(#[from] SessionStateError),
    #[error("invalid snapshot: {0}")]
    Snapshot(#[from] SnapshotError),
    #[error("invalid response: {0}")]
    InvalidResponse(#[from] ResponseError),
}

impl AssessmentError {
    pub fn is_configuration(&self) -> bool {
        matches!(self, AssessmentError::Configuration(_))
    }

    pub fn session_state(&self) -> Option<&SessionStateError> {
        match self {
            AssessmentError::InvalidSessionState(err) => Some(err),
            _ => None,
        }
    }
}
