use std::fmt;

use placement_algo::{ItemParams, Observation};
use serde::{Deserialize, Serialize};

use crate::error::ResponseError;

pub type ItemId = u32;
pub type ModuleId = u32;

// ==================== Category ====================

/// Skill area an item measures and a module teaches.
///
/// The named variants cover the shipped content; `Other` keeps the set open
/// for banks that introduce new areas.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Category {
    Grammar,
    Spelling,
    Syntax,
    Pronunciation,
    Vocabulary,
    Comprehension,
    Other(String),
}

impl Category {
    pub fn parse(s: &str) -> Self {
        let trimmed = s.trim();
        match trimmed.to_lowercase().as_str() {
            "grammar" => Category::Grammar,
            "spelling" => Category::Spelling,
            "syntax" => Category::Syntax,
            "pronunciation" => Category::Pronunciation,
            "vocabulary" => Category::Vocabulary,
            "comprehension" => Category::Comprehension,
            _ => Category::Other(trimmed.to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Category::Grammar => "Grammar",
            Category::Spelling => "Spelling",
            Category::Syntax => "Syntax",
            Category::Pronunciation => "Pronunciation",
            Category::Vocabulary => "Vocabulary",
            Category::Comprehension => "Comprehension",
            Category::Other(name) => name,
        }
    }
}

impl From<String> for Category {
    fn from(value: String) -> Self {
        Category::parse(&value)
    }
}

impl From<&str> for Category {
    fn from(value: &str) -> Self {
        Category::parse(value)
    }
}

impl From<Category> for String {
    fn from(value: Category) -> Self {
        value.as_str().to_string()
    }
}

impl fmt::Display for Category {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// ==================== Responses ====================

/// What the presenting collaborator reports back for one item.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum ResponseOutcome {
    Correct,
    Incorrect,
    /// Partial credit in [0, 1], e.g. from a pronunciation recognizer
    Graded { score: f64 },
    /// Timed out or skipped. Scored as incorrect, reported separately.
    NoResponse,
}

impl ResponseOutcome {
    pub fn score(&self) -> f64 {
        match self {
            ResponseOutcome::Correct => 1.0,
            ResponseOutcome::Incorrect | ResponseOutcome::NoResponse => 0.0,
            ResponseOutcome::Graded { score } => placement_algo::sanitize::sanitize_score(*score),
        }
    }

    pub fn is_skipped(&self) -> bool {
        matches!(self, ResponseOutcome::NoResponse)
    }

    /// Full credit counts toward per-category "correct" tallies
    pub fn is_correct(&self) -> bool {
        self.score() >= 1.0
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Response {
    pub item_id: ItemId,
    pub outcome: ResponseOutcome,
    /// Milliseconds since the Unix epoch
    pub timestamp: i64,
}

impl Response {
    pub fn new(item_id: ItemId, outcome: ResponseOutcome, timestamp: i64) -> Self {
        Self {
            item_id,
            outcome,
            timestamp,
        }
    }

    /// Graded scores must lie in [0, 1]; NaN is rejected
    pub fn validate(&self) -> Result<(), ResponseError> {
        match self.outcome {
            ResponseOutcome::Graded { score } if !(0.0..=1.0).contains(&score) => {
                Err(ResponseError::ScoreOutOfRange {
                    item_id: self.item_id,
                    score,
                })
            }
            _ => Ok(()),
        }
    }

    /// Stamp with the current wall-clock time
    pub fn now(item_id: ItemId, outcome: ResponseOutcome) -> Self {
        Self::new(item_id, outcome, chrono::Utc::now().timestamp_millis())
    }
}

// ==================== Estimates ====================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EstimatorPhase {
    /// Too few responses to trust the estimate for stopping
    Provisional,
    Converged,
}

/// Which computation produced an estimate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum EstimateSource {
    Prior,
    Map,
    Eap,
    /// MAP did not settle; EAP was used instead
    Fallback,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AbilityEstimate {
    pub theta: f64,
    pub standard_error: f64,
    pub responses: u32,
    pub phase: EstimatorPhase,
    pub source: EstimateSource,
}

// ==================== Session ====================

/// One administered item with its response and the estimate right after it
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AdministeredItem {
    pub item_id: ItemId,
    pub category: Category,
    pub params: ItemParams,
    pub response: Response,
    pub estimate: AbilityEstimate,
}

impl AdministeredItem {
    pub fn observation(&self) -> Observation {
        Observation::new(self.params, self.response.outcome.score())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum SessionStatus {
    Created,
    InProgress,
    Completed,
}

impl SessionStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            SessionStatus::Created => "CREATED",
            SessionStatus::InProgress => "IN_PROGRESS",
            SessionStatus::Completed => "COMPLETED",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StopReason {
    MaxItems,
    PrecisionReached,
    BankExhausted,
}

impl StopReason {
    pub const fn as_str(self) -> &'static str {
        match self {
            StopReason::MaxItems => "MAX_ITEMS",
            StopReason::PrecisionReached => "PRECISION_REACHED",
            StopReason::BankExhausted => "BANK_EXHAUSTED",
        }
    }
}
