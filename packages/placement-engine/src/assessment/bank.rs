//! Item Bank - the immutable catalog sessions draw from
//!
//! Loading validates every record and either yields a complete bank or a
//! `ConfigError`; a partially valid bank is never exposed.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::path::Path;

use placement_algo::irt::rescale_unit_difficulty;
use placement_algo::sanitize::{is_valid_difficulty, is_valid_discrimination};
use placement_algo::ItemParams;
use serde::{Deserialize, Serialize};

use crate::assessment::types::{Category, ItemId, ResponseOutcome};
use crate::error::ConfigError;

pub const MULTIPLE_CHOICE_OPTIONS: usize = 4;

const SAMPLE_BANK_JSON: &str = include_str!("../../data/sample_bank.json");

// ==================== Item Content ====================

/// How the bank's `difficulty` values are expressed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DifficultyScale {
    /// Already on the logit scale
    #[default]
    Logit,
    /// In [0, 1]; stretched onto the logit scale at load time
    Unit,
}

impl DifficultyScale {
    pub fn to_logit(self, raw: f64) -> f64 {
        match self {
            DifficultyScale::Logit => raw,
            DifficultyScale::Unit => rescale_unit_difficulty(raw),
        }
    }
}

/// Display content. Scramble prompts list the tokens to reassemble.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Prompt {
    Text(String),
    Scramble(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Choice {
    pub label: String,
    pub text: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ResponseFormat {
    #[serde(rename_all = "camelCase")]
    MultipleChoice {
        choices: Vec<Choice>,
        correct_label: String,
    },
    /// Graded externally (speech recognizer or instructor)
    #[serde(rename_all = "camelCase")]
    OpenResponse { expected: String },
}

/// Raw item record as authored in a bank document
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemSpec {
    pub id: ItemId,
    pub category: Category,
    pub prompt: Prompt,
    pub response_format: ResponseFormat,
    pub difficulty: f64,
    pub discrimination: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
}

/// Validated, immutable assessment item
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Item {
    id: ItemId,
    category: Category,
    prompt: Prompt,
    response_format: ResponseFormat,
    raw_difficulty: f64,
    params: ItemParams,
    #[serde(skip_serializing_if = "Option::is_none")]
    hint: Option<String>,
}

impl Item {
    pub fn from_spec(spec: ItemSpec, scale: DifficultyScale) -> Result<Self, ConfigError> {
        let id = spec.id;

        if !is_valid_discrimination(spec.discrimination) {
            return Err(ConfigError::InvalidDiscrimination {
                id,
                value: spec.discrimination,
            });
        }
        if !is_valid_difficulty(spec.difficulty) {
            return Err(ConfigError::InvalidDifficulty {
                id,
                value: spec.difficulty,
            });
        }
        if spec.category.as_str().trim().is_empty() {
            return Err(malformed(id, "category is empty"));
        }

        validate_prompt(id, &spec.prompt)?;
        validate_format(id, &spec.response_format)?;

        Ok(Self {
            id,
            category: spec.category,
            prompt: spec.prompt,
            response_format: spec.response_format,
            raw_difficulty: spec.difficulty,
            params: ItemParams::new(spec.discrimination, scale.to_logit(spec.difficulty)),
            hint: spec.hint,
        })
    }

    pub fn id(&self) -> ItemId {
        self.id
    }

    pub fn category(&self) -> &Category {
        &self.category
    }

    pub fn prompt(&self) -> &Prompt {
        &self.prompt
    }

    pub fn response_format(&self) -> &ResponseFormat {
        &self.response_format
    }

    pub fn hint(&self) -> Option<&str> {
        self.hint.as_deref()
    }

    /// 2PL parameters on the logit scale
    pub fn params(&self) -> ItemParams {
        self.params
    }

    /// Difficulty b on the logit scale
    pub fn difficulty(&self) -> f64 {
        self.params.difficulty
    }

    /// Difficulty as authored, before rescaling
    pub fn raw_difficulty(&self) -> f64 {
        self.raw_difficulty
    }

    pub fn discrimination(&self) -> f64 {
        self.params.discrimination
    }

    pub fn is_open_response(&self) -> bool {
        matches!(self.response_format, ResponseFormat::OpenResponse { .. })
    }

    /// Grade a multiple-choice selection; open responses are graded elsewhere
    pub fn grade_choice(&self, label: &str) -> Option<ResponseOutcome> {
        match &self.response_format {
            ResponseFormat::MultipleChoice { correct_label, .. } => {
                if label.trim().eq_ignore_ascii_case(correct_label) {
                    Some(ResponseOutcome::Correct)
                } else {
                    Some(ResponseOutcome::Incorrect)
                }
            }
            ResponseFormat::OpenResponse { .. } => None,
        }
    }
}

fn malformed(id: ItemId, reason: impl Into<String>) -> ConfigError {
    ConfigError::MalformedItem {
        id,
        reason: reason.into(),
    }
}

fn validate_prompt(id: ItemId, prompt: &Prompt) -> Result<(), ConfigError> {
    match prompt {
        Prompt::Text(text) if text.trim().is_empty() => Err(malformed(id, "prompt is empty")),
        Prompt::Scramble(tokens) if tokens.is_empty() => {
            Err(malformed(id, "scramble prompt has no tokens"))
        }
        Prompt::Scramble(tokens) if tokens.iter().any(|t| t.trim().is_empty()) => {
            Err(malformed(id, "scramble prompt has an empty token"))
        }
        _ => Ok(()),
    }
}

fn validate_format(id: ItemId, format: &ResponseFormat) -> Result<(), ConfigError> {
    match format {
        ResponseFormat::MultipleChoice {
            choices,
            correct_label,
        } => {
            if choices.len() != MULTIPLE_CHOICE_OPTIONS {
                return Err(malformed(
                    id,
                    format!(
                        "expected {} choices, got {}",
                        MULTIPLE_CHOICE_OPTIONS,
                        choices.len()
                    ),
                ));
            }
            let mut labels = HashSet::new();
            for choice in choices {
                let label = choice.label.trim().to_uppercase();
                if label.is_empty() {
                    return Err(malformed(id, "choice label is empty"));
                }
                if !labels.insert(label) {
                    return Err(malformed(
                        id,
                        format!("duplicate choice label {}", choice.label),
                    ));
                }
            }
            if !labels.contains(&correct_label.trim().to_uppercase()) {
                return Err(malformed(
                    id,
                    format!("correct label {correct_label} is not among the choices"),
                ));
            }
            Ok(())
        }
        ResponseFormat::OpenResponse { expected } => {
            if expected.trim().is_empty() {
                Err(malformed(id, "open response has no expected text"))
            } else {
                Ok(())
            }
        }
    }
}

// ==================== Bank ====================

/// Bank file layout: `{ "difficultyScale": ..., "items": [...] }`
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BankDocument {
    #[serde(default)]
    pub difficulty_scale: DifficultyScale,
    pub items: Vec<ItemSpec>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum BankSource {
    Document(BankDocument),
    Items(Vec<ItemSpec>),
}

#[derive(Debug, Clone)]
pub struct ItemBank {
    /// Sorted by id
    items: Vec<Item>,
    index: HashMap<ItemId, usize>,
    by_category: BTreeMap<Category, Vec<usize>>,
    scale: DifficultyScale,
}

impl ItemBank {
    pub fn load(document: BankDocument) -> Result<Self, ConfigError> {
        if document.items.is_empty() {
            return Err(ConfigError::EmptyBank);
        }

        let scale = document.difficulty_scale;
        let mut seen = HashSet::with_capacity(document.items.len());
        let mut items = Vec::with_capacity(document.items.len());
        for spec in document.items {
            if !seen.insert(spec.id) {
                return Err(ConfigError::DuplicateItem(spec.id));
            }
            items.push(Item::from_spec(spec, scale)?);
        }
        items.sort_by_key(Item::id);

        let mut index = HashMap::with_capacity(items.len());
        let mut by_category: BTreeMap<Category, Vec<usize>> = BTreeMap::new();
        for (position, item) in items.iter().enumerate() {
            index.insert(item.id(), position);
            by_category
                .entry(item.category().clone())
                .or_default()
                .push(position);
        }

        Ok(Self {
            items,
            index,
            by_category,
            scale,
        })
    }

    pub fn from_specs(specs: Vec<ItemSpec>, scale: DifficultyScale) -> Result<Self, ConfigError> {
        Self::load(BankDocument {
            difficulty_scale: scale,
            items: specs,
        })
    }

    /// Accepts a bank document or a bare array of items (logit scale)
    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let source: BankSource = serde_json::from_str(json).map_err(|source| ConfigError::Parse {
            what: "item bank",
            source,
        })?;
        match source {
            BankSource::Document(document) => Self::load(document),
            BankSource::Items(items) => Self::from_specs(items, DifficultyScale::Logit),
        }
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// The bundled 11-item placement bank
    pub fn sample() -> Result<Self, ConfigError> {
        Self::from_json(SAMPLE_BANK_JSON)
    }

    pub fn all_items(&self) -> &[Item] {
        &self.items
    }

    pub fn items_by_category<'a>(
        &'a self,
        category: &Category,
    ) -> impl Iterator<Item = &'a Item> + 'a {
        self.by_category
            .get(category)
            .into_iter()
            .flatten()
            .map(move |&position| &self.items[position])
    }

    pub fn get(&self, id: ItemId) -> Option<&Item> {
        self.index.get(&id).map(|&position| &self.items[position])
    }

    pub fn contains(&self, id: ItemId) -> bool {
        self.index.contains_key(&id)
    }

    pub fn categories(&self) -> impl Iterator<Item = &Category> {
        self.by_category.keys()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn difficulty_scale(&self) -> DifficultyScale {
        self.scale
    }
}
