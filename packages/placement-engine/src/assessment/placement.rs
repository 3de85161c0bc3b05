//! Placement Mapper
//!
//! Turns a finished session into a placement: an overall level, one
//! sub-ability per category (re-estimated from that category's responses
//! only) and an ordered unlock plan over the curriculum. Output depends only
//! on the inputs; no clock, no randomness.

use std::collections::{BTreeMap, BTreeSet, HashSet};
use std::path::Path;

use placement_algo::irt::{expected_score, reliability, test_information};
use placement_algo::Observation;
use serde::{Deserialize, Serialize};

use crate::assessment::config::AssessmentConfig;
use crate::assessment::estimator::AbilityEstimator;
use crate::assessment::types::{AbilityEstimate, AdministeredItem, Category, ModuleId, StopReason};
use crate::error::ConfigError;

const SAMPLE_CURRICULUM_JSON: &str = include_str!("../../data/sample_curriculum.json");

// ==================== Curriculum ====================

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LearningModule {
    pub id: ModuleId,
    pub category: Category,
    /// Ordinal within the category, starting at 1
    pub level: u32,
    #[serde(default)]
    pub title: String,
    /// Lock state before placement; placement decides the effective one
    #[serde(default = "default_locked")]
    pub locked: bool,
}

fn default_locked() -> bool {
    true
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct CurriculumDocument {
    pub modules: Vec<LearningModule>,
}

/// Read-only module catalog, sorted by category, level, id
#[derive(Debug, Clone)]
pub struct Curriculum {
    modules: Vec<LearningModule>,
}

impl Curriculum {
    pub fn load(document: CurriculumDocument) -> Result<Self, ConfigError> {
        if document.modules.is_empty() {
            return Err(ConfigError::EmptyCurriculum);
        }

        let mut seen = HashSet::with_capacity(document.modules.len());
        for module in &document.modules {
            if !seen.insert(module.id) {
                return Err(ConfigError::DuplicateModule(module.id));
            }
            if module.level == 0 {
                return Err(ConfigError::InvalidModuleLevel(module.id));
            }
        }

        let mut modules = document.modules;
        modules.sort_by(|a, b| {
            a.category
                .cmp(&b.category)
                .then(a.level.cmp(&b.level))
                .then(a.id.cmp(&b.id))
        });
        Ok(Self { modules })
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        let document: CurriculumDocument =
            serde_json::from_str(json).map_err(|source| ConfigError::Parse {
                what: "curriculum",
                source,
            })?;
        Self::load(document)
    }

    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let json = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_json(&json)
    }

    /// Four levels for each of the five sample categories
    pub fn sample() -> Result<Self, ConfigError> {
        Self::from_json(SAMPLE_CURRICULUM_JSON)
    }

    pub fn modules(&self) -> &[LearningModule] {
        &self.modules
    }

    pub fn modules_in<'a>(
        &'a self,
        category: &'a Category,
    ) -> impl Iterator<Item = &'a LearningModule> + 'a {
        self.modules
            .iter()
            .filter(move |module| &module.category == category)
    }

    pub fn get(&self, id: ModuleId) -> Option<&LearningModule> {
        self.modules.iter().find(|module| module.id == id)
    }

    pub fn categories(&self) -> BTreeSet<Category> {
        self.modules
            .iter()
            .map(|module| module.category.clone())
            .collect()
    }

    pub fn len(&self) -> usize {
        self.modules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.modules.is_empty()
    }
}

// ==================== Result Types ====================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryAbility {
    pub category: Category,
    pub theta: f64,
    pub standard_error: f64,
    pub administered: u32,
    pub correct: u32,
    pub skipped: u32,
    /// Mean score as a percentage
    pub accuracy: f64,
    pub level: u32,
    /// False when no item of this category was administered and the overall
    /// ability stands in for it
    pub measured: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleUnlock {
    pub module_id: ModuleId,
    pub level: u32,
    pub locked: bool,
    /// Presentation order, starting at 1
    pub order: u32,
}

/// Dashboard view of one module: `{moduleId: {locked, order}}`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleDecision {
    pub locked: bool,
    pub order: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlacementResult {
    pub theta: f64,
    pub standard_error: f64,
    pub level: u32,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub level_label: Option<String>,
    pub stop_reason: StopReason,
    pub items_administered: u32,
    pub correct: u32,
    pub skipped: u32,
    pub accuracy: f64,
    /// Expected percentage correct over the administered items at `theta`
    pub expected_score: f64,
    pub reliability: f64,
    pub categories: Vec<CategoryAbility>,
    pub unlocks: Vec<ModuleUnlock>,
}

impl PlacementResult {
    pub fn unlock_map(&self) -> BTreeMap<ModuleId, ModuleDecision> {
        self.unlocks
            .iter()
            .map(|unlock| {
                (
                    unlock.module_id,
                    ModuleDecision {
                        locked: unlock.locked,
                        order: unlock.order,
                    },
                )
            })
            .collect()
    }

    /// Unlocked module ids in presentation order
    pub fn unlocked_modules(&self) -> Vec<ModuleId> {
        self.unlocks
            .iter()
            .filter(|unlock| !unlock.locked)
            .map(|unlock| unlock.module_id)
            .collect()
    }

    pub fn category(&self, category: &Category) -> Option<&CategoryAbility> {
        self.categories.iter().find(|c| &c.category == category)
    }
}

// ==================== Mapping ====================

pub struct PlacementMapper;

impl PlacementMapper {
    /// 1 + number of cut points at or below `theta`
    pub fn level_for(theta: f64, cut_points: &[f64]) -> u32 {
        1 + cut_points.iter().filter(|&&cut| theta >= cut).count() as u32
    }

    /// Sub-ability per category, re-estimated from that category's responses.
    ///
    /// Covers every category that has modules or administered items, in
    /// category order.
    pub fn category_abilities(
        config: &AssessmentConfig,
        curriculum: &Curriculum,
        administered: &[AdministeredItem],
        overall: &AbilityEstimate,
    ) -> Vec<CategoryAbility> {
        let mut categories = curriculum.categories();
        categories.extend(administered.iter().map(|record| record.category.clone()));

        categories
            .into_iter()
            .map(|category| {
                let records: Vec<&AdministeredItem> = administered
                    .iter()
                    .filter(|record| record.category == category)
                    .collect();

                let (theta, standard_error, measured) = if records.is_empty() {
                    tracing::warn!(
                        category = %category,
                        theta = overall.theta,
                        "no responses in category, using overall ability"
                    );
                    (overall.theta, overall.standard_error, false)
                } else {
                    let observations: Vec<Observation> =
                        records.iter().map(|record| record.observation()).collect();
                    let mut estimator = AbilityEstimator::new(&config.estimator);
                    let estimate = estimator.replay(&observations);
                    (estimate.theta, estimate.standard_error, true)
                };

                let tally = Tally::of(records.iter().copied());
                let level = Self::level_for(theta, config.placement.cut_points_for(&category));

                CategoryAbility {
                    category,
                    theta,
                    standard_error,
                    administered: tally.count,
                    correct: tally.correct,
                    skipped: tally.skipped,
                    accuracy: tally.accuracy(),
                    level,
                    measured,
                }
            })
            .collect()
    }

    /// Unlock modules at or below each category's level.
    ///
    /// Weakest categories come first (ties by category order); all unlocked
    /// modules precede locked ones; within a category, ascending level.
    pub fn unlock_plan(abilities: &[CategoryAbility], curriculum: &Curriculum) -> Vec<ModuleUnlock> {
        let mut ranked: Vec<&CategoryAbility> = abilities.iter().collect();
        ranked.sort_by(|a, b| a.theta.total_cmp(&b.theta).then(a.category.cmp(&b.category)));

        let mut unlocked = Vec::new();
        let mut locked = Vec::new();
        for ability in ranked {
            for module in curriculum.modules_in(&ability.category) {
                if module.level <= ability.level {
                    unlocked.push(module);
                } else {
                    locked.push(module);
                }
            }
        }

        let unlocked_count = unlocked.len();
        unlocked
            .into_iter()
            .chain(locked)
            .enumerate()
            .map(|(position, module)| ModuleUnlock {
                module_id: module.id,
                level: module.level,
                locked: position >= unlocked_count,
                order: position as u32 + 1,
            })
            .collect()
    }

    pub fn place(
        config: &AssessmentConfig,
        curriculum: &Curriculum,
        administered: &[AdministeredItem],
        estimate: &AbilityEstimate,
        stop_reason: StopReason,
    ) -> PlacementResult {
        let categories = Self::category_abilities(config, curriculum, administered, estimate);
        let unlocks = Self::unlock_plan(&categories, curriculum);

        let params: Vec<_> = administered.iter().map(|record| record.params).collect();
        let info = test_information(estimate.theta, &params);
        let tally = Tally::of(administered.iter());

        let level = Self::level_for(estimate.theta, &config.placement.cut_points);
        let level_label = config
            .placement
            .level_labels
            .get(level as usize - 1)
            .cloned();

        PlacementResult {
            theta: estimate.theta,
            standard_error: estimate.standard_error,
            level,
            level_label,
            stop_reason,
            items_administered: tally.count,
            correct: tally.correct,
            skipped: tally.skipped,
            accuracy: tally.accuracy(),
            expected_score: expected_score(estimate.theta, &params),
            reliability: reliability(info),
            categories,
            unlocks,
        }
    }
}

#[derive(Default)]
struct Tally {
    count: u32,
    correct: u32,
    skipped: u32,
    score: f64,
}

impl Tally {
    fn of<'a>(records: impl Iterator<Item = &'a AdministeredItem>) -> Self {
        let mut tally = Self::default();
        for record in records {
            let outcome = &record.response.outcome;
            tally.count += 1;
            tally.score += outcome.score();
            if outcome.is_correct() {
                tally.correct += 1;
            }
            if outcome.is_skipped() {
                tally.skipped += 1;
            }
        }
        tally
    }

    fn accuracy(&self) -> f64 {
        if self.count == 0 {
            0.0
        } else {
            self.score / self.count as f64 * 100.0
        }
    }
}

// ==================== Growth ====================

/// Coarse description of the change between two ability estimates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Growth {
    NoChange,
    SlightImprovement,
    GoodProgress,
    SignificantImprovement,
    SlightDecline,
    NeedsPractice,
}

impl Growth {
    pub const fn description(self) -> &'static str {
        match self {
            Growth::NoChange => "No significant change",
            Growth::SlightImprovement => "Slight improvement",
            Growth::GoodProgress => "Good progress!",
            Growth::SignificantImprovement => "Significant improvement!",
            Growth::SlightDecline => "Slight decline",
            Growth::NeedsPractice => "Needs more practice",
        }
    }
}

pub fn describe_growth(initial_theta: f64, final_theta: f64) -> Growth {
    let change = final_theta - initial_theta;
    if change.abs() < 0.1 {
        Growth::NoChange
    } else if change > 0.5 {
        Growth::SignificantImprovement
    } else if change > 0.2 {
        Growth::GoodProgress
    } else if change > 0.0 {
        Growth::SlightImprovement
    } else if change > -0.2 {
        Growth::SlightDecline
    } else {
        Growth::NeedsPractice
    }
}
