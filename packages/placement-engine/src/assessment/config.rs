use std::collections::BTreeMap;

use placement_algo::sanitize::is_strictly_ascending;
use placement_algo::{
    Prior, SolverOptions, DEFAULT_QUADRATURE_POINTS, DEFAULT_THETA_MAX, DEFAULT_THETA_MIN,
};
use serde::{Deserialize, Serialize};

use crate::assessment::bank::ItemBank;
use crate::assessment::types::Category;
use crate::error::ConfigError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EstimationMethod {
    /// Bayes modal estimate, EAP on non-convergence
    Map,
    /// Expected a posteriori
    Eap,
}

impl EstimationMethod {
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "map" => Some(EstimationMethod::Map),
            "eap" => Some(EstimationMethod::Eap),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EstimatorConfig {
    pub method: EstimationMethod,
    pub prior_mean: f64,
    pub prior_sd: f64,
    /// Responses needed before the estimate counts as converged
    pub min_responses: u32,
    pub max_iterations: u32,
    pub tolerance: f64,
    pub max_step: f64,
    pub theta_min: f64,
    pub theta_max: f64,
    pub quadrature_points: usize,
}

impl Default for EstimatorConfig {
    fn default() -> Self {
        Self {
            method: EstimationMethod::Map,
            prior_mean: 0.0,
            prior_sd: 1.0,
            min_responses: 3,
            max_iterations: 20,
            tolerance: 1e-6,
            max_step: 1.0,
            theta_min: DEFAULT_THETA_MIN,
            theta_max: DEFAULT_THETA_MAX,
            quadrature_points: DEFAULT_QUADRATURE_POINTS,
        }
    }
}

impl EstimatorConfig {
    pub fn prior(&self) -> Prior {
        Prior::new(self.prior_mean, self.prior_sd)
    }

    pub fn solver_options(&self) -> SolverOptions {
        SolverOptions {
            max_iterations: self.max_iterations,
            tolerance: self.tolerance,
            max_step: self.max_step,
            theta_min: self.theta_min,
            theta_max: self.theta_max,
            quadrature_points: self.quadrature_points,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct StoppingConfig {
    pub max_items: u32,
    /// Stop once a converged estimate's SE falls below this
    pub se_threshold: f64,
}

impl Default for StoppingConfig {
    fn default() -> Self {
        Self {
            max_items: 11,
            se_threshold: 0.3,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct SelectorConfig {
    /// Categories that must be administered at least once before stopping
    pub mandatory_categories: Vec<Category>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct PlacementConfig {
    /// Ascending ability cut points; n points give n + 1 levels
    pub cut_points: Vec<f64>,
    pub category_cut_points: BTreeMap<Category, Vec<f64>>,
    /// One label per overall level
    pub level_labels: Vec<String>,
}

impl Default for PlacementConfig {
    fn default() -> Self {
        Self {
            cut_points: vec![-1.0, 0.0, 1.0],
            category_cut_points: BTreeMap::new(),
            level_labels: vec![
                "Beginner Reader".to_string(),
                "Early Reader".to_string(),
                "Developing Reader".to_string(),
                "Fluent Reader".to_string(),
            ],
        }
    }
}

impl PlacementConfig {
    pub fn cut_points_for(&self, category: &Category) -> &[f64] {
        self.category_cut_points
            .get(category)
            .map(Vec::as_slice)
            .unwrap_or(&self.cut_points)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct AssessmentConfig {
    pub estimator: EstimatorConfig,
    pub stopping: StoppingConfig,
    pub selector: SelectorConfig,
    pub placement: PlacementConfig,
}

impl AssessmentConfig {
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(val) = std::env::var("PLACEMENT_MAX_ITEMS") {
            if let Ok(parsed) = val.parse() {
                config.stopping.max_items = parsed;
            }
        }
        if let Ok(val) = std::env::var("PLACEMENT_SE_THRESHOLD") {
            if let Ok(parsed) = val.parse() {
                config.stopping.se_threshold = parsed;
            }
        }
        if let Ok(val) = std::env::var("PLACEMENT_ESTIMATOR") {
            if let Some(method) = EstimationMethod::parse(&val) {
                config.estimator.method = method;
            }
        }
        if let Ok(val) = std::env::var("PLACEMENT_PRIOR_SD") {
            if let Ok(parsed) = val.parse() {
                config.estimator.prior_sd = parsed;
            }
        }
        if let Ok(val) = std::env::var("PLACEMENT_MIN_RESPONSES") {
            if let Ok(parsed) = val.parse() {
                config.estimator.min_responses = parsed;
            }
        }
        if let Ok(val) = std::env::var("PLACEMENT_MANDATORY_CATEGORIES") {
            config.selector.mandatory_categories = val
                .split(',')
                .map(str::trim)
                .filter(|name| !name.is_empty())
                .map(Category::parse)
                .collect();
        }

        config
    }

    /// Internal consistency checks, independent of any bank
    pub fn validate(&self) -> Result<(), ConfigError> {
        let est = &self.estimator;
        if !(est.prior_sd.is_finite() && est.prior_sd > 0.0) {
            return Err(invalid(format!("priorSd must be > 0, got {}", est.prior_sd)));
        }
        if !est.prior_mean.is_finite() {
            return Err(invalid("priorMean must be finite"));
        }
        if !(est.theta_min.is_finite() && est.theta_max.is_finite() && est.theta_min < est.theta_max)
        {
            return Err(invalid(format!(
                "thetaMin ({}) must be below thetaMax ({})",
                est.theta_min, est.theta_max
            )));
        }
        if est.max_iterations == 0 {
            return Err(invalid("maxIterations must be >= 1"));
        }
        if !(est.tolerance > 0.0 && est.max_step > 0.0) {
            return Err(invalid("tolerance and maxStep must be > 0"));
        }
        if est.quadrature_points < 2 {
            return Err(invalid("quadraturePoints must be >= 2"));
        }

        let stop = &self.stopping;
        if stop.max_items == 0 {
            return Err(invalid("maxItems must be >= 1"));
        }
        if stop.se_threshold.is_nan() || stop.se_threshold < 0.0 {
            return Err(invalid("seThreshold must be >= 0"));
        }
        let mandatory = self.mandatory_categories().len();
        if (stop.max_items as usize) < mandatory {
            return Err(invalid(format!(
                "maxItems ({}) cannot cover {} mandatory categories",
                stop.max_items, mandatory
            )));
        }

        let placement = &self.placement;
        if !is_strictly_ascending(&placement.cut_points) {
            return Err(invalid("cutPoints must be finite and strictly ascending"));
        }
        for (category, points) in &placement.category_cut_points {
            if !is_strictly_ascending(points) {
                return Err(invalid(format!(
                    "cut points for {category} must be finite and strictly ascending"
                )));
            }
        }
        if !placement.level_labels.is_empty()
            && placement.level_labels.len() != placement.cut_points.len() + 1
        {
            return Err(invalid(format!(
                "expected {} level labels, got {}",
                placement.cut_points.len() + 1,
                placement.level_labels.len()
            )));
        }

        Ok(())
    }

    /// Checks that depend on the bank the sessions will draw from
    pub fn validate_for_bank(&self, bank: &ItemBank) -> Result<(), ConfigError> {
        self.validate()?;
        for category in self.mandatory_categories() {
            if bank.items_by_category(&category).next().is_none() {
                return Err(ConfigError::MissingMandatoryCategory(category));
            }
        }
        Ok(())
    }

    /// Mandatory categories, deduplicated in a stable order
    pub fn mandatory_categories(&self) -> Vec<Category> {
        let mut categories = self.selector.mandatory_categories.clone();
        categories.sort();
        categories.dedup();
        categories
    }
}

fn invalid(message: impl Into<String>) -> ConfigError {
    ConfigError::Invalid(message.into())
}
