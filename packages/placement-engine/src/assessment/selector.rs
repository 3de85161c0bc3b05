//! Item Selector - maximum-information selection with category coverage
//!
//! While a mandatory category has no administered item and still has eligible
//! items, the candidate pool is restricted to the uncovered mandatory
//! categories. Ties on information go to the lowest item id.

use std::collections::{BTreeMap, BTreeSet};

use placement_algo::information;
use serde::{Deserialize, Serialize};

use crate::assessment::bank::{Item, ItemBank};
use crate::assessment::types::{Category, ItemId};

// ==================== Coverage ====================

/// Per-category administration counts against a mandatory set
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CoverageTracker {
    mandatory: BTreeSet<Category>,
    administered: BTreeMap<Category, u32>,
}

impl CoverageTracker {
    pub fn new<I>(mandatory: I) -> Self
    where
        I: IntoIterator<Item = Category>,
    {
        Self {
            mandatory: mandatory.into_iter().collect(),
            administered: BTreeMap::new(),
        }
    }

    pub fn record(&mut self, category: &Category) {
        *self.administered.entry(category.clone()).or_insert(0) += 1;
    }

    pub fn count(&self, category: &Category) -> u32 {
        self.administered.get(category).copied().unwrap_or(0)
    }

    pub fn mandatory(&self) -> &BTreeSet<Category> {
        &self.mandatory
    }

    pub fn counts(&self) -> &BTreeMap<Category, u32> {
        &self.administered
    }

    /// Mandatory categories with zero administered items
    pub fn uncovered(&self) -> impl Iterator<Item = &Category> {
        self.mandatory
            .iter()
            .filter(move |category| self.count(category) == 0)
    }

    pub fn is_satisfied(&self) -> bool {
        self.uncovered().next().is_none()
    }
}

// ==================== Selection ====================

pub struct ItemSelector;

impl ItemSelector {
    /// Pick the next item, or `None` when nothing eligible remains
    pub fn select<'a>(
        bank: &'a ItemBank,
        theta: f64,
        administered: &BTreeSet<ItemId>,
        coverage: &CoverageTracker,
    ) -> Option<&'a Item> {
        let uncovered: BTreeSet<&Category> = coverage
            .uncovered()
            .filter(|category| {
                bank.items_by_category(category)
                    .any(|item| !administered.contains(&item.id()))
            })
            .collect();

        let eligible = bank.all_items().iter().filter(|item| {
            !administered.contains(&item.id())
                && (uncovered.is_empty() || uncovered.contains(item.category()))
        });

        Self::most_informative(eligible, theta)
    }

    /// True while some mandatory category is uncovered but still has eligible items
    pub fn has_pending_coverage(
        bank: &ItemBank,
        administered: &BTreeSet<ItemId>,
        coverage: &CoverageTracker,
    ) -> bool {
        coverage.uncovered().any(|category| {
            bank.items_by_category(category)
                .any(|item| !administered.contains(&item.id()))
        })
    }

    /// Bank items are sorted by id, so keeping the first strict maximum is
    /// the lowest-id tie-break.
    fn most_informative<'a, I>(candidates: I, theta: f64) -> Option<&'a Item>
    where
        I: Iterator<Item = &'a Item>,
    {
        let mut best: Option<(&Item, f64)> = None;
        for item in candidates {
            let info = information(theta, &item.params());
            match best {
                Some((_, best_info)) if info.total_cmp(&best_info).is_le() => {}
                _ => best = Some((item, info)),
            }
        }
        best.map(|(item, _)| item)
    }
}
