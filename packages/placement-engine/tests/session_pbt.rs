//! Property-Based Tests for Adaptive Sessions
//!
//! Tests the following invariants:
//! - No re-selection: an item id is presented at most once per session
//! - Coverage: a completed session has at least one item from every mandatory category
//! - Determinism: identical bank, config and responses give identical trajectories and placements
//! - Checkpointing: restoring mid-session and continuing matches the uninterrupted run

use std::collections::BTreeSet;

use proptest::prelude::*;

use placement_engine::assessment::bank::{Choice, ItemSpec};
use placement_engine::assessment::placement::CurriculumDocument;
use placement_engine::assessment::{
    AssessmentConfig, AssessmentSession, Category, Curriculum, DifficultyScale, Item, ItemBank,
    ItemId, LearningModule, NextStep, PlacementEngine, Prompt, Response, ResponseFormat,
    ResponseOutcome, SessionStatus,
};

const CATEGORIES: [Category; 4] = [
    Category::Grammar,
    Category::Spelling,
    Category::Syntax,
    Category::Pronunciation,
];

// ============================================================================
// Fixtures
// ============================================================================

fn spec(id: ItemId, category: Category, a: f64, b: f64) -> ItemSpec {
    ItemSpec {
        id,
        category,
        prompt: Prompt::Text(format!("item {id}")),
        response_format: ResponseFormat::MultipleChoice {
            choices: ["A", "B", "C", "D"]
                .iter()
                .map(|l| Choice {
                    label: l.to_string(),
                    text: l.to_lowercase(),
                })
                .collect(),
            correct_label: "A".to_string(),
        },
        difficulty: b,
        discrimination: a,
        hint: None,
    }
}

fn curriculum() -> Curriculum {
    let modules = CATEGORIES
        .iter()
        .enumerate()
        .flat_map(|(c, category)| {
            (1..=3).map(move |level| LearningModule {
                id: (c as u32 + 1) * 100 + level,
                category: category.clone(),
                level,
                title: String::new(),
                locked: true,
            })
        })
        .collect();
    Curriculum::load(CurriculumDocument { modules }).unwrap()
}

fn outcome(code: u8) -> ResponseOutcome {
    match code % 4 {
        0 => ResponseOutcome::Correct,
        1 => ResponseOutcome::Incorrect,
        2 => ResponseOutcome::NoResponse,
        _ => ResponseOutcome::Graded { score: 0.5 },
    }
}

#[derive(Debug, Clone)]
struct Case {
    specs: Vec<ItemSpec>,
    mandatory: Vec<Category>,
    max_items: u32,
    pattern: Vec<u8>,
}

impl Case {
    fn engine(&self) -> PlacementEngine {
        let mut config = AssessmentConfig::default();
        config.stopping.max_items = self.max_items;
        config.selector.mandatory_categories = self.mandatory.clone();
        let bank = ItemBank::from_specs(self.specs.clone(), DifficultyScale::Logit).unwrap();
        PlacementEngine::new(bank, curriculum(), config).unwrap()
    }

    fn answer(&self, item: &Item, step: usize) -> Response {
        Response::new(
            item.id(),
            outcome(self.pattern[step % self.pattern.len()]),
            step as i64,
        )
    }
}

/// Answer up to `limit` items; returns the ids presented
fn drive(case: &Case, session: &mut AssessmentSession, limit: usize) -> Vec<ItemId> {
    let mut presented = Vec::new();
    while presented.len() < limit && session.status() != SessionStatus::Completed {
        match session.next_item().unwrap() {
            NextStep::Present(item) => {
                let step = session.administered().len();
                presented.push(item.id());
                session.record_response(case.answer(&item, step)).unwrap();
            }
            NextStep::Finished(_) => break,
        }
    }
    presented
}

// ============================================================================
// Arbitrary Generators
// ============================================================================

fn arb_case() -> impl Strategy<Value = Case> {
    (
        prop::collection::vec((0usize..4, 0.3f64..=2.0f64, -2.5f64..=2.5f64), 2..=12),
        prop::collection::btree_set(0usize..4, 0..=3),
        0u32..=10u32,
        prop::collection::vec(0u8..4, 1..=12),
    )
        .prop_map(|(rows, wanted, extra, pattern)| {
            let specs: Vec<ItemSpec> = rows
                .into_iter()
                .enumerate()
                .map(|(i, (c, a, b))| spec(i as ItemId + 1, CATEGORIES[c].clone(), a, b))
                .collect();
            let present: BTreeSet<&Category> = specs.iter().map(|s| &s.category).collect();
            let mandatory: Vec<Category> = wanted
                .into_iter()
                .map(|c| CATEGORIES[c].clone())
                .filter(|category| present.contains(category))
                .collect();
            let max_items = (mandatory.len() as u32).max(1) + extra;
            Case {
                specs,
                mandatory,
                max_items,
                pattern,
            }
        })
}

// ============================================================================
// Properties
// ============================================================================

proptest! {
    #[test]
    fn prop_never_reselects_an_item(case in arb_case()) {
        let engine = case.engine();
        let mut session = engine.start_session().unwrap();
        let presented = drive(&case, &mut session, usize::MAX);

        let unique: BTreeSet<ItemId> = presented.iter().copied().collect();
        prop_assert_eq!(unique.len(), presented.len());
        prop_assert!(presented.iter().all(|id| engine.bank().contains(*id)));
        prop_assert!(presented.len() as u32 <= case.max_items);
        prop_assert_eq!(session.status(), SessionStatus::Completed);
    }

    #[test]
    fn prop_mandatory_categories_covered_at_stop(case in arb_case()) {
        let engine = case.engine();
        let mut session = engine.start_session().unwrap();
        drive(&case, &mut session, usize::MAX);

        prop_assert_eq!(session.status(), SessionStatus::Completed);
        for category in &case.mandatory {
            prop_assert!(session.coverage().count(category) >= 1, "uncovered {}", category);
        }
    }

    #[test]
    fn prop_identical_inputs_identical_outputs(case in arb_case()) {
        let engine = case.engine();
        let mut first = engine.start_session().unwrap();
        let mut second = engine.start_session().unwrap();
        drive(&case, &mut first, usize::MAX);
        drive(&case, &mut second, usize::MAX);

        prop_assert_eq!(first.trajectory(), second.trajectory());
        prop_assert_eq!(first.result(), second.result());
        prop_assert_eq!(
            first.result().map(|r| r.unlock_map()),
            second.result().map(|r| r.unlock_map())
        );
    }

    #[test]
    fn prop_restore_then_continue_matches_uninterrupted(case in arb_case(), cut in 0usize..6) {
        let engine = case.engine();

        let mut reference = engine.start_session().unwrap();
        drive(&case, &mut reference, usize::MAX);

        let mut interrupted = engine.start_session().unwrap();
        drive(&case, &mut interrupted, cut);
        let json = engine.serialize_session(&interrupted).to_json().unwrap();
        let snapshot = placement_engine::assessment::SessionSnapshot::from_json(&json).unwrap();
        let mut resumed = engine.restore_session(&snapshot).unwrap();

        prop_assert_eq!(resumed.estimate(), interrupted.estimate());
        prop_assert_eq!(resumed.administered_ids(), interrupted.administered_ids());

        drive(&case, &mut resumed, usize::MAX);
        prop_assert_eq!(resumed.trajectory(), reference.trajectory());
        prop_assert_eq!(resumed.result(), reference.result());
    }
}
