//! End-to-end session flows against JSON-loaded banks

use std::io::Write;

use placement_engine::assessment::{
    AssessmentConfig, Category, Curriculum, EstimatorPhase, Item, ItemBank, NextStep,
    PlacementEngine, Response, ResponseOutcome, SessionStatus, StopReason,
};
use placement_engine::error::{AssessmentError, ConfigError, SessionStateError};
use placement_engine::simulation::SimulatedLearner;

const TWO_ITEM_BANK: &str = r#"{
    "difficultyScale": "unit",
    "items": [
        {
            "id": 7,
            "category": "Grammar",
            "prompt": "Pick the verb.",
            "responseFormat": {
                "type": "multipleChoice",
                "choices": [
                    {"label": "A", "text": "cat"},
                    {"label": "B", "text": "run"},
                    {"label": "C", "text": "blue"},
                    {"label": "D", "text": "under"}
                ],
                "correctLabel": "B"
            },
            "difficulty": 0.5,
            "discrimination": 1.0
        },
        {
            "id": 3,
            "category": "Grammar",
            "prompt": "Pick the adjective.",
            "responseFormat": {
                "type": "multipleChoice",
                "choices": [
                    {"label": "A", "text": "jump"},
                    {"label": "B", "text": "slowly"},
                    {"label": "C", "text": "green"},
                    {"label": "D", "text": "tree"}
                ],
                "correctLabel": "C"
            },
            "difficulty": 0.6,
            "discrimination": 1.0
        }
    ]
}"#;

fn two_item_engine() -> PlacementEngine {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    file.write_all(TWO_ITEM_BANK.as_bytes()).unwrap();
    let bank = ItemBank::from_path(file.path()).unwrap();
    PlacementEngine::new(bank, Curriculum::sample().unwrap(), AssessmentConfig::default()).unwrap()
}

fn present(step: NextStep) -> Item {
    match step {
        NextStep::Present(item) => item,
        NextStep::Finished(result) => panic!("session finished early: {result:?}"),
    }
}

#[test]
fn test_first_pick_is_most_informative_at_prior() {
    let engine = two_item_engine();
    let mut session = engine.start_session().unwrap();
    assert_eq!(session.estimate().theta, 0.0);

    let first = present(session.next_item().unwrap());
    assert_eq!(first.id(), 7);
    assert_eq!(first.raw_difficulty(), 0.5);

    let graded = first.grade_choice("D").unwrap();
    assert_eq!(graded, ResponseOutcome::Incorrect);
    let receipt = session
        .record_response(Response::new(first.id(), graded, 1_000))
        .unwrap();
    assert!(receipt.estimate.theta < 0.0);
    assert_eq!(receipt.estimate.phase, EstimatorPhase::Provisional);
}

#[test]
fn test_two_item_bank_exhausts() {
    let engine = two_item_engine();
    let mut session = engine.start_session().unwrap();

    let first = present(session.next_item().unwrap());
    session
        .record_response(Response::new(first.id(), ResponseOutcome::Correct, 1))
        .unwrap();
    let second = present(session.next_item().unwrap());
    assert_eq!(second.id(), 3);
    let receipt = session
        .record_response(Response::new(second.id(), ResponseOutcome::Correct, 2))
        .unwrap();

    let result = receipt.finished.expect("bank should be exhausted");
    assert_eq!(result.stop_reason, StopReason::BankExhausted);
    assert_eq!(result.items_administered, 2);
    assert_eq!(result.correct, 2);
    assert_eq!(session.status(), SessionStatus::Completed);

    let grammar = result.category(&Category::Grammar).unwrap();
    assert!(grammar.measured);
    let spelling = result.category(&Category::Spelling).unwrap();
    assert!(!spelling.measured);
    assert_eq!(spelling.theta, result.theta);
}

#[test]
fn test_completed_session_rejects_mutation() {
    let engine = two_item_engine();
    let mut session = engine.new_session().unwrap();
    let mut presenter = |item: &Item| Response::new(item.id(), ResponseOutcome::Incorrect, 0);
    session.run(&mut presenter).unwrap();

    let err = session
        .record_response(Response::new(7, ResponseOutcome::Correct, 0))
        .unwrap_err();
    assert!(matches!(
        err,
        AssessmentError::InvalidSessionState(SessionStateError::Completed)
    ));
    assert!(session.run(&mut presenter).is_err());
}

#[test]
fn test_sample_engine_runs_to_max_items() {
    let engine = PlacementEngine::with_sample_data(AssessmentConfig::default()).unwrap();
    let mut session = engine.new_session().unwrap();
    let mut learner = SimulatedLearner::new(0.0, 11);
    let result = session.run(&mut learner).unwrap();

    assert_eq!(result.items_administered, 11);
    assert_eq!(result.stop_reason, StopReason::MaxItems);
    assert_eq!(result.unlocks.len(), engine.curriculum().len());
    let orders: Vec<u32> = result.unlocks.iter().map(|u| u.order).collect();
    assert_eq!(orders, (1..=20).collect::<Vec<u32>>());
    assert!(result.level_label.is_some());
}

#[test]
fn test_mandatory_pronunciation_with_small_item_cap() {
    let mut config = AssessmentConfig::default();
    config.stopping.max_items = 2;
    config.selector.mandatory_categories = vec![Category::Pronunciation, Category::Vocabulary];
    let engine = PlacementEngine::with_sample_data(config).unwrap();
    let mut session = engine.new_session().unwrap();
    let mut presenter =
        |item: &Item| Response::new(item.id(), ResponseOutcome::Graded { score: 0.75 }, 0);
    let result = session.run(&mut presenter).unwrap();

    assert_eq!(result.stop_reason, StopReason::MaxItems);
    assert_eq!(session.coverage().count(&Category::Pronunciation), 1);
    assert_eq!(session.coverage().count(&Category::Vocabulary), 1);
}

#[test]
fn test_rejects_malformed_bank_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    let broken = TWO_ITEM_BANK.replace("\"discrimination\": 1.0", "\"discrimination\": 0.0");
    file.write_all(broken.as_bytes()).unwrap();
    let err = ItemBank::from_path(file.path()).unwrap_err();
    assert!(matches!(err, ConfigError::InvalidDiscrimination { .. }));
}

#[test]
fn test_mandatory_category_absent_from_bank() {
    let mut config = AssessmentConfig::default();
    config.selector.mandatory_categories = vec![Category::Comprehension];
    let err = PlacementEngine::with_sample_data(config).unwrap_err();
    assert!(matches!(
        err,
        AssessmentError::Configuration(ConfigError::MissingMandatoryCategory(Category::Comprehension))
    ));
}
