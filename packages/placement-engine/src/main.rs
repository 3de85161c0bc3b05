use std::process::ExitCode;

use placement_engine::assessment::{AssessmentConfig, Curriculum, ItemBank, PlacementEngine};
use placement_engine::config::Config;
use placement_engine::logging;
use placement_engine::simulation::{sample_abilities, simulate_cohort, summarize};
use placement_engine::AssessmentResult;

fn build_engine(config: &Config) -> AssessmentResult<PlacementEngine> {
    let bank = match &config.bank_path {
        Some(path) => ItemBank::from_path(path)?,
        None => ItemBank::sample()?,
    };
    let curriculum = match &config.curriculum_path {
        Some(path) => Curriculum::from_path(path)?,
        None => Curriculum::sample()?,
    };
    PlacementEngine::new(bank, curriculum, AssessmentConfig::from_env())
}

fn main() -> ExitCode {
    let _ = dotenvy::dotenv();
    let config = Config::from_env();
    let _log_guard = logging::init_tracing(&config.log_level);

    let engine = match build_engine(&config) {
        Ok(engine) => engine,
        Err(err) => {
            tracing::error!(error = %err, "failed to load placement engine");
            return ExitCode::FAILURE;
        }
    };

    tracing::info!(
        items = engine.bank().len(),
        modules = engine.curriculum().len(),
        learners = config.sim_learners,
        seed = config.sim_seed,
        "running placement simulation"
    );

    let abilities = sample_abilities(config.sim_learners, config.sim_seed);
    let outcomes = match simulate_cohort(&engine, &abilities, config.sim_seed, config.sim_skip_rate)
    {
        Ok(outcomes) => outcomes,
        Err(err) => {
            tracing::error!(error = %err, "simulation failed");
            return ExitCode::FAILURE;
        }
    };

    let summary = summarize(&outcomes);
    tracing::info!(
        mean_items = summary.mean_items,
        rmse = summary.rmse,
        mean_se = summary.mean_standard_error,
        "simulation finished"
    );

    match serde_json::to_string_pretty(&summary) {
        Ok(json) => {
            println!("{json}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            tracing::error!(error = %err, "failed to encode summary");
            ExitCode::FAILURE
        }
    }
}
