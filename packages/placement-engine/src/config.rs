use std::path::PathBuf;

/// Process-level settings for the `placement-sim` binary
#[derive(Debug, Clone)]
pub struct Config {
    pub log_level: String,
    /// Bank file to load instead of the bundled sample
    pub bank_path: Option<PathBuf>,
    pub curriculum_path: Option<PathBuf>,
    pub sim_learners: usize,
    pub sim_seed: u64,
    pub sim_skip_rate: f64,
}

impl Config {
    pub fn from_env() -> Self {
        let log_level = std::env::var("RUST_LOG").unwrap_or_else(|_| "info".to_string());

        let bank_path = std::env::var("PLACEMENT_BANK_PATH")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);

        let curriculum_path = std::env::var("PLACEMENT_CURRICULUM_PATH")
            .ok()
            .filter(|value| !value.trim().is_empty())
            .map(PathBuf::from);

        let sim_learners = std::env::var("PLACEMENT_SIM_LEARNERS")
            .ok()
            .and_then(|value| value.parse::<usize>().ok())
            .unwrap_or(200);

        let sim_seed = std::env::var("PLACEMENT_SIM_SEED")
            .ok()
            .and_then(|value| value.parse::<u64>().ok())
            .unwrap_or(42);

        let sim_skip_rate = std::env::var("PLACEMENT_SIM_SKIP_RATE")
            .ok()
            .and_then(|value| value.parse::<f64>().ok())
            .filter(|rate| (0.0..=1.0).contains(rate))
            .unwrap_or(0.05);

        Self {
            log_level,
            bank_path,
            curriculum_path,
            sim_learners,
            sim_seed,
            sim_skip_rate,
        }
    }
}
