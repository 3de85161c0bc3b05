use std::path::PathBuf;

use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

const LOG_FILE_PREFIX: &str = "placement.log";

/// Keeps the non-blocking file writer flushing; drop it on shutdown
pub struct FileLogGuard {
    _guard: WorkerGuard,
}

#[derive(Debug, Clone)]
pub struct LogSettings {
    pub level: String,
    /// Daily-rolling file output next to stdout
    pub file_dir: Option<PathBuf>,
}

impl LogSettings {
    pub fn from_env(level: &str) -> Self {
        let file_dir = file_logging_enabled().then(|| {
            PathBuf::from(std::env::var("LOG_DIR").unwrap_or_else(|_| "./logs".to_string()))
        });
        Self {
            level: level.to_string(),
            file_dir,
        }
    }
}

pub fn file_logging_enabled() -> bool {
    std::env::var("ENABLE_FILE_LOGS")
        .map(|v| v == "true" || v == "1")
        .unwrap_or(false)
}

pub fn init_tracing(log_level: &str) -> Option<FileLogGuard> {
    init_with(&LogSettings::from_env(log_level))
}

pub fn init_with(settings: &LogSettings) -> Option<FileLogGuard> {
    let env_filter =
        EnvFilter::try_new(&settings.level).unwrap_or_else(|_| EnvFilter::new("info"));
    let stdout_layer = fmt::layer().with_target(true);

    if let Some(log_dir) = &settings.file_dir {
        match std::fs::create_dir_all(log_dir) {
            Ok(()) => {
                let file_appender =
                    RollingFileAppender::new(Rotation::DAILY, log_dir, LOG_FILE_PREFIX);
                let (file_writer, guard) = tracing_appender::non_blocking(file_appender);
                let file_layer = fmt::layer()
                    .with_writer(file_writer)
                    .with_ansi(false)
                    .with_target(true);

                tracing_subscriber::registry()
                    .with(env_filter)
                    .with(stdout_layer)
                    .with(file_layer)
                    .init();

                return Some(FileLogGuard { _guard: guard });
            }
            Err(err) => {
                eprintln!("failed to create log directory {}: {err}", log_dir.display());
            }
        }
    }

    tracing_subscriber::registry()
        .with(env_filter)
        .with(stdout_layer)
        .init();

    None
}
