//! Tracing subscriber setup.
//!
//! Console output always; a daily-rolling file under `logging.file_dir` when
//! configured. `RUST_LOG` directives override the configured level. Modules
//! log with structured fields, and anything tied to an upstream carries a
//! `source` field naming it (`SM`, `water-level`, `ftm-messages`).

use thiserror::Error;
use tracing_appender::non_blocking::{NonBlocking, WorkerGuard};
use tracing_appender::rolling::{InitError, RollingFileAppender, Rotation};
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use crate::config::LoggingConfig;

const LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Failed to create log file appender")]
    Appender(#[from] InitError),

    #[error("A global tracing subscriber is already installed")]
    AlreadyInitialized(#[from] TryInitError),
}

/// Keeps the file writer flushing; hold it for the life of the process.
#[allow(dead_code)]
pub struct LoggerGuard(Option<WorkerGuard>);

/// Returns `level` if it names a tracing level, else `"info"`.
pub fn normalize_level(level: &str) -> &str {
    if LEVELS.contains(&level) {
        level
    } else {
        "info"
    }
}

pub fn init_logging(config: &LoggingConfig) -> Result<LoggerGuard, LoggingError> {
    let level = normalize_level(&config.level);
    let rust_log = std::env::var("RUST_LOG").unwrap_or_default();

    let builder = EnvFilter::builder().with_default_directive(
        level
            .parse::<tracing_subscriber::filter::LevelFilter>()
            .unwrap_or(tracing_subscriber::filter::LevelFilter::INFO)
            .into(),
    );
    let console_filter = builder.clone().parse_lossy(&rust_log);
    let file_filter = builder.parse_lossy(&rust_log);

    let (file_layer, guard) = match &config.file_dir {
        Some(dir) => {
            let appender = RollingFileAppender::builder()
                .rotation(Rotation::DAILY)
                .filename_prefix(&config.file_prefix)
                .filename_suffix("log")
                .build(dir)?;
            let (non_blocking, guard) = NonBlocking::new(appender);
            let layer = fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_filter(file_filter);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    let stdout_layer = fmt::layer()
        .with_writer(std::io::stdout)
        .with_ansi(true)
        .with_filter(console_filter);

    tracing_subscriber::registry()
        .with(file_layer)
        .with(stdout_layer)
        .try_init()?;

    if level != config.level {
        tracing::warn!(configured = %config.level, "Invalid log level, defaulting to 'info'");
    }

    Ok(LoggerGuard(guard))
}
