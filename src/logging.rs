use std::path::Path;

use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

#[derive(Debug, Error)]
pub enum LoggingError {
    #[error("Failed to create log directory: {0}")]
    DirectoryError(String),
    #[error("Failed to initialize logging: {0}")]
    InitError(String),
}

/// File name prefix of the daily rolling log
pub const LOG_FILE_PREFIX: &str = "rmd.log";

/// Route `tracing` output to a daily rolling file under `log_dir`.
///
/// The terminal belongs to the TUI, so nothing is written to stdout/stderr.
/// `RUST_LOG` overrides `default_filter`. Keep the returned guard alive for
/// the life of the process or buffered lines are lost.
pub fn init(log_dir: &Path, default_filter: &str) -> Result<WorkerGuard, LoggingError> {
    std::fs::create_dir_all(log_dir)
        .map_err(|e| LoggingError::DirectoryError(format!("{}: {}", log_dir.display(), e)))?;

    let appender = tracing_appender::rolling::daily(log_dir, LOG_FILE_PREFIX);
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let filter = EnvFilter::try_from_default_env()
        .or_else(|_| EnvFilter::try_new(default_filter))
        .unwrap_or_else(|_| EnvFilter::new("info"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(writer)
        .with_ansi(false)
        .try_init()
        .map_err(|e| LoggingError::InitError(e.to_string()))?;

    Ok(guard)
}
