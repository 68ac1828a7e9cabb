//! Logging infrastructure for aimeter
//!
//! Log files roll daily under `$XDG_STATE_HOME/aimeter/` as
//! `aimeter.YYYY-MM-DD.log`. The background host additionally mirrors
//! warnings to stderr so skipped input and failed writes are visible.

use crate::config::{Config, LoggingConfig};
use crate::error::{Error, Result};
use std::path::PathBuf;
use tracing::Level;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    filter::LevelFilter,
    fmt::{self, format::FmtSpan},
    layer::SubscriberExt,
    util::SubscriberInitExt,
    EnvFilter, Layer,
};

const LOG_FILE_PREFIX: &str = "aimeter";
const LOG_FILE_SUFFIX: &str = "log";

/// Keeps the non-blocking file writer alive; flushes pending lines on drop.
pub struct LoggingGuard {
    _guard: tracing_appender::non_blocking::WorkerGuard,
}

/// Log to the rolling file only (one-shot CLI commands)
pub fn init(config: &LoggingConfig) -> Result<LoggingGuard> {
    install(config, None)
}

/// Log to the rolling file and echo events at `stderr_level` and above to stderr
pub fn init_with_stderr(config: &LoggingConfig, stderr_level: Level) -> Result<LoggingGuard> {
    install(config, Some(stderr_level))
}

fn install(config: &LoggingConfig, stderr_level: Option<Level>) -> Result<LoggingGuard> {
    let log_dir = log_dir();
    std::fs::create_dir_all(&log_dir)?;

    let appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_FILE_PREFIX)
        .filename_suffix(LOG_FILE_SUFFIX)
        .max_log_files(config.max_files.max(1))
        .build(&log_dir)
        .map_err(|e| Error::Logging(format!("failed to create log appender: {e}")))?;
    let (writer, guard) = tracing_appender::non_blocking(appender);

    let file_layer = fmt::layer()
        .with_writer(writer)
        .with_ansi(false)
        .with_target(true)
        .with_thread_ids(true)
        .with_file(true)
        .with_line_number(true)
        .with_filter(file_filter(&config.level)?);

    let stderr_layer = stderr_level.map(|level| {
        fmt::layer()
            .with_writer(std::io::stderr)
            .with_target(false)
            .without_time()
            .with_filter(LevelFilter::from_level(level))
    });

    tracing_subscriber::registry()
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .map_err(|e| Error::Logging(e.to_string()))?;

    tracing::info!(
        log_dir = %log_dir.display(),
        level = %config.level,
        max_files = config.max_files,
        "Logging initialized"
    );

    Ok(LoggingGuard { _guard: guard })
}

/// `RUST_LOG` wins over the configured level; a bad configured level is an error.
fn file_filter(level: &str) -> Result<EnvFilter> {
    if let Ok(filter) = EnvFilter::try_from_default_env() {
        return Ok(filter);
    }
    EnvFilter::try_new(level)
        .map_err(|e| Error::Logging(format!("invalid log level {level:?}: {e}")))
}

/// Directory holding the rolled log files
pub fn log_dir() -> PathBuf {
    Config::state_dir()
}

/// Initialize logging for tests (test writer, honors RUST_LOG)
pub fn init_test() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_test_writer()
        .with_span_events(FmtSpan::CLOSE)
        .try_init();
}
