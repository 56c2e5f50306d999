//! Tracing subscriber setup.
//!
//! Logs go to stderr so command output on stdout stays machine-readable.
//! `VITRINE_LOG` takes an `EnvFilter` directive (default `warn`).
//! `VITRINE_LOG_FILE` adds a daily-rotated file sink; relative names land in
//! `$VITRINE_HOME/logs`.

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{EnvFilter, Layer, fmt};

use crate::config::paths;

pub const LOG_FILTER_ENV: &str = "VITRINE_LOG";
pub const LOG_FILE_ENV: &str = "VITRINE_LOG_FILE";
const DEFAULT_FILTER: &str = "warn";

/// Keeps the file writer flushing until dropped.
#[must_use = "dropping the guard stops file logging"]
pub struct LoggingGuard {
    _file: Option<WorkerGuard>,
}

/// Installs the global subscriber from environment settings.
///
/// # Errors
/// Returns an error if the filter directive is invalid, the log directory
/// cannot be created, or a global subscriber is already installed.
pub fn init() -> Result<LoggingGuard> {
    let directive = std::env::var(LOG_FILTER_ENV).unwrap_or_else(|_| DEFAULT_FILTER.to_string());
    let log_file = std::env::var(LOG_FILE_ENV)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .map(|v| resolve_log_file(Path::new(v.trim())));

    init_with(&directive, log_file.as_deref())
}

fn init_with(directive: &str, log_file: Option<&Path>) -> Result<LoggingGuard> {
    let filter = EnvFilter::try_new(directive)
        .with_context(|| format!("Invalid {LOG_FILTER_ENV} directive: {directive}"))?;

    let console_layer = fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(false)
        .with_filter(filter);

    let (file_layer, guard) = match log_file {
        Some(path) => {
            let dir = path.parent().unwrap_or_else(|| Path::new("."));
            std::fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create log directory {}", dir.display()))?;
            let file_name = path
                .file_name()
                .with_context(|| format!("Invalid log file path {}", path.display()))?;

            let appender = tracing_appender::rolling::daily(dir, file_name);
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_filter(EnvFilter::try_new(directive).with_context(|| {
                    format!("Invalid {LOG_FILTER_ENV} directive: {directive}")
                })?);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(LoggingGuard { _file: guard })
}

fn resolve_log_file(value: &Path) -> PathBuf {
    if value.is_absolute() {
        value.to_path_buf()
    } else {
        paths::log_dir().join(value)
    }
}

/// Returns a masked version of a token for logs (first 6 chars + ...).
pub fn mask_token(token: &str) -> String {
    match token.get(..6) {
        Some(prefix) if token.len() > 12 => format!("{prefix}..."),
        _ => "***".to_string(),
    }
}
