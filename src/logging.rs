use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::LogConfig;

const LOG_ENV: &str = "NOTES_LOG";
const DEFAULT_FILTER: &str = "notes_tui=info";
const LOG_FILE: &str = "notes.log";

/// Keeps the background log writer alive; logs stop when this is dropped.
pub struct LoggingGuard {
    _guard: WorkerGuard,
    log_dir: PathBuf,
}

impl LoggingGuard {
    pub fn log_dir(&self) -> &Path {
        &self.log_dir
    }
}

/// Where log files go: the configured directory, the platform cache
/// directory, or the temp directory.
pub fn log_dir(config: &LogConfig) -> PathBuf {
    if let Some(dir) = &config.directory {
        return dir.clone();
    }
    dirs::cache_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("notes-tui")
        .join("logs")
}

/// Installs a daily rolling file subscriber. The terminal belongs to the UI,
/// so nothing is written to stdout or stderr.
pub fn init(config: &LogConfig) -> Result<LoggingGuard> {
    let log_dir = log_dir(config);
    fs::create_dir_all(&log_dir)
        .with_context(|| format!("failed to create log directory {}", log_dir.display()))?;

    let file_appender = tracing_appender::rolling::daily(&log_dir, LOG_FILE);
    let (writer, guard) = tracing_appender::non_blocking(file_appender);

    let fallback = config.filter.as_deref().unwrap_or(DEFAULT_FILTER);
    let env_filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(fallback));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_target(true),
        )
        .try_init()
        .context("failed to install tracing subscriber")?;

    tracing::info!(log_dir = %log_dir.display(), "logging initialized");
    Ok(LoggingGuard {
        _guard: guard,
        log_dir,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn configured_directory_wins() {
        let config = LogConfig {
            filter: None,
            directory: Some(PathBuf::from("/tmp/notes-logs")),
        };
        assert_eq!(log_dir(&config), PathBuf::from("/tmp/notes-logs"));
    }

    #[test]
    fn default_directory_is_namespaced() {
        let dir = log_dir(&LogConfig::default());
        assert!(dir.ends_with("notes-tui/logs"));
    }
}
