//! Shared logging setup for Stagecraft binaries.

use anyhow::{Context, Result};
use std::fs;
use std::path::PathBuf;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

pub const DEFAULT_LOG_FILTER: &str = "stagecraft=info,stagecraft_catalog=info";

/// Logging configuration shared by Stagecraft binaries.
#[derive(Debug, Clone, Default)]
pub struct LogConfig<'a> {
    pub app_name: &'a str,
    /// Mirror the file filter on stderr instead of warnings only.
    pub verbose: bool,
    /// Filter used when RUST_LOG is unset.
    pub filter: Option<&'a str>,
    /// Directory for daily rolling log files. `None` disables file output.
    pub log_dir: Option<PathBuf>,
}

/// Install the global tracing subscriber.
///
/// Returns the file writer guard when file logging is enabled; dropping it
/// flushes and stops the background writer, so callers keep it alive for the
/// life of the program.
pub fn init_logging(config: LogConfig<'_>) -> Result<Option<WorkerGuard>> {
    let filter = resolve_filter(config.filter);

    let mut guard = None;
    let file_layer = match config.log_dir.as_ref() {
        Some(dir) => {
            fs::create_dir_all(dir)
                .with_context(|| format!("Failed to create logs directory: {}", dir.display()))?;
            let appender =
                tracing_appender::rolling::daily(dir, format!("{}.log", sanitize_name(config.app_name)));
            let (writer, worker) = tracing_appender::non_blocking(appender);
            guard = Some(worker);
            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(writer)
                    .with_ansi(false)
                    .with_filter(filter.clone()),
            )
        }
        None => None,
    };

    let console_filter = if config.verbose {
        filter
    } else {
        EnvFilter::new("warn")
    };

    tracing_subscriber::registry()
        .with(file_layer)
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_filter(console_filter),
        )
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(guard)
}

fn resolve_filter(fallback: Option<&str>) -> EnvFilter {
    EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(fallback.unwrap_or(DEFAULT_LOG_FILTER)))
}

fn sanitize_name(name: &str) -> String {
    let cleaned: String = name
        .chars()
        .map(|ch| if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' { ch } else { '_' })
        .collect();
    if cleaned.is_empty() {
        "stagecraft".to_string()
    } else {
        cleaned
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_name() {
        assert_eq!(sanitize_name("stage craft/cli"), "stage_craft_cli");
        assert_eq!(sanitize_name(""), "stagecraft");
    }

    #[test]
    fn test_init_logging_creates_log_dir() {
        let temp = tempfile::TempDir::new().unwrap();
        let dir = temp.path().join("logs");
        let guard = init_logging(LogConfig {
            app_name: "test",
            verbose: false,
            filter: Some("warn"),
            log_dir: Some(dir.clone()),
        })
        .unwrap();
        assert!(guard.is_some());
        assert!(dir.is_dir());
    }
}
