//! Shared logging setup for Galley binaries.

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter, Layer};

const DEFAULT_LOG_FILTER: &str = "galley=info,galley_worker=info";

/// Console stays quiet unless asked; the file gets everything the filter allows.
const QUIET_CONSOLE_FILTER: &str = "warn";

pub struct LogConfig<'a> {
    pub app_name: &'a str,
    pub verbose: bool,
    /// Daily rolling log files go here. `None` logs to stderr only.
    pub log_dir: Option<PathBuf>,
}

/// Must outlive logging; dropping it flushes the file writer.
pub struct LogGuard {
    _file_guard: Option<WorkerGuard>,
}

/// Initialize tracing with a daily rolling file and stderr output.
///
/// `RUST_LOG` overrides the default filter for both outputs.
pub fn init_logging(config: LogConfig<'_>) -> Result<LogGuard> {
    let file_filter = base_filter();
    let console_filter = console_filter(config.verbose);

    let console_layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_target(config.verbose)
        .with_filter(console_filter);

    let (file_layer, file_guard) = match &config.log_dir {
        Some(dir) => {
            ensure_dir(dir)?;
            let appender =
                tracing_appender::rolling::daily(dir, log_file_name(config.app_name));
            let (writer, guard) = tracing_appender::non_blocking(appender);
            let layer = tracing_subscriber::fmt::layer()
                .with_writer(writer)
                .with_ansi(false)
                .with_filter(file_filter);
            (Some(layer), Some(guard))
        }
        None => (None, None),
    };

    tracing_subscriber::registry()
        .with(file_layer)
        .with(console_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    Ok(LogGuard {
        _file_guard: file_guard,
    })
}

fn base_filter() -> EnvFilter {
    EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER))
}

fn console_filter(verbose: bool) -> EnvFilter {
    if verbose {
        base_filter()
    } else {
        EnvFilter::new(QUIET_CONSOLE_FILTER)
    }
}

fn ensure_dir(dir: &Path) -> Result<()> {
    fs::create_dir_all(dir)
        .with_context(|| format!("Failed to create logs directory: {}", dir.display()))
}

/// `<app>.log`, with anything odd in the app name replaced.
fn log_file_name(app_name: &str) -> String {
    let base: String = app_name
        .chars()
        .map(|ch| if ch.is_ascii_alphanumeric() || ch == '-' || ch == '_' { ch } else { '_' })
        .collect();
    format!("{}.log", base)
}
