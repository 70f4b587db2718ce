//! Logging setup for the `tabletalk` binary.
//!
//! Events go to stderr and to daily-rotated files in the platform data
//! directory. A second file collects warnings and errors only, which is the
//! first place to look when a transformation or a question failed.
//!
//! ```no_run
//! tabletalk::logging::init(false).expect("Failed to initialize logging");
//! tracing::info!("ready");
//! ```

use anyhow::{Context as _, Result};
use std::path::{Path, PathBuf};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{
    EnvFilter, Layer as _, fmt, layer::SubscriberExt as _, util::SubscriberInitExt as _,
};

const LOG_PREFIX: &str = "tabletalk";
const ERROR_PREFIX: &str = "error";
const RETAINED_FILES: usize = 10;

/// `<data dir>/tabletalk/logs`, created on first use.
pub fn get_log_dir() -> Result<PathBuf> {
    let base_dir = dirs::data_dir().context("Failed to determine data directory")?;
    let log_dir = base_dir.join("tabletalk").join("logs");

    if !log_dir.exists() {
        std::fs::create_dir_all(&log_dir)
            .with_context(|| format!("Failed to create log directory: {}", log_dir.display()))?;
    }

    Ok(log_dir)
}

fn daily_appender(log_dir: &Path, prefix: &str) -> Result<RollingFileAppender> {
    RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .max_log_files(RETAINED_FILES)
        .filename_prefix(prefix)
        .filename_suffix("log")
        .build(log_dir)
        .with_context(|| format!("Failed to create {prefix} log appender"))
}

/// Install the global subscriber.
///
/// The level defaults to `info` (`debug` when `verbose`) and `RUST_LOG`
/// overrides both.
///
/// # Errors
///
/// Fails if the log directory or the file appenders cannot be created.
pub fn init(verbose: bool) -> Result<()> {
    let log_dir = get_log_dir()?;
    let all_logs = daily_appender(&log_dir, LOG_PREFIX)?;
    let error_logs = daily_appender(&log_dir, ERROR_PREFIX)?;

    let default_level = if verbose { "debug" } else { "info" };
    let env_filter = EnvFilter::try_from_default_env()
        .or_else(|_err| EnvFilter::try_new(default_level))
        .context("Failed to create env filter")?;

    // stdout is reserved for command output
    let console_layer = fmt::layer()
        .with_target(false)
        .with_writer(std::io::stderr)
        .compact();

    let all_logs_layer = fmt::layer()
        .with_target(true)
        .with_thread_ids(true)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(false)
        .with_writer(all_logs);

    let error_logs_layer = fmt::layer()
        .with_target(true)
        .with_line_number(true)
        .with_file(true)
        .with_ansi(false)
        .with_writer(error_logs)
        .with_filter(EnvFilter::new("warn"));

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(all_logs_layer)
        .with(error_logs_layer)
        .try_init()
        .context("Logging was already initialized")?;

    tracing::debug!(log_dir = %log_dir.display(), "Logging initialized");
    Ok(())
}

/// Today's main log file.
pub fn get_current_log_path() -> Result<PathBuf> {
    let today = chrono::Local::now().format("%Y-%m-%d");
    Ok(get_log_dir()?.join(format!("{LOG_PREFIX}.{today}.log")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_paths() {
        let log_dir = get_log_dir().expect("Failed to get log dir");
        assert!(log_dir.ends_with("tabletalk/logs") || log_dir.ends_with("tabletalk\\logs"));

        let current = get_current_log_path().expect("log path");
        let name = current.file_name().and_then(|n| n.to_str()).unwrap_or_default();
        assert!(name.starts_with("tabletalk.") && name.ends_with(".log"));
    }
}
