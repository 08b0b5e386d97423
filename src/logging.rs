// Logging setup
// File output with size-based rotation, plus console or dashboard output

use std::collections::VecDeque;
use std::fs;
use std::io;
use std::path::Path;
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use file_rotate::compression::Compression;
use file_rotate::suffix::AppendCount;
use file_rotate::{ContentLimit, FileRotate};
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::EnvFilter;

use crate::config::Config;
use crate::dashboard::app::LogEntry;
use crate::dashboard::log_layer::DashboardLayer;

/// Where human-facing log lines go besides the log file
pub enum LogOutput {
    /// Formatted lines on stderr (headless mode)
    Console,
    /// Captured into the dashboard's log panel
    Dashboard(Arc<Mutex<VecDeque<LogEntry>>>),
}

/// Install the global subscriber
pub fn init(config: &Config, output: LogOutput) -> Result<()> {
    let level = normalize_level(&config.log_level);
    let env_filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));

    let log_file = rotating_file(&config.log_file, config.max_log_size, config.backup_count)
        .with_context(|| format!("Failed to open log file {}", config.log_file.display()))?;

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(Mutex::new(log_file))
        .with_ansi(false)
        .with_target(true);

    let (console_layer, dashboard_layer) = match output {
        LogOutput::Console => (
            Some(
                tracing_subscriber::fmt::layer()
                    .with_writer(io::stderr)
                    .with_target(false)
                    .with_file(true)
                    .with_line_number(true),
            ),
            None,
        ),
        LogOutput::Dashboard(buffer) => (None, Some(DashboardLayer::new(buffer))),
    };

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .with(console_layer)
        .with(dashboard_layer)
        .try_init()
        .context("Failed to install tracing subscriber")?;

    tracing::info!("{}", "=".repeat(60));
    tracing::info!("Logging initialized");
    tracing::info!("Log file: {}", config.log_file.display());
    tracing::info!("Log level: {}", level);
    tracing::info!("{}", "=".repeat(60));

    Ok(())
}

/// Map config-file level names (Python style included) to tracing filters
pub fn normalize_level(level: &str) -> &'static str {
    match level.trim().to_lowercase().as_str() {
        "trace" => "trace",
        "debug" => "debug",
        "warn" | "warning" => "warn",
        "error" | "critical" | "fatal" => "error",
        _ => "info",
    }
}

/// Size-rotated log file: `<path>` rolls over to `<path>.1`, `<path>.2`, ...
/// keeping at most `backup_count` old files. Rotation is off when either
/// limit is zero.
pub fn rotating_file(
    path: &Path,
    max_bytes: u64,
    backup_count: usize,
) -> io::Result<FileRotate<AppendCount>> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }

    let content_limit = if max_bytes == 0 || backup_count == 0 {
        ContentLimit::None
    } else {
        ContentLimit::BytesSurpassed(max_bytes as usize)
    };

    Ok(FileRotate::new(
        path,
        AppendCount::new(backup_count.max(1)),
        content_limit,
        Compression::None,
        #[cfg(unix)]
        None,
    ))
}
