//! File logging for the terminal client.
//!
//! The TUI owns stdout/stderr, so every log line goes to
//! `<cache dir>/pug/logs/<session>/client.log`.
use std::path::PathBuf;

use anyhow::{Context, Result};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

/// Platform cache directory for logs, falling back to the temp dir.
pub fn log_dir() -> PathBuf {
    directories::ProjectDirs::from("", "", "pug")
        .map(|dirs| dirs.cache_dir().to_path_buf())
        .unwrap_or_else(|| std::env::temp_dir().join("pug"))
        .join("logs")
}

/// Installs the global subscriber. Keep the guard alive until exit or
/// buffered lines are lost.
pub fn setup_logging(session_id: Option<&str>) -> Result<WorkerGuard> {
    let session_id = session_id.map(str::to_owned).unwrap_or_else(|| {
        format!("session_{}", chrono::Local::now().format("%Y%m%d_%H%M%S"))
    });

    let session_dir = log_dir().join(&session_id);
    std::fs::create_dir_all(&session_dir)
        .with_context(|| format!("creating log directory {}", session_dir.display()))?;

    let file_appender = tracing_appender::rolling::never(&session_dir, "client.log");
    let (writer, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));

    let file_layer = tracing_subscriber::fmt::layer()
        .with_writer(writer)
        .with_ansi(false);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(file_layer)
        .try_init()
        .context("installing tracing subscriber")?;

    tracing::info!(session = %session_id, "logging initialized");
    tracing::info!(path = %session_dir.join("client.log").display(), "log file");

    Ok(guard)
}
