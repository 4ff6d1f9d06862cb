//! Tracing setup for SiteConnect hosts.
//!
//! - Console: colored, compact format
//! - File: daily rotation in the given logs directory

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing_appender::non_blocking::WorkerGuard;
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

/// Log file prefix (`siteconnect.2026-01-22.log`)
pub const LOG_PREFIX: &str = "siteconnect";

/// Platform log directory, e.g. `~/.local/share/siteconnect/logs`
pub fn default_logs_dir() -> Option<PathBuf> {
    dirs::data_local_dir().map(|p| p.join("siteconnect").join("logs"))
}

/// Default filter when `RUST_LOG` is not set
fn default_filter() -> EnvFilter {
    EnvFilter::new("info,siteconnect_core=debug,siteconnect_storage=debug,siteconnect_flow=debug")
}

/// Install the global subscriber.
///
/// The returned guard must be kept alive for the duration of the program;
/// dropping it stops file logging.
pub fn init_tracing(logs_dir: &Path) -> Result<WorkerGuard> {
    std::fs::create_dir_all(logs_dir)
        .with_context(|| format!("Failed to create logs directory {}", logs_dir.display()))?;

    let file_appender = RollingFileAppender::builder()
        .rotation(Rotation::DAILY)
        .filename_prefix(LOG_PREFIX)
        .filename_suffix("log")
        .build(logs_dir)
        .context("Failed to create log file appender")?;
    let (non_blocking_file, guard) = tracing_appender::non_blocking(file_appender);

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter());

    let console_layer = fmt::layer()
        .with_ansi(true)
        .compact()
        .with_line_number(false)
        .with_file(false)
        .with_target(true);

    let file_layer = fmt::layer()
        .with_writer(non_blocking_file)
        .with_ansi(false)
        .with_thread_ids(true)
        .with_line_number(true)
        .with_file(true)
        .with_target(true);

    tracing_subscriber::registry()
        .with(env_filter)
        .with(console_layer)
        .with(file_layer)
        .try_init()
        .context("Global tracing subscriber already installed")?;

    Ok(guard)
}
