//! Log setup.
//!
//! stdout carries the status line, so logs go to `tstat.log` in the cache
//! directory. The filter comes from `TSTAT_LOG` (default `warn`).

use std::path::Path;

use anyhow::{Context, Result};
use tracing_appender::rolling::{RollingFileAppender, Rotation};
use tracing_subscriber::EnvFilter;

pub const LOG_ENV: &str = "TSTAT_LOG";
pub const LOG_FILE: &str = "tstat.log";

const DEFAULT_FILTER: &str = "warn";

/// Installs the global subscriber writing to `<dir>/tstat.log`.
///
/// Writes are synchronous so a short-lived process never loses its last lines
/// and no writer thread is started.
///
/// # Errors
/// Returns an error if the log file can't be opened or a subscriber is
/// already installed.
pub fn init(dir: &Path) -> Result<()> {
    let appender = RollingFileAppender::builder()
        .rotation(Rotation::NEVER)
        .filename_prefix(LOG_FILE)
        .build(dir)
        .with_context(|| format!("open log file in {}", dir.display()))?;

    let filter =
        EnvFilter::try_from_env(LOG_ENV).unwrap_or_else(|_| EnvFilter::new(DEFAULT_FILTER));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(appender)
        .with_ansi(false)
        .try_init()
        .map_err(|e| anyhow::anyhow!("install log subscriber: {e}"))
}
