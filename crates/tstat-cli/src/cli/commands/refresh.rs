//! Refresh command handlers.

use anyhow::{Context, Result, bail};
use tstat_core::cache::lock::RefreshLock;
use tstat_core::clock::SystemClock;
use tstat_core::refresh::{self, RefreshResult};

use crate::cli::setup::Workspace;

/// Foreground refresh of one metric.
pub fn run(name: &str) -> Result<()> {
    let ws = Workspace::open()?;
    let Some(metric) = ws.find(name) else {
        bail!("unknown metric '{name}'");
    };

    match ws
        .coordinator()
        .refresh_now(metric)
        .with_context(|| format!("refresh {name}"))?
    {
        RefreshResult::Updated(raw) => {
            let text = metric.format(&raw).unwrap_or_default();
            println!("{name}: {text}");
        }
        RefreshResult::Contended => println!("{name}: refresh already in progress"),
        RefreshResult::Failed(reason) => bail!("refresh of {name} failed: {reason}"),
    }
    Ok(())
}

/// Detached worker body. Adopts the lock taken by the spawning render and
/// always releases it, whatever happens to the probe.
pub fn run_worker(name: &str) {
    let ws = match Workspace::open_lenient() {
        Ok(ws) => ws,
        Err(err) => {
            // Without the cache directory there is no lock to release either.
            let error = format!("{err:#}");
            tracing::error!(metric = name, %error, "refresh worker could not start");
            return;
        }
    };

    let lock = match ws.store.lock_path(name) {
        Ok(path) => RefreshLock::adopt(path),
        Err(err) => {
            tracing::error!(metric = name, error = %err, "refresh worker given invalid name");
            return;
        }
    };

    let Some(metric) = ws.find(name) else {
        tracing::warn!(metric = name, "refresh worker for unconfigured metric");
        lock.release();
        return;
    };

    match refresh::run_worker(&ws.store, metric, lock, &SystemClock) {
        RefreshResult::Updated(_) => tracing::debug!(metric = name, "background refresh done"),
        RefreshResult::Failed(_) | RefreshResult::Contended => {}
    }
}
