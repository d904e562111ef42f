//! Cache inspection commands.

use std::time::SystemTime;

use anyhow::Result;
use chrono::{DateTime, Local};
use tstat_core::cache::lock::RefreshLock;
use tstat_core::format::format_duration;
use tstat_core::metrics::RawValue;

use crate::cli::setup::Workspace;

pub fn dir() -> Result<()> {
    let ws = Workspace::open_lenient()?;
    println!("{}", ws.cache_dir().display());
    Ok(())
}

pub fn list() -> Result<()> {
    let ws = Workspace::open()?;
    let now = SystemTime::now();

    println!(
        "{:<12} {:<12} {:>8} {:<19} {:<6} VALUE",
        "NAME", "STATE", "AGE", "WRITTEN", "LOCK"
    );
    for metric in &ws.metrics {
        let entry = ws.store.get::<RawValue>(metric.name());
        let written_at = entry.as_ref().map(|e| e.written_at);
        let state = metric.policy().check(written_at, now);
        let age = written_at
            .and_then(|at| now.duration_since(at).ok())
            .map_or_else(|| "-".to_string(), |age| format_duration(age.as_secs_f64()));
        let written = written_at.map_or_else(
            || "-".to_string(),
            |at| {
                DateTime::<Local>::from(at)
                    .format("%Y-%m-%d %H:%M:%S")
                    .to_string()
            },
        );
        let locked = ws
            .store
            .lock_path(metric.name())
            .is_ok_and(|path| RefreshLock::is_held(&path));
        let value = entry
            .and_then(|e| metric.format(&e.value))
            .unwrap_or_default();

        println!(
            "{:<12} {:<12} {:>8} {:<19} {:<6} {}",
            metric.name(),
            state.label(),
            age,
            written,
            if locked { "held" } else { "-" },
            value
        );
    }
    Ok(())
}
