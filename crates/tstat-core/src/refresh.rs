//! Refresh coordination: serve cached values immediately, refresh stale ones
//! inline (cheap probes) or in a detached worker (expensive probes).
//!
//! ## Per-metric states
//!
//! - **Fresh**: cache entry within TTL and no dependency touched since
//! - **Stale**: entry expired, invalidated, missing or corrupt
//! - **Refreshing**: a worker holds the metric's refresh lock
//!
//! A reader that finds a metric refreshing keeps serving the last good value
//! (or nothing) and leaves the lock alone. Nothing on the render path waits
//! for a probe that runs in the background.

use std::path::PathBuf;
use std::process::{Command, Stdio};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::cache::dir::CACHE_DIR_ENV;
use crate::cache::lock::RefreshLock;
use crate::cache::staleness::Staleness;
use crate::cache::{CacheEntry, CacheStore};
use crate::clock::Clock;
use crate::metrics::{Metric, RawValue};

/// How a stale metric gets recomputed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RefreshMode {
    /// Cheap probe: run it on the render path.
    #[default]
    Inline,
    /// Expensive probe: hand it to a detached worker and serve old data.
    Background,
}

/// Starts a background refresh that owns `lock`.
///
/// Implementations must return without waiting for the probe, and must make
/// sure the lock is released once the refresh finishes or fails to start.
pub trait Launcher {
    /// # Errors
    /// Returns an error if the refresh could not be started; the lock is
    /// released by dropping it.
    fn launch(&self, metric: &Metric, lock: RefreshLock) -> Result<()>;
}

/// Launches `<program> refresh <name> --worker` as a detached child process.
///
/// The child shares nothing with its spawner except the cache directory,
/// passed through `TSTAT_CACHE_DIR`. Lock ownership moves to the child.
#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    program: PathBuf,
    cache_dir: PathBuf,
}

impl ProcessLauncher {
    pub fn new(program: impl Into<PathBuf>, cache_dir: impl Into<PathBuf>) -> Self {
        Self {
            program: program.into(),
            cache_dir: cache_dir.into(),
        }
    }

    /// Launcher that re-executes the running binary.
    ///
    /// # Errors
    /// Returns an error if the current executable can't be determined.
    pub fn current_exe(cache_dir: impl Into<PathBuf>) -> Result<Self> {
        let program = std::env::current_exe().context("Failed to get executable path")?;
        Ok(Self::new(program, cache_dir))
    }

    fn command(&self, metric: &Metric) -> Command {
        let mut command = Command::new(&self.program);
        command
            .args(["refresh", metric.name(), "--worker"])
            .env(CACHE_DIR_ENV, &self.cache_dir)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        #[cfg(unix)]
        {
            use std::os::unix::process::CommandExt;
            // Own process group: the worker outlives the render and must not
            // receive signals aimed at the caller's job.
            command.process_group(0);
        }
        command
    }
}

impl Launcher for ProcessLauncher {
    fn launch(&self, metric: &Metric, lock: RefreshLock) -> Result<()> {
        let child = self
            .command(metric)
            .spawn()
            .with_context(|| format!("spawn refresh worker for {}", metric.name()))?;
        tracing::debug!(metric = metric.name(), pid = child.id(), "launched refresh worker");
        // The child removes the marker when it finishes.
        lock.hand_off();
        Ok(())
    }
}

/// What happened while resolving a metric's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// Served from a fresh cache entry.
    Fresh,
    /// Stale or missing; probed inline and cached.
    Refreshed,
    /// Inline probe produced no data.
    NoData,
    /// Stale or missing; a background refresh was started.
    Launched,
    /// Stale or missing; another refresh already holds the lock.
    Contended,
    /// Stale or missing; the background refresh could not be started.
    LaunchFailed,
}

/// A resolved value plus how it was obtained.
#[derive(Debug, Clone, PartialEq)]
pub struct Resolution {
    pub raw: Option<RawValue>,
    pub outcome: Outcome,
}

/// Result of a foreground refresh.
#[derive(Debug, Clone, PartialEq)]
pub enum RefreshResult {
    Updated(RawValue),
    Failed(String),
    Contended,
}

/// Decides, per metric, whether to serve the cache, probe inline, or launch
/// a background refresh.
#[derive(Debug)]
pub struct Coordinator<'a, C, L> {
    store: &'a CacheStore,
    clock: C,
    launcher: L,
    lock_max_age: Option<Duration>,
}

impl<'a, C: Clock, L: Launcher> Coordinator<'a, C, L> {
    pub fn new(store: &'a CacheStore, clock: C, launcher: L) -> Self {
        Self {
            store,
            clock,
            launcher,
            lock_max_age: None,
        }
    }

    /// Lets a refresh attempt remove lock markers older than `max_age`.
    ///
    /// Off by default: an abandoned marker then blocks background refreshes
    /// of that metric until removed by hand.
    #[must_use]
    pub fn with_lock_max_age(mut self, max_age: Option<Duration>) -> Self {
        self.lock_max_age = max_age.filter(|age| !age.is_zero());
        self
    }

    pub fn store(&self) -> &CacheStore {
        self.store
    }

    /// Formatted value for `metric`, or `None` when there is nothing to show.
    pub fn value_for(&self, metric: &Metric) -> Option<String> {
        let resolution = self.resolve(metric);
        resolution
            .raw
            .and_then(|raw| metric.format(&raw))
            .filter(|text| !text.is_empty())
    }

    /// Resolves `metric` to the best value available right now.
    pub fn resolve(&self, metric: &Metric) -> Resolution {
        let now = self.clock.now();
        let cached = self.cached(metric);
        let staleness = metric
            .policy()
            .check(cached.as_ref().map(|e| e.written_at), now);

        if staleness == Staleness::Fresh {
            return Resolution {
                raw: cached.map(|e| e.value),
                outcome: Outcome::Fresh,
            };
        }
        tracing::debug!(metric = metric.name(), state = staleness.label(), "cache stale");

        match metric.refresh() {
            RefreshMode::Inline => self.refresh_inline(metric),
            RefreshMode::Background => Resolution {
                outcome: self.refresh_in_background(metric),
                raw: cached.map(|e| e.value),
            },
        }
    }

    /// Refreshes `metric` in the foreground, honouring its refresh lock.
    pub fn refresh_now(&self, metric: &Metric) -> Result<RefreshResult> {
        let lock_path = self.store.lock_path(metric.name())?;
        let lock = RefreshLock::try_acquire(&lock_path, self.lock_max_age, self.clock.now())
            .with_context(|| format!("acquire refresh lock {}", lock_path.display()))?;
        let Some(lock) = lock else {
            return Ok(RefreshResult::Contended);
        };
        Ok(run_worker(self.store, metric, lock, &self.clock))
    }

    /// Cache entry if present and of this metric's shape.
    fn cached(&self, metric: &Metric) -> Option<CacheEntry<RawValue>> {
        let entry = self.store.get::<RawValue>(metric.name())?;
        if metric.format(&entry.value).is_none() {
            tracing::debug!(metric = metric.name(), "cache entry has foreign shape, treating as miss");
            return None;
        }
        Some(entry)
    }

    fn refresh_inline(&self, metric: &Metric) -> Resolution {
        match metric.fetch_raw() {
            Ok(raw) => {
                if let Err(err) = self.store.put(metric.name(), &raw, self.clock.now()) {
                    tracing::warn!(metric = metric.name(), error = %err, "failed to cache value");
                }
                Resolution {
                    raw: Some(raw),
                    outcome: Outcome::Refreshed,
                }
            }
            Err(err) => {
                tracing::debug!(metric = metric.name(), error = %err, "no data");
                Resolution {
                    raw: None,
                    outcome: Outcome::NoData,
                }
            }
        }
    }

    fn refresh_in_background(&self, metric: &Metric) -> Outcome {
        let lock_path = match self.store.lock_path(metric.name()) {
            Ok(path) => path,
            Err(err) => {
                tracing::warn!(metric = metric.name(), error = %err, "no lock path");
                return Outcome::LaunchFailed;
            }
        };

        match RefreshLock::try_acquire(&lock_path, self.lock_max_age, self.clock.now()) {
            Ok(Some(lock)) => match self.launcher.launch(metric, lock) {
                Ok(()) => Outcome::Launched,
                Err(err) => {
                    let error = format!("{err:#}");
                    tracing::warn!(metric = metric.name(), %error, "refresh launch failed");
                    Outcome::LaunchFailed
                }
            },
            Ok(None) => {
                tracing::debug!(metric = metric.name(), "refresh already in progress");
                Outcome::Contended
            }
            Err(err) => {
                tracing::warn!(metric = metric.name(), error = %err, "failed to take refresh lock");
                Outcome::LaunchFailed
            }
        }
    }
}

/// Body of a refresh worker: probe, write via temp file + rename, release.
///
/// A failed probe leaves the previous entry in place. The lock is released
/// in every case when `lock` drops at the end of this call.
pub fn run_worker(
    store: &CacheStore,
    metric: &Metric,
    lock: RefreshLock,
    clock: &impl Clock,
) -> RefreshResult {
    let result = match metric.fetch_raw() {
        Ok(raw) => match store.put(metric.name(), &raw, clock.now()) {
            Ok(()) => RefreshResult::Updated(raw),
            Err(err) => {
                tracing::warn!(metric = metric.name(), error = %err, "failed to cache refreshed value");
                RefreshResult::Failed(err.to_string())
            }
        },
        Err(err) => {
            tracing::warn!(metric = metric.name(), error = %err, "refresh probe failed");
            RefreshResult::Failed(err.to_string())
        }
    };
    lock.release();
    result
}
