//! Shared start-up: config, cache directory, logging, metrics.

use std::path::PathBuf;

use anyhow::Result;
use tstat_core::cache::{CacheStore, dir};
use tstat_core::clock::SystemClock;
use tstat_core::config::Config;
use tstat_core::logging;
use tstat_core::metrics::{Metric, build_all};
use tstat_core::refresh::{Coordinator, ProcessLauncher};

/// Everything a command needs after start-up.
pub struct Workspace {
    pub config: Config,
    pub store: CacheStore,
    pub metrics: Vec<Metric>,
}

impl Workspace {
    /// Strict start-up: a broken config file is an error.
    pub fn open() -> Result<Self> {
        let config = Config::load()?;
        Self::with_config(config)
    }

    /// Start-up for paths that must not fail on config problems.
    ///
    /// A broken config is logged and replaced by defaults. Only an unusable
    /// cache directory is an error.
    pub fn open_lenient() -> Result<Self> {
        match Config::load() {
            Ok(config) => Self::with_config(config),
            Err(err) => {
                let ws = Self::with_config(Config::default())?;
                let error = format!("{err:#}");
                tracing::error!(%error, "config unusable, falling back to defaults");
                Ok(ws)
            }
        }
    }

    fn with_config(config: Config) -> Result<Self> {
        let cache_dir = dir::resolve(config.cache_root.as_deref())?;
        // Best-effort: the status line matters more than its log.
        let _ = logging::init(&cache_dir);

        let built = build_all(&config.metrics);
        for err in &built.errors {
            let error = format!("{err:#}");
            tracing::warn!(%error, "skipping metric entry");
        }

        Ok(Self {
            config,
            store: CacheStore::new(cache_dir),
            metrics: built.metrics,
        })
    }

    pub fn cache_dir(&self) -> PathBuf {
        self.store.dir().to_path_buf()
    }

    pub fn find(&self, name: &str) -> Option<&Metric> {
        self.metrics.iter().find(|m| m.name() == name)
    }

    pub fn coordinator(&self) -> Coordinator<'_, SystemClock, ProcessLauncher> {
        let launcher = ProcessLauncher::current_exe(self.cache_dir()).unwrap_or_else(|err| {
            let error = format!("{err:#}");
            tracing::warn!(%error, "falling back to tstat on PATH for refresh workers");
            ProcessLauncher::new("tstat", self.cache_dir())
        });
        Coordinator::new(&self.store, SystemClock, launcher)
            .with_lock_max_age(self.config.lock_max_age())
    }
}
