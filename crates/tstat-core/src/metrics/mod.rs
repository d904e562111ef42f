//! Metric abstraction and the built-in metric variants.
//!
//! A [`MetricSource`] knows how to probe one kind of measurement and how to
//! turn that measurement into display text. A [`Metric`] pairs a source with
//! the settings the engine needs: cache name, staleness policy, refresh mode
//! and segment style.

mod battery;
mod load;
mod registry;
mod storage;
mod thermal;
mod updates;
mod uptime;

use std::fmt;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

pub use battery::{Battery, BatterySource, VoltageCurve};
pub use load::LoadAverage;
pub use registry::{BuiltMetrics, MetricKind, build, build_all};
pub use storage::{Disk, Memory, Swap};
pub use thermal::CpuTemperature;
pub use updates::PendingUpdates;
pub use uptime::Uptime;

use crate::cache::staleness::StalenessPolicy;
use crate::error::ProbeError;
use crate::refresh::RefreshMode;
use crate::render::Style;

/// A probe's native measurement.
///
/// Each variant is produced and decoded by exactly one kind of source. The
/// tag keeps cache files self-describing, so a file written by a different
/// kind of source decodes but is rejected by [`MetricSource::format`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RawValue {
    Count { count: u64 },
    Duration { seconds: f64 },
    Load { one_minute: f64 },
    Temperature { celsius: f64 },
    Storage { total_bytes: u64, used_percent: u8 },
    Battery { percent: f64, charging: bool },
}

/// Probe plus formatter for one kind of measurement.
pub trait MetricSource: fmt::Debug {
    /// Takes a fresh measurement. May be slow for background metrics.
    ///
    /// # Errors
    /// Returns a [`ProbeError`] when no value is available; the engine treats
    /// every error as "no data".
    fn fetch_raw(&self) -> Result<RawValue, ProbeError>;

    /// Formats a measurement produced by [`MetricSource::fetch_raw`].
    ///
    /// Must be pure. Returns `None` only for values of another kind's shape;
    /// an empty string means "nothing worth showing".
    fn format(&self, raw: &RawValue) -> Option<String>;
}

/// A configured metric.
#[derive(Debug)]
pub struct Metric {
    name: String,
    policy: StalenessPolicy,
    refresh: RefreshMode,
    style: Style,
    source: Box<dyn MetricSource>,
}

impl Metric {
    pub fn new(name: impl Into<String>, source: impl MetricSource + 'static) -> Self {
        Self {
            name: name.into(),
            policy: StalenessPolicy::new(Duration::from_secs(15), Vec::new()),
            refresh: RefreshMode::Inline,
            style: Style::default(),
            source: Box::new(source),
        }
    }

    #[must_use]
    pub fn with_ttl(mut self, ttl: Duration) -> Self {
        self.policy.ttl = ttl;
        self
    }

    #[must_use]
    pub fn with_dependencies(mut self, dependencies: Vec<PathBuf>) -> Self {
        self.policy.dependencies = dependencies;
        self
    }

    #[must_use]
    pub fn with_refresh(mut self, refresh: RefreshMode) -> Self {
        self.refresh = refresh;
        self
    }

    #[must_use]
    pub fn with_style(mut self, style: Style) -> Self {
        self.style = style;
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn ttl(&self) -> Duration {
        self.policy.ttl
    }

    pub fn dependencies(&self) -> &[PathBuf] {
        &self.policy.dependencies
    }

    pub fn policy(&self) -> &StalenessPolicy {
        &self.policy
    }

    pub fn refresh(&self) -> RefreshMode {
        self.refresh
    }

    pub fn style(&self) -> Style {
        self.style
    }

    /// # Errors
    /// Propagates the source's probe error.
    pub fn fetch_raw(&self) -> Result<RawValue, ProbeError> {
        self.source.fetch_raw()
    }

    pub fn format(&self, raw: &RawValue) -> Option<String> {
        self.source.format(raw)
    }
}
