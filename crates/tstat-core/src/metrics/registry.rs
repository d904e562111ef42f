//! Builds configured metrics from `[[metrics]]` entries.

use std::collections::HashSet;
use std::path::PathBuf;
use std::time::Duration;

use anyhow::{Context, Result, bail};
use serde::{Deserialize, Serialize};

use super::{
    Battery, CpuTemperature, Disk, LoadAverage, Memory, Metric, PendingUpdates, Swap, Uptime,
    VoltageCurve,
};
use crate::cache::validate_name;
use crate::config::MetricConfig;
use crate::refresh::RefreshMode;
use crate::render::{Color, Style};

/// Built-in metric kinds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    Updates,
    Uptime,
    Loadavg,
    Cputemp,
    Mem,
    Swap,
    Disk,
    Battery,
}

impl MetricKind {
    pub fn name(self) -> &'static str {
        match self {
            MetricKind::Updates => "updates",
            MetricKind::Uptime => "uptime",
            MetricKind::Loadavg => "loadavg",
            MetricKind::Cputemp => "cputemp",
            MetricKind::Mem => "mem",
            MetricKind::Swap => "swap",
            MetricKind::Disk => "disk",
            MetricKind::Battery => "battery",
        }
    }

    pub fn all() -> &'static [MetricKind] {
        &[
            MetricKind::Updates,
            MetricKind::Uptime,
            MetricKind::Loadavg,
            MetricKind::Cputemp,
            MetricKind::Mem,
            MetricKind::Swap,
            MetricKind::Disk,
            MetricKind::Battery,
        ]
    }

    pub fn default_ttl(self) -> Duration {
        let secs = match self {
            MetricKind::Updates => 3_600,
            MetricKind::Uptime => 29,
            MetricKind::Loadavg => 2,
            MetricKind::Cputemp => 3,
            MetricKind::Mem | MetricKind::Swap | MetricKind::Disk => 13,
            MetricKind::Battery => 17,
        };
        Duration::from_secs(secs)
    }

    pub fn default_refresh(self) -> RefreshMode {
        match self {
            MetricKind::Updates => RefreshMode::Background,
            _ => RefreshMode::Inline,
        }
    }

    pub fn default_style(self) -> Style {
        match self {
            MetricKind::Updates => Style::new(Color::White, Color::Red),
            MetricKind::Uptime => Style::new(Color::Blue, Color::White),
            MetricKind::Loadavg => Style::new(Color::Black, Color::BrightYellow),
            MetricKind::Cputemp => Style::new(Color::Black, Color::Red),
            MetricKind::Mem => Style::new(Color::White, Color::Green),
            MetricKind::Swap => Style::new(Color::White, Color::Cyan),
            MetricKind::Disk => Style::new(Color::White, Color::Magenta),
            MetricKind::Battery => Style::new(Color::Black, Color::Green),
        }
    }

    pub fn default_dependencies(self) -> Vec<PathBuf> {
        match self {
            MetricKind::Updates => PendingUpdates::default_dependencies(),
            _ => Vec::new(),
        }
    }
}

/// Outcome of building a list of metric entries.
///
/// Entries that fail to build are reported in `errors` and left out, so one
/// bad entry doesn't blank the whole line.
#[derive(Debug, Default)]
pub struct BuiltMetrics {
    pub metrics: Vec<Metric>,
    pub errors: Vec<anyhow::Error>,
}

/// Builds all entries, rejecting duplicate names.
pub fn build_all(configs: &[MetricConfig]) -> BuiltMetrics {
    let mut built = BuiltMetrics::default();
    let mut seen = HashSet::new();

    for config in configs {
        let name = config.effective_name();
        if !seen.insert(name.to_string()) {
            built
                .errors
                .push(anyhow::anyhow!("duplicate metric name '{name}'"));
            continue;
        }
        match build(config) {
            Ok(metric) => built.metrics.push(metric),
            Err(err) => built.errors.push(err),
        }
    }

    built
}

/// Builds one metric entry, applying kind defaults for unset fields.
///
/// # Errors
/// Returns an error for an invalid name or invalid probe settings.
pub fn build(config: &MetricConfig) -> Result<Metric> {
    let kind = config.kind;
    let name = config.effective_name();
    validate_name(name).with_context(|| format!("metric entry of kind '{}'", kind.name()))?;

    let defaults = kind.default_style();
    let style = Style {
        fg: config.fg.unwrap_or(defaults.fg),
        bg: config.bg.unwrap_or(defaults.bg),
        bright: config.bright.unwrap_or(defaults.bright),
    };

    let metric = match kind {
        MetricKind::Updates => Metric::new(name, updates_source(config)?),
        MetricKind::Uptime => Metric::new(
            name,
            Uptime {
                path: path_or(config, Uptime::default().path),
            },
        ),
        MetricKind::Loadavg => Metric::new(
            name,
            LoadAverage {
                path: config.path.clone(),
            },
        ),
        MetricKind::Cputemp => Metric::new(
            name,
            CpuTemperature {
                path: path_or(config, CpuTemperature::default().path),
            },
        ),
        MetricKind::Mem => Metric::new(
            name,
            Memory {
                path: path_or(config, Memory::default().path),
            },
        ),
        MetricKind::Swap => Metric::new(
            name,
            Swap {
                path: path_or(config, Swap::default().path),
            },
        ),
        MetricKind::Disk => Metric::new(
            name,
            Disk {
                path: path_or(config, Disk::default().path),
            },
        ),
        MetricKind::Battery => Metric::new(name, battery_source(config)?),
    };

    Ok(metric
        .with_ttl(
            config
                .ttl_secs
                .map_or_else(|| kind.default_ttl(), Duration::from_secs),
        )
        .with_refresh(config.refresh.unwrap_or_else(|| kind.default_refresh()))
        .with_dependencies(
            config
                .dependencies
                .clone()
                .unwrap_or_else(|| kind.default_dependencies()),
        )
        .with_style(style))
}

fn path_or(config: &MetricConfig, default: PathBuf) -> PathBuf {
    config.path.clone().unwrap_or(default)
}

fn updates_source(config: &MetricConfig) -> Result<PendingUpdates> {
    let defaults = PendingUpdates::default();
    let command = config.command.clone().unwrap_or(defaults.command);
    if command.first().is_none_or(|program| program.trim().is_empty()) {
        bail!("metric '{}': command must not be empty", config.effective_name());
    }
    Ok(PendingUpdates {
        command,
        line_prefix: config.line_prefix.clone().unwrap_or(defaults.line_prefix),
    })
}

fn battery_source(config: &MetricConfig) -> Result<Battery> {
    let defaults = Battery::default();
    let curve = match &config.curve {
        Some(points) => VoltageCurve::new(points.iter().map(|[v, p]| (*v, *p)).collect())
            .map_err(|msg| anyhow::anyhow!("metric '{}': {msg}", config.effective_name()))?,
        None => defaults.curve,
    };
    Ok(Battery {
        path: path_or(config, defaults.path),
        source: config.source.unwrap_or(defaults.source),
        curve,
    })
}
