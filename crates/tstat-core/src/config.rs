//! Configuration management for tstat.
//!
//! Loads configuration from ${TSTAT_HOME}/config.toml with sensible defaults.

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

use crate::metrics::{BatterySource, MetricKind};
use crate::refresh::RefreshMode;
use crate::render::{Color, OutputFormat};

/// Returns the default config template with comments.
///
/// This is embedded from default_config.toml at compile time.
/// To update, edit default_config.toml directly.
fn default_config_template() -> &'static str {
    include_str!("../default_config.toml")
}

/// Recursively merges items from source table into target table.
fn merge_items(target: &mut toml_edit::Table, source: &toml_edit::Table) {
    use toml_edit::Item;

    for (key, value) in source.iter() {
        match value {
            Item::Value(v) => {
                target[key] = Item::Value(v.clone());
            }
            Item::Table(src_table) => {
                if let Some(Item::Table(target_table)) = target.get_mut(key) {
                    merge_items(target_table, src_table);
                } else {
                    target[key] = Item::Table(src_table.clone());
                }
            }
            Item::ArrayOfTables(src_arr) => {
                // Metric lists are ordered; replace wholesale.
                target[key] = Item::ArrayOfTables(src_arr.clone());
            }
            Item::None => {}
        }
    }
}

pub mod paths {
    //! Path resolution for tstat configuration.
    //!
    //! TSTAT_HOME resolution order:
    //! 1. TSTAT_HOME environment variable (if set)
    //! 2. ~/.config/tstat (default)

    use std::path::PathBuf;

    use anyhow::{Context, Result};

    pub const HOME_ENV: &str = "TSTAT_HOME";

    /// Returns the tstat home directory.
    ///
    /// # Errors
    /// Returns an error if TSTAT_HOME is unset and no home directory is known.
    pub fn tstat_home() -> Result<PathBuf> {
        if let Some(home) = std::env::var_os(HOME_ENV).filter(|v| !v.is_empty()) {
            return Ok(PathBuf::from(home));
        }

        dirs::home_dir()
            .map(|h| h.join(".config").join("tstat"))
            .context("Could not determine home directory")
    }

    /// Returns the path to the config.toml file.
    ///
    /// # Errors
    /// See [`tstat_home`].
    pub fn config_path() -> Result<PathBuf> {
        Ok(tstat_home()?.join("config.toml"))
    }
}

/// One `[[metrics]]` entry. Unset fields fall back to the kind's defaults.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricConfig {
    pub kind: MetricKind,

    /// Cache name; defaults to the kind name. Must be unique.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ttl_secs: Option<u64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub refresh: Option<RefreshMode>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fg: Option<Color>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bg: Option<Color>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bright: Option<bool>,

    /// Files whose modification invalidates the cached value early.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub dependencies: Option<Vec<PathBuf>>,

    /// Probe input: a kernel file, mount point or power-supply directory.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<PathBuf>,

    /// `updates`: program and arguments of the dry-run command.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub command: Option<Vec<String>>,

    /// `updates`: output lines starting with this prefix are counted.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub line_prefix: Option<String>,

    /// `battery`: read `capacity` directly or derive it from `voltage_now`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source: Option<BatterySource>,

    /// `battery`: `[volts, percent]` points for the voltage source.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub curve: Option<Vec<[f64; 2]>>,
}

impl MetricConfig {
    /// Entry with only the kind set.
    pub fn of(kind: MetricKind) -> Self {
        Self {
            kind,
            name: None,
            ttl_secs: None,
            refresh: None,
            fg: None,
            bg: None,
            bright: None,
            dependencies: None,
            path: None,
            command: None,
            line_prefix: None,
            source: None,
            curve: None,
        }
    }

    pub fn effective_name(&self) -> &str {
        self.name.as_deref().unwrap_or(self.kind.name())
    }
}

/// Main configuration structure.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Markup for the rendered line
    pub format: OutputFormat,

    /// Directory scanned for the shared cache directory
    #[serde(skip_serializing_if = "Option::is_none")]
    pub cache_root: Option<PathBuf>,

    /// Age after which an abandoned refresh lock is removed (0 disables)
    pub lock_timeout_secs: u64,

    /// Metrics in display order
    pub metrics: Vec<MetricConfig>,
}

impl Config {
    const DEFAULT_METRICS: [MetricKind; 7] = [
        MetricKind::Updates,
        MetricKind::Uptime,
        MetricKind::Cputemp,
        MetricKind::Loadavg,
        MetricKind::Mem,
        MetricKind::Swap,
        MetricKind::Disk,
    ];

    /// Loads configuration from the default config path.
    ///
    /// # Errors
    /// Returns an error if the file exists but can't be read or parsed.
    pub fn load() -> Result<Self> {
        Self::load_from(&paths::config_path()?)
    }

    /// Loads configuration from a specific path.
    /// Returns defaults if file doesn't exist.
    ///
    /// # Errors
    /// Returns an error if the file exists but can't be read or parsed.
    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let contents = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config from {}", path.display()))?;
            toml::from_str(&contents)
                .with_context(|| format!("Failed to parse config from {}", path.display()))
        } else {
            Ok(Config::default())
        }
    }

    /// Refresh lock age limit, `None` when recovery is disabled.
    pub fn lock_max_age(&self) -> Option<Duration> {
        (self.lock_timeout_secs > 0).then(|| Duration::from_secs(self.lock_timeout_secs))
    }

    /// Creates a default config file at the given path.
    ///
    /// # Errors
    /// Returns an error if the file already exists or can't be written.
    pub fn init(path: &Path) -> Result<()> {
        if path.exists() {
            anyhow::bail!("Config file already exists at {}", path.display());
        }

        Self::write_config(path, default_config_template())
    }

    /// Generates a fresh config TOML from Rust defaults.
    ///
    /// Used by `xtask update-default-config` to keep `default_config.toml`
    /// in sync with [`Config::default`]. Comments outside the metric list
    /// are preserved from the embedded template.
    ///
    /// # Errors
    /// Returns an error if the template or the generated TOML fails to parse.
    pub fn generate() -> Result<String> {
        use toml_edit::DocumentMut;

        let generated_toml = toml::to_string(&Config::default())
            .context("Failed to serialize default config to TOML")?;

        let mut doc: DocumentMut = default_config_template()
            .parse()
            .context("Failed to parse default config template")?;
        let generated_doc: DocumentMut = generated_toml
            .parse()
            .context("Failed to parse generated config")?;

        merge_items(doc.as_table_mut(), generated_doc.as_table());

        Ok(doc.to_string())
    }

    /// Writes config content to a file, creating parent directories as needed.
    /// Uses atomic write (temp file + rename) to prevent corruption.
    fn write_config(path: &Path, content: &str) -> Result<()> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .with_context(|| format!("Failed to create directory {}", parent.display()))?;
        }

        let tmp_path = path.with_extension("toml.tmp");
        fs::write(&tmp_path, content)
            .with_context(|| format!("Failed to write config to {}", tmp_path.display()))?;
        fs::rename(&tmp_path, path).with_context(|| {
            format!(
                "Failed to rename {} to {}",
                tmp_path.display(),
                path.display()
            )
        })?;

        Ok(())
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            format: OutputFormat::Tmux,
            cache_root: None,
            lock_timeout_secs: 0,
            metrics: Self::DEFAULT_METRICS
                .into_iter()
                .map(MetricConfig::of)
                .collect(),
        }
    }
}
