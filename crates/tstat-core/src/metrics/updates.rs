use std::path::PathBuf;
use std::process::{Command, Stdio};

use super::{MetricSource, RawValue};
use crate::error::ProbeError;

/// Pending package updates, counted from a package manager dry run.
///
/// Slow (hundreds of milliseconds to seconds), so it normally refreshes in
/// the background and is invalidated early by the package manager's state
/// files changing.
#[derive(Debug, Clone)]
pub struct PendingUpdates {
    /// Program and arguments to run.
    pub command: Vec<String>,
    /// Output lines starting with this prefix are counted.
    pub line_prefix: String,
}

impl PendingUpdates {
    pub fn default_command() -> Vec<String> {
        ["apt-get", "-s", "-o", "Debug::NoLocking=true", "upgrade"]
            .into_iter()
            .map(String::from)
            .collect()
    }

    pub fn default_dependencies() -> Vec<PathBuf> {
        ["/var/lib/apt", "/var/lib/apt/lists", "/var/log/dpkg.log"]
            .into_iter()
            .map(PathBuf::from)
            .collect()
    }
}

impl Default for PendingUpdates {
    fn default() -> Self {
        Self {
            command: Self::default_command(),
            line_prefix: "Inst".to_string(),
        }
    }
}

impl MetricSource for PendingUpdates {
    fn fetch_raw(&self) -> Result<RawValue, ProbeError> {
        let (program, args) = self
            .command
            .split_first()
            .ok_or_else(|| ProbeError::Command("empty command".to_string()))?;

        let output = Command::new(program)
            .args(args)
            .stdin(Stdio::null())
            .stderr(Stdio::null())
            .output()
            .map_err(|e| ProbeError::Command(format!("failed to run {program}: {e}")))?;
        if !output.status.success() {
            return Err(ProbeError::Command(format!(
                "{program} exited with {}",
                output.status
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let count = stdout
            .lines()
            .filter(|line| line.starts_with(&self.line_prefix))
            .count() as u64;
        Ok(RawValue::Count { count })
    }

    fn format(&self, raw: &RawValue) -> Option<String> {
        match raw {
            RawValue::Count { count: 0 } => Some(String::new()),
            RawValue::Count { count } => Some(format!("{count}!")),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn shell(script: &str) -> PendingUpdates {
        PendingUpdates {
            command: vec!["sh".to_string(), "-c".to_string(), script.to_string()],
            line_prefix: "Inst".to_string(),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_counts_prefixed_lines() {
        let source = shell("printf 'Inst a\\nConf a\\nInst b\\nInst c\\n'");

        let raw = source.fetch_raw().unwrap();

        assert_eq!(raw, RawValue::Count { count: 3 });
        assert_eq!(source.format(&raw).as_deref(), Some("3!"));
    }

    #[cfg(unix)]
    #[test]
    fn test_failing_command_is_probe_failure() {
        let source = shell("exit 100");
        assert!(matches!(source.fetch_raw(), Err(ProbeError::Command(_))));
    }

    #[test]
    fn test_missing_program_is_probe_failure() {
        let source = PendingUpdates {
            command: vec!["/nonexistent/tstat-package-manager".to_string()],
            line_prefix: "Inst".to_string(),
        };
        assert!(matches!(source.fetch_raw(), Err(ProbeError::Command(_))));
    }

    #[test]
    fn test_zero_updates_formats_empty() {
        let source = PendingUpdates::default();
        assert_eq!(
            source.format(&RawValue::Count { count: 0 }).as_deref(),
            Some("")
        );
    }
}
