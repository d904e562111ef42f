use std::path::PathBuf;

use super::{MetricSource, RawValue};
use crate::error::ProbeError;
use crate::probe;

/// CPU temperature from a thermal zone reporting millidegrees Celsius.
#[derive(Debug, Clone)]
pub struct CpuTemperature {
    pub path: PathBuf,
}

impl Default for CpuTemperature {
    fn default() -> Self {
        Self {
            path: PathBuf::from("/sys/class/thermal/thermal_zone0/temp"),
        }
    }
}

impl MetricSource for CpuTemperature {
    fn fetch_raw(&self) -> Result<RawValue, ProbeError> {
        let millidegrees = probe::first_field(&self.path)?;
        Ok(RawValue::Temperature {
            celsius: millidegrees / 1000.0,
        })
    }

    fn format(&self, raw: &RawValue) -> Option<String> {
        match raw {
            RawValue::Temperature { celsius } => Some(format!("{celsius:.0}°C")),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_millidegrees_to_celsius() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("temp");
        fs::write(&path, "47125\n").unwrap();

        let source = CpuTemperature { path };
        let raw = source.fetch_raw().unwrap();

        assert_eq!(source.format(&raw).as_deref(), Some("47°C"));
    }

    #[test]
    fn test_garbage_reading_is_parse_error() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("temp");
        fs::write(&path, "hot\n").unwrap();

        let source = CpuTemperature { path };
        assert!(matches!(source.fetch_raw(), Err(ProbeError::Parse(_))));
    }
}
