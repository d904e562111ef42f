use std::path::PathBuf;

use super::{MetricSource, RawValue};
use crate::error::ProbeError;
use crate::format::format_duration;
use crate::probe;

/// System uptime from `/proc/uptime`.
#[derive(Debug, Clone)]
pub struct Uptime {
    pub path: PathBuf,
}

impl Default for Uptime {
    fn default() -> Self {
        Self {
            path: PathBuf::from("/proc/uptime"),
        }
    }
}

impl MetricSource for Uptime {
    fn fetch_raw(&self) -> Result<RawValue, ProbeError> {
        let seconds = probe::first_field(&self.path)?;
        Ok(RawValue::Duration { seconds })
    }

    fn format(&self, raw: &RawValue) -> Option<String> {
        match raw {
            RawValue::Duration { seconds } => Some(format_duration(*seconds)),
            _ => None,
        }
    }
}
