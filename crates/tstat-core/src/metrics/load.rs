use std::path::PathBuf;

use super::{MetricSource, RawValue};
use crate::error::ProbeError;
use crate::probe;

/// One-minute load average.
///
/// Reads `path` (in `/proc/loadavg` format) when set, otherwise asks the C
/// library.
#[derive(Debug, Clone, Default)]
pub struct LoadAverage {
    pub path: Option<PathBuf>,
}

impl MetricSource for LoadAverage {
    fn fetch_raw(&self) -> Result<RawValue, ProbeError> {
        let one_minute = match &self.path {
            Some(path) => probe::first_field(path)?,
            None => probe::load_average()?,
        };
        Ok(RawValue::Load { one_minute })
    }

    fn format(&self, raw: &RawValue) -> Option<String> {
        match raw {
            RawValue::Load { one_minute } => Some(format!("{one_minute:.2}")),
            _ => None,
        }
    }
}
