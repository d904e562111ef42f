use std::collections::HashMap;
use std::path::Path;

use crate::error::ProbeError;

/// Parsed `/proc/meminfo`, values in bytes.
#[derive(Debug, Clone, Default)]
pub struct MemInfo {
    values: HashMap<String, u64>,
}

impl MemInfo {
    /// # Errors
    /// Propagates read failures; malformed lines are skipped.
    pub fn read(path: &Path) -> Result<Self, ProbeError> {
        Ok(Self::parse(&super::read_trimmed(path)?))
    }

    pub fn parse(contents: &str) -> Self {
        let values = contents
            .lines()
            .filter_map(|line| {
                let mut fields = line.split_whitespace();
                let label = fields.next()?.strip_suffix(':')?;
                let amount: u64 = fields.next()?.parse().ok()?;
                let bytes = match fields.next() {
                    Some("kB") => amount.saturating_mul(1024),
                    _ => amount,
                };
                Some((label.to_string(), bytes))
            })
            .collect();
        Self { values }
    }

    pub fn get(&self, label: &str) -> Option<u64> {
        self.values.get(label).copied()
    }

    /// # Errors
    /// `NoData` if the label is absent.
    pub fn require(&self, label: &str) -> Result<u64, ProbeError> {
        self.get(label)
            .ok_or_else(|| ProbeError::no_data(format!("{label} missing from meminfo")))
    }
}
