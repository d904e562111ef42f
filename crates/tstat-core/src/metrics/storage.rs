//! Capacity metrics: RAM, swap and a filesystem.
//!
//! All three report total size plus percentage used and share one format.

use std::path::PathBuf;

use super::{MetricSource, RawValue};
use crate::error::ProbeError;
use crate::format::format_binary_size;
use crate::probe;

fn format_storage(raw: &RawValue) -> Option<String> {
    match raw {
        RawValue::Storage {
            total_bytes,
            used_percent,
        } => Some(format!("{}{used_percent}%", format_binary_size(*total_bytes))),
        _ => None,
    }
}

fn storage(total_bytes: u64, free_bytes: u64) -> Result<RawValue, ProbeError> {
    if total_bytes == 0 {
        return Err(ProbeError::no_data("zero capacity"));
    }
    let free_percent = free_bytes.min(total_bytes).saturating_mul(100) / total_bytes;
    Ok(RawValue::Storage {
        total_bytes,
        used_percent: (100 - free_percent) as u8,
    })
}

/// Physical memory from `/proc/meminfo`.
#[derive(Debug, Clone)]
pub struct Memory {
    pub path: PathBuf,
}

impl Default for Memory {
    fn default() -> Self {
        Self {
            path: PathBuf::from("/proc/meminfo"),
        }
    }
}

impl MetricSource for Memory {
    fn fetch_raw(&self) -> Result<RawValue, ProbeError> {
        let info = probe::MemInfo::read(&self.path)?;
        let total = info.require("MemTotal")?;
        // Older kernels have no MemAvailable; approximate with free + page cache.
        let free = match info.get("MemAvailable") {
            Some(available) => available,
            None => info.require("MemFree")? + info.require("Cached")?,
        };
        storage(total, free)
    }

    fn format(&self, raw: &RawValue) -> Option<String> {
        format_storage(raw)
    }
}

/// Swap space from `/proc/meminfo`. No swap configured means no data.
#[derive(Debug, Clone)]
pub struct Swap {
    pub path: PathBuf,
}

impl Default for Swap {
    fn default() -> Self {
        Self {
            path: PathBuf::from("/proc/meminfo"),
        }
    }
}

impl MetricSource for Swap {
    fn fetch_raw(&self) -> Result<RawValue, ProbeError> {
        let info = probe::MemInfo::read(&self.path)?;
        let total = info.require("SwapTotal")?;
        if total == 0 {
            return Err(ProbeError::no_data("no swap configured"));
        }
        storage(total, info.require("SwapFree")?)
    }

    fn format(&self, raw: &RawValue) -> Option<String> {
        format_storage(raw)
    }
}

/// Filesystem containing `path`.
#[derive(Debug, Clone)]
pub struct Disk {
    pub path: PathBuf,
}

impl Default for Disk {
    fn default() -> Self {
        Self {
            path: PathBuf::from("/"),
        }
    }
}

impl MetricSource for Disk {
    fn fetch_raw(&self) -> Result<RawValue, ProbeError> {
        let usage = probe::filesystem_usage(&self.path)?;
        storage(usage.total_bytes, usage.free_bytes)
    }

    fn format(&self, raw: &RawValue) -> Option<String> {
        format_storage(raw)
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use tempfile::tempdir;

    use super::*;

    const MEMINFO: &str = "\
MemTotal:       16384000 kB
MemFree:         1000000 kB
MemAvailable:    9830400 kB
Cached:          4000000 kB
SwapTotal:       2097152 kB
SwapFree:        2031616 kB
";

    const MEMINFO_OLD: &str = "\
MemTotal:       1000 kB
MemFree:         200 kB
Cached:          300 kB
SwapTotal:         0 kB
SwapFree:          0 kB
";

    fn write_meminfo(contents: &str) -> (tempfile::TempDir, PathBuf) {
        let dir = tempdir().unwrap();
        let path = dir.path().join("meminfo");
        fs::write(&path, contents).unwrap();
        (dir, path)
    }

    #[test]
    fn test_memory_uses_available() {
        let (_dir, path) = write_meminfo(MEMINFO);
        let raw = Memory { path }.fetch_raw().unwrap();

        assert_eq!(
            raw,
            RawValue::Storage {
                total_bytes: 16_384_000 * 1024,
                used_percent: 40,
            }
        );
        assert_eq!(format_storage(&raw).as_deref(), Some("16GB40%"));
    }

    #[test]
    fn test_memory_falls_back_to_free_plus_cached() {
        let (_dir, path) = write_meminfo(MEMINFO_OLD);
        let raw = Memory { path }.fetch_raw().unwrap();

        assert_eq!(
            raw,
            RawValue::Storage {
                total_bytes: 1000 * 1024,
                used_percent: 50,
            }
        );
    }

    #[test]
    fn test_swap() {
        let (_dir, path) = write_meminfo(MEMINFO);
        let source = Swap { path };
        let raw = source.fetch_raw().unwrap();

        assert_eq!(source.format(&raw).as_deref(), Some("2GB4%"));
    }

    #[test]
    fn test_no_swap_is_no_data() {
        let (_dir, path) = write_meminfo(MEMINFO_OLD);
        assert!(matches!(
            Swap { path }.fetch_raw(),
            Err(ProbeError::NoData(_))
        ));
    }

    #[cfg(unix)]
    #[test]
    fn test_disk_reports_current_filesystem() {
        let dir = tempdir().unwrap();
        let raw = Disk {
            path: dir.path().to_path_buf(),
        }
        .fetch_raw()
        .unwrap();

        match raw {
            RawValue::Storage {
                total_bytes,
                used_percent,
            } => {
                assert!(total_bytes > 0);
                assert!(used_percent <= 100);
            }
            other => panic!("unexpected raw value {other:?}"),
        }
    }
}
