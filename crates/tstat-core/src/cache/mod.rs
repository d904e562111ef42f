//! Persistent per-metric value cache.
//!
//! One file per metric lives in a shared, per-user directory:
//!
//! - `<name>.cache`: serialized value; its mtime is the entry timestamp
//! - `<name>.<random>.new`: temp file, renamed over `<name>.cache` when complete
//! - `<name>.lock`: refresh lock marker (see [`lock`])
//!
//! Readers never see a half-written entry because the canonical file is only
//! ever replaced by a rename.

pub mod dir;
pub mod lock;
pub mod staleness;

use std::fs::File;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

use serde::Serialize;
use serde::de::DeserializeOwned;

use crate::error::CacheError;

const ENTRY_EXT: &str = "cache";
const LOCK_EXT: &str = "lock";
const TEMP_SUFFIX: &str = ".new";

/// A cached value and the time it was written.
#[derive(Debug, Clone, PartialEq)]
pub struct CacheEntry<T> {
    pub value: T,
    pub written_at: SystemTime,
}

/// Handle on the shared cache directory.
#[derive(Debug, Clone)]
pub struct CacheStore {
    dir: PathBuf,
}

impl CacheStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Canonical cache file for a metric.
    ///
    /// # Errors
    /// Returns an error if `name` is not usable as a file stem.
    pub fn entry_path(&self, name: &str) -> Result<PathBuf, CacheError> {
        validate_name(name)?;
        Ok(self.dir.join(format!("{name}.{ENTRY_EXT}")))
    }

    /// Refresh lock marker for a metric.
    ///
    /// # Errors
    /// Returns an error if `name` is not usable as a file stem.
    pub fn lock_path(&self, name: &str) -> Result<PathBuf, CacheError> {
        validate_name(name)?;
        Ok(self.dir.join(format!("{name}.{LOCK_EXT}")))
    }

    /// Reads a metric's entry.
    ///
    /// Missing, unreadable and corrupt files are all reported as a miss.
    pub fn get<T: DeserializeOwned>(&self, name: &str) -> Option<CacheEntry<T>> {
        let path = self.entry_path(name).ok()?;
        match read_entry(&path) {
            Ok(entry) => Some(entry),
            Err(ReadError::Missing) => None,
            Err(ReadError::Io(err)) => {
                tracing::debug!(metric = name, error = %err, "cache entry unreadable");
                None
            }
            Err(ReadError::Corrupt(err)) => {
                tracing::debug!(metric = name, error = %err, "cache entry corrupt, treating as miss");
                None
            }
        }
    }

    /// Writes a metric's entry stamped with `written_at`.
    ///
    /// The value is written to a temp file in the cache directory which is then
    /// renamed over the canonical path, so concurrent readers observe either
    /// the old entry or the new one.
    ///
    /// # Errors
    /// Returns an error if the name is invalid or the write/rename fails. The
    /// previous entry is left untouched in that case.
    pub fn put<T: Serialize>(
        &self,
        name: &str,
        value: &T,
        written_at: SystemTime,
    ) -> Result<(), CacheError> {
        let path = self.entry_path(name)?;
        let body = serde_json::to_vec(value)?;

        let mut tmp = tempfile::Builder::new()
            .prefix(&format!("{name}."))
            .suffix(TEMP_SUFFIX)
            .tempfile_in(&self.dir)
            .map_err(|e| CacheError::io(&self.dir, e))?;
        tmp.write_all(&body)
            .map_err(|e| CacheError::io(tmp.path(), e))?;
        tmp.as_file()
            .set_modified(written_at)
            .map_err(|e| CacheError::io(tmp.path(), e))?;
        tmp.persist(&path).map_err(|e| CacheError::io(&path, e.error))?;

        Ok(())
    }
}

enum ReadError {
    Missing,
    Io(io::Error),
    Corrupt(serde_json::Error),
}

fn read_entry<T: DeserializeOwned>(path: &Path) -> Result<CacheEntry<T>, ReadError> {
    let mut file = File::open(path).map_err(|e| match e.kind() {
        io::ErrorKind::NotFound => ReadError::Missing,
        _ => ReadError::Io(e),
    })?;
    // Timestamp and content come from the same open handle, so a concurrent
    // rename can't pair one entry's time with another entry's value.
    let written_at = file
        .metadata()
        .and_then(|m| m.modified())
        .map_err(ReadError::Io)?;
    let mut body = Vec::new();
    file.read_to_end(&mut body).map_err(ReadError::Io)?;
    let value = serde_json::from_slice(&body).map_err(ReadError::Corrupt)?;
    Ok(CacheEntry { value, written_at })
}

/// Checks that `name` is usable as a cache file stem.
///
/// # Errors
/// Returns [`CacheError::InvalidName`] for empty names or names with
/// characters other than ASCII letters, digits, `-` and `_`.
pub fn validate_name(name: &str) -> Result<(), CacheError> {
    let valid = !name.is_empty()
        && name
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_');
    if valid {
        Ok(())
    } else {
        Err(CacheError::InvalidName(name.to_string()))
    }
}
