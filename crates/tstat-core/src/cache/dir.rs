//! Resolution of the shared cache directory.
//!
//! Resolution order:
//! 1. `TSTAT_CACHE_DIR` environment variable (created if missing)
//! 2. An existing `tstat-<uid>-*` directory under the cache root owned by the
//!    current user
//! 3. A freshly created `tstat-<uid>-*` directory under the cache root
//!
//! The cache root is `/dev/shm` when present, otherwise the system temp dir.
//!
//! Two processes resolving for the first time at the same moment can both
//! miss in step 2 and each create a directory. Later scans pick the same one
//! (entries are sorted), so the loser's directory is simply never reused.

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result};

/// Environment override for the cache directory.
pub const CACHE_DIR_ENV: &str = "TSTAT_CACHE_DIR";

const DEFAULT_CACHE_ROOT: &str = "/dev/shm";

/// Resolves the cache directory once for this process.
///
/// # Errors
/// Returns an error if the override or the new directory can't be created,
/// or the cache root can't be listed.
pub fn resolve(cache_root: Option<&Path>) -> Result<PathBuf> {
    if let Some(dir) = std::env::var_os(CACHE_DIR_ENV).filter(|v| !v.is_empty()) {
        let dir = PathBuf::from(dir);
        fs::create_dir_all(&dir)
            .with_context(|| format!("create cache dir {}", dir.display()))?;
        return Ok(dir);
    }

    let root = cache_root.map_or_else(default_cache_root, Path::to_path_buf);
    resolve_in(&root, &user_prefix())
}

/// Finds or creates a directory named `<prefix>*` under `root`.
///
/// # Errors
/// Returns an error if `root` can't be listed or the directory can't be created.
pub fn resolve_in(root: &Path, prefix: &str) -> Result<PathBuf> {
    if let Some(existing) = find_owned(root, prefix)? {
        return Ok(existing);
    }

    let created = tempfile::Builder::new()
        .prefix(prefix)
        .tempdir_in(root)
        .with_context(|| format!("create cache dir under {}", root.display()))?
        .keep();
    tracing::debug!(dir = %created.display(), "created cache dir");
    Ok(created)
}

fn find_owned(root: &Path, prefix: &str) -> Result<Option<PathBuf>> {
    let entries = match fs::read_dir(root) {
        Ok(entries) => entries,
        Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(err) => {
            return Err(err).with_context(|| format!("list cache root {}", root.display()));
        }
    };

    let mut candidates: Vec<PathBuf> = entries
        .filter_map(Result::ok)
        .filter(|entry| entry.file_name().to_string_lossy().starts_with(prefix))
        .map(|entry| entry.path())
        .filter(|path| is_owned_dir(path))
        .collect();
    candidates.sort();
    Ok(candidates.into_iter().next())
}

fn default_cache_root() -> PathBuf {
    let shm = Path::new(DEFAULT_CACHE_ROOT);
    if shm.is_dir() {
        shm.to_path_buf()
    } else {
        std::env::temp_dir()
    }
}

fn user_prefix() -> String {
    format!("tstat-{}-", current_uid())
}

#[cfg(unix)]
fn current_uid() -> u32 {
    // SAFETY: geteuid has no preconditions and cannot fail.
    unsafe { libc::geteuid() }
}

#[cfg(not(unix))]
fn current_uid() -> u32 {
    0
}

#[cfg(unix)]
fn is_owned_dir(path: &Path) -> bool {
    use std::os::unix::fs::MetadataExt;

    // symlink_metadata: a planted symlink to someone else's dir is not ours.
    fs::symlink_metadata(path).is_ok_and(|meta| meta.is_dir() && meta.uid() == current_uid())
}

#[cfg(not(unix))]
fn is_owned_dir(path: &Path) -> bool {
    fs::symlink_metadata(path).is_ok_and(|meta| meta.is_dir())
}

#[cfg(test)]
mod tests {
    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_resolve_in_creates_then_reuses() {
        let root = tempdir().unwrap();

        let first = resolve_in(root.path(), "tstat-test-").unwrap();
        let second = resolve_in(root.path(), "tstat-test-").unwrap();

        assert!(first.is_dir());
        assert_eq!(first, second);
        assert!(
            first
                .file_name()
                .unwrap()
                .to_string_lossy()
                .starts_with("tstat-test-")
        );
    }

    #[test]
    fn test_resolve_in_ignores_plain_files_with_prefix() {
        let root = tempdir().unwrap();
        fs::write(root.path().join("tstat-test-decoy"), "").unwrap();

        let dir = resolve_in(root.path(), "tstat-test-").unwrap();

        assert!(dir.is_dir());
        assert_ne!(dir, root.path().join("tstat-test-decoy"));
    }

    #[test]
    fn test_resolve_in_picks_lowest_sorted_candidate() {
        let root = tempdir().unwrap();
        fs::create_dir(root.path().join("tstat-test-b")).unwrap();
        fs::create_dir(root.path().join("tstat-test-a")).unwrap();

        let dir = resolve_in(root.path(), "tstat-test-").unwrap();

        assert_eq!(dir, root.path().join("tstat-test-a"));
    }
}
