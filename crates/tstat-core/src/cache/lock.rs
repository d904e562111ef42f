//! Per-metric refresh lock.
//!
//! The lock is a zero-size marker file created with create-if-absent-else-fail
//! semantics. Presence means a refresh is in flight; the holder removes it
//! when done, whether the probe succeeded or not.
//!
//! A holder that is killed before removing its marker leaves the metric
//! locked. By default nothing recovers from that; a positive `max_age` lets
//! the next acquirer remove markers older than that age.
//!
//! Recovery runs under a second exclusive marker, `<lock>.recover`, and only
//! removes the exact marker (same inode and mtime) judged abandoned. A
//! recoverer therefore never deletes a marker created after its age check.
//! `max_age` must exceed the longest refresh: a live holder older than that
//! is indistinguishable from a dead one.

use std::fs::{self, OpenOptions};
use std::io;
use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// Owned refresh lock. Dropping it removes the marker.
#[derive(Debug)]
pub struct RefreshLock {
    path: PathBuf,
    armed: bool,
}

impl RefreshLock {
    /// Attempts to create the marker at `path`.
    ///
    /// Returns `Ok(None)` when another refresh holds it.
    ///
    /// # Errors
    /// Returns an error for I/O failures other than the marker already existing.
    pub fn try_acquire(
        path: &Path,
        max_age: Option<Duration>,
        now: SystemTime,
    ) -> io::Result<Option<Self>> {
        match create_marker(path) {
            Ok(lock) => return Ok(Some(lock)),
            Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {}
            Err(err) => return Err(err),
        }

        let Some(max_age) = max_age else {
            return Ok(None);
        };
        recover_abandoned(path, max_age, now)
    }

    /// Takes ownership of a marker created by another process.
    ///
    /// Used by a detached worker whose spawner acquired the lock on its behalf.
    pub fn adopt(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            armed: true,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Gives up ownership without removing the marker; someone else releases it.
    pub fn hand_off(mut self) -> PathBuf {
        self.armed = false;
        std::mem::take(&mut self.path)
    }

    /// Removes the marker now.
    pub fn release(self) {
        drop(self);
    }

    /// Whether any process currently holds the lock at `path`.
    pub fn is_held(path: &Path) -> bool {
        path.exists()
    }
}

impl Drop for RefreshLock {
    fn drop(&mut self) {
        if !self.armed {
            return;
        }
        if let Err(err) = fs::remove_file(&self.path)
            && err.kind() != io::ErrorKind::NotFound
        {
            tracing::warn!(lock = %self.path.display(), error = %err, "failed to release refresh lock");
        }
    }
}

fn create_marker(path: &Path) -> io::Result<RefreshLock> {
    OpenOptions::new().write(true).create_new(true).open(path)?;
    Ok(RefreshLock {
        path: path.to_path_buf(),
        armed: true,
    })
}

/// Identity of one marker instance. A marker removed and re-created at the
/// same path compares unequal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct MarkerId {
    modified: SystemTime,
    #[cfg(unix)]
    dev: u64,
    #[cfg(unix)]
    ino: u64,
}

fn marker_id(path: &Path) -> io::Result<MarkerId> {
    let meta = fs::metadata(path)?;
    #[cfg(unix)]
    {
        use std::os::unix::fs::MetadataExt;
        Ok(MarkerId {
            modified: meta.modified()?,
            dev: meta.dev(),
            ino: meta.ino(),
        })
    }
    #[cfg(not(unix))]
    {
        Ok(MarkerId {
            modified: meta.modified()?,
        })
    }
}

fn is_expired(modified: SystemTime, max_age: Duration, now: SystemTime) -> bool {
    modified
        .checked_add(max_age)
        .is_some_and(|expiry| now > expiry)
}

fn recovery_guard_path(path: &Path) -> PathBuf {
    let mut guard = path.as_os_str().to_owned();
    guard.push(".recover");
    PathBuf::from(guard)
}

/// Second attempt after finding the marker present.
fn create_or_contended(path: &Path) -> io::Result<Option<RefreshLock>> {
    match create_marker(path) {
        Ok(lock) => Ok(Some(lock)),
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => Ok(None),
        Err(err) => Err(err),
    }
}

fn recover_abandoned(
    path: &Path,
    max_age: Duration,
    now: SystemTime,
) -> io::Result<Option<RefreshLock>> {
    let abandoned = match marker_id(path) {
        Ok(id) => id,
        Err(err) if err.kind() == io::ErrorKind::NotFound => return create_or_contended(path),
        Err(err) => return Err(err),
    };
    if !is_expired(abandoned.modified, max_age, now) {
        return Ok(None);
    }

    let guard_path = recovery_guard_path(path);
    let _guard = match create_marker(&guard_path) {
        Ok(guard) => guard,
        Err(err) if err.kind() == io::ErrorKind::AlreadyExists => {
            clear_abandoned_guard(&guard_path, max_age, now);
            return Ok(None);
        }
        Err(err) => return Err(err),
    };

    // Only guard holders remove markers they did not create, so the marker
    // can't change between this check and the removal below unless its own
    // holder releases it.
    match marker_id(path) {
        Ok(current) if current == abandoned => {}
        Ok(_) => return Ok(None),
        Err(err) if err.kind() == io::ErrorKind::NotFound => return create_or_contended(path),
        Err(err) => return Err(err),
    }

    tracing::warn!(lock = %path.display(), "removing abandoned refresh lock");
    match fs::remove_file(path) {
        Ok(()) => {}
        Err(err) if err.kind() == io::ErrorKind::NotFound => {}
        Err(err) => return Err(err),
    }
    create_or_contended(path)
}

/// Removes a recovery guard left by a process killed mid-recovery. The
/// current attempt still backs off; the next one can recover.
fn clear_abandoned_guard(guard_path: &Path, max_age: Duration, now: SystemTime) {
    let expired = marker_id(guard_path).is_ok_and(|id| is_expired(id.modified, max_age, now));
    if !expired {
        return;
    }
    tracing::warn!(guard = %guard_path.display(), "removing abandoned lock recovery guard");
    if let Err(err) = fs::remove_file(guard_path)
        && err.kind() != io::ErrorKind::NotFound
    {
        tracing::warn!(guard = %guard_path.display(), error = %err, "failed to remove recovery guard");
    }
}

#[cfg(test)]
mod tests {
    use std::fs::File;
    use std::sync::Barrier;
    use std::thread;

    use tempfile::tempdir;

    use super::*;

    #[test]
    fn test_second_acquire_is_contended() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("updates.lock");
        let now = SystemTime::now();

        let first = RefreshLock::try_acquire(&path, None, now).unwrap();
        let second = RefreshLock::try_acquire(&path, None, now).unwrap();

        assert!(first.is_some());
        assert!(second.is_none());
        assert!(RefreshLock::is_held(&path));
    }

    #[test]
    fn test_drop_releases_marker() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("updates.lock");

        let lock = RefreshLock::try_acquire(&path, None, SystemTime::now())
            .unwrap()
            .unwrap();
        lock.release();

        assert!(!path.exists());
        assert!(
            RefreshLock::try_acquire(&path, None, SystemTime::now())
                .unwrap()
                .is_some()
        );
    }

    #[test]
    fn test_hand_off_keeps_marker_until_adopter_drops() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("updates.lock");

        let lock = RefreshLock::try_acquire(&path, None, SystemTime::now())
            .unwrap()
            .unwrap();
        let handed = lock.hand_off();
        assert!(path.exists());

        drop(RefreshLock::adopt(handed));
        assert!(!path.exists());
    }

    #[test]
    fn test_abandoned_lock_kept_without_max_age() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("updates.lock");
        File::create(&path).unwrap();
        let far_future = SystemTime::now() + Duration::from_secs(86_400);

        assert!(
            RefreshLock::try_acquire(&path, None, far_future)
                .unwrap()
                .is_none()
        );
    }

    #[test]
    fn test_abandoned_lock_recovered_after_max_age() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("updates.lock");
        File::create(&path).unwrap();
        let now = SystemTime::now();
        let max_age = Some(Duration::from_secs(600));

        assert!(
            RefreshLock::try_acquire(&path, max_age, now)
                .unwrap()
                .is_none()
        );
        let later = now + Duration::from_secs(601);
        assert!(
            RefreshLock::try_acquire(&path, max_age, later)
                .unwrap()
                .is_some()
        );
    }

    fn abandoned_marker(path: &Path, age: Duration) {
        let marker = File::create(path).unwrap();
        marker.set_modified(SystemTime::now() - age).unwrap();
    }

    #[test]
    fn test_concurrent_recovery_has_single_winner() {
        const THREADS: usize = 16;
        let dir = tempdir().unwrap();
        let path = dir.path().join("updates.lock");
        let max_age = Some(Duration::from_secs(60));

        for _ in 0..1000 {
            abandoned_marker(&path, Duration::from_secs(3600));
            let now = SystemTime::now();
            let barrier = Barrier::new(THREADS);

            let winners: Vec<RefreshLock> = thread::scope(|scope| {
                let handles: Vec<_> = (0..THREADS)
                    .map(|_| {
                        scope.spawn(|| {
                            barrier.wait();
                            RefreshLock::try_acquire(&path, max_age, now).unwrap()
                        })
                    })
                    .collect();
                handles
                    .into_iter()
                    .filter_map(|handle| handle.join().unwrap())
                    .collect()
            });

            assert_eq!(winners.len(), 1, "recovered lock must have one holder");
            assert!(!recovery_guard_path(&path).exists());
            drop(winners);
            assert!(!path.exists());
        }
    }

    #[test]
    fn test_recovery_backs_off_while_guard_present() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("updates.lock");
        let guard = recovery_guard_path(&path);
        abandoned_marker(&path, Duration::from_secs(3600));
        File::create(&guard).unwrap();
        let now = SystemTime::now();
        let max_age = Some(Duration::from_secs(600));

        assert!(
            RefreshLock::try_acquire(&path, max_age, now)
                .unwrap()
                .is_none()
        );
        assert!(path.exists());
        assert!(guard.exists());

        // A guard that outlived max_age belonged to a killed recoverer.
        let later = now + Duration::from_secs(601);
        assert!(
            RefreshLock::try_acquire(&path, max_age, later)
                .unwrap()
                .is_none()
        );
        assert!(!guard.exists());
        assert!(
            RefreshLock::try_acquire(&path, max_age, later)
                .unwrap()
                .is_some()
        );
    }
}
