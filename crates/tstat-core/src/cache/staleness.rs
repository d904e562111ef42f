//! Staleness policy: TTL expiry plus optional dependency invalidation.

use std::path::{Path, PathBuf};
use std::time::{Duration, SystemTime};

/// Why an entry is or isn't usable.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Staleness {
    Fresh,
    Missing,
    Expired,
    /// A dependency was modified after the entry was written.
    Invalidated(PathBuf),
}

impl Staleness {
    pub fn is_stale(&self) -> bool {
        !matches!(self, Staleness::Fresh)
    }

    pub fn label(&self) -> &'static str {
        match self {
            Staleness::Fresh => "fresh",
            Staleness::Missing => "missing",
            Staleness::Expired => "expired",
            Staleness::Invalidated(_) => "invalidated",
        }
    }
}

/// TTL and dependency set for one metric.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StalenessPolicy {
    pub ttl: Duration,
    pub dependencies: Vec<PathBuf>,
}

impl StalenessPolicy {
    pub fn new(ttl: Duration, dependencies: Vec<PathBuf>) -> Self {
        Self { ttl, dependencies }
    }

    /// Classifies an entry written at `written_at` (`None` for a miss).
    ///
    /// An entry is expired once `now` is strictly past `written_at + ttl`.
    /// Dependencies that don't exist never invalidate.
    pub fn check(&self, written_at: Option<SystemTime>, now: SystemTime) -> Staleness {
        let Some(written_at) = written_at else {
            return Staleness::Missing;
        };

        let expired = written_at
            .checked_add(self.ttl)
            .is_some_and(|expiry| now > expiry);
        if expired {
            return Staleness::Expired;
        }

        self.dependencies
            .iter()
            .find(|dep| modified_after(dep, written_at))
            .map_or(Staleness::Fresh, |dep| Staleness::Invalidated(dep.clone()))
    }

    pub fn is_stale(&self, written_at: Option<SystemTime>, now: SystemTime) -> bool {
        self.check(written_at, now).is_stale()
    }
}

fn modified_after(path: &Path, written_at: SystemTime) -> bool {
    std::fs::metadata(path)
        .and_then(|m| m.modified())
        .is_ok_and(|modified| modified > written_at)
}
