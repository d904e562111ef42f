//! Error types shared by probes and the cache store.

use thiserror::Error;

/// Why a probe could not produce a raw value.
///
/// The engine treats every variant the same way: the metric has no data for
/// this invocation and its segment is omitted.
#[derive(Error, Debug)]
pub enum ProbeError {
    #[error("no data: {0}")]
    NoData(String),
    #[error("i/o error: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed reading: {0}")]
    Parse(String),
    #[error("command failed: {0}")]
    Command(String),
}

impl ProbeError {
    pub fn no_data(msg: impl Into<String>) -> Self {
        ProbeError::NoData(msg.into())
    }

    pub fn parse(msg: impl Into<String>) -> Self {
        ProbeError::Parse(msg.into())
    }
}

#[derive(Error, Debug)]
pub enum CacheError {
    #[error("invalid metric name {0:?}: use letters, digits, '-' or '_'")]
    InvalidName(String),
    #[error("cache i/o error on {path}: {source}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to serialize cache value: {0}")]
    Serialize(#[from] serde_json::Error),
}

impl CacheError {
    pub(crate) fn io(path: impl Into<std::path::PathBuf>, source: std::io::Error) -> Self {
        CacheError::Io {
            path: path.into(),
            source,
        }
    }
}
