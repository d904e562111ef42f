//! Core tstat library (cache engine, metrics, rendering, config).

pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod format;
pub mod logging;
pub mod metrics;
pub mod probe;
pub mod refresh;
pub mod render;
