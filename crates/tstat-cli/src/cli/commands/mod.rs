//! CLI command handlers.

pub mod cache;
pub mod config;
pub mod refresh;
pub mod render;
