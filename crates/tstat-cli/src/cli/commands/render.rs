//! Default command: print the status line.

use std::io::{self, Write};

use tstat_core::render::{OutputFormat, Renderer};

use crate::cli::setup::Workspace;

/// Prints one status line. Never fails: problems are logged and the affected
/// segments (or, without a cache directory, the whole line) are left out.
pub fn run(format: Option<OutputFormat>) {
    let line = match Workspace::open_lenient() {
        Ok(ws) => {
            let renderer = Renderer::new(format.unwrap_or(ws.config.format));
            renderer.render(&ws.coordinator(), &ws.metrics)
        }
        Err(err) => {
            let error = format!("{err:#}");
            tracing::error!(%error, "no cache directory, rendering nothing");
            String::new()
        }
    };

    // A closed pipe (status bar went away) is not worth reporting.
    let _ = writeln!(io::stdout().lock(), "{line}");
}
