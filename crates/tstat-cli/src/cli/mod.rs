//! CLI entry and dispatch.

use anyhow::Result;
use clap::Parser;
use tstat_core::render::OutputFormat;

mod commands;
mod setup;

#[derive(Parser)]
#[command(name = "tstat")]
#[command(version)]
#[command(about = "Cached, non-blocking system status line for tmux")]
struct Cli {
    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(clap::Subcommand)]
enum Commands {
    /// Print the status line (default when no command is given)
    Render {
        /// Override the output markup from config
        #[arg(long, value_enum)]
        format: Option<FormatArg>,
    },

    /// Recompute one metric now and update its cache entry
    Refresh {
        /// Metric name as configured
        #[arg(value_name = "NAME")]
        name: String,

        /// Run as a detached worker that owns an already-taken refresh lock
        #[arg(long, hide = true)]
        worker: bool,
    },

    /// Inspect the value cache
    Cache {
        #[command(subcommand)]
        command: CacheCommands,
    },

    /// Manage configuration
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(clap::Subcommand)]
enum CacheCommands {
    /// Prints the cache directory
    Dir,
    /// Shows each configured metric's cache state
    List,
}

#[derive(clap::Subcommand)]
enum ConfigCommands {
    /// Prints the config file path
    Path,
    /// Creates a default config file
    Init,
    /// Prints a config generated from built-in defaults
    Generate,
}

#[derive(Clone, Copy, clap::ValueEnum)]
enum FormatArg {
    Tmux,
    Ansi,
}

impl From<FormatArg> for OutputFormat {
    fn from(arg: FormatArg) -> Self {
        match arg {
            FormatArg::Tmux => OutputFormat::Tmux,
            FormatArg::Ansi => OutputFormat::Ansi,
        }
    }
}

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        None => {
            commands::render::run(None);
            Ok(())
        }
        Some(Commands::Render { format }) => {
            commands::render::run(format.map(OutputFormat::from));
            Ok(())
        }
        Some(Commands::Refresh { name, worker }) => {
            if worker {
                commands::refresh::run_worker(&name);
                Ok(())
            } else {
                commands::refresh::run(&name)
            }
        }
        Some(Commands::Cache { command }) => match command {
            CacheCommands::Dir => commands::cache::dir(),
            CacheCommands::List => commands::cache::list(),
        },
        Some(Commands::Config { command }) => match command {
            ConfigCommands::Path => commands::config::path(),
            ConfigCommands::Init => commands::config::init(),
            ConfigCommands::Generate => commands::config::generate(),
        },
    }
}
