//! CLI argument parsing and command dispatch

use anyhow::Result;
use clap::{Parser, Subcommand};

use crate::commands;

/// Repo Overlay - Point-in-time overlays of multi-repository forests
#[derive(Parser, Debug)]
#[command(name = "repo-overlay")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Subcommand to execute
    #[command(subcommand)]
    command: Commands,

    /// Colorize output (always, never, auto)
    #[arg(long, global = true, value_name = "WHEN", default_value = "auto")]
    color: String,

    /// Set log level (error, warn, info, debug, trace)
    #[arg(long, global = true, value_name = "LEVEL", default_value = "warn")]
    log_level: String,
}

#[derive(Subcommand, Debug)]
enum Commands {
    /// Build an overlay snapshot of the forest
    Snapshot(commands::snapshot::SnapshotArgs),

    /// Create or check the master links of every manifest project
    Link(commands::link::LinkArgs),

    /// Show which repository owns forest paths
    Resolve(commands::resolve::ResolveArgs),

    /// Generate shell completion scripts
    Completions(commands::completions::CompletionsArgs),
}

impl Cli {
    /// Execute the CLI command
    pub fn execute(self) -> Result<()> {
        // RUST_LOG still wins over --log-level.
        let _ = env_logger::Builder::from_env(
            env_logger::Env::default().default_filter_or(self.log_level.as_str()),
        )
        .format_timestamp(None)
        .try_init();

        match self.command {
            Commands::Snapshot(args) => commands::snapshot::execute(args, &self.color),
            Commands::Link(args) => commands::link::execute(args, &self.color),
            Commands::Resolve(args) => commands::resolve::execute(args),
            Commands::Completions(args) => commands::completions::execute(args),
        }
    }
}
