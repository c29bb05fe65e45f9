//! # Repo Overlay CLI
//!
//! Binary entry point for the `repo-overlay` command-line tool. Parses the
//! arguments with `clap` and dispatches to the command implementations; the
//! snapshot machinery itself lives in the `repo_overlay` library crate.

mod cli;
mod commands;

use anyhow::Result;
use clap::Parser;

fn main() -> Result<()> {
    let cli = cli::Cli::parse();
    cli.execute()
}
