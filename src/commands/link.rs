//! # Link Command Implementation
//!
//! Creates the per-project master links a snapshot reads back:
//! `<state_dir>/repos-by-name/<name>/repo`, pointing at the project's
//! checkout in the forest.

use anyhow::Result;
use clap::Args;

use repo_overlay::config::OverlayConfig;
use repo_overlay::output::{Marker, OutputConfig};
use repo_overlay::registry;

use super::ForestArgs;

/// Set up the master links of every manifest project
#[derive(Args, Debug)]
pub struct LinkArgs {
    #[command(flatten)]
    pub forest: ForestArgs,

    /// Only report links that are missing or stale
    #[arg(long)]
    pub check: bool,
}

/// Execute the link command
pub fn execute(args: LinkArgs, color_flag: &str) -> Result<()> {
    let out = OutputConfig::from_env_and_flag(color_flag);
    let forest = args.forest.load()?;

    // The output directory is irrelevant for link setup.
    let mut config = OverlayConfig::new(&forest.root, &forest.root)?;
    if let Some(state_dir) = &forest.state_dir {
        config = config.with_state_dir(state_dir)?;
    }

    if args.check {
        let stale: Vec<_> = forest
            .entries
            .iter()
            .filter(|entry| !registry::master_link_is_current(entry, &config))
            .collect();
        for entry in &stale {
            println!(
                "{} {} ({})",
                out.marker(Marker::Warn),
                entry.prefix,
                config.master_link(&entry.name).display()
            );
        }
        if !stale.is_empty() {
            anyhow::bail!("{} master links are missing or stale", stale.len());
        }
        println!(
            "{} All {} master links are current",
            out.marker(Marker::Ok),
            forest.entries.len()
        );
        return Ok(());
    }

    let written = registry::setup_master_links(&forest.entries, &config)?;
    println!(
        "{} {} master links written to {}",
        out.marker(Marker::Link),
        written,
        config.state_dir.join("repos-by-name").display()
    );
    Ok(())
}
