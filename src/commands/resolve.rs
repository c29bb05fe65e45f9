//! # Resolve Command Implementation
//!
//! Prints which repository owns each given forest path, the path relative
//! to that repository, and where its master checkout is.

use std::sync::Arc;

use anyhow::Result;
use clap::Args;
use serde::Serialize;

use repo_overlay::config::OverlayConfig;
use repo_overlay::path;
use repo_overlay::registry::Registry;
use repo_overlay::repository::DefaultGitOperations;

use super::ForestArgs;

/// Show the owning repository of forest paths
#[derive(Args, Debug)]
pub struct ResolveArgs {
    #[command(flatten)]
    pub forest: ForestArgs,

    /// Forest-relative paths to resolve
    #[arg(required = true, value_name = "PATH")]
    pub paths: Vec<String>,

    /// Print the result as JSON
    #[arg(long)]
    pub json: bool,
}

#[derive(Debug, Serialize, PartialEq, Eq)]
struct Resolved {
    path: String,
    prefix: String,
    repo_path: String,
    master: Option<String>,
}

fn resolve_all(registry: &Registry, paths: &[String]) -> Result<Vec<Resolved>> {
    paths
        .iter()
        .map(|raw| {
            let normalized = path::normalize(raw)?;
            let resolution = registry.resolve(&normalized);
            Ok(Resolved {
                prefix: resolution.prefix.to_string(),
                repo_path: resolution.repo_path.to_string(),
                master: registry
                    .master(resolution.prefix)
                    .map(|m| m.display().to_string()),
                path: normalized.clone(),
            })
        })
        .collect()
}

/// Execute the resolve command
pub fn execute(args: ResolveArgs) -> Result<()> {
    let forest = args.forest.load()?;
    let mut config = OverlayConfig::new(&forest.root, &forest.root)?;
    if let Some(state_dir) = &forest.state_dir {
        config = config.with_state_dir(state_dir)?;
    }
    let registry = Registry::from_manifest(
        &forest.entries,
        Arc::new(config),
        Arc::new(DefaultGitOperations),
    );

    let resolved = resolve_all(&registry, &args.paths)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&resolved)?);
        return Ok(());
    }
    for r in resolved {
        let prefix = if r.prefix.is_empty() { "<root>" } else { &r.prefix };
        println!(
            "{}\t{}\t{}\t{}",
            r.path,
            prefix,
            r.repo_path,
            r.master.as_deref().unwrap_or("-")
        );
    }
    Ok(())
}
