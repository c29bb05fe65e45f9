//! # Snapshot Command Implementation
//!
//! Builds an overlay of the forest in the output directory:
//! 1. Scan every repository for changed paths
//! 2. List entries below changed directories
//! 3. Materialize changed entries and link everything else to the master
//!    checkouts
//! 4. Record the commit each repository was shown at

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use anyhow::{Context, Result};
use clap::Args;

use repo_overlay::config::{LinkMode, OverlayConfig, SnapshotMode};
use repo_overlay::defaults;
use repo_overlay::output::{Marker, OutputConfig};
use repo_overlay::phases::materialize::Action;
use repo_overlay::phases::orchestrator::{self, SnapshotReport};
use repo_overlay::registry::{self, Registry};
use repo_overlay::repository::DefaultGitOperations;

use super::{Forest, ForestArgs};

/// Arguments for the snapshot command
#[derive(Args, Debug)]
pub struct SnapshotArgs {
    #[command(flatten)]
    pub forest: ForestArgs,

    /// Output directory; must be empty unless --force is given
    #[arg(short, long, value_name = "DIR", env = "REPO_OVERLAY_OUTPUT")]
    pub output: Option<PathBuf>,

    /// Show the live checkouts, including uncommitted changes
    #[arg(long)]
    pub working_tree: bool,

    /// Hard-link changed working-tree files instead of copying them
    #[arg(long)]
    pub hardlink: bool,

    /// Number of repositories queried in parallel
    #[arg(short, long, value_name = "N", env = "REPO_OVERLAY_JOBS")]
    pub jobs: Option<usize>,

    /// Show each repository as of this date (any format `git log --until` accepts)
    #[arg(long, value_name = "DATE", conflicts_with = "working_tree")]
    pub date: Option<String>,

    /// Apply this commit on top of the repository it extends
    #[arg(long, value_name = "COMMIT", conflicts_with = "working_tree")]
    pub apply: Option<String>,

    /// Version records of an earlier snapshot to use as baseline
    #[arg(long, value_name = "DIR")]
    pub baseline_versions: Option<PathBuf>,

    /// Do not write version records into the output
    #[arg(long)]
    pub no_record: bool,

    /// Create the master links before the snapshot
    #[arg(long)]
    pub setup_links: bool,

    /// Clear a non-empty output directory
    #[arg(short, long)]
    pub force: bool,

    /// Show what would be done without touching the output directory
    #[arg(short = 'n', long)]
    pub dry_run: bool,

    /// Print the run report as JSON
    #[arg(long)]
    pub json: bool,

    /// Suppress all output except errors
    #[arg(short, long)]
    pub quiet: bool,
}

/// Build the run configuration: flags, then `.repo-overlay.yaml`, then
/// defaults.
fn build_config(args: &SnapshotArgs, forest: &Forest) -> Result<OverlayConfig> {
    let output = args
        .output
        .clone()
        .or_else(|| forest.file.output.clone())
        .context("No output directory given (use --output or `output:` in .repo-overlay.yaml)")?;

    let mut config = OverlayConfig::new(&forest.root, output)?
        .with_mode(if args.working_tree {
            SnapshotMode::WorkingTree
        } else {
            SnapshotMode::Historical
        })
        .with_link_mode(if args.hardlink || forest.file.hardlink {
            LinkMode::Hardlink
        } else {
            LinkMode::Copy
        })
        .with_jobs(
            args.jobs
                .or(forest.file.jobs)
                .unwrap_or_else(defaults::default_jobs),
        )?
        .with_date(args.date.clone())
        .with_apply(args.apply.clone())
        .with_baseline_versions(args.baseline_versions.clone())?
        .with_record_versions(!args.no_record)
        .with_force(args.force);
    if let Some(state_dir) = &forest.state_dir {
        config = config.with_state_dir(state_dir)?;
    }
    Ok(config)
}

/// Execute the snapshot command
pub fn execute(args: SnapshotArgs, color_flag: &str) -> Result<()> {
    let out = OutputConfig::from_env_and_flag(color_flag);
    let start_time = Instant::now();
    let talk = !args.quiet && !args.json;

    let forest = args.forest.load()?;
    let config = build_config(&args, &forest)?;
    config.check_output_dir(forest.entries.iter().map(|e| e.prefix.as_str()))?;

    if talk {
        println!(
            "{} Snapshot of {} repositories in {}",
            out.marker(Marker::Scan),
            forest.entries.len(),
            config.forest_root.display()
        );
        if args.dry_run {
            println!(
                "{} DRY RUN MODE - No changes will be made",
                out.marker(Marker::Plan)
            );
        }
    }

    if args.setup_links && !args.dry_run {
        let written = registry::setup_master_links(&forest.entries, &config)?;
        if talk {
            println!("{} {} master links written", out.marker(Marker::Link), written);
        }
    }

    let registry = Registry::from_manifest(
        &forest.entries,
        Arc::new(config),
        Arc::new(DefaultGitOperations),
    );
    let report = orchestrator::execute_snapshot(&registry, args.dry_run)?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&report)?);
    } else if talk {
        print_report(&out, &report, registry.config());
        println!(
            "{} Done in {:.2}s",
            out.marker(Marker::Ok),
            start_time.elapsed().as_secs_f64()
        );
    }
    Ok(())
}

fn print_report(out: &OutputConfig, report: &SnapshotReport, config: &OverlayConfig) {
    if let Some(plan) = &report.plan {
        for action in plan {
            println!("   {}", out.dim(&describe(action)));
        }
    }

    let stats = &report.stats;
    println!(
        "   {} changed paths, {} listed entries",
        report.changed_paths, report.listed_entries
    );
    println!(
        "   {} directories and {} files materialized, {} symlinks recreated",
        stats.directories, stats.files, stats.symlinks
    );
    println!(
        "   {} directories and {} files linked to master checkouts",
        stats.linked_dirs, stats.linked_files
    );
    if !report.dry_run {
        println!("   Output written to: {}", config.output_dir.display());
    }

    for warning in &report.warnings {
        let prefix = if warning.prefix.is_empty() {
            "<forest root>"
        } else {
            warning.prefix.as_str()
        };
        println!(
            "{} {}",
            out.marker(Marker::Warn),
            out.warning(&format!("{} ({}): {}", prefix, warning.phase, warning.reason))
        );
    }
}

fn describe(action: &Action) -> String {
    match action {
        Action::CreateDir { path } => format!("mkdir    {}", path),
        Action::LinkDir { path, target } | Action::LinkFile { path, target } => {
            format!("link     {} -> {}", path, target.display())
        }
        Action::MaterializeFile { path, .. } => format!("write    {}", path),
        Action::MaterializeSymlink { path, .. } => format!("symlink  {}", path),
    }
}
