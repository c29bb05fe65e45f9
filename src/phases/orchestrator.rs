//! Orchestrator for a complete snapshot run
//!
//! This module coordinates all phases to provide a clean API for building
//! one overlay from a registry.

use log::info;
use serde::Serialize;

use super::materialize::{Action, MaterializeStats};
use super::{phase1, phase2, phase3, phase4, worker_pool, RepoWarning};
use crate::dirstate::Dirstate;
use crate::error::Result;
use crate::filesystem;
use crate::registry::Registry;

/// Summary of a snapshot run.
#[derive(Debug, Clone, Serialize)]
pub struct SnapshotReport {
    pub dry_run: bool,
    pub repositories: usize,
    pub changed_paths: usize,
    pub listed_entries: usize,
    /// Paths known to the dirstate at the end of the run
    pub items: usize,
    pub stats: MaterializeStats,
    pub records: usize,
    pub warnings: Vec<RepoWarning>,
    /// The actions a dry run would have performed
    #[serde(skip_serializing_if = "Option::is_none")]
    pub plan: Option<Vec<Action>>,
}

/// Execute a complete snapshot run (Phases 1-4)
///
/// This orchestrates the pipeline:
/// 1. Scan every repository for changed paths
/// 2. List entries below changed directories
/// 3. Plan and, unless `dry_run`, apply the output tree
/// 4. Write version records (if enabled in the configuration)
///
/// With `dry_run` the output directory is never touched and the report
/// carries the plan instead. An output directory overlapping the forest's
/// checkouts or the state directory is rejected before anything is read.
pub fn execute_snapshot(registry: &Registry, dry_run: bool) -> Result<SnapshotReport> {
    let config = registry.config();
    config.check_output_dir(registry.prefixes())?;
    if !dry_run {
        filesystem::prepare_output(&config.output_dir, config.force)?;
    }

    let pool = worker_pool(config.jobs)?;
    let mut dirstate = Dirstate::new(registry);
    let mut warnings = Vec::new();

    // Phase 1: Change scan
    let changed_paths = phase1::execute(&pool, registry, &mut dirstate, &mut warnings)?;

    // Phase 2: Listing
    let listed_entries = phase2::execute(&pool, registry, &mut dirstate, &mut warnings)?;

    // Phase 3: Materialization
    let plan = phase3::plan(&dirstate);
    let mut report = SnapshotReport {
        dry_run,
        repositories: registry.len(),
        changed_paths,
        listed_entries,
        items: dirstate.len(),
        stats: MaterializeStats::from_plan(&plan),
        records: 0,
        warnings: Vec::new(),
        plan: None,
    };

    if dry_run {
        report.plan = Some(plan);
        report.warnings = warnings;
        return Ok(report);
    }

    report.stats = phase3::apply(&plan, registry, &config.output_dir, &mut warnings)?;

    // Phase 4: Version records
    if config.record_versions {
        report.records = phase4::execute(registry, &config.output_dir, &mut warnings)?;
    }

    info!(
        "snapshot of {} repositories written to {} ({} warnings)",
        report.repositories,
        config.output_dir.display(),
        warnings.len()
    );
    report.warnings = warnings;
    Ok(report)
}
