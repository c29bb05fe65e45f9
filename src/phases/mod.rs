//! Implementation of the phases of a snapshot run.
//!
//! ## Overview
//!
//! A snapshot runs in 4 phases:
//! 1. Change scan - ask every repository, in parallel, which paths changed
//! 2. Listing - ask every repository, in parallel, which entries exist below
//!    its changed directories
//! 3. Materialization - plan and apply the output tree, ancestors first
//! 4. Version records - note which commit each repository was shown at
//!
//! Phases 1 and 2 fan out over a bounded worker pool and join before their
//! results are stored in the [`Dirstate`](crate::dirstate::Dirstate) from the
//! calling thread. Phase 2 reads the dirstate populated by phase 1.

use std::fmt;
use std::sync::{Mutex, PoisonError};

use log::warn;
use rayon::prelude::*;
use rayon::ThreadPool;
use serde::Serialize;

use crate::backend::{Backend, RepoStatus};
use crate::error::{Error, Result};
use crate::registry::Registry;

// Phase modules
pub mod changes;
pub mod listing;
pub mod materialize;
pub mod orchestrator;
pub mod record;

// Re-export phase modules by position in the pipeline
pub use changes as phase1;
pub use listing as phase2;
pub use materialize as phase3;
pub use record as phase4;

/// Pipeline phase a warning was raised in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Changes,
    Listing,
    Materialize,
    Record,
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Phase::Changes => "change scan",
            Phase::Listing => "listing",
            Phase::Materialize => "materialization",
            Phase::Record => "version record",
        };
        f.write_str(name)
    }
}

/// A repository whose contribution to the snapshot is best-effort.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct RepoWarning {
    /// Registry prefix of the repository; `""` for the forest root
    pub prefix: String,
    pub phase: Phase,
    pub reason: String,
}

impl RepoWarning {
    pub fn new(prefix: impl Into<String>, phase: Phase, reason: impl Into<String>) -> Self {
        Self {
            prefix: prefix.into(),
            phase,
            reason: reason.into(),
        }
    }

    /// Log this warning and add it to `warnings`.
    pub(crate) fn emit(self, warnings: &mut Vec<RepoWarning>) {
        let shown = if self.prefix.is_empty() {
            "<forest root>"
        } else {
            self.prefix.as_str()
        };
        warn!("{}: {} degraded: {}", shown, self.phase, self.reason);
        warnings.push(self);
    }
}

/// Build the bounded pool repository queries run on.
pub fn worker_pool(jobs: usize) -> Result<ThreadPool> {
    rayon::ThreadPoolBuilder::new()
        .num_threads(jobs)
        .thread_name(|index| format!("repo-overlay-{}", index))
        .build()
        .map_err(|e| Error::WorkerPool {
            message: e.to_string(),
        })
}

/// Run `query` against every backend on `pool` and wait for all of them.
///
/// Outcomes are returned ordered by prefix, the forest root first.
pub(crate) fn fan_out<T, F>(
    pool: &ThreadPool,
    registry: &Registry,
    query: F,
) -> Vec<(String, RepoStatus<T>)>
where
    T: Send,
    F: Fn(&Backend) -> RepoStatus<T> + Sync,
{
    let backends: Vec<&Backend> = registry.backends().collect();
    let results: Mutex<Vec<(String, RepoStatus<T>)>> = Mutex::new(Vec::with_capacity(backends.len()));

    pool.install(|| {
        backends.par_iter().for_each(|backend| {
            let status = query(backend);
            results
                .lock()
                .unwrap_or_else(PoisonError::into_inner)
                .push((backend.prefix().to_string(), status));
        });
    });

    let mut results = results
        .into_inner()
        .unwrap_or_else(PoisonError::into_inner);
    results.sort_by(|a, b| a.0.cmp(&b.0));
    results
}

/// Split joined outcomes into values, turning degraded ones into warnings.
///
/// The first fatal outcome, by prefix order, aborts with its error.
pub(crate) fn settle<T>(
    phase: Phase,
    results: Vec<(String, RepoStatus<T>)>,
    warnings: &mut Vec<RepoWarning>,
) -> Result<Vec<(String, T)>> {
    let mut values = Vec::with_capacity(results.len());
    for (prefix, status) in results {
        let (value, reason) = status.into_parts()?;
        if let Some(reason) = reason {
            RepoWarning::new(prefix.clone(), phase, reason).emit(warnings);
        }
        values.push((prefix, value));
    }
    Ok(values)
}
