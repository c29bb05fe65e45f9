//! # Repository Backends
//!
//! A backend answers the questions a snapshot asks about one repository:
//!
//! - **`find_changed`**: which forest paths differ from the baseline;
//! - **`find_entries`**: which entries exist, and of what kind, below the
//!   repository root, descending only into directories the dirstate already
//!   knows are changed;
//! - **`materialize_file`** / **`materialize_symlink`**: write one changed
//!   entry into the output tree;
//! - **`master`**: where unchanged content is linked to.
//!
//! The set of variants is closed, so [`Backend`] is an enum dispatched by
//! `match`:
//!
//! - [`HistoricalGitRepository`] reads a commit of the repository's history;
//! - [`WorkingTreeRepository`] reads the live checkout;
//! - [`EmptyRepository`] is the synthetic forest root.
//!
//! ## Outcomes
//!
//! Queries return a [`RepoStatus`] instead of a plain `Result`. A repository
//! that cannot be queried properly reports `Degraded` with a conservative
//! fallback value (usually "my whole top-level directory changed"), so one
//! broken repository never aborts the run. Only structural errors are
//! `Fatal`.

mod empty;
mod historical;
mod working_tree;

pub use empty::EmptyRepository;
pub use historical::HistoricalGitRepository;
pub use working_tree::WorkingTreeRepository;

use std::path::{Path, PathBuf};

use crate::dirstate::{Dirstate, EntryKind};
use crate::error::{Error, Result};
use crate::registry::Registry;
use crate::repository::Repository;

/// Changed forest paths reported by one repository.
pub type ChangedPaths = Vec<String>;

/// Forest paths and their kinds listed by one repository.
pub type Entries = Vec<(String, EntryKind)>;

/// Outcome of querying one repository.
#[derive(Debug)]
pub enum RepoStatus<T> {
    Ok(T),
    /// The query fell back to `value` for the given reason
    Degraded { value: T, reason: String },
    /// The run cannot continue
    Fatal(Error),
}

impl<T> RepoStatus<T> {
    /// Combine a value with the reasons collected while computing it.
    pub fn from_parts(value: T, reasons: Vec<String>) -> Self {
        if reasons.is_empty() {
            RepoStatus::Ok(value)
        } else {
            RepoStatus::Degraded {
                value,
                reason: reasons.join("; "),
            }
        }
    }

    /// Turn an error into `Fatal` or into `Degraded` with `fallback`.
    pub fn from_error(error: Error, fallback: T) -> Self {
        if error.is_fatal() {
            RepoStatus::Fatal(error)
        } else {
            RepoStatus::Degraded {
                value: fallback,
                reason: error.to_string(),
            }
        }
    }

    pub fn is_fatal(&self) -> bool {
        matches!(self, RepoStatus::Fatal(_))
    }

    /// Split into the value and an optional degradation reason, or the
    /// fatal error.
    pub fn into_parts(self) -> Result<(T, Option<String>)> {
        match self {
            RepoStatus::Ok(value) => Ok((value, None)),
            RepoStatus::Degraded { value, reason } => Ok((value, Some(reason))),
            RepoStatus::Fatal(error) => Err(error),
        }
    }
}

/// A repository of the forest, by variant.
#[derive(Debug)]
pub enum Backend {
    HistoricalGit(HistoricalGitRepository),
    WorkingTree(WorkingTreeRepository),
    Empty(EmptyRepository),
}

impl Backend {
    /// Registry prefix of this repository; `""` for the synthetic root.
    pub fn prefix(&self) -> &str {
        match self {
            Backend::HistoricalGit(repo) => &repo.repository().prefix,
            Backend::WorkingTree(repo) => &repo.repository().prefix,
            Backend::Empty(_) => "",
        }
    }

    /// Metadata of git-backed repositories.
    pub fn repository(&self) -> Option<&Repository> {
        match self {
            Backend::HistoricalGit(repo) => Some(repo.repository()),
            Backend::WorkingTree(repo) => Some(repo.repository()),
            Backend::Empty(_) => None,
        }
    }

    /// Forest paths that differ from the baseline.
    pub fn find_changed(&self) -> RepoStatus<ChangedPaths> {
        match self {
            Backend::HistoricalGit(repo) => repo.find_changed(),
            Backend::WorkingTree(repo) => repo.find_changed(),
            Backend::Empty(repo) => repo.find_changed(),
        }
    }

    /// Entries below this repository's root, descending only into changed
    /// directories.
    pub fn find_entries(&self, registry: &Registry, dirstate: &Dirstate) -> RepoStatus<Entries> {
        match self {
            Backend::HistoricalGit(repo) => repo.find_entries(dirstate),
            Backend::WorkingTree(repo) => repo.find_entries(registry, dirstate),
            Backend::Empty(repo) => repo.find_entries(registry),
        }
    }

    /// Write the file at `repo_path` to `dst`.
    pub fn materialize_file(&self, repo_path: &str, dst: &Path) -> Result<()> {
        match self {
            Backend::HistoricalGit(repo) => repo.materialize_file(repo_path, dst),
            Backend::WorkingTree(repo) => repo.materialize_file(repo_path, dst),
            Backend::Empty(repo) => repo.materialize_file(repo_path, dst),
        }
    }

    /// Recreate the symlink at `repo_path` as `dst`.
    pub fn materialize_symlink(&self, repo_path: &str, dst: &Path) -> Result<()> {
        match self {
            Backend::HistoricalGit(repo) => repo.materialize_symlink(repo_path, dst),
            Backend::WorkingTree(repo) => repo.materialize_symlink(repo_path, dst),
            Backend::Empty(repo) => repo.materialize_symlink(repo_path, dst),
        }
    }

    /// Checkout unchanged content is linked to, if available.
    pub fn master(&self) -> Option<PathBuf> {
        match self {
            Backend::HistoricalGit(repo) => repo.repository().master().map(Path::to_path_buf),
            Backend::WorkingTree(repo) => repo.repository().master().map(Path::to_path_buf),
            Backend::Empty(repo) => Some(repo.master().to_path_buf()),
        }
    }

    /// Commit the snapshot shows for this repository, once resolved.
    pub fn target_commit(&self) -> Option<String> {
        match self {
            Backend::HistoricalGit(repo) => repo.revision().ok().map(|rev| rev.target.clone()),
            Backend::WorkingTree(repo) => repo.revision().ok().map(|rev| rev.target.clone()),
            Backend::Empty(_) => None,
        }
    }
}

/// Paths every git-backed backend reports regardless of its diff: its own
/// top-level directory when the master checkout is missing or lies outside
/// the forest, so that the repository root is materialized for real.
///
/// Returns the forced paths and, for a missing master, a degradation reason.
fn master_fallback(repo: &Repository) -> (ChangedPaths, Option<String>) {
    match repo.master() {
        None => (
            vec![repo.prefix.clone()],
            Some(format!(
                "master checkout unresolved ({} is not a link)",
                repo.git_dir.display()
            )),
        ),
        Some(master) if !repo.config().is_inside_forest(master) => {
            (vec![repo.prefix.clone()], None)
        }
        Some(_) => (Vec::new(), None),
    }
}

/// Prefix repository-relative paths with the repository's forest prefix.
fn to_forest_paths(prefix: &str, paths: Vec<String>) -> impl Iterator<Item = String> + '_ {
    paths
        .into_iter()
        .map(move |p| crate::path::join(prefix, p.trim_end_matches('/')))
}

/// Add a diff's paths, or on failure fall back to the whole repository.
fn extend_or_fall_back(
    prefix: &str,
    result: Result<Vec<String>>,
    changed: &mut ChangedPaths,
    reasons: &mut Vec<String>,
) {
    match result {
        Ok(paths) => changed.extend(to_forest_paths(prefix, paths)),
        Err(e) => {
            changed.push(prefix.to_string());
            reasons.push(e.to_string());
        }
    }
}
