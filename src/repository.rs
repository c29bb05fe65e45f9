//! # Repository Metadata and Git Access
//!
//! This module defines the [`Repository`] record shared by every git-backed
//! backend, and the [`GitOperations`] trait through which all version-control
//! queries go.
//!
//! ## Design
//!
//! Backends never call `git` directly. They hold an `Arc<dyn GitOperations>`:
//!
//! - **`DefaultGitOperations`** wraps the system `git` binary (see
//!   [`crate::git`]).
//! - Tests substitute an in-memory implementation, so the change scan,
//!   listing and materialization logic can be exercised without creating
//!   real repositories.
//!
//! A `Repository` is built once per run from its manifest entry and is
//! immutable afterwards; derived values such as the master checkout are
//! memoized on first access.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, OnceLock};

use crate::config::OverlayConfig;
use crate::error::Result;
use crate::git::TreeEntry;
use crate::manifest::ManifestEntry;

/// Trait for git operations - allows mocking in tests
pub trait GitOperations: Send + Sync {
    /// Resolve a revision to a commit hash, `None` if it does not exist.
    fn rev_parse(&self, git_dir: &Path, rev: &str) -> Result<Option<String>>;

    /// The newest first-parent commit not after `date`.
    fn commit_until(&self, git_dir: &Path, date: &str) -> Result<Option<String>>;

    /// Parents of `commit`.
    fn parents(&self, git_dir: &Path, commit: &str) -> Result<Vec<String>>;

    /// Repository-relative paths that differ between `from` and `to`, or
    /// between `from` and the working tree when `to` is `None`.
    fn diff_names(&self, git_dir: &Path, from: &str, to: Option<&str>) -> Result<Vec<String>>;

    /// Repository-relative paths with uncommitted or untracked changes.
    fn status_names(&self, git_dir: &Path) -> Result<Vec<String>>;

    /// Immediate entries of directory `dir` in `commit`.
    fn ls_tree(&self, git_dir: &Path, commit: &str, dir: &str) -> Result<Vec<TreeEntry>>;

    /// Blob content (or symlink target) of `path` in `commit`.
    fn read_blob(&self, git_dir: &Path, commit: &str, path: &str) -> Result<Vec<u8>>;

    /// Message of `commit`.
    fn commit_message(&self, git_dir: &Path, commit: &str) -> Result<String>;
}

/// The default implementation of `GitOperations`, which runs the system's
/// `git` command.
#[derive(Debug, Clone, Copy, Default)]
pub struct DefaultGitOperations;

impl GitOperations for DefaultGitOperations {
    fn rev_parse(&self, git_dir: &Path, rev: &str) -> Result<Option<String>> {
        crate::git::rev_parse(git_dir, rev)
    }

    fn commit_until(&self, git_dir: &Path, date: &str) -> Result<Option<String>> {
        crate::git::commit_until(git_dir, date)
    }

    fn parents(&self, git_dir: &Path, commit: &str) -> Result<Vec<String>> {
        crate::git::parents(git_dir, commit)
    }

    fn diff_names(&self, git_dir: &Path, from: &str, to: Option<&str>) -> Result<Vec<String>> {
        crate::git::diff_names(git_dir, from, to)
    }

    fn status_names(&self, git_dir: &Path) -> Result<Vec<String>> {
        crate::git::status_names(git_dir)
    }

    fn ls_tree(&self, git_dir: &Path, commit: &str, dir: &str) -> Result<Vec<TreeEntry>> {
        crate::git::ls_tree(git_dir, commit, dir)
    }

    fn read_blob(&self, git_dir: &Path, commit: &str, path: &str) -> Result<Vec<u8>> {
        crate::git::read_blob(git_dir, commit, path)
    }

    fn commit_message(&self, git_dir: &Path, commit: &str) -> Result<String> {
        crate::git::commit_message(git_dir, commit)
    }
}

/// The commit pair a git-backed repository is compared over.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Revision {
    /// Commit the snapshot is measured against
    pub baseline: String,
    /// Commit the snapshot shows
    pub target: String,
}

impl Revision {
    /// A revision whose baseline and target are the same commit.
    pub fn at(commit: impl Into<String>) -> Self {
        let commit = commit.into();
        Self {
            baseline: commit.clone(),
            target: commit,
        }
    }

    pub fn spans_commits(&self) -> bool {
        self.baseline != self.target
    }
}

/// One tracked repository of the forest.
pub struct Repository {
    /// Forest-relative path prefix, the registry key
    pub prefix: String,
    pub name: String,
    pub url: String,
    /// Checkout location `git` runs in; the master link of the project
    pub git_dir: PathBuf,
    /// Version recorded for this prefix by an earlier snapshot
    pub recorded_version: Option<String>,
    config: Arc<OverlayConfig>,
    git: Arc<dyn GitOperations>,
    master: OnceLock<Option<PathBuf>>,
}

impl fmt::Debug for Repository {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("prefix", &self.prefix)
            .field("name", &self.name)
            .field("git_dir", &self.git_dir)
            .finish_non_exhaustive()
    }
}

impl Repository {
    /// Build a repository from its manifest entry.
    ///
    /// `git` runs in the project's master link, and the baseline version is
    /// looked up in `config.baseline_versions` when configured.
    pub fn from_manifest(
        entry: &ManifestEntry,
        config: Arc<OverlayConfig>,
        git: Arc<dyn GitOperations>,
    ) -> Self {
        let recorded_version = config
            .baseline_versions
            .as_deref()
            .and_then(|dir| crate::versions::read_version(dir, &entry.prefix));

        Self {
            prefix: entry.prefix.clone(),
            name: entry.name.clone(),
            url: entry.url.clone(),
            git_dir: config.master_link(&entry.name),
            recorded_version,
            config,
            git,
            master: OnceLock::new(),
        }
    }

    pub fn config(&self) -> &OverlayConfig {
        &self.config
    }

    pub fn git(&self) -> &dyn GitOperations {
        self.git.as_ref()
    }

    /// The checkout unchanged content is linked to.
    ///
    /// Read from the master link created during link setup. A missing link
    /// means "not available", never an error.
    pub fn master(&self) -> Option<&Path> {
        self.master
            .get_or_init(|| read_master_link(&self.git_dir))
            .as_deref()
    }

    /// Where this repository's files live in the live forest.
    pub fn forest_dir(&self) -> PathBuf {
        self.config.forest_root.join(&self.prefix)
    }
}

fn read_master_link(link: &Path) -> Option<PathBuf> {
    let target = fs::read_link(link).ok()?;
    let resolved = match link.parent() {
        Some(dir) if target.is_relative() => dir.join(target),
        _ => target,
    };
    Some(crate::path::lexical_clean(&resolved))
}
