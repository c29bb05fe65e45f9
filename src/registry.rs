//! # Repository Registry
//!
//! The registry maps forest path prefixes to repository backends and answers
//! two questions for the rest of the pipeline:
//!
//! - **`resolve`**: which repository owns an arbitrary forest path. The path
//!   is shortened one trailing component at a time until a registered prefix
//!   matches. The synthetic root repository at prefix `""` always matches
//!   last, so resolution never fails.
//! - **`master`**: where a repository's unchanged content should be linked
//!   to. This is read from the per-project master link written by
//!   [`setup_master_links`].

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use log::debug;

use crate::backend::{Backend, EmptyRepository, HistoricalGitRepository, WorkingTreeRepository};
use crate::config::{OverlayConfig, SnapshotMode};
use crate::error::Result;
use crate::filesystem;
use crate::manifest::ManifestEntry;
use crate::path;
use crate::repository::{GitOperations, Repository};

/// Result of resolving a forest path to its owning repository.
#[derive(Debug, Clone, Copy)]
pub struct Resolution<'a> {
    pub backend: &'a Backend,
    /// Registered prefix of the owning repository
    pub prefix: &'a str,
    /// The resolved path relative to that prefix
    pub repo_path: &'a str,
}

/// Mapping from path prefix to repository backend.
#[derive(Debug)]
pub struct Registry {
    config: Arc<OverlayConfig>,
    root: Backend,
    repos: BTreeMap<String, Backend>,
}

impl Registry {
    /// Create a registry holding only the synthetic root repository.
    pub fn new(config: Arc<OverlayConfig>) -> Self {
        Self {
            root: Backend::Empty(EmptyRepository::new(config.clone())),
            config,
            repos: BTreeMap::new(),
        }
    }

    /// Build one backend per manifest entry, choosing the variant from the
    /// configured snapshot mode.
    pub fn from_manifest(
        entries: &[ManifestEntry],
        config: Arc<OverlayConfig>,
        git: Arc<dyn GitOperations>,
    ) -> Self {
        let mut registry = Self::new(config.clone());
        for entry in entries {
            let repo = Repository::from_manifest(entry, config.clone(), git.clone());
            let backend = match config.mode {
                SnapshotMode::Historical => {
                    Backend::HistoricalGit(HistoricalGitRepository::new(repo))
                }
                SnapshotMode::WorkingTree => Backend::WorkingTree(WorkingTreeRepository::new(repo)),
            };
            registry.insert(backend);
        }
        registry
    }

    /// Register a backend under its own prefix, replacing any previous one.
    ///
    /// Backends with the root prefix replace the synthetic root.
    pub fn insert(&mut self, backend: Backend) {
        let prefix = backend.prefix().to_string();
        if prefix.is_empty() {
            self.root = backend;
        } else {
            debug!("registering repository '{}'", prefix);
            self.repos.insert(prefix, backend);
        }
    }

    pub fn config(&self) -> &OverlayConfig {
        &self.config
    }

    /// Find the repository owning `path` by longest-prefix match.
    pub fn resolve<'a>(&'a self, path: &'a str) -> Resolution<'a> {
        let mut candidate = path;
        loop {
            if let Some((prefix, backend)) = self.repos.get_key_value(candidate) {
                return Resolution {
                    backend,
                    prefix,
                    repo_path: path::strip_prefix(path, prefix).unwrap_or(path),
                };
            }
            if candidate.is_empty() {
                return Resolution {
                    backend: &self.root,
                    prefix: "",
                    repo_path: path,
                };
            }
            candidate = path::parent(candidate);
        }
    }

    /// The backend registered at exactly `prefix`.
    pub fn get(&self, prefix: &str) -> Option<&Backend> {
        if prefix.is_empty() {
            Some(&self.root)
        } else {
            self.repos.get(prefix)
        }
    }

    /// Whether `path` is the root of a registered (non-root) repository.
    pub fn is_repository_root(&self, path: &str) -> bool {
        !path.is_empty() && self.repos.contains_key(path)
    }

    /// The master checkout of the repository at `prefix`, if available.
    pub fn master(&self, prefix: &str) -> Option<PathBuf> {
        self.get(prefix)?.master()
    }

    /// Where a link for an unchanged item should point: the item's path
    /// under its repository's master checkout, or under the forest root when
    /// no master is available.
    pub fn master_target(&self, owner: &str, repo_path: &str, forest_path: &str) -> PathBuf {
        match self.master(owner) {
            Some(master) if repo_path.is_empty() => master,
            Some(master) => master.join(repo_path),
            None => self.config.forest_root.join(forest_path),
        }
    }

    /// Registered prefixes, excluding the synthetic root.
    pub fn prefixes(&self) -> impl Iterator<Item = &str> {
        self.repos.keys().map(String::as_str)
    }

    /// Every backend, the synthetic root first.
    pub fn backends(&self) -> impl Iterator<Item = &Backend> {
        std::iter::once(&self.root).chain(self.repos.values())
    }

    /// Number of registered repositories, excluding the synthetic root.
    pub fn len(&self) -> usize {
        self.repos.len()
    }

    pub fn is_empty(&self) -> bool {
        self.repos.is_empty()
    }
}

/// Create the master link of every manifest entry.
///
/// Each project gets `<state_dir>/repos-by-name/<name>/repo`, an absolute
/// symlink to its checkout in the forest. Existing links are replaced.
/// Returns the number of links written.
pub fn setup_master_links(entries: &[ManifestEntry], config: &OverlayConfig) -> Result<usize> {
    let mut written = 0;
    for entry in entries {
        let link = config.master_link(&entry.name);
        let target = config.forest_root.join(&entry.prefix);
        filesystem::replace_symlink(&target, &link)?;
        debug!("master link {} -> {}", link.display(), target.display());
        written += 1;
    }
    Ok(written)
}

/// Whether the master link of `entry` points into the forest.
pub fn master_link_is_current(entry: &ManifestEntry, config: &OverlayConfig) -> bool {
    let link = config.master_link(&entry.name);
    std::fs::read_link(&link)
        .map(|target| Path::new(&target) == config.forest_root.join(&entry.prefix))
        .unwrap_or(false)
}
