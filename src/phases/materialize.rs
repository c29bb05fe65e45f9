//! Phase 3: Materialization
//!
//! Turns the dirstate into an output tree. [`plan`] walks the items
//! ancestors-first and decides, per item:
//!
//! | kind      | changed | action                                   |
//! |-----------|---------|------------------------------------------|
//! | directory | yes     | create a real directory                  |
//! | directory | no      | link the whole subtree to its master     |
//! | file      | yes     | materialize the file from its repository |
//! | file      | no      | link the file to its master              |
//! | symlink   | any     | recreate the symlink from its repository |
//!
//! Items whose parent directory is unchanged are skipped: the parent is
//! already one link covering them. Items whose kind was never reported
//! (deleted paths) are skipped as well.
//!
//! [`apply`] then performs the actions in order. It is single-threaded
//! because every action relies on its parent having been created.

use std::path::{Path, PathBuf};

use log::{debug, info};
use serde::Serialize;

use super::{Phase, RepoWarning};
use crate::backend::Backend;
use crate::dirstate::{Dirstate, EntryKind, Item};
use crate::error::{Error, Result};
use crate::filesystem;
use crate::path;
use crate::registry::Registry;

/// One step of building the output tree. Paths are forest-relative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum Action {
    CreateDir {
        path: String,
    },
    LinkDir {
        path: String,
        target: PathBuf,
    },
    LinkFile {
        path: String,
        target: PathBuf,
    },
    MaterializeFile {
        path: String,
        owner: String,
        repo_path: String,
    },
    MaterializeSymlink {
        path: String,
        owner: String,
        repo_path: String,
    },
}

impl Action {
    pub fn path(&self) -> &str {
        match self {
            Action::CreateDir { path }
            | Action::LinkDir { path, .. }
            | Action::LinkFile { path, .. }
            | Action::MaterializeFile { path, .. }
            | Action::MaterializeSymlink { path, .. } => path,
        }
    }
}

/// Action counts of a plan or an applied plan.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct MaterializeStats {
    pub directories: usize,
    pub linked_dirs: usize,
    pub linked_files: usize,
    pub files: usize,
    pub symlinks: usize,
    /// Links left alone because the entry already existed
    pub existing: usize,
    /// Entries a repository could not materialize
    pub failed: usize,
}

impl MaterializeStats {
    /// Count what `plan` would do.
    pub fn from_plan(plan: &[Action]) -> Self {
        let mut stats = Self::default();
        for action in plan {
            stats.count(action);
        }
        stats
    }

    fn count(&mut self, action: &Action) {
        match action {
            Action::CreateDir { .. } => self.directories += 1,
            Action::LinkDir { .. } => self.linked_dirs += 1,
            Action::LinkFile { .. } => self.linked_files += 1,
            Action::MaterializeFile { .. } => self.files += 1,
            Action::MaterializeSymlink { .. } => self.symlinks += 1,
        }
    }
}

fn action_for(item: &Item, registry: &Registry) -> Option<Action> {
    let path = item.path.clone();
    let action = match (item.kind?, item.changed) {
        (EntryKind::Directory, true) => Action::CreateDir { path },
        (EntryKind::Directory, false) => Action::LinkDir {
            target: registry.master_target(&item.owner, &item.repo_path, &item.path),
            path,
        },
        (EntryKind::File, true) => Action::MaterializeFile {
            path,
            owner: item.owner.clone(),
            repo_path: item.repo_path.clone(),
        },
        (EntryKind::File, false) => Action::LinkFile {
            target: registry.master_target(&item.owner, &item.repo_path, &item.path),
            path,
        },
        (EntryKind::Symlink, _) => Action::MaterializeSymlink {
            path,
            owner: item.owner.clone(),
            repo_path: item.repo_path.clone(),
        },
    };
    Some(action)
}

/// Decide the action for every item, ancestors before descendants.
pub fn plan(dirstate: &Dirstate) -> Vec<Action> {
    let registry = dirstate.registry();
    let mut actions = Vec::new();

    for item in dirstate.items_by_depth() {
        if item.path.is_empty() || !dirstate.is_changed(path::parent(&item.path)) {
            continue;
        }
        match action_for(item, registry) {
            Some(action) => actions.push(action),
            None => debug!("{}: no entry in the target, skipping", item.path),
        }
    }

    actions
}

fn materialize_with(
    registry: &Registry,
    owner: &str,
    write: impl FnOnce(&Backend) -> Result<()>,
) -> Result<()> {
    let backend = registry.get(owner).ok_or_else(|| Error::Path {
        message: format!("no repository registered at '{}'", owner),
    })?;
    write(backend)
}

/// Perform `plan` below `output_dir`.
///
/// Directory and link failures abort. A file or symlink its repository
/// cannot produce is reported as a warning against that repository.
pub fn apply(
    plan: &[Action],
    registry: &Registry,
    output_dir: &Path,
    warnings: &mut Vec<RepoWarning>,
) -> Result<MaterializeStats> {
    let mut stats = MaterializeStats::default();

    for action in plan {
        let dst = output_dir.join(action.path());
        let outcome = match action {
            Action::CreateDir { .. } => {
                filesystem::create_dir_if_absent(&dst)?;
                Ok(())
            }
            Action::LinkDir { target, .. } | Action::LinkFile { target, .. } => {
                if !filesystem::symlink_relative(target, &dst)? {
                    stats.existing += 1;
                }
                Ok(())
            }
            Action::MaterializeFile {
                owner, repo_path, ..
            } => materialize_with(registry, owner, |backend| {
                backend.materialize_file(repo_path, &dst)
            }),
            Action::MaterializeSymlink {
                owner, repo_path, ..
            } => materialize_with(registry, owner, |backend| {
                backend.materialize_symlink(repo_path, &dst)
            }),
        };

        match outcome {
            Ok(()) => stats.count(action),
            Err(e) if e.is_fatal() => return Err(e),
            Err(e) => {
                let owner = match action {
                    Action::MaterializeFile { owner, .. }
                    | Action::MaterializeSymlink { owner, .. } => owner.as_str(),
                    _ => "",
                };
                stats.failed += 1;
                RepoWarning::new(owner, Phase::Materialize, e.to_string()).emit(warnings);
            }
        }
    }

    info!(
        "materialized {} directories, {} files, {} symlinks; linked {} directories, {} files",
        stats.directories, stats.files, stats.symlinks, stats.linked_dirs, stats.linked_files
    );
    Ok(stats)
}
