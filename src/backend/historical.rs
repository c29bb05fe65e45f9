//! Git history backend
//!
//! Shows a repository as of one commit. The target commit is resolved once
//! per run and memoized:
//!
//! 1. the newest first-parent commit not after the configured date;
//! 2. otherwise the version recorded by an earlier snapshot;
//! 3. otherwise `HEAD`.
//!
//! An applied commit whose parents include the resolved head replaces the
//! target, keeping the head as baseline.

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, OnceLock, PoisonError};

use log::debug;

use super::{extend_or_fall_back, master_fallback, ChangedPaths, Entries, RepoStatus};
use crate::dirstate::{Dirstate, EntryKind};
use crate::error::{Error, Result};
use crate::filesystem;
use crate::path;
use crate::repository::{Repository, Revision};

const EXECUTABLE_MODE: &str = "100755";

#[derive(Debug)]
pub struct HistoricalGitRepository {
    repo: Repository,
    revision: OnceLock<std::result::Result<Revision, String>>,
    /// Repository-relative paths listed with mode 100755
    executables: Mutex<HashSet<String>>,
}

impl HistoricalGitRepository {
    pub fn new(repo: Repository) -> Self {
        Self {
            repo,
            revision: OnceLock::new(),
            executables: Mutex::new(HashSet::new()),
        }
    }

    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    /// The baseline and target commits, or why they could not be resolved.
    pub fn revision(&self) -> std::result::Result<&Revision, &str> {
        self.revision
            .get_or_init(|| self.resolve_revision())
            .as_ref()
            .map_err(String::as_str)
    }

    fn resolve_revision(&self) -> std::result::Result<Revision, String> {
        let head = self.resolve_head()?;
        let Some(apply) = self.repo.config().apply.as_deref() else {
            return Ok(Revision::at(head));
        };

        let git = self.repo.git();
        let git_dir = &self.repo.git_dir;
        let applied = match git.rev_parse(git_dir, apply) {
            Ok(Some(commit)) => commit,
            Ok(None) => return Ok(Revision::at(head)),
            Err(e) => {
                debug!("{}: cannot resolve apply commit: {}", self.repo.prefix, e);
                return Ok(Revision::at(head));
            }
        };
        match git.parents(git_dir, &applied) {
            Ok(parents) if parents.contains(&head) => {
                debug!("{}: applying {} on top of {}", self.repo.prefix, applied, head);
                Ok(Revision {
                    baseline: head,
                    target: applied,
                })
            }
            Ok(_) => Ok(Revision::at(head)),
            Err(e) => {
                debug!("{}: cannot read parents of {}: {}", self.repo.prefix, applied, e);
                Ok(Revision::at(head))
            }
        }
    }

    fn resolve_head(&self) -> std::result::Result<String, String> {
        let repo = &self.repo;
        let git = repo.git();
        let git_dir = &repo.git_dir;

        if let Some(date) = repo.config().date.as_deref() {
            match git.commit_until(git_dir, date) {
                Ok(Some(commit)) => {
                    if let Ok(Some(verified)) = git.rev_parse(git_dir, &commit) {
                        return Ok(verified);
                    }
                    debug!("{}: commit {} does not verify", repo.prefix, commit);
                }
                Ok(None) => debug!("{}: no commit before {}", repo.prefix, date),
                Err(e) => debug!("{}: {}", repo.prefix, e),
            }
        } else if let Some(version) = repo.recorded_version.as_deref() {
            match git.rev_parse(git_dir, version) {
                Ok(Some(verified)) => return Ok(verified),
                Ok(None) => debug!("{}: recorded version {} not found", repo.prefix, version),
                Err(e) => debug!("{}: {}", repo.prefix, e),
            }
        }

        match git.rev_parse(git_dir, "HEAD") {
            Ok(Some(head)) => Ok(head),
            Ok(None) => Err("HEAD does not resolve to a commit".to_string()),
            Err(e) => Err(e.to_string()),
        }
    }

    fn target(&self) -> Result<&str> {
        self.revision()
            .map(|rev| rev.target.as_str())
            .map_err(|reason| Error::GitCommand {
                command: "rev-parse HEAD".to_string(),
                path: self.repo.git_dir.display().to_string(),
                stderr: reason.to_string(),
            })
    }

    /// Paths changed between the target commit and the master checkout,
    /// plus those changed between baseline and target.
    pub fn find_changed(&self) -> RepoStatus<ChangedPaths> {
        let repo = &self.repo;
        let prefix = repo.prefix.as_str();

        let (mut changed, unresolved) = master_fallback(repo);
        if let Some(reason) = unresolved {
            return RepoStatus::Degraded {
                value: changed,
                reason,
            };
        }

        let revision = match self.revision() {
            Ok(revision) => revision,
            Err(reason) => {
                changed.push(prefix.to_string());
                return RepoStatus::Degraded {
                    value: changed,
                    reason: reason.to_string(),
                };
            }
        };

        let git = repo.git();
        let mut reasons = Vec::new();
        let against_master = git.diff_names(&repo.git_dir, &revision.target, None);
        extend_or_fall_back(prefix, against_master, &mut changed, &mut reasons);
        if revision.spans_commits() {
            let range = git.diff_names(&repo.git_dir, &revision.baseline, Some(&revision.target));
            extend_or_fall_back(prefix, range, &mut changed, &mut reasons);
        }

        changed.sort();
        changed.dedup();
        debug!("{}: {} changed paths", prefix, changed.len());
        RepoStatus::from_parts(changed, reasons)
    }

    /// Walk the target commit's tree, descending only into changed
    /// directories.
    pub fn find_entries(&self, dirstate: &Dirstate) -> RepoStatus<Entries> {
        let repo = &self.repo;
        let prefix = repo.prefix.as_str();
        if !dirstate.is_changed(prefix) {
            return RepoStatus::Ok(Vec::new());
        }

        let target = match self.target() {
            Ok(target) => target,
            Err(e) => return RepoStatus::from_error(e, Vec::new()),
        };

        let registry = dirstate.registry();
        let git = repo.git();
        let mut entries = Vec::new();
        let mut executables = Vec::new();
        let mut reasons = Vec::new();
        let mut pending = vec![String::new()];

        while let Some(dir) = pending.pop() {
            let listed = match git.ls_tree(&repo.git_dir, target, &dir) {
                Ok(listed) => listed,
                Err(e) => {
                    reasons.push(e.to_string());
                    continue;
                }
            };
            for entry in listed {
                let forest_path = path::join(prefix, &entry.path);
                if registry.is_repository_root(&forest_path) {
                    continue;
                }
                let kind = match EntryKind::from_git_mode(&forest_path, &entry.mode) {
                    Ok(kind) => kind,
                    Err(e) => return RepoStatus::Fatal(e),
                };
                if entry.mode == EXECUTABLE_MODE {
                    executables.push(entry.path.clone());
                }
                if kind == EntryKind::Directory && dirstate.is_changed(&forest_path) {
                    pending.push(entry.path);
                }
                entries.push((forest_path, kind));
            }
        }

        self.executables
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .extend(executables);

        RepoStatus::from_parts(entries, reasons)
    }

    /// Write the blob at `repo_path` to `dst`, restoring the executable bit.
    pub fn materialize_file(&self, repo_path: &str, dst: &Path) -> Result<()> {
        let target = self.target()?;
        let content = self.repo.git().read_blob(&self.repo.git_dir, target, repo_path)?;
        let executable = self
            .executables
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .contains(repo_path);
        filesystem::write_file(dst, &content, executable)
    }

    /// Recreate the symlink at `repo_path` from its stored target string.
    pub fn materialize_symlink(&self, repo_path: &str, dst: &Path) -> Result<()> {
        let target = self.target()?;
        let stored = self.repo.git().read_blob(&self.repo.git_dir, target, repo_path)?;
        let link_target = PathBuf::from(String::from_utf8_lossy(&stored).as_ref());
        filesystem::replace_symlink(&link_target, dst)
    }
}
