//! Live checkout backend
//!
//! Shows a repository as it currently is on disk, including uncommitted and
//! untracked changes. The baseline is the recorded version of an earlier
//! snapshot when one is configured, otherwise `HEAD`.

use std::fs;
use std::path::Path;
use std::sync::OnceLock;

use log::debug;
use walkdir::WalkDir;

use super::{extend_or_fall_back, master_fallback, ChangedPaths, Entries, RepoStatus};
use crate::dirstate::{Dirstate, EntryKind};
use crate::error::{Error, Result};
use crate::filesystem;
use crate::path;
use crate::registry::Registry;
use crate::repository::{Repository, Revision};

#[derive(Debug)]
pub struct WorkingTreeRepository {
    repo: Repository,
    revision: OnceLock<std::result::Result<Revision, String>>,
}

impl WorkingTreeRepository {
    pub fn new(repo: Repository) -> Self {
        Self {
            repo,
            revision: OnceLock::new(),
        }
    }

    pub fn repository(&self) -> &Repository {
        &self.repo
    }

    /// Baseline and `HEAD`, or why `HEAD` could not be resolved.
    pub fn revision(&self) -> std::result::Result<&Revision, &str> {
        self.revision
            .get_or_init(|| self.resolve_revision())
            .as_ref()
            .map_err(String::as_str)
    }

    fn resolve_revision(&self) -> std::result::Result<Revision, String> {
        let repo = &self.repo;
        let git = repo.git();
        let head = match git.rev_parse(&repo.git_dir, "HEAD") {
            Ok(Some(head)) => head,
            Ok(None) => return Err("HEAD does not resolve to a commit".to_string()),
            Err(e) => return Err(e.to_string()),
        };

        let baseline = repo
            .recorded_version
            .as_deref()
            .and_then(|version| match git.rev_parse(&repo.git_dir, version) {
                Ok(found) => found,
                Err(e) => {
                    debug!("{}: {}", repo.prefix, e);
                    None
                }
            });

        Ok(match baseline {
            Some(baseline) => Revision {
                baseline,
                target: head,
            },
            None => Revision::at(head),
        })
    }

    /// `git status` paths, plus those committed since the baseline.
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

        let git = repo.git();
        let mut reasons = Vec::new();

        let status = git.status_names(&repo.git_dir);
        extend_or_fall_back(prefix, status, &mut changed, &mut reasons);
        match self.revision() {
            Ok(revision) if revision.spans_commits() => {
                let range =
                    git.diff_names(&repo.git_dir, &revision.baseline, Some(&revision.target));
                extend_or_fall_back(prefix, range, &mut changed, &mut reasons);
            }
            Ok(_) => {}
            Err(reason) => {
                changed.push(prefix.to_string());
                reasons.push(reason.to_string());
            }
        }

        changed.sort();
        changed.dedup();
        debug!("{}: {} changed paths", prefix, changed.len());
        RepoStatus::from_parts(changed, reasons)
    }

    /// Walk the checkout, descending only into changed directories.
    ///
    /// `.git`, the output and state directories, and nested repositories
    /// registered under their own prefix are not listed.
    pub fn find_entries(&self, registry: &Registry, dirstate: &Dirstate) -> RepoStatus<Entries> {
        let repo = &self.repo;
        let prefix = repo.prefix.as_str();
        if !dirstate.is_changed(prefix) {
            return RepoStatus::Ok(Vec::new());
        }

        let config = repo.config();
        let root = repo.forest_dir();
        let mut entries = Vec::new();
        let mut reasons = Vec::new();

        let mut walker = WalkDir::new(&root)
            .min_depth(1)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter();

        while let Some(next) = walker.next() {
            let entry = match next {
                Ok(entry) => entry,
                Err(e) => {
                    reasons.push(e.to_string());
                    continue;
                }
            };
            let file_type = entry.file_type();

            let Some(relative) = entry
                .path()
                .strip_prefix(&root)
                .ok()
                .and_then(Path::to_str)
            else {
                debug!("skipping non UTF-8 path {}", entry.path().display());
                if file_type.is_dir() {
                    walker.skip_current_dir();
                }
                continue;
            };
            let forest_path = path::join(prefix, relative);

            if file_type.is_dir() {
                if entry.file_name() == ".git"
                    || entry.path() == config.output_dir
                    || entry.path() == config.state_dir
                    || registry.is_repository_root(&forest_path)
                {
                    walker.skip_current_dir();
                    continue;
                }
                if !dirstate.is_changed(&forest_path) {
                    walker.skip_current_dir();
                }
                entries.push((forest_path, EntryKind::Directory));
            } else if entry.file_name() == ".git" {
                continue;
            } else if file_type.is_symlink() {
                entries.push((forest_path, EntryKind::Symlink));
            } else if file_type.is_file() {
                entries.push((forest_path, EntryKind::File));
            } else {
                debug!("skipping special file {}", entry.path().display());
            }
        }

        RepoStatus::from_parts(entries, reasons)
    }

    /// Copy or hard-link the checkout file at `repo_path` to `dst`.
    pub fn materialize_file(&self, repo_path: &str, dst: &Path) -> Result<()> {
        let src = self.repo.forest_dir().join(repo_path);
        filesystem::copy_or_hardlink(&src, dst, self.repo.config().link_mode)
    }

    /// Recreate the checkout symlink at `repo_path` with the same target.
    pub fn materialize_symlink(&self, repo_path: &str, dst: &Path) -> Result<()> {
        let src = self.repo.forest_dir().join(repo_path);
        let target = fs::read_link(&src).map_err(|e| Error::Filesystem {
            message: format!("Failed to read link '{}': {}", src.display(), e),
        })?;
        filesystem::replace_symlink(&target, dst)
    }
}
