//! Shared fixtures for unit tests

use std::collections::{BTreeMap, BTreeSet, HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use tempfile::TempDir;

use crate::config::OverlayConfig;
use crate::error::{Error, Result};
use crate::git::TreeEntry;
use crate::manifest::ManifestEntry;
use crate::registry::Registry;
use crate::repository::GitOperations;

/// In-memory git: commits are plain strings, trees are flat path maps.
#[derive(Debug, Default)]
pub(crate) struct MockGit {
    heads: HashMap<PathBuf, String>,
    known: HashSet<String>,
    dates: HashMap<(PathBuf, String), String>,
    parents: HashMap<String, Vec<String>>,
    files: BTreeMap<(String, String), (String, Vec<u8>)>,
    worktree_diffs: HashMap<(PathBuf, String), Vec<String>>,
    range_diffs: HashMap<(String, String), Vec<String>>,
    statuses: HashMap<PathBuf, Vec<String>>,
    messages: HashMap<String, String>,
    failing: HashSet<PathBuf>,
    pub calls: Mutex<Vec<String>>,
}

fn strings(paths: &[&str]) -> Vec<String> {
    paths.iter().map(|p| p.to_string()).collect()
}

impl MockGit {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_head(mut self, git_dir: impl AsRef<Path>, commit: &str) -> Self {
        self.heads
            .insert(git_dir.as_ref().to_path_buf(), commit.to_string());
        self.known.insert(commit.to_string());
        self
    }

    pub fn with_revision(mut self, commit: &str) -> Self {
        self.known.insert(commit.to_string());
        self
    }

    pub fn with_date(mut self, git_dir: impl AsRef<Path>, date: &str, commit: &str) -> Self {
        self.dates.insert(
            (git_dir.as_ref().to_path_buf(), date.to_string()),
            commit.to_string(),
        );
        self.known.insert(commit.to_string());
        self
    }

    pub fn with_parents(mut self, commit: &str, parents: &[&str]) -> Self {
        self.known.insert(commit.to_string());
        self.known.extend(strings(parents));
        self.parents.insert(commit.to_string(), strings(parents));
        self
    }

    pub fn with_file(mut self, commit: &str, path: &str, mode: &str, content: &[u8]) -> Self {
        self.known.insert(commit.to_string());
        self.files.insert(
            (commit.to_string(), path.to_string()),
            (mode.to_string(), content.to_vec()),
        );
        self
    }

    pub fn with_message(mut self, commit: &str, message: &str) -> Self {
        self.messages.insert(commit.to_string(), message.to_string());
        self
    }

    pub fn with_worktree_diff(
        mut self,
        git_dir: impl AsRef<Path>,
        commit: &str,
        paths: &[&str],
    ) -> Self {
        self.worktree_diffs.insert(
            (git_dir.as_ref().to_path_buf(), commit.to_string()),
            strings(paths),
        );
        self
    }

    pub fn with_range_diff(mut self, from: &str, to: &str, paths: &[&str]) -> Self {
        self.known.insert(from.to_string());
        self.known.insert(to.to_string());
        self.range_diffs
            .insert((from.to_string(), to.to_string()), strings(paths));
        self
    }

    pub fn with_status(mut self, git_dir: impl AsRef<Path>, paths: &[&str]) -> Self {
        self.statuses
            .insert(git_dir.as_ref().to_path_buf(), strings(paths));
        self
    }

    /// Every command run in `git_dir` fails.
    pub fn failing(mut self, git_dir: impl AsRef<Path>) -> Self {
        self.failing.insert(git_dir.as_ref().to_path_buf());
        self
    }

    fn check(&self, git_dir: &Path, command: &str) -> Result<()> {
        self.calls.lock().unwrap().push(command.to_string());
        if self.failing.contains(git_dir) {
            return Err(Error::GitCommand {
                command: command.to_string(),
                path: git_dir.display().to_string(),
                stderr: "fatal: not a git repository".to_string(),
            });
        }
        Ok(())
    }
}

impl GitOperations for MockGit {
    fn rev_parse(&self, git_dir: &Path, rev: &str) -> Result<Option<String>> {
        self.check(git_dir, "rev-parse")?;
        if rev == "HEAD" {
            return Ok(self.heads.get(git_dir).cloned());
        }
        Ok(self.known.contains(rev).then(|| rev.to_string()))
    }

    fn commit_until(&self, git_dir: &Path, date: &str) -> Result<Option<String>> {
        self.check(git_dir, "log --until")?;
        Ok(self
            .dates
            .get(&(git_dir.to_path_buf(), date.to_string()))
            .cloned())
    }

    fn parents(&self, git_dir: &Path, commit: &str) -> Result<Vec<String>> {
        self.check(git_dir, "rev-list --parents")?;
        Ok(self.parents.get(commit).cloned().unwrap_or_default())
    }

    fn diff_names(&self, git_dir: &Path, from: &str, to: Option<&str>) -> Result<Vec<String>> {
        self.check(git_dir, "diff")?;
        let paths = match to {
            Some(to) => self.range_diffs.get(&(from.to_string(), to.to_string())),
            None => self
                .worktree_diffs
                .get(&(git_dir.to_path_buf(), from.to_string())),
        };
        Ok(paths.cloned().unwrap_or_default())
    }

    fn status_names(&self, git_dir: &Path) -> Result<Vec<String>> {
        self.check(git_dir, "status")?;
        Ok(self.statuses.get(git_dir).cloned().unwrap_or_default())
    }

    fn ls_tree(&self, git_dir: &Path, commit: &str, dir: &str) -> Result<Vec<TreeEntry>> {
        self.check(git_dir, "ls-tree")?;
        let mut dirs = BTreeSet::new();
        let mut entries = Vec::new();
        for ((c, path), (mode, _)) in &self.files {
            if c != commit {
                continue;
            }
            let Some(rest) = crate::path::strip_prefix(path, dir).filter(|r| !r.is_empty()) else {
                continue;
            };
            match rest.split_once('/') {
                Some((child, _)) => {
                    dirs.insert(crate::path::join(dir, child));
                }
                None => entries.push(TreeEntry {
                    mode: mode.clone(),
                    path: path.clone(),
                }),
            }
        }
        entries.extend(dirs.into_iter().map(|path| TreeEntry {
            mode: "040000".to_string(),
            path,
        }));
        Ok(entries)
    }

    fn read_blob(&self, git_dir: &Path, commit: &str, path: &str) -> Result<Vec<u8>> {
        self.check(git_dir, "cat-file")?;
        self.files
            .get(&(commit.to_string(), path.to_string()))
            .map(|(_, content)| content.clone())
            .ok_or_else(|| Error::GitCommand {
                command: "cat-file blob".to_string(),
                path: git_dir.display().to_string(),
                stderr: format!("fatal: path '{}' does not exist in '{}'", path, commit),
            })
    }

    fn commit_message(&self, git_dir: &Path, commit: &str) -> Result<String> {
        self.check(git_dir, "log --format=%B")?;
        Ok(self.messages.get(commit).cloned().unwrap_or_default())
    }
}

/// A manifest entry whose project name equals its prefix.
pub(crate) fn manifest_entry(prefix: &str) -> ManifestEntry {
    ManifestEntry {
        prefix: prefix.to_string(),
        name: prefix.to_string(),
        url: format!("https://example.com/{}", prefix),
        revision: None,
    }
}

/// A historical-mode registry over a temporary forest, without master
/// links.
pub(crate) fn registry_with(prefixes: &[&str]) -> (TempDir, Registry) {
    let temp = TempDir::new().unwrap();
    let config = OverlayConfig::new(temp.path().join("forest"), temp.path().join("out"))
        .unwrap()
        .with_state_dir(temp.path().join("state"))
        .unwrap();
    let entries: Vec<ManifestEntry> = prefixes.iter().map(|p| manifest_entry(p)).collect();
    let registry = Registry::from_manifest(&entries, Arc::new(config), Arc::new(MockGit::new()));
    (temp, registry)
}
