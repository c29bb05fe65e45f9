//! The synthetic repository at the forest root
//!
//! Owns every path no registered repository claims. It never reports
//! changes; its listing is one directory per registered prefix, so the
//! materializer creates a stub for each repository under the output root.

use std::fs;
use std::path::Path;
use std::sync::Arc;

use super::{ChangedPaths, Entries, RepoStatus};
use crate::config::OverlayConfig;
use crate::dirstate::EntryKind;
use crate::error::{Error, Result};
use crate::filesystem;
use crate::registry::Registry;

#[derive(Debug, Clone)]
pub struct EmptyRepository {
    config: Arc<OverlayConfig>,
}

impl EmptyRepository {
    pub fn new(config: Arc<OverlayConfig>) -> Self {
        Self { config }
    }

    pub fn find_changed(&self) -> RepoStatus<ChangedPaths> {
        RepoStatus::Ok(Vec::new())
    }

    pub fn find_entries(&self, registry: &Registry) -> RepoStatus<Entries> {
        RepoStatus::Ok(
            registry
                .prefixes()
                .map(|prefix| (prefix.to_string(), EntryKind::Directory))
                .collect(),
        )
    }

    /// Unowned content lives directly in the forest.
    pub fn master(&self) -> &Path {
        &self.config.forest_root
    }

    pub fn materialize_file(&self, repo_path: &str, dst: &Path) -> Result<()> {
        let src = self.config.forest_root.join(repo_path);
        filesystem::copy_or_hardlink(&src, dst, self.config.link_mode)
    }

    pub fn materialize_symlink(&self, repo_path: &str, dst: &Path) -> Result<()> {
        let src = self.config.forest_root.join(repo_path);
        let target = fs::read_link(&src).map_err(|e| Error::Filesystem {
            message: format!("Failed to read link '{}': {}", src.display(), e),
        })?;
        filesystem::replace_symlink(&target, dst)
    }
}
