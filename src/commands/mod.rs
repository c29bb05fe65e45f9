//! # CLI Command Implementations
//!
//! This module contains the implementation for each subcommand of the
//! `repo-overlay` command-line tool. Each subcommand is defined in its own
//! file:
//!
//! - An `Args` struct that defines the command-specific arguments and options,
//!   derived using `clap`.
//! - An `execute` function that takes the parsed `Args` and performs the
//!   command's logic by calling into the `repo_overlay` library.
//!
//! Every command that works on a forest shares [`ForestArgs`], which loads
//! the manifest listing and the optional `.repo-overlay.yaml`.

pub mod completions;
pub mod link;
pub mod resolve;
pub mod snapshot;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Args;

use repo_overlay::config::ConfigFile;
use repo_overlay::manifest::{self, ManifestEntry};

/// Options locating a forest and its manifest.
#[derive(Args, Debug, Clone)]
pub struct ForestArgs {
    /// Root of the multi-repository forest
    #[arg(long, value_name = "DIR", env = "REPO_OVERLAY_FOREST", default_value = ".")]
    pub forest: PathBuf,

    /// Manifest listing in `repo list --url` format.
    ///
    /// Defaults to the `manifest:` entry of `.repo-overlay.yaml`.
    #[arg(short, long, value_name = "FILE", env = "REPO_OVERLAY_MANIFEST")]
    pub manifest: Option<PathBuf>,

    /// Directory holding the `repos-by-name` master links.
    ///
    /// Defaults to the `state_dir:` entry of `.repo-overlay.yaml`, then to
    /// the platform cache directory.
    #[arg(long, value_name = "DIR", env = "REPO_OVERLAY_STATE_DIR")]
    pub state_dir: Option<PathBuf>,
}

/// A loaded forest: its configuration file and manifest entries.
#[derive(Debug)]
pub struct Forest {
    pub root: PathBuf,
    pub file: ConfigFile,
    pub entries: Vec<ManifestEntry>,
    pub state_dir: Option<PathBuf>,
}

impl ForestArgs {
    /// Read `.repo-overlay.yaml` and the manifest listing.
    pub fn load(&self) -> Result<Forest> {
        let root = std::path::absolute(&self.forest)
            .with_context(|| format!("Invalid forest path: {}", self.forest.display()))?;
        if !root.is_dir() {
            anyhow::bail!("Forest root not found: {}", root.display());
        }

        let file = ConfigFile::load(&root)?;
        let manifest_path = self
            .manifest
            .clone()
            .or_else(|| file.manifest.clone())
            .context("No manifest listing given (use --manifest or `manifest:` in .repo-overlay.yaml)")?;
        if !manifest_path.exists() {
            anyhow::bail!("Manifest listing not found: {}", manifest_path.display());
        }

        let entries = manifest::from_file(&manifest_path)?;
        let entries = manifest::with_repo_tool_checkouts(entries, &root);
        log::debug!(
            "loaded {} manifest entries from {}",
            entries.len(),
            manifest_path.display()
        );

        let state_dir = self.state_dir.clone().or_else(|| file.state_dir.clone());
        Ok(Forest {
            root,
            file,
            entries,
            state_dir,
        })
    }
}
