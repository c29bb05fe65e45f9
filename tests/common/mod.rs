//! Shared test utilities for integration and E2E tests.
//!
//! ## Usage
//!
//! Add `mod common;` to your test file, then use the helpers:
//!
//! ```rust,ignore
//! mod common;
//! use common::prelude::*;
//!
//! #[test]
//! fn test_example() {
//!     let fixture = ForestFixture::new().with_git_repo("A", &[("x.txt", "x")]);
//!     fixture.command().arg("snapshot").assert().success();
//! }
//! ```

use assert_fs::prelude::*;
use std::path::{Path, PathBuf};
use std::process::Command;

/// Re-export commonly used test dependencies for convenience.
pub mod prelude {
    pub use assert_cmd::cargo::cargo_bin_cmd;
    pub use assert_fs::prelude::*;
    pub use predicates::prelude::*;

    pub use super::{git, is_symlink, ForestFixture};
}

/// Run `git <args>` in `dir`, panicking with its stderr on failure.
pub fn git(dir: &Path, args: &[&str]) -> String {
    let output = Command::new("git")
        .args(args)
        .current_dir(dir)
        .env("GIT_AUTHOR_NAME", "Test")
        .env("GIT_AUTHOR_EMAIL", "test@example.com")
        .env("GIT_COMMITTER_NAME", "Test")
        .env("GIT_COMMITTER_EMAIL", "test@example.com")
        .output()
        .expect("Failed to run git");
    assert!(
        output.status.success(),
        "git {:?} failed: {}",
        args,
        String::from_utf8_lossy(&output.stderr)
    );
    String::from_utf8_lossy(&output.stdout).trim().to_string()
}

pub fn is_symlink(path: &Path) -> bool {
    std::fs::symlink_metadata(path)
        .map(|m| m.file_type().is_symlink())
        .unwrap_or(false)
}

/// A temporary forest with a manifest listing, a state directory and an
/// output directory beside it.
///
/// Layout:
///
/// ```text
/// <temp>/forest/          the checkouts
/// <temp>/listing.txt      manifest listing, rewritten on every repo added
/// <temp>/state/           master links
/// <temp>/out/             snapshot output
/// ```
pub struct ForestFixture {
    temp_dir: assert_fs::TempDir,
    prefixes: Vec<String>,
}

impl ForestFixture {
    pub fn new() -> Self {
        let temp_dir = assert_fs::TempDir::new().expect("Failed to create temp directory");
        temp_dir
            .child("forest")
            .create_dir_all()
            .expect("Failed to create forest");
        let fixture = Self {
            temp_dir,
            prefixes: Vec::new(),
        };
        fixture.write_listing();
        fixture
    }

    /// Add a git repository at `prefix` holding `files` in one commit.
    pub fn with_git_repo(mut self, prefix: &str, files: &[(&str, &str)]) -> Self {
        let dir = self.forest().join(prefix);
        std::fs::create_dir_all(&dir).expect("Failed to create repository directory");
        git(&dir, &["init", "--quiet"]);
        for (path, content) in files {
            self.write(&format!("{}/{}", prefix, path), content);
        }
        git(&dir, &["add", "-A"]);
        git(&dir, &["commit", "--quiet", "--allow-empty", "-m", "initial"]);
        self.prefixes.push(prefix.to_string());
        self.write_listing();
        self
    }

    /// Register `prefix` in the listing without creating a repository.
    pub fn with_listed_dir(mut self, prefix: &str) -> Self {
        std::fs::create_dir_all(self.forest().join(prefix)).expect("Failed to create directory");
        self.prefixes.push(prefix.to_string());
        self.write_listing();
        self
    }

    /// Write `content` at forest-relative `path`.
    pub fn write(&self, path: &str, content: &str) {
        self.temp_dir
            .child("forest")
            .child(path)
            .write_str(content)
            .expect("Failed to write file");
    }

    /// Commit everything in the repository at `prefix`; returns the new
    /// commit hash.
    pub fn commit(&self, prefix: &str, message: &str) -> String {
        let dir = self.forest().join(prefix);
        git(&dir, &["add", "-A"]);
        git(&dir, &["commit", "--quiet", "-m", message]);
        git(&dir, &["rev-parse", "HEAD"])
    }

    fn write_listing(&self) {
        let listing: String = self
            .prefixes
            .iter()
            .map(|p| format!("{} : {} : https://example.com/{}\n", p, p, p))
            .collect();
        std::fs::write(self.listing(), listing).expect("Failed to write listing");
    }

    pub fn forest(&self) -> PathBuf {
        self.temp_dir.path().join("forest")
    }

    pub fn listing(&self) -> PathBuf {
        self.temp_dir.path().join("listing.txt")
    }

    pub fn state(&self) -> PathBuf {
        self.temp_dir.path().join("state")
    }

    pub fn output(&self) -> PathBuf {
        self.temp_dir.path().join("out")
    }

    /// The `repo-overlay` binary with forest, manifest and state directory
    /// set through the environment.
    pub fn command(&self) -> assert_cmd::Command {
        let mut cmd = assert_cmd::cargo::cargo_bin_cmd!("repo-overlay");
        cmd.current_dir(self.temp_dir.path())
            .env("REPO_OVERLAY_FOREST", self.forest())
            .env("REPO_OVERLAY_MANIFEST", self.listing())
            .env("REPO_OVERLAY_STATE_DIR", self.state())
            .env_remove("REPO_OVERLAY_OUTPUT")
            .env_remove("REPO_OVERLAY_JOBS")
            .env("NO_COLOR", "1");
        cmd
    }

    /// `repo-overlay snapshot -o <out>` with master links set up first.
    pub fn snapshot(&self) -> assert_cmd::Command {
        let mut cmd = self.command();
        cmd.arg("snapshot")
            .arg("--setup-links")
            .arg("-o")
            .arg(self.output());
        cmd
    }
}

impl Default for ForestFixture {
    fn default() -> Self {
        Self::new()
    }
}
