//! Default values for repo-overlay configuration.
//!
//! This module provides centralized default values used across commands,
//! ensuring consistency and avoiding duplication.

use std::path::PathBuf;

/// Name of the optional per-forest configuration file.
pub const CONFIG_FILE_NAME: &str = ".repo-overlay.yaml";

/// Returns the default state directory.
///
/// The state directory holds the `repos-by-name` master links. It uses the
/// platform-appropriate cache directory:
/// - Linux: `~/.cache/repo-overlay` (XDG Base Directory)
/// - macOS: `~/Library/Caches/repo-overlay`
/// - Windows: `{FOLDERID_LocalAppData}\repo-overlay`
///
/// Falls back to `.repo-overlay-state` in the current directory if the
/// platform cache directory cannot be determined.
pub fn default_state_dir() -> PathBuf {
    dirs::cache_dir()
        .map(|dir| dir.join("repo-overlay"))
        .unwrap_or_else(|| PathBuf::from(".repo-overlay-state"))
}

/// Returns the default size of the repository worker pool.
///
/// Repository queries mostly wait on `git` processes, so the pool is sized
/// from the available parallelism but never below four workers.
pub fn default_jobs() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(1)
        .max(4)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_state_dir_returns_path() {
        let state_dir = default_state_dir();
        assert!(
            state_dir.ends_with("repo-overlay") || state_dir.ends_with(".repo-overlay-state"),
            "unexpected state dir: {:?}",
            state_dir
        );
    }

    #[test]
    fn test_default_jobs_has_floor() {
        assert!(default_jobs() >= 4);
    }
}
