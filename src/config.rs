//! # Run Configuration
//!
//! A snapshot run is described by one immutable [`OverlayConfig`]. It is
//! built once, wrapped in an `Arc` and handed to every repository backend at
//! construction time, so no part of the pipeline reads global state.
//!
//! ## Sources
//!
//! Values are resolved with this precedence, highest first:
//!
//! 1. Command-line flags (and their `REPO_OVERLAY_*` environment variables,
//!    handled by `clap`)
//! 2. The optional `.repo-overlay.yaml` file in the forest root
//!    ([`ConfigFile`])
//! 3. Built-in defaults from [`crate::defaults`]
//!
//! ## Example `.repo-overlay.yaml`
//!
//! ```yaml
//! output: /srv/overlays/head
//! state_dir: /srv/overlays/state
//! manifest: .repo/listing.txt
//! jobs: 16
//! hardlink: true
//! ```

use std::fs;
use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::defaults;
use crate::error::{Error, Result};

/// Which state of each repository a snapshot captures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SnapshotMode {
    /// Committed history, at a date or recorded version
    #[default]
    Historical,
    /// The live checkout, including uncommitted changes
    WorkingTree,
}

/// How changed working-tree files are materialized.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum LinkMode {
    /// Copy file contents
    #[default]
    Copy,
    /// Hard-link to the checkout, copying when that is not possible
    Hardlink,
}

/// Immutable configuration of one snapshot run.
#[derive(Debug, Clone)]
pub struct OverlayConfig {
    /// Root of the multi-repository forest
    pub forest_root: PathBuf,
    /// Directory the overlay is materialized into
    pub output_dir: PathBuf,
    /// Directory holding the `repos-by-name` master links
    pub state_dir: PathBuf,
    pub mode: SnapshotMode,
    pub link_mode: LinkMode,
    /// Size of the repository worker pool
    pub jobs: usize,
    /// Snapshot date handed to `git log --until`
    pub date: Option<String>,
    /// Commit to apply on top of the repository whose head it extends
    pub apply: Option<String>,
    /// Version record directory of an earlier snapshot, used as baseline
    pub baseline_versions: Option<PathBuf>,
    /// Write version records into the output after materializing
    pub record_versions: bool,
    /// Clear a non-empty output directory instead of refusing
    pub force: bool,
}

impl OverlayConfig {
    /// Create a configuration with defaults for everything but the two
    /// directories every run needs.
    ///
    /// Both paths are made absolute so that symlink targets can be computed
    /// relative to each other.
    pub fn new(forest_root: impl AsRef<Path>, output_dir: impl AsRef<Path>) -> Result<Self> {
        Ok(Self {
            forest_root: absolute(forest_root.as_ref())?,
            output_dir: absolute(output_dir.as_ref())?,
            state_dir: absolute(&defaults::default_state_dir())?,
            mode: SnapshotMode::default(),
            link_mode: LinkMode::default(),
            jobs: defaults::default_jobs(),
            date: None,
            apply: None,
            baseline_versions: None,
            record_versions: true,
            force: false,
        })
    }

    pub fn with_state_dir(mut self, state_dir: impl AsRef<Path>) -> Result<Self> {
        self.state_dir = absolute(state_dir.as_ref())?;
        Ok(self)
    }

    pub fn with_mode(mut self, mode: SnapshotMode) -> Self {
        self.mode = mode;
        self
    }

    pub fn with_link_mode(mut self, link_mode: LinkMode) -> Self {
        self.link_mode = link_mode;
        self
    }

    /// Set the worker pool size; zero is rejected.
    pub fn with_jobs(mut self, jobs: usize) -> Result<Self> {
        if jobs == 0 {
            return Err(Error::Config {
                message: "jobs must be at least 1".to_string(),
            });
        }
        self.jobs = jobs;
        Ok(self)
    }

    pub fn with_date(mut self, date: Option<String>) -> Self {
        self.date = date;
        self
    }

    pub fn with_apply(mut self, apply: Option<String>) -> Self {
        self.apply = apply;
        self
    }

    pub fn with_baseline_versions(mut self, dir: Option<PathBuf>) -> Result<Self> {
        self.baseline_versions = dir.as_deref().map(absolute).transpose()?;
        Ok(self)
    }

    pub fn with_record_versions(mut self, record: bool) -> Self {
        self.record_versions = record;
        self
    }

    pub fn with_force(mut self, force: bool) -> Self {
        self.force = force;
        self
    }

    /// Where the master link of the project `name` lives.
    pub fn master_link(&self, name: &str) -> PathBuf {
        self.state_dir.join("repos-by-name").join(name).join("repo")
    }

    /// Whether `path` lies inside the forest root.
    pub fn is_inside_forest(&self, path: &Path) -> bool {
        crate::path::lexical_clean(path).starts_with(&self.forest_root)
    }

    /// Reject an output directory whose clearing or filling would touch the
    /// forest's checkouts or the state directory.
    ///
    /// `prefixes` are the registered repository prefixes. The output may
    /// live inside the forest, but not at or above its root, not inside a
    /// checkout, and not around a checkout or the master links.
    pub fn check_output_dir<'a>(
        &self,
        prefixes: impl IntoIterator<Item = &'a str>,
    ) -> Result<()> {
        let output = &self.output_dir;
        let conflict = |what: String| -> Result<()> {
            Err(Error::Config {
                message: format!("output directory '{}' {}", output.display(), what),
            })
        };

        if is_within(&self.forest_root, output) {
            return conflict(format!(
                "contains the forest root '{}'",
                self.forest_root.display()
            ));
        }
        if is_within(&self.state_dir, output) {
            return conflict(format!(
                "contains the state directory '{}'",
                self.state_dir.display()
            ));
        }
        for prefix in prefixes.into_iter().filter(|p| !p.is_empty()) {
            let checkout = self.forest_root.join(prefix);
            if is_within(output, &checkout) {
                return conflict(format!("lies inside the checkout of '{}'", prefix));
            }
            if is_within(&checkout, output) {
                return conflict(format!("contains the checkout of '{}'", prefix));
            }
        }
        Ok(())
    }
}

/// Whether `inner` is `outer` or lies below it, lexically or once both
/// resolve on disk.
fn is_within(inner: &Path, outer: &Path) -> bool {
    if inner.starts_with(outer) {
        return true;
    }
    match (fs::canonicalize(inner), fs::canonicalize(outer)) {
        (Ok(inner), Ok(outer)) => inner.starts_with(outer),
        _ => false,
    }
}

fn absolute(path: &Path) -> Result<PathBuf> {
    let abs = std::path::absolute(path).map_err(|e| Error::Config {
        message: format!("cannot make '{}' absolute: {}", path.display(), e),
    })?;
    Ok(crate::path::lexical_clean(&abs))
}

/// Contents of the optional `.repo-overlay.yaml` file.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct ConfigFile {
    pub output: Option<PathBuf>,
    pub state_dir: Option<PathBuf>,
    pub manifest: Option<PathBuf>,
    pub jobs: Option<usize>,
    #[serde(default)]
    pub hardlink: bool,
}

impl ConfigFile {
    /// Parse a configuration file from a YAML string.
    pub fn parse(content: &str) -> Result<Self> {
        if content.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(serde_yaml::from_str(content)?)
    }

    /// Load `.repo-overlay.yaml` from `forest_root`, or defaults when the
    /// file does not exist.
    ///
    /// Relative paths in the file are taken relative to the forest root.
    pub fn load(forest_root: &Path) -> Result<Self> {
        let path = forest_root.join(defaults::CONFIG_FILE_NAME);
        if !path.exists() {
            return Ok(Self::default());
        }
        let mut file = Self::parse(&fs::read_to_string(&path)?)?;
        for slot in [&mut file.output, &mut file.state_dir, &mut file.manifest] {
            if let Some(p) = slot.as_mut() {
                if p.is_relative() {
                    *p = forest_root.join(&*p);
                }
            }
        }
        Ok(file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_new_makes_paths_absolute() {
        let config = OverlayConfig::new("forest", "out").unwrap();
        assert!(config.forest_root.is_absolute());
        assert!(config.output_dir.is_absolute());
        assert!(config.state_dir.is_absolute());
        assert_eq!(config.mode, SnapshotMode::Historical);
        assert_eq!(config.link_mode, LinkMode::Copy);
        assert!(config.record_versions);
    }

    #[test]
    fn test_with_jobs_rejects_zero() {
        let config = OverlayConfig::new("/f", "/o").unwrap();
        assert!(config.clone().with_jobs(0).is_err());
        assert_eq!(config.with_jobs(3).unwrap().jobs, 3);
    }

    #[test]
    fn test_master_link_layout() {
        let config = OverlayConfig::new("/f", "/o")
            .unwrap()
            .with_state_dir("/state")
            .unwrap();
        assert_eq!(
            config.master_link("platform/frameworks/base"),
            PathBuf::from("/state/repos-by-name/platform/frameworks/base/repo")
        );
    }

    #[test]
    fn test_is_inside_forest() {
        let config = OverlayConfig::new("/forest", "/out").unwrap();
        assert!(config.is_inside_forest(Path::new("/forest/a/b")));
        assert!(config.is_inside_forest(Path::new("/other/../forest/a")));
        assert!(!config.is_inside_forest(Path::new("/forest-mirror/a")));
    }

    fn layout(output: &str) -> OverlayConfig {
        OverlayConfig::new("/work/forest", output)
            .unwrap()
            .with_state_dir("/work/state")
            .unwrap()
    }

    #[test]
    fn test_check_output_dir_accepts_separate_and_unowned_dirs() {
        let prefixes = ["A", "B/lib"];
        assert!(layout("/work/out").check_output_dir(prefixes).is_ok());
        assert!(layout("/work/forest/overlay").check_output_dir(prefixes).is_ok());
        assert!(layout("/work/forest/B/other").check_output_dir(prefixes).is_ok());
    }

    #[test]
    fn test_check_output_dir_rejects_forest_root_and_ancestors() {
        for output in ["/work/forest", "/work", "/", "/work/forest/."] {
            let err = layout(output).check_output_dir(["A"]).unwrap_err();
            assert!(matches!(err, Error::Config { .. }), "{}", output);
            assert!(err.to_string().contains("forest root"), "{}", err);
        }
    }

    #[test]
    fn test_check_output_dir_rejects_checkouts() {
        let err = layout("/work/forest/A/build")
            .check_output_dir(["A"])
            .unwrap_err();
        assert!(err.to_string().contains("inside the checkout of 'A'"), "{}", err);

        let err = layout("/work/forest/A").check_output_dir(["A"]).unwrap_err();
        assert!(err.to_string().contains("checkout of 'A'"), "{}", err);

        let err = layout("/work/forest/B").check_output_dir(["B/lib"]).unwrap_err();
        assert!(err.to_string().contains("contains the checkout of 'B/lib'"), "{}", err);
    }

    #[test]
    fn test_check_output_dir_rejects_state_dir() {
        let err = layout("/work/state").check_output_dir(["A"]).unwrap_err();
        assert!(err.to_string().contains("state directory"), "{}", err);

        let config = OverlayConfig::new("/work/forest", "/srv")
            .unwrap()
            .with_state_dir("/srv/cache/state")
            .unwrap();
        assert!(config.check_output_dir(["A"]).is_err());
    }

    #[test]
    #[cfg(unix)]
    fn test_check_output_dir_sees_through_symlinks() {
        let temp = TempDir::new().unwrap();
        let forest = temp.path().join("forest");
        fs::create_dir_all(forest.join("A")).unwrap();
        std::os::unix::fs::symlink(&forest, temp.path().join("alias")).unwrap();

        let config = OverlayConfig::new(&forest, temp.path().join("alias"))
            .unwrap()
            .with_state_dir(temp.path().join("state"))
            .unwrap();
        assert!(config.check_output_dir(["A"]).is_err());
    }

    #[test]
    fn test_config_file_parse() {
        let file = ConfigFile::parse("output: /srv/out\njobs: 8\nhardlink: true\n").unwrap();
        assert_eq!(file.output, Some(PathBuf::from("/srv/out")));
        assert_eq!(file.jobs, Some(8));
        assert!(file.hardlink);
        assert_eq!(ConfigFile::parse("").unwrap(), ConfigFile::default());
        assert!(ConfigFile::parse("unknown_key: 1").is_err());
    }

    #[test]
    fn test_config_file_load_resolves_relative_paths() {
        let temp = TempDir::new().unwrap();
        fs::write(
            temp.path().join(defaults::CONFIG_FILE_NAME),
            "manifest: .repo/listing.txt\nstate_dir: /abs/state\n",
        )
        .unwrap();

        let file = ConfigFile::load(temp.path()).unwrap();
        assert_eq!(file.manifest, Some(temp.path().join(".repo/listing.txt")));
        assert_eq!(file.state_dir, Some(PathBuf::from("/abs/state")));
    }

    #[test]
    fn test_config_file_missing_is_default() {
        let temp = TempDir::new().unwrap();
        assert_eq!(ConfigFile::load(temp.path()).unwrap(), ConfigFile::default());
    }
}
