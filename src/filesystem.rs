//! Output filesystem primitives
//!
//! The materializer only needs a handful of operations on the output tree:
//! create a directory if absent, create a relative symlink (ignoring an
//! existing entry), replace an entry with a symlink, write or copy a file
//! over whatever was there before. Creation is idempotent: an entry that
//! already exists is not an error.

use std::fs;
use std::io::ErrorKind;
use std::path::Path;

use log::debug;

use crate::config::LinkMode;
use crate::error::{Error, Result};

fn fs_error(action: &str, path: &Path, e: std::io::Error) -> Error {
    Error::Filesystem {
        message: format!("Failed to {} '{}': {}", action, path.display(), e),
    }
}

/// Create `dir` and its parents, succeeding if it already exists.
pub fn create_dir_if_absent(dir: &Path) -> Result<()> {
    match fs::create_dir_all(dir) {
        Ok(()) => Ok(()),
        Err(e) if e.kind() == ErrorKind::AlreadyExists => Ok(()),
        Err(e) => Err(fs_error("create directory", dir, e)),
    }
}

fn create_parent(path: &Path) -> Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => create_dir_if_absent(parent),
        _ => Ok(()),
    }
}

/// Remove whatever is at `path` without following symlinks.
///
/// A missing entry is not an error.
pub fn remove_existing(path: &Path) -> Result<()> {
    let meta = match fs::symlink_metadata(path) {
        Ok(meta) => meta,
        Err(e) if e.kind() == ErrorKind::NotFound => return Ok(()),
        Err(e) => return Err(fs_error("inspect", path, e)),
    };
    let removed = if meta.is_dir() {
        fs::remove_dir_all(path)
    } else {
        fs::remove_file(path)
    };
    removed.map_err(|e| fs_error("remove", path, e))
}

#[cfg(unix)]
fn symlink(target: &Path, link: &Path) -> std::io::Result<()> {
    std::os::unix::fs::symlink(target, link)
}

#[cfg(not(unix))]
fn symlink(_target: &Path, _link: &Path) -> std::io::Result<()> {
    Err(std::io::Error::new(
        ErrorKind::Unsupported,
        "symlinks are only supported on unix",
    ))
}

/// Create `link` as a relative symlink to the absolute path `target`.
///
/// Parent directories are created first. If `link` already exists nothing
/// is changed and `false` is returned.
pub fn symlink_relative(target: &Path, link: &Path) -> Result<bool> {
    create_parent(link)?;
    let link_dir = link.parent().unwrap_or_else(|| Path::new("/"));
    let relative = crate::path::relative_target(link_dir, target);

    match symlink(&relative, link) {
        Ok(()) => Ok(true),
        Err(e) if e.kind() == ErrorKind::AlreadyExists => {
            debug!("{} already exists, keeping it", link.display());
            Ok(false)
        }
        Err(e) => Err(fs_error("create symlink", link, e)),
    }
}

/// Replace whatever is at `link` with a symlink storing `target` verbatim.
pub fn replace_symlink(target: &Path, link: &Path) -> Result<()> {
    create_parent(link)?;
    remove_existing(link)?;
    symlink(target, link).map_err(|e| fs_error("create symlink", link, e))
}

/// Write `content` to `dst`, replacing any existing entry.
pub fn write_file(dst: &Path, content: &[u8], executable: bool) -> Result<()> {
    create_parent(dst)?;
    remove_existing(dst)?;
    fs::write(dst, content).map_err(|e| fs_error("write", dst, e))?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        if executable {
            fs::set_permissions(dst, fs::Permissions::from_mode(0o755))
                .map_err(|e| fs_error("set permissions on", dst, e))?;
        }
    }
    #[cfg(not(unix))]
    let _ = executable;

    Ok(())
}

/// Copy or hard-link `src` to `dst`, replacing any existing entry.
///
/// Hard-linking falls back to copying when the link cannot be made, for
/// example across filesystems.
pub fn copy_or_hardlink(src: &Path, dst: &Path, mode: LinkMode) -> Result<()> {
    create_parent(dst)?;
    remove_existing(dst)?;

    if mode == LinkMode::Hardlink {
        match fs::hard_link(src, dst) {
            Ok(()) => return Ok(()),
            Err(e) => debug!(
                "hard link {} -> {} failed ({}), copying instead",
                dst.display(),
                src.display(),
                e
            ),
        }
    }

    fs::copy(src, dst).map_err(|e| fs_error("copy to", dst, e))?;
    Ok(())
}

/// Make sure `dir` exists and is empty.
///
/// A non-empty directory is cleared when `force` is set and rejected
/// otherwise.
pub fn prepare_output(dir: &Path, force: bool) -> Result<()> {
    let occupied = match fs::read_dir(dir) {
        Ok(mut entries) => entries.next().is_some(),
        Err(e) if e.kind() == ErrorKind::NotFound => false,
        Err(e) => return Err(fs_error("read", dir, e)),
    };

    if occupied {
        if !force {
            return Err(Error::OutputNotEmpty {
                path: dir.display().to_string(),
            });
        }
        debug!("clearing output directory {}", dir.display());
        remove_existing(dir)?;
    }

    create_dir_if_absent(dir)
}
