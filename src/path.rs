//! Forest path manipulation utilities
//!
//! Forest paths are `/`-separated strings relative to the forest root, the
//! same form `git` reports them in. The empty string is the forest root.

use std::path::{Component, Path, PathBuf};

use crate::error::{Error, Result};

/// Normalize a forest-relative path.
///
/// Strips `.` components, empty components and surrounding slashes, so that
/// `"./a//b/"` becomes `"a/b"`. Parent components (`..`) are rejected since
/// they could escape the forest.
pub fn normalize(path: &str) -> Result<String> {
    let mut parts: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                return Err(Error::Path {
                    message: format!("parent component in forest path '{}'", path),
                })
            }
            other => parts.push(other),
        }
    }
    Ok(parts.join("/"))
}

/// The containing directory of `path`, with `""` as the parent of every
/// top-level entry. The root has no parent and maps to itself.
pub fn parent(path: &str) -> &str {
    match path.rfind('/') {
        Some(idx) => &path[..idx],
        None => "",
    }
}

/// Number of components in `path`; the root has depth 0.
pub fn depth(path: &str) -> usize {
    if path.is_empty() {
        0
    } else {
        path.matches('/').count() + 1
    }
}

/// Join a prefix and a relative path, treating `""` as the identity.
pub fn join(prefix: &str, rel: &str) -> String {
    match (prefix.is_empty(), rel.is_empty()) {
        (true, _) => rel.to_string(),
        (_, true) => prefix.to_string(),
        _ => format!("{}/{}", prefix, rel),
    }
}

/// Strip `prefix` from `path` on a component boundary.
///
/// `strip_prefix("a/bc", "a/b")` is `None`, while
/// `strip_prefix("a/b/c", "a/b")` is `Some("c")`.
pub fn strip_prefix<'a>(path: &'a str, prefix: &str) -> Option<&'a str> {
    if prefix.is_empty() {
        return Some(path);
    }
    let rest = path.strip_prefix(prefix)?;
    if rest.is_empty() {
        Some(rest)
    } else {
        rest.strip_prefix('/')
    }
}

/// Iterate over the proper ancestors of `path`, nearest first, ending with
/// the root `""`.
pub fn ancestors(path: &str) -> impl Iterator<Item = &str> {
    let mut current = if path.is_empty() { None } else { Some(path) };
    std::iter::from_fn(move || {
        let next = parent(current?);
        current = if next.is_empty() { None } else { Some(next) };
        Some(next)
    })
    .fuse()
}

/// Resolve `.` and `..` components lexically, without touching the disk.
pub fn lexical_clean(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                if !out.pop() {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// Compute the target to store in a symlink living in `link_dir` so that it
/// points at `target`.
///
/// Both paths are expected to be absolute; the result only contains `..`
/// components followed by the part of `target` below the common ancestor.
pub fn relative_target(link_dir: &Path, target: &Path) -> PathBuf {
    let from = lexical_clean(link_dir);
    let to = lexical_clean(target);
    let from: Vec<Component> = from.components().collect();
    let to: Vec<Component> = to.components().collect();

    let common = from
        .iter()
        .zip(to.iter())
        .take_while(|(a, b)| a == b)
        .count();

    let mut rel = PathBuf::new();
    for _ in common..from.len() {
        rel.push("..");
    }
    for component in &to[common..] {
        rel.push(component.as_os_str());
    }
    if rel.as_os_str().is_empty() {
        rel.push(".");
    }
    rel
}
