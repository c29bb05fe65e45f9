//! System `git` plumbing
//!
//! Thin wrappers around the `git` binary, run inside a repository's checkout
//! directory. Every command that lists paths is run with `-z` so that paths
//! containing whitespace or quotes come back verbatim.
//!
//! These functions only know about git; the decision what a failure means
//! for a snapshot is made by the backends in [`crate::backend`].

use std::path::Path;
use std::process::Command;

use crate::error::{Error, Result};

/// One entry of `git ls-tree` output.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TreeEntry {
    /// Six-digit octal mode as printed by git (`040000`, `100644`, ...)
    pub mode: String,
    /// Path of the entry relative to the repository root
    pub path: String,
}

/// Run `git <args>` in `git_dir` and return its stdout.
fn run(git_dir: &Path, args: &[&str]) -> Result<Vec<u8>> {
    let output = Command::new("git")
        .args(args)
        .current_dir(git_dir)
        .output()
        .map_err(|e| Error::GitCommand {
            command: args.join(" "),
            path: git_dir.display().to_string(),
            stderr: e.to_string(),
        })?;

    if !output.status.success() {
        return Err(Error::GitCommand {
            command: args.join(" "),
            path: git_dir.display().to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    Ok(output.stdout)
}

/// Split NUL-terminated output into strings, dropping the trailing empty
/// record.
fn split_nul(out: &[u8]) -> Vec<String> {
    out.split(|b| *b == 0)
        .filter(|field| !field.is_empty())
        .map(|field| String::from_utf8_lossy(field).into_owned())
        .collect()
}

/// Accept only full or abbreviated hexadecimal object names.
fn looks_like_commit(candidate: &str) -> bool {
    candidate.len() >= 10 && candidate.chars().all(|c| c.is_ascii_hexdigit())
}

/// Resolve `rev` to a commit hash.
///
/// Returns `Ok(None)` when git runs but the revision does not exist, so the
/// caller can fall back instead of failing.
pub fn rev_parse(git_dir: &Path, rev: &str) -> Result<Option<String>> {
    let spec = format!("{}^{{commit}}", rev);
    match run(git_dir, &["rev-parse", "--verify", "--quiet", &spec]) {
        Ok(out) => {
            let hash = String::from_utf8_lossy(&out).trim().to_string();
            Ok(looks_like_commit(&hash).then_some(hash))
        }
        Err(Error::GitCommand { stderr, .. }) if stderr.is_empty() => Ok(None),
        Err(e) => Err(e),
    }
}

/// The newest first-parent commit on `HEAD` that is not after `date`.
pub fn commit_until(git_dir: &Path, date: &str) -> Result<Option<String>> {
    let until = format!("--until={}", date);
    let out = run(
        git_dir,
        &["log", "-1", "--first-parent", "--pretty=tformat:%H", &until],
    )?;
    let hash = String::from_utf8_lossy(&out).trim().to_string();
    Ok(looks_like_commit(&hash).then_some(hash))
}

/// The parents of `commit`, in order.
pub fn parents(git_dir: &Path, commit: &str) -> Result<Vec<String>> {
    let out = run(git_dir, &["rev-list", "--parents", "-n", "1", commit])?;
    let line = String::from_utf8_lossy(&out);
    Ok(line.split_whitespace().skip(1).map(str::to_string).collect())
}

/// Parse `--name-status -z --no-renames` output into paths.
fn parse_name_status(out: &[u8]) -> Vec<String> {
    split_nul(out)
        .chunks(2)
        .filter_map(|pair| pair.get(1).cloned())
        .collect()
}

/// Paths that differ between `from` and `to`, or between `from` and the
/// working tree when `to` is `None`.
pub fn diff_names(git_dir: &Path, from: &str, to: Option<&str>) -> Result<Vec<String>> {
    let range;
    let mut args = vec!["diff", "--name-status", "--no-renames", "-z"];
    match to {
        Some(to) => {
            range = format!("{}..{}", from, to);
            args.push(&range);
        }
        None => args.push(from),
    }
    Ok(parse_name_status(&run(git_dir, &args)?))
}

/// Paths that `git status` reports as modified, added, deleted or
/// untracked.
pub fn status_names(git_dir: &Path) -> Result<Vec<String>> {
    let out = run(
        git_dir,
        &[
            "status",
            "--porcelain",
            "-z",
            "--untracked-files=all",
            "--no-renames",
        ],
    )?;
    Ok(split_nul(&out)
        .into_iter()
        .filter_map(|record| record.get(3..).map(|p| p.trim_end_matches('/').to_string()))
        .filter(|p| !p.is_empty())
        .collect())
}

/// The immediate entries of the tree at `dir` (repository-relative, `""`
/// for the root) in `commit`.
pub fn ls_tree(git_dir: &Path, commit: &str, dir: &str) -> Result<Vec<TreeEntry>> {
    let treeish = if dir.is_empty() {
        commit.to_string()
    } else {
        format!("{}:{}", commit, dir)
    };
    let out = run(git_dir, &["ls-tree", "-z", &treeish])?;

    let mut entries = Vec::new();
    for record in split_nul(&out) {
        // "<mode> <type> <oid>\t<name>"
        let Some((meta, name)) = record.split_once('\t') else {
            continue;
        };
        let Some(mode) = meta.split(' ').next() else {
            continue;
        };
        entries.push(TreeEntry {
            mode: mode.to_string(),
            path: crate::path::join(dir, name),
        });
    }
    Ok(entries)
}

/// Raw bytes of the blob at `path` in `commit`.
///
/// For a symlink entry this is the stored link target.
pub fn read_blob(git_dir: &Path, commit: &str, path: &str) -> Result<Vec<u8>> {
    let object = format!("{}:{}", commit, path);
    run(git_dir, &["cat-file", "blob", &object])
}

/// Full commit message of `commit`.
pub fn commit_message(git_dir: &Path, commit: &str) -> Result<String> {
    let out = run(git_dir, &["log", "-1", "--format=%B", commit])?;
    Ok(String::from_utf8_lossy(&out).trim_end().to_string())
}
