//! # Version Records
//!
//! After a snapshot, every git-backed repository leaves one record under
//! `<output>/.repo-overlay/versions/<prefix>/version.txt`:
//!
//! ```text
//! platform/build/: 0123456789abcdef0123456789abcdef01234567 platform/build https://example.com/build
//! # Subject of the target commit
//! #
//! # Body lines, each prefixed with "# ".
//! ```
//!
//! A later run can point `--baseline-versions` at such a directory; the
//! recorded commit then becomes the repository's baseline.

use std::fs;
use std::path::{Path, PathBuf};

use log::debug;
use walkdir::WalkDir;

use crate::error::{Error, Result};
use crate::filesystem;

/// Directory below the output root holding the records.
pub const VERSIONS_DIR: &str = ".repo-overlay/versions";

const RECORD_FILE: &str = "version.txt";

/// The first line of a version record.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct VersionRecord {
    pub prefix: String,
    pub commit: String,
    pub name: String,
    pub url: String,
}

impl VersionRecord {
    pub fn to_line(&self) -> String {
        format!("{}/: {} {} {}", self.prefix, self.commit, self.name, self.url)
    }

    pub fn parse_line(line: &str) -> Result<Self> {
        let invalid = |reason: &str| Error::VersionRecord {
            message: format!("{}: '{}'", reason, line),
        };

        let (prefix, rest) = line
            .split_once("/: ")
            .ok_or_else(|| invalid("missing '/: ' separator"))?;
        let mut fields = rest.split_whitespace();
        let (Some(commit), Some(name), Some(url)) = (fields.next(), fields.next(), fields.next())
        else {
            return Err(invalid("expected commit, name and url"));
        };

        Ok(Self {
            prefix: prefix.to_string(),
            commit: commit.to_string(),
            name: name.to_string(),
            url: url.to_string(),
        })
    }

    /// The full record text: the record line, then `message` commented out.
    pub fn render(&self, message: &str) -> String {
        let mut text = self.to_line();
        text.push('\n');
        for line in message.lines() {
            if line.is_empty() {
                text.push_str("#\n");
            } else {
                text.push_str("# ");
                text.push_str(line);
                text.push('\n');
            }
        }
        text
    }
}

fn record_path(dir: &Path, prefix: &str) -> PathBuf {
    dir.join(prefix).join(RECORD_FILE)
}

/// Write the record of `record.prefix` below `dir`.
pub fn write_record(dir: &Path, record: &VersionRecord, message: &str) -> Result<PathBuf> {
    let path = record_path(dir, &record.prefix);
    filesystem::write_file(&path, record.render(message).as_bytes(), false)?;
    Ok(path)
}

/// Read the record of `prefix` below `dir`, `None` if there is none.
pub fn read_record(dir: &Path, prefix: &str) -> Result<Option<VersionRecord>> {
    let path = record_path(dir, prefix);
    let content = match fs::read_to_string(&path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
        Err(e) => return Err(e.into()),
    };
    let first = content.lines().next().unwrap_or_default();
    VersionRecord::parse_line(first).map(Some)
}

/// The commit recorded for `prefix` below `dir`.
///
/// Missing or malformed records yield `None`; the caller falls back to
/// `HEAD`.
pub fn read_version(dir: &Path, prefix: &str) -> Option<String> {
    match read_record(dir, prefix) {
        Ok(record) => record.map(|r| r.commit),
        Err(e) => {
            debug!("ignoring version record of '{}': {}", prefix, e);
            None
        }
    }
}

/// Every record below `dir`, ordered by prefix.
pub fn read_all(dir: &Path) -> Result<Vec<VersionRecord>> {
    let mut records = Vec::new();
    for entry in WalkDir::new(dir).follow_links(false) {
        let entry = entry.map_err(|e| Error::VersionRecord {
            message: e.to_string(),
        })?;
        if entry.file_type().is_file() && entry.file_name() == RECORD_FILE {
            let content = fs::read_to_string(entry.path())?;
            let first = content.lines().next().unwrap_or_default();
            records.push(VersionRecord::parse_line(first)?);
        }
    }
    records.sort_by(|a, b| a.prefix.cmp(&b.prefix));
    Ok(records)
}
