//! Manifest listing parsing
//!
//! The set of repositories in a forest comes from the repo tool's
//! `repo list --url` output, one repository per line:
//!
//! ```text
//! frameworks/base : platform/frameworks/base : https://android.googlesource.com/platform/frameworks/base : refs/heads/main
//! ```
//!
//! Producing that listing is left to the repo tool; this module only reads
//! it.

use std::fs;
use std::path::Path;

use crate::error::{Error, Result};

/// Separator used between fields of a listing line.
const FIELD_SEPARATOR: &str = " : ";

/// Checkouts the repo tool keeps for itself inside every forest.
const REPO_TOOL_CHECKOUTS: [&str; 2] = [".repo/repo", ".repo/manifests"];

/// One repository of the forest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManifestEntry {
    /// Forest-relative path prefix the repository is checked out at
    pub prefix: String,
    /// Project name, unique across the manifest
    pub name: String,
    /// Remote fetch URL
    pub url: String,
    /// Revision the manifest tracks for this project, if listed
    pub revision: Option<String>,
}

/// Parse a whole listing.
///
/// Blank lines and lines starting with `#` are ignored. Prefixes are
/// normalized so that `./external/foo/` and `external/foo` are the same key.
pub fn parse_listing(content: &str) -> Result<Vec<ManifestEntry>> {
    let mut entries = Vec::new();

    for (idx, raw) in content.lines().enumerate() {
        let line = raw.trim();
        if line.is_empty() || line.starts_with('#') {
            continue;
        }

        let fields: Vec<&str> = line.split(FIELD_SEPARATOR).map(str::trim).collect();
        if fields.len() < 3 {
            return Err(Error::ManifestParse {
                line: idx + 1,
                message: format!(
                    "expected 'path : name : url [: revision]', got {} field(s)",
                    fields.len()
                ),
            });
        }

        let prefix = crate::path::normalize(fields[0]).map_err(|e| Error::ManifestParse {
            line: idx + 1,
            message: e.to_string(),
        })?;
        if prefix.is_empty() {
            return Err(Error::ManifestParse {
                line: idx + 1,
                message: "repository path must not be the forest root".to_string(),
            });
        }

        entries.push(ManifestEntry {
            prefix,
            name: fields[1].to_string(),
            url: fields[2].to_string(),
            revision: fields.get(3).filter(|r| !r.is_empty()).map(|r| r.to_string()),
        });
    }

    Ok(entries)
}

/// Read and parse a listing file.
pub fn from_file(path: &Path) -> Result<Vec<ManifestEntry>> {
    let content = fs::read_to_string(path)?;
    parse_listing(&content)
}

/// Add the repo tool's own checkouts (`.repo/repo`, `.repo/manifests`) when
/// they exist in the forest and are not listed already.
///
/// Their project name is their path, and they have no remote URL in the
/// listing.
pub fn with_repo_tool_checkouts(
    mut entries: Vec<ManifestEntry>,
    forest_root: &Path,
) -> Vec<ManifestEntry> {
    for prefix in REPO_TOOL_CHECKOUTS {
        let present = forest_root.join(prefix).is_dir();
        let listed = entries.iter().any(|e| e.prefix == prefix);
        if present && !listed {
            entries.push(ManifestEntry {
                prefix: prefix.to_string(),
                name: prefix.to_string(),
                url: String::new(),
                revision: None,
            });
        }
    }
    entries
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_listing() {
        let listing = "\
frameworks/base : platform/frameworks/base : https://example.com/fb : refs/heads/main
# comment

./external/zlib/ : platform/external/zlib : https://example.com/zlib
";
        let entries = parse_listing(listing).unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].prefix, "frameworks/base");
        assert_eq!(entries[0].name, "platform/frameworks/base");
        assert_eq!(entries[0].revision.as_deref(), Some("refs/heads/main"));
        assert_eq!(entries[1].prefix, "external/zlib");
        assert_eq!(entries[1].url, "https://example.com/zlib");
        assert_eq!(entries[1].revision, None);
    }

    #[test]
    fn test_parse_listing_rejects_short_line() {
        let err = parse_listing("ok : name : url\nbroken line\n").unwrap_err();
        match err {
            Error::ManifestParse { line, .. } => assert_eq!(line, 2),
            other => panic!("unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_parse_listing_rejects_root_prefix() {
        assert!(parse_listing(". : root : url").is_err());
    }

    #[test]
    fn test_with_repo_tool_checkouts() {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join(".repo/manifests")).unwrap();

        let entries = with_repo_tool_checkouts(Vec::new(), temp.path());
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].prefix, ".repo/manifests");
        assert_eq!(entries[0].name, ".repo/manifests");

        let again = with_repo_tool_checkouts(entries, temp.path());
        assert_eq!(again.len(), 1);
    }
}
