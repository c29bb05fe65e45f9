//! # Dirstate
//!
//! The dirstate is the in-memory table of every forest path seen during one
//! snapshot run. Each path has one [`Item`] recording what kind of entry it
//! is, whether it differs from the baseline, and which repository owns it.
//!
//! ## Merge-on-write
//!
//! Facts arrive piecemeal: the change scan only knows that a path changed,
//! the listing only knows what kind an entry is. [`Dirstate::store_item`]
//! merges a [`Facts`] delta into the existing item:
//!
//! - `kind` is overwritten when the delta carries one;
//! - `changed` is OR-ed in and never cleared.
//!
//! After merging, the item's parent directory is stored as a directory that
//! carries the same `changed` assertion, so every ancestor of a changed path
//! is changed too. Propagation stops at the first ancestor that is already a
//! changed directory; by induction all of its own ancestors are as well.
//!
//! The table is filled from a single thread after each parallel query phase
//! has joined, so it needs no locking.

use std::collections::HashMap;

use crate::error::{Error, Result};
use crate::path;
use crate::registry::Registry;

/// Type of a forest entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
#[serde(rename_all = "lowercase")]
pub enum EntryKind {
    Directory,
    File,
    Symlink,
}

impl EntryKind {
    /// Classify a git tree mode (`040000`, `100644`, `100755`, `120000`).
    ///
    /// Any other mode, such as a `160000` gitlink, is a structural error.
    pub fn from_git_mode(path: &str, mode: &str) -> Result<Self> {
        match mode.get(..3) {
            Some("040") => Ok(EntryKind::Directory),
            Some("100") => Ok(EntryKind::File),
            Some("120") => Ok(EntryKind::Symlink),
            _ => Err(Error::UnknownEntryKind {
                path: path.to_string(),
                mode: mode.to_string(),
            }),
        }
    }
}

/// A delta of facts about one path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Facts {
    pub kind: Option<EntryKind>,
    pub changed: Option<bool>,
}

impl Facts {
    /// The path differs from the baseline.
    pub fn changed() -> Self {
        Self {
            kind: None,
            changed: Some(true),
        }
    }

    /// The path exists with the given kind.
    pub fn kind(kind: EntryKind) -> Self {
        Self {
            kind: Some(kind),
            changed: None,
        }
    }

    fn asserts_changed(&self) -> bool {
        self.changed == Some(true)
    }
}

/// Everything known about one forest path.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Item {
    /// Normalized forest-relative path
    pub path: String,
    /// Unknown until a backend reports the entry
    pub kind: Option<EntryKind>,
    pub changed: bool,
    /// Registry prefix of the owning repository
    pub owner: String,
    /// Path relative to the owning repository's root
    pub repo_path: String,
}

impl Item {
    fn resolve(path: &str, registry: &Registry) -> Self {
        let resolution = registry.resolve(path);
        Self {
            path: path.to_string(),
            kind: None,
            changed: false,
            owner: resolution.prefix.to_string(),
            repo_path: resolution.repo_path.to_string(),
        }
    }

    fn merge(&mut self, facts: &Facts) {
        if let Some(kind) = facts.kind {
            self.kind = Some(kind);
        }
        if facts.asserts_changed() {
            self.changed = true;
        }
    }

    fn is_changed_directory(&self) -> bool {
        self.changed && self.kind == Some(EntryKind::Directory)
    }
}

/// Path-indexed table of items for one snapshot run.
#[derive(Debug)]
pub struct Dirstate<'r> {
    registry: &'r Registry,
    items: HashMap<String, Item>,
}

impl<'r> Dirstate<'r> {
    /// Create a dirstate holding only the forest root, which is always a
    /// changed directory.
    pub fn new(registry: &'r Registry) -> Self {
        let mut root = Item::resolve("", registry);
        root.kind = Some(EntryKind::Directory);
        root.changed = true;

        let mut items = HashMap::new();
        items.insert(String::new(), root);
        Self { registry, items }
    }

    /// Merge `facts` into the item at `path` and propagate to its ancestors.
    ///
    /// Propagation stops below the first ancestor that is already a changed
    /// directory. Stopping only at changed *directories* stores the same
    /// `changed` flags as stopping at any changed ancestor: the one extra
    /// step types a changed ancestor whose kind is still unknown as a
    /// directory, which it must be since it has a child.
    pub fn store_item(&mut self, path: &str, facts: Facts) {
        let registry = self.registry;
        let mut current = path.to_string();
        let mut facts = facts;

        loop {
            self.items
                .entry(current.clone())
                .or_insert_with(|| Item::resolve(&current, registry))
                .merge(&facts);

            if current.is_empty() {
                return;
            }

            let parent = path::parent(&current).to_string();
            let settled = self
                .items
                .get(&parent)
                .is_some_and(Item::is_changed_directory);
            if settled {
                return;
            }

            facts = Facts {
                kind: Some(EntryKind::Directory),
                changed: facts.changed,
            };
            current = parent;
        }
    }

    /// Whether `path` differs from the baseline.
    ///
    /// A path that was never observed is identical to the baseline.
    pub fn is_changed(&self, path: &str) -> bool {
        self.items.get(path).is_some_and(|item| item.changed)
    }

    pub fn get(&self, path: &str) -> Option<&Item> {
        self.items.get(path)
    }

    pub fn registry(&self) -> &'r Registry {
        self.registry
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Item> {
        self.items.values()
    }

    /// Items ordered so that every ancestor precedes its descendants.
    ///
    /// Ties at the same depth are broken by path for a stable order.
    pub fn items_by_depth(&self) -> Vec<&Item> {
        let mut items: Vec<&Item> = self.items.values().collect();
        items.sort_by(|a, b| {
            path::depth(&a.path)
                .cmp(&path::depth(&b.path))
                .then_with(|| a.path.cmp(&b.path))
        });
        items
    }
}
