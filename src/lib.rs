//! # Repo Overlay Library
//!
//! This library builds point-in-time snapshots of a *forest*: a directory
//! tree holding many git checkouts at nested paths, as managed by the `repo`
//! tool. A snapshot is cheap on disk. Only the entries that differ from
//! what is committed are materialized; everything else becomes a relative
//! symlink into the repository's master checkout.
//!
//! ## Quick Example
//!
//! ```
//! use repo_overlay::manifest;
//!
//! let listing = "\
//! build/make : platform/build : https://example.com/platform/build
//! external/zlib : platform/external/zlib : https://example.com/zlib
//! ";
//! let entries = manifest::parse_listing(listing).unwrap();
//! assert_eq!(entries.len(), 2);
//! assert_eq!(entries[1].prefix, "external/zlib");
//! ```
//!
//! ## Core Concepts
//!
//! - **Registry (`registry`)**: Maps forest path prefixes to repository
//!   backends and resolves any path to its owning repository by longest
//!   prefix. A synthetic root repository owns everything else.
//! - **Backends (`backend`)**: One per repository. A backend reports which
//!   of its paths changed, lists the entries below changed directories, and
//!   materializes file content. Historical backends read from git objects,
//!   working-tree backends from the live checkout.
//! - **Dirstate (`dirstate`)**: The table of facts known about each path.
//!   Storing a changed path marks all of its ancestors as changed
//!   directories.
//! - **Phases (`phases`)**: The pipeline that runs the backends in parallel
//!   and writes the output tree.
//!
//! ## Execution Flow
//!
//! The main entry point is [`phases::orchestrator::execute_snapshot`]:
//!
//! 1.  **Changes**: Every backend reports its changed paths.
//! 2.  **Listing**: Every backend lists the entries of its changed
//!     directories.
//! 3.  **Materialization**: Changed items are written, unchanged items
//!     become links into the master checkouts.
//! 4.  **Version records**: The commit of each repository is recorded in the
//!     output.
//!
//! A repository whose git queries fail does not stop the run. It is
//! reported as a warning, and its root is treated as changed so that no
//! stale content is linked in its place.

pub mod backend;
pub mod config;
pub mod defaults;
pub mod dirstate;
pub mod error;
pub mod filesystem;
pub mod git;
pub mod manifest;
pub mod output;
pub mod path;
pub mod phases;
pub mod registry;
pub mod repository;
pub mod versions;

#[cfg(test)]
mod path_proptest;
#[cfg(test)]
mod test_support;
