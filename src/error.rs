//! # Error Handling
//!
//! This module defines the centralized error type for `repo-overlay`. It uses
//! the `thiserror` library to create a single `Error` enum that covers every
//! failure mode of a snapshot run, with enough context in each variant to
//! tell which repository or path was involved.
//!
//! ## Key Components
//!
//! - **`Error`**: The main enum. Each variant corresponds to one kind of
//!   failure and carries named context fields.
//!
//! - **`Result<T>`**: A type alias for `std::result::Result<T, Error>`, used
//!   throughout the library.
//!
//! Not every error ends a run. Per-repository failures are folded into a
//! [`crate::backend::RepoStatus`] by the backends, and only
//! [`Error::is_fatal`] errors abort the whole snapshot.

use thiserror::Error;

/// Main error type for repo-overlay operations
#[derive(Error, Debug)]
pub enum Error {
    /// A `git` invocation failed or could not be started.
    #[error("Git command failed in {path}: {command} - {stderr}")]
    GitCommand {
        command: String,
        path: String,
        stderr: String,
    },

    /// A tree or directory entry had a type that is neither a directory, a
    /// regular file nor a symlink.
    ///
    /// The dirstate cannot reason about such entries, so this error is fatal
    /// for the run.
    #[error("Unknown entry kind at {path}: mode {mode}")]
    UnknownEntryKind { path: String, mode: String },

    /// A line of the manifest listing could not be parsed.
    #[error("Manifest parsing error at line {line}: {message}")]
    ManifestParse { line: usize, message: String },

    /// The run configuration is invalid.
    #[error("Configuration error: {message}")]
    Config { message: String },

    /// An output filesystem operation failed.
    #[error("Filesystem operation error: {message}")]
    Filesystem { message: String },

    /// A forest path could not be handled.
    #[error("Path operation error: {message}")]
    Path { message: String },

    /// The output directory already has content and `force` was not set.
    #[error("Output directory is not empty: {path}")]
    OutputNotEmpty { path: String },

    /// The bounded worker pool could not be created.
    #[error("Worker pool error: {message}")]
    WorkerPool { message: String },

    /// A version record could not be written or parsed.
    #[error("Version record error: {message}")]
    VersionRecord { message: String },

    /// An I/O error, wrapped from `std::io::Error`.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// A YAML parsing error, wrapped from `serde_yaml::Error`.
    #[error("YAML parsing error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

impl Error {
    /// Whether this error must abort the whole run instead of degrading the
    /// repository that produced it.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Error::UnknownEntryKind { .. } | Error::WorkerPool { .. })
    }
}

/// A convenient type alias for `Result<T, Error>`.
pub type Result<T> = std::result::Result<T, Error>;
