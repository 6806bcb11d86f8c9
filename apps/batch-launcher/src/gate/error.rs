//! Error types for named locks and guarded file access.

use std::io;

use thiserror::Error;

/// Errors from [`MutexGate`](super::MutexGate) and [`ConfigGate`](super::ConfigGate).
#[derive(Debug, Error)]
pub enum GateError {
    /// Lock name contains nothing usable for a lock file.
    #[error("Invalid lock name '{name}'")]
    InvalidName {
        /// The rejected name.
        name: String,
    },

    /// Lock file could not be created or opened.
    #[error("Failed to open lock file '{path}': {source}")]
    LockFile {
        /// Path to the lock file.
        path: String,
        /// The underlying IO error.
        source: io::Error,
    },

    /// Waiting on the lock failed.
    #[error("Failed to acquire lock '{name}': {source}")]
    Acquire {
        /// Lock name.
        name: String,
        /// The underlying IO error.
        source: io::Error,
    },

    /// Guarded action kept hitting transient errors until the retry cap.
    #[error("Guarded action failed after {attempts} attempts: {source}")]
    RetriesExhausted {
        /// Attempts made.
        attempts: u32,
        /// The last transient error.
        source: io::Error,
    },

    /// Guarded action failed with a non-transient error.
    #[error("Guarded action failed: {0}")]
    Action(#[source] io::Error),
}
