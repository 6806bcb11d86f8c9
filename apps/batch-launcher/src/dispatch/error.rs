//! Error types for worker dispatch.

use thiserror::Error;

/// Errors from dispatching work items to worker processes.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum DispatchError {
    /// Thread pool initialization failed.
    #[error("Failed to initialize thread pool: {message}")]
    ThreadPool {
        /// Error message.
        message: String,
    },

    /// Worker process could not be started.
    ///
    /// Fatal to one item only; siblings keep running.
    #[error("Failed to launch worker '{path}': {message}")]
    WorkerLaunch {
        /// Worker executable path.
        path: String,
        /// Error message.
        message: String,
    },

    /// Concurrency cap must be at least one.
    #[error("Parallelism must be at least 1")]
    InvalidParallelism,
}
