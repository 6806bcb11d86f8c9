//! System-wide named locks backed by advisory file locks.

use std::fs::{self, File, OpenOptions};
use std::io::{self, Write};
use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use super::error::GateError;
use super::retry::RetryPolicy;

/// Directory under the OS temp dir holding lock files by default.
pub const DEFAULT_LOCK_DIR_NAME: &str = "batch-launcher-locks";

/// Extension of lock files.
const LOCK_FILE_EXTENSION: &str = "lock";

/// Runs actions under a lock shared by every process on the machine.
///
/// A lock named `x` is an exclusive advisory lock on `<lock_dir>/x.lock`.
/// Every acquisition opens its own handle, so threads of one process
/// exclude each other exactly like separate processes do. The kernel drops
/// the lock when its holder exits, so a crashed holder never blocks waiters.
#[derive(Debug, Clone)]
pub struct MutexGate {
    lock_dir: PathBuf,
    retry: RetryPolicy,
}

impl Default for MutexGate {
    fn default() -> Self {
        Self::new(std::env::temp_dir().join(DEFAULT_LOCK_DIR_NAME))
    }
}

impl MutexGate {
    /// Create a gate keeping its lock files in `lock_dir`.
    #[must_use]
    pub fn new(lock_dir: impl Into<PathBuf>) -> Self {
        Self {
            lock_dir: lock_dir.into(),
            retry: RetryPolicy::default(),
        }
    }

    /// Replace the retry policy applied to guarded actions.
    #[must_use]
    pub const fn with_retry(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Directory holding the lock files.
    #[must_use]
    pub fn lock_dir(&self) -> &Path {
        &self.lock_dir
    }

    /// Lock file path for `name`.
    ///
    /// # Errors
    ///
    /// Returns [`GateError::InvalidName`] if `name` has no usable characters.
    pub fn lock_path(&self, name: &str) -> Result<PathBuf, GateError> {
        let sanitized: String = name
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.') {
                    c
                } else {
                    '_'
                }
            })
            .collect();

        if sanitized.trim_matches(|c| c == '_' || c == '.').is_empty() {
            return Err(GateError::InvalidName {
                name: name.to_string(),
            });
        }

        Ok(self
            .lock_dir
            .join(format!("{sanitized}.{LOCK_FILE_EXTENSION}")))
    }

    /// Run `action` while holding the lock `name`.
    ///
    /// Waits without limit for the lock. The action is retried with a fixed
    /// pause on transient I/O contention, and the lock is released on every
    /// exit path, including a panic inside `action`.
    ///
    /// # Errors
    ///
    /// Any [`GateError`]: lock setup failures, or the action's own failure.
    pub fn with_lock<T, F>(&self, name: &str, action: F) -> Result<T, GateError>
    where
        F: FnMut() -> io::Result<T>,
    {
        let _guard = self.acquire(name)?;
        self.retry.run(action)
    }

    /// Write `contents` to `path` under a lock named after the file stem.
    ///
    /// Overwrites the file, or appends when `append` is set.
    ///
    /// # Errors
    ///
    /// See [`MutexGate::with_lock`].
    pub fn write_file(&self, path: &Path, contents: &str, append: bool) -> Result<(), GateError> {
        let name = path
            .file_stem()
            .map(|stem| stem.to_string_lossy().into_owned())
            .unwrap_or_default();

        self.with_lock(&name, || {
            if append {
                let mut file = OpenOptions::new().create(true).append(true).open(path)?;
                file.write_all(contents.as_bytes())
            } else {
                fs::write(path, contents)
            }
        })
    }

    fn acquire(&self, name: &str) -> Result<LockGuard, GateError> {
        let path = self.lock_path(name)?;
        let lock_file_error = |source| GateError::LockFile {
            path: path.display().to_string(),
            source,
        };

        fs::create_dir_all(&self.lock_dir).map_err(lock_file_error)?;
        let file = OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(&path)
            .map_err(lock_file_error)?;

        debug!(lock = name, "Waiting for lock");
        file.lock().map_err(|source| GateError::Acquire {
            name: name.to_string(),
            source,
        })?;
        debug!(lock = name, "Lock acquired");

        Ok(LockGuard {
            file,
            name: name.to_string(),
        })
    }
}

/// Held lock; released on drop.
#[derive(Debug)]
struct LockGuard {
    file: File,
    name: String,
}

impl Drop for LockGuard {
    fn drop(&mut self) {
        if let Err(e) = self.file.unlock() {
            warn!(lock = %self.name, error = %e, "Failed to release lock");
        } else {
            debug!(lock = %self.name, "Lock released");
        }
    }
}
