//! Fixed-delay retry for guarded actions.

use std::io;
use std::thread;
use std::time::Duration;

use tracing::debug;

use super::error::GateError;

/// Default pause between attempts.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_millis(100);

/// Windows `ERROR_SHARING_VIOLATION`.
const ERROR_SHARING_VIOLATION: i32 = 32;

/// Windows `ERROR_LOCK_VIOLATION`.
const ERROR_LOCK_VIOLATION: i32 = 33;

/// Retry policy for actions run under a lock.
///
/// Only transient I/O contention is retried; see [`is_transient`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Pause between attempts.
    pub delay: Duration,
    /// Maximum number of attempts (0 = unlimited).
    pub max_attempts: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            delay: DEFAULT_RETRY_DELAY,
            max_attempts: 0, // Unlimited
        }
    }
}

impl RetryPolicy {
    /// Create a policy with custom values.
    #[must_use]
    pub const fn new(delay: Duration, max_attempts: u32) -> Self {
        Self {
            delay,
            max_attempts,
        }
    }

    /// Check whether another attempt is allowed after `attempts` tries.
    #[must_use]
    pub const fn should_retry(&self, attempts: u32) -> bool {
        self.max_attempts == 0 || attempts < self.max_attempts
    }

    /// Run `action` until it succeeds or fails with a non-transient error.
    ///
    /// # Errors
    ///
    /// [`GateError::Action`] for a non-transient failure,
    /// [`GateError::RetriesExhausted`] when a capped policy runs out.
    pub fn run<T, F>(&self, mut action: F) -> Result<T, GateError>
    where
        F: FnMut() -> io::Result<T>,
    {
        let mut attempts: u32 = 0;
        loop {
            attempts = attempts.saturating_add(1);
            match action() {
                Ok(value) => return Ok(value),
                Err(e) if !is_transient(&e) => return Err(GateError::Action(e)),
                Err(e) if !self.should_retry(attempts) => {
                    return Err(GateError::RetriesExhausted {
                        attempts,
                        source: e,
                    });
                }
                Err(e) => {
                    debug!(attempts, error = %e, "Transient I/O contention, retrying");
                    thread::sleep(self.delay);
                }
            }
        }
    }
}

/// Whether an I/O error indicates short-lived contention worth retrying.
#[must_use]
pub fn is_transient(error: &io::Error) -> bool {
    matches!(
        error.kind(),
        io::ErrorKind::WouldBlock
            | io::ErrorKind::Interrupted
            | io::ErrorKind::ResourceBusy
            | io::ErrorKind::TimedOut
    ) || matches!(
        error.raw_os_error(),
        Some(ERROR_SHARING_VIOLATION | ERROR_LOCK_VIOLATION) if cfg!(windows)
    )
}
