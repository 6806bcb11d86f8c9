//! Progress tracking for worker dispatch.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;


use super::result::ItemStatus;

/// Progress tracker shared by the dispatch pool threads.
#[derive(Debug)]
pub struct ProgressTracker {
    total_items: u64,
    completed_items: AtomicU64,
    launch_failures: AtomicU64,
    non_zero_exits: AtomicU64,
    start_time: Instant,
}

impl ProgressTracker {
    /// Create a new progress tracker.
    #[must_use]
    pub fn new(total_items: u64) -> Self {
        Self {
            total_items,
            completed_items: AtomicU64::new(0),
            launch_failures: AtomicU64::new(0),
            non_zero_exits: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    /// Record a finished item.
    pub fn item_completed(&self, status: &ItemStatus) {
        self.completed_items.fetch_add(1, Ordering::Relaxed);
        match status {
            ItemStatus::Succeeded => {}
            ItemStatus::NonZeroExit { .. } => {
                self.non_zero_exits.fetch_add(1, Ordering::Relaxed);
            }
            ItemStatus::LaunchFailed { .. } => {
                self.launch_failures.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    /// Get current progress.
    #[must_use]
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    pub fn progress(&self) -> Progress {
        let completed = self.completed_items.load(Ordering::Relaxed);
        let launch_failures = self.launch_failures.load(Ordering::Relaxed);
        let non_zero_exits = self.non_zero_exits.load(Ordering::Relaxed);
        let elapsed = self.start_time.elapsed();

        let items_per_sec = if elapsed.as_secs_f64() > 0.0 {
            completed as f64 / elapsed.as_secs_f64()
        } else {
            0.0
        };

        let remaining = self.total_items.saturating_sub(completed);
        let eta_secs = if items_per_sec > 0.0 {
            (remaining as f64 / items_per_sec) as u64
        } else {
            0
        };

        Progress {
            total: self.total_items,
            completed,
            launch_failures,
            non_zero_exits,
            elapsed_secs: elapsed.as_secs(),
            eta_secs,
            items_per_sec,
        }
    }
}

/// Progress snapshot.
#[derive(Debug, Clone)]
pub struct Progress {
    /// Total number of items.
    pub total: u64,
    /// Items whose worker has finished or failed to launch.
    pub completed: u64,
    /// Items whose worker could not be started.
    pub launch_failures: u64,
    /// Items whose worker exited with a non-zero code.
    pub non_zero_exits: u64,
    /// Elapsed time in seconds.
    pub elapsed_secs: u64,
    /// Estimated time remaining in seconds.
    pub eta_secs: u64,
    /// Items processed per second.
    pub items_per_sec: f64,
}

impl Progress {
    /// Get completion percentage.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn percentage(&self) -> f64 {
        if self.total == 0 {
            100.0
        } else {
            (self.completed as f64 / self.total as f64) * 100.0
        }
    }
}
