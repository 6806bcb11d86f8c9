//! Result types for worker dispatch.


use super::launcher::WorkerExit;

/// How one work item ended.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ItemStatus {
    /// Worker exited with code zero.
    Succeeded,
    /// Worker exited with a non-zero code, or was killed by a signal.
    NonZeroExit {
        /// Exit code, if any.
        code: Option<i32>,
    },
    /// Worker could not be started.
    LaunchFailed {
        /// Error message.
        message: String,
    },
}

impl From<WorkerExit> for ItemStatus {
    fn from(exit: WorkerExit) -> Self {
        if exit.success() {
            Self::Succeeded
        } else {
            Self::NonZeroExit { code: exit.code }
        }
    }
}

/// Outcome of one dispatched work item.
#[derive(Debug, Clone)]
pub struct ItemOutcome {
    /// Work item label.
    pub label: String,
    /// How the item ended.
    pub status: ItemStatus,
    /// Wall time from launch to exit in milliseconds.
    pub execution_time_ms: u64,
}

/// Result of a dispatch run.
#[derive(Debug, Clone, Default)]
pub struct DispatchSummary {
    /// Per-item outcomes, in shuffled dispatch order.
    pub outcomes: Vec<ItemOutcome>,

    /// Total wall time in milliseconds.
    pub total_time_ms: u64,

    /// Number of items dispatched.
    pub items_dispatched: u64,

    /// Workers that exited with code zero.
    pub items_succeeded: u64,

    /// Workers that exited with a non-zero code.
    pub non_zero_exits: u64,

    /// Workers that could not be started.
    pub launch_failures: u64,
}

impl DispatchSummary {
    /// Get the success rate.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn success_rate(&self) -> f64 {
        if self.items_dispatched == 0 {
            0.0
        } else {
            self.items_succeeded as f64 / self.items_dispatched as f64
        }
    }

    /// Total wall time in minutes.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn total_minutes(&self) -> f64 {
        self.total_time_ms as f64 / 1000.0 / 60.0
    }

    /// Average wall time per dispatched item in minutes.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn minutes_per_item(&self) -> f64 {
        if self.items_dispatched == 0 {
            0.0
        } else {
            self.total_minutes() / self.items_dispatched as f64
        }
    }

    /// Outcomes that did not succeed.
    #[must_use]
    pub fn failed_outcomes(&self) -> Vec<&ItemOutcome> {
        self.outcomes
            .iter()
            .filter(|o| o.status != ItemStatus::Succeeded)
            .collect()
    }
}
