//! Bounded-parallelism worker dispatcher using Rayon.

use std::path::Path;
use std::time::Instant;

use rand::Rng;
use rand::seq::SliceRandom;
use rayon::prelude::*;
use tracing::{debug, error, info, info_span, warn};

use crate::sweep::WorkItem;

use super::error::DispatchError;
use super::launcher::{ProcessLauncher, WorkerContext, WorkerLauncher};
use super::progress::ProgressTracker;
use super::result::{DispatchSummary, ItemOutcome, ItemStatus};

/// Runs one worker per work item with at most `parallelism` alive at once.
///
/// Each pool thread blocks on its current worker and picks up the next item
/// as soon as it exits, so the cap is kept saturated until the queue drains.
#[derive(Debug)]
pub struct Dispatcher<L> {
    launcher: L,
    context: WorkerContext,
    parallelism: usize,
}

impl<L: WorkerLauncher> Dispatcher<L> {
    /// Create a new dispatcher.
    #[must_use]
    pub const fn new(launcher: L, context: WorkerContext, parallelism: usize) -> Self {
        Self {
            launcher,
            context,
            parallelism,
        }
    }

    /// Configured concurrency cap.
    #[must_use]
    pub const fn parallelism(&self) -> usize {
        self.parallelism
    }

    /// Number of pool threads used for `item_count` items.
    #[must_use]
    pub fn effective_thread_count(&self, item_count: usize) -> usize {
        self.parallelism.min(item_count)
    }

    /// Shuffle the items and run them all, blocking until every worker exits.
    ///
    /// Worker exit codes are recorded but never retried. A launch failure is
    /// logged and counted without affecting the remaining items.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::InvalidParallelism`] for a zero cap and
    /// [`DispatchError::ThreadPool`] if the pool cannot be built. Per-item
    /// failures are reported in the summary instead.
    #[allow(clippy::cast_possible_truncation)]
    pub fn run<R: Rng + ?Sized>(
        &self,
        mut items: Vec<WorkItem>,
        rng: &mut R,
    ) -> Result<DispatchSummary, DispatchError> {
        if self.parallelism == 0 {
            return Err(DispatchError::InvalidParallelism);
        }

        if items.is_empty() {
            info!("No work items to dispatch");
            return Ok(DispatchSummary::default());
        }

        items.shuffle(rng);

        let threads = self.effective_thread_count(items.len());
        let pool = rayon::ThreadPoolBuilder::new()
            .num_threads(threads)
            .thread_name(|i| format!("batch-dispatch-{i}"))
            .build()
            .map_err(|e| DispatchError::ThreadPool {
                message: e.to_string(),
            })?;

        let tracker = ProgressTracker::new(items.len() as u64);
        let start_time = Instant::now();

        info!(
            threads,
            items = items.len(),
            "Launching {} workers at a time, {} backtests in total",
            threads,
            items.len()
        );

        let outcomes: Vec<ItemOutcome> = pool.install(|| {
            items
                .par_iter()
                .with_max_len(1)
                .map(|item| {
                    let outcome = self.execute_item(item);
                    tracker.item_completed(&outcome.status);

                    let progress = tracker.progress();
                    debug!(
                        "Progress: {:.1}% ({}/{}) - ETA: {}s",
                        progress.percentage(),
                        progress.completed,
                        progress.total,
                        progress.eta_secs
                    );

                    outcome
                })
                .collect()
        });

        let elapsed = start_time.elapsed();
        let final_progress = tracker.progress();
        let items_succeeded =
            final_progress.completed - final_progress.launch_failures - final_progress.non_zero_exits;

        info!(
            succeeded = items_succeeded,
            non_zero_exits = final_progress.non_zero_exits,
            launch_failures = final_progress.launch_failures,
            "Dispatch complete: {}/{} succeeded in {:.2}s",
            items_succeeded,
            final_progress.total,
            elapsed.as_secs_f64()
        );

        Ok(DispatchSummary {
            outcomes,
            total_time_ms: elapsed.as_millis() as u64,
            items_dispatched: final_progress.total,
            items_succeeded,
            non_zero_exits: final_progress.non_zero_exits,
            launch_failures: final_progress.launch_failures,
        })
    }

    #[allow(clippy::cast_possible_truncation)]
    fn execute_item(&self, item: &WorkItem) -> ItemOutcome {
        let label = item.label();
        let _span = info_span!("work_item", item = %label).entered();

        let tokens = self.context.tokens(item);
        let start = Instant::now();

        let status = match self.launcher.run(&tokens) {
            Ok(exit) => {
                if exit.success() {
                    debug!("Worker finished");
                } else {
                    warn!(code = ?exit.code, "Worker exited with non-zero status");
                }
                ItemStatus::from(exit)
            }
            Err(e) => {
                error!(error = %e, "Worker launch failed");
                ItemStatus::LaunchFailed {
                    message: e.to_string(),
                }
            }
        };

        ItemOutcome {
            label,
            status,
            execution_time_ms: start.elapsed().as_millis() as u64,
        }
    }
}

/// Dispatch items to worker processes at `worker_path`.
///
/// # Errors
///
/// See [`Dispatcher::run`].
pub fn dispatch<R: Rng + ?Sized>(
    items: Vec<WorkItem>,
    worker_path: &Path,
    context: WorkerContext,
    parallelism: usize,
    rng: &mut R,
) -> Result<DispatchSummary, DispatchError> {
    Dispatcher::new(ProcessLauncher::new(worker_path), context, parallelism).run(items, rng)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use chrono::NaiveDate;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    use super::*;
    use crate::dispatch::launcher::{ApiCredentials, WorkerExit};

    /// Launcher that records calls and tracks how many run at once.
    struct FakeLauncher {
        live: AtomicUsize,
        max_live: AtomicUsize,
        calls: Mutex<Vec<Vec<String>>>,
        delay: Duration,
        exit_code: i32,
        fail_symbol: Option<String>,
    }

    impl FakeLauncher {
        fn new(delay: Duration) -> Self {
            Self {
                live: AtomicUsize::new(0),
                max_live: AtomicUsize::new(0),
                calls: Mutex::new(Vec::new()),
                delay,
                exit_code: 0,
                fail_symbol: None,
            }
        }

        fn max_live(&self) -> usize {
            self.max_live.load(Ordering::SeqCst)
        }

        fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    impl WorkerLauncher for FakeLauncher {
        fn run(&self, tokens: &[String]) -> Result<WorkerExit, DispatchError> {
            self.calls.lock().unwrap().push(tokens.to_vec());

            if self.fail_symbol.as_deref() == Some(tokens[6].as_str()) {
                return Err(DispatchError::WorkerLaunch {
                    path: "fake".to_string(),
                    message: "no such file".to_string(),
                });
            }

            let now = self.live.fetch_add(1, Ordering::SeqCst) + 1;
            self.max_live.fetch_max(now, Ordering::SeqCst);
            std::thread::sleep(self.delay);
            self.live.fetch_sub(1, Ordering::SeqCst);

            Ok(WorkerExit::with_code(self.exit_code))
        }
    }

    fn context() -> WorkerContext {
        WorkerContext::new(
            "/opt/lean".to_string(),
            ApiCredentials::new("1".to_string(), "token".to_string()),
        )
    }

    fn items(n: usize) -> Vec<WorkItem> {
        (0..n)
            .map(|i| WorkItem {
                start_date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
                end_date: NaiveDate::from_ymd_opt(2020, 4, 1).unwrap(),
                variant_name: "ALL".to_string(),
                symbol: format!("S{i}"),
                resolution: 1,
                parameters: BTreeMap::new(),
                serialized_parameters: "{}".to_string(),
            })
            .collect()
    }

    #[test]
    fn test_dispatch_never_exceeds_parallelism() {
        let dispatcher = Dispatcher::new(FakeLauncher::new(Duration::from_millis(20)), context(), 4);
        let mut rng = StdRng::seed_from_u64(1);

        let summary = dispatcher.run(items(24), &mut rng).unwrap();

        assert!(dispatcher.launcher.max_live() <= 4);
        assert!(dispatcher.launcher.max_live() >= 2);
        assert_eq!(dispatcher.launcher.call_count(), 24);
        assert_eq!(summary.items_dispatched, 24);
        assert_eq!(summary.items_succeeded, 24);
        assert_eq!(summary.outcomes.len(), 24);
    }

    #[test]
    fn test_dispatch_parallelism_above_item_count() {
        let dispatcher =
            Dispatcher::new(FakeLauncher::new(Duration::from_millis(10)), context(), 16);
        let mut rng = StdRng::seed_from_u64(2);

        assert_eq!(dispatcher.effective_thread_count(3), 3);
        let summary = dispatcher.run(items(3), &mut rng).unwrap();

        assert!(dispatcher.launcher.max_live() <= 3);
        assert_eq!(summary.items_succeeded, 3);
    }

    #[test]
    fn test_dispatch_launch_failure_is_isolated() {
        let mut launcher = FakeLauncher::new(Duration::from_millis(1));
        launcher.fail_symbol = Some("S3".to_string());
        let dispatcher = Dispatcher::new(launcher, context(), 2);
        let mut rng = StdRng::seed_from_u64(3);

        let summary = dispatcher.run(items(8), &mut rng).unwrap();

        assert_eq!(dispatcher.launcher.call_count(), 8);
        assert_eq!(summary.launch_failures, 1);
        assert_eq!(summary.items_succeeded, 7);
        assert_eq!(summary.failed_outcomes().len(), 1);
        assert!(summary.failed_outcomes()[0].label.contains("/S3/"));
    }

    #[test]
    fn test_dispatch_counts_non_zero_exits() {
        let mut launcher = FakeLauncher::new(Duration::ZERO);
        launcher.exit_code = 2;
        let dispatcher = Dispatcher::new(launcher, context(), 3);
        let mut rng = StdRng::seed_from_u64(4);

        let summary = dispatcher.run(items(5), &mut rng).unwrap();

        assert_eq!(summary.non_zero_exits, 5);
        assert_eq!(summary.items_succeeded, 0);
        assert!(
            summary
                .outcomes
                .iter()
                .all(|o| o.status == ItemStatus::NonZeroExit { code: Some(2) })
        );
    }

    #[test]
    fn test_dispatch_rejects_zero_parallelism() {
        let dispatcher = Dispatcher::new(FakeLauncher::new(Duration::ZERO), context(), 0);
        let mut rng = StdRng::seed_from_u64(5);

        let result = dispatcher.run(items(2), &mut rng);

        assert_eq!(result.unwrap_err(), DispatchError::InvalidParallelism);
        assert_eq!(dispatcher.launcher.call_count(), 0);
    }

    #[test]
    fn test_dispatch_empty_items() {
        let dispatcher = Dispatcher::new(FakeLauncher::new(Duration::ZERO), context(), 4);
        let mut rng = StdRng::seed_from_u64(6);

        let summary = dispatcher.run(Vec::new(), &mut rng).unwrap();

        assert_eq!(summary.items_dispatched, 0);
        assert_eq!(dispatcher.launcher.call_count(), 0);
    }

    #[test]
    fn test_dispatch_order_follows_seed() {
        let labels = |seed: u64| -> Vec<String> {
            let dispatcher = Dispatcher::new(FakeLauncher::new(Duration::ZERO), context(), 4);
            let mut rng = StdRng::seed_from_u64(seed);
            dispatcher
                .run(items(12), &mut rng)
                .unwrap()
                .outcomes
                .into_iter()
                .map(|o| o.label)
                .collect()
        };

        let first = labels(42);
        assert_eq!(first, labels(42));

        let mut sorted = first.clone();
        sorted.sort();
        let mut expected: Vec<String> = items(12).iter().map(WorkItem::label).collect();
        expected.sort();
        assert_eq!(sorted, expected);
    }
}
