//! Bounded-parallelism worker dispatch.
//!
//! Every [`WorkItem`](crate::sweep::WorkItem) becomes one external worker
//! process. The dispatcher:
//! - Shuffles the items with a caller-supplied random source
//! - Keeps at most `parallelism` workers alive, backfilling as each exits
//! - Records exit codes and launch failures without retrying
//!
//! # Thread Pool
//!
//! A dedicated Rayon pool sized `min(parallelism, items)` is built per run.
//! Each pool thread blocks on one child process at a time, so the pool size
//! is the process cap.
//!
//! # Example
//!
//! ```ignore
//! use batch_launcher::dispatch::{ApiCredentials, WorkerContext, dispatch};
//!
//! let context = WorkerContext::new(
//!     spec.library_path.clone(),
//!     ApiCredentials::new(spec.api_job_user_id.clone(), spec.api_access_token.clone()),
//! );
//! let summary = dispatch(items, &worker_path, context, spec.parallel_processes, &mut rand::rng())?;
//! println!("{:.1} minutes", summary.total_minutes());
//! ```

mod error;
mod executor;
mod launcher;
mod progress;
mod result;

pub use error::DispatchError;
pub use executor::{Dispatcher, dispatch};
pub use launcher::{
    ApiCredentials, ProcessLauncher, WORKER_DATE_FORMAT, WORKER_TOKEN_COUNT, WorkerContext,
    WorkerExit, WorkerLauncher,
};
pub use progress::{Progress, ProgressTracker};
pub use result::{DispatchSummary, ItemOutcome, ItemStatus};
