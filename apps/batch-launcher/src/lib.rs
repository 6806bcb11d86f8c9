// Allow unwrap/expect in tests - tests should panic on unexpected errors
// Allow test-specific patterns and pedantic lints in test code
#![cfg_attr(
    test,
    allow(
        clippy::unwrap_used,
        clippy::expect_used,
        clippy::float_cmp,
        clippy::significant_drop_tightening,
        clippy::too_many_lines,
        clippy::needless_collect,
        clippy::items_after_statements
    )
)]

//! Batch Launcher - Parameter Sweeps over an External Backtest Engine
//!
//! Expands a declarative sweep (date windows × strategy variants × symbols ×
//! bar resolutions × parameter grid) into independent work items and runs one
//! external worker process per item with bounded parallelism.
//!
//! # Modules
//!
//! - **sweep**: Ranges, grid, date windows and expansion into work items
//! - **dispatch**: Shuffled, bounded-concurrency worker launching
//! - **codec**: Command-line argument encoding for the worker hand-off
//! - **gate**: Named cross-process locks and the shared engine configuration
//! - **instance**: Worker-side argument decoding
//! - **config**: Sweep files, data-date tables and process settings
//! - **telemetry**: Logging setup

#![forbid(unsafe_code)]
#![warn(missing_docs)]
#![warn(clippy::pedantic)]

/// Command-line argument codec.
pub mod codec;

/// Configuration loading.
pub mod config;

/// Worker dispatch.
pub mod dispatch;

/// Named locks and guarded configuration.
pub mod gate;

/// Worker-side instance context.
pub mod instance;

/// Sweep enumeration.
pub mod sweep;

/// Logging setup.
pub mod telemetry;

// =============================================================================
// Re-exports
// =============================================================================

pub use codec::{decode_arg_text, encode_arg_text};
pub use config::{ConfigError, LauncherSettings, WorkerSettings, load_earliest_dates, load_sweep_spec};
pub use dispatch::{
    ApiCredentials, DispatchError, DispatchSummary, Dispatcher, ProcessLauncher, WorkerContext,
    WorkerLauncher, dispatch,
};
pub use gate::{ConfigGate, GateError, MutexGate, RetryPolicy};
pub use instance::{InstanceContext, InstanceError};
pub use sweep::{ParameterGrid, ParameterState, SweepError, SweepExpander, SweepSpec, WorkItem};
