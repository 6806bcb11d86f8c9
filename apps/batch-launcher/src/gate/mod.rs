//! Cross-process mutual exclusion for shared files.
//!
//! - [`MutexGate`]: named, machine-wide locks with a transient-error retry
//!   loop around the guarded action
//! - [`ConfigGate`]: the shared engine configuration, prepared under the
//!   `"config"` lock by each worker
//!
//! # Example
//!
//! ```ignore
//! use batch_launcher::gate::MutexGate;
//!
//! let gate = MutexGate::default();
//! gate.with_lock("results", || std::fs::write("results.csv", "ok\n"))?;
//! ```

mod config_gate;
mod error;
mod mutex;
mod retry;

pub use config_gate::{CONFIG_LOCK, ConfigGate, TEMPLATE_RELATIVE_PATH, strip_line_comments};
pub use error::GateError;
pub use mutex::{DEFAULT_LOCK_DIR_NAME, MutexGate};
pub use retry::{DEFAULT_RETRY_DELAY, RetryPolicy, is_transient};
