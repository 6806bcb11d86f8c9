//! Sweep enumeration.
//!
//! Turns a declarative [`SweepSpec`] into the flat list of [`WorkItem`]s:
//!
//! - `range`: stepped and product value ranges
//! - `grid`: cartesian product of named ranges
//! - `dates`: calendar-month window starts
//! - `expander`: crosses windows, variants, symbols, resolutions and
//!   parameter combinations
//!
//! Enumeration is single-threaded and completes before anything is
//! dispatched.
//!
//! # Example
//!
//! ```ignore
//! use batch_launcher::config::{load_earliest_dates, load_sweep_spec};
//! use batch_launcher::sweep::SweepExpander;
//!
//! let spec = load_sweep_spec("batch.config.json")?;
//! let earliest_by_symbol = load_earliest_dates("data-start-date-by-symbol.json")?;
//! let items = SweepExpander::new(&spec).expand(&earliest_by_symbol)?;
//! println!("{} backtests", items.len());
//! ```

mod dates;
mod error;
mod expander;
mod grid;
mod range;
mod types;

pub use dates::{add_months, parse_date, windows, windows_until};
pub use error::SweepError;
pub use expander::{DEFAULT_VARIANT, PLACEHOLDER_PARAMETER, SweepExpander, expand};
pub use grid::{ParameterGrid, ParameterGridBuilder};
pub use range::{
    DEFAULT_FACTOR, DEFAULT_STEP, MAX_RANGE_VALUES, RangeError, RangeSpec, product, stepped,
};
pub use types::{ParameterState, SweepSpec, WorkItem};
