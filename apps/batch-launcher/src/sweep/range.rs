//! Numeric parameter ranges.
//!
//! Two progressions are supported:
//!
//! - **Stepped**: `start, start + step, start + 2·step, …` while the value does
//!   not exceed `end`.
//! - **Product**: `start, start·factor, start·factor², …` while the value does
//!   not exceed `end`.
//!
//! Both always yield at least one value: a degenerate range (`start >= end`)
//! collapses to `[start]`.

use thiserror::Error;

/// Upper bound on the number of values a single range may produce.
pub const MAX_RANGE_VALUES: usize = 1_000_000;

/// Default increment for stepped ranges.
pub const DEFAULT_STEP: f64 = 1.0;

/// Default multiplier for product ranges.
pub const DEFAULT_FACTOR: f64 = 2.0;

/// Errors raised while materializing a range.
#[derive(Debug, Error, Clone, Copy, PartialEq)]
pub enum RangeError {
    /// Stepped range with a zero increment.
    #[error("step cannot equal zero")]
    ZeroStep,

    /// Product range with a multiplier below 2.
    #[error("factor {factor} cannot be less than 2")]
    FactorTooSmall {
        /// The rejected factor.
        factor: f64,
    },

    /// Product range starting at or below zero would never reach `end`.
    #[error("product range must start above zero, got {start}")]
    NonPositiveStart {
        /// The rejected start value.
        start: f64,
    },

    /// A bound, step or factor is NaN or infinite.
    #[error("range bounds, step and factor must be finite")]
    NonFinite,

    /// The range would produce more than [`MAX_RANGE_VALUES`] values.
    #[error("range produces more than {limit} values")]
    TooManyValues {
        /// The enforced limit.
        limit: usize,
    },

    /// Neither `step` nor `factor` was declared.
    #[error("one of step or factor must be set")]
    MissingProgression,

    /// Both `step` and `factor` were declared.
    #[error("step and factor are mutually exclusive")]
    AmbiguousProgression,
}

/// A validated range description.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RangeSpec {
    /// Additive progression.
    Stepped {
        /// First value.
        start: f64,
        /// Inclusive upper bound.
        end: f64,
        /// Increment between values.
        step: f64,
    },
    /// Multiplicative progression.
    Product {
        /// First value.
        start: f64,
        /// Inclusive upper bound.
        end: f64,
        /// Multiplier between values.
        factor: f64,
    },
}

impl RangeSpec {
    /// Build a spec from optional `step` / `factor` fields, requiring exactly one.
    pub fn from_parts(
        start: f64,
        end: f64,
        step: Option<f64>,
        factor: Option<f64>,
    ) -> Result<Self, RangeError> {
        match (step, factor) {
            (Some(step), None) => Ok(Self::Stepped { start, end, step }),
            (None, Some(factor)) => Ok(Self::Product { start, end, factor }),
            (None, None) => Err(RangeError::MissingProgression),
            (Some(_), Some(_)) => Err(RangeError::AmbiguousProgression),
        }
    }

    /// Materialize the range into its ordered values.
    pub fn values(&self) -> Result<Vec<f64>, RangeError> {
        match *self {
            Self::Stepped { start, end, step } => stepped(start, end, step),
            Self::Product { start, end, factor } => product(start, end, factor),
        }
    }
}

/// Stepped range from `start` towards `end`.
///
/// The loop test runs on the accumulated value before each emission, so a
/// value landing exactly on `end` is included and nothing past it is.
///
/// # Errors
///
/// [`RangeError::ZeroStep`] when `step == 0`, [`RangeError::NonFinite`] for
/// NaN or infinite inputs, [`RangeError::TooManyValues`] past the size cap.
pub fn stepped(start: f64, end: f64, step: f64) -> Result<Vec<f64>, RangeError> {
    if step == 0.0 {
        return Err(RangeError::ZeroStep);
    }
    if !(start.is_finite() && end.is_finite() && step.is_finite()) {
        return Err(RangeError::NonFinite);
    }

    if !(start < end && step > 0.0) {
        return Ok(vec![start]);
    }

    let mut values = Vec::new();
    let mut x = start;
    while x - end <= 0.0 {
        if values.len() == MAX_RANGE_VALUES {
            return Err(RangeError::TooManyValues {
                limit: MAX_RANGE_VALUES,
            });
        }
        values.push(x);
        x += step;
    }

    Ok(values)
}

/// Product range from `start` towards `end`.
///
/// # Errors
///
/// [`RangeError::FactorTooSmall`] when `factor < 2`,
/// [`RangeError::NonPositiveStart`] when an increasing range starts at or
/// below zero, [`RangeError::NonFinite`] for NaN or infinite inputs.
pub fn product(start: f64, end: f64, factor: f64) -> Result<Vec<f64>, RangeError> {
    // NaN compares false, so check finiteness first to avoid accepting a NaN factor.
    if !(start.is_finite() && end.is_finite() && factor.is_finite()) {
        return Err(RangeError::NonFinite);
    }
    if factor < 2.0 {
        return Err(RangeError::FactorTooSmall { factor });
    }

    if start >= end {
        return Ok(vec![start]);
    }
    if start <= 0.0 {
        return Err(RangeError::NonPositiveStart { start });
    }

    let mut values = Vec::new();
    let mut x = start;
    while x <= end {
        values.push(x);
        x *= factor;
    }

    Ok(values)
}
