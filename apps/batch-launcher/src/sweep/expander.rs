//! Sweep expansion into work items.

use std::collections::{BTreeMap, HashMap};

use chrono::{Local, NaiveDate};
use tracing::{debug, info};

use super::dates::{add_months, parse_date, windows_until};
use super::error::SweepError;
use super::grid::ParameterGrid;
use super::range::DEFAULT_STEP;
use super::types::{ParameterState, SweepSpec, WorkItem};

/// Variant used when the sweep declares none.
pub const DEFAULT_VARIANT: &str = "ALL";

/// Placeholder parameter used when the sweep declares none.
pub const PLACEHOLDER_PARAMETER: &str = "NA";

/// Expands a [`SweepSpec`] into the full cross product of work items.
#[derive(Debug)]
pub struct SweepExpander<'a> {
    spec: &'a SweepSpec,
    today: NaiveDate,
}

impl<'a> SweepExpander<'a> {
    /// Create an expander bounded by the current local date.
    #[must_use]
    pub fn new(spec: &'a SweepSpec) -> Self {
        Self {
            spec,
            today: Local::now().date_naive(),
        }
    }

    /// Bound window generation by a fixed date instead of today.
    #[must_use]
    pub const fn as_of(mut self, today: NaiveDate) -> Self {
        self.today = today;
        self
    }

    /// Variant names to sweep, substituting [`DEFAULT_VARIANT`] for an empty list.
    #[must_use]
    pub fn variant_names(&self) -> Vec<String> {
        if self.spec.alpha_model_names.is_empty() {
            vec![DEFAULT_VARIANT.to_string()]
        } else {
            self.spec.alpha_model_names.clone()
        }
    }

    /// Declared parameters, or the inert placeholder when there are none.
    #[must_use]
    pub fn parameters(&self) -> BTreeMap<String, ParameterState> {
        if self.spec.parameters.is_empty() {
            let mut placeholder = BTreeMap::new();
            placeholder.insert(
                PLACEHOLDER_PARAMETER.to_string(),
                ParameterState::stepped(0.0, 0.0, DEFAULT_STEP),
            );
            placeholder
        } else {
            self.spec.parameters.clone()
        }
    }

    /// Materialized parameter grid.
    pub fn grid(&self) -> Result<ParameterGrid, SweepError> {
        ParameterGrid::from_parameters(&self.parameters())
            .map_err(|(name, source)| SweepError::InvalidRange { name, source })
    }

    /// Window start dates.
    pub fn dates(&self) -> Result<Vec<NaiveDate>, SweepError> {
        let start = parse_date(&self.spec.start_date)?;
        windows_until(start, self.spec.duration, self.today)
    }

    /// Expand the sweep into work items.
    ///
    /// Items are produced in date, variant, symbol, resolution, combination
    /// order. Each start date is clamped to the symbol's earliest data date;
    /// the end date is always the unclamped window start plus the duration.
    ///
    /// # Errors
    ///
    /// Any [`SweepError`]; nothing is produced on failure.
    pub fn expand(
        &self,
        earliest_by_symbol: &HashMap<String, NaiveDate>,
    ) -> Result<Vec<WorkItem>, SweepError> {
        let variants = self.variant_names();
        let parameters = self.parameters();
        let grid = self.grid()?;
        let dates = self.dates()?;

        let earliest: Vec<NaiveDate> = self
            .spec
            .symbols
            .iter()
            .map(|symbol| {
                earliest_by_symbol
                    .get(symbol)
                    .copied()
                    .ok_or_else(|| SweepError::UnknownSymbol {
                        symbol: symbol.clone(),
                    })
            })
            .collect::<Result<_, _>>()?;

        let combinations = grid
            .iter()
            .map(|combo| snapshot(&parameters, &combo).map(|serialized| (combo, serialized)))
            .collect::<Result<Vec<_>, _>>()?;

        // Duration was validated positive by the window generator
        let duration = self.spec.duration.unsigned_abs();

        let total = dates.len()
            * variants.len()
            * self.spec.symbols.len()
            * self.spec.minute_resolutions.len()
            * combinations.len();
        let mut items = Vec::with_capacity(total);

        for &window_start in &dates {
            let end_date = add_months(window_start, duration)?;
            for variant in &variants {
                for (symbol, &first_date) in self.spec.symbols.iter().zip(&earliest) {
                    let start_date = window_start.max(first_date);
                    for &resolution in &self.spec.minute_resolutions {
                        for (combo, serialized) in &combinations {
                            items.push(WorkItem {
                                start_date,
                                end_date,
                                variant_name: variant.clone(),
                                symbol: symbol.clone(),
                                resolution,
                                parameters: combo.clone(),
                                serialized_parameters: serialized.clone(),
                            });
                        }
                    }
                }
            }
        }

        debug!(
            dates = dates.len(),
            variants = variants.len(),
            symbols = self.spec.symbols.len(),
            resolutions = self.spec.minute_resolutions.len(),
            combinations = combinations.len(),
            "Sweep axes"
        );
        info!(items = items.len(), "Expanded sweep into work items");

        Ok(items)
    }
}

/// Expand a sweep bounded by today's date.
///
/// # Errors
///
/// See [`SweepExpander::expand`].
pub fn expand(
    spec: &SweepSpec,
    earliest_by_symbol: &HashMap<String, NaiveDate>,
) -> Result<Vec<WorkItem>, SweepError> {
    SweepExpander::new(spec).expand(earliest_by_symbol)
}

/// Serialize the parameter map with `current` set from one combination.
fn snapshot(
    parameters: &BTreeMap<String, ParameterState>,
    combo: &BTreeMap<String, f64>,
) -> Result<String, SweepError> {
    let resolved: BTreeMap<&str, ParameterState> = parameters
        .iter()
        .map(|(name, param)| {
            let state = combo
                .get(name)
                .map_or_else(|| param.clone(), |value| param.with_current(*value));
            (name.as_str(), state)
        })
        .collect();

    serde_json::to_string(&resolved).map_err(|e| SweepError::Serialization {
        message: e.to_string(),
    })
}
