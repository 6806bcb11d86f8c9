//! Parameter grid: the cartesian product of named value ranges.
//!
//! Combinations are decoded from a flat index with mixed-radix arithmetic,
//! so generation needs no recursion and any single combination can be
//! produced independently of the others.

use std::collections::BTreeMap;

use super::range::RangeError;
use super::types::ParameterState;

/// A parameter grid over named, materialized value ranges.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ParameterGrid {
    axes: Vec<(String, Vec<f64>)>,
}

impl ParameterGrid {
    /// Create a new parameter grid builder.
    #[must_use]
    pub fn builder() -> ParameterGridBuilder {
        ParameterGridBuilder::new()
    }

    /// Materialize a grid from declared parameters.
    ///
    /// Stepped parameters use [`super::range::stepped`], product parameters
    /// use [`super::range::product`].
    ///
    /// # Errors
    ///
    /// Returns the offending parameter name with its [`RangeError`].
    pub fn from_parameters(
        parameters: &BTreeMap<String, ParameterState>,
    ) -> Result<Self, (String, RangeError)> {
        let mut builder = Self::builder();
        for (name, param) in parameters {
            let values = param
                .range_spec()
                .and_then(|spec| spec.values())
                .map_err(|e| (name.clone(), e))?;
            builder = builder.add_param(name, values);
        }
        Ok(builder.build())
    }

    /// Number of named axes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.axes.len()
    }

    /// Check if the grid has no axes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.axes.is_empty()
    }

    /// Values of one axis.
    #[must_use]
    pub fn values(&self, name: &str) -> Option<&[f64]> {
        self.axes
            .iter()
            .find(|(axis, _)| axis == name)
            .map(|(_, values)| values.as_slice())
    }

    /// Get the total number of parameter combinations.
    ///
    /// An empty grid has no combinations.
    #[must_use]
    pub fn total_combinations(&self) -> usize {
        if self.axes.is_empty() {
            return 0;
        }
        self.axes
            .iter()
            .map(|(_, values)| values.len())
            .try_fold(1usize, usize::checked_mul)
            .unwrap_or(usize::MAX)
    }

    /// Decode one combination from its flat index.
    ///
    /// The first axis varies fastest. Returns `None` when `index` is out of range.
    #[must_use]
    pub fn combination(&self, index: usize) -> Option<BTreeMap<String, f64>> {
        if index >= self.total_combinations() {
            return None;
        }

        let mut remainder = index;
        let mut combo = BTreeMap::new();
        for (name, values) in &self.axes {
            let radix = values.len();
            combo.insert(name.clone(), values[remainder % radix]);
            remainder /= radix;
        }
        Some(combo)
    }

    /// Iterate over all combinations.
    pub fn iter(&self) -> impl Iterator<Item = BTreeMap<String, f64>> + '_ {
        (0..self.total_combinations()).filter_map(|index| self.combination(index))
    }

    /// Generate all parameter combinations.
    #[must_use]
    pub fn combinations(&self) -> Vec<BTreeMap<String, f64>> {
        self.iter().collect()
    }
}

/// Builder for parameter grids.
#[derive(Debug, Default)]
pub struct ParameterGridBuilder {
    axes: Vec<(String, Vec<f64>)>,
}

impl ParameterGridBuilder {
    /// Create a new builder.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add parameter values. Re-adding a name replaces its values.
    #[must_use]
    pub fn add_param(mut self, name: &str, values: Vec<f64>) -> Self {
        if let Some(axis) = self.axes.iter_mut().find(|(axis, _)| axis == name) {
            axis.1 = values;
        } else {
            self.axes.push((name.to_string(), values));
        }
        self
    }

    /// Build the parameter grid.
    #[must_use]
    pub fn build(self) -> ParameterGrid {
        ParameterGrid { axes: self.axes }
    }
}
