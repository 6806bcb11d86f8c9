//! Core types for sweep specifications and work items.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Deserializer, Serialize};

use super::range::{RangeError, RangeSpec};

/// A single parameter to be swept, as declared in the sweep file.
///
/// `current` holds the value assigned for one concrete combination; until it
/// is set the parameter reports its `start`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ParameterState {
    /// First value of the range.
    pub start: f64,

    /// Inclusive upper bound of the range.
    pub end: f64,

    /// Increment for a stepped range.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub step: Option<f64>,

    /// Multiplier for a product range.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub factor: Option<f64>,

    /// Value assigned for the current combination.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current: Option<f64>,
}

impl ParameterState {
    /// Create a stepped parameter.
    #[must_use]
    pub const fn stepped(start: f64, end: f64, step: f64) -> Self {
        Self {
            start,
            end,
            step: Some(step),
            factor: None,
            current: None,
        }
    }

    /// Create a product parameter.
    #[must_use]
    pub const fn product(start: f64, end: f64, factor: f64) -> Self {
        Self {
            start,
            end,
            step: None,
            factor: Some(factor),
            current: None,
        }
    }

    /// Validated range description for this parameter.
    pub fn range_spec(&self) -> Result<RangeSpec, RangeError> {
        RangeSpec::from_parts(self.start, self.end, self.step, self.factor)
    }

    /// The assigned value, or `start` when none has been assigned.
    #[must_use]
    pub fn current(&self) -> f64 {
        self.current.unwrap_or(self.start)
    }

    /// Copy of this parameter with `current` set.
    #[must_use]
    pub fn with_current(&self, value: f64) -> Self {
        Self {
            current: Some(value),
            ..self.clone()
        }
    }
}

/// Full declarative sweep specification.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SweepSpec {
    /// Folder containing the backtest engine library and its data.
    pub library_path: String,

    /// Job user id for the data API.
    #[serde(deserialize_with = "string_or_number")]
    pub api_job_user_id: String,

    /// Access token for the data API.
    pub api_access_token: String,

    /// Maximum number of worker processes alive at once.
    pub parallel_processes: usize,

    /// First window start date.
    pub start_date: String,

    /// Length of each window in calendar months.
    pub duration: i32,

    /// Strategy variants to run. Empty means a single "ALL" variant.
    #[serde(default)]
    pub alpha_model_names: Vec<String>,

    /// Bar resolutions in minutes.
    pub minute_resolutions: Vec<u32>,

    /// Symbols to backtest.
    pub symbols: Vec<String>,

    /// Named parameter ranges.
    #[serde(default)]
    pub parameters: BTreeMap<String, ParameterState>,
}

/// One fully-resolved unit of work, dispatched to exactly one worker.
#[derive(Debug, Clone, PartialEq)]
pub struct WorkItem {
    /// Window start, clamped to the symbol's earliest data date.
    pub start_date: NaiveDate,

    /// Window end.
    pub end_date: NaiveDate,

    /// Strategy variant name.
    pub variant_name: String,

    /// Symbol to backtest.
    pub symbol: String,

    /// Bar resolution in minutes.
    pub resolution: u32,

    /// Resolved parameter values for this combination.
    pub parameters: BTreeMap<String, f64>,

    /// Parameter snapshot serialized for the worker.
    pub serialized_parameters: String,
}

impl WorkItem {
    /// Short label for logs.
    #[must_use]
    pub fn label(&self) -> String {
        format!(
            "{}/{}/{}m/{}..{}",
            self.variant_name, self.symbol, self.resolution, self.start_date, self.end_date
        )
    }
}

/// Accept the API user id as either a JSON string or a number.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Text(String),
        Int(i64),
        Float(f64),
    }

    Ok(match Raw::deserialize(deserializer)? {
        Raw::Text(s) => s,
        Raw::Int(n) => n.to_string(),
        Raw::Float(n) => n.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parameter_current_defaults_to_start() {
        let param = ParameterState::stepped(5.0, 10.0, 1.0);
        assert_eq!(param.current(), 5.0);

        let assigned = param.with_current(0.0);
        assert_eq!(assigned.current(), 0.0);
        // Original untouched
        assert_eq!(param.current, None);
    }

    #[test]
    fn test_parameter_serialization_omits_unset_fields() {
        let param = ParameterState::product(1.0, 8.0, 2.0).with_current(4.0);
        let json = serde_json::to_string(&param).unwrap();

        assert_eq!(json, r#"{"start":1.0,"end":8.0,"factor":2.0,"current":4.0}"#);
    }

    #[test]
    fn test_sweep_spec_deserialization() {
        let json = r#"{
            "libraryPath": "/opt/lean",
            "apiJobUserId": 12345,
            "apiAccessToken": "secret",
            "parallelProcesses": 4,
            "startDate": "2020-01-01",
            "duration": 3,
            "alphaModelNames": [],
            "minuteResolutions": [1, 5],
            "symbols": ["SPY"],
            "parameters": {
                "period": { "start": 10, "end": 30, "step": 10 }
            }
        }"#;

        let spec: SweepSpec = serde_json::from_str(json).unwrap();
        assert_eq!(spec.api_job_user_id, "12345");
        assert_eq!(spec.parallel_processes, 4);
        assert!(spec.alpha_model_names.is_empty());
        assert_eq!(spec.parameters["period"].step, Some(10.0));
    }

    #[test]
    fn test_work_item_label() {
        let item = WorkItem {
            start_date: NaiveDate::from_ymd_opt(2020, 1, 1).unwrap(),
            end_date: NaiveDate::from_ymd_opt(2020, 4, 1).unwrap(),
            variant_name: "ALL".to_string(),
            symbol: "SPY".to_string(),
            resolution: 5,
            parameters: BTreeMap::new(),
            serialized_parameters: "{}".to_string(),
        };

        assert_eq!(item.label(), "ALL/SPY/5m/2020-01-01..2020-04-01");
    }
}
