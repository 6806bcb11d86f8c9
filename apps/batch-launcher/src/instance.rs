//! Worker-side view of one work item.
//!
//! A worker receives the nine tokens produced by
//! [`WorkerContext::tokens`](crate::dispatch::WorkerContext::tokens), each
//! encoded with [`encode_arg_text`](crate::codec::encode_arg_text).
//! [`InstanceContext::from_args`] decodes them back and derives the engine
//! configuration keys the worker writes through the
//! [`ConfigGate`](crate::gate::ConfigGate).

use std::collections::BTreeMap;
use std::path::Path;

use chrono::NaiveDate;
use thiserror::Error;

use crate::codec::decode_arg_text;
use crate::dispatch::{ApiCredentials, WORKER_DATE_FORMAT, WORKER_TOKEN_COUNT};
use crate::sweep::{ParameterState, parse_date};

/// Algorithm class the engine loads.
pub const ALGORITHM_TYPE_NAME: &str = "BasicTemplateFrameworkAlgorithm";

/// Assembly containing the algorithm.
pub const ALGORITHM_LOCATION: &str = "Algorithm.dll";

/// Engine environment selector.
pub const ENGINE_ENVIRONMENT: &str = "backtesting";

/// Job queue handler the engine pulls its job from.
pub const JOB_QUEUE_HANDLER: &str = "LeanBatchLauncher.Launcher.Queue";

/// Data provider used by the engine.
pub const DATA_PROVIDER: &str = "QuantConnect.Lean.Engine.DataFeeds.ApiDataProvider";

/// Errors decoding worker arguments.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum InstanceError {
    /// Wrong number of arguments.
    #[error("Expected {expected} arguments, got {actual}")]
    ArgumentCount {
        /// Required count.
        expected: usize,
        /// Received count.
        actual: usize,
    },

    /// A date argument could not be parsed.
    #[error("Invalid {field} '{value}'")]
    InvalidDate {
        /// Argument name.
        field: &'static str,
        /// The offending value.
        value: String,
    },

    /// The resolution argument is not a non-negative integer.
    #[error("Invalid minute resolution '{value}'")]
    InvalidResolution {
        /// The offending value.
        value: String,
    },

    /// The parameter snapshot is not valid JSON.
    #[error("Invalid parameter snapshot: {message}")]
    InvalidParameters {
        /// Error message.
        message: String,
    },
}

/// Decoded arguments of one worker invocation.
#[derive(Debug, Clone, PartialEq)]
pub struct InstanceContext {
    /// Root of the engine library installation.
    pub library_path: String,
    /// API credentials.
    pub credentials: ApiCredentials,
    /// Window start.
    pub start_date: NaiveDate,
    /// Window end.
    pub end_date: NaiveDate,
    /// Strategy variant name.
    pub variant_name: String,
    /// Symbol to backtest.
    pub symbol: String,
    /// Bar resolution in minutes.
    pub resolution: u32,
    /// Parameter snapshot with `current` values assigned.
    pub parameters: BTreeMap<String, ParameterState>,
}

impl InstanceContext {
    /// Decode the worker's argument list (program name excluded).
    ///
    /// # Errors
    ///
    /// Returns an [`InstanceError`] for a wrong argument count or any
    /// malformed value.
    pub fn from_args<S: AsRef<str>>(args: &[S]) -> Result<Self, InstanceError> {
        if args.len() != WORKER_TOKEN_COUNT {
            return Err(InstanceError::ArgumentCount {
                expected: WORKER_TOKEN_COUNT,
                actual: args.len(),
            });
        }

        let decoded: Vec<String> = args.iter().map(|a| decode_arg_text(a.as_ref())).collect();
        let [
            library_path,
            job_user_id,
            access_token,
            start_date,
            end_date,
            variant_name,
            symbol,
            resolution,
            parameters,
        ]: [String; WORKER_TOKEN_COUNT] = decoded.try_into().map_err(|v: Vec<String>| {
            InstanceError::ArgumentCount {
                expected: WORKER_TOKEN_COUNT,
                actual: v.len(),
            }
        })?;

        Ok(Self {
            library_path,
            credentials: ApiCredentials::new(job_user_id, access_token),
            start_date: parse_field("start date", &start_date)?,
            end_date: parse_field("end date", &end_date)?,
            variant_name,
            symbol,
            resolution: resolution
                .trim()
                .parse()
                .map_err(|_| InstanceError::InvalidResolution { value: resolution })?,
            parameters: serde_json::from_str(&parameters).map_err(|e| {
                InstanceError::InvalidParameters {
                    message: e.to_string(),
                }
            })?,
        })
    }

    /// Engine configuration keys for this instance, in write order.
    ///
    /// Fixed engine settings come first, then the run window, variant,
    /// symbol and resolution, then one key per parameter holding its
    /// current value.
    #[must_use]
    pub fn config_overrides(&self) -> Vec<(String, String)> {
        let data_folder = format!("{}/", Path::new(&self.library_path).join("Data").display());

        let fixed = [
            ("algorithm-type-name", ALGORITHM_TYPE_NAME.to_string()),
            ("algorithm-location", ALGORITHM_LOCATION.to_string()),
            ("environment", ENGINE_ENVIRONMENT.to_string()),
            ("data-folder", data_folder),
            ("job-queue-handler", JOB_QUEUE_HANDLER.to_string()),
            ("data-provider", DATA_PROVIDER.to_string()),
            ("job-user-id", self.credentials.job_user_id().to_string()),
            (
                "api-access-token",
                self.credentials.access_token().to_string(),
            ),
            (
                "LBL-start-date",
                self.start_date.format(WORKER_DATE_FORMAT).to_string(),
            ),
            (
                "LBL-end-date",
                self.end_date.format(WORKER_DATE_FORMAT).to_string(),
            ),
            ("LBL-alpha-model-name", self.variant_name.clone()),
            ("LBL-symbol", self.symbol.clone()),
            ("LBL-minute-resolution", self.resolution.to_string()),
        ];

        fixed
            .into_iter()
            .map(|(key, value)| (key.to_string(), value))
            .chain(
                self.parameters
                    .iter()
                    .map(|(name, param)| (name.clone(), param.current().to_string())),
            )
            .collect()
    }
}

fn parse_field(field: &'static str, value: &str) -> Result<NaiveDate, InstanceError> {
    parse_date(value).map_err(|_| InstanceError::InvalidDate {
        field,
        value: value.to_string(),
    })
}
