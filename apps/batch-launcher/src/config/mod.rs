//! Configuration loading for the batch launcher.
//!
//! The sweep specification and the earliest-data-date table are read from
//! JSON or YAML files (chosen by extension) after `${VAR}` /
//! `${VAR:-default}` environment interpolation. Process settings come from
//! environment variables; see [`settings`].

pub mod settings;

use std::collections::HashMap;
use std::path::Path;

use chrono::NaiveDate;
use thiserror::Error;

use crate::sweep::{SweepSpec, parse_date};

pub use settings::{LauncherSettings, WorkerSettings, load_dotenv};

/// Configuration errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read configuration file.
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        /// Path to the config file.
        path: String,
        /// The underlying IO error.
        source: std::io::Error,
    },

    /// Failed to parse JSON configuration.
    #[error("Failed to parse config JSON: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Failed to parse YAML configuration.
    #[error("Failed to parse config YAML: {0}")]
    YamlError(#[from] serde_yaml_bw::Error),

    /// Configuration validation failed.
    #[error("Config validation failed: {0}")]
    ValidationError(String),
}

/// Serialization format of a configuration file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigFormat {
    /// JSON document.
    Json,
    /// YAML document.
    Yaml,
}

impl ConfigFormat {
    /// Pick the format from a file extension; anything but `yaml`/`yml` is JSON.
    #[must_use]
    pub fn from_path(path: &Path) -> Self {
        match path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_ascii_lowercase)
            .as_deref()
        {
            Some("yaml" | "yml") => Self::Yaml,
            _ => Self::Json,
        }
    }

    fn parse<T: serde::de::DeserializeOwned>(self, text: &str) -> Result<T, ConfigError> {
        match self {
            Self::Json => Ok(serde_json::from_str(text)?),
            Self::Yaml => Ok(serde_yaml_bw::from_str(text)?),
        }
    }
}

// ============================================
// Configuration Loading
// ============================================

/// Load and validate a sweep specification file.
///
/// # Errors
///
/// Returns a `ConfigError` if the file cannot be read, parsed, or validated.
pub fn load_sweep_spec(path: impl AsRef<Path>) -> Result<SweepSpec, ConfigError> {
    let path = path.as_ref();
    let contents = read_file(path)?;
    load_sweep_spec_from_str(&contents, ConfigFormat::from_path(path))
}

/// Load and validate a sweep specification from a string.
///
/// # Errors
///
/// Returns a `ConfigError` if the text cannot be parsed or validated.
pub fn load_sweep_spec_from_str(text: &str, format: ConfigFormat) -> Result<SweepSpec, ConfigError> {
    let interpolated = interpolate_env_vars(text);
    let spec: SweepSpec = format.parse(&interpolated)?;
    validate_config(&spec)?;
    Ok(spec)
}

/// Load the earliest usable data date for each symbol.
///
/// # Errors
///
/// Returns a `ConfigError` if the file cannot be read or parsed, or a date
/// is malformed.
pub fn load_earliest_dates(
    path: impl AsRef<Path>,
) -> Result<HashMap<String, NaiveDate>, ConfigError> {
    let path = path.as_ref();
    let contents = read_file(path)?;
    load_earliest_dates_from_str(&contents, ConfigFormat::from_path(path))
}

/// Parse an earliest-data-date table from a string.
///
/// # Errors
///
/// Returns a `ConfigError` if the text cannot be parsed or a date is malformed.
pub fn load_earliest_dates_from_str(
    text: &str,
    format: ConfigFormat,
) -> Result<HashMap<String, NaiveDate>, ConfigError> {
    let raw: HashMap<String, String> = format.parse(text)?;

    raw.into_iter()
        .map(|(symbol, value)| {
            parse_date(&value)
                .map(|date| (symbol.clone(), date))
                .map_err(|e| ConfigError::ValidationError(format!("symbol '{symbol}': {e}")))
        })
        .collect()
}

fn read_file(path: &Path) -> Result<String, ConfigError> {
    std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
        path: path.display().to_string(),
        source: e,
    })
}

/// Interpolate environment variables in a string.
///
/// Supports both `${VAR}` and `${VAR:-default}` syntax.
#[allow(clippy::expect_used)] // Pattern is a compile-time constant
fn interpolate_env_vars(input: &str) -> String {
    use std::sync::OnceLock;

    static ENV_VAR_REGEX: OnceLock<regex::Regex> = OnceLock::new();

    let re = ENV_VAR_REGEX.get_or_init(|| {
        regex::Regex::new(r"\$\{([A-Za-z_][A-Za-z0-9_]*)(?::-([^}]*))?\}")
            .expect("env var regex is valid")
    });

    re.replace_all(input, |cap: &regex::Captures| {
        let default_value = cap.get(2).map(|m| m.as_str());
        match std::env::var(&cap[1]) {
            Ok(v) if !v.is_empty() => v,
            _ => default_value.map_or_else(String::new, str::to_string),
        }
    })
    .into_owned()
}

/// Validate sweep values that would otherwise fail late or loop.
fn validate_config(spec: &SweepSpec) -> Result<(), ConfigError> {
    if spec.parallel_processes == 0 {
        return Err(ConfigError::ValidationError(
            "parallelProcesses must be at least 1".to_string(),
        ));
    }

    if spec.duration < 1 {
        return Err(ConfigError::ValidationError(
            "duration must be at least 1 month".to_string(),
        ));
    }

    if spec.symbols.is_empty() {
        return Err(ConfigError::ValidationError(
            "symbols must not be empty".to_string(),
        ));
    }

    if spec.minute_resolutions.is_empty() {
        return Err(ConfigError::ValidationError(
            "minuteResolutions must not be empty".to_string(),
        ));
    }

    parse_date(&spec.start_date).map_err(|e| ConfigError::ValidationError(e.to_string()))?;

    for (name, parameter) in &spec.parameters {
        parameter.range_spec().map_err(|e| {
            ConfigError::ValidationError(format!("parameter '{name}': {e}"))
        })?;
    }

    Ok(())
}
