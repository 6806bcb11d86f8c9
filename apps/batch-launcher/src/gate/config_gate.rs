//! Serialized preparation of the shared engine configuration file.

use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};
use tracing::info;

use super::error::GateError;
use super::mutex::MutexGate;

/// Lock name guarding the engine configuration.
pub const CONFIG_LOCK: &str = "config";

/// Template location relative to the library path.
pub const TEMPLATE_RELATIVE_PATH: &str = "Launcher/config.json";

/// Copies the configuration template into place and applies overrides,
/// all under the [`CONFIG_LOCK`] lock.
#[derive(Debug, Clone)]
pub struct ConfigGate {
    gate: MutexGate,
    template_path: PathBuf,
    target_path: PathBuf,
}

impl ConfigGate {
    /// Create a gate for the template under `library_path`.
    #[must_use]
    pub fn new(gate: MutexGate, library_path: &Path, target_path: impl Into<PathBuf>) -> Self {
        Self {
            gate,
            template_path: library_path.join(TEMPLATE_RELATIVE_PATH),
            target_path: target_path.into(),
        }
    }

    /// Template configuration path.
    #[must_use]
    pub fn template_path(&self) -> &Path {
        &self.template_path
    }

    /// Path of the prepared configuration.
    #[must_use]
    pub fn target_path(&self) -> &Path {
        &self.target_path
    }

    /// Copy the template over the target and set every override key.
    ///
    /// Keys not overridden keep their template values; `//` comments in the
    /// template are dropped.
    ///
    /// # Errors
    ///
    /// Any [`GateError`]. A template that is not a JSON object fails as
    /// [`GateError::Action`] with [`io::ErrorKind::InvalidData`].
    pub fn prepare(&self, overrides: &[(String, String)]) -> Result<(), GateError> {
        self.gate.with_lock(CONFIG_LOCK, || {
            fs::copy(&self.template_path, &self.target_path)?;

            let text = fs::read_to_string(&self.target_path)?;
            let mut config = parse_config_object(&text)?;
            for (key, value) in overrides {
                config.insert(key.clone(), Value::String(value.clone()));
            }

            let rendered = serde_json::to_string_pretty(&Value::Object(config))?;
            fs::write(&self.target_path, rendered)
        })?;

        info!(
            path = %self.target_path.display(),
            keys = overrides.len(),
            "Prepared engine configuration"
        );
        Ok(())
    }
}

/// Parse a JSON object, tolerating `//` line comments.
fn parse_config_object(text: &str) -> io::Result<Map<String, Value>> {
    match serde_json::from_str::<Value>(&strip_line_comments(text))? {
        Value::Object(map) => Ok(map),
        other => Err(io::Error::new(
            io::ErrorKind::InvalidData,
            format!("configuration template must be a JSON object, found {other}"),
        )),
    }
}

/// Remove `//` comments that are not inside a string literal.
#[must_use]
pub fn strip_line_comments(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    let mut chars = text.chars().peekable();
    let mut in_string = false;

    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            match c {
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        out.push(escaped);
                    }
                }
                '"' => in_string = false,
                _ => {}
            }
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            '/' if chars.peek() == Some(&'/') => {
                // Skip to end of line, keeping the newline
                for skipped in chars.by_ref() {
                    if skipped == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            }
            _ => out.push(c),
        }
    }

    out
}
