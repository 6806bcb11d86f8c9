//! Process Settings
//!
//! Launcher and worker settings, loaded from environment variables.

use std::path::{Path, PathBuf};

use crate::gate::MutexGate;

/// Default sweep specification file.
pub const DEFAULT_CONFIG_PATH: &str = "batch.config.json";

/// Default earliest-data-date file.
pub const DEFAULT_START_DATES_PATH: &str = "data-start-date-by-symbol.json";

/// Worker executable name, without platform suffix.
pub const WORKER_BINARY_NAME: &str = "batch-instance";

/// Engine configuration file written into each worker's own directory.
pub const ENGINE_CONFIG_FILE_NAME: &str = "config.json";

/// Directory next to the worker executable holding per-worker directories.
pub const DEFAULT_WORK_DIR_NAME: &str = "instances";

/// Settings for the launcher binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LauncherSettings {
    /// Sweep specification file (`BATCH_CONFIG_PATH`).
    pub config_path: PathBuf,
    /// Earliest-data-date file (`BATCH_START_DATES_PATH`).
    pub start_dates_path: PathBuf,
    /// Worker executable (`BATCH_WORKER_PATH`).
    pub worker_path: PathBuf,
    /// Shuffle seed (`BATCH_SEED`); unseeded when absent.
    pub seed: Option<u64>,
}

impl LauncherSettings {
    /// Create settings from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create settings from an arbitrary key lookup.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            config_path: var("BATCH_CONFIG_PATH")
                .map_or_else(|| PathBuf::from(DEFAULT_CONFIG_PATH), PathBuf::from),
            start_dates_path: var("BATCH_START_DATES_PATH")
                .map_or_else(|| PathBuf::from(DEFAULT_START_DATES_PATH), PathBuf::from),
            worker_path: var("BATCH_WORKER_PATH").map_or_else(default_worker_path, PathBuf::from),
            seed: var("BATCH_SEED").and_then(|v| parse_seed(&v)),
        }
    }
}

/// Settings for the worker binary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerSettings {
    /// Directory for lock files (`BATCH_LOCK_DIR`); OS temp dir when absent.
    pub lock_dir: Option<PathBuf>,
    /// Root of the per-worker directories (`BATCH_INSTANCE_WORK_DIR`).
    pub work_root: PathBuf,
    /// Engine command run after preparation (`BATCH_ENGINE_COMMAND`).
    pub engine_command: Option<String>,
}

impl WorkerSettings {
    /// Create settings from environment variables.
    #[must_use]
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Create settings from an arbitrary key lookup.
    #[must_use]
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let var = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        Self {
            lock_dir: var("BATCH_LOCK_DIR").map(PathBuf::from),
            work_root: var("BATCH_INSTANCE_WORK_DIR").map_or_else(default_work_root, PathBuf::from),
            engine_command: var("BATCH_ENGINE_COMMAND"),
        }
    }

    /// Mutex gate using the configured lock directory.
    #[must_use]
    pub fn mutex_gate(&self) -> MutexGate {
        self.lock_dir
            .as_ref()
            .map_or_else(MutexGate::default, |dir| MutexGate::new(dir.clone()))
    }

    /// Working directory owned by the worker process `process_id`.
    ///
    /// Live processes never share an id, so concurrent workers never share
    /// a prepared configuration.
    #[must_use]
    pub fn instance_dir(&self, process_id: u32) -> PathBuf {
        self.work_root.join(format!("instance-{process_id}"))
    }

    /// Prepared engine configuration of the worker process `process_id`.
    #[must_use]
    pub fn engine_config_path(&self, process_id: u32) -> PathBuf {
        self.instance_dir(process_id).join(ENGINE_CONFIG_FILE_NAME)
    }
}

/// Parse a shuffle seed, warning when the value is not a `u64`.
fn parse_seed(raw: &str) -> Option<u64> {
    match raw.trim().parse() {
        Ok(seed) => Some(seed),
        Err(e) => {
            tracing::warn!(value = raw, error = %e, "Ignoring invalid BATCH_SEED, dispatch order is random");
            None
        }
    }
}

/// Directory containing the running executable, if known.
fn executable_dir() -> Option<PathBuf> {
    std::env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
}

fn default_worker_path() -> PathBuf {
    let file_name = format!("{WORKER_BINARY_NAME}{}", std::env::consts::EXE_SUFFIX);
    executable_dir().map_or_else(|| PathBuf::from(&file_name), |dir| dir.join(&file_name))
}

fn default_work_root() -> PathBuf {
    executable_dir().map_or_else(
        || PathBuf::from(DEFAULT_WORK_DIR_NAME),
        |dir| dir.join(DEFAULT_WORK_DIR_NAME),
    )
}

/// Load .env file from current or ancestor directories.
pub fn load_dotenv() {
    if dotenvy::dotenv().is_err() {
        load_dotenv_from_ancestors();
    }
}

/// Load .env file from any ancestor of the current directory.
fn load_dotenv_from_ancestors() {
    if let Ok(cwd) = std::env::current_dir() {
        let mut dir = cwd.as_path();
        while let Some(parent) = dir.parent() {
            let env_path = parent.join(".env");
            if env_path.exists() {
                let _ = dotenvy::from_path(&env_path);
                return;
            }
            dir = parent;
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;
    use std::io;
    use std::sync::{Arc, Mutex};

    use super::*;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| ((*k).to_string(), (*v).to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn test_launcher_defaults() {
        let settings = LauncherSettings::from_lookup(lookup(&[]));

        assert_eq!(settings.config_path, PathBuf::from(DEFAULT_CONFIG_PATH));
        assert_eq!(settings.start_dates_path, PathBuf::from(DEFAULT_START_DATES_PATH));
        assert!(
            settings
                .worker_path
                .to_string_lossy()
                .contains(WORKER_BINARY_NAME)
        );
        assert_eq!(settings.seed, None);
    }

    #[test]
    fn test_launcher_overrides() {
        let settings = LauncherSettings::from_lookup(lookup(&[
            ("BATCH_CONFIG_PATH", "sweeps/nightly.yaml"),
            ("BATCH_START_DATES_PATH", "dates.json"),
            ("BATCH_WORKER_PATH", "/usr/local/bin/worker"),
            ("BATCH_SEED", " 42 "),
        ]));

        assert_eq!(settings.config_path, PathBuf::from("sweeps/nightly.yaml"));
        assert_eq!(settings.start_dates_path, PathBuf::from("dates.json"));
        assert_eq!(settings.worker_path, PathBuf::from("/usr/local/bin/worker"));
        assert_eq!(settings.seed, Some(42));
    }

    #[test]
    fn test_launcher_ignores_blank_and_bad_values() {
        let settings = LauncherSettings::from_lookup(lookup(&[
            ("BATCH_CONFIG_PATH", "  "),
            ("BATCH_SEED", "not-a-number"),
        ]));

        assert_eq!(settings.config_path, PathBuf::from(DEFAULT_CONFIG_PATH));
        assert_eq!(settings.seed, None);
    }

    #[test]
    fn test_invalid_seed_is_logged() {
        #[derive(Clone, Default)]
        struct Captured(Arc<Mutex<Vec<u8>>>);

        impl io::Write for Captured {
            fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
                self.0.lock().unwrap().extend_from_slice(buf);
                Ok(buf.len())
            }

            fn flush(&mut self) -> io::Result<()> {
                Ok(())
            }
        }

        let captured = Captured::default();
        let writer = captured.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();

        let settings = tracing::subscriber::with_default(subscriber, || {
            LauncherSettings::from_lookup(lookup(&[("BATCH_SEED", "4x2")]))
        });

        assert_eq!(settings.seed, None);
        let output = String::from_utf8(captured.0.lock().unwrap().clone()).unwrap();
        assert!(output.contains("WARN"), "{output}");
        assert!(output.contains("Ignoring invalid BATCH_SEED"), "{output}");
        assert!(output.contains("4x2"), "{output}");
    }

    #[test]
    fn test_worker_settings() {
        let settings = WorkerSettings::from_lookup(lookup(&[
            ("BATCH_LOCK_DIR", "/var/lock/batch"),
            ("BATCH_INSTANCE_WORK_DIR", "/srv/engine/work"),
            ("BATCH_ENGINE_COMMAND", "dotnet QuantConnect.Lean.Launcher.dll"),
        ]));

        assert_eq!(settings.mutex_gate().lock_dir(), Path::new("/var/lock/batch"));
        assert_eq!(settings.instance_dir(42), Path::new("/srv/engine/work/instance-42"));
        assert_eq!(
            settings.engine_config_path(42),
            Path::new("/srv/engine/work/instance-42/config.json")
        );
        assert_eq!(
            settings.engine_command.as_deref(),
            Some("dotnet QuantConnect.Lean.Launcher.dll")
        );
    }

    #[test]
    fn test_worker_settings_defaults() {
        let settings = WorkerSettings::from_lookup(lookup(&[]));

        assert_eq!(settings.lock_dir, None);
        assert!(settings.mutex_gate().lock_dir().ends_with(crate::gate::DEFAULT_LOCK_DIR_NAME));
        assert!(settings.work_root.ends_with(DEFAULT_WORK_DIR_NAME));
        assert_eq!(settings.engine_command, None);
    }

    #[test]
    fn test_instance_dirs_are_distinct_per_process() {
        let settings = WorkerSettings::from_lookup(lookup(&[("BATCH_INSTANCE_WORK_DIR", "work")]));

        assert_ne!(settings.engine_config_path(100), settings.engine_config_path(101));
        assert!(settings.instance_dir(100).starts_with("work"));
    }
}
