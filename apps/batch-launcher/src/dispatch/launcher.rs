//! Worker process launching.

use std::path::{Path, PathBuf};
use std::process::Command;

use crate::codec::render_command_line;
use crate::sweep::WorkItem;

use super::error::DispatchError;

/// Date format used for worker date tokens.
pub const WORKER_DATE_FORMAT: &str = "%Y-%m-%d";

/// Number of argument tokens every worker receives.
pub const WORKER_TOKEN_COUNT: usize = 9;

/// Engine API credentials forwarded to every worker.
#[derive(Clone, PartialEq, Eq)]
pub struct ApiCredentials {
    job_user_id: String,
    access_token: String,
}

impl ApiCredentials {
    /// Create new credentials.
    #[must_use]
    pub const fn new(job_user_id: String, access_token: String) -> Self {
        Self {
            job_user_id,
            access_token,
        }
    }

    /// Get the job user id.
    #[must_use]
    pub fn job_user_id(&self) -> &str {
        &self.job_user_id
    }

    /// Get the access token.
    #[must_use]
    pub fn access_token(&self) -> &str {
        &self.access_token
    }
}

impl std::fmt::Debug for ApiCredentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ApiCredentials")
            .field("job_user_id", &self.job_user_id)
            .field("access_token", &"[REDACTED]")
            .finish()
    }
}

/// Values shared by every worker in a run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerContext {
    /// Root of the engine library installation.
    pub library_path: String,
    /// API credentials.
    pub credentials: ApiCredentials,
}

impl WorkerContext {
    /// Create a new worker context.
    #[must_use]
    pub const fn new(library_path: String, credentials: ApiCredentials) -> Self {
        Self {
            library_path,
            credentials,
        }
    }

    /// Argument tokens for one work item, in worker contract order.
    ///
    /// `library, user id, token, start, end, variant, symbol, resolution,
    /// serialized parameters`. Tokens are raw; encoding happens at launch.
    #[must_use]
    pub fn tokens(&self, item: &WorkItem) -> [String; WORKER_TOKEN_COUNT] {
        [
            self.library_path.clone(),
            self.credentials.job_user_id.clone(),
            self.credentials.access_token.clone(),
            item.start_date.format(WORKER_DATE_FORMAT).to_string(),
            item.end_date.format(WORKER_DATE_FORMAT).to_string(),
            item.variant_name.clone(),
            item.symbol.clone(),
            item.resolution.to_string(),
            item.serialized_parameters.clone(),
        ]
    }
}

/// Exit status of a finished worker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WorkerExit {
    /// Process exit code; `None` when terminated by a signal.
    pub code: Option<i32>,
}

impl WorkerExit {
    /// Exit with the given code.
    #[must_use]
    pub const fn with_code(code: i32) -> Self {
        Self { code: Some(code) }
    }

    /// Whether the worker exited with code zero.
    #[must_use]
    pub const fn success(&self) -> bool {
        matches!(self.code, Some(0))
    }
}

/// Starts one worker for a set of argument tokens and waits for it.
///
/// Implementations block the calling thread until the worker has exited.
pub trait WorkerLauncher: Sync {
    /// Launch a worker and block until it exits.
    ///
    /// # Errors
    ///
    /// Returns [`DispatchError::WorkerLaunch`] if the worker cannot be started.
    fn run(&self, tokens: &[String]) -> Result<WorkerExit, DispatchError>;
}

/// Launches workers as OS processes.
///
/// The tokens are rendered into one command line of encoded, double-quoted
/// arguments. On Windows that line is handed to the process verbatim; on
/// other platforms it is split with the same parsing rules first, so workers
/// observe identical argv everywhere.
#[derive(Debug, Clone)]
pub struct ProcessLauncher {
    worker_path: PathBuf,
}

impl ProcessLauncher {
    /// Create a launcher for the given worker executable.
    #[must_use]
    pub fn new(worker_path: impl Into<PathBuf>) -> Self {
        Self {
            worker_path: worker_path.into(),
        }
    }

    /// Worker executable path.
    #[must_use]
    pub fn worker_path(&self) -> &Path {
        &self.worker_path
    }

    fn command(&self, tokens: &[String]) -> Command {
        let line = render_command_line(tokens);
        let mut command = Command::new(&self.worker_path);

        #[cfg(windows)]
        {
            use std::os::windows::process::CommandExt;
            command.raw_arg(line);
        }

        #[cfg(not(windows))]
        command.args(crate::codec::parse_command_line(&line));

        command
    }
}

impl WorkerLauncher for ProcessLauncher {
    fn run(&self, tokens: &[String]) -> Result<WorkerExit, DispatchError> {
        let status = self
            .command(tokens)
            .status()
            .map_err(|e| DispatchError::WorkerLaunch {
                path: self.worker_path.display().to_string(),
                message: e.to_string(),
            })?;

        Ok(WorkerExit {
            code: status.code(),
        })
    }
}
