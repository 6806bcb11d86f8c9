//! Batch Instance Binary
//!
//! Runs one sweep work item: decodes the nine encoded arguments, copies the
//! engine configuration template into this process's own directory under
//! the `"config"` lock and hands off to the backtest engine there.
//!
//! # Usage
//!
//! ```bash
//! batch-instance <library> <user-id> <token> <start> <end> <variant> <symbol> <resolution> <parameters>
//! ```
//!
//! # Environment Variables
//!
//! - `BATCH_LOCK_DIR`: Lock file directory (default: OS temp dir)
//! - `BATCH_INSTANCE_WORK_DIR`: Root of the per-worker directories (default:
//!   `instances` next to this binary); each worker uses `instance-<pid>`
//! - `BATCH_ENGINE_COMMAND`: Engine command line, run in the worker
//!   directory; its exit code becomes this process's exit code
//! - `RUST_LOG`: Log level (default: info)

use std::fs;
use std::path::Path;
use std::process::{Command, ExitCode};

use anyhow::{Context, bail};

use batch_launcher::codec::parse_command_line;
use batch_launcher::config::{WorkerSettings, load_dotenv};
use batch_launcher::gate::ConfigGate;
use batch_launcher::instance::InstanceContext;
use batch_launcher::telemetry::{self, TelemetryConfig};

fn main() -> anyhow::Result<ExitCode> {
    load_dotenv();
    telemetry::init_with_config(&TelemetryConfig::from_env().with_directive("batch_instance=info"));

    let args: Vec<String> = std::env::args_os()
        .skip(1)
        .map(|arg| arg.to_string_lossy().into_owned())
        .collect();
    let context = InstanceContext::from_args(&args).context("decoding worker arguments")?;
    let settings = WorkerSettings::from_env();

    let _span = tracing::info_span!(
        "instance",
        variant = %context.variant_name,
        symbol = %context.symbol,
        resolution = context.resolution,
        start = %context.start_date,
        end = %context.end_date,
    )
    .entered();

    let process_id = std::process::id();
    let work_dir = settings.instance_dir(process_id);
    fs::create_dir_all(&work_dir)
        .with_context(|| format!("creating worker directory {}", work_dir.display()))?;

    let config_path = settings.engine_config_path(process_id);
    let gate = ConfigGate::new(
        settings.mutex_gate(),
        Path::new(&context.library_path),
        &config_path,
    );
    gate.prepare(&context.config_overrides())
        .context("preparing engine configuration")?;

    match settings.engine_command.as_deref() {
        Some(command_line) => run_engine(command_line, &work_dir),
        None => {
            tracing::info!(
                path = %config_path.display(),
                "No engine command configured, configuration prepared only"
            );
            Ok(ExitCode::SUCCESS)
        }
    }
}

/// Run the engine in `working_dir` and mirror its exit code.
fn run_engine(command_line: &str, working_dir: &Path) -> anyhow::Result<ExitCode> {
    let argv = parse_command_line(command_line);
    let Some((program, args)) = argv.split_first() else {
        bail!("BATCH_ENGINE_COMMAND is empty");
    };

    tracing::info!(program = %program, dir = %working_dir.display(), "Starting engine");
    let status = Command::new(program)
        .args(args)
        .current_dir(working_dir)
        .status()
        .with_context(|| format!("starting engine '{program}'"))?;

    match status.code() {
        Some(0) => {
            tracing::info!("Engine finished");
            Ok(ExitCode::SUCCESS)
        }
        code => {
            tracing::warn!(code = ?code, "Engine exited with non-zero status");
            Ok(ExitCode::from(
                code.and_then(|c| u8::try_from(c).ok()).unwrap_or(1),
            ))
        }
    }
}
