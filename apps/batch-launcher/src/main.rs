//! Batch Launcher Binary
//!
//! Expands the sweep specification into work items and runs one worker
//! process per item.
//!
//! # Usage
//!
//! ```bash
//! cargo run --bin batch-launcher
//! ```
//!
//! # Environment Variables
//!
//! - `BATCH_CONFIG_PATH`: Sweep specification (default: batch.config.json)
//! - `BATCH_START_DATES_PATH`: Earliest data date per symbol
//!   (default: data-start-date-by-symbol.json)
//! - `BATCH_WORKER_PATH`: Worker executable (default: batch-instance next to
//!   this binary)
//! - `BATCH_SEED`: Seed for the dispatch order shuffle (default: random)
//! - `RUST_LOG`: Log level (default: info)

use std::time::Instant;

use anyhow::Context;
use rand::SeedableRng;
use rand::rngs::StdRng;

use batch_launcher::config::{LauncherSettings, load_dotenv, load_earliest_dates, load_sweep_spec};
use batch_launcher::dispatch::{ApiCredentials, WorkerContext, dispatch};
use batch_launcher::sweep::SweepExpander;
use batch_launcher::telemetry;

fn main() -> anyhow::Result<()> {
    load_dotenv();
    telemetry::init();

    let started = Instant::now();
    let settings = LauncherSettings::from_env();
    tracing::info!(
        config = %settings.config_path.display(),
        start_dates = %settings.start_dates_path.display(),
        worker = %settings.worker_path.display(),
        seed = ?settings.seed,
        "Starting batch launcher"
    );

    let spec = load_sweep_spec(&settings.config_path).with_context(|| {
        format!(
            "loading sweep specification {}",
            settings.config_path.display()
        )
    })?;
    let earliest_by_symbol = load_earliest_dates(&settings.start_dates_path).with_context(|| {
        format!(
            "loading earliest data dates {}",
            settings.start_dates_path.display()
        )
    })?;

    let items = SweepExpander::new(&spec)
        .expand(&earliest_by_symbol)
        .context("expanding sweep")?;

    let context = WorkerContext::new(
        spec.library_path.clone(),
        ApiCredentials::new(spec.api_job_user_id.clone(), spec.api_access_token.clone()),
    );

    let mut rng = settings
        .seed
        .map_or_else(|| StdRng::from_rng(&mut rand::rng()), StdRng::seed_from_u64);

    let item_count = items.len();
    let summary = dispatch(
        items,
        &settings.worker_path,
        context,
        spec.parallel_processes,
        &mut rng,
    )
    .context("dispatching workers")?;

    if summary.launch_failures > 0 || summary.non_zero_exits > 0 {
        tracing::warn!(
            launch_failures = summary.launch_failures,
            non_zero_exits = summary.non_zero_exits,
            "Some backtests did not complete cleanly"
        );
    }

    #[allow(clippy::cast_precision_loss)]
    let total_minutes = started.elapsed().as_secs_f64() / 60.0;
    #[allow(clippy::cast_precision_loss)]
    let per_item_minutes = if item_count == 0 {
        0.0
    } else {
        total_minutes / item_count as f64
    };
    tracing::info!(
        backtests = item_count,
        succeeded = summary.items_succeeded,
        "Execution time: {total_minutes:.1} minutes (total), {per_item_minutes:.1} minute(s) (per backtest)"
    );

    Ok(())
}
