//! Integration Tests for Sweep Expansion and Dispatch
//!
//! Loads sweep files from disk, expands them, and dispatches the items to
//! real worker processes that record the argv they received.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::collections::BTreeSet;
use std::fs;
use std::path::Path;

use chrono::NaiveDate;
use rand::SeedableRng;
use rand::rngs::StdRng;

use batch_launcher::config::{load_earliest_dates, load_sweep_spec};
use batch_launcher::dispatch::{ApiCredentials, WorkerContext, dispatch};
use batch_launcher::instance::InstanceContext;
use batch_launcher::sweep::{SweepExpander, WorkItem};

const SPEC_YAML: &str = r"
libraryPath: /opt/lean
apiJobUserId: 12345
apiAccessToken: token-with-\backslash
parallelProcesses: 3
startDate: 2020-01-01
duration: 6
alphaModelNames: [Momentum, Reversion]
minuteResolutions: [1, 60]
symbols: [SPY, QQQ]
parameters:
  period:
    start: 10
    end: 20
    step: 10
";

const DATES_JSON: &str = r#"{ "SPY": "1998-01-02", "QQQ": "2020-03-15" }"#;

fn write_fixtures(dir: &Path) -> (std::path::PathBuf, std::path::PathBuf) {
    let spec_path = dir.join("batch.config.yaml");
    let dates_path = dir.join("data-start-date-by-symbol.json");
    fs::write(&spec_path, SPEC_YAML).unwrap();
    fs::write(&dates_path, DATES_JSON).unwrap();
    (spec_path, dates_path)
}

fn expand_fixture(dir: &Path) -> (batch_launcher::SweepSpec, Vec<WorkItem>) {
    let (spec_path, dates_path) = write_fixtures(dir);
    let spec = load_sweep_spec(&spec_path).unwrap();
    let earliest = load_earliest_dates(&dates_path).unwrap();

    let items = SweepExpander::new(&spec)
        .as_of(NaiveDate::from_ymd_opt(2021, 1, 1).unwrap())
        .expand(&earliest)
        .unwrap();

    (spec, items)
}

#[test]
fn test_expand_from_files() {
    let dir = tempfile::tempdir().unwrap();
    let (spec, items) = expand_fixture(dir.path());

    // 2 windows x 2 variants x 2 symbols x 2 resolutions x 2 periods
    assert_eq!(items.len(), 32);
    assert_eq!(spec.api_job_user_id, "12345");

    let qqq_first_window: Vec<&WorkItem> = items
        .iter()
        .filter(|i| i.symbol == "QQQ" && i.end_date == NaiveDate::from_ymd_opt(2020, 7, 1).unwrap())
        .collect();
    assert!(!qqq_first_window.is_empty());
    assert!(
        qqq_first_window
            .iter()
            .all(|i| i.start_date == NaiveDate::from_ymd_opt(2020, 3, 15).unwrap())
    );

    let labels: BTreeSet<String> = items.iter().map(WorkItem::label).collect();
    assert_eq!(labels.len(), 16, "labels ignore the parameter axis");
}

#[cfg(unix)]
#[test]
fn test_dispatch_to_real_workers() {
    let dir = tempfile::tempdir().unwrap();
    let (mut spec, items) = expand_fixture(dir.path());

    let out_dir = dir.path().join("argv");
    fs::create_dir_all(&out_dir).unwrap();
    let script = dir.path().join("worker.sh");
    fs::write(
        &script,
        format!(
            "printf '%s\\n' \"$0\" \"$@\" > '{}'/$$.args\n",
            out_dir.display()
        ),
    )
    .unwrap();

    // Run the script through sh: the library-path token is the script path,
    // so the script sees the other eight tokens as $1..$8
    spec.library_path = script.display().to_string();
    let context = WorkerContext::new(
        spec.library_path.clone(),
        ApiCredentials::new(spec.api_job_user_id.clone(), spec.api_access_token.clone()),
    );

    let mut rng = StdRng::seed_from_u64(9);
    let summary = dispatch(
        items.clone(),
        Path::new("/bin/sh"),
        context,
        spec.parallel_processes,
        &mut rng,
    )
    .unwrap();

    assert_eq!(summary.items_dispatched, 32);
    assert_eq!(summary.items_succeeded, 32);
    assert_eq!(summary.launch_failures, 0);

    let mut received = BTreeSet::new();
    for entry in fs::read_dir(&out_dir).unwrap() {
        let text = fs::read_to_string(entry.unwrap().path()).unwrap();
        let argv: Vec<&str> = text.lines().collect();
        let instance = InstanceContext::from_args(&argv).unwrap();

        assert_eq!(instance.credentials.access_token(), "token-with-\\backslash");
        received.insert((
            instance.start_date,
            instance.variant_name,
            instance.symbol,
            instance.resolution,
            instance.parameters["period"].current().to_string(),
        ));
    }

    let expected: BTreeSet<_> = items
        .iter()
        .map(|i| {
            (
                i.start_date,
                i.variant_name.clone(),
                i.symbol.clone(),
                i.resolution,
                i.parameters["period"].to_string(),
            )
        })
        .collect();
    assert_eq!(received, expected);
}

#[test]
fn test_dispatch_missing_worker_counts_failures() {
    let dir = tempfile::tempdir().unwrap();
    let (spec, items) = expand_fixture(dir.path());
    let context = WorkerContext::new(
        spec.library_path.clone(),
        ApiCredentials::new(spec.api_job_user_id.clone(), spec.api_access_token.clone()),
    );

    let mut rng = StdRng::seed_from_u64(1);
    let summary = dispatch(
        items,
        &dir.path().join("no-such-worker"),
        context,
        2,
        &mut rng,
    )
    .unwrap();

    assert_eq!(summary.items_dispatched, 32);
    assert_eq!(summary.launch_failures, 32);
    assert_eq!(summary.items_succeeded, 0);
}
