//! Integration Tests for the Worker Binary
//!
//! Runs the real `batch-instance` executable against a temporary library
//! with a configuration template.

#![allow(clippy::unwrap_used, clippy::expect_used)]

use std::fs;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Output, Stdio};

use batch_launcher::codec::{parse_command_line, render_command_line};

const TEMPLATE: &str = r#"{
    // engine defaults
    "environment": "live",
    "log-handler": "QuantConnect.Logging.CompositeLogHandler",
    "debugging": false
}"#;

struct Fixture {
    dir: tempfile::TempDir,
}

impl Fixture {
    fn new() -> Self {
        let dir = tempfile::tempdir().unwrap();
        fs::create_dir_all(dir.path().join("library/Launcher")).unwrap();
        fs::write(dir.path().join("library/Launcher/config.json"), TEMPLATE).unwrap();
        Self { dir }
    }

    fn library(&self) -> PathBuf {
        self.dir.path().join("library")
    }

    fn work_root(&self) -> PathBuf {
        self.dir.path().join("work")
    }

    fn instance_dir(&self, pid: u32) -> PathBuf {
        self.work_root().join(format!("instance-{pid}"))
    }

    fn config_path(&self, pid: u32) -> PathBuf {
        self.instance_dir(pid).join("config.json")
    }

    fn tokens(&self) -> Vec<String> {
        self.tokens_for("SPY")
    }

    fn tokens_for(&self, symbol: &str) -> Vec<String> {
        vec![
            self.library().display().to_string(),
            "12345".to_string(),
            "secret \"token\"".to_string(),
            "2020-03-15".to_string(),
            "2020-07-01".to_string(),
            "Momentum".to_string(),
            symbol.to_string(),
            "5".to_string(),
            r#"{"period":{"start":10.0,"end":30.0,"step":10.0,"current":20.0}}"#.to_string(),
        ]
    }

    fn spawn(&self, args: &[String], engine_command: Option<&str>) -> Child {
        let mut command = Command::new(env!("CARGO_BIN_EXE_batch-instance"));
        command
            .args(args)
            .env("BATCH_LOCK_DIR", self.dir.path().join("locks"))
            .env("BATCH_INSTANCE_WORK_DIR", self.work_root())
            .env("NO_COLOR", "1")
            .current_dir(self.dir.path())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        match engine_command {
            Some(line) => command.env("BATCH_ENGINE_COMMAND", line),
            None => command.env_remove("BATCH_ENGINE_COMMAND"),
        };

        command.spawn().unwrap()
    }

    /// Run the worker to completion, returning its process id and output.
    fn run(&self, args: &[String], engine_command: Option<&str>) -> (u32, Output) {
        let child = self.spawn(args, engine_command);
        let pid = child.id();
        (pid, child.wait_with_output().unwrap())
    }
}

/// Encode tokens the way the launcher does and split them again.
fn encoded_argv(tokens: &[String]) -> Vec<String> {
    parse_command_line(&render_command_line(tokens))
}

fn read_json(path: &Path) -> serde_json::Value {
    serde_json::from_str(&fs::read_to_string(path).unwrap()).unwrap()
}

#[test]
fn test_prepares_engine_configuration() {
    let fixture = Fixture::new();

    let (pid, output) = fixture.run(&encoded_argv(&fixture.tokens()), None);
    assert!(
        output.status.success(),
        "stderr: {}",
        String::from_utf8_lossy(&output.stderr)
    );

    let config = read_json(&fixture.config_path(pid));
    assert_eq!(config["environment"], "backtesting");
    assert_eq!(config["log-handler"], "QuantConnect.Logging.CompositeLogHandler");
    assert_eq!(config["debugging"], false);
    assert_eq!(config["algorithm-type-name"], "BasicTemplateFrameworkAlgorithm");
    assert_eq!(config["job-user-id"], "12345");
    assert_eq!(config["api-access-token"], "secret \"token\"");
    assert_eq!(config["LBL-start-date"], "2020-03-15");
    assert_eq!(config["LBL-end-date"], "2020-07-01");
    assert_eq!(config["LBL-alpha-model-name"], "Momentum");
    assert_eq!(config["LBL-symbol"], "SPY");
    assert_eq!(config["LBL-minute-resolution"], "5");
    assert_eq!(config["period"], "20");
    assert!(fixture.dir.path().join("locks/config.lock").exists());
}

#[cfg(unix)]
#[test]
fn test_engine_runs_in_worker_dir_and_exit_code_propagates() {
    let fixture = Fixture::new();

    let (pid, output) = fixture.run(
        &encoded_argv(&fixture.tokens()),
        Some(r#"/bin/sh -c "pwd > engine.cwd; exit 3""#),
    );

    assert_eq!(output.status.code(), Some(3));
    let cwd = fs::read_to_string(fixture.instance_dir(pid).join("engine.cwd")).unwrap();
    assert!(cwd.trim_end().ends_with(&format!("instance-{pid}")));
}

#[cfg(unix)]
#[test]
fn test_overlapping_workers_each_read_their_own_config() {
    let fixture = Fixture::new();
    // The engine reads its configuration only after the other worker has
    // prepared its own
    let engine = r#"/bin/sh -c "sleep 1; cat config.json > engine.seen""#;

    let first = fixture.spawn(&encoded_argv(&fixture.tokens_for("AAA")), Some(engine));
    std::thread::sleep(std::time::Duration::from_millis(300));
    let second = fixture.spawn(&encoded_argv(&fixture.tokens_for("BBB")), Some(engine));

    for (child, symbol) in [(first, "AAA"), (second, "BBB")] {
        let pid = child.id();
        let output = child.wait_with_output().unwrap();
        assert!(
            output.status.success(),
            "stderr: {}",
            String::from_utf8_lossy(&output.stderr)
        );

        let seen = read_json(&fixture.instance_dir(pid).join("engine.seen"));
        assert_eq!(seen["LBL-symbol"], symbol);
    }
}

#[test]
fn test_rejects_wrong_argument_count() {
    let fixture = Fixture::new();

    let (pid, output) = fixture.run(&["only-one".to_string()], None);

    assert!(!output.status.success());
    assert!(!fixture.config_path(pid).exists());
}

#[test]
fn test_missing_template_fails() {
    let fixture = Fixture::new();
    fs::remove_file(fixture.library().join("Launcher/config.json")).unwrap();

    let (_, output) = fixture.run(&encoded_argv(&fixture.tokens()), None);

    assert!(!output.status.success());
    assert!(
        String::from_utf8_lossy(&output.stderr).contains("preparing engine configuration")
    );
}
