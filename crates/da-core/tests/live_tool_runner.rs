//! Live-system integration tests for ToolRunner.
//!
//! These tests use real commands and avoid mocks/fakes. They are gated by
//! command availability so they can skip safely on minimal environments.

use da_core::collect::{ToolError, ToolRunnerBuilder, ToolSpec};
use std::path::Path;
use std::time::Duration;

fn command_exists(cmd: &str) -> bool {
    if cmd.contains('/') {
        return Path::new(cmd).exists();
    }

    let Ok(path) = std::env::var("PATH") else {
        return false;
    };

    for dir in path.split(':') {
        if dir.is_empty() {
            continue;
        }
        let candidate = Path::new(dir).join(cmd);
        if candidate.exists() {
            return true;
        }
    }

    false
}

#[test]
fn live_tool_runner_true() {
    if !command_exists("true") {
        eprintln!("skipping: true not found in PATH");
        return;
    }

    let runner = ToolRunnerBuilder::new().build();
    let output = runner.run_tool("true", &[], None).expect("run true");
    assert!(output.success());
    assert!(!output.timed_out);
}

#[test]
fn live_tool_runner_false() {
    if !command_exists("false") {
        eprintln!("skipping: false not found in PATH");
        return;
    }

    let runner = ToolRunnerBuilder::new().build();
    let output = runner.run_tool("false", &[], None).expect("run false");
    assert!(!output.success());
    assert_eq!(output.exit_code, Some(1));
}

#[test]
fn live_tool_runner_timeout() {
    if !command_exists("sleep") {
        eprintln!("skipping: sleep not found in PATH");
        return;
    }

    let runner = ToolRunnerBuilder::new()
        .timeout(Duration::from_millis(100))
        .build();

    let output = runner.run_tool("sleep", &["5"], None).expect("run sleep");
    assert!(output.timed_out);
}

#[test]
#[cfg(unix)]
fn live_tool_runner_output_truncation() {
    if !command_exists("head") {
        eprintln!("skipping: head not found in PATH");
        return;
    }
    if !Path::new("/dev/zero").exists() {
        eprintln!("skipping: /dev/zero not available");
        return;
    }

    let runner = ToolRunnerBuilder::new()
        .max_output(128)
        .build();

    let result = runner.run_tool("head", &["-c", "1024", "/dev/zero"], None);
    match result {
        Ok(output) => {
            assert!(output.truncated, "expected truncation");
            assert!(output.stdout.len() <= 128);
        }
        Err(ToolError::CommandNotFound(_)) => {
            eprintln!("skipping: head not executable");
        }
        Err(err) => panic!("unexpected error: {err:?}"),
    }
}

#[test]
fn live_tool_runner_spec_timeout_override() {
    if !command_exists("sleep") {
        eprintln!("skipping: sleep not found in PATH");
        return;
    }

    let runner = ToolRunnerBuilder::new()
        .timeout(Duration::from_secs(30))
        .build();
    let spec = ToolSpec::new("sleep", vec!["5".to_string()])
        .with_timeout(Duration::from_millis(100));

    let started = std::time::Instant::now();
    let output = runner.run(&spec).expect("run sleep");
    assert!(output.timed_out);
    assert!(output.exit_code.is_none() || !output.success());
    assert!(started.elapsed() < Duration::from_secs(5));
}

#[test]
fn live_tool_runner_missing_command() {
    let runner = ToolRunnerBuilder::new().build();
    let result = runner.run_tool("da-definitely-not-a-command", &[], None);
    assert!(matches!(result, Err(ToolError::CommandNotFound(_))));
}
