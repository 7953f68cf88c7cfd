//! CLI help output tests for da-core.
//!
//! These tests verify that all commands and subcommands correctly display
//! their help text without errors.

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;

/// Get a Command for the da-core binary.
fn da_core() -> Command {
    cargo_bin_cmd!("da-core")
}

// ============================================================================
// Top-level Help Tests
// ============================================================================

mod top_level {
    use super::*;

    #[test]
    fn help_flag_works() {
        da_core()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("Device Audit"));
    }

    #[test]
    fn help_subcommand_works() {
        da_core()
            .arg("help")
            .assert()
            .success()
            .stdout(predicate::str::contains("Device Audit"));
    }

    #[test]
    fn version_flag_works() {
        da_core()
            .arg("--version")
            .assert()
            .success()
            .stdout(predicate::str::contains("da-core"));
    }

    #[test]
    fn help_shows_all_commands() {
        let output = da_core().arg("--help").assert().success();

        output
            .stdout(predicate::str::contains("serve"))
            .stdout(predicate::str::contains("devices"))
            .stdout(predicate::str::contains("packages"))
            .stdout(predicate::str::contains("ls"))
            .stdout(predicate::str::contains("cat"))
            .stdout(predicate::str::contains("logs"))
            .stdout(predicate::str::contains("parse"))
            .stdout(predicate::str::contains("schema"))
            .stdout(predicate::str::contains("config"));
    }

    #[test]
    fn help_shows_global_options() {
        da_core()
            .arg("--help")
            .assert()
            .success()
            .stdout(predicate::str::contains("--adb"))
            .stdout(predicate::str::contains("--format"))
            .stdout(predicate::str::contains("--log-format"));
    }

    #[test]
    fn missing_subcommand_is_args_error() {
        da_core().assert().code(10);
    }

    #[test]
    fn unknown_subcommand_is_args_error() {
        da_core().arg("frobnicate").assert().code(10);
    }
}

// ============================================================================
// Subcommand Help Tests
// ============================================================================

mod subcommands {
    use super::*;

    #[test]
    fn every_subcommand_has_help() {
        for cmd in [
            "serve", "devices", "packages", "package", "ls", "cat", "logs", "parse", "schema",
            "config", "version",
        ] {
            da_core().args([cmd, "--help"]).assert().success();
        }
    }

    #[test]
    fn serve_help_lists_overrides() {
        da_core()
            .args(["serve", "--help"])
            .assert()
            .success()
            .stdout(predicate::str::contains("--bind"))
            .stdout(predicate::str::contains("--port"))
            .stdout(predicate::str::contains("--workers"));
    }

    #[test]
    fn parse_help_lists_kinds() {
        da_core()
            .args(["parse", "--help"])
            .assert()
            .success()
            .stdout(predicate::str::contains("listing"))
            .stdout(predicate::str::contains("app-links"))
            .stdout(predicate::str::contains("package-list"));
    }

    #[test]
    fn config_show_help() {
        da_core()
            .args(["config", "show", "--help"])
            .assert()
            .success();
    }

    #[test]
    fn packages_requires_device() {
        da_core().arg("packages").assert().code(10);
    }
}
