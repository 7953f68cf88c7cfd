//! CLI tests for offline parsing, schema output, and configuration.
//!
//! None of these touch a device; commands that would are run with an
//! empty `PATH` to check the error path.

use assert_cmd::cargo::cargo_bin_cmd;
use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::Value;
use tempfile::TempDir;

fn da_core() -> Command {
    let mut cmd = cargo_bin_cmd!("da-core");
    cmd.env_remove("DA_CONFIG")
        .env_remove("ADB_PATH")
        .env_remove("ANDROID_HOME")
        .env_remove("ANDROID_SDK_ROOT")
        .env("HOME", "/nonexistent/home")
        .env("DA_CONFIG_DIR", "/nonexistent/da-config")
        .env("DA_LOG", "error");
    cmd
}

fn stdout_json(cmd: &mut Command) -> Value {
    let output = cmd.assert().success().get_output().stdout.clone();
    serde_json::from_slice(&output).expect("stdout is JSON")
}

const LISTING: &str = "\
total 8
-rw-rw---- 1 u0_a1 sdcard_rw 1024 2023-05-01 10:00 my file.txt
drwxrwx--x 2 u0_a1 sdcard_rw 4096 2023-05-01 10:00 Download
";

mod parse {
    use super::*;

    #[test]
    fn listing_from_stdin() {
        let json = stdout_json(da_core().args(["parse", "listing"]).write_stdin(LISTING));
        let entries = json.as_array().unwrap();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0]["name"], "Download");
        assert_eq!(entries[0]["kind"], "directory");
        assert_eq!(entries[1]["name"], "my file.txt");
        assert_eq!(entries[1]["size"], "1024");
    }

    #[test]
    fn listing_summary_format() {
        da_core()
            .args(["parse", "listing", "--format", "summary"])
            .write_stdin(LISTING)
            .assert()
            .success()
            .stdout(predicate::str::contains("2 entries"));
    }

    #[test]
    fn probe_enriches_listing_file() {
        let dir = TempDir::new().unwrap();
        let listing = dir.path().join("ls.txt");
        let probe = dir.path().join("file.txt");
        std::fs::write(&listing, LISTING).unwrap();
        std::fs::write(&probe, "'my file.txt': ASCII text\n./Download: directory\n").unwrap();

        let json = stdout_json(da_core().args([
            "parse",
            "probe",
            "--input",
            probe.to_str().unwrap(),
            "--listing",
            listing.to_str().unwrap(),
        ]));
        let entries = json.as_array().unwrap();
        assert!(entries[0].get("content_hint").is_none());
        assert_eq!(entries[1]["content_hint"], "ASCII text");
    }

    #[test]
    fn probe_alone_prints_descriptions() {
        let json = stdout_json(
            da_core()
                .args(["parse", "probe"])
                .write_stdin("./a.so: ELF shared object\n\"b c\": data\n"),
        );
        assert_eq!(json["a.so"], "ELF shared object");
        assert_eq!(json["b c"], "data");
    }

    #[test]
    fn app_links_classification() {
        let text = "Domain verification state:\n  example.com: 1024\n  example.org: 1\nUser 0:\n  Disabled:\n    example.com\n";
        let json = stdout_json(da_core().args(["parse", "app-links"]).write_stdin(text));
        let domains = json["domains"].as_array().unwrap();
        assert_eq!(domains[0]["severity"], "blocked");
        assert_eq!(domains[0]["user_disabled"], true);
        assert_eq!(domains[1]["severity"], "ok");
    }

    #[test]
    fn package_defaults() {
        let json = stdout_json(
            da_core()
                .args(["parse", "package"])
                .write_stdin("versionName=2.3.1\n"),
        );
        assert_eq!(json["version_name"], "2.3.1");
        assert_eq!(json["version_code"], "Unknown");
        assert_eq!(json["requested_permissions"], serde_json::json!([]));
    }

    #[test]
    fn devices_and_package_list() {
        let json = stdout_json(
            da_core()
                .args(["parse", "devices"])
                .write_stdin("List of devices attached\nemulator-5554\tdevice\n"),
        );
        assert_eq!(json[0]["id"], "emulator-5554");

        let json = stdout_json(
            da_core()
                .args(["parse", "package-list"])
                .write_stdin("package:com.a\npackage:com.b\n"),
        );
        assert_eq!(json, serde_json::json!(["com.a", "com.b"]));
    }

    #[test]
    fn missing_input_file_is_args_error() {
        da_core()
            .args(["parse", "listing", "--input", "/nonexistent/ls.txt"])
            .assert()
            .code(10)
            .stderr(predicate::str::contains("input file not found"));
    }

    #[test]
    fn listing_flag_only_for_probe() {
        da_core()
            .args(["parse", "listing", "--listing", "/tmp/x"])
            .write_stdin("")
            .assert()
            .code(10);
    }

    #[test]
    fn unknown_kind_is_rejected() {
        da_core().args(["parse", "bogus"]).assert().code(10);
    }
}

mod schema {
    use super::*;

    #[test]
    fn list_schemas() {
        let json = stdout_json(da_core().args(["schema", "--list"]));
        let names: Vec<&str> = json
            .as_array()
            .unwrap()
            .iter()
            .map(|v| v["name"].as_str().unwrap())
            .collect();
        assert!(names.contains(&"PackageSecurityProfile"));
        assert!(names.contains(&"FileListingResponse"));
    }

    #[test]
    fn single_schema() {
        let json = stdout_json(da_core().args(["schema", "FileEntry"]));
        assert!(json["properties"]["name"].is_object());
    }

    #[test]
    fn unknown_schema_is_args_error() {
        da_core()
            .args(["schema", "NoSuchType"])
            .assert()
            .code(10)
            .stderr(predicate::str::contains("unknown schema type"));
    }
}

mod config {
    use super::*;

    #[test]
    fn show_defaults() {
        let json = stdout_json(da_core().args(["config", "show", "--adb", "adb"]));
        assert_eq!(json["config"]["port"], 8000);
        assert_eq!(json["config"]["bind"], "127.0.0.1");
        assert_eq!(json["config_path"], Value::Null);
        assert_eq!(json["adb"]["source"], "cli");
    }

    #[test]
    fn show_loaded_file() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"port": 9100, "workers": 2}"#).unwrap();

        let json = stdout_json(da_core().args(["config", "show", "--config", path.to_str().unwrap()]));
        assert_eq!(json["config"]["port"], 9100);
        assert_eq!(json["config"]["workers"], 2);
        assert_eq!(json["config_hash"].as_str().unwrap().len(), 64);
    }

    #[test]
    fn invalid_config_is_config_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"port": 0}"#).unwrap();

        da_core()
            .args(["config", "show", "--config", path.to_str().unwrap()])
            .assert()
            .code(14);
    }

    #[test]
    fn missing_config_file_is_config_error() {
        da_core()
            .args(["config", "show", "--config", "/nonexistent/config.json"])
            .assert()
            .code(14);
    }
}

mod device_commands {
    use super::*;

    /// A command whose PATH holds no adb.
    fn without_adb(dir: &TempDir) -> Command {
        let mut cmd = da_core();
        cmd.env("PATH", dir.path());
        cmd
    }

    #[test]
    fn missing_adb_is_capability_error() {
        let empty = TempDir::new().unwrap();
        without_adb(&empty)
            .args(["packages", "emulator-5554"])
            .assert()
            .code(11)
            .stderr(predicate::str::contains("\"code\":20"));
    }

    #[test]
    fn invalid_device_id_is_args_error() {
        let empty = TempDir::new().unwrap();
        without_adb(&empty)
            .args(["packages", "bad;id"])
            .assert()
            .code(10);
    }

    #[test]
    fn devices_without_adb_is_empty() {
        let empty = TempDir::new().unwrap();
        let json = stdout_json(without_adb(&empty).arg("devices"));
        assert_eq!(json["devices"], serde_json::json!([]));
    }

    #[test]
    fn version_json() {
        let json = stdout_json(da_core().arg("version"));
        assert_eq!(json["da_core_version"], env!("CARGO_PKG_VERSION"));
    }
}
