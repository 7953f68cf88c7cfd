//! Device-bridge client: builds `adb` argument vectors and maps runner
//! results onto [`da_common::Error`].
//!
//! Commands addressed to one device take the form
//! `adb -s <device> shell <line>`. The device shell re-splits `<line>`, so
//! anything interpolated into it (paths, log queries) is single-quoted with
//! [`shell_quote`].

use super::tool_runner::{ToolError, ToolOutput, ToolRunner, ToolRunnerBuilder, ToolSpec};
use da_common::{DeviceId, DevicePath, Error, PackageName, Result};
use std::path::PathBuf;
use std::time::Duration;
use tracing::{debug, warn};

/// Immutable bridge settings, resolved once at startup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdbConfig {
    pub executable: PathBuf,
    pub timeout: Duration,
    pub max_output_bytes: usize,
}

impl Default for AdbConfig {
    fn default() -> Self {
        Self {
            executable: PathBuf::from("adb"),
            timeout: Duration::from_secs(super::tool_runner::DEFAULT_TIMEOUT_SECS),
            max_output_bytes: super::tool_runner::DEFAULT_MAX_OUTPUT_BYTES,
        }
    }
}

/// How stdout is handed back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputMode {
    /// Lossy UTF-8, trimmed.
    Text,
    /// Raw bytes, untouched.
    Binary,
}

/// Whether a non-zero exit is an error.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExitCheck {
    Required,
    Ignored,
}

/// Captured stdout in the requested [`OutputMode`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BridgeOutput {
    Text(String),
    Binary(Vec<u8>),
}

impl BridgeOutput {
    pub fn into_text(self) -> String {
        match self {
            BridgeOutput::Text(s) => s,
            BridgeOutput::Binary(b) => String::from_utf8_lossy(&b).trim().to_string(),
        }
    }

    pub fn into_bytes(self) -> Vec<u8> {
        match self {
            BridgeOutput::Text(s) => s.into_bytes(),
            BridgeOutput::Binary(b) => b,
        }
    }
}

/// Single-quote `s` for a POSIX shell. Embedded quotes become `'\''`.
pub fn shell_quote(s: &str) -> String {
    format!("'{}'", s.replace('\'', r"'\''"))
}

#[derive(Debug, Clone)]
pub struct AdbClient {
    config: AdbConfig,
    runner: ToolRunner,
}

impl AdbClient {
    pub fn new(config: AdbConfig) -> Self {
        let runner = ToolRunnerBuilder::new()
            .timeout(config.timeout)
            .max_output(config.max_output_bytes)
            .build();
        Self { config, runner }
    }

    pub fn config(&self) -> &AdbConfig {
        &self.config
    }

    fn executable(&self) -> String {
        self.config.executable.to_string_lossy().into_owned()
    }

    /// Run `adb <args>` and return stdout in `mode`.
    pub fn run(&self, args: Vec<String>, mode: OutputMode, check: ExitCheck) -> Result<BridgeOutput> {
        let command = self.executable();
        let shown = format!("adb {}", args.join(" "));
        let spec = ToolSpec::new(command.clone(), args);

        let output = self.runner.run(&spec).map_err(|e| match e {
            ToolError::CommandNotFound(path) => Error::AdbNotFound { path },
            ToolError::InvalidPath(_) => Error::AdbNotFound { path: command.clone() },
            other => Error::CommandFailed {
                command: shown.clone(),
                detail: other.to_string(),
            },
        })?;

        if output.timed_out {
            return Err(Error::CommandTimeout {
                seconds: self.config.timeout.as_secs().max(1),
            });
        }
        if check == ExitCheck::Required && !output.success() {
            return Err(Error::CommandFailed {
                command: shown,
                detail: failure_detail(&output),
            });
        }
        if output.truncated {
            if mode == OutputMode::Binary {
                return Err(Error::OutputTruncated {
                    limit: self.config.max_output_bytes,
                });
            }
            warn!(command = %shown, limit = self.config.max_output_bytes, "output truncated");
        }

        debug!(command = %shown, bytes = output.stdout.len(), "bridge command complete");
        Ok(match mode {
            OutputMode::Text => BridgeOutput::Text(output.stdout_str().trim().to_string()),
            OutputMode::Binary => BridgeOutput::Binary(output.stdout),
        })
    }

    pub fn run_text(&self, args: Vec<String>, check: ExitCheck) -> Result<String> {
        Ok(self.run(args, OutputMode::Text, check)?.into_text())
    }

    /// `adb -s <device> shell <line>` in text mode.
    pub fn shell_text(&self, device: &DeviceId, line: String, check: ExitCheck) -> Result<String> {
        self.run_text(shell_args(device, line), check)
    }

    /// `adb devices`
    pub fn devices(&self) -> Result<String> {
        self.run_text(vec!["devices".to_string()], ExitCheck::Required)
    }

    /// `pm list packages`
    pub fn list_packages(&self, device: &DeviceId) -> Result<String> {
        self.shell_text(device, "pm list packages".to_string(), ExitCheck::Required)
    }

    /// Full `dumpsys package` for every package.
    pub fn dump_all_packages(&self, device: &DeviceId) -> Result<String> {
        self.shell_text(device, "dumpsys package".to_string(), ExitCheck::Required)
    }

    /// `dumpsys package <name>`
    pub fn dump_package(&self, device: &DeviceId, package: &PackageName) -> Result<String> {
        self.shell_text(
            device,
            format!("dumpsys package {}", package.as_str()),
            ExitCheck::Required,
        )
    }

    /// `pm get-app-links --user 0 <name>`; stdout is kept on a non-zero exit.
    ///
    /// Without `--user` the device prints a selection block per user and
    /// another user's `Disabled:` list would be read as user 0's.
    pub fn app_links(&self, device: &DeviceId, package: &PackageName) -> Result<String> {
        self.shell_text(
            device,
            format!("pm get-app-links --user 0 {}", package.as_str()),
            ExitCheck::Ignored,
        )
    }

    /// `ls -l <path>`; a non-zero exit still carries useful stdout.
    pub fn list_dir(&self, device: &DeviceId, path: &DevicePath) -> Result<String> {
        self.shell_text(
            device,
            format!("ls -l {}", shell_quote(path.as_str())),
            ExitCheck::Ignored,
        )
    }

    /// `file *` run inside `path`.
    pub fn probe_dir(&self, device: &DeviceId, path: &DevicePath) -> Result<String> {
        self.shell_text(
            device,
            format!("cd {} && file *", shell_quote(path.as_str())),
            ExitCheck::Ignored,
        )
    }

    /// Raw bytes of `cat <path>`.
    pub fn read_file(&self, device: &DeviceId, path: &DevicePath) -> Result<Vec<u8>> {
        let args = shell_args(device, format!("cat {}", shell_quote(path.as_str())));
        Ok(self.run(args, OutputMode::Binary, ExitCheck::Required)?.into_bytes())
    }

    /// Log buffer dump filtered by `query` on the device.
    pub fn logcat(&self, device: &DeviceId, query: &str) -> Result<String> {
        self.shell_text(
            device,
            format!("logcat -d | grep {}", shell_quote(query)),
            ExitCheck::Ignored,
        )
    }
}

/// `-s <device> shell <line>`
pub fn shell_args(device: &DeviceId, line: String) -> Vec<String> {
    vec![
        "-s".to_string(),
        device.as_str().to_string(),
        "shell".to_string(),
        line,
    ]
}

fn failure_detail(output: &ToolOutput) -> String {
    let stderr = output.stderr_str();
    let stderr = stderr.trim();
    if stderr.is_empty() {
        output.exit_description()
    } else {
        stderr.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shell_quote() {
        assert_eq!(shell_quote("/sdcard"), "'/sdcard'");
        assert_eq!(shell_quote("my dir"), "'my dir'");
        assert_eq!(shell_quote("it's"), r"'it'\''s'");
        assert_eq!(shell_quote("$(reboot)"), "'$(reboot)'");
        assert_eq!(shell_quote(""), "''");
    }

    #[test]
    fn test_shell_args() {
        let device = DeviceId::parse("emulator-5554").unwrap();
        assert_eq!(
            shell_args(&device, "ls -l '/sdcard'".to_string()),
            vec!["-s", "emulator-5554", "shell", "ls -l '/sdcard'"]
        );
    }

    #[test]
    fn test_bridge_output_conversions() {
        assert_eq!(BridgeOutput::Binary(b"  x \n".to_vec()).into_text(), "x");
        assert_eq!(BridgeOutput::Text("abc".into()).into_bytes(), b"abc".to_vec());
    }

    #[test]
    fn test_missing_executable_maps_to_adb_not_found() {
        let client = AdbClient::new(AdbConfig {
            executable: PathBuf::from("/nonexistent/platform-tools/adb"),
            ..AdbConfig::default()
        });
        match client.devices() {
            Err(Error::AdbNotFound { path }) => {
                assert_eq!(path, "/nonexistent/platform-tools/adb")
            }
            other => panic!("expected AdbNotFound, got {:?}", other),
        }
    }

    #[cfg(unix)]
    #[test]
    fn test_exit_check_modes() {
        // `false` ignores its arguments and exits 1.
        let client = AdbClient::new(AdbConfig {
            executable: PathBuf::from("false"),
            ..AdbConfig::default()
        });
        assert!(matches!(
            client.run_text(vec!["devices".into()], ExitCheck::Required),
            Err(Error::CommandFailed { .. })
        ));
        assert_eq!(
            client
                .run_text(vec!["devices".into()], ExitCheck::Ignored)
                .unwrap(),
            ""
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_app_links_targets_user_zero() {
        let client = AdbClient::new(AdbConfig {
            executable: PathBuf::from("echo"),
            ..AdbConfig::default()
        });
        let device = DeviceId::parse("emulator-5554").unwrap();
        let package = PackageName::parse("com.example.app").unwrap();
        assert_eq!(
            client.app_links(&device, &package).unwrap(),
            "-s emulator-5554 shell pm get-app-links --user 0 com.example.app"
        );
    }

    #[cfg(unix)]
    #[test]
    fn test_app_links_ignores_exit_status() {
        let client = AdbClient::new(AdbConfig {
            executable: PathBuf::from("false"),
            ..AdbConfig::default()
        });
        let device = DeviceId::parse("emulator-5554").unwrap();
        let package = PackageName::parse("com.example.app").unwrap();
        assert_eq!(client.app_links(&device, &package).unwrap(), "");
    }

    #[cfg(unix)]
    #[test]
    fn test_text_mode_trims_and_binary_is_raw() {
        let client = AdbClient::new(AdbConfig {
            executable: PathBuf::from("echo"),
            ..AdbConfig::default()
        });
        let text = client
            .run_text(vec!["  hello ".into()], ExitCheck::Required)
            .unwrap();
        assert_eq!(text, "hello");

        let bytes = client
            .run(vec!["raw".into()], OutputMode::Binary, ExitCheck::Required)
            .unwrap()
            .into_bytes();
        assert_eq!(bytes, b"raw\n".to_vec());
    }
}
