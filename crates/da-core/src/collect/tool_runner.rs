//! Bounded execution of the device-bridge executable.
//!
//! Every bridge invocation goes through [`ToolRunner`]:
//!
//! - stdin is closed, stdout and stderr are captured
//! - per-command timeout with SIGTERM → SIGKILL escalation
//! - per-stream output cap; the excess is drained and discarded
//!
//! Failed commands are never retried.
//!
//! # Example
//!
//! ```ignore
//! use da_core::collect::tool_runner::ToolRunnerBuilder;
//! use std::time::Duration;
//!
//! let runner = ToolRunnerBuilder::new().timeout(Duration::from_secs(10)).build();
//! let output = runner.run_tool("adb", &["devices"], None)?;
//! println!("{}", output.stdout_str());
//! ```

use serde::{Deserialize, Serialize};
use std::io::Read;
use std::path::Path;
use std::process::{Child, Command, Stdio};
use std::thread;
use std::time::{Duration, Instant};
use thiserror::Error;
use tracing::{debug, error, info, instrument, trace, warn};

/// Default timeout per command in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Default maximum output size per stream in bytes (64 MiB).
///
/// File reads stream whole device files through stdout, so this is much
/// larger than a listing or dump ever needs.
pub const DEFAULT_MAX_OUTPUT_BYTES: usize = 64 * 1024 * 1024;

/// Grace period between SIGTERM and SIGKILL in milliseconds.
const SIGTERM_GRACE_MS: u64 = 500;

const CHUNK_SIZE: usize = 8192;

/// Errors that can occur during tool execution.
#[derive(Debug, Error)]
pub enum ToolError {
    #[error("command not found: {0}")]
    CommandNotFound(String),

    #[error("command failed to spawn: {0}")]
    SpawnFailed(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid command path: {0}")]
    InvalidPath(String),
}

/// Output from a tool execution.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolOutput {
    /// Command that was executed.
    pub command: String,

    /// Arguments passed to the command.
    pub args: Vec<String>,

    /// Standard output (may be truncated).
    pub stdout: Vec<u8>,

    /// Standard error (may be truncated).
    pub stderr: Vec<u8>,

    /// Exit code; `None` when killed by a signal.
    pub exit_code: Option<i32>,

    /// Whether either stream hit the output cap.
    pub truncated: bool,

    /// Execution duration.
    #[serde(with = "duration_ms")]
    pub duration: Duration,

    /// Whether the command timed out.
    pub timed_out: bool,
}

impl ToolOutput {
    /// Stdout as lossy UTF-8.
    pub fn stdout_str(&self) -> String {
        String::from_utf8_lossy(&self.stdout).to_string()
    }

    /// Stderr as lossy UTF-8.
    pub fn stderr_str(&self) -> String {
        String::from_utf8_lossy(&self.stderr).to_string()
    }

    /// Check if the command succeeded (exit code 0).
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }

    /// Human description of how the command ended.
    pub fn exit_description(&self) -> String {
        if self.timed_out {
            return format!("timed out after {}ms", self.duration.as_millis());
        }
        match self.exit_code {
            Some(code) => format!("exit status {}", code),
            None => "terminated by signal".to_string(),
        }
    }
}

/// Configuration for the tool runner.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolConfig {
    /// Default timeout per command.
    #[serde(with = "duration_ms")]
    pub default_timeout: Duration,

    /// Maximum output size per stream in bytes.
    pub max_output_bytes: usize,
}

impl Default for ToolConfig {
    fn default() -> Self {
        Self {
            default_timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
            max_output_bytes: DEFAULT_MAX_OUTPUT_BYTES,
        }
    }
}

/// One tool invocation: command, arguments, and per-call limits.
#[derive(Debug, Clone)]
pub struct ToolSpec {
    /// Command to execute.
    pub command: String,

    /// Arguments to pass.
    pub args: Vec<String>,

    /// Override timeout (None = use default).
    pub timeout: Option<Duration>,

    /// Override max output (None = use default).
    pub max_output: Option<usize>,
}

impl ToolSpec {
    pub fn new(command: impl Into<String>, args: Vec<String>) -> Self {
        Self {
            command: command.into(),
            args,
            timeout: None,
            max_output: None,
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_max_output(mut self, max_output: usize) -> Self {
        self.max_output = Some(max_output);
        self
    }
}

/// Runs external commands under [`ToolConfig`] limits.
#[derive(Debug, Clone, Default)]
pub struct ToolRunner {
    config: ToolConfig,
}

struct Captured {
    stdout: Vec<u8>,
    stderr: Vec<u8>,
    exit_code: Option<i32>,
    truncated: bool,
    timed_out: bool,
}

impl ToolRunner {
    pub fn new(config: ToolConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ToolConfig {
        &self.config
    }

    /// Run a single command.
    #[instrument(skip(self), fields(cmd = %cmd))]
    pub fn run_tool(
        &self,
        cmd: &str,
        args: &[&str],
        timeout: Option<Duration>,
    ) -> Result<ToolOutput, ToolError> {
        let spec = ToolSpec {
            command: cmd.to_string(),
            args: args.iter().map(|s| s.to_string()).collect(),
            timeout,
            max_output: None,
        };
        self.run(&spec)
    }

    /// Run the command described by `spec`.
    #[instrument(skip(self), fields(cmd = %spec.command))]
    pub fn run(&self, spec: &ToolSpec) -> Result<ToolOutput, ToolError> {
        validate_command(&spec.command)?;

        let timeout = spec.timeout.unwrap_or(self.config.default_timeout);
        let max_output = spec.max_output.unwrap_or(self.config.max_output_bytes);

        debug!(
            command = %spec.command,
            args = ?spec.args,
            timeout_ms = timeout.as_millis(),
            max_output,
            "running tool"
        );

        let start = Instant::now();

        let mut child = match Command::new(&spec.command)
            .args(&spec.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
        {
            Ok(child) => child,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                warn!(command = %spec.command, "command not found");
                return Err(ToolError::CommandNotFound(spec.command.clone()));
            }
            Err(e) => {
                error!(command = %spec.command, error = %e, "failed to spawn");
                return Err(ToolError::SpawnFailed(e.to_string()));
            }
        };

        let captured = execute_with_timeout(&mut child, timeout, max_output)?;
        let duration = start.elapsed();

        info!(
            command = %spec.command,
            duration_ms = duration.as_millis() as u64,
            exit_code = ?captured.exit_code,
            truncated = captured.truncated,
            timed_out = captured.timed_out,
            "tool execution complete"
        );

        Ok(ToolOutput {
            command: spec.command.clone(),
            args: spec.args.clone(),
            stdout: captured.stdout,
            stderr: captured.stderr,
            exit_code: captured.exit_code,
            truncated: captured.truncated,
            duration,
            timed_out: captured.timed_out,
        })
    }
}

/// Reject commands that could only be the result of injection, and absolute
/// paths that do not exist.
fn validate_command(cmd: &str) -> Result<(), ToolError> {
    if cmd.is_empty() {
        return Err(ToolError::InvalidPath("empty command".to_string()));
    }
    if cmd.contains(['|', '&', ';', '$', '`', '\n', '\r']) {
        return Err(ToolError::InvalidPath(format!(
            "command contains shell metacharacters: {}",
            cmd
        )));
    }
    if Path::new(cmd).is_absolute() && !Path::new(cmd).exists() {
        return Err(ToolError::CommandNotFound(cmd.to_string()));
    }
    Ok(())
}

/// Append `chunk` to `buf` up to `max` bytes; anything beyond is discarded.
fn push_capped(buf: &mut Vec<u8>, chunk: &[u8], max: usize, truncated: &mut bool) {
    let space = max.saturating_sub(buf.len());
    let to_copy = chunk.len().min(space);
    buf.extend_from_slice(&chunk[..to_copy]);
    if chunk.len() > space {
        *truncated = true;
    }
}

fn execute_with_timeout(
    child: &mut Child,
    timeout: Duration,
    max_output: usize,
) -> Result<Captured, ToolError> {
    let deadline = Instant::now() + timeout;
    let mut stdout_buf = Vec::with_capacity(max_output.min(65536));
    let mut stderr_buf = Vec::with_capacity(max_output.min(65536));
    let mut truncated = false;

    let mut stdout = child.stdout.take();
    let mut stderr = child.stderr.take();
    let mut chunk = vec![0u8; CHUNK_SIZE];

    loop {
        if Instant::now() >= deadline {
            warn!(timeout_ms = timeout.as_millis(), "command timed out, sending SIGTERM");
            kill_with_grace(child);
            let exit_code = child.wait().ok().and_then(|s| s.code());
            return Ok(Captured {
                stdout: stdout_buf,
                stderr: stderr_buf,
                exit_code,
                truncated,
                timed_out: true,
            });
        }

        let mut did_read = false;

        if let Some(ref mut out) = stdout {
            if let Ok(n) = try_read_nonblocking(out, &mut chunk) {
                if n > 0 {
                    did_read = true;
                    push_capped(&mut stdout_buf, &chunk[..n], max_output, &mut truncated);
                }
            }
        }

        if let Some(ref mut err) = stderr {
            if let Ok(n) = try_read_nonblocking(err, &mut chunk) {
                if n > 0 {
                    did_read = true;
                    push_capped(&mut stderr_buf, &chunk[..n], max_output, &mut truncated);
                }
            }
        }

        match child.try_wait() {
            Ok(Some(status)) => {
                if let Some(ref mut out) = stdout {
                    let _ = drain_to_limit(out, &mut stdout_buf, max_output, &mut truncated);
                }
                if let Some(ref mut err) = stderr {
                    let _ = drain_to_limit(err, &mut stderr_buf, max_output, &mut truncated);
                }

                let exit_code = status.code();
                trace!(exit_code = ?exit_code, "process exited");
                return Ok(Captured {
                    stdout: stdout_buf,
                    stderr: stderr_buf,
                    exit_code,
                    truncated,
                    timed_out: false,
                });
            }
            Ok(None) => {
                if !did_read {
                    thread::sleep(Duration::from_millis(10));
                }
            }
            Err(e) => {
                error!(error = %e, "failed to wait for child");
                return Err(ToolError::Io(e));
            }
        }
    }
}

/// Drain what is immediately available from a stream after the child exits.
///
/// Non-blocking so a grandchild holding the pipe open (the adb server it
/// may fork) cannot hang the caller.
#[cfg(unix)]
fn drain_to_limit<R: Read + std::os::unix::io::AsRawFd>(
    stream: &mut R,
    buf: &mut Vec<u8>,
    max: usize,
    truncated: &mut bool,
) -> std::io::Result<()> {
    let mut chunk = vec![0u8; CHUNK_SIZE];
    loop {
        match try_read_nonblocking(stream, &mut chunk) {
            Ok(0) => break,
            Ok(n) => push_capped(buf, &chunk[..n], max, truncated),
            Err(e) => return Err(e),
        }
    }
    Ok(())
}

#[cfg(not(unix))]
fn drain_to_limit(
    stream: &mut impl Read,
    buf: &mut Vec<u8>,
    max: usize,
    truncated: &mut bool,
) -> std::io::Result<()> {
    let mut chunk = vec![0u8; CHUNK_SIZE];
    loop {
        let n = stream.read(&mut chunk)?;
        if n == 0 {
            break;
        }
        push_capped(buf, &chunk[..n], max, truncated);
    }
    Ok(())
}

/// Kill a process with SIGTERM, then SIGKILL after the grace period.
#[cfg(unix)]
fn kill_with_grace(child: &mut Child) {
    let pid = child.id() as i32;

    unsafe {
        libc::kill(pid, libc::SIGTERM);
    }
    debug!(pid, "sent SIGTERM");

    let grace_deadline = Instant::now() + Duration::from_millis(SIGTERM_GRACE_MS);
    while Instant::now() < grace_deadline {
        match child.try_wait() {
            Ok(Some(_)) => {
                trace!(pid, "process exited after SIGTERM");
                return;
            }
            Ok(None) => thread::sleep(Duration::from_millis(10)),
            Err(e) => {
                error!(pid, error = %e, "failed to check process status");
                return;
            }
        }
    }

    warn!(pid, "process did not exit after SIGTERM, sending SIGKILL");
    unsafe {
        libc::kill(pid, libc::SIGKILL);
    }
}

#[cfg(not(unix))]
fn kill_with_grace(child: &mut Child) {
    let _ = child.kill();
}

/// Read without blocking; `Ok(0)` means nothing available (or EOF).
#[cfg(unix)]
fn try_read_nonblocking<R: Read + std::os::unix::io::AsRawFd>(
    stream: &mut R,
    buf: &mut [u8],
) -> std::io::Result<usize> {
    let fd = stream.as_raw_fd();

    let flags = unsafe { libc::fcntl(fd, libc::F_GETFL) };
    if flags < 0 {
        return Err(std::io::Error::last_os_error());
    }

    let was_nonblocking = (flags & libc::O_NONBLOCK) != 0;
    if !was_nonblocking {
        let result = unsafe { libc::fcntl(fd, libc::F_SETFL, flags | libc::O_NONBLOCK) };
        if result < 0 {
            return Err(std::io::Error::last_os_error());
        }
    }

    let result = stream.read(buf);

    if !was_nonblocking {
        unsafe {
            libc::fcntl(fd, libc::F_SETFL, flags);
        }
    }

    match result {
        Ok(n) => Ok(n),
        Err(e) if e.kind() == std::io::ErrorKind::WouldBlock => Ok(0),
        Err(e) => Err(e),
    }
}

#[cfg(not(unix))]
fn try_read_nonblocking<R: Read>(stream: &mut R, buf: &mut [u8]) -> std::io::Result<usize> {
    stream.read(buf)
}

/// Builder for a [`ToolRunner`].
#[derive(Debug, Default)]
pub struct ToolRunnerBuilder {
    config: ToolConfig,
}

impl ToolRunnerBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the default timeout.
    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.config.default_timeout = timeout;
        self
    }

    /// Set the per-stream output cap.
    pub fn max_output(mut self, max_bytes: usize) -> Self {
        self.config.max_output_bytes = max_bytes;
        self
    }

    pub fn build(self) -> ToolRunner {
        ToolRunner::new(self.config)
    }
}

mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let ms = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(ms))
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;

    fn test_runner() -> ToolRunner {
        ToolRunnerBuilder::new()
            .timeout(Duration::from_secs(10))
            .build()
    }

    #[test]
    fn test_run_echo() {
        let output = test_runner()
            .run_tool("echo", &["hello", "world"], None)
            .expect("echo should run");
        assert!(output.success());
        assert_eq!(output.stdout_str().trim(), "hello world");
        assert!(!output.truncated);
        assert!(!output.timed_out);
        assert_eq!(output.exit_description(), "exit status 0");
    }

    #[test]
    fn test_run_with_stderr() {
        let output = test_runner()
            .run_tool("sh", &["-c", "echo error >&2"], None)
            .unwrap();
        assert!(output.success());
        assert!(output.stderr_str().contains("error"));
    }

    #[test]
    fn test_nonzero_exit() {
        let output = test_runner().run_tool("sh", &["-c", "exit 42"], None).unwrap();
        assert!(!output.success());
        assert_eq!(output.exit_code, Some(42));
    }

    #[test]
    fn test_command_not_found() {
        let result = test_runner().run_tool("/nonexistent/command/that/does/not/exist", &[], None);
        assert!(matches!(result, Err(ToolError::CommandNotFound(_))));

        let result = test_runner().run_tool("da-core-no-such-binary-on-path", &[], None);
        assert!(matches!(result, Err(ToolError::CommandNotFound(_))));
    }

    #[test]
    fn test_invalid_path_shell_metachar() {
        match test_runner().run_tool("adb; rm -rf /", &[], None) {
            Err(ToolError::InvalidPath(_)) => {}
            other => panic!("expected InvalidPath, got {:?}", other),
        }
    }

    #[test]
    fn test_timeout() {
        let runner = ToolRunnerBuilder::new()
            .timeout(Duration::from_millis(100))
            .build();

        let output = runner.run_tool("sleep", &["10"], None).unwrap();
        assert!(output.timed_out, "expected timed_out, got: {:?}", output);
        assert!(output.duration < Duration::from_secs(3));
        assert!(output.exit_description().starts_with("timed out"));
    }

    #[test]
    fn test_output_truncation() {
        let runner = ToolRunnerBuilder::new().max_output(100).build();

        let output = runner
            .run_tool("sh", &["-c", "yes | head -n 1000"], None)
            .unwrap();
        assert!(output.truncated);
        assert_eq!(output.stdout.len(), 100);
        assert!(output.success());
    }

    #[test]
    fn test_binary_stdout_preserved() {
        let output = test_runner()
            .run_tool("printf", &["hi\\377there"], None)
            .unwrap();
        assert_eq!(output.stdout, b"hi\xffthere".to_vec());
    }

    #[test]
    fn test_tool_spec_builder() {
        let spec = ToolSpec::new("adb", vec!["devices".to_string()])
            .with_timeout(Duration::from_secs(5))
            .with_max_output(1024);

        assert_eq!(spec.command, "adb");
        assert_eq!(spec.args, vec!["devices"]);
        assert_eq!(spec.timeout, Some(Duration::from_secs(5)));
        assert_eq!(spec.max_output, Some(1024));
    }

    #[test]
    fn test_config_defaults() {
        let config = ToolConfig::default();
        assert_eq!(config.default_timeout, Duration::from_secs(30));
        assert_eq!(config.max_output_bytes, 64 * 1024 * 1024);
    }
}
