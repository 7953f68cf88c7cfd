//! Error types for Device Audit.
//!
//! This module provides structured error handling with:
//! - Stable error codes for machine parsing
//! - Category classification for error grouping
//! - Recoverability hints for automation
//! - Remediation suggestions for humans
//!
//! # Human-Facing Output
//!
//! ```text
//! ✗ Device Bridge Not Found
//!   Reason: adb executable not found: /opt/sdk/platform-tools/adb
//!   Fix: Install Android platform-tools or pass --adb / set ADB_PATH.
//! ```
//!
//! # Agent-Facing Output
//!
//! ```json
//! {
//!   "code": 20,
//!   "category": "bridge",
//!   "message": "adb executable not found: adb",
//!   "recoverable": true,
//!   "context": { "path": "adb" }
//! }
//! ```
//!
//! Parsers never produce these errors: they are total functions. Errors come
//! from configuration, argument validation, and the device-bridge invocation.

use crate::id::IdError;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

/// Result type alias for Device Audit operations.
pub type Result<T> = std::result::Result<T, Error>;

/// Error categories for grouping related errors.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorCategory {
    /// Configuration file errors.
    Config,
    /// Invalid identifiers or request parameters.
    Input,
    /// Device-bridge invocation errors (spawn, exit status, timeout).
    Bridge,
    /// The device refused or could not find what was asked for.
    Device,
    /// Local I/O and serialization errors.
    Io,
}

impl std::fmt::Display for ErrorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorCategory::Config => write!(f, "config"),
            ErrorCategory::Input => write!(f, "input"),
            ErrorCategory::Bridge => write!(f, "bridge"),
            ErrorCategory::Device => write!(f, "device"),
            ErrorCategory::Io => write!(f, "io"),
        }
    }
}

/// Unified error type for Device Audit.
#[derive(Error, Debug)]
pub enum Error {
    // Configuration errors (10-14)
    #[error("configuration error: {0}")]
    Config(String),

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    // Input errors (15-19)
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    // Bridge errors (20-29)
    #[error("adb executable not found: {path}")]
    AdbNotFound { path: String },

    #[error("device command `{command}` failed: {detail}")]
    CommandFailed { command: String, detail: String },

    #[error("device command timed out after {seconds}s")]
    CommandTimeout { seconds: u64 },

    #[error("device command output exceeded {limit} bytes")]
    OutputTruncated { limit: usize },

    // Device errors (30-39)
    #[error("permission denied reading {path}")]
    PermissionDenied { path: String },

    #[error("path not found: {path}")]
    PathNotFound { path: String },

    // I/O errors (60-69)
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON serialization error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<IdError> for Error {
    fn from(err: IdError) -> Self {
        Error::InvalidArgument(err.to_string())
    }
}

impl Error {
    /// Returns the stable error code for this error type.
    ///
    /// - 10-19: Configuration and input errors
    /// - 20-29: Device-bridge errors
    /// - 30-39: Device-side refusals
    /// - 60-69: I/O errors
    pub fn code(&self) -> u32 {
        match self {
            Error::Config(_) => 10,
            Error::InvalidConfig(_) => 11,
            Error::InvalidArgument(_) => 15,
            Error::AdbNotFound { .. } => 20,
            Error::CommandFailed { .. } => 21,
            Error::CommandTimeout { .. } => 22,
            Error::OutputTruncated { .. } => 23,
            Error::PermissionDenied { .. } => 30,
            Error::PathNotFound { .. } => 31,
            Error::Io(_) => 60,
            Error::Json(_) => 61,
        }
    }

    /// Returns the error category for grouping and filtering.
    pub fn category(&self) -> ErrorCategory {
        match self {
            Error::Config(_) | Error::InvalidConfig(_) => ErrorCategory::Config,
            Error::InvalidArgument(_) => ErrorCategory::Input,
            Error::AdbNotFound { .. }
            | Error::CommandFailed { .. }
            | Error::CommandTimeout { .. }
            | Error::OutputTruncated { .. } => ErrorCategory::Bridge,
            Error::PermissionDenied { .. } | Error::PathNotFound { .. } => ErrorCategory::Device,
            Error::Io(_) | Error::Json(_) => ErrorCategory::Io,
        }
    }

    /// Returns whether this error is potentially recoverable by the caller.
    pub fn is_recoverable(&self) -> bool {
        match self {
            Error::Config(_) | Error::InvalidConfig(_) => true,
            Error::InvalidArgument(_) => true,
            Error::AdbNotFound { .. } => true,
            Error::CommandFailed { .. } => true, // device may be reconnected
            Error::CommandTimeout { .. } => true,
            Error::OutputTruncated { .. } => false,
            Error::PermissionDenied { .. } => true, // run-as / root
            Error::PathNotFound { .. } => false,
            Error::Io(_) => true,
            Error::Json(_) => false,
        }
    }

    /// Returns a human-readable remediation hint.
    pub fn remediation(&self) -> &'static str {
        match self {
            Error::Config(_) => "Run 'da-core config show' to inspect the resolved configuration.",
            Error::InvalidConfig(_) => "Fix the reported field in config.json or remove the file to use defaults.",
            Error::InvalidArgument(_) => "Check the device serial, package name, or path passed to the command.",
            Error::AdbNotFound { .. } => {
                "Install Android platform-tools or pass --adb / set ADB_PATH to the adb executable."
            }
            Error::CommandFailed { .. } => {
                "Check that the device is connected and authorized ('adb devices')."
            }
            Error::CommandTimeout { .. } => {
                "The device did not answer in time. Increase command_timeout_secs or check the connection."
            }
            Error::OutputTruncated { .. } => "Increase max_output_bytes in config.json.",
            Error::PermissionDenied { .. } => {
                "The shell user cannot read this location. Try 'run-as <package>' or a rooted device."
            }
            Error::PathNotFound { .. } => "Verify the path exists on the device.",
            Error::Io(_) => "Check local permissions and disk space, then retry.",
            Error::Json(_) => "Invalid JSON. Check the file syntax.",
        }
    }

    /// Returns a short headline for human-readable output.
    pub fn headline(&self) -> &'static str {
        match self {
            Error::Config(_) => "Configuration Error",
            Error::InvalidConfig(_) => "Invalid Configuration",
            Error::InvalidArgument(_) => "Invalid Argument",
            Error::AdbNotFound { .. } => "Device Bridge Not Found",
            Error::CommandFailed { .. } => "Device Command Failed",
            Error::CommandTimeout { .. } => "Device Command Timeout",
            Error::OutputTruncated { .. } => "Output Too Large",
            Error::PermissionDenied { .. } => "Permission Denied",
            Error::PathNotFound { .. } => "Path Not Found",
            Error::Io(_) => "I/O Error",
            Error::Json(_) => "JSON Error",
        }
    }
}

/// Structured error response for JSON output.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StructuredError {
    /// Stable error code.
    pub code: u32,

    /// Error category for grouping.
    pub category: ErrorCategory,

    /// Human-readable error message.
    pub message: String,

    /// Whether the error is potentially recoverable.
    pub recoverable: bool,

    /// Additional structured context (e.g., path, command).
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub context: HashMap<String, serde_json::Value>,
}

impl From<&Error> for StructuredError {
    fn from(err: &Error) -> Self {
        let mut context = HashMap::new();

        match err {
            Error::AdbNotFound { path }
            | Error::PermissionDenied { path }
            | Error::PathNotFound { path } => {
                context.insert("path".to_string(), serde_json::json!(path));
            }
            Error::CommandFailed { command, .. } => {
                context.insert("command".to_string(), serde_json::json!(command));
            }
            Error::CommandTimeout { seconds } => {
                context.insert("timeout_seconds".to_string(), serde_json::json!(seconds));
            }
            Error::OutputTruncated { limit } => {
                context.insert("limit_bytes".to_string(), serde_json::json!(limit));
            }
            _ => {}
        }

        StructuredError {
            code: err.code(),
            category: err.category(),
            message: err.to_string(),
            recoverable: err.is_recoverable(),
            context,
        }
    }
}

impl StructuredError {
    /// Add additional context to the error.
    pub fn with_context(mut self, key: impl Into<String>, value: impl Serialize) -> Self {
        if let Ok(v) = serde_json::to_value(value) {
            self.context.insert(key.into(), v);
        }
        self
    }

    /// Serialize to JSON string.
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| {
            format!(r#"{{"code":{},"error":"serialization_failed"}}"#, self.code)
        })
    }
}

/// Format an error for human-readable stderr output.
///
/// ```text
/// ✗ [Headline]
///   Reason: [Error message]
///   Fix: [Remediation hint]
/// ```
pub fn format_error_human(err: &Error, use_color: bool) -> String {
    let (red, cyan, reset) = if use_color {
        ("\x1b[31m", "\x1b[36m", "\x1b[0m")
    } else {
        ("", "", "")
    };

    format!(
        "{red}✗{reset} {headline}\n  Reason: {message}\n  {cyan}Fix:{reset} {remediation}",
        headline = err.headline(),
        message = err,
        remediation = err.remediation()
    )
}
