//! Exit codes for the da-core CLI.
//!
//! Exit code ranges:
//! - 0: success
//! - 10-19: user/environment errors (recoverable by user action)
//! - 20-29: internal, I/O, and device-bridge failures

use da_common::Error;

/// Exit codes for da-core operations. Stable for automation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(i32)]
pub enum ExitCode {
    /// Success
    Clean = 0,

    // ========================================================================
    // User / Environment Errors (10-19)
    // ========================================================================
    /// Invalid arguments or identifiers
    ArgsError = 10,

    /// adb executable missing
    CapabilityError = 11,

    /// Device refused access to a path
    PermissionError = 12,

    /// Configuration file missing, unreadable, or invalid
    ConfigError = 14,

    // ========================================================================
    // Internal Errors (20-29)
    // ========================================================================
    /// Internal error (bug - please report)
    InternalError = 20,

    /// Local I/O error
    IoError = 21,

    /// Device command timed out
    TimeoutError = 22,

    /// Device command exited with failure
    DeviceCommandError = 23,
}

impl ExitCode {
    pub fn as_i32(self) -> i32 {
        self as i32
    }

    pub fn is_success(self) -> bool {
        self == ExitCode::Clean
    }

    /// Codes 10-19: resolvable by user action.
    pub fn is_user_error(self) -> bool {
        (10..20).contains(&(self as i32))
    }

    pub fn is_error(self) -> bool {
        (self as i32) >= 10
    }

    /// Stable name for JSON output.
    pub fn code_name(&self) -> &'static str {
        match self {
            ExitCode::Clean => "OK_CLEAN",
            ExitCode::ArgsError => "ERR_ARGS",
            ExitCode::CapabilityError => "ERR_CAPABILITY",
            ExitCode::PermissionError => "ERR_PERMISSION",
            ExitCode::ConfigError => "ERR_CONFIG",
            ExitCode::InternalError => "ERR_INTERNAL",
            ExitCode::IoError => "ERR_IO",
            ExitCode::TimeoutError => "ERR_TIMEOUT",
            ExitCode::DeviceCommandError => "ERR_DEVICE_COMMAND",
        }
    }
}

impl From<&Error> for ExitCode {
    fn from(err: &Error) -> Self {
        match err {
            Error::Config(_) | Error::InvalidConfig(_) => ExitCode::ConfigError,
            Error::InvalidArgument(_) => ExitCode::ArgsError,
            Error::AdbNotFound { .. } => ExitCode::CapabilityError,
            Error::CommandFailed { .. } | Error::OutputTruncated { .. } => {
                ExitCode::DeviceCommandError
            }
            Error::CommandTimeout { .. } => ExitCode::TimeoutError,
            Error::PermissionDenied { .. } => ExitCode::PermissionError,
            Error::PathNotFound { .. } => ExitCode::ArgsError,
            Error::Io(_) => ExitCode::IoError,
            Error::Json(_) => ExitCode::InternalError,
        }
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code as i32
    }
}

impl std::fmt::Display for ExitCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} ({})", self.code_name(), self.as_i32())
    }
}
