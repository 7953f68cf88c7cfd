//! Device, package, and path identifier types.
//!
//! Every identifier that ends up on an `adb` command line goes through one of
//! these wrappers first. Construction validates the shape; the wrappers are
//! immutable afterwards.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Maximum accepted length for any identifier.
const MAX_ID_LEN: usize = 255;

/// Maximum accepted length for an on-device path.
const MAX_PATH_LEN: usize = 4096;

/// Why an identifier was rejected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum IdError {
    #[error("{kind} must not be empty")]
    Empty { kind: &'static str },

    #[error("{kind} exceeds {max} characters")]
    TooLong { kind: &'static str, max: usize },

    #[error("{kind} contains invalid character {ch:?}")]
    InvalidChar { kind: &'static str, ch: char },

    #[error("package name segment {segment:?} is not a valid identifier")]
    InvalidSegment { segment: String },
}

/// Device serial as reported by `adb devices`.
///
/// Examples: `emulator-5554`, `R58M12ABCDE`, `192.168.1.20:5555`,
/// `adb-R58M12ABCDE-x1y2z3._adb-tls-connect._tcp`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DeviceId(String);

impl DeviceId {
    /// Validate and wrap a device serial.
    pub fn parse(s: &str) -> Result<Self, IdError> {
        const KIND: &str = "device id";
        if s.is_empty() {
            return Err(IdError::Empty { kind: KIND });
        }
        if s.len() > MAX_ID_LEN {
            return Err(IdError::TooLong {
                kind: KIND,
                max: MAX_ID_LEN,
            });
        }
        if let Some(ch) = s
            .chars()
            .find(|c| !(c.is_ascii_alphanumeric() || matches!(c, '.' | ':' | '-' | '_')))
        {
            return Err(IdError::InvalidChar { kind: KIND, ch });
        }
        Ok(DeviceId(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DeviceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Android application package name (`com.example.app`).
///
/// Dot-separated segments, each starting with a letter or underscore and
/// continuing with ASCII letters, digits, or underscores. Single-segment names
/// such as `android` are accepted.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PackageName(String);

impl PackageName {
    /// Validate and wrap a package name.
    pub fn parse(s: &str) -> Result<Self, IdError> {
        const KIND: &str = "package name";
        if s.is_empty() {
            return Err(IdError::Empty { kind: KIND });
        }
        if s.len() > MAX_ID_LEN {
            return Err(IdError::TooLong {
                kind: KIND,
                max: MAX_ID_LEN,
            });
        }
        for segment in s.split('.') {
            let mut chars = segment.chars();
            let valid_start = chars
                .next()
                .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
            if !valid_start || !chars.all(|c| c.is_ascii_alphanumeric() || c == '_') {
                return Err(IdError::InvalidSegment {
                    segment: segment.to_string(),
                });
            }
        }
        Ok(PackageName(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for PackageName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Path on the device filesystem.
///
/// Any printable path is accepted (spaces and quotes included); quoting for
/// the device shell happens at the invocation layer. Control characters that
/// would split a shell line are rejected here.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct DevicePath(String);

impl DevicePath {
    /// Validate and wrap a device path.
    pub fn parse(s: &str) -> Result<Self, IdError> {
        const KIND: &str = "device path";
        if s.is_empty() {
            return Err(IdError::Empty { kind: KIND });
        }
        if s.len() > MAX_PATH_LEN {
            return Err(IdError::TooLong {
                kind: KIND,
                max: MAX_PATH_LEN,
            });
        }
        if let Some(ch) = s.chars().find(|c| matches!(c, '\0' | '\n' | '\r')) {
            return Err(IdError::InvalidChar { kind: KIND, ch });
        }
        Ok(DevicePath(s.to_string()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for DevicePath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_device_id_accepts_common_serials() {
        for serial in [
            "emulator-5554",
            "R58M12ABCDE",
            "192.168.1.20:5555",
            "adb-R58M12ABCDE-x1y2z3._adb-tls-connect._tcp",
        ] {
            assert!(DeviceId::parse(serial).is_ok(), "{serial}");
        }
    }

    #[test]
    fn test_device_id_rejects_shell_metacharacters() {
        assert_eq!(
            DeviceId::parse("abc;rm"),
            Err(IdError::InvalidChar {
                kind: "device id",
                ch: ';'
            })
        );
        assert!(DeviceId::parse("a b").is_err());
        assert!(DeviceId::parse("").is_err());
    }

    #[test]
    fn test_package_name_validation() {
        assert!(PackageName::parse("com.example.app").is_ok());
        assert!(PackageName::parse("android").is_ok());
        assert!(PackageName::parse("com.example_app.v2").is_ok());
        assert!(PackageName::parse("com..example").is_err());
        assert!(PackageName::parse("com.1example").is_err());
        assert!(PackageName::parse("com.example;id").is_err());
        assert!(PackageName::parse(".com").is_err());
    }

    #[test]
    fn test_device_path_validation() {
        assert!(DevicePath::parse("/sdcard/My Files/it's here").is_ok());
        assert!(DevicePath::parse("/sdcard\nls").is_err());
        assert!(DevicePath::parse("").is_err());
    }

    #[test]
    fn test_display_roundtrip() {
        let id = DeviceId::parse("emulator-5554").unwrap();
        assert_eq!(id.to_string(), "emulator-5554");
        assert_eq!(id.as_str(), "emulator-5554");
    }
}
