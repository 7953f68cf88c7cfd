//! Device Audit common types, identifiers, and errors.
//!
//! This crate provides foundational types shared across da-core modules:
//! - Validated identifiers for devices, packages, and on-device paths
//! - Common error types with stable codes
//! - Output format specifications

pub mod error;
pub mod id;
pub mod output;

pub use error::{Error, ErrorCategory, Result, StructuredError};
pub use id::{DeviceId, DevicePath, IdError, PackageName};
pub use output::OutputFormat;
