//! Device-introspection collection.
//!
//! Two layers:
//! - Parsers that turn bridge output (listings, probe output, package and
//!   app-link dumps, file bytes) into typed records. They are pure and total:
//!   any input, including empty or garbage text, yields a value.
//! - The bridge invocation layer ([`tool_runner`], [`adb`]) that produces
//!   that text.

pub mod adb;
pub mod app_links;
pub mod content;
pub mod devices;
pub mod file_probe;
pub mod listing;
pub mod package;
pub mod package_index;
pub mod tool_runner;
mod types;

pub use adb::{shell_quote, AdbClient, AdbConfig, BridgeOutput, ExitCheck, OutputMode};
pub use app_links::{classify, domain_state, parse_app_links};
pub use content::{decode_blob, extract_content, printable_runs, MIN_RUN_LEN};
pub use devices::parse_devices;
pub use file_probe::{enrich_entries, parse_probe_output};
pub use listing::{parse_listing, sort_entries};
pub use package::analyze_package;
pub use package_index::{build_package_index, parse_package_list, parse_package_timestamps};
pub use tool_runner::{
    ToolConfig, ToolError, ToolOutput, ToolRunner, ToolRunnerBuilder, ToolSpec,
    DEFAULT_MAX_OUTPUT_BYTES, DEFAULT_TIMEOUT_SECS,
};
pub use types::{
    AppLinksReport, Device, DomainVerificationState, ExtractedContent, FileEntry, FileKind,
    PackageSecurityProfile, PackageSummary, PackageTimes, Severity, UNKNOWN,
};

use regex::Regex;

/// Compile an extraction pattern.
///
/// A pattern that fails to compile disables only the field it extracts.
pub(crate) fn compile_pattern(pattern: &str) -> Option<Regex> {
    match Regex::new(pattern) {
        Ok(re) => Some(re),
        Err(e) => {
            tracing::error!(pattern, error = %e, "extraction pattern failed to compile");
            None
        }
    }
}
