//! JSON Schema generation for the response and record types.
//!
//! Front ends and scripts consuming `da-core` output can validate against
//! these schemas.
//!
//! ```bash
//! da-core schema --list
//! da-core schema PackageSecurityProfile
//! da-core schema --all
//! ```

use schemars::schema_for;
use serde_json::Value;
use std::collections::BTreeMap;

pub use crate::collect::{
    AppLinksReport, Device, DomainVerificationState, ExtractedContent, FileEntry, FileKind,
    PackageSecurityProfile, PackageSummary, Severity,
};
pub use crate::config::{AdbResolution, AuditorConfig, ConfigSnapshot};
pub use crate::inspect::{
    DevicesResponse, FileContentResponse, FileListingResponse, LogsResponse,
    PackageDetailsResponse, PackagesResponse,
};

/// Available schema types with their descriptions.
pub fn available_schemas() -> Vec<(&'static str, &'static str)> {
    vec![
        // Records
        ("FileKind", "Directory entry kind (directory, symlink, regular)"),
        ("FileEntry", "One directory listing entry"),
        ("ExtractedContent", "File bytes as text, printable runs and base64"),
        ("Severity", "Verification severity (ok, caution, blocked)"),
        ("DomainVerificationState", "App-link verification state of one domain"),
        ("AppLinksReport", "App-link states for one package"),
        ("PackageSecurityProfile", "Security-relevant facts about one package"),
        ("Device", "Attached device and its bridge state"),
        ("PackageSummary", "Installed package with install and update times"),
        // Responses
        ("DevicesResponse", "Response for /devices"),
        ("PackagesResponse", "Response for /packages/{device}"),
        ("PackageDetailsResponse", "Response for /package/{device}/{package}/details"),
        ("FileListingResponse", "Response for /files/{device}"),
        ("FileContentResponse", "Response for /files/{device}/read"),
        ("LogsResponse", "Response for /logs/{device}"),
        // Configuration
        ("AuditorConfig", "Configuration file contents"),
        ("AdbResolution", "Resolved adb executable and where it came from"),
        ("ConfigSnapshot", "Effective configuration as printed by `config show`"),
    ]
}

/// Generate the JSON schema for a specific type.
pub fn generate_schema(type_name: &str) -> Option<Value> {
    let schema = match type_name {
        "FileKind" => schema_for!(FileKind),
        "FileEntry" => schema_for!(FileEntry),
        "ExtractedContent" => schema_for!(ExtractedContent),
        "Severity" => schema_for!(Severity),
        "DomainVerificationState" => schema_for!(DomainVerificationState),
        "AppLinksReport" => schema_for!(AppLinksReport),
        "PackageSecurityProfile" => schema_for!(PackageSecurityProfile),
        "Device" => schema_for!(Device),
        "PackageSummary" => schema_for!(PackageSummary),
        "DevicesResponse" => schema_for!(DevicesResponse),
        "PackagesResponse" => schema_for!(PackagesResponse),
        "PackageDetailsResponse" => schema_for!(PackageDetailsResponse),
        "FileListingResponse" => schema_for!(FileListingResponse),
        "FileContentResponse" => schema_for!(FileContentResponse),
        "LogsResponse" => schema_for!(LogsResponse),
        "AuditorConfig" => schema_for!(AuditorConfig),
        "AdbResolution" => schema_for!(AdbResolution),
        "ConfigSnapshot" => schema_for!(ConfigSnapshot),
        _ => return None,
    };

    match serde_json::to_value(schema) {
        Ok(value) => Some(value),
        Err(e) => {
            tracing::error!(type_name, error = %e, "schema serialization failed");
            None
        }
    }
}

/// Generate all schemas as a map from type name to schema.
pub fn generate_all_schemas() -> BTreeMap<String, Value> {
    let mut schemas = BTreeMap::new();
    for (name, _desc) in available_schemas() {
        if let Some(schema) = generate_schema(name) {
            schemas.insert(name.to_string(), schema);
        }
    }
    schemas
}

/// Schema output format.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchemaFormat {
    /// Pretty-printed JSON (default)
    Json,
    /// Compact single-line JSON
    JsonCompact,
}

/// Format a schema value for output.
pub fn format_schema(schema: &Value, format: SchemaFormat) -> String {
    let rendered = match format {
        SchemaFormat::Json => serde_json::to_string_pretty(schema),
        SchemaFormat::JsonCompact => serde_json::to_string(schema),
    };
    // Value serialization is infallible.
    rendered.unwrap_or_else(|_| schema.to_string())
}
