//! Records produced by the collection parsers.
//!
//! Every record is a plain value: created per request, never shared, never
//! persisted. Set-valued fields use `BTreeSet` so they serialize as sorted,
//! deduplicated sequences.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;

/// Default for identity fields absent from a package dump.
pub const UNKNOWN: &str = "Unknown";

/// Kind of directory entry, from the first character of the mode string.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum FileKind {
    Directory,
    Symlink,
    Regular,
}

impl FileKind {
    /// Classify from a permission string such as `drwxr-x--x`.
    pub fn from_mode(mode: &str) -> Self {
        match mode.chars().next() {
            Some('d') => FileKind::Directory,
            Some('l') => FileKind::Symlink,
            _ => FileKind::Regular,
        }
    }
}

impl std::fmt::Display for FileKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FileKind::Directory => "directory",
            FileKind::Symlink => "symlink",
            FileKind::Regular => "regular",
        };
        write!(f, "{}", s)
    }
}

/// One row of a long-format directory listing.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FileEntry {
    /// Entry name; may contain spaces.
    pub name: String,

    pub kind: FileKind,

    /// Size column kept verbatim (device and special files print `major, minor`).
    pub size: String,

    /// Date and time columns joined by a single space.
    pub modified: String,

    /// Raw mode string, e.g. `-rw-rw----`.
    pub permissions: String,

    /// Description from the file-type probe; regular files only.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub content_hint: Option<String>,

    /// The trimmed source line.
    pub raw: String,
}

impl FileEntry {
    pub fn is_dir(&self) -> bool {
        self.kind == FileKind::Directory
    }
}

/// Views derived from the raw bytes of a device file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct ExtractedContent {
    pub path: String,

    /// Exact byte count of the source.
    pub byte_length: usize,

    /// Lossy UTF-8 decoding; invalid sequences become U+FFFD.
    pub text_view: String,

    /// Printable-ASCII runs of length >= 4, in order, duplicates kept.
    pub printable_runs: Vec<String>,

    /// Standard base64 of the original bytes.
    pub encoded_blob: String,
}

/// Tri-level classification of a domain verification state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Ok,
    Caution,
    Blocked,
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            Severity::Ok => "ok",
            Severity::Caution => "caution",
            Severity::Blocked => "blocked",
        };
        write!(f, "{}", s)
    }
}

/// Verification state of one app-link domain.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DomainVerificationState {
    pub domain: String,
    pub code: u64,
    pub description: String,
    pub severity: Severity,
    pub user_disabled: bool,
}

/// Parsed app-links capture for one package.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct AppLinksReport {
    pub domains: Vec<DomainVerificationState>,

    /// Source text, or the reason the capture could not be made.
    pub raw: String,
}

impl AppLinksReport {
    /// Report for a capture that failed before any text was produced.
    pub fn from_failure(reason: impl Into<String>) -> Self {
        AppLinksReport {
            domains: Vec::new(),
            raw: reason.into(),
        }
    }
}

/// Security-relevant facts extracted from a package dump.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PackageSecurityProfile {
    pub version_name: String,
    pub version_code: String,
    pub user_id: String,
    pub data_dir: String,

    pub requested_permissions: BTreeSet<String>,
    pub granted_permissions: BTreeSet<String>,

    pub uri_schemes: BTreeSet<String>,
    pub content_providers: BTreeSet<String>,
    pub intent_actions: BTreeSet<String>,
    pub intent_categories: BTreeSet<String>,

    pub is_debuggable: bool,

    pub domain_verification: Vec<DomainVerificationState>,

    /// Raw app-links text (or capture failure reason).
    pub app_links_raw: String,
}

impl Default for PackageSecurityProfile {
    fn default() -> Self {
        PackageSecurityProfile {
            version_name: UNKNOWN.to_string(),
            version_code: UNKNOWN.to_string(),
            user_id: UNKNOWN.to_string(),
            data_dir: UNKNOWN.to_string(),
            requested_permissions: BTreeSet::new(),
            granted_permissions: BTreeSet::new(),
            uri_schemes: BTreeSet::new(),
            content_providers: BTreeSet::new(),
            intent_actions: BTreeSet::new(),
            intent_categories: BTreeSet::new(),
            is_debuggable: false,
            domain_verification: Vec::new(),
            app_links_raw: String::new(),
        }
    }
}

impl PackageSecurityProfile {
    /// Attach the app-links capture taken for the same package.
    pub fn with_app_links(mut self, report: AppLinksReport) -> Self {
        self.domain_verification = report.domains;
        self.app_links_raw = report.raw;
        self
    }

    /// Domains whose severity is `blocked`.
    pub fn blocked_domains(&self) -> impl Iterator<Item = &DomainVerificationState> {
        self.domain_verification
            .iter()
            .filter(|d| d.severity == Severity::Blocked)
    }
}

/// A device line from `adb devices`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct Device {
    pub id: String,
    /// `device`, `unauthorized`, `offline`, ...
    pub status: String,
}

/// Install/update timestamps for one package.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PackageTimes {
    pub first_install_time: Option<String>,
    pub time_stamp: Option<String>,
    pub last_update_time: Option<String>,
}

/// One row of the installed-package index.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PackageSummary {
    pub name: String,
    pub install_time: String,
    pub update_time: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_kind_from_mode() {
        assert_eq!(FileKind::from_mode("drwxrwx--x"), FileKind::Directory);
        assert_eq!(FileKind::from_mode("lrwxrwxrwx"), FileKind::Symlink);
        assert_eq!(FileKind::from_mode("-rw-r--r--"), FileKind::Regular);
        assert_eq!(FileKind::from_mode("crw-rw-rw-"), FileKind::Regular);
        assert_eq!(FileKind::from_mode(""), FileKind::Regular);
    }

    #[test]
    fn test_vocabulary_serialization() {
        assert_eq!(serde_json::to_string(&Severity::Caution).unwrap(), "\"caution\"");
        assert_eq!(
            serde_json::to_string(&FileKind::Directory).unwrap(),
            "\"directory\""
        );
        assert_eq!(FileKind::Symlink.to_string(), "symlink");
        assert_eq!(Severity::Blocked.to_string(), "blocked");
    }

    #[test]
    fn test_profile_defaults() {
        let profile = PackageSecurityProfile::default();
        assert_eq!(profile.version_name, "Unknown");
        assert_eq!(profile.data_dir, "Unknown");
        assert!(profile.granted_permissions.is_empty());
        assert!(!profile.is_debuggable);
    }

    #[test]
    fn test_sets_serialize_sorted() {
        let mut profile = PackageSecurityProfile::default();
        profile.uri_schemes.insert("zeta".into());
        profile.uri_schemes.insert("alpha".into());
        profile.uri_schemes.insert("alpha".into());
        let json = serde_json::to_value(&profile).unwrap();
        assert_eq!(json["uri_schemes"], serde_json::json!(["alpha", "zeta"]));
    }

    #[test]
    fn test_with_app_links() {
        let report = AppLinksReport {
            domains: vec![DomainVerificationState {
                domain: "example.com".into(),
                code: 3,
                description: "State Code: 3".into(),
                severity: Severity::Blocked,
                user_disabled: false,
            }],
            raw: "raw".into(),
        };
        let profile = PackageSecurityProfile::default().with_app_links(report);
        assert_eq!(profile.domain_verification.len(), 1);
        assert_eq!(profile.app_links_raw, "raw");
        assert_eq!(profile.blocked_domains().count(), 1);
    }

    #[test]
    fn test_app_links_from_failure() {
        let report = AppLinksReport::from_failure("device offline");
        assert!(report.domains.is_empty());
        assert_eq!(report.raw, "device offline");
    }
}
