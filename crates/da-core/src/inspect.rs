//! Per-endpoint orchestration: run the bridge commands, feed their output to
//! the parsers, assemble the response records.
//!
//! Shared by the HTTP layer and the one-shot CLI subcommands.

use crate::collect::app_links::report_for_failure;
use crate::collect::package_index::uncaptured_index;
use crate::collect::{
    analyze_package, build_package_index, enrich_entries, extract_content, parse_app_links,
    parse_devices, parse_listing, parse_package_list, parse_package_timestamps, sort_entries,
    AdbClient, Device, FileEntry, PackageSecurityProfile, PackageSummary,
};
use chrono::{DateTime, Utc};
use da_common::{DeviceId, DevicePath, Error, PackageName, Result};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

/// Listing output marker for an unreadable directory.
const PERMISSION_DENIED_MARKER: &str = "Permission denied";
/// Listing output marker for a missing path.
const NO_SUCH_FILE_MARKER: &str = "No such file";

pub const PERMISSION_DENIED_MESSAGE: &str = "Permission Denied (Try run-as or root)";
pub const PATH_NOT_FOUND_MESSAGE: &str = "Path not found";

/// Returned when a log query matches nothing.
pub const NO_LOGS_PLACEHOLDER: &str = "--- no matching log entries ---";

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct DevicesResponse {
    pub devices: Vec<Device>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct PackagesResponse {
    pub device_id: String,
    pub total_count: usize,
    pub packages: Vec<PackageSummary>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct PackageDetailsResponse {
    pub package: String,
    pub analysis: PackageSecurityProfile,
    /// Full package dump the analysis was taken from.
    pub raw_info: String,
    pub captured_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, JsonSchema)]
pub struct FileListingResponse {
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    pub files: Vec<FileEntry>,
    pub captured_at: DateTime<Utc>,
}

impl FileListingResponse {
    fn failed(path: &DevicePath, message: &str) -> Self {
        Self {
            path: path.to_string(),
            error: Some(message.to_string()),
            files: Vec::new(),
            captured_at: Utc::now(),
        }
    }

    /// The listing failure as an error, for callers that need an exit status.
    pub fn failure(&self) -> Option<Error> {
        let path = self.path.clone();
        match self.error.as_deref()? {
            PERMISSION_DENIED_MESSAGE => Some(Error::PermissionDenied { path }),
            PATH_NOT_FOUND_MESSAGE => Some(Error::PathNotFound { path }),
            other => Some(Error::CommandFailed {
                command: format!("ls -l {}", path),
                detail: other.to_string(),
            }),
        }
    }
}

/// File bytes in every view, named for the HTTP contract.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct FileContentResponse {
    pub path: String,
    pub size: usize,
    pub content: String,
    pub strings: Vec<String>,
    pub base64: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
pub struct LogsResponse {
    pub query: String,
    pub logs: String,
}

/// Orchestrates one device-inspection request at a time; cheap to clone and
/// share across worker threads.
#[derive(Debug, Clone)]
pub struct DeviceInspector {
    adb: AdbClient,
}

impl DeviceInspector {
    pub fn new(adb: AdbClient) -> Self {
        Self { adb }
    }

    pub fn adb(&self) -> &AdbClient {
        &self.adb
    }

    /// Attached devices. Any bridge failure yields an empty list.
    #[instrument(skip(self))]
    pub fn devices(&self) -> DevicesResponse {
        let devices = match self.adb.devices() {
            Ok(output) => parse_devices(&output),
            Err(e) => {
                warn!(error = %e, "device enumeration failed");
                Vec::new()
            }
        };
        debug!(count = devices.len(), "devices listed");
        DevicesResponse { devices }
    }

    /// Installed packages with install and update times.
    #[instrument(skip(self), fields(device = %device))]
    pub fn packages(&self, device: &DeviceId) -> Result<PackagesResponse> {
        let names = parse_package_list(&self.adb.list_packages(device)?);

        let packages = match self.adb.dump_all_packages(device) {
            Ok(dump) => build_package_index(&names, &parse_package_timestamps(&dump)),
            Err(e) => {
                warn!(error = %e, "package dump unavailable, times omitted");
                uncaptured_index(&names)
            }
        };

        info!(count = packages.len(), "packages indexed");
        Ok(PackagesResponse {
            device_id: device.to_string(),
            total_count: packages.len(),
            packages,
        })
    }

    /// Security profile for one package, with its app-link states attached.
    #[instrument(skip(self), fields(device = %device, package = %package))]
    pub fn package_details(
        &self,
        device: &DeviceId,
        package: &PackageName,
    ) -> Result<PackageDetailsResponse> {
        let raw_info = self.adb.dump_package(device, package)?;
        let links = match self.adb.app_links(device, package) {
            Ok(text) => parse_app_links(&text),
            Err(e) => report_for_failure(&e.to_string()),
        };
        let analysis = analyze_package(&raw_info).with_app_links(links);

        debug!(
            requested = analysis.requested_permissions.len(),
            granted = analysis.granted_permissions.len(),
            domains = analysis.domain_verification.len(),
            "package analyzed"
        );
        Ok(PackageDetailsResponse {
            package: package.to_string(),
            analysis,
            raw_info,
            captured_at: Utc::now(),
        })
    }

    /// Directory listing enriched with content-type hints.
    ///
    /// Device-side refusals and bridge failures are reported in the
    /// response, not as errors.
    #[instrument(skip(self), fields(device = %device, path = %path))]
    pub fn list_files(&self, device: &DeviceId, path: &DevicePath) -> Result<FileListingResponse> {
        let output = match self.adb.list_dir(device, path) {
            Ok(output) => output,
            Err(e) => {
                warn!(error = %e, "listing capture failed");
                return Ok(FileListingResponse::failed(path, &e.to_string()));
            }
        };

        if output.contains(PERMISSION_DENIED_MARKER) {
            return Ok(FileListingResponse::failed(path, PERMISSION_DENIED_MESSAGE));
        }
        if output.contains(NO_SUCH_FILE_MARKER) {
            return Ok(FileListingResponse::failed(path, PATH_NOT_FOUND_MESSAGE));
        }

        let mut files = parse_listing(&output);
        match self.adb.probe_dir(device, path) {
            Ok(probe) => enrich_entries(&mut files, &probe),
            Err(e) => warn!(error = %e, "file-type probe failed, listing not enriched"),
        }
        sort_entries(&mut files);

        Ok(FileListingResponse {
            path: path.to_string(),
            error: None,
            files,
            captured_at: Utc::now(),
        })
    }

    /// Raw file contents in every view.
    #[instrument(skip(self), fields(device = %device, path = %path))]
    pub fn read_file(&self, device: &DeviceId, path: &DevicePath) -> Result<FileContentResponse> {
        let bytes = self.adb.read_file(device, path)?;
        let content = extract_content(path.as_str(), &bytes);
        debug!(bytes = content.byte_length, runs = content.printable_runs.len(), "file read");
        Ok(FileContentResponse {
            path: content.path,
            size: content.byte_length,
            content: content.text_view,
            strings: content.printable_runs,
            base64: content.encoded_blob,
        })
    }

    /// Log lines matching `query`.
    #[instrument(skip(self), fields(device = %device))]
    pub fn logs(&self, device: &DeviceId, query: &str) -> Result<LogsResponse> {
        if query.is_empty() {
            return Err(Error::InvalidArgument("log query must not be empty".to_string()));
        }
        let logs = self.adb.logcat(device, query)?;
        Ok(LogsResponse {
            query: query.to_string(),
            logs: if logs.is_empty() {
                NO_LOGS_PLACEHOLDER.to_string()
            } else {
                logs
            },
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing(error: Option<&str>) -> FileListingResponse {
        FileListingResponse {
            path: "/data".to_string(),
            error: error.map(String::from),
            files: Vec::new(),
            captured_at: Utc::now(),
        }
    }

    #[test]
    fn test_listing_failure_mapping() {
        assert!(listing(None).failure().is_none());
        assert!(matches!(
            listing(Some(PERMISSION_DENIED_MESSAGE)).failure(),
            Some(Error::PermissionDenied { .. })
        ));
        assert!(matches!(
            listing(Some(PATH_NOT_FOUND_MESSAGE)).failure(),
            Some(Error::PathNotFound { .. })
        ));
    }

    #[test]
    fn test_bridge_failure_mapping() {
        let response = listing(Some("adb not found at /nonexistent/adb"));
        match response.failure() {
            Some(Error::CommandFailed { command, detail }) => {
                assert_eq!(command, "ls -l /data");
                assert!(detail.contains("adb not found"));
            }
            other => panic!("expected CommandFailed, got {:?}", other),
        }
    }

    #[test]
    fn test_bridge_failure_reported_in_listing() {
        let inspector = DeviceInspector::new(AdbClient::new(crate::collect::AdbConfig {
            executable: "/nonexistent/platform-tools/adb".into(),
            ..Default::default()
        }));
        let device = DeviceId::parse("emulator-5554").unwrap();
        let path = DevicePath::parse("/sdcard").unwrap();

        let response = inspector.list_files(&device, &path).unwrap();
        assert!(response.files.is_empty());
        assert!(response.error.is_some());
        assert!(matches!(response.failure(), Some(Error::CommandFailed { .. })));
    }

    #[test]
    fn test_listing_serialization_shape() {
        let ok = serde_json::to_value(listing(None)).unwrap();
        assert!(ok.get("error").is_none());
        assert_eq!(ok["files"], serde_json::json!([]));

        let failed = serde_json::to_value(listing(Some(PATH_NOT_FOUND_MESSAGE))).unwrap();
        assert_eq!(failed["error"], "Path not found");
    }

    #[test]
    fn test_content_response_field_names() {
        let response = FileContentResponse {
            path: "/x".into(),
            size: 2,
            content: "hi".into(),
            strings: vec![],
            base64: "aGk=".into(),
        };
        let json = serde_json::to_value(response).unwrap();
        for key in ["path", "size", "content", "strings", "base64"] {
            assert!(json.get(key).is_some(), "missing {}", key);
        }
    }
}
