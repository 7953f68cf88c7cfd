//! Installed-package index: names from `pm list packages`, install and update
//! times from the full `dumpsys package` text.

use super::types::{PackageSummary, PackageTimes};
use std::collections::HashMap;

/// Placeholder for a time that the dump did not report.
pub const NOT_AVAILABLE: &str = "N/A";
/// Placeholder used for every time when the dump could not be captured.
pub const NOT_CAPTURED: &str = "-";

const PACKAGE_PREFIX: &str = "package:";
const FIRST_INSTALL_KEY: &str = "firstInstallTime=";
const TIME_STAMP_KEY: &str = "timeStamp=";
const LAST_UPDATE_KEY: &str = "lastUpdateTime=";

/// Package names in listing order.
pub fn parse_package_list(output: &str) -> Vec<String> {
    output
        .lines()
        .filter(|line| !line.trim().is_empty())
        .map(|line| line.replacen(PACKAGE_PREFIX, "", 1).trim().to_string())
        .collect()
}

/// Per-package timestamps from a full package dump.
///
/// A `Package [name]` line opens a block; key lines before the first block
/// are ignored.
pub fn parse_package_timestamps(dump: &str) -> HashMap<String, PackageTimes> {
    let mut times: HashMap<String, PackageTimes> = HashMap::new();
    let mut current: Option<String> = None;

    for line in dump.lines() {
        let line = line.trim();
        if let Some(name) = package_header(line) {
            times.entry(name.to_string()).or_default();
            current = Some(name.to_string());
        }
        let Some(entry) = current.as_ref().and_then(|name| times.get_mut(name)) else {
            continue;
        };

        if let Some(value) = value_after(line, FIRST_INSTALL_KEY) {
            entry.first_install_time = Some(value);
        } else if let Some(value) = value_after(line, TIME_STAMP_KEY) {
            entry.time_stamp = Some(value);
        } else if let Some(value) = value_after(line, LAST_UPDATE_KEY) {
            entry.last_update_time = Some(value);
        }
    }

    times
}

/// Join names with their timestamps, preserving `names` order.
pub fn build_package_index(
    names: &[String],
    timestamps: &HashMap<String, PackageTimes>,
) -> Vec<PackageSummary> {
    names
        .iter()
        .map(|name| {
            let times = timestamps.get(name);
            let install_time = times
                .and_then(|t| t.first_install_time.clone().or_else(|| t.time_stamp.clone()))
                .unwrap_or_else(|| NOT_AVAILABLE.to_string());
            let update_time = times
                .and_then(|t| t.last_update_time.clone())
                .unwrap_or_else(|| NOT_AVAILABLE.to_string());
            PackageSummary {
                name: name.clone(),
                install_time,
                update_time,
            }
        })
        .collect()
}

/// Index for when the full dump is unavailable.
pub fn uncaptured_index(names: &[String]) -> Vec<PackageSummary> {
    names
        .iter()
        .map(|name| PackageSummary {
            name: name.clone(),
            install_time: NOT_CAPTURED.to_string(),
            update_time: NOT_CAPTURED.to_string(),
        })
        .collect()
}

fn package_header(line: &str) -> Option<&str> {
    let rest = line.strip_prefix("Package [")?;
    let end = rest.find(']')?;
    Some(&rest[..end])
}

/// Text after `key` up to any repeat of it, trimmed.
fn value_after(line: &str, key: &str) -> Option<String> {
    let (_, rest) = line.split_once(key)?;
    let value = rest.split(key).next().unwrap_or(rest);
    Some(value.trim().to_string())
}
