//! Security profile extraction from `dumpsys package <name>` output.
//!
//! Each field is extracted independently. A missing marker leaves that field
//! at its default and nothing else is affected.

use super::types::PackageSecurityProfile;
use once_cell::sync::Lazy;
use regex::Regex;
use std::collections::BTreeSet;
use tracing::debug;

static VERSION_NAME: Lazy<Option<Regex>> =
    Lazy::new(|| super::compile_pattern(r"versionName=(\S+)"));
static VERSION_CODE: Lazy<Option<Regex>> =
    Lazy::new(|| super::compile_pattern(r"versionCode=(\d+)"));
static USER_ID: Lazy<Option<Regex>> = Lazy::new(|| super::compile_pattern(r"userId=(\d+)"));
static APP_ID: Lazy<Option<Regex>> = Lazy::new(|| super::compile_pattern(r"appId=(\d+)"));
static DATA_DIR: Lazy<Option<Regex>> = Lazy::new(|| super::compile_pattern(r"dataDir=(\S+)"));

static REQUESTED_END: Lazy<Option<Regex>> = Lazy::new(|| {
    super::compile_pattern(r"install permissions:|User \d|runtime permissions:")
});
static INSTALL_END: Lazy<Option<Regex>> =
    Lazy::new(|| super::compile_pattern(r"User \d|runtime permissions:"));

static REQUESTED_PERMISSION: Lazy<Option<Regex>> = Lazy::new(|| {
    super::compile_pattern(r"(android\.permission\.\w+|com\.[\w.]+\.permission\.\w+)")
});
static GRANTED_FLAG: Lazy<Option<Regex>> =
    Lazy::new(|| super::compile_pattern(r"([\w.]+\.permission\.\w+):\s*granted=true"));
static INSTALL_PERMISSION: Lazy<Option<Regex>> =
    Lazy::new(|| super::compile_pattern(r"([\w.]+\.permission\.\w+)"));

static SCHEME: Lazy<Option<Regex>> = Lazy::new(|| super::compile_pattern(r#"Scheme: "([^"]+)""#));
static PROVIDER: Lazy<Option<Regex>> =
    Lazy::new(|| super::compile_pattern(r"Provider\{[a-f0-9]+\s+(\S+)\}"));
static ACTION: Lazy<Option<Regex>> = Lazy::new(|| super::compile_pattern(r#"Action: "([^"]+)""#));
static CATEGORY: Lazy<Option<Regex>> =
    Lazy::new(|| super::compile_pattern(r#"Category: "([^"]+)""#));

const REQUESTED_HEADER: &str = "requested permissions:";
const INSTALL_HEADER: &str = "install permissions:";
const DEBUGGABLE_MARKERS: [&str; 2] = ["DEBUGGABLE", "debuggable=true"];

/// Intent categories that can show up where a scheme is expected.
const NON_SCHEMES: [&str; 2] = [
    "android.intent.category.DEFAULT",
    "android.intent.category.BROWSABLE",
];

/// Analyze one package dump. Total: any input yields a profile.
pub fn analyze_package(dump: &str) -> PackageSecurityProfile {
    let mut profile = PackageSecurityProfile::default();

    if let Some(v) = first_capture(&VERSION_NAME, dump) {
        profile.version_name = v;
    }
    if let Some(v) = first_capture(&VERSION_CODE, dump) {
        profile.version_code = v;
    }
    if let Some(v) = first_capture(&USER_ID, dump).or_else(|| first_capture(&APP_ID, dump)) {
        profile.user_id = v;
    }
    if let Some(v) = first_capture(&DATA_DIR, dump) {
        profile.data_dir = v;
    }

    profile.is_debuggable = is_debuggable(dump);
    profile.requested_permissions = requested_permissions(dump);
    profile.granted_permissions = granted_permissions(dump);

    profile.uri_schemes = all_captures(&SCHEME, dump)
        .into_iter()
        .filter(|s| !NON_SCHEMES.contains(&s.as_str()))
        .collect();
    profile.content_providers = all_captures(&PROVIDER, dump);
    profile.intent_actions = all_captures(&ACTION, dump);
    profile.intent_categories = all_captures(&CATEGORY, dump);

    profile
}

pub fn is_debuggable(dump: &str) -> bool {
    DEBUGGABLE_MARKERS.iter().any(|m| dump.contains(m))
}

/// Permissions named in the requested-permissions section.
///
/// The section must be closed by a following header; an unterminated
/// section is treated as absent.
pub fn requested_permissions(dump: &str) -> BTreeSet<String> {
    match section(dump, REQUESTED_HEADER, &REQUESTED_END) {
        Some(span) => all_captures(&REQUESTED_PERMISSION, span),
        None => {
            debug!("no bounded requested-permissions section");
            BTreeSet::new()
        }
    }
}

/// Union of `granted=true` flags anywhere and the install-permissions section.
pub fn granted_permissions(dump: &str) -> BTreeSet<String> {
    let mut granted = all_captures(&GRANTED_FLAG, dump);
    if let Some(span) = section(dump, INSTALL_HEADER, &INSTALL_END) {
        granted.extend(all_captures(&INSTALL_PERMISSION, span));
    }
    granted
}

/// Text after the first `header` up to the earliest match of `end`.
fn section<'a>(text: &'a str, header: &str, end: &Lazy<Option<Regex>>) -> Option<&'a str> {
    let start = text.find(header)? + header.len();
    let rest = &text[start..];
    let end = end.as_ref()?.find(rest)?;
    Some(&rest[..end.start()])
}

fn first_capture(pattern: &Lazy<Option<Regex>>, text: &str) -> Option<String> {
    let caps = pattern.as_ref()?.captures(text)?;
    caps.get(1).map(|m| m.as_str().to_string())
}

fn all_captures(pattern: &Lazy<Option<Regex>>, text: &str) -> BTreeSet<String> {
    let Some(re) = pattern.as_ref() else {
        return BTreeSet::new();
    };
    re.captures_iter(text)
        .filter_map(|c| c.get(1))
        .map(|m| m.as_str().to_string())
        .collect()
}
