//! Parser for `pm get-app-links` output (domain verification state).
//!
//! ```text
//! com.example.app:
//!   ID: 5f8a...
//!   Signatures: [AB:CD:...]
//!   Domain verification state:
//!     example.com: 1024
//!     www.example.com: 1
//!   User 0:
//!     Verification link handling allowed: true
//!     Selection state:
//!       Disabled:
//!         example.com
//! ```
//!
//! Two passes: each `<domain>: <code>` line in the verification section is
//! classified from its code, then any domain listed after the `Disabled:`
//! marker is forced to `blocked`.

use super::types::{AppLinksReport, DomainVerificationState, Severity};
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{trace, warn};

const SECTION_HEADER: &str = "Domain verification state:";
const SECTION_END: &str = "User 0:";
const DISABLED_MARKER: &str = "Disabled:";
const USER_DISABLED_SUFFIX: &str = " [USER DISABLED]";

/// Verified by the platform's automatic check.
pub const STATE_VERIFIED: u64 = 1;
/// Approved by the user.
pub const STATE_APPROVED: u64 = 2;
/// Legacy state; automatic verification never succeeded.
pub const STATE_LEGACY_FAILURE: u64 = 1024;

static DOMAIN_LINE: Lazy<Option<Regex>> =
    Lazy::new(|| super::compile_pattern(r"^([\w.-]+):\s+(\d+)"));

/// Parse the full app-links text for one package.
pub fn parse_app_links(output: &str) -> AppLinksReport {
    let disabled_region = disabled_region(output);

    let domains = verification_section(output)
        .map(|section| {
            section
                .lines()
                .filter_map(parse_domain_line)
                .map(|(domain, code)| {
                    let disabled = disabled_region.is_some_and(|r| r.contains(domain));
                    domain_state(domain, code, disabled)
                })
                .collect()
        })
        .unwrap_or_default();

    AppLinksReport {
        domains,
        raw: output.to_string(),
    }
}

/// Description and severity for a state code, before any user override.
pub fn classify(code: u64) -> (String, Severity) {
    match code {
        STATE_VERIFIED => ("Verified (Automatic)".to_string(), Severity::Ok),
        STATE_APPROVED => ("Approved (User)".to_string(), Severity::Ok),
        STATE_LEGACY_FAILURE => ("Legacy/Unverified (1024)".to_string(), Severity::Caution),
        other => (format!("State Code: {}", other), Severity::Blocked),
    }
}

/// Build one record; a user-disabled domain is always `blocked`.
pub fn domain_state(domain: &str, code: u64, user_disabled: bool) -> DomainVerificationState {
    let (mut description, mut severity) = classify(code);
    if user_disabled {
        severity = Severity::Blocked;
        description.push_str(USER_DISABLED_SUFFIX);
    }
    DomainVerificationState {
        domain: domain.to_string(),
        code,
        description,
        severity,
        user_disabled,
    }
}

/// Text between the section header and `User 0:` (or end of text).
fn verification_section(output: &str) -> Option<&str> {
    let start = output.find(SECTION_HEADER)? + SECTION_HEADER.len();
    let rest = &output[start..];
    let end = rest.find(SECTION_END).unwrap_or(rest.len());
    Some(&rest[..end])
}

/// Text after the first `Disabled:` marker, up to the next one.
///
/// Present only when some `Disabled:` marker ends its line.
fn disabled_region(output: &str) -> Option<&str> {
    if !output.contains("Disabled:\n") && !output.contains("Disabled:\r\n") {
        return None;
    }
    let start = output.find(DISABLED_MARKER)? + DISABLED_MARKER.len();
    let rest = &output[start..];
    let end = rest.find(DISABLED_MARKER).unwrap_or(rest.len());
    Some(&rest[..end])
}

fn parse_domain_line(line: &str) -> Option<(&str, u64)> {
    let line = line.trim_start();
    let Some(pattern) = DOMAIN_LINE.as_ref() else {
        return None;
    };
    let caps = pattern.captures(line)?;
    let domain = caps.get(1)?.as_str();
    let code_str = caps.get(2)?.as_str();
    match code_str.parse::<u64>() {
        Ok(code) => Some((domain, code)),
        Err(_) => {
            trace!(domain, code = code_str, "state code out of range");
            None
        }
    }
}

/// Report for a failed capture, logging the reason.
pub fn report_for_failure(reason: &str) -> AppLinksReport {
    warn!(reason, "app-links capture failed");
    AppLinksReport::from_failure(reason)
}
