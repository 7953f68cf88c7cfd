//! Parser for long-format directory listings (`ls -l` on the device shell).
//!
//! Toybox `ls -l` output looks like:
//!
//! ```text
//! total 24
//! drwxrwx--x 2 u0_a123 sdcard_rw 4096 2023-05-01 10:00 Download
//! -rw-rw---- 1 u0_a123 sdcard_rw 1024 2023-05-01 10:00 my file.txt
//! lrwxrwxrwx 1 root    root        21 2023-05-01 10:00 sdcard -> /storage/self/primary
//! ```
//!
//! The number of owner/group columns is not stable across OS versions, so the
//! name boundary is found from the ISO date column rather than by position.
//! Lines that cannot be anchored are skipped; the parse never fails.

use super::types::{FileEntry, FileKind};
use tracing::trace;

/// Minimum token count for a listing row.
const MIN_TOKENS: usize = 7;

/// Parse the full text of one `ls -l` invocation.
pub fn parse_listing(output: &str) -> Vec<FileEntry> {
    output.lines().filter_map(parse_listing_line).collect()
}

/// Parse a single listing row, or `None` for blank, summary, and malformed lines.
pub fn parse_listing_line(line: &str) -> Option<FileEntry> {
    let line = line.trim();
    if line.is_empty() || line.starts_with("total ") {
        return None;
    }

    let tokens: Vec<&str> = line.split_whitespace().collect();
    if tokens.len() < MIN_TOKENS {
        trace!(line, "listing row has too few columns");
        return None;
    }

    let Some(date_idx) = tokens.iter().position(|t| looks_like_date(t)) else {
        trace!(line, "listing row has no date column");
        return None;
    };

    // The size column precedes the date and the time column follows it.
    if date_idx == 0 || date_idx + 1 >= tokens.len() {
        trace!(line, date_idx, "date column at row edge");
        return None;
    }

    let permissions = tokens[0];
    Some(FileEntry {
        name: tokens[date_idx + 2..].join(" "),
        kind: FileKind::from_mode(permissions),
        size: tokens[date_idx - 1].to_string(),
        modified: format!("{} {}", tokens[date_idx], tokens[date_idx + 1]),
        permissions: permissions.to_string(),
        content_hint: None,
        raw: line.to_string(),
    })
}

/// Whether a token starts with `DDDD-DD-DD`.
fn looks_like_date(token: &str) -> bool {
    let bytes = token.as_bytes();
    if bytes.len() < 10 {
        return false;
    }
    bytes[..10].iter().enumerate().all(|(i, b)| match i {
        4 | 7 => *b == b'-',
        _ => b.is_ascii_digit(),
    })
}

/// Order entries directories first, then by name.
pub fn sort_entries(entries: &mut [FileEntry]) {
    entries.sort_by(|a, b| {
        b.is_dir()
            .cmp(&a.is_dir())
            .then_with(|| a.name.cmp(&b.name))
    });
}
