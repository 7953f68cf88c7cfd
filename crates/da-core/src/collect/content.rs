//! Views over raw file bytes read from the device.
//!
//! A single read produces three independent views: a lossy text decoding, the
//! printable-ASCII runs found in that decoding, and a base64 blob of the
//! original bytes. Only the blob is lossless.

use super::types::ExtractedContent;
use base64::Engine;

/// Minimum length of a reported printable run.
pub const MIN_RUN_LEN: usize = 4;

/// Derive all content views for `bytes` read from `path`.
pub fn extract_content(path: &str, bytes: &[u8]) -> ExtractedContent {
    let text_view = String::from_utf8_lossy(bytes).into_owned();
    let printable_runs = printable_runs(&text_view, MIN_RUN_LEN);
    ExtractedContent {
        path: path.to_string(),
        byte_length: bytes.len(),
        text_view,
        printable_runs,
        encoded_blob: encode_blob(bytes),
    }
}

/// Maximal runs of printable ASCII (`0x20..=0x7E`) at least `min_len` long.
///
/// Runs are returned in order of appearance; repeated strings are kept.
pub fn printable_runs(text: &str, min_len: usize) -> Vec<String> {
    let mut runs = Vec::new();
    let mut current = String::new();

    for c in text.chars() {
        if is_printable_ascii(c) {
            current.push(c);
            continue;
        }
        if current.len() >= min_len {
            runs.push(std::mem::take(&mut current));
        } else {
            current.clear();
        }
    }
    if current.len() >= min_len {
        runs.push(current);
    }

    runs
}

fn is_printable_ascii(c: char) -> bool {
    matches!(c, ' '..='~')
}

/// Standard padded base64 of the original bytes.
pub fn encode_blob(bytes: &[u8]) -> String {
    base64::engine::general_purpose::STANDARD.encode(bytes)
}

/// Inverse of [`encode_blob`].
pub fn decode_blob(blob: &str) -> Result<Vec<u8>, base64::DecodeError> {
    base64::engine::general_purpose::STANDARD.decode(blob)
}
