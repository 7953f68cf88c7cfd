//! Fuzz target for file content extraction.
//!
//! `extract_content` must accept arbitrary input without panicking.

#![no_main]

use da_core::collect::{decode_blob, extract_content};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let content = extract_content("/fuzz", data);
    assert_eq!(content.byte_length, data.len());
    assert_eq!(decode_blob(&content.encoded_blob).ok().as_deref(), Some(data));
});
