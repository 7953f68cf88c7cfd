//! Fuzz target for directory listing parsing.
//!
//! `parse_listing` must accept arbitrary input without panicking.

#![no_main]

use da_core::collect::parse_listing;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    // Every parsed row must carry the kind its permission string implies.
    for entry in parse_listing(data) {
        assert_eq!(entry.kind, da_core::collect::FileKind::from_mode(&entry.permissions));
    }
});
