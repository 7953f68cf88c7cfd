//! Fuzz target for file-type probe parsing and listing enrichment.
//!
//! `parse_probe_output` must accept arbitrary input without panicking.

#![no_main]

use da_core::collect::{enrich_entries, parse_listing, parse_probe_output};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: (&str, &str)| {
    let (listing, probe) = data;
    let _ = parse_probe_output(probe);
    let mut entries = parse_listing(listing);
    enrich_entries(&mut entries, probe);
});
