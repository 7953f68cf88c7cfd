//! Fuzz target for package list and timestamp parsing.
//!
//! `parse_package_timestamps` must accept arbitrary input without panicking.

#![no_main]

use da_core::collect::{build_package_index, parse_package_list, parse_package_timestamps};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: (&str, &str)| {
    let (list, dump) = data;
    let names = parse_package_list(list);
    let index = build_package_index(&names, &parse_package_timestamps(dump));
    assert_eq!(index.len(), names.len());
});
