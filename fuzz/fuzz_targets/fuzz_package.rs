//! Fuzz target for package dump analysis.
//!
//! `analyze_package` must accept arbitrary input without panicking.

#![no_main]

use da_core::collect::analyze_package;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    let _ = analyze_package(data);
});
