//! Fuzz target for device list parsing.
//!
//! `parse_devices` must accept arbitrary input without panicking.

#![no_main]

use da_core::collect::parse_devices;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    let _ = parse_devices(data);
});
