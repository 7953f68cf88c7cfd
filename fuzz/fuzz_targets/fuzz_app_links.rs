//! Fuzz target for app-link verification parsing.
//!
//! `parse_app_links` must accept arbitrary input without panicking.

#![no_main]

use da_core::collect::{parse_app_links, Severity};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &str| {
    for state in parse_app_links(data).domains {
        if state.user_disabled {
            assert_eq!(state.severity, Severity::Blocked);
        }
    }
});
