#![no_main]
//! Fuzz test for should_use_query
//!
//! Every statement a mapper runs is routed through this check, so it must accept any
//! SQL text without panicking.

use libfuzzer_sys::fuzz_target;
use sqlmap::utils::should_use_query;

fuzz_target!(|data: &[u8]| {
    if let Ok(sql) = std::str::from_utf8(data) {
        let _ = should_use_query(sql);
    }
});
