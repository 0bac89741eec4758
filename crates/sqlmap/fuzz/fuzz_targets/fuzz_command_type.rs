#![no_main]
//! Fuzz test for SqlCommandType::from_sql
//!
//! Statement registration classifies arbitrary SQL text; classification must never
//! panic and must agree with the query routing for plain selects.

use libfuzzer_sys::fuzz_target;
use sqlmap::utils::{should_use_query, starts_with_keyword};
use sqlmap::SqlCommandType;

fuzz_target!(|data: &[u8]| {
    if let Ok(sql) = std::str::from_utf8(data) {
        let command = SqlCommandType::from_sql(sql);
        if starts_with_keyword(sql.trim_start(), "SELECT") {
            assert_eq!(command, SqlCommandType::Select);
            assert!(should_use_query(sql));
        }
    }
});
