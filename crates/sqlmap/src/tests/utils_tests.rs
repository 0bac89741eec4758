//! Tests for utils.rs and decode.rs - SQL routing, value conversion and setting decoders
//!
//! These tests verify the correctness of:
//! - `should_use_query()` - Determines whether to use query() vs execute()
//! - `starts_with_keyword()` - Whole-word keyword matching
//! - `SqlCommandType::from_sql()` - Statement classification
//! - `value_to_*()` - Scalar conversions from store values
//! - `block_on_with_timeout()` - Deadline handling on the shared runtime

#![allow(clippy::unwrap_used)]

use crate::decode;
use crate::error::{ErrorKind, MapperError};
use crate::mapping::SqlCommandType;
use crate::models::Mode;
use crate::utils::{
    block_on_with_timeout, safe_lock, should_use_query, starts_with_keyword, value_to_bool,
    value_to_f64, value_to_i64, value_type_name,
};
use libsql::{TransactionBehavior, Value};
use std::sync::Mutex;
use std::time::Duration;

/// Tests for command classification
mod command_classification {
    use super::*;

    #[test]
    fn test_classify_dml() {
        assert_eq!(SqlCommandType::from_sql("SELECT * FROM users"), SqlCommandType::Select);
        assert_eq!(
            SqlCommandType::from_sql("  insert into users (name) values (?)"),
            SqlCommandType::Insert
        );
        assert_eq!(
            SqlCommandType::from_sql("REPLACE INTO users (id) VALUES (1)"),
            SqlCommandType::Insert
        );
        assert_eq!(
            SqlCommandType::from_sql("\nUPDATE users SET name = ?"),
            SqlCommandType::Update
        );
        assert_eq!(
            SqlCommandType::from_sql("DELETE FROM users"),
            SqlCommandType::Delete
        );
    }

    #[test]
    fn test_row_producing_forms_are_selects() {
        assert_eq!(
            SqlCommandType::from_sql("WITH t AS (SELECT 1) SELECT * FROM t"),
            SqlCommandType::Select
        );
        assert_eq!(SqlCommandType::from_sql("VALUES (1), (2)"), SqlCommandType::Select);
        assert_eq!(SqlCommandType::from_sql("SELECT(1)"), SqlCommandType::Select);
    }

    #[test]
    fn test_everything_else_is_unknown() {
        for sql in [
            "CREATE TABLE t (id INTEGER)",
            "PRAGMA foreign_keys = ON",
            "BEGIN",
            "EXPLAIN SELECT 1",
            "SELECTED FROM nowhere",
            "",
            "   ",
        ] {
            assert_eq!(SqlCommandType::from_sql(sql), SqlCommandType::Unknown, "{sql:?}");
        }
    }

    #[test]
    fn test_mutations() {
        assert!(SqlCommandType::Insert.is_mutation());
        assert!(SqlCommandType::Update.is_mutation());
        assert!(SqlCommandType::Delete.is_mutation());
        assert!(!SqlCommandType::Select.is_mutation());
        assert!(!SqlCommandType::Flush.is_mutation());
        assert!(!SqlCommandType::Unknown.is_mutation());
    }
}

/// Tests for query vs execute routing
mod should_use_query_tests {
    use super::*;

    #[test]
    fn test_select_uses_query() {
        assert!(should_use_query("SELECT * FROM users"));
        assert!(should_use_query("select id from users"));
        assert!(should_use_query("  \t\nSELECT 1"));
    }

    #[test]
    fn test_select_must_be_whole_word() {
        assert!(!should_use_query("SELECTED"));
        assert!(!should_use_query("selection_table"));
    }

    #[test]
    fn test_returning_uses_query() {
        assert!(should_use_query("INSERT INTO users (name) VALUES ('a') RETURNING id"));
        assert!(should_use_query("UPDATE users SET a = 1 returning *"));
        assert!(should_use_query("DELETE FROM users WHERE id = 1\nRETURNING\tid"));
    }

    #[test]
    fn test_returning_must_be_whole_word() {
        assert!(!should_use_query("INSERT INTO returning_table VALUES (1)"));
        assert!(!should_use_query("UPDATE t SET x_returning = 1"));
    }

    #[test]
    fn test_plain_mutations_and_ddl_use_execute() {
        assert!(!should_use_query("INSERT INTO users (name) VALUES ('a')"));
        assert!(!should_use_query("UPDATE users SET name = 'b'"));
        assert!(!should_use_query("DELETE FROM users"));
        assert!(!should_use_query("CREATE TABLE t (id INTEGER)"));
        assert!(!should_use_query("BEGIN IMMEDIATE"));
    }

    #[test]
    fn test_short_and_empty_input() {
        assert!(!should_use_query(""));
        assert!(!should_use_query("   "));
        assert!(!should_use_query("SEL"));
    }

    #[test]
    fn test_returning_in_literal_is_a_false_positive() {
        // Plain keyword matching; costs a query where an execute would have done
        assert!(should_use_query("INSERT INTO notes (body) VALUES (' RETURNING ')"));
    }

    #[test]
    fn test_long_statement_is_fast() {
        let sql = format!("INSERT INTO t VALUES {}", "(1), ".repeat(20_000));
        let start = std::time::Instant::now();
        assert!(!should_use_query(&sql));
        assert!(start.elapsed() < Duration::from_secs(1));
    }

    #[test]
    fn test_starts_with_keyword() {
        assert!(starts_with_keyword("WITH x AS (SELECT 1)", "WITH"));
        assert!(starts_with_keyword("with(x)", "WITH"));
        assert!(starts_with_keyword("INSERT", "insert"));
        assert!(!starts_with_keyword("WITHOUT", "WITH"));
        assert!(!starts_with_keyword(" WITH", "WITH"));
    }
}

/// Tests for store value conversions
mod value_conversion {
    use super::*;

    #[test]
    fn test_value_to_i64() {
        assert_eq!(value_to_i64(&Value::Integer(7)).unwrap(), Some(7));
        assert_eq!(value_to_i64(&Value::Null).unwrap(), None);
        assert_eq!(value_to_i64(&Value::Text(" 42 ".to_string())).unwrap(), Some(42));

        let err = value_to_i64(&Value::Text("seven".to_string())).unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ResultShape);
        assert!(value_to_i64(&Value::Real(1.5)).is_err());
        assert!(value_to_i64(&Value::Blob(vec![1])).is_err());
    }

    #[test]
    fn test_value_to_f64() {
        assert_eq!(value_to_f64(&Value::Real(2.5)).unwrap(), Some(2.5));
        assert_eq!(value_to_f64(&Value::Integer(3)).unwrap(), Some(3.0));
        assert_eq!(value_to_f64(&Value::Null).unwrap(), None);
        assert!(value_to_f64(&Value::Blob(vec![])).is_err());
    }

    #[test]
    fn test_value_to_bool() {
        assert_eq!(value_to_bool(&Value::Integer(0)).unwrap(), Some(false));
        assert_eq!(value_to_bool(&Value::Integer(5)).unwrap(), Some(true));
        assert_eq!(value_to_bool(&Value::Text("TRUE".to_string())).unwrap(), Some(true));
        assert_eq!(value_to_bool(&Value::Text("false".to_string())).unwrap(), Some(false));
        assert_eq!(value_to_bool(&Value::Null).unwrap(), None);
    }

    #[test]
    fn test_value_type_names() {
        assert_eq!(value_type_name(&Value::Null), "null");
        assert_eq!(value_type_name(&Value::Integer(1)), "integer");
        assert_eq!(value_type_name(&Value::Real(1.0)), "real");
        assert_eq!(value_type_name(&Value::Text(String::new())), "text");
        assert_eq!(value_type_name(&Value::Blob(Vec::new())), "blob");
    }
}

/// Tests for the runtime and locking helpers
mod runtime_helpers {
    use super::*;

    #[test]
    fn test_block_on_without_deadline() {
        let value = block_on_with_timeout("answer", None, async { Ok(42) }).unwrap();
        assert_eq!(value, 42);
    }

    #[test]
    fn test_block_on_reports_elapsed_deadline_as_timeout() {
        let result: Result<(), MapperError> = block_on_with_timeout(
            "slow statement",
            Some(Duration::from_millis(20)),
            async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                Ok(())
            },
        );

        match result.unwrap_err() {
            MapperError::Timeout { context, timeout } => {
                assert_eq!(context, "slow statement");
                assert_eq!(timeout, Duration::from_millis(20));
            }
            other => panic!("expected Timeout, got {other:?}"),
        }
    }

    #[test]
    fn test_block_on_passes_inner_error_through() {
        let result: Result<(), MapperError> =
            block_on_with_timeout("failing", Some(Duration::from_secs(5)), async {
                Err(MapperError::resource("prepare", "no such table: ghosts"))
            });

        assert_eq!(result.unwrap_err().kind(), ErrorKind::ResourceAccess);
    }

    #[test]
    fn test_safe_lock_reports_poisoning() {
        let mutex = std::sync::Arc::new(Mutex::new(0));
        let poisoner = std::sync::Arc::clone(&mutex);
        let _ = std::thread::spawn(move || {
            let _guard = poisoner.lock().unwrap();
            panic!("poison the lock");
        })
        .join();

        let err = safe_lock(&mutex, "counter").unwrap_err();
        assert_eq!(err.kind(), ErrorKind::ResourceAccess);
        assert!(err.to_string().starts_with("counter: mutex poisoned"));
    }
}

/// Tests for decoding setting strings
mod decoders {
    use super::*;

    #[test]
    fn test_decode_mode() {
        assert_eq!(decode::decode_mode("local"), Some(Mode::Local));
        assert_eq!(decode::decode_mode(" Remote "), Some(Mode::Remote));
        assert_eq!(decode::decode_mode("replica"), Some(Mode::RemoteReplica));
        assert_eq!(decode::decode_mode("remote_replica"), Some(Mode::RemoteReplica));
        assert_eq!(decode::decode_mode("cloud"), None);
        assert!(decode::require_mode("cloud")
            .unwrap_err()
            .to_string()
            .contains("unknown connection mode 'cloud'"));
    }

    #[test]
    fn test_decode_transaction_behavior() {
        assert!(matches!(
            decode::decode_transaction_behavior("IMMEDIATE"),
            Some(TransactionBehavior::Immediate)
        ));
        assert!(matches!(
            decode::decode_transaction_behavior("readonly"),
            Some(TransactionBehavior::ReadOnly)
        ));
        assert!(decode::decode_transaction_behavior("eventually").is_none());
        assert_eq!(
            decode::require_transaction_behavior("eventually")
                .unwrap_err()
                .kind(),
            ErrorKind::Configuration
        );
    }

    #[test]
    fn test_begin_statements() {
        assert_eq!(decode::begin_statement(TransactionBehavior::Deferred), "BEGIN DEFERRED");
        assert_eq!(decode::begin_statement(TransactionBehavior::Immediate), "BEGIN IMMEDIATE");
        assert_eq!(decode::begin_statement(TransactionBehavior::Exclusive), "BEGIN EXCLUSIVE");
        assert_eq!(decode::begin_statement(TransactionBehavior::ReadOnly), "BEGIN READONLY");
    }
}
