/// Utility functions and helpers for sqlmap
///
/// This module provides commonly used helper functions for locking, driving LibSQL
/// futures with deadlines, SQL classification, and scalar value conversion.
use crate::constants::TOKIO_RUNTIME;
use crate::error::{MapperError, Result};
use libsql::Value;
use std::future::Future;
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

/// Safely lock a mutex with proper error handling
///
/// Returns a descriptive error if the mutex is poisoned.
pub fn safe_lock<'a, T>(mutex: &'a Mutex<T>, context: &str) -> Result<MutexGuard<'a, T>> {
    mutex
        .lock()
        .map_err(|e| MapperError::resource(context, format!("mutex poisoned: {e}")))
}

/// Safely lock an Arc<Mutex<T>> with proper error handling
///
/// Returns a descriptive error if the mutex is poisoned.
pub fn safe_lock_arc<'a, T>(
    arc_mutex: &'a Arc<Mutex<T>>,
    context: &str,
) -> Result<MutexGuard<'a, T>> {
    arc_mutex
        .lock()
        .map_err(|e| MapperError::resource(context, format!("arc mutex poisoned: {e}")))
}

/// Run a LibSQL future to completion on the global runtime.
///
/// With a deadline the future is raced against `tokio::time::timeout`, and an elapsed
/// deadline is reported as [`MapperError::Timeout`], never as a store failure.
pub fn block_on_with_timeout<F, T>(context: &str, timeout: Option<Duration>, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    match timeout {
        None => TOKIO_RUNTIME.block_on(fut),
        Some(limit) => TOKIO_RUNTIME.block_on(async {
            tokio::time::timeout(limit, fut)
                .await
                .map_err(|_| MapperError::Timeout {
                    context: context.to_string(),
                    timeout: limit,
                })?
        }),
    }
}

/// Determines if a statement must be run through the query path
///
/// Returns true for SELECT statements and for any statement carrying a RETURNING
/// clause, since LibSQL refuses `execute` on SQL that produces rows.
///
/// This is plain keyword matching. A RETURNING inside a string literal or comment is
/// a false positive, which only costs a query where an execute would have done.
pub fn should_use_query(sql: &str) -> bool {
    let trimmed = sql.trim_start();
    if starts_with_keyword(trimmed, "SELECT") {
        return true;
    }

    let bytes = trimmed.as_bytes();
    let target = b"RETURNING";
    if bytes.len() < target.len() {
        return false;
    }

    (0..=bytes.len() - target.len()).any(|i| {
        let preceded = i == 0 || bytes[i - 1].is_ascii_whitespace();
        let end = i + target.len();
        let followed = end >= bytes.len() || bytes[end].is_ascii_whitespace();
        preceded && followed && bytes[i..end].eq_ignore_ascii_case(target)
    })
}

/// Case-insensitive check that `sql` starts with `keyword` as a whole word.
pub fn starts_with_keyword(sql: &str, keyword: &str) -> bool {
    let bytes = sql.as_bytes();
    let len = keyword.len();
    bytes.len() >= len
        && bytes[..len].eq_ignore_ascii_case(keyword.as_bytes())
        && bytes
            .get(len)
            .is_none_or(|b| b.is_ascii_whitespace() || *b == b'(')
}

/// Short type name of a value, for error messages.
pub fn value_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Integer(_) => "integer",
        Value::Real(_) => "real",
        Value::Text(_) => "text",
        Value::Blob(_) => "blob",
    }
}

/// Convert a store value to `i64`. `None` means NULL.
pub fn value_to_i64(value: &Value) -> Result<Option<i64>> {
    match value {
        Value::Null => Ok(None),
        Value::Integer(i) => Ok(Some(*i)),
        Value::Text(s) => s.trim().parse::<i64>().map(Some).map_err(|_| {
            MapperError::result_shape(format!("cannot convert text '{s}' to an integer"))
        }),
        other => Err(MapperError::result_shape(format!(
            "cannot convert {} to an integer",
            value_type_name(other)
        ))),
    }
}

/// Convert a store value to `f64`. `None` means NULL.
pub fn value_to_f64(value: &Value) -> Result<Option<f64>> {
    match value {
        Value::Null => Ok(None),
        Value::Real(r) => Ok(Some(*r)),
        Value::Integer(i) => Ok(Some(*i as f64)),
        Value::Text(s) => s.trim().parse::<f64>().map(Some).map_err(|_| {
            MapperError::result_shape(format!("cannot convert text '{s}' to a real"))
        }),
        Value::Blob(_) => Err(MapperError::result_shape("cannot convert blob to a real")),
    }
}

/// Convert a store value to `bool`; SQLite stores booleans as integers.
pub fn value_to_bool(value: &Value) -> Result<Option<bool>> {
    match value {
        Value::Text(s) if s.eq_ignore_ascii_case("true") => Ok(Some(true)),
        Value::Text(s) if s.eq_ignore_ascii_case("false") => Ok(Some(false)),
        other => Ok(value_to_i64(other)?.map(|i| i != 0)),
    }
}
