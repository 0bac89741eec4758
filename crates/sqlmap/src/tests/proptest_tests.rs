//! Property-based tests using proptest
//!
//! These tests verify invariants that should hold for all inputs,
//! helping catch edge cases that unit tests might miss.

#![allow(clippy::unwrap_used)]

use crate::cache::{Cache, LruCache, PerpetualCache};
use crate::mapping::SqlCommandType;
use crate::models::RowBounds;
use crate::utils::should_use_query;
use proptest::prelude::*;

#[derive(Debug, Clone)]
enum CacheOp {
    Put(u8, i32),
    Get(u8),
}

fn cache_op() -> impl Strategy<Value = CacheOp> {
    prop_oneof![
        (0u8..12, any::<i32>()).prop_map(|(k, v)| CacheOp::Put(k, v)),
        (0u8..12).prop_map(CacheOp::Get),
    ]
}

/// Reference model: keys from least to most recently used, with their values.
fn model_touch(model: &mut Vec<(u8, i32)>, key: u8) -> Option<i32> {
    let pos = model.iter().position(|(k, _)| *k == key)?;
    let entry = model.remove(pos);
    model.push(entry);
    Some(entry.1)
}

proptest! {
    /// Property: should_use_query should never panic for any valid UTF-8 string
    #[test]
    fn should_use_query_never_panics(sql in ".*") {
        let _ = should_use_query(&sql);
    }

    /// Property: from_sql should never panic for any valid UTF-8 string
    #[test]
    fn from_sql_never_panics(sql in ".*") {
        let _ = SqlCommandType::from_sql(&sql);
    }

    /// Property: SELECT statements should always return true from should_use_query
    #[test]
    fn select_always_uses_query(
        whitespace in r"[ \t\n\r]*",
        rest in "[^;]*"
    ) {
        let sql = format!("{whitespace}SELECT {rest}");
        prop_assert!(should_use_query(&sql), "SELECT should use query: {}", sql);
        prop_assert_eq!(SqlCommandType::from_sql(&sql), SqlCommandType::Select);
    }

    /// Property: Statements with RETURNING should use query
    #[test]
    fn returning_uses_query(
        prefix in "(INSERT|UPDATE|DELETE)[ \t]+[^;]*",
        whitespace in r"[ \t]+",
        rest in "[^;]*"
    ) {
        let sql = format!("{prefix}{whitespace}RETURNING{whitespace}{rest}");
        prop_assert!(should_use_query(&sql), "RETURNING should use query: {}", sql);
        prop_assert!(SqlCommandType::from_sql(&sql).is_mutation());
    }

    /// Property: Classification ignores keyword case
    #[test]
    fn classification_is_case_insensitive(
        keyword in "(select|insert|update|delete)",
        upper in any::<bool>(),
        rest in "[a-z ]{0,30}"
    ) {
        let keyword = if upper { keyword.to_ascii_uppercase() } else { keyword };
        let lower = format!("{} {rest}", keyword.to_ascii_lowercase());
        let mixed = format!("{keyword} {rest}");
        prop_assert_eq!(SqlCommandType::from_sql(&lower), SqlCommandType::from_sql(&mixed));
        prop_assert_ne!(SqlCommandType::from_sql(&mixed), SqlCommandType::Unknown);
    }

    /// Property: Only selects are routed through the query path unless RETURNING appears
    #[test]
    fn plain_mutations_use_execute(
        keyword in "(INSERT INTO|UPDATE|DELETE FROM)",
        table in "[a-z_]{1,12}"
    ) {
        prop_assume!(!table.eq_ignore_ascii_case("returning"));
        let sql = format!("{keyword} {table}");
        prop_assert!(!should_use_query(&sql));
    }

    /// Property: The LRU never holds more than its capacity and agrees with a simple model
    #[test]
    fn lru_matches_reference_model(
        capacity in 1usize..6,
        ops in prop::collection::vec(cache_op(), 0..80)
    ) {
        let mut cache: LruCache<u8, i32> =
            LruCache::with_capacity(PerpetualCache::new("prop"), capacity);
        let mut model: Vec<(u8, i32)> = Vec::new();

        for op in ops {
            match op {
                CacheOp::Put(key, value) => {
                    cache.put_object(key, value);
                    if let Some(entry) = model.iter_mut().find(|(k, _)| *k == key) {
                        entry.1 = value;
                        model_touch(&mut model, key);
                    } else {
                        model.push((key, value));
                        if model.len() > capacity {
                            model.remove(0);
                        }
                    }
                }
                CacheOp::Get(key) => {
                    let expected = model_touch(&mut model, key);
                    prop_assert_eq!(cache.get_object(&key), expected);
                }
            }
            prop_assert!(cache.size() <= capacity);
            prop_assert_eq!(cache.size(), model.len());
        }

        let order: Vec<u8> = model.iter().map(|(k, _)| *k).collect();
        prop_assert_eq!(cache.recency_order(), order);
    }

    /// Property: Bounds keep exactly the rows in [offset, offset + limit)
    #[test]
    fn row_bounds_window(offset in 0usize..20, limit in 0usize..20, total in 0usize..40) {
        let bounds = RowBounds::new(offset, limit);
        let kept = (0..total)
            .filter(|idx| *idx >= offset)
            .take_while(|idx| !bounds.exhausted_at(*idx))
            .count();
        prop_assert_eq!(kept, total.saturating_sub(offset).min(limit));
    }
}
