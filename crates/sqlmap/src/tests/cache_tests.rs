//! Tests for the result caches, their decorators and the transactional staging layer

#![allow(clippy::unwrap_used)]

use crate::cache::lru::RecencyIndex;
use crate::cache::{
    Cache, CacheKey, CachedRows, LoggingCache, LruCache, PerpetualCache, SharedResultCache,
    SynchronizedCache,
};
use crate::configuration::Configuration;
use crate::executor::TransactionalCache;
use crate::models::Row;
use libsql::Value;
use std::sync::Arc;

fn lru(capacity: usize) -> LruCache<&'static str, i32> {
    LruCache::with_capacity(PerpetualCache::new("test"), capacity)
}

fn rows(n: i64) -> CachedRows {
    Arc::new(vec![Row::from_pairs([("n", Value::Integer(n))])])
}

fn key(part: &str) -> CacheKey {
    let mut key = CacheKey::new();
    key.update(part);
    key
}

fn shared(namespace: &str) -> SharedResultCache {
    SynchronizedCache::new(PerpetualCache::new(namespace))
}

#[test]
fn test_read_protects_entry_from_eviction() {
    let mut cache = lru(2);

    cache.put_object("A", 1);
    cache.put_object("B", 2);
    assert_eq!(cache.get_object(&"A"), Some(1));
    cache.put_object("C", 3);

    assert_eq!(cache.size(), 2);
    assert_eq!(cache.get_object(&"A"), Some(1));
    assert_eq!(cache.get_object(&"B"), None);
    assert_eq!(cache.get_object(&"C"), Some(3));
}

#[test]
fn test_one_eviction_per_insertion_over_capacity() {
    let mut cache = lru(3);
    for (i, k) in ["a", "b", "c", "d", "e"].into_iter().enumerate() {
        cache.put_object(k, i as i32);
    }

    assert_eq!(cache.size(), 3);
    assert_eq!(cache.recency_order(), vec!["c", "d", "e"]);
}

#[test]
fn test_overwriting_a_key_does_not_evict() {
    let mut cache = lru(2);
    cache.put_object("A", 1);
    cache.put_object("B", 2);
    cache.put_object("A", 10);

    assert_eq!(cache.size(), 2);
    assert_eq!(cache.get_object(&"A"), Some(10));
    assert_eq!(cache.recency_order(), vec!["B", "A"]);
}

#[test]
fn test_direct_remove_leaves_stale_index_entry() {
    let mut cache = lru(2);
    cache.put_object("A", 1);
    cache.put_object("B", 2);

    assert_eq!(cache.remove_object(&"A"), Some(1));

    // The delegate dropped A; the recency index still tracks it until it ages out
    assert_eq!(cache.size(), 1);
    assert_eq!(cache.get_object(&"A"), None);
    assert!(cache.recency_order().contains(&"A"));

    cache.put_object("C", 3);
    assert_eq!(cache.get_object(&"B"), Some(2));
    assert_eq!(cache.get_object(&"C"), Some(3));
}

#[test]
fn test_reinsert_after_remove_self_corrects() {
    let mut cache = lru(2);
    cache.put_object("A", 1);
    cache.remove_object(&"A");
    cache.put_object("A", 5);

    assert_eq!(cache.recency_order(), vec!["A"]);
    assert_eq!(cache.get_object(&"A"), Some(5));
}

#[test]
fn test_clear_empties_store_and_index() {
    let mut cache = lru(4);
    cache.put_object("A", 1);
    cache.put_object("B", 2);

    cache.clear();

    assert_eq!(cache.size(), 0);
    assert!(cache.recency_order().is_empty());
    cache.put_object("C", 3);
    assert_eq!(cache.recency_order(), vec!["C"]);
}

#[test]
fn test_recency_index_touch_and_pop() {
    let mut index = RecencyIndex::new();
    index.insert(1);
    index.insert(2);
    index.insert(3);

    assert!(index.touch(&1));
    assert!(!index.touch(&9));
    assert_eq!(index.keys(), vec![2, 3, 1]);
    assert_eq!(index.pop_eldest(), Some(2));
    assert_eq!(index.len(), 2);
    assert!(!index.contains(&2));
}

#[test]
fn test_decorators_compose_in_either_order() {
    let mut logged_lru: LoggingCache<&str, i32> = LoggingCache::new(lru(1));
    logged_lru.put_object("A", 1);
    logged_lru.put_object("B", 2);
    assert_eq!(logged_lru.get_object(&"A"), None);
    assert_eq!(logged_lru.get_object(&"B"), Some(2));
    assert_eq!(logged_lru.requests(), 2);
    assert_eq!(logged_lru.hits(), 1);
    assert!((logged_lru.hit_ratio() - 0.5).abs() < f64::EPSILON);

    let mut lru_over_logging: LruCache<&str, i32> =
        LruCache::with_capacity(LoggingCache::new(PerpetualCache::new("inner")), 1);
    lru_over_logging.put_object("A", 1);
    lru_over_logging.put_object("B", 2);
    assert_eq!(lru_over_logging.size(), 1);
    assert_eq!(lru_over_logging.id(), "inner");
}

#[test]
fn test_synchronized_handles_share_one_cache() {
    let cache: SynchronizedCache<&str, i32> = SynchronizedCache::new(lru(8));
    let other = cache.clone();

    cache.put("A", 1);

    assert!(cache.same_cache(&other));
    assert_eq!(other.get(&"A"), Some(1));
    assert_eq!(other.size(), 1);
    assert_eq!(cache.id(), "test");

    let lock = cache.lock_handle();
    let _guard = lock.write();
    assert!(other.lock_handle().try_read().is_none());
}

#[test]
fn test_synchronized_cache_across_threads() {
    let cache: SynchronizedCache<i64, i64> = SynchronizedCache::new(LruCache::with_capacity(
        PerpetualCache::new("threads"),
        1000,
    ));

    let handles: Vec<_> = (0..4)
        .map(|t| {
            let cache = cache.clone();
            std::thread::spawn(move || {
                for i in 0..100 {
                    cache.put(t * 100 + i, i);
                }
            })
        })
        .collect();
    for handle in handles {
        handle.join().unwrap();
    }

    assert_eq!(cache.size(), 400);
}

#[test]
fn test_transactional_cache_publishes_on_commit() {
    let delegate = shared("app.User");
    let mut tx_cache = TransactionalCache::new(delegate.clone());

    tx_cache.put_object(key("q1"), rows(1));
    assert!(delegate.get(&key("q1")).is_none());
    assert!(tx_cache.get_object(&key("q1")).is_none());

    tx_cache.commit();

    assert_eq!(delegate.get(&key("q1")), Some(rows(1)));
}

#[test]
fn test_transactional_cache_rollback_discards_staged() {
    let delegate = shared("app.User");
    let mut tx_cache = TransactionalCache::new(delegate.clone());

    tx_cache.put_object(key("q1"), rows(1));
    tx_cache.rollback();
    tx_cache.commit();

    assert_eq!(delegate.size(), 0);
}

#[test]
fn test_transactional_clear_hides_then_clears_on_commit() {
    let delegate = shared("app.User");
    delegate.put(key("old"), rows(1));
    let mut tx_cache = TransactionalCache::new(delegate.clone());

    tx_cache.clear();
    assert!(tx_cache.get_object(&key("old")).is_none());
    assert_eq!(delegate.size(), 1);

    tx_cache.put_object(key("new"), rows(2));
    tx_cache.commit();

    assert!(delegate.get(&key("old")).is_none());
    assert_eq!(delegate.get(&key("new")), Some(rows(2)));
}

#[test]
fn test_configuration_builds_namespace_cache() {
    let mut configuration = Configuration::default();

    let cache = configuration.add_cache("app.User", Some(2)).unwrap();
    cache.put(key("a"), rows(1));
    cache.put(key("b"), rows(2));
    cache.get(&key("a"));
    cache.put(key("c"), rows(3));

    assert_eq!(cache.id(), "app.User");
    assert_eq!(cache.size(), 2);
    assert!(cache.get(&key("b")).is_none());

    assert!(configuration.add_cache("app.User", None).is_err());
    assert!(configuration.add_cache("app.Empty", Some(0)).is_err());
}

#[test]
fn test_cache_ref_shares_existing_cache() {
    let mut configuration = Configuration::default();
    let cache = configuration.add_cache("app.User", None).unwrap();

    let shared = configuration.resolve_cache_ref("app.User").unwrap();
    assert!(shared.same_cache(&cache));

    let err = configuration.resolve_cache_ref("app.Order").unwrap_err();
    assert_eq!(
        err.to_string(),
        "configuration error: No cache for namespace 'app.Order' could be found."
    );
}
