/// Result caches and their decorators
///
/// A cache is a [`Cache`] implementation, usually a [`PerpetualCache`] at the bottom of a
/// decorator chain. The chain the configuration builds for a namespace is
///
/// ```text
/// SynchronizedCache -> LoggingCache -> LruCache -> PerpetualCache
/// ```
///
/// None of the decorators assumes its position in the chain. Only [`SynchronizedCache`]
/// is safe to share between sessions; everything below it expects a single mutator.
pub mod logging;
pub mod lru;
pub mod perpetual;
pub mod synchronized;

pub use logging::LoggingCache;
pub use lru::LruCache;
pub use perpetual::PerpetualCache;
pub use synchronized::SynchronizedCache;

use crate::mapping::{BoundSql, MappedStatement};
use crate::models::{MapKey, Row, RowBounds};
use parking_lot::RwLock;
use std::sync::Arc;

/// Key/value store contract shared by the base cache and every decorator.
pub trait Cache<K, V>: Send {
    fn id(&self) -> &str;

    fn put_object(&mut self, key: K, value: V);

    fn get_object(&mut self, key: &K) -> Option<V>;

    fn remove_object(&mut self, key: &K) -> Option<V>;

    fn clear(&mut self);

    /// Number of entries held by the underlying store.
    fn size(&self) -> usize;

    /// Lock handle for callers that need a whole-cache atomic section.
    fn read_write_lock(&self) -> Option<Arc<RwLock<()>>> {
        None
    }
}

/// Rows cached for one query.
pub type CachedRows = Arc<Vec<Row>>;

/// The shared, lockable cache a namespace's statements consult.
pub type SharedResultCache = SynchronizedCache<CacheKey, CachedRows>;

/// Identity of one query execution: statement, bounds, SQL and bound values.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub struct CacheKey {
    parts: Vec<MapKey>,
}

impl CacheKey {
    pub fn new() -> Self {
        CacheKey::default()
    }

    pub fn update(&mut self, part: impl Into<MapKey>) {
        self.parts.push(part.into());
    }

    /// Key of a select over `bound` with the given bounds.
    pub fn for_query(ms: &MappedStatement, bounds: RowBounds, bound: &BoundSql) -> Self {
        let mut key = CacheKey::new();
        key.update(ms.id());
        key.update(bounds.offset as i64);
        key.update(bounds.limit.map_or(-1, |l| l as i64));
        key.update(bound.sql());
        for value in bound.values() {
            key.update(MapKey::from(value));
        }
        key
    }

    pub fn parts(&self) -> &[MapKey] {
        &self.parts
    }
}
