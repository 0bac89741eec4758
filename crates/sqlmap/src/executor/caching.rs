/// Second-level result caching
///
/// [`CachingExecutor`] consults the namespace cache of a select before running it.
/// Nothing it reads from the store becomes visible to other sessions until the session
/// commits: misses are staged in a [`TransactionalCache`] per namespace cache and
/// published on commit, or dropped on rollback. A statement that flushes the cache marks
/// the namespace cache to be cleared at commit, and hides it from this session's reads
/// in the meantime.
use super::{BatchResult, Executor, ExecutorStats};
use crate::cache::{CacheKey, CachedRows, SharedResultCache};
use crate::cursor::RowCursor;
use crate::error::Result;
use crate::mapping::{MappedStatement, ParameterObject};
use crate::models::{ResultHandler, Row, RowBounds};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

/// Session-local staging area in front of one shared cache.
pub struct TransactionalCache {
    delegate: SharedResultCache,
    clear_on_commit: bool,
    entries_to_add_on_commit: HashMap<CacheKey, CachedRows>,
}

impl TransactionalCache {
    pub fn new(delegate: SharedResultCache) -> Self {
        TransactionalCache {
            delegate,
            clear_on_commit: false,
            entries_to_add_on_commit: HashMap::new(),
        }
    }

    pub fn id(&self) -> &str {
        self.delegate.id()
    }

    /// Read through to the shared cache. A pending clear hides every entry.
    pub fn get_object(&self, key: &CacheKey) -> Option<CachedRows> {
        let found = self.delegate.get(key);
        if self.clear_on_commit {
            None
        } else {
            found
        }
    }

    pub fn put_object(&mut self, key: CacheKey, rows: CachedRows) {
        self.entries_to_add_on_commit.insert(key, rows);
    }

    pub fn clear(&mut self) {
        self.clear_on_commit = true;
        self.entries_to_add_on_commit.clear();
    }

    pub fn commit(&mut self) {
        if self.clear_on_commit {
            self.delegate.clear();
        }
        let staged = self.entries_to_add_on_commit.len();
        for (key, rows) in self.entries_to_add_on_commit.drain() {
            self.delegate.put(key, rows);
        }
        if staged > 0 {
            debug!(cache = self.delegate.id(), staged, "published cached results");
        }
        self.reset();
    }

    pub fn rollback(&mut self) {
        self.reset();
    }

    fn reset(&mut self) {
        self.clear_on_commit = false;
        self.entries_to_add_on_commit.clear();
    }
}

/// One [`TransactionalCache`] per shared cache a session touched.
#[derive(Default)]
pub struct TransactionalCacheManager {
    caches: HashMap<String, TransactionalCache>,
}

impl TransactionalCacheManager {
    pub fn new() -> Self {
        Self::default()
    }

    fn transactional(&mut self, cache: &SharedResultCache) -> &mut TransactionalCache {
        self.caches
            .entry(cache.id().to_string())
            .or_insert_with(|| TransactionalCache::new(cache.clone()))
    }

    pub fn clear(&mut self, cache: &SharedResultCache) {
        self.transactional(cache).clear();
    }

    pub fn get_object(&mut self, cache: &SharedResultCache, key: &CacheKey) -> Option<CachedRows> {
        self.transactional(cache).get_object(key)
    }

    pub fn put_object(&mut self, cache: &SharedResultCache, key: CacheKey, rows: CachedRows) {
        self.transactional(cache).put_object(key, rows);
    }

    pub fn commit(&mut self) {
        for cache in self.caches.values_mut() {
            cache.commit();
        }
    }

    pub fn rollback(&mut self) {
        for cache in self.caches.values_mut() {
            cache.rollback();
        }
    }
}

/// Executor decorator adding namespace result caches.
pub struct CachingExecutor {
    delegate: Box<dyn Executor>,
    tcm: TransactionalCacheManager,
}

impl CachingExecutor {
    pub fn new(delegate: Box<dyn Executor>) -> Self {
        CachingExecutor {
            delegate,
            tcm: TransactionalCacheManager::new(),
        }
    }

    fn flush_cache_if_required(&mut self, ms: &MappedStatement) {
        if let Some(cache) = ms.cache() {
            if ms.flush_cache() {
                self.tcm.clear(cache);
            }
        }
    }
}

impl Executor for CachingExecutor {
    fn update(&mut self, ms: &MappedStatement, parameter: &ParameterObject) -> Result<i64> {
        self.flush_cache_if_required(ms);
        self.delegate.update(ms, parameter)
    }

    fn query(
        &mut self,
        ms: &MappedStatement,
        parameter: &ParameterObject,
        bounds: RowBounds,
        handler: Option<&mut dyn ResultHandler>,
    ) -> Result<Vec<Row>> {
        let Some(cache) = ms.cache() else {
            return self.delegate.query(ms, parameter, bounds, handler);
        };
        self.flush_cache_if_required(ms);
        if !ms.use_cache() || handler.is_some() {
            return self.delegate.query(ms, parameter, bounds, handler);
        }

        let key = CacheKey::for_query(ms, bounds, &ms.bound_sql(parameter)?);
        if let Some(rows) = self.tcm.get_object(cache, &key) {
            return Ok(rows.as_ref().clone());
        }
        let rows = self.delegate.query(ms, parameter, bounds, None)?;
        self.tcm.put_object(cache, key, Arc::new(rows.clone()));
        Ok(rows)
    }

    fn query_cursor(
        &mut self,
        ms: &MappedStatement,
        parameter: &ParameterObject,
        bounds: RowBounds,
    ) -> Result<RowCursor> {
        self.flush_cache_if_required(ms);
        self.delegate.query_cursor(ms, parameter, bounds)
    }

    fn flush_statements(&mut self) -> Result<Vec<BatchResult>> {
        self.delegate.flush_statements()
    }

    fn commit(&mut self, required: bool) -> Result<()> {
        self.delegate.commit(required)?;
        self.tcm.commit();
        Ok(())
    }

    fn rollback(&mut self, required: bool) -> Result<()> {
        let rolled_back = self.delegate.rollback(required);
        if required {
            self.tcm.rollback();
        }
        rolled_back
    }

    fn close(&mut self, force_rollback: bool) -> Result<()> {
        if force_rollback {
            self.tcm.rollback();
        } else {
            self.tcm.commit();
        }
        self.delegate.close(force_rollback)
    }

    fn is_closed(&self) -> bool {
        self.delegate.is_closed()
    }

    fn stats(&self) -> ExecutorStats {
        self.delegate.stats()
    }
}
