/// Mutual-exclusion layer for caches shared between sessions
///
/// The cache logic underneath assumes a single mutator. `SynchronizedCache` is a cheap
/// cloneable handle that serialises every call through one mutex, and additionally
/// hands out a reader/writer lock for callers that need several calls to appear atomic.
use super::Cache;
use parking_lot::{Mutex, RwLock};
use std::sync::Arc;

pub struct SynchronizedCache<K, V> {
    id: Arc<str>,
    inner: Arc<Mutex<Box<dyn Cache<K, V>>>>,
    lock: Arc<RwLock<()>>,
}

impl<K, V> Clone for SynchronizedCache<K, V> {
    fn clone(&self) -> Self {
        SynchronizedCache {
            id: Arc::clone(&self.id),
            inner: Arc::clone(&self.inner),
            lock: Arc::clone(&self.lock),
        }
    }
}

impl<K, V> std::fmt::Debug for SynchronizedCache<K, V> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SynchronizedCache")
            .field("id", &self.id)
            .finish_non_exhaustive()
    }
}

impl<K, V> SynchronizedCache<K, V>
where
    K: Send + 'static,
    V: Send + 'static,
{
    pub fn new(cache: impl Cache<K, V> + 'static) -> Self {
        Self::from_boxed(Box::new(cache))
    }

    pub fn from_boxed(cache: Box<dyn Cache<K, V>>) -> Self {
        SynchronizedCache {
            id: Arc::from(cache.id()),
            inner: Arc::new(Mutex::new(cache)),
            lock: Arc::new(RwLock::new(())),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn put(&self, key: K, value: V) {
        self.inner.lock().put_object(key, value);
    }

    pub fn get(&self, key: &K) -> Option<V> {
        self.inner.lock().get_object(key)
    }

    pub fn remove(&self, key: &K) -> Option<V> {
        self.inner.lock().remove_object(key)
    }

    pub fn clear(&self) {
        self.inner.lock().clear();
    }

    pub fn size(&self) -> usize {
        self.inner.lock().size()
    }

    /// Lock for whole-cache atomic sections.
    pub fn lock_handle(&self) -> Arc<RwLock<()>> {
        Arc::clone(&self.lock)
    }

    /// Whether two handles point at the same underlying cache.
    pub fn same_cache(&self, other: &Self) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl<K, V> Cache<K, V> for SynchronizedCache<K, V>
where
    K: Send + 'static,
    V: Send + 'static,
{
    fn id(&self) -> &str {
        &self.id
    }

    fn put_object(&mut self, key: K, value: V) {
        self.put(key, value);
    }

    fn get_object(&mut self, key: &K) -> Option<V> {
        self.get(key)
    }

    fn remove_object(&mut self, key: &K) -> Option<V> {
        self.remove(key)
    }

    fn clear(&mut self) {
        SynchronizedCache::clear(self);
    }

    fn size(&self) -> usize {
        SynchronizedCache::size(self)
    }

    fn read_write_lock(&self) -> Option<Arc<RwLock<()>>> {
        Some(self.lock_handle())
    }
}
