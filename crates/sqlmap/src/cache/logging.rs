/// Hit-ratio logging decorator.
use super::Cache;
use parking_lot::RwLock;
use std::sync::Arc;
use tracing::debug;

pub struct LoggingCache<K, V> {
    delegate: Box<dyn Cache<K, V>>,
    requests: u64,
    hits: u64,
}

impl<K, V> LoggingCache<K, V>
where
    K: Send + 'static,
    V: Send + 'static,
{
    pub fn new(delegate: impl Cache<K, V> + 'static) -> Self {
        Self::from_boxed(Box::new(delegate))
    }

    pub fn from_boxed(delegate: Box<dyn Cache<K, V>>) -> Self {
        LoggingCache {
            delegate,
            requests: 0,
            hits: 0,
        }
    }
}

impl<K, V> LoggingCache<K, V> {
    pub fn requests(&self) -> u64 {
        self.requests
    }

    pub fn hits(&self) -> u64 {
        self.hits
    }

    pub fn hit_ratio(&self) -> f64 {
        if self.requests == 0 {
            0.0
        } else {
            self.hits as f64 / self.requests as f64
        }
    }
}

impl<K, V> Cache<K, V> for LoggingCache<K, V>
where
    K: Send,
    V: Send,
{
    fn id(&self) -> &str {
        self.delegate.id()
    }

    fn put_object(&mut self, key: K, value: V) {
        self.delegate.put_object(key, value);
    }

    fn get_object(&mut self, key: &K) -> Option<V> {
        self.requests += 1;
        let value = self.delegate.get_object(key);
        if value.is_some() {
            self.hits += 1;
        }
        debug!(
            cache = self.delegate.id(),
            hit_ratio = self.hit_ratio(),
            "cache lookup"
        );
        value
    }

    fn remove_object(&mut self, key: &K) -> Option<V> {
        self.delegate.remove_object(key)
    }

    fn clear(&mut self) {
        self.delegate.clear();
    }

    fn size(&self) -> usize {
        self.delegate.size()
    }

    fn read_write_lock(&self) -> Option<Arc<RwLock<()>>> {
        self.delegate.read_write_lock()
    }
}
