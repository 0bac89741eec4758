/// Unbounded HashMap-backed cache, the usual bottom of a decorator chain.
use super::Cache;
use std::collections::HashMap;
use std::hash::Hash;

#[derive(Debug)]
pub struct PerpetualCache<K, V> {
    id: String,
    entries: HashMap<K, V>,
}

impl<K, V> PerpetualCache<K, V> {
    pub fn new(id: impl Into<String>) -> Self {
        PerpetualCache {
            id: id.into(),
            entries: HashMap::new(),
        }
    }
}

impl<K, V> Cache<K, V> for PerpetualCache<K, V>
where
    K: Hash + Eq + Send,
    V: Clone + Send,
{
    fn id(&self) -> &str {
        &self.id
    }

    fn put_object(&mut self, key: K, value: V) {
        self.entries.insert(key, value);
    }

    fn get_object(&mut self, key: &K) -> Option<V> {
        self.entries.get(key).cloned()
    }

    fn remove_object(&mut self, key: &K) -> Option<V> {
        self.entries.remove(key)
    }

    fn clear(&mut self) {
        self.entries.clear();
    }

    fn size(&self) -> usize {
        self.entries.len()
    }
}
