/// Least-recently-used eviction decorator
///
/// `LruCache` bounds the number of keys its delegate holds. Recency lives in a
/// [`RecencyIndex`]: a doubly linked list threaded through a slot vector, with a hash
/// index from key to slot, so touching and evicting are both O(1).
///
/// The index and the delegate are separate views of overlapping key sets. Every key the
/// delegate holds is tracked by the index; the index may additionally keep keys that
/// were removed from the delegate directly, until they age out.
use super::Cache;
use crate::constants::DEFAULT_CACHE_SIZE;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::hash::Hash;
use std::sync::Arc;
use tracing::trace;

#[derive(Debug)]
struct Node<K> {
    key: K,
    prev: Option<usize>,
    next: Option<usize>,
}

/// Recency-ordered key set. The head is the least recently used key.
#[derive(Debug)]
pub struct RecencyIndex<K> {
    slots: HashMap<K, usize>,
    nodes: Vec<Option<Node<K>>>,
    free: Vec<usize>,
    head: Option<usize>,
    tail: Option<usize>,
}

impl<K: Hash + Eq + Clone> RecencyIndex<K> {
    pub fn new() -> Self {
        RecencyIndex {
            slots: HashMap::new(),
            nodes: Vec::new(),
            free: Vec::new(),
            head: None,
            tail: None,
        }
    }

    pub fn len(&self) -> usize {
        self.slots.len()
    }

    pub fn is_empty(&self) -> bool {
        self.slots.is_empty()
    }

    pub fn contains(&self, key: &K) -> bool {
        self.slots.contains_key(key)
    }

    /// Mark a tracked key most recently used. Returns false for untracked keys.
    pub fn touch(&mut self, key: &K) -> bool {
        let Some(&idx) = self.slots.get(key) else {
            return false;
        };
        if self.tail != Some(idx) {
            self.unlink(idx);
            self.push_back(idx);
        }
        true
    }

    /// Track `key` as most recently used, inserting it if needed.
    pub fn insert(&mut self, key: K) {
        if self.touch(&key) {
            return;
        }
        let node = Node {
            key: key.clone(),
            prev: None,
            next: None,
        };
        let idx = match self.free.pop() {
            Some(idx) => {
                self.nodes[idx] = Some(node);
                idx
            }
            None => {
                self.nodes.push(Some(node));
                self.nodes.len() - 1
            }
        };
        self.slots.insert(key, idx);
        self.push_back(idx);
    }

    /// Remove and return the least recently used key.
    pub fn pop_eldest(&mut self) -> Option<K> {
        let idx = self.head?;
        self.unlink(idx);
        let node = self.nodes.get_mut(idx)?.take()?;
        self.free.push(idx);
        self.slots.remove(&node.key);
        Some(node.key)
    }

    pub fn clear(&mut self) {
        self.slots.clear();
        self.nodes.clear();
        self.free.clear();
        self.head = None;
        self.tail = None;
    }

    /// Keys from least to most recently used.
    pub fn keys(&self) -> Vec<K> {
        let mut keys = Vec::with_capacity(self.len());
        let mut cursor = self.head;
        while let Some(node) = cursor.and_then(|idx| self.node(idx)) {
            keys.push(node.key.clone());
            cursor = node.next;
        }
        keys
    }

    fn node(&self, idx: usize) -> Option<&Node<K>> {
        self.nodes.get(idx).and_then(Option::as_ref)
    }

    fn node_mut(&mut self, idx: usize) -> Option<&mut Node<K>> {
        self.nodes.get_mut(idx).and_then(Option::as_mut)
    }

    fn unlink(&mut self, idx: usize) {
        let Some((prev, next)) = self.node(idx).map(|n| (n.prev, n.next)) else {
            return;
        };
        match prev.and_then(|p| self.node_mut(p)) {
            Some(p) => p.next = next,
            None => self.head = next,
        }
        match next.and_then(|n| self.node_mut(n)) {
            Some(n) => n.prev = prev,
            None => self.tail = prev,
        }
        if let Some(node) = self.node_mut(idx) {
            node.prev = None;
            node.next = None;
        }
    }

    fn push_back(&mut self, idx: usize) {
        let old_tail = self.tail;
        if let Some(node) = self.node_mut(idx) {
            node.prev = old_tail;
            node.next = None;
        }
        match old_tail.and_then(|t| self.node_mut(t)) {
            Some(t) => t.next = Some(idx),
            None => self.head = Some(idx),
        }
        self.tail = Some(idx);
    }
}

impl<K: Hash + Eq + Clone> Default for RecencyIndex<K> {
    fn default() -> Self {
        Self::new()
    }
}

/// Capacity-bounded decorator evicting the least recently used key.
pub struct LruCache<K, V> {
    delegate: Box<dyn Cache<K, V>>,
    index: RecencyIndex<K>,
    capacity: usize,
}

impl<K, V> LruCache<K, V>
where
    K: Hash + Eq + Clone + Send + 'static,
    V: Send + 'static,
{
    /// Wrap `delegate` with the default capacity of 1024 keys.
    pub fn new(delegate: impl Cache<K, V> + 'static) -> Self {
        Self::with_capacity(delegate, DEFAULT_CACHE_SIZE)
    }

    pub fn with_capacity(delegate: impl Cache<K, V> + 'static, capacity: usize) -> Self {
        Self::from_boxed(Box::new(delegate), capacity)
    }

    pub fn from_boxed(delegate: Box<dyn Cache<K, V>>, capacity: usize) -> Self {
        LruCache {
            delegate,
            index: RecencyIndex::new(),
            capacity,
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Keys currently tracked by the recency index, least recently used first.
    pub fn recency_order(&self) -> Vec<K> {
        self.index.keys()
    }
}

impl<K, V> Cache<K, V> for LruCache<K, V>
where
    K: Hash + Eq + Clone + Send,
    V: Send,
{
    fn id(&self) -> &str {
        self.delegate.id()
    }

    fn put_object(&mut self, key: K, value: V) {
        self.delegate.put_object(key.clone(), value);
        self.index.insert(key);
        if self.index.len() > self.capacity {
            if let Some(eldest) = self.index.pop_eldest() {
                trace!(cache = self.delegate.id(), "evicting least recently used entry");
                self.delegate.remove_object(&eldest);
            }
        }
    }

    fn get_object(&mut self, key: &K) -> Option<V> {
        self.index.touch(key);
        self.delegate.get_object(key)
    }

    fn remove_object(&mut self, key: &K) -> Option<V> {
        self.delegate.remove_object(key)
    }

    fn clear(&mut self) {
        self.delegate.clear();
        self.index.clear();
    }

    fn size(&self) -> usize {
        self.delegate.size()
    }

    fn read_write_lock(&self) -> Option<Arc<RwLock<()>>> {
        self.delegate.read_write_lock()
    }
}
