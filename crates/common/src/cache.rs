//! Fixed-capacity response cache keyed by request URL.
//!
//! Eviction is FIFO: on overflow the oldest *inserted* key goes, regardless of
//! how recently it was read. Expired entries are dropped lazily on lookup.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::{Duration, Instant};

use serde_json::Value;
use tokio::sync::Mutex;

use crate::metrics;

struct Entry<V> {
    value: V,
    stored_at: Instant,
}

pub struct FifoCache<V> {
    capacity: usize,
    ttl: Duration,
    entries: HashMap<String, Entry<V>>,
    order: VecDeque<String>,
}

impl<V: Clone> FifoCache<V> {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self { capacity: capacity.max(1), ttl, entries: HashMap::new(), order: VecDeque::new() }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    pub fn get(&mut self, key: &str) -> Option<V> {
        self.get_at(key, Instant::now())
    }

    fn get_at(&mut self, key: &str, now: Instant) -> Option<V> {
        let expired = match self.entries.get(key) {
            None => return None,
            Some(e) => now.saturating_duration_since(e.stored_at) >= self.ttl,
        };
        if expired {
            self.remove(key);
            return None;
        }
        self.entries.get(key).map(|e| e.value.clone())
    }

    /// Insert or refresh a value. Refreshing keeps the key's original queue position.
    pub fn insert(&mut self, key: String, value: V) {
        self.insert_at(key, value, Instant::now())
    }

    fn insert_at(&mut self, key: String, value: V, now: Instant) {
        if let Some(existing) = self.entries.get_mut(&key) {
            existing.value = value;
            existing.stored_at = now;
            return;
        }
        while self.entries.len() >= self.capacity {
            match self.order.pop_front() {
                Some(oldest) => {
                    self.entries.remove(&oldest);
                }
                None => break,
            }
        }
        self.order.push_back(key.clone());
        self.entries.insert(key, Entry { value, stored_at: now });
    }

    pub fn remove(&mut self, key: &str) -> Option<V> {
        let removed = self.entries.remove(key)?;
        self.order.retain(|k| k != key);
        Some(removed.value)
    }

    /// Drop every key starting with `prefix`; returns how many were removed.
    pub fn invalidate_prefix(&mut self, prefix: &str) -> usize {
        let before = self.entries.len();
        self.entries.retain(|k, _| !k.starts_with(prefix));
        self.order.retain(|k| !k.starts_with(prefix));
        before - self.entries.len()
    }
}

/// Shared cache of upstream JSON responses, injected into handlers through app state.
#[derive(Clone)]
pub struct ResponseCache {
    inner: Arc<Mutex<FifoCache<Value>>>,
}

impl ResponseCache {
    pub fn new(capacity: usize, ttl: Duration) -> Self {
        Self { inner: Arc::new(Mutex::new(FifoCache::new(capacity, ttl))) }
    }

    pub async fn get(&self, url: &str) -> Option<Value> {
        let hit = self.inner.lock().await.get(url);
        match hit {
            Some(_) => metrics::CACHE_HITS_TOTAL.inc(),
            None => metrics::CACHE_MISSES_TOTAL.inc(),
        }
        hit
    }

    pub async fn put(&self, url: String, value: Value) {
        self.inner.lock().await.insert(url, value);
    }

    pub async fn invalidate_prefix(&self, prefix: &str) -> usize {
        self.inner.lock().await.invalidate_prefix(prefix)
    }
}
