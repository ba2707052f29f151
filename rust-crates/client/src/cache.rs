use std::{
    collections::HashMap,
    sync::{
        Mutex,
        MutexGuard,
        PoisonError,
    },
    time::Duration,
};
use tokio::time::Instant;

#[derive(Clone, Debug)]
struct CacheEntry<V> {
    data: V,
    expires_at: Instant,
}

/// Key/value store whose entries lapse after a per-entry TTL.
///
/// Expired entries are dropped lazily, when a `get` finds them stale. Time is
/// read from the tokio clock so a paused runtime controls expiry.
#[derive(Debug)]
pub struct ExpiringCache<V> {
    entries: Mutex<HashMap<String, CacheEntry<V>>>,
}

impl<V> Default for ExpiringCache<V> {
    fn default() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }
}

impl<V: Clone> ExpiringCache<V> {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, key: impl Into<String>, data: V, ttl: Duration) {
        let entry = CacheEntry {
            data,
            expires_at: Instant::now() + ttl,
        };
        self.entries().insert(key.into(), entry);
    }

    pub fn get(&self, key: &str) -> Option<V> {
        let mut entries = self.entries();
        let expired = Instant::now() > entries.get(key)?.expires_at;
        if expired {
            entries.remove(key);
            return None;
        }
        entries.get(key).map(|entry| entry.data.clone())
    }

    pub fn clear(&self) {
        self.entries().clear();
    }

    /// Stored entries, including expired ones not yet read.
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, CacheEntry<V>>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}
