use crate::error::Result;
use std::collections::HashMap;
use std::future::Future;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};
use tracing::debug;

struct CacheEntry<V> {
    value: V,
    inserted_at: Instant,
}

impl<V> CacheEntry<V> {
    fn is_live(&self, ttl: Duration) -> bool {
        self.inserted_at.elapsed() < ttl
    }
}

/// Unbounded TTL cache in front of expensive fetches.
///
/// The map lock is never held while `compute` runs, so two callers missing on the
/// same key may both compute; the later insert wins.
pub struct ResultCache<V> {
    entries: Mutex<HashMap<String, CacheEntry<V>>>,
}

impl<V: Clone> ResultCache<V> {
    pub fn new() -> Self {
        Self {
            entries: Mutex::new(HashMap::new()),
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheEntry<V>>> {
        // entries stay consistent even if a holder panicked
        self.entries.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn get(&self, key: &str, ttl: Duration) -> Option<V> {
        let mut entries = self.lock();
        let entry = entries.get(key)?;
        if entry.is_live(ttl) {
            return Some(entry.value.clone());
        }
        entries.remove(key);
        None
    }

    pub fn insert(&self, key: impl Into<String>, value: V) {
        self.lock().insert(
            key.into(),
            CacheEntry {
                value,
                inserted_at: Instant::now(),
            },
        );
    }

    /// Returns the live entry for `key`, or runs `compute` and caches its result.
    /// Failed computations are not cached.
    pub async fn get_or_compute<F, Fut>(&self, key: &str, ttl: Duration, compute: F) -> Result<V>
    where
        F: FnOnce() -> Fut,
        Fut: Future<Output = Result<V>>,
    {
        if let Some(value) = self.get(key, ttl) {
            debug!("Cache hit for {}", key);
            return Ok(value);
        }

        debug!("Cache miss for {}", key);
        let value = compute().await?;
        self.insert(key, value.clone());
        Ok(value)
    }

    pub fn clear(&self) {
        self.lock().clear();
    }

    pub fn len(&self) -> usize {
        self.lock().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl<V: Clone> Default for ResultCache<V> {
    fn default() -> Self {
        Self::new()
    }
}
