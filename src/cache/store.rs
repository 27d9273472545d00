//! In-memory response cache with per-entry TTL
//!
//! Values of any type are stored behind `Arc<dyn Any>` and recovered by
//! downcasting, so one cache serves the job inventory, build lists, stage
//! lists and so on. Expired entries are dropped lazily on lookup.

use std::any::Any;
use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::time::Instant;
use tracing::debug;

/// Type-erased cached value
pub type CachedValue = Arc<dyn Any + Send + Sync>;

/// Stored value with its freshness window
struct CacheEntry {
    value: CachedValue,
    stored_at: Instant,
    ttl: Duration,
}

impl CacheEntry {
    fn is_expired(&self, now: Instant) -> bool {
        now.saturating_duration_since(self.stored_at) >= self.ttl
    }
}

/// Key/value store with TTL and exact-or-prefix invalidation
#[derive(Default)]
pub struct ResponseCache {
    entries: Mutex<HashMap<String, CacheEntry>>,
}

impl ResponseCache {
    pub fn new() -> Self {
        Self::default()
    }

    fn entries(&self) -> MutexGuard<'_, HashMap<String, CacheEntry>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Get the unexpired value for `key`, evicting it if it has expired
    pub fn get_raw(&self, key: &str) -> Option<CachedValue> {
        let mut entries = self.entries();
        let entry = entries.get(key)?;

        if entry.is_expired(Instant::now()) {
            debug!(key, "Cache entry expired");
            entries.remove(key);
            return None;
        }

        Some(Arc::clone(&entry.value))
    }

    /// Typed lookup; a value of another type counts as a miss
    pub fn get<T>(&self, key: &str) -> Option<T>
    where
        T: Clone + Send + Sync + 'static,
    {
        let value = self.get_raw(key)?;
        match value.downcast::<T>() {
            Ok(typed) => Some(T::clone(&typed)),
            Err(_) => {
                debug!(key, "Cache entry holds a different type");
                None
            }
        }
    }

    /// Store a type-erased value, replacing any previous entry
    pub fn set_raw(&self, key: &str, value: CachedValue, ttl: Duration) {
        self.entries().insert(
            key.to_string(),
            CacheEntry {
                value,
                stored_at: Instant::now(),
                ttl,
            },
        );
    }

    /// Store a value, replacing any previous entry
    pub fn set<T>(&self, key: &str, value: T, ttl: Duration)
    where
        T: Send + Sync + 'static,
    {
        self.set_raw(key, Arc::new(value), ttl);
    }

    /// Remove `key` if present, otherwise every key starting with it.
    ///
    /// Returns the number of entries removed.
    pub fn invalidate(&self, key_or_prefix: &str) -> usize {
        let mut entries = self.entries();
        if entries.remove(key_or_prefix).is_some() {
            debug!(key = key_or_prefix, "Invalidated cache entry");
            return 1;
        }

        let before = entries.len();
        entries.retain(|key, _| !key.starts_with(key_or_prefix));
        let removed = before - entries.len();
        if removed > 0 {
            debug!(prefix = key_or_prefix, removed, "Invalidated cache entries by prefix");
        }
        removed
    }

    /// Drop everything
    pub fn clear(&self) {
        let mut entries = self.entries();
        let count = entries.len();
        entries.clear();
        debug!(count, "Cleared response cache");
    }

    /// Number of stored entries, expired ones included
    pub fn len(&self) -> usize {
        self.entries().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}
