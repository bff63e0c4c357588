//! Process-local hot cache
//!
//! Entries live for a fixed TTL; when full, the oldest entry is evicted.
//! Expired entries are swept on every access.

use super::CachedValue;
use std::collections::HashMap;
use std::sync::{Mutex, MutexGuard};
use std::time::{Duration, Instant};

/// Process-local cache tier
///
/// Injected into the tier manager so tests can swap in `NoopCache`.
pub trait LocalCache: Send + Sync {
    fn get(&self, key: &str) -> Option<CachedValue>;

    fn insert(&self, key: String, value: CachedValue);

    fn remove(&self, key: &str);

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[derive(Clone)]
struct HotEntry {
    value: CachedValue,
    created_at: Instant,
}

pub struct HotCache {
    ttl: Duration,
    max_entries: usize,
    entries: Mutex<HashMap<String, HotEntry>>,
}

impl HotCache {
    pub fn new(ttl: Duration, max_entries: usize) -> Self {
        Self {
            ttl,
            max_entries: max_entries.max(1),
            entries: Mutex::new(HashMap::new()),
        }
    }

    /// Lock and drop expired entries
    fn live_entries(&self) -> MutexGuard<'_, HashMap<String, HotEntry>> {
        // A poisoned map is still a valid map
        let mut entries = self.entries.lock().unwrap_or_else(|e| e.into_inner());
        entries.retain(|_, v| v.created_at.elapsed() < self.ttl);
        entries
    }
}

impl LocalCache for HotCache {
    fn get(&self, key: &str) -> Option<CachedValue> {
        self.live_entries().get(key).map(|entry| entry.value.clone())
    }

    fn insert(&self, key: String, value: CachedValue) {
        let mut entries = self.live_entries();
        if !entries.contains_key(&key) && entries.len() >= self.max_entries {
            if let Some(victim) = entries
                .iter()
                .min_by_key(|(_, v)| v.created_at)
                .map(|(k, _)| k.clone())
            {
                entries.remove(&victim);
            }
        }
        entries.insert(
            key,
            HotEntry {
                value,
                created_at: Instant::now(),
            },
        );
    }

    fn remove(&self, key: &str) {
        self.live_entries().remove(key);
    }

    fn len(&self) -> usize {
        self.live_entries().len()
    }
}

/// Cache that stores nothing
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopCache;

impl LocalCache for NoopCache {
    fn get(&self, _key: &str) -> Option<CachedValue> {
        None
    }

    fn insert(&self, _key: String, _value: CachedValue) {}

    fn remove(&self, _key: &str) {}

    fn len(&self) -> usize {
        0
    }
}
