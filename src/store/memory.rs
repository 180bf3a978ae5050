//! Memory Store Module
//!
//! In-memory reference backend implementing [`KvStore`]. Combines HashMap
//! string storage with LRU tracking and TTL expiration, plus
//! insertion-ordered sorted sets for feeds and boards.
//!
//! Capacity eviction only ever removes TTL-bearing entries written through
//! plain `set`. Entries without a store-level TTL are resident by design
//! (logical-expiry envelopes), and entries written by `set_if_absent` are
//! coordination guards (locks) whose disappearance would hand the same lock
//! to two holders; neither is ever an eviction victim. When the store is at
//! capacity with nothing evictable, writes fail with `CacheFull`.
//!
//! Used by the test suite and by embedded deployments that want the caching
//! layer without an external store. A networked backend (e.g. a Redis
//! client) implements the same trait.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::{CacheError, Result};
use crate::store::{
    KvStore, LruTracker, StoreStats, StoredValue, MAX_KEY_LENGTH, MAX_VALUE_SIZE,
};

// == Memory Store ==
/// In-memory key-value backend with LRU eviction and TTL support.
///
/// Cloning is cheap and shares the underlying storage.
#[derive(Debug, Clone)]
pub struct MemoryStore {
    inner: Arc<RwLock<Inner>>,
}

#[derive(Debug)]
struct Inner {
    /// String entries
    entries: HashMap<String, StoredValue>,
    /// Sorted sets, members kept in insertion order
    zsets: HashMap<String, Vec<(String, i64)>>,
    /// LRU access tracker for string entries
    lru: LruTracker,
    /// Operational counters
    stats: StoreStats,
    /// Maximum number of string entries allowed
    max_entries: usize,
}

impl MemoryStore {
    // == Constructor ==
    /// Creates a new MemoryStore holding at most `max_entries` string entries.
    pub fn new(max_entries: usize) -> Self {
        Self {
            inner: Arc::new(RwLock::new(Inner {
                entries: HashMap::new(),
                zsets: HashMap::new(),
                lru: LruTracker::new(),
                stats: StoreStats::new(),
                max_entries,
            })),
        }
    }

    // == Stats ==
    /// Returns a snapshot of current statistics.
    pub async fn stats(&self) -> StoreStats {
        let inner = self.inner.read().await;
        let mut stats = inner.stats.clone();
        stats.set_total_entries(inner.entries.len());
        stats
    }

    // == Sweep Expired ==
    /// Removes all expired string entries.
    ///
    /// Returns the number of entries removed. Normally driven by
    /// [`crate::tasks::spawn_sweeper_task`]; reads also drop expired entries
    /// lazily, so the sweep only reclaims keys nobody asks for.
    pub async fn sweep_expired(&self) -> usize {
        let mut inner = self.inner.write().await;

        let expired_keys: Vec<String> = inner
            .entries
            .iter()
            .filter(|(_, entry)| entry.is_expired())
            .map(|(key, _)| key.clone())
            .collect();

        let count = expired_keys.len();
        for key in expired_keys {
            inner.entries.remove(&key);
            inner.lru.remove(&key);
        }

        inner.stats.record_expired(count as u64);
        let total = inner.entries.len();
        inner.stats.set_total_entries(total);
        count
    }

    // == Length ==
    /// Returns the current number of string entries.
    pub async fn len(&self) -> usize {
        self.inner.read().await.entries.len()
    }

    /// Returns true if no string entries are stored.
    pub async fn is_empty(&self) -> bool {
        self.inner.read().await.entries.is_empty()
    }
}

impl Inner {
    /// Validates key/value sizes and inserts, evicting for capacity.
    ///
    /// Only `evictable` entries join the LRU order; everything else is
    /// immune to capacity eviction and only leaves by TTL or delete.
    fn put(&mut self, key: &str, value: &str, ttl: Option<Duration>, evictable: bool) -> Result<()> {
        if key.len() > MAX_KEY_LENGTH {
            return Err(CacheError::InvalidRequest(format!(
                "key exceeds maximum length of {} bytes",
                MAX_KEY_LENGTH
            )));
        }
        if value.len() > MAX_VALUE_SIZE {
            return Err(CacheError::InvalidRequest(format!(
                "value exceeds maximum size of {} bytes",
                MAX_VALUE_SIZE
            )));
        }

        let is_overwrite = self.entries.contains_key(key);
        if !is_overwrite && self.entries.len() >= self.max_entries {
            self.evict_one()?;
        }

        let ttl_ms = ttl.map(|d| d.as_millis() as u64);
        self.entries
            .insert(key.to_string(), StoredValue::new(value.to_string(), ttl_ms));
        if evictable {
            self.lru.touch(key);
        } else {
            // An overwrite can change an entry's class, e.g. a cached value
            // replaced by a resident envelope
            self.lru.remove(key);
        }
        let total = self.entries.len();
        self.stats.set_total_entries(total);
        Ok(())
    }

    /// Frees one slot: expired entries go first, then the LRU victim.
    fn evict_one(&mut self) -> Result<()> {
        let expired_key = self
            .entries
            .iter()
            .find(|(_, entry)| entry.is_expired())
            .map(|(key, _)| key.clone());
        if let Some(key) = expired_key {
            self.drop_expired(&key);
            return Ok(());
        }

        if let Some(key) = self.lru.evict_oldest() {
            self.entries.remove(&key);
            self.stats.record_eviction();
            let total = self.entries.len();
            self.stats.set_total_entries(total);
            return Ok(());
        }

        Err(CacheError::CacheFull(
            "at capacity with no evictable entries".to_string(),
        ))
    }

    /// Drops an entry that expired in place.
    fn drop_expired(&mut self, key: &str) {
        self.entries.remove(key);
        self.lru.remove(key);
        self.stats.record_expired(1);
        let total = self.entries.len();
        self.stats.set_total_entries(total);
    }
}

// == KvStore Implementation ==
#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        let mut inner = self.inner.write().await;

        let found = inner.entries.get(key).map(|entry| {
            if entry.is_expired() {
                None
            } else {
                Some(entry.value.clone())
            }
        });

        match found {
            Some(Some(value)) => {
                inner.stats.record_hit();
                // Reads refresh LRU standing but never add untracked
                // (non-evictable) entries to the eviction order
                if inner.lru.contains(key) {
                    inner.lru.touch(key);
                }
                Ok(Some(value))
            }
            Some(None) => {
                inner.drop_expired(key);
                inner.stats.record_miss();
                Ok(None)
            }
            None => {
                inner.stats.record_miss();
                Ok(None)
            }
        }
    }

    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()> {
        let mut inner = self.inner.write().await;
        let evictable = ttl.is_some();
        inner.put(key, value, ttl, evictable)
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        let mut inner = self.inner.write().await;
        let removed = inner.entries.remove(key).is_some();
        if removed {
            inner.lru.remove(key);
            let total = inner.entries.len();
            inner.stats.set_total_entries(total);
        }
        Ok(removed)
    }

    async fn set_if_absent(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<bool> {
        let mut inner = self.inner.write().await;

        let existing = inner.entries.get(key).map(|entry| entry.is_expired());
        match existing {
            Some(false) => Ok(false),
            Some(true) => {
                // Expired entry counts as absent
                inner.drop_expired(key);
                inner.put(key, value, ttl, false)?;
                Ok(true)
            }
            None => {
                inner.put(key, value, ttl, false)?;
                Ok(true)
            }
        }
    }

    async fn delete_if_equals(&self, key: &str, expected: &str) -> Result<bool> {
        let mut inner = self.inner.write().await;

        let state = inner
            .entries
            .get(key)
            .map(|entry| (entry.is_expired(), entry.value == expected));

        let matches = match state {
            Some((true, _)) => {
                inner.drop_expired(key);
                false
            }
            Some((false, same)) => same,
            None => false,
        };

        if matches {
            inner.entries.remove(key);
            inner.lru.remove(key);
            let total = inner.entries.len();
            inner.stats.set_total_entries(total);
        }
        Ok(matches)
    }

    async fn zadd(&self, key: &str, member: &str, score: i64) -> Result<bool> {
        let mut inner = self.inner.write().await;
        let set = inner.zsets.entry(key.to_string()).or_default();

        if let Some(existing) = set.iter_mut().find(|(m, _)| m == member) {
            existing.1 = score;
            Ok(false)
        } else {
            set.push((member.to_string(), score));
            Ok(true)
        }
    }

    async fn zscore(&self, key: &str, member: &str) -> Result<Option<i64>> {
        let inner = self.inner.read().await;
        Ok(inner
            .zsets
            .get(key)
            .and_then(|set| set.iter().find(|(m, _)| m == member).map(|(_, s)| *s)))
    }

    async fn zrem(&self, key: &str, member: &str) -> Result<bool> {
        let mut inner = self.inner.write().await;
        if let Some(set) = inner.zsets.get_mut(key) {
            let before = set.len();
            set.retain(|(m, _)| m != member);
            Ok(set.len() < before)
        } else {
            Ok(false)
        }
    }

    async fn zrange_first(&self, key: &str, n: usize) -> Result<Vec<String>> {
        let inner = self.inner.read().await;
        let mut members = match inner.zsets.get(key) {
            Some(set) => set.clone(),
            None => return Ok(Vec::new()),
        };

        // Stable sort keeps insertion order among equal scores
        members.sort_by_key(|(_, score)| *score);
        Ok(members.into_iter().take(n).map(|(m, _)| m).collect())
    }

    async fn zrevrange_by_score(
        &self,
        key: &str,
        max: i64,
        offset: usize,
        count: usize,
    ) -> Result<Vec<(String, i64)>> {
        let inner = self.inner.read().await;
        let mut members = match inner.zsets.get(key) {
            Some(set) => set.clone(),
            None => return Ok(Vec::new()),
        };

        members.sort_by(|a, b| b.1.cmp(&a.1));
        Ok(members
            .into_iter()
            .filter(|(_, score)| *score <= max)
            .skip(offset)
            .take(count)
            .collect())
    }
}
