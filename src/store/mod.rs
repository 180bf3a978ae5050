//! Store Module
//!
//! The key-value store seam the caching layer runs against, plus the
//! in-memory reference backend used by tests and embedded deployments.

use std::time::Duration;

use async_trait::async_trait;

use crate::error::Result;

mod entry;
mod lru;
mod memory;
mod stats;


// Re-export public types
pub use entry::{current_timestamp_ms, StoredValue};
pub use lru::LruTracker;
pub use memory::MemoryStore;
pub use stats::StoreStats;

// == Public Constants ==
/// Maximum allowed key length in bytes
pub const MAX_KEY_LENGTH: usize = 256;

/// Maximum allowed value size in bytes
pub const MAX_VALUE_SIZE: usize = 1024 * 1024; // 1 MB

// == Kv Store Trait ==
/// Backend interface for the external key-value store.
///
/// Every loader, lock and feed in this crate talks to the store through this
/// trait. Single-key operations are atomic; there is no cross-key isolation,
/// multi-step critical sections are serialized with [`crate::lock::StoreLock`].
///
/// An absent key reads as `Ok(None)`; an empty-string value reads as
/// `Some("")`. Loaders rely on that distinction for tombstones. Transport or
/// backend failures surface as `CacheError::StoreUnavailable` and are never
/// reported as a miss.
#[async_trait]
pub trait KvStore: Send + Sync + 'static {
    /// Retrieves the value at `key`, if present.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Stores `value` at `key`. `None` TTL means no store-level expiry.
    async fn set(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<()>;

    /// Removes `key`. Returns true if an entry was removed.
    async fn delete(&self, key: &str) -> Result<bool>;

    /// Stores `value` at `key` only if the key is absent, atomically.
    ///
    /// Returns true iff this call created the entry.
    async fn set_if_absent(&self, key: &str, value: &str, ttl: Option<Duration>) -> Result<bool>;

    /// Removes `key` only if its current value equals `expected`, atomically.
    ///
    /// Returns true iff the entry was removed. The compare and the delete are
    /// a single indivisible step against the store.
    async fn delete_if_equals(&self, key: &str, expected: &str) -> Result<bool>;

    /// Adds `member` to the sorted set at `key` with the given score, or
    /// updates its score if already present. Returns true if newly added.
    async fn zadd(&self, key: &str, member: &str, score: i64) -> Result<bool>;

    /// Returns the score of `member` in the sorted set at `key`.
    async fn zscore(&self, key: &str, member: &str) -> Result<Option<i64>>;

    /// Removes `member` from the sorted set at `key`. Returns true if removed.
    async fn zrem(&self, key: &str, member: &str) -> Result<bool>;

    /// Returns up to `n` members with the lowest scores, ascending.
    async fn zrange_first(&self, key: &str, n: usize) -> Result<Vec<String>>;

    /// Returns up to `count` `(member, score)` pairs with score `<= max`,
    /// descending by score, after skipping `offset` qualifying entries.
    ///
    /// Members with equal scores keep their insertion order.
    async fn zrevrange_by_score(
        &self,
        key: &str,
        max: i64,
        offset: usize,
        count: usize,
    ) -> Result<Vec<(String, i64)>>;
}
