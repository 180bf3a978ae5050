//! Distributed Lock Module
//!
//! A TTL-bounded mutual-exclusion lock held in the key-value store.
//!
//! Acquire is a single atomic set-if-absent of an owner token; release is an
//! atomic compare-and-delete of that token. The TTL self-heals crashed
//! holders, and the token check stops a holder whose lock already expired
//! from deleting the entry a new owner wrote in the meantime.

use std::sync::Arc;
use std::time::Duration;

use uuid::Uuid;

use crate::error::Result;
use crate::store::KvStore;

// == Key Prefix ==
/// Store-key prefix for lock entries.
const LOCK_KEY_PREFIX: &str = "lock:";

// == Store Lock ==
/// A named mutual-exclusion lock backed by the key-value store.
///
/// One instance covers one acquire/release pair: the owner token is a fresh
/// nonce generated at construction, so two instances for the same name never
/// release each other's hold.
#[derive(Debug)]
pub struct StoreLock<S> {
    store: Arc<S>,
    key: String,
    token: String,
}

// Not derived: cloning must not require S: Clone, only the Arc is cloned.
// A clone shares the owner token with the original.
impl<S> Clone for StoreLock<S> {
    fn clone(&self) -> Self {
        Self {
            store: Arc::clone(&self.store),
            key: self.key.clone(),
            token: self.token.clone(),
        }
    }
}

impl<S: KvStore> StoreLock<S> {
    // == Constructor ==
    /// Creates a lock handle for `name` with a fresh owner token.
    pub fn new(store: Arc<S>, name: &str) -> Self {
        Self {
            store,
            key: format!("{}{}", LOCK_KEY_PREFIX, name),
            token: Uuid::new_v4().to_string(),
        }
    }

    // == Try Acquire ==
    /// Attempts to take the lock, expiring after `ttl`.
    ///
    /// Returns true iff this call created the lock entry. Never blocks and
    /// never retries; callers bring their own retry policy. A store failure
    /// surfaces as an error, not as "acquired".
    pub async fn try_acquire(&self, ttl: Duration) -> Result<bool> {
        self.store
            .set_if_absent(&self.key, &self.token, Some(ttl))
            .await
    }

    // == Release ==
    /// Releases the lock if this handle still owns it.
    ///
    /// The token comparison and the delete happen as one atomic store
    /// operation, so a hold that expired and was re-acquired by another
    /// owner is left untouched. Returns true iff the entry was removed.
    pub async fn release(&self) -> Result<bool> {
        self.store.delete_if_equals(&self.key, &self.token).await
    }

    /// The owner token of this handle. Visible for diagnostics.
    pub fn token(&self) -> &str {
        &self.token
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use tokio::time::sleep;

    fn store() -> Arc<MemoryStore> {
        Arc::new(MemoryStore::new(100))
    }

    #[tokio::test]
    async fn test_acquire_and_release() {
        let store = store();
        let lock = StoreLock::new(store.clone(), "shop:1");

        assert!(lock.try_acquire(Duration::from_secs(10)).await.unwrap());
        assert!(lock.release().await.unwrap());

        // Released lock can be taken again
        let lock2 = StoreLock::new(store, "shop:1");
        assert!(lock2.try_acquire(Duration::from_secs(10)).await.unwrap());
    }

    #[tokio::test]
    async fn test_mutual_exclusion() {
        let store = store();
        let first = StoreLock::new(store.clone(), "shop:1");
        let second = StoreLock::new(store, "shop:1");

        assert!(first.try_acquire(Duration::from_secs(10)).await.unwrap());
        assert!(!second.try_acquire(Duration::from_secs(10)).await.unwrap());

        first.release().await.unwrap();
        assert!(second.try_acquire(Duration::from_secs(10)).await.unwrap());
    }

    #[tokio::test]
    async fn test_distinct_names_do_not_contend() {
        let store = store();
        let a = StoreLock::new(store.clone(), "shop:1");
        let b = StoreLock::new(store, "shop:2");

        assert!(a.try_acquire(Duration::from_secs(10)).await.unwrap());
        assert!(b.try_acquire(Duration::from_secs(10)).await.unwrap());
    }

    #[tokio::test]
    async fn test_owner_safe_release() {
        let store = store();
        let stale = StoreLock::new(store.clone(), "shop:1");

        // Hold expires while the first owner is still around
        assert!(stale.try_acquire(Duration::from_millis(40)).await.unwrap());
        sleep(Duration::from_millis(80)).await;

        // A new owner takes the lock
        let fresh = StoreLock::new(store.clone(), "shop:1");
        assert!(fresh.try_acquire(Duration::from_secs(10)).await.unwrap());

        // The stale handle's release must not remove the new owner's entry
        assert!(!stale.release().await.unwrap());
        let held = StoreLock::new(store, "shop:1");
        assert!(!held.try_acquire(Duration::from_secs(10)).await.unwrap());
    }

    #[tokio::test]
    async fn test_ttl_self_heals() {
        let store = store();
        let crashed = StoreLock::new(store.clone(), "shop:1");

        assert!(crashed.try_acquire(Duration::from_millis(40)).await.unwrap());
        // Holder "crashes" without releasing; TTL frees the lock
        sleep(Duration::from_millis(80)).await;

        let next = StoreLock::new(store, "shop:1");
        assert!(next.try_acquire(Duration::from_secs(10)).await.unwrap());
    }

    #[tokio::test]
    async fn test_capacity_pressure_cannot_free_a_held_lock() {
        // Filling a tiny store with cached values must never evict the lock
        // entry; that would hand the lock to a second holder
        let store = Arc::new(MemoryStore::new(2));
        let holder = StoreLock::new(store.clone(), "shop:1");
        assert!(holder.try_acquire(Duration::from_secs(10)).await.unwrap());

        for i in 0..4 {
            store
                .set(
                    &format!("cache:{}", i),
                    "v",
                    Some(Duration::from_secs(300)),
                )
                .await
                .unwrap();
        }

        let rival = StoreLock::new(store, "shop:1");
        assert!(!rival.try_acquire(Duration::from_secs(10)).await.unwrap());
        assert!(holder.release().await.unwrap());
    }

    #[tokio::test]
    async fn test_tokens_are_unique() {
        let store = store();
        let a = StoreLock::new(store.clone(), "shop:1");
        let b = StoreLock::new(store, "shop:1");
        assert_ne!(a.token(), b.token());
    }
}
