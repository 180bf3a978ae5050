//! Cache-Aside Loader Module
//!
//! Plain read-through caching with a null-object penetration guard.
//!
//! A confirmed backing-store miss is cached as an empty-string tombstone
//! with a short TTL, so repeated lookups for a key that does not exist
//! never reach the backing store until the tombstone lapses. The tombstone's
//! presence is what distinguishes "known absent" from "never queried".

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::store::KvStore;

/// Marker value cached for a confirmed backing-store miss.
pub(crate) const TOMBSTONE: &str = "";

// == Cache-Aside Loader ==
/// Read-through loader with tombstone penetration protection.
///
/// Every call resolves to exactly one of: cache hit, confirmed miss
/// (tombstone), or fetched-and-cached. The fetch callback runs at most once
/// per call; cross-call deduplication for hot keys is [`super::MutexLoader`]'s
/// job.
#[derive(Debug, Clone)]
pub struct CacheAsideLoader<S> {
    store: Arc<S>,
    tombstone_ttl: Duration,
}

impl<S: KvStore> CacheAsideLoader<S> {
    // == Constructor ==
    /// Creates a loader over `store` with tunables from `config`.
    pub fn new(store: Arc<S>, config: &Config) -> Self {
        Self {
            store,
            tombstone_ttl: config.tombstone_ttl(),
        }
    }

    // == Load ==
    /// Loads `key` from the cache, falling through to `fetch` on a miss.
    ///
    /// `Ok(None)` means confirmed absence in both cache and backing store.
    /// A `fetch` failure propagates to the caller as `CacheError::Backing`
    /// and leaves the cache untouched.
    pub async fn load<V, F, Fut>(&self, key: &str, ttl: Duration, fetch: F) -> Result<Option<V>>
    where
        V: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<Option<V>>>,
    {
        match self.store.get(key).await? {
            Some(json) if json != TOMBSTONE => Ok(Some(serde_json::from_str(&json)?)),
            Some(_) => {
                debug!(key, "tombstone hit, confirmed miss");
                Ok(None)
            }
            None => self.fill(key, ttl, fetch).await,
        }
    }

    // == Fill ==
    /// Fetches from the backing store and caches the outcome.
    pub(crate) async fn fill<V, F, Fut>(
        &self,
        key: &str,
        ttl: Duration,
        fetch: F,
    ) -> Result<Option<V>>
    where
        V: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<Option<V>>>,
    {
        match fetch().await.map_err(CacheError::Backing)? {
            Some(value) => {
                let json = serde_json::to_string(&value)?;
                self.store.set(key, &json, Some(ttl)).await?;
                Ok(Some(value))
            }
            None => {
                debug!(key, "backing store miss, writing tombstone");
                self.store
                    .set(key, TOMBSTONE, Some(self.tombstone_ttl))
                    .await?;
                Ok(None)
            }
        }
    }

    // == Put ==
    /// Caches `value` at `key` directly, bypassing the fetch path.
    pub async fn put<V: Serialize>(&self, key: &str, value: &V, ttl: Duration) -> Result<()> {
        let json = serde_json::to_string(value)?;
        self.store.set(key, &json, Some(ttl)).await
    }

    // == Invalidate ==
    /// Drops `key` from the cache. Returns true if an entry was removed.
    pub async fn invalidate(&self, key: &str) -> Result<bool> {
        self.store.delete(key).await
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use serde::Deserialize;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Shop {
        id: u64,
        name: String,
    }

    fn shop() -> Shop {
        Shop {
            id: 1,
            name: "Riverside Noodles".to_string(),
        }
    }

    fn loader() -> (CacheAsideLoader<MemoryStore>, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new(100));
        let loader = CacheAsideLoader::new(store.clone(), &Config::default());
        (loader, store)
    }

    #[tokio::test]
    async fn test_miss_fetches_and_caches() {
        let (loader, store) = loader();
        let calls = AtomicUsize::new(0);

        let result: Option<Shop> = loader
            .load("cache:shop:1", Duration::from_secs(60), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(Some(shop()))
            })
            .await
            .unwrap();

        assert_eq!(result, Some(shop()));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(store.get("cache:shop:1").await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_hit_skips_fetch() {
        let (loader, _) = loader();

        loader
            .put("cache:shop:1", &shop(), Duration::from_secs(60))
            .await
            .unwrap();

        let result: Option<Shop> = loader
            .load("cache:shop:1", Duration::from_secs(60), || async {
                panic!("fetch must not run on a cache hit")
            })
            .await
            .unwrap();

        assert_eq!(result, Some(shop()));
    }

    #[tokio::test]
    async fn test_penetration_guard() {
        let (loader, store) = loader();
        let calls = AtomicUsize::new(0);

        // First load confirms the miss and writes a tombstone
        let result: Option<Shop> = loader
            .load("cache:shop:404", Duration::from_secs(60), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(None)
            })
            .await
            .unwrap();
        assert_eq!(result, None);
        assert_eq!(
            store.get("cache:shop:404").await.unwrap(),
            Some(String::new()),
            "tombstone must be present, not absent"
        );

        // Second load hits the tombstone and never calls fetch
        let result: Option<Shop> = loader
            .load("cache:shop:404", Duration::from_secs(60), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(None)
            })
            .await
            .unwrap();
        assert_eq!(result, None);
        assert_eq!(calls.load(Ordering::SeqCst), 1, "fetch ran again after tombstone");
    }

    #[tokio::test]
    async fn test_fetch_error_propagates() {
        let (loader, store) = loader();

        let result: Result<Option<Shop>> = loader
            .load("cache:shop:1", Duration::from_secs(60), || async {
                Err(anyhow::anyhow!("database down"))
            })
            .await;

        assert!(matches!(result, Err(CacheError::Backing(_))));
        // A failed fetch leaves no tombstone behind
        assert_eq!(store.get("cache:shop:1").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_invalidate() {
        let (loader, _) = loader();

        loader
            .put("cache:shop:1", &shop(), Duration::from_secs(60))
            .await
            .unwrap();
        assert!(loader.invalidate("cache:shop:1").await.unwrap());

        let calls = AtomicUsize::new(0);
        let _: Option<Shop> = loader
            .load("cache:shop:1", Duration::from_secs(60), || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok(Some(shop()))
            })
            .await
            .unwrap();
        assert_eq!(calls.load(Ordering::SeqCst), 1, "invalidated key must refetch");
    }
}
