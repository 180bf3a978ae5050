//! Logical-Expiration Loader Module
//!
//! Stale-while-revalidate for pre-warmed hot keys.
//!
//! Payloads are stored in an envelope carrying their own expiry timestamp
//! and no store-level TTL, so the store never evicts them. A read of an
//! expired entry returns the stale payload immediately and, if it wins the
//! key's rebuild lock, hands the refresh to a bounded background pool.
//! Callers never block on a rebuild and never see a rebuild failure; the
//! staleness window is bounded by rebuild latency, not request latency.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::lock::StoreLock;
use crate::store::KvStore;
use crate::tasks::RebuildPool;

// == Logical Entry ==
/// Envelope wrapping a payload with its logical expiry.
#[derive(Debug, Serialize, Deserialize)]
struct LogicalEntry<V> {
    data: V,
    expire_at: DateTime<Utc>,
}

impl<V> LogicalEntry<V> {
    fn new(data: V, ttl: Duration) -> Self {
        Self {
            data,
            expire_at: Utc::now() + chrono::Duration::milliseconds(ttl.as_millis() as i64),
        }
    }

    fn is_expired(&self) -> bool {
        self.expire_at <= Utc::now()
    }
}

// == Logical Loader ==
/// Read-through loader for always-resident hot keys.
///
/// Every key served through this loader must first be written by [`warm`]
/// (or a rebuild); reading a key that never was warmed is a caller-contract
/// violation and returns `CacheError::ColdKey`.
///
/// [`warm`]: LogicalLoader::warm
pub struct LogicalLoader<S> {
    store: Arc<S>,
    pool: Arc<RebuildPool>,
    lock_ttl: Duration,
}

impl<S: KvStore> LogicalLoader<S> {
    // == Constructor ==
    /// Creates a loader over `store`, running rebuilds on `pool`.
    pub fn new(store: Arc<S>, pool: Arc<RebuildPool>, config: &Config) -> Self {
        Self {
            store,
            pool,
            lock_ttl: config.lock_ttl(),
        }
    }

    // == Warm ==
    /// Pre-populates `key` with `value`, logically expiring after `ttl`.
    ///
    /// The entry is written without a store-level TTL.
    pub async fn warm<V: Serialize>(&self, key: &str, value: V, ttl: Duration) -> Result<()> {
        let json = serde_json::to_string(&LogicalEntry::new(value, ttl))?;
        self.store.set(key, &json, None).await
    }

    // == Load ==
    /// Loads `key`, refreshing it in the background once logically expired.
    ///
    /// Always returns promptly with the cached payload, stale or not; the
    /// calling path never touches the backing store. At most one rebuild per
    /// key runs at a time, enforced by the key's lock. A rebuild failure is
    /// logged, releases the lock, and leaves the stale entry in place.
    pub async fn load<V, F, Fut>(&self, key: &str, ttl: Duration, fetch: F) -> Result<V>
    where
        V: Serialize + DeserializeOwned + Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<V>> + Send + 'static,
    {
        let json = self
            .store
            .get(key)
            .await?
            .filter(|json| !json.is_empty())
            .ok_or_else(|| CacheError::ColdKey(key.to_string()))?;

        let entry: LogicalEntry<V> = serde_json::from_str(&json)?;
        if !entry.is_expired() {
            return Ok(entry.data);
        }

        let lock = StoreLock::new(Arc::clone(&self.store), key);
        if lock.try_acquire(self.lock_ttl).await? {
            self.schedule_rebuild(key, ttl, lock, fetch);
        } else {
            debug!(key, "rebuild already in flight");
        }

        // Stale payload, served while the rebuild runs
        Ok(entry.data)
    }

    /// Hands the refresh for `key` to the pool; the task owns the lock.
    fn schedule_rebuild<V, F, Fut>(&self, key: &str, ttl: Duration, lock: StoreLock<S>, fetch: F)
    where
        V: Serialize + DeserializeOwned + Send + 'static,
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = anyhow::Result<V>> + Send + 'static,
    {
        let store = Arc::clone(&self.store);
        let key_owned = key.to_string();
        let task_lock = lock.clone();

        let submitted = self.pool.try_submit(async move {
            let outcome: Result<()> = async {
                let fresh = fetch().await.map_err(CacheError::Backing)?;
                let json = serde_json::to_string(&LogicalEntry::new(fresh, ttl))?;
                store.set(&key_owned, &json, None).await
            }
            .await;

            match outcome {
                Ok(()) => debug!(key = %key_owned, "background rebuild complete"),
                Err(err) => warn!(key = %key_owned, error = %err, "background rebuild failed"),
            }
            // Release on every exit path, or the key stays "being rebuilt"
            // until the lock TTL lapses
            if let Err(err) = task_lock.release().await {
                warn!(key = %key_owned, error = %err, "failed to release rebuild lock");
            }
        });

        if !submitted {
            warn!(key, "rebuild pool full, dropping rebuild");
            let pool_lock = lock;
            let key_owned = key.to_string();
            // The queued task never ran, so nothing else will free the lock
            tokio::spawn(async move {
                if let Err(err) = pool_lock.release().await {
                    warn!(key = %key_owned, error = %err, "failed to release rebuild lock");
                }
            });
        }
    }
}

// == Unit Tests ==
#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryStore;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::time::sleep;

    #[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
    struct Shop {
        id: u64,
        name: String,
    }

    fn shop(name: &str) -> Shop {
        Shop {
            id: 1,
            name: name.to_string(),
        }
    }

    fn loader() -> (LogicalLoader<MemoryStore>, Arc<MemoryStore>) {
        let store = Arc::new(MemoryStore::new(100));
        let pool = Arc::new(RebuildPool::new(4, 16));
        let loader = LogicalLoader::new(store.clone(), pool, &Config::default());
        (loader, store)
    }

    #[tokio::test]
    async fn test_cold_key_is_an_error() {
        let (loader, _) = loader();

        let result: Result<Shop> = loader
            .load("cache:shop:1", Duration::from_secs(60), || async {
                panic!("fetch must not run for a cold key")
            })
            .await;

        assert!(matches!(result, Err(CacheError::ColdKey(_))));
    }

    #[tokio::test]
    async fn test_fresh_entry_served_without_fetch() {
        let (loader, _) = loader();

        loader
            .warm("cache:shop:1", shop("old"), Duration::from_secs(60))
            .await
            .unwrap();

        let result: Shop = loader
            .load("cache:shop:1", Duration::from_secs(60), || async {
                panic!("fetch must not run while the entry is fresh")
            })
            .await
            .unwrap();

        assert_eq!(result, shop("old"));
    }

    #[tokio::test]
    async fn test_expired_entry_returns_stale_and_rebuilds() {
        let (loader, _) = loader();
        let calls = Arc::new(AtomicUsize::new(0));

        // Warm with an already-expired entry
        loader
            .warm("cache:shop:1", shop("old"), Duration::from_millis(0))
            .await
            .unwrap();
        sleep(Duration::from_millis(10)).await;

        let calls2 = Arc::clone(&calls);
        let result: Shop = loader
            .load("cache:shop:1", Duration::from_secs(60), move || async move {
                calls2.fetch_add(1, Ordering::SeqCst);
                Ok(shop("new"))
            })
            .await
            .unwrap();

        // Caller gets the stale payload immediately
        assert_eq!(result, shop("old"));

        // The rebuild lands shortly after
        sleep(Duration::from_millis(100)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1);

        let result: Shop = loader
            .load("cache:shop:1", Duration::from_secs(60), || async {
                panic!("entry is fresh again, fetch must not run")
            })
            .await
            .unwrap();
        assert_eq!(result, shop("new"));
    }

    #[tokio::test]
    async fn test_rebuild_failure_keeps_stale_entry_and_frees_lock() {
        let (loader, _) = loader();

        loader
            .warm("cache:shop:1", shop("old"), Duration::from_millis(0))
            .await
            .unwrap();
        sleep(Duration::from_millis(10)).await;

        let result: Shop = loader
            .load("cache:shop:1", Duration::from_secs(60), || async {
                Err(anyhow::anyhow!("database down"))
            })
            .await
            .unwrap();
        assert_eq!(result, shop("old"), "stale payload despite rebuild failure");

        sleep(Duration::from_millis(100)).await;

        // Lock was released: the next expired read schedules a new rebuild
        let calls = Arc::new(AtomicUsize::new(0));
        let calls2 = Arc::clone(&calls);
        let result: Shop = loader
            .load("cache:shop:1", Duration::from_secs(60), move || async move {
                calls2.fetch_add(1, Ordering::SeqCst);
                Ok(shop("new"))
            })
            .await
            .unwrap();
        assert_eq!(result, shop("old"));

        sleep(Duration::from_millis(100)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1, "second rebuild must run");
    }

    #[tokio::test]
    async fn test_warm_entry_survives_capacity_pressure() {
        // Warmed envelopes carry no store TTL and must stay resident while
        // ordinary cached values churn through a tiny store
        let store = Arc::new(MemoryStore::new(2));
        let pool = Arc::new(RebuildPool::new(4, 16));
        let loader = LogicalLoader::new(store.clone(), pool, &Config::default());

        loader
            .warm("cache:shop:1", shop("hot"), Duration::from_secs(60))
            .await
            .unwrap();

        for i in 0..4 {
            store
                .set(
                    &format!("cache:other:{}", i),
                    "v",
                    Some(Duration::from_secs(300)),
                )
                .await
                .unwrap();
        }

        let result: Shop = loader
            .load("cache:shop:1", Duration::from_secs(60), || async {
                panic!("warmed entry must still be resident")
            })
            .await
            .unwrap();
        assert_eq!(result, shop("hot"));
    }

    #[tokio::test]
    async fn test_concurrent_expired_reads_schedule_one_rebuild() {
        let (loader, store) = loader();
        let loader = Arc::new(loader);
        let calls = Arc::new(AtomicUsize::new(0));

        loader
            .warm("cache:shop:1", shop("old"), Duration::from_millis(0))
            .await
            .unwrap();
        sleep(Duration::from_millis(10)).await;

        let mut handles = Vec::new();
        for _ in 0..100 {
            let loader = Arc::clone(&loader);
            let calls = Arc::clone(&calls);
            handles.push(tokio::spawn(async move {
                let result: Shop = loader
                    .load("cache:shop:1", Duration::from_secs(60), move || async move {
                        calls.fetch_add(1, Ordering::SeqCst);
                        // Slow rebuild keeps the lock held across the burst
                        sleep(Duration::from_millis(50)).await;
                        Ok(shop("new"))
                    })
                    .await
                    .unwrap();
                result
            }));
        }

        for handle in handles {
            // Every caller gets the stale payload without blocking
            assert_eq!(handle.await.unwrap(), shop("old"));
        }

        sleep(Duration::from_millis(150)).await;
        assert_eq!(calls.load(Ordering::SeqCst), 1, "exactly one rebuild may run");

        let json = store.get("cache:shop:1").await.unwrap().unwrap();
        assert!(json.contains("new"), "rebuild must have landed");
    }
}
