//! Mutex Loader Module
//!
//! Breakdown protection for hot keys: on a cold miss, callers race for a
//! short-TTL distributed lock named after the key. The winner fetches and
//! populates the cache; everyone else sleeps briefly and retries the whole
//! load, finding the cache warm on a later round. Under sustained contention
//! for one cold key, the backing store sees at most one concurrent fetch
//! regardless of request fan-in.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, warn};

use crate::config::Config;
use crate::error::{CacheError, Result};
use crate::loader::cache_aside::TOMBSTONE;
use crate::loader::CacheAsideLoader;
use crate::lock::StoreLock;
use crate::store::KvStore;

// == Mutex Loader ==
/// Read-through loader that serializes cold-key rebuilds behind a lock.
///
/// Hit and tombstone decisions are identical to [`CacheAsideLoader`]; only
/// the true-miss path differs. Retrying is capped: a load that stays
/// contended past the retry budget returns `CacheError::Busy` instead of
/// waiting forever.
#[derive(Debug, Clone)]
pub struct MutexLoader<S> {
    store: Arc<S>,
    inner: CacheAsideLoader<S>,
    lock_ttl: Duration,
    retry_interval: Duration,
    max_retries: u32,
}

impl<S: KvStore> MutexLoader<S> {
    // == Constructor ==
    /// Creates a loader over `store` with tunables from `config`.
    pub fn new(store: Arc<S>, config: &Config) -> Self {
        Self {
            inner: CacheAsideLoader::new(store.clone(), config),
            store,
            lock_ttl: config.lock_ttl(),
            retry_interval: config.retry_interval(),
            max_retries: config.max_retries,
        }
    }

    // == Load ==
    /// Loads `key`, serializing any backing-store fetch behind the key's lock.
    ///
    /// `Ok(None)` means confirmed absence. `fetch` runs at most once per call
    /// and, across concurrent calls for one cold key, at most once in total;
    /// losers observe the winner's cache write on a retry round.
    pub async fn load<V, F, Fut>(&self, key: &str, ttl: Duration, fetch: F) -> Result<Option<V>>
    where
        V: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<Option<V>>>,
    {
        let mut attempts = 0u32;

        loop {
            match self.store.get(key).await? {
                Some(json) if json != TOMBSTONE => {
                    return Ok(Some(serde_json::from_str(&json)?))
                }
                Some(_) => return Ok(None),
                None => {}
            }

            let lock = StoreLock::new(self.store.clone(), key);
            if lock.try_acquire(self.lock_ttl).await? {
                let outcome = self.rebuild(key, ttl, fetch).await;
                if let Err(err) = lock.release().await {
                    warn!(key, error = %err, "failed to release rebuild lock");
                }
                return outcome;
            }

            // Contended: someone else is rebuilding this key
            attempts += 1;
            if attempts > self.max_retries {
                return Err(CacheError::Busy(format!(
                    "gave up on {} after {} contended rounds",
                    key, attempts
                )));
            }
            debug!(key, attempts, "rebuild lock contended, backing off");
            tokio::time::sleep(self.retry_interval).await;
        }
    }

    /// Runs the winner's side of a rebuild: re-check the cache, then fetch.
    ///
    /// The re-check matters for single-flight: a waiter that wins the lock
    /// after the previous holder populated the key must serve the cached
    /// value instead of fetching again.
    async fn rebuild<V, F, Fut>(&self, key: &str, ttl: Duration, fetch: F) -> Result<Option<V>>
    where
        V: Serialize + DeserializeOwned,
        F: FnOnce() -> Fut,
        Fut: Future<Output = anyhow::Result<Option<V>>>,
    {
        match self.store.get(key).await? {
            Some(json) if json != TOMBSTONE => Ok(Some(serde_json::from_str(&json)?)),
            Some(_) => Ok(None),
            None => self.inner.fill(key, ttl, fetch).await,
        }
    }
}
