//! Configuration Module
//!
//! Handles loading and managing caching-layer tunables from environment variables.

use std::env;
use std::time::Duration;

/// Caching-layer configuration parameters.
///
/// All values can be configured via environment variables with sensible defaults.
#[derive(Debug, Clone)]
pub struct Config {
    /// TTL in seconds for tombstone (confirmed-miss) entries
    pub tombstone_ttl: u64,
    /// TTL in seconds for rebuild locks
    pub lock_ttl: u64,
    /// Sleep between lock-contention retries in milliseconds
    pub retry_interval_ms: u64,
    /// Retry rounds before a contended load gives up with `Busy`
    pub max_retries: u32,
    /// Worker count for the background rebuild pool
    pub rebuild_workers: usize,
    /// Pending-task capacity of the rebuild pool queue
    pub rebuild_queue_depth: usize,
    /// Expired-entry sweep interval in seconds (in-memory backend)
    pub sweep_interval: u64,
    /// Maximum number of entries the in-memory backend can hold
    pub max_entries: usize,
}

impl Config {
    /// Creates a new Config by loading values from environment variables.
    ///
    /// # Environment Variables
    /// - `TOMBSTONE_TTL` - Tombstone TTL in seconds (default: 120)
    /// - `LOCK_TTL` - Rebuild lock TTL in seconds (default: 10)
    /// - `RETRY_INTERVAL_MS` - Contention retry sleep in ms (default: 50)
    /// - `MAX_RETRIES` - Retry rounds before giving up (default: 100)
    /// - `REBUILD_WORKERS` - Rebuild pool worker count (default: 10)
    /// - `REBUILD_QUEUE_DEPTH` - Rebuild pool queue capacity (default: 64)
    /// - `SWEEP_INTERVAL` - Sweep frequency in seconds (default: 1)
    /// - `MAX_ENTRIES` - In-memory backend capacity (default: 1000)
    pub fn from_env() -> Self {
        Self {
            tombstone_ttl: read_env("TOMBSTONE_TTL", 120),
            lock_ttl: read_env("LOCK_TTL", 10),
            retry_interval_ms: read_env("RETRY_INTERVAL_MS", 50),
            max_retries: read_env("MAX_RETRIES", 100),
            rebuild_workers: read_env("REBUILD_WORKERS", 10),
            rebuild_queue_depth: read_env("REBUILD_QUEUE_DEPTH", 64),
            sweep_interval: read_env("SWEEP_INTERVAL", 1),
            max_entries: read_env("MAX_ENTRIES", 1000),
        }
    }

    /// Tombstone TTL as a `Duration`.
    pub fn tombstone_ttl(&self) -> Duration {
        Duration::from_secs(self.tombstone_ttl)
    }

    /// Rebuild lock TTL as a `Duration`.
    pub fn lock_ttl(&self) -> Duration {
        Duration::from_secs(self.lock_ttl)
    }

    /// Contention retry sleep as a `Duration`.
    pub fn retry_interval(&self) -> Duration {
        Duration::from_millis(self.retry_interval_ms)
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            tombstone_ttl: 120,
            lock_ttl: 10,
            retry_interval_ms: 50,
            max_retries: 100,
            rebuild_workers: 10,
            rebuild_queue_depth: 64,
            sweep_interval: 1,
            max_entries: 1000,
        }
    }
}

fn read_env<T: std::str::FromStr>(name: &str, default: T) -> T {
    env::var(name)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
