//! TTL Sweeper Task
//!
//! Background task that periodically removes expired entries from the
//! in-memory backend. Reads already drop expired entries lazily; the sweep
//! reclaims keys nobody asks for.

use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, info};

use crate::store::MemoryStore;

/// Spawns a background task that periodically sweeps expired entries.
///
/// The task runs in an infinite loop, sleeping for the specified interval
/// between sweeps. Abort the returned handle during shutdown.
///
/// # Arguments
/// * `store` - The in-memory backend to sweep
/// * `interval_secs` - Interval in seconds between sweep runs
pub fn spawn_sweeper_task(store: MemoryStore, interval_secs: u64) -> JoinHandle<()> {
    let interval = Duration::from_secs(interval_secs);

    tokio::spawn(async move {
        info!(interval_secs, "sweeper task started");

        loop {
            tokio::time::sleep(interval).await;

            let removed = store.sweep_expired().await;
            if removed > 0 {
                info!(removed, "sweep removed expired entries");
            } else {
                debug!("sweep found no expired entries");
            }
        }
    })
}
