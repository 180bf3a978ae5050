//! cachekit - caching and coordination in front of a slow backing store
//!
//! Provides cache-aside loading with penetration and breakdown protection,
//! logical-expiration reads with background rebuild, a distributed
//! mutual-exclusion lock, and cursor-based scroll pagination, all over a
//! pluggable key-value store.

pub mod config;
pub mod error;
pub mod feed;
pub mod loader;
pub mod lock;
pub mod ranking;
pub mod store;
pub mod tasks;

pub use config::Config;
pub use error::{CacheError, Result};
pub use feed::{ScrollCursor, ScrollFeed, ScrollPage};
pub use loader::{CacheAsideLoader, LogicalLoader, MutexLoader};
pub use lock::StoreLock;
pub use ranking::RankingBoard;
pub use store::{KvStore, MemoryStore};
pub use tasks::{spawn_sweeper_task, RebuildPool};
