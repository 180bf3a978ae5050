//! Loader Module
//!
//! Read-through cache loaders in three flavors, each taking a caller-supplied
//! backing-store fetch callback:
//!
//! - [`CacheAsideLoader`]: plain cache-aside with a tombstone penetration
//!   guard. Any key, no cross-call coordination.
//! - [`MutexLoader`]: adds a distributed lock around cold-key rebuilds so a
//!   stampede on one hot key reaches the backing store once.
//! - [`LogicalLoader`]: pre-warmed hot keys with an embedded logical expiry;
//!   callers always get an immediate answer (possibly stale) while a bounded
//!   background pool refreshes under lock.

mod cache_aside;
mod logical;
mod mutex;

pub use cache_aside::CacheAsideLoader;
pub use logical::LogicalLoader;
pub use mutex::MutexLoader;
