//! Error types for the caching layer
//!
//! Provides unified error handling using thiserror.

use thiserror::Error;

// == Cache Error Enum ==
/// Unified error type for the caching layer.
#[derive(Error, Debug)]
pub enum CacheError {
    /// The key-value store is unreachable or failed mid-operation.
    ///
    /// Never folded into a cache miss: a loader that cannot talk to the
    /// store reports it, and a lock acquire that fails this way is not
    /// "acquired".
    #[error("store unavailable: {0}")]
    StoreUnavailable(String),

    /// The in-memory backend is at capacity with nothing evictable.
    #[error("cache full: {0}")]
    CacheFull(String),

    /// A logical-expiration key was read before being warmed.
    ///
    /// Keys served through the logical-expiration loader must be
    /// pre-populated; reading one that never was is a caller-contract
    /// violation, surfaced explicitly instead of as a decode failure.
    #[error("cold key (never warmed): {0}")]
    ColdKey(String),

    /// Lock contention outlasted the retry budget.
    #[error("busy: {0}")]
    Busy(String),

    /// The caller-supplied backing-store fetch failed.
    #[error("backing store fetch failed: {0}")]
    Backing(anyhow::Error),

    /// Cached payload could not be (de)serialized.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invalid request data (oversized key or value).
    #[error("invalid request: {0}")]
    InvalidRequest(String),
}

// == Result Type Alias ==
/// Convenience Result type for the caching layer.
pub type Result<T> = std::result::Result<T, CacheError>;
