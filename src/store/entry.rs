//! Stored Value Module
//!
//! Defines the structure for individual string entries with TTL support.

use std::time::{SystemTime, UNIX_EPOCH};

// == Stored Value ==
/// A single string entry in the in-memory backend.
#[derive(Debug, Clone)]
pub struct StoredValue {
    /// The stored payload
    pub value: String,
    /// Creation timestamp (Unix milliseconds)
    pub created_at: u64,
    /// Expiration timestamp (Unix milliseconds), None = no expiration
    pub expires_at: Option<u64>,
}

impl StoredValue {
    // == Constructor ==
    /// Creates a new stored value with optional TTL.
    ///
    /// # Arguments
    /// * `value` - The payload to store
    /// * `ttl_ms` - Optional TTL in milliseconds
    pub fn new(value: String, ttl_ms: Option<u64>) -> Self {
        let now = current_timestamp_ms();
        let expires_at = ttl_ms.map(|ttl| now + ttl);

        Self {
            value,
            created_at: now,
            expires_at,
        }
    }

    // == Is Expired ==
    /// Checks if the entry has expired.
    ///
    /// An entry is expired once the current time is greater than or equal to
    /// its expiration time; an entry without TTL never expires.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(expires) => current_timestamp_ms() >= expires,
            None => false,
        }
    }

    // == Is Tombstone ==
    /// Checks if the entry is a tombstone (confirmed backing-store miss).
    ///
    /// Tombstones are represented as empty-string payloads. Their presence
    /// is what distinguishes "known absent" from "never queried".
    pub fn is_tombstone(&self) -> bool {
        self.value.is_empty()
    }

    // == Time To Live ==
    /// Returns remaining TTL in milliseconds, or None if no expiration is set.
    pub fn ttl_remaining_ms(&self) -> Option<u64> {
        self.expires_at.map(|expires| {
            let now = current_timestamp_ms();
            expires.saturating_sub(now)
        })
    }
}

// == Utility Functions ==
/// Returns current Unix timestamp in milliseconds.
pub fn current_timestamp_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .expect("Time went backwards")
        .as_millis() as u64
}
