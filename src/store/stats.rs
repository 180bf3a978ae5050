//! Store Statistics Module
//!
//! Tracks operational counters for the in-memory backend.

use serde::Serialize;

// == Store Stats ==
/// Counters for in-memory backend activity.
#[derive(Debug, Clone, Default, Serialize)]
pub struct StoreStats {
    /// Number of successful string reads
    pub hits: u64,
    /// Number of reads that found nothing (absent or expired)
    pub misses: u64,
    /// Number of entries evicted for capacity
    pub evictions: u64,
    /// Number of entries dropped because their TTL lapsed
    pub expired: u64,
    /// Current number of string entries
    pub total_entries: usize,
}

impl StoreStats {
    // == Constructor ==
    /// Creates a new zeroed stats block.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records a cache hit.
    pub fn record_hit(&mut self) {
        self.hits += 1;
    }

    /// Records a cache miss.
    pub fn record_miss(&mut self) {
        self.misses += 1;
    }

    /// Records a capacity eviction.
    pub fn record_eviction(&mut self) {
        self.evictions += 1;
    }

    /// Records one or more TTL expirations.
    pub fn record_expired(&mut self, count: u64) {
        self.expired += count;
    }

    /// Updates the current entry count.
    pub fn set_total_entries(&mut self, count: usize) {
        self.total_entries = count;
    }
}
