//! Scroll Feed Module
//!
//! Per-subscriber time-ordered feeds with cursor-based scroll pagination.
//!
//! Entries are held in a sorted set per subscriber, scored by producer
//! timestamp. Pages read descending from a cursor `(max_timestamp, offset)`;
//! the offset says how many entries already seen at exactly `max_timestamp`
//! to skip, which is what keeps a run of same-timestamp entries spanning a
//! page boundary from being skipped or duplicated.

use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::Result;
use crate::store::KvStore;

// == Key Prefix ==
/// Store-key prefix for per-subscriber feeds.
const FEED_KEY_PREFIX: &str = "feed:";

// == Scroll Cursor ==
/// Resume point for scroll pagination.
///
/// Reads continue at-or-before `max_timestamp`, skipping `offset` entries
/// already seen at exactly that timestamp. Produced by one page, consumed by
/// the next.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScrollCursor {
    /// Upper timestamp bound, inclusive
    pub max_timestamp: i64,
    /// Entries to skip at exactly `max_timestamp`
    pub offset: usize,
}

impl ScrollCursor {
    /// The cursor for a fresh read from the newest entry.
    pub fn latest() -> Self {
        Self {
            max_timestamp: i64::MAX,
            offset: 0,
        }
    }
}

impl Default for ScrollCursor {
    fn default() -> Self {
        Self::latest()
    }
}

// == Scroll Page ==
/// One page of feed items plus the cursor for the next page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScrollPage {
    /// Item ids in descending timestamp order
    pub items: Vec<u64>,
    /// Cursor for the following page; unchanged when the page is empty
    pub next: ScrollCursor,
    /// True when the feed is exhausted
    pub is_end: bool,
}

// == Scroll Feed ==
/// Fan-out feed store with gap-free scroll pagination.
#[derive(Debug, Clone)]
pub struct ScrollFeed<S> {
    store: Arc<S>,
}

impl<S: KvStore> ScrollFeed<S> {
    // == Constructor ==
    /// Creates a feed over `store`.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    // == Push ==
    /// Inserts `item_id` into `subscriber_id`'s feed at `timestamp`.
    pub async fn push(&self, subscriber_id: u64, item_id: u64, timestamp: i64) -> Result<()> {
        let key = feed_key(subscriber_id);
        self.store.zadd(&key, &item_id.to_string(), timestamp).await?;
        Ok(())
    }

    // == Page ==
    /// Reads up to `page_size` items descending from `cursor`.
    ///
    /// Walking the returned entries, the minimum timestamp seen and a count
    /// of entries at that timestamp become the next cursor, so ties on
    /// identical timestamps survive page boundaries exactly once each. An
    /// empty page sets `is_end`.
    pub async fn page(
        &self,
        subscriber_id: u64,
        cursor: ScrollCursor,
        page_size: usize,
    ) -> Result<ScrollPage> {
        let key = feed_key(subscriber_id);
        let entries = self
            .store
            .zrevrange_by_score(&key, cursor.max_timestamp, cursor.offset, page_size)
            .await?;

        if entries.is_empty() {
            return Ok(ScrollPage {
                items: Vec::new(),
                next: cursor,
                is_end: true,
            });
        }

        let mut items = Vec::with_capacity(entries.len());
        // Seeding the walk from the incoming cursor makes the offset
        // accumulate when a tie run at the cursor timestamp continues into
        // this page; starting fresh would re-serve those entries forever
        // once a run outlasted a whole page.
        let mut min_timestamp = cursor.max_timestamp;
        let mut offset = cursor.offset;

        for (member, timestamp) in &entries {
            items.push(member.parse::<u64>().unwrap_or_default());
            if *timestamp == min_timestamp {
                offset += 1;
            } else {
                min_timestamp = *timestamp;
                offset = 1;
            }
        }

        Ok(ScrollPage {
            items,
            next: ScrollCursor {
                max_timestamp: min_timestamp,
                offset,
            },
            is_end: false,
        })
    }
}

fn feed_key(subscriber_id: u64) -> String {
    format!("{}{}", FEED_KEY_PREFIX, subscriber_id)
}
