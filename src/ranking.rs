//! Ranking Board Module
//!
//! Timestamp-scored membership per board: mark and unmark members, test
//! membership via score lookup, and list the earliest markers. Backs
//! "liked by" style features where the first N members matter.

use std::sync::Arc;

use crate::error::Result;
use crate::store::{current_timestamp_ms, KvStore};

// == Key Prefix ==
/// Store-key prefix for ranking boards.
const BOARD_KEY_PREFIX: &str = "board:";

// == Ranking Board ==
/// A per-board membership set ordered by mark time.
#[derive(Debug, Clone)]
pub struct RankingBoard<S> {
    store: Arc<S>,
}

impl<S: KvStore> RankingBoard<S> {
    // == Constructor ==
    /// Creates a board collection over `store`.
    pub fn new(store: Arc<S>) -> Self {
        Self { store }
    }

    // == Mark ==
    /// Adds `member` to the board, scored by the current time.
    ///
    /// Returns false without touching the score if already marked, so a
    /// member's rank reflects their first mark.
    pub async fn mark(&self, board_id: u64, member: u64) -> Result<bool> {
        let key = board_key(board_id);
        let member = member.to_string();

        if self.store.zscore(&key, &member).await?.is_some() {
            return Ok(false);
        }
        self.store
            .zadd(&key, &member, current_timestamp_ms() as i64)
            .await?;
        Ok(true)
    }

    // == Unmark ==
    /// Removes `member` from the board. Returns true if they were marked.
    pub async fn unmark(&self, board_id: u64, member: u64) -> Result<bool> {
        self.store
            .zrem(&board_key(board_id), &member.to_string())
            .await
    }

    // == Is Marked ==
    /// Checks whether `member` is on the board.
    pub async fn is_marked(&self, board_id: u64, member: u64) -> Result<bool> {
        Ok(self
            .store
            .zscore(&board_key(board_id), &member.to_string())
            .await?
            .is_some())
    }

    // == First ==
    /// Returns the `n` earliest-marked members, oldest first.
    pub async fn first(&self, board_id: u64, n: usize) -> Result<Vec<u64>> {
        let members = self.store.zrange_first(&board_key(board_id), n).await?;
        Ok(members
            .into_iter()
            .filter_map(|m| m.parse().ok())
            .collect())
    }
}

fn board_key(board_id: u64) -> String {
    format!("{}{}", BOARD_KEY_PREFIX, board_id)
}
