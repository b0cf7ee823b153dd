//! Deal-level deduplication.
//!
//! Upstream exports may repeat a deal; the first record in read order wins.

use session_core::Trade;
use std::collections::HashSet;

/// Keep the first-seen record per `deal_id`, preserving read order.
pub fn dedup_trades(trades: Vec<Trade>) -> Vec<Trade> {
    let mut seen = HashSet::with_capacity(trades.len());
    trades
        .into_iter()
        .filter(|t| seen.insert(t.deal_id))
        .collect()
}
