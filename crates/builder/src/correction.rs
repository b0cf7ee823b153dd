//! Clock extraction and boundary drift correction.
//!
//! Some sessions carry a trade stamped one minute past the nominal hour. The
//! ordered [`CorrectionTable`] folds those trades back into the last minute of
//! the session. Predicates are evaluated against the uncorrected hour, so a
//! rule never observes another rule's output; when several rules match the
//! same trade the last one wins.

use session_core::{CorrectionTable, SessionId, Trade};
use std::collections::HashMap;
use tracing::debug;

/// A trade with its (possibly corrected) clock position.
#[derive(Debug, Clone)]
pub struct ClockedTrade {
    pub trade: Trade,
    pub hour: u32,
    pub minute: u32,
    /// Index of the last rule that remapped this trade.
    pub applied_rule: Option<usize>,
}

/// `max_hour - min_hour` per session, on uncorrected timestamps.
pub fn hours_diff_per_session(trades: &[Trade]) -> HashMap<SessionId, u32> {
    let mut ranges: HashMap<SessionId, (u32, u32)> = HashMap::new();
    for trade in trades {
        let hour = trade.hour();
        ranges
            .entry(trade.session_id)
            .and_modify(|(lo, hi)| {
                *lo = (*lo).min(hour);
                *hi = (*hi).max(hour);
            })
            .or_insert((hour, hour));
    }
    ranges
        .into_iter()
        .map(|(session_id, (lo, hi))| (session_id, hi - lo))
        .collect()
}

/// Attach clock positions to trades, applying the correction table.
pub fn apply_corrections(table: &CorrectionTable, trades: Vec<Trade>) -> Vec<ClockedTrade> {
    let diffs = hours_diff_per_session(&trades);

    let clocked: Vec<ClockedTrade> = trades
        .into_iter()
        .map(|trade| {
            let hour = trade.hour();
            let diff = diffs.get(&trade.session_id).copied().unwrap_or(0);

            let mut clocked = ClockedTrade {
                hour,
                minute: trade.minute(),
                applied_rule: None,
                trade,
            };

            for (i, rule) in table.rules.iter().enumerate() {
                if rule.when.matches(diff, clocked.trade.platform_id, hour, clocked.trade.session_id) {
                    clocked.hour = rule.remap_hour;
                    clocked.minute = rule.remap_minute;
                    clocked.applied_rule = Some(i);
                }
            }

            clocked
        })
        .collect();

    let corrected = clocked.iter().filter(|c| c.applied_rule.is_some()).count();
    debug!(corrected, rules = table.rules.len(), "applied boundary corrections");

    clocked
}
