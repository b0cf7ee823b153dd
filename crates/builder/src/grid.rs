//! Minute grid materialization and gap filling.
//!
//! Every observed (session, hour) block is expanded to minutes 0..60. Gaps are
//! resolved in two passes: minute 0 takes the prior-session baseline (or zero),
//! then each remaining gap copies the preceding minute of the same block.

use session_core::{BlockKey, FillSource, MinuteSlot, MINUTES_PER_SESSION};
use std::collections::{BTreeMap, BTreeSet};

use crate::aggregate::SlotKey;
use crate::baseline::PriorSessionBaselines;

/// Counters for the fill passes.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct FillCounts {
    pub baseline: usize,
    pub zero_seed: usize,
    pub forward: usize,
}

/// Expand aggregated slots to a full grid, ordered by (session, hour, minute).
pub fn materialize_grid(mut slots: BTreeMap<SlotKey, MinuteSlot>) -> Vec<MinuteSlot> {
    let blocks: BTreeSet<BlockKey> = slots
        .keys()
        .map(|&(session_id, hour, _)| BlockKey { session_id, hour })
        .collect();

    let mut grid = Vec::with_capacity(blocks.len() * MINUTES_PER_SESSION);
    for block in blocks {
        for minute in 0..MINUTES_PER_SESSION as u32 {
            let key = (block.session_id, block.hour, minute);
            let row = slots
                .remove(&key)
                .unwrap_or_else(|| MinuteSlot::empty(block.session_id, block.hour, minute));
            grid.push(row);
        }
    }

    // Slots outside 0..60 can only come from a bad correction table.
    debug_assert!(slots.is_empty());
    grid
}

/// Seed undefined minute-0 rows with the baseline, or zero if there is none.
pub fn fill_minute_zero(grid: &mut [MinuteSlot], baselines: &PriorSessionBaselines, counts: &mut FillCounts) {
    for row in grid.iter_mut().filter(|r| r.minute == 0 && r.weighted_price.is_none()) {
        match baselines.for_session(row.session_id) {
            Some(baseline) => {
                row.weighted_price = Some(baseline);
                row.source = FillSource::Baseline;
                counts.baseline += 1;
            }
            None => {
                row.weighted_price = Some(0.0);
                row.source = FillSource::ZeroSeed;
                counts.zero_seed += 1;
            }
        }
    }
}

/// Forward-fill remaining gaps without crossing a block boundary.
pub fn forward_fill(grid: &mut [MinuteSlot], counts: &mut FillCounts) {
    grid.sort_by_key(MinuteSlot::key);

    let mut carry: Option<(BlockKey, f64)> = None;
    for row in grid.iter_mut() {
        let block = BlockKey {
            session_id: row.session_id,
            hour: row.hour,
        };
        match row.weighted_price {
            Some(price) => carry = Some((block, price)),
            None => {
                if let Some((carry_block, price)) = carry {
                    if carry_block == block {
                        row.weighted_price = Some(price);
                        row.source = FillSource::ForwardFilled;
                        counts.forward += 1;
                    }
                }
            }
        }
    }
}
