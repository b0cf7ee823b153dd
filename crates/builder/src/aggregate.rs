//! Minute slot aggregation.
//!
//! Groups corrected trades by (session, hour, minute) and computes the
//! lot-weighted price of each slot.

use chrono::{NaiveDate, NaiveDateTime};
use session_core::{FillSource, MinuteSlot, SessionId};
use std::collections::BTreeMap;

use crate::correction::ClockedTrade;

/// Slot key: (session, hour, minute).
pub type SlotKey = (SessionId, u32, u32);

/// Builder for minute slots from corrected trades.
#[derive(Debug, Default)]
pub struct MinuteAggregator {
    slots: BTreeMap<SlotKey, SlotInProgress>,
}

/// A slot that's currently being accumulated.
#[derive(Debug, Clone)]
struct SlotInProgress {
    revenue: f64,
    lot_size: f64,
    trade_count: u32,
    first_time: NaiveDateTime,
    platform_id: i64,
    date: Option<NaiveDate>,
}

impl SlotInProgress {
    fn new(trade: &ClockedTrade) -> Self {
        Self {
            revenue: 0.0,
            lot_size: 0.0,
            trade_count: 0,
            first_time: trade.trade.time,
            platform_id: trade.trade.platform_id,
            date: trade.trade.date,
        }
    }

    fn add_trade(&mut self, trade: &ClockedTrade) {
        self.revenue += trade.trade.revenue();
        self.lot_size += trade.trade.lot_size;
        self.trade_count += 1;
        if trade.trade.time < self.first_time {
            self.first_time = trade.trade.time;
        }
    }

    fn weighted_price(&self) -> Option<f64> {
        if self.lot_size != 0.0 {
            Some(self.revenue / self.lot_size)
        } else {
            None
        }
    }

    fn to_slot(&self, (session_id, hour, minute): SlotKey) -> MinuteSlot {
        let weighted_price = self.weighted_price();
        MinuteSlot {
            session_id,
            hour,
            minute,
            weighted_price,
            revenue: self.revenue,
            lot_size: self.lot_size,
            trade_count: self.trade_count,
            first_time: Some(self.first_time),
            platform_id: Some(self.platform_id),
            date: self.date,
            source: if weighted_price.is_some() {
                FillSource::Observed
            } else {
                FillSource::Missing
            },
        }
    }
}

impl MinuteAggregator {
    /// Create an empty aggregator.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a corrected trade.
    pub fn add_trade(&mut self, trade: &ClockedTrade) {
        let key = (trade.trade.session_id, trade.hour, trade.minute);
        self.slots
            .entry(key)
            .or_insert_with(|| SlotInProgress::new(trade))
            .add_trade(trade);
    }

    /// Add multiple corrected trades.
    pub fn add_trades(&mut self, trades: &[ClockedTrade]) {
        for trade in trades {
            self.add_trade(trade);
        }
    }

    /// Number of distinct slots seen so far.
    pub fn slot_count(&self) -> usize {
        self.slots.len()
    }

    /// Finalize all slots, ordered by (session, hour, minute).
    pub fn finish(self) -> BTreeMap<SlotKey, MinuteSlot> {
        self.slots
            .into_iter()
            .map(|(key, slot)| (key, slot.to_slot(key)))
            .collect()
    }
}
