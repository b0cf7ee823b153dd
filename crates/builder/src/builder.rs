//! Session builder.
//!
//! Turns raw trade records into a dense sessions x 60 matrix of weighted
//! prices with no missing minutes.

use serde::Serialize;
use session_core::{
    BlockKey, BuilderConfig, CorrectionTable, MinuteSlot, Result, SessionId, SessionMatrix, Trade,
    MINUTES_PER_SESSION,
};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

use crate::aggregate::MinuteAggregator;
use crate::baseline::PriorSessionBaselines;
use crate::correction::apply_corrections;
use crate::dedup::dedup_trades;
use crate::grid::{fill_minute_zero, forward_fill, materialize_grid, FillCounts};

/// Summary of one build.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct BuildStats {
    /// Trades read before deduplication.
    pub raw_trades: usize,
    /// Records dropped as repeated deal ids.
    pub duplicates_dropped: usize,
    /// Trades remapped by a correction rule.
    pub corrected_trades: usize,
    /// Distinct sessions.
    pub sessions: usize,
    /// Distinct (session, hour) blocks.
    pub blocks: usize,
    /// Minute-0 rows seeded from the prior session.
    pub filled_baseline: usize,
    /// Minute-0 rows seeded with zero.
    pub filled_zero: usize,
    /// Rows copied from the preceding minute.
    pub forward_filled: usize,
}

/// Reconstructed grid: 60 rows per block, ordered by (session, hour, minute).
#[derive(Debug, Clone, Default)]
pub struct SessionTable {
    rows: Vec<MinuteSlot>,
    stats: BuildStats,
}

impl SessionTable {
    /// All grid rows.
    pub fn rows(&self) -> &[MinuteSlot] {
        &self.rows
    }

    /// Build statistics.
    pub fn stats(&self) -> &BuildStats {
        &self.stats
    }

    /// Block keys in row order.
    pub fn blocks(&self) -> Vec<BlockKey> {
        self.rows
            .chunks(MINUTES_PER_SESSION)
            .map(|chunk| BlockKey {
                session_id: chunk[0].session_id,
                hour: chunk[0].hour,
            })
            .collect()
    }

    /// Rows of one block.
    pub fn block(&self, key: BlockKey) -> Option<&[MinuteSlot]> {
        self.rows
            .chunks(MINUTES_PER_SESSION)
            .find(|chunk| chunk[0].session_id == key.session_id && chunk[0].hour == key.hour)
    }

    /// Dense matrix, one row per block. Unresolved prices become NaN.
    pub fn to_matrix(&self) -> SessionMatrix {
        let mut keys = Vec::with_capacity(self.rows.len() / MINUTES_PER_SESSION);
        let mut rows = Vec::with_capacity(keys.capacity());

        for chunk in self.rows.chunks(MINUTES_PER_SESSION) {
            keys.push(BlockKey {
                session_id: chunk[0].session_id,
                hour: chunk[0].hour,
            });
            rows.push(chunk.iter().map(|r| r.weighted_price.unwrap_or(f64::NAN)).collect());
        }

        SessionMatrix::new(keys, rows).unwrap_or_default()
    }
}

/// Builds session tables from trades.
#[derive(Debug, Clone)]
pub struct SessionBuilder {
    corrections: CorrectionTable,
}

impl SessionBuilder {
    /// Create a builder with the given correction table.
    pub fn new(corrections: CorrectionTable) -> Result<Self> {
        corrections.validate()?;
        Ok(Self { corrections })
    }

    /// Create a builder from configuration.
    pub fn from_config(config: &BuilderConfig) -> Result<Self> {
        Self::new(config.corrections.clone())
    }

    /// The correction table in use.
    pub fn corrections(&self) -> &CorrectionTable {
        &self.corrections
    }

    /// Run the full reconstruction over a trade snapshot.
    pub fn build(&self, trades: Vec<Trade>) -> SessionTable {
        let raw_trades = trades.len();

        let trades = dedup_trades(trades);
        let duplicates_dropped = raw_trades - trades.len();
        debug!(duplicates_dropped, "deduplicated trades");

        let baselines = PriorSessionBaselines::from_trades(&trades);

        let clocked = apply_corrections(&self.corrections, trades);
        let corrected_trades = clocked.iter().filter(|c| c.applied_rule.is_some()).count();

        let mut aggregator = MinuteAggregator::new();
        aggregator.add_trades(&clocked);
        let mut grid = materialize_grid(aggregator.finish());

        let mut counts = FillCounts::default();
        fill_minute_zero(&mut grid, &baselines, &mut counts);
        forward_fill(&mut grid, &mut counts);

        let stats = self.summarize(&grid, raw_trades, duplicates_dropped, corrected_trades, counts);
        info!(
            raw_trades = stats.raw_trades,
            sessions = stats.sessions,
            blocks = stats.blocks,
            corrected = stats.corrected_trades,
            "built session table"
        );

        SessionTable { rows: grid, stats }
    }

    fn summarize(
        &self,
        grid: &[MinuteSlot],
        raw_trades: usize,
        duplicates_dropped: usize,
        corrected_trades: usize,
        counts: FillCounts,
    ) -> BuildStats {
        let mut hours_per_session: BTreeMap<SessionId, usize> = BTreeMap::new();
        for chunk in grid.chunks(MINUTES_PER_SESSION) {
            *hours_per_session.entry(chunk[0].session_id).or_default() += 1;
        }
        for (&session_id, &hours) in hours_per_session.iter().filter(|(_, hours)| **hours > 1) {
            warn!(session_id, hours, "session spans several hours after correction");
        }

        BuildStats {
            raw_trades,
            duplicates_dropped,
            corrected_trades,
            sessions: hours_per_session.len(),
            blocks: grid.len() / MINUTES_PER_SESSION,
            filled_baseline: counts.baseline,
            filled_zero: counts.zero_seed,
            forward_filled: counts.forward,
        }
    }
}

impl Default for SessionBuilder {
    fn default() -> Self {
        Self {
            corrections: CorrectionTable::default(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;
    use session_core::FillSource;

    fn make_trade(deal_id: i64, session_id: i64, platform_id: i64, hms: (u32, u32, u32), price: f64, lot_size: f64) -> Trade {
        Trade {
            deal_id,
            session_id,
            platform_id,
            time: NaiveDate::from_ymd_opt(2020, 2, 3)
                .unwrap()
                .and_hms_opt(hms.0, hms.1, hms.2)
                .unwrap(),
            date: NaiveDate::from_ymd_opt(2020, 2, 3),
            lot_size,
            price,
        }
    }

    #[test]
    fn test_every_session_has_sixty_minutes() {
        let trades = vec![
            make_trade(1, 1, 1, (11, 0, 5), 100.0, 1.0),
            make_trade(2, 1, 1, (11, 30, 0), 101.0, 1.0),
            make_trade(3, 2, 1, (11, 15, 0), 200.0, 1.0),
            make_trade(4, 3, 2, (11, 59, 59), 300.0, 1.0),
        ];

        let table = SessionBuilder::default().build(trades);
        let matrix = table.to_matrix();

        assert_eq!(matrix.len(), 3);
        for row in matrix.rows() {
            assert_eq!(row.len(), MINUTES_PER_SESSION);
            assert!(row.iter().all(|v| v.is_finite()));
        }
        for block in table.blocks() {
            let rows = table.block(block).unwrap();
            let minutes: Vec<u32> = rows.iter().map(|r| r.minute).collect();
            assert_eq!(minutes, (0..60).collect::<Vec<u32>>());
        }
    }

    #[test]
    fn test_fill_policy_end_to_end() {
        let trades = vec![
            // Session 1 has no prior session: minute 0 seeded with zero.
            make_trade(1, 1, 1, (11, 2, 0), 100.0, 1.0),
            make_trade(2, 1, 1, (11, 2, 30), 110.0, 3.0),
            // Session 2 inherits session 1's weighted price at minute 0.
            make_trade(3, 2, 1, (11, 10, 0), 200.0, 1.0),
        ];

        let table = SessionBuilder::default().build(trades);
        let s1 = table.block(BlockKey { session_id: 1, hour: 11 }).unwrap();
        let s2 = table.block(BlockKey { session_id: 2, hour: 11 }).unwrap();

        assert_eq!(s1[0].source, FillSource::ZeroSeed);
        assert_eq!(s1[0].weighted_price, Some(0.0));
        assert_eq!(s1[1].weighted_price, Some(0.0));
        assert_relative_eq!(s1[2].weighted_price.unwrap(), 107.5);
        assert_relative_eq!(s1[59].weighted_price.unwrap(), 107.5);

        assert_eq!(s2[0].source, FillSource::Baseline);
        assert_relative_eq!(s2[0].weighted_price.unwrap(), 107.5);
        assert_relative_eq!(s2[9].weighted_price.unwrap(), 107.5);
        assert_relative_eq!(s2[10].weighted_price.unwrap(), 200.0);

        let stats = table.stats();
        assert_eq!(stats.filled_baseline, 1);
        assert_eq!(stats.filled_zero, 1);
        assert_eq!(stats.forward_filled, 116);
    }

    #[test]
    fn test_duplicates_dropped_before_aggregation() {
        let trades = vec![
            make_trade(1, 1, 1, (11, 0, 0), 100.0, 1.0),
            make_trade(1, 1, 1, (11, 0, 0), 500.0, 9.0),
        ];

        let table = SessionBuilder::default().build(trades);

        assert_eq!(table.stats().duplicates_dropped, 1);
        assert_relative_eq!(table.rows()[0].weighted_price.unwrap(), 100.0);
        assert_eq!(table.rows()[0].trade_count, 1);
    }

    #[test]
    fn test_spill_folded_into_last_minute() {
        let trades = vec![
            make_trade(1, 10, 1, (11, 0, 0), 100.0, 1.0),
            make_trade(2, 10, 1, (11, 59, 10), 120.0, 1.0),
            make_trade(3, 10, 1, (12, 0, 20), 130.0, 1.0),
        ];

        let table = SessionBuilder::default().build(trades);

        assert_eq!(table.stats().blocks, 1);
        assert_eq!(table.stats().corrected_trades, 1);
        let last = &table.rows()[59];
        assert_eq!((last.hour, last.minute), (11, 59));
        assert_relative_eq!(last.weighted_price.unwrap(), 125.0);
        assert_eq!(last.trade_count, 2);
    }

    #[test]
    fn test_uncorrected_two_hour_session_yields_two_blocks() {
        let trades = vec![
            make_trade(1, 53, 1, (11, 0, 0), 100.0, 1.0),
            make_trade(2, 53, 1, (12, 0, 20), 130.0, 1.0),
        ];

        let table = SessionBuilder::default().build(trades);

        assert_eq!(table.stats().sessions, 1);
        assert_eq!(table.stats().blocks, 2);
        assert_eq!(table.to_matrix().len(), 2);
    }

    #[test]
    fn test_zero_lot_session_seeds_zero() {
        let trades = vec![
            make_trade(1, 1, 1, (11, 5, 0), 100.0, 0.0),
            make_trade(2, 2, 1, (11, 5, 0), 200.0, 1.0),
        ];

        let table = SessionBuilder::default().build(trades);
        let s1 = table.block(BlockKey { session_id: 1, hour: 11 }).unwrap();
        let s2 = table.block(BlockKey { session_id: 2, hour: 11 }).unwrap();

        // Session 1 never resolves a positive-lot price: zero carries through.
        assert!(s1.iter().all(|r| r.weighted_price == Some(0.0)));
        // Session 1's undefined baseline falls back to zero for session 2.
        assert_eq!(s2[0].source, FillSource::ZeroSeed);
    }

    #[test]
    fn test_invalid_table_rejected() {
        let mut table = CorrectionTable::default();
        table.rules[0].remap_hour = 24;
        assert!(SessionBuilder::new(table).is_err());
    }

    #[test]
    fn test_empty_input() {
        let table = SessionBuilder::default().build(Vec::new());
        assert!(table.rows().is_empty());
        assert!(table.to_matrix().is_empty());
        assert_eq!(table.stats(), &BuildStats::default());
    }
}
