//! Prior-session baselines.
//!
//! The session-wide weighted price of session `s` seeds the minute-0 gap of
//! session `s + 1`.

use session_core::{SessionId, Trade};
use std::collections::BTreeMap;
use tracing::warn;

/// Session-wide weighted prices, keyed by the session they seed.
#[derive(Debug, Clone, Default)]
pub struct PriorSessionBaselines {
    by_next_session: BTreeMap<SessionId, f64>,
}

impl PriorSessionBaselines {
    /// Compute the weighted price of every session in `trades`.
    ///
    /// A session with zero total lot size gets a NaN baseline.
    pub fn from_trades(trades: &[Trade]) -> Self {
        let mut sums: BTreeMap<SessionId, (f64, f64)> = BTreeMap::new();
        for trade in trades {
            let entry = sums.entry(trade.session_id).or_insert((0.0, 0.0));
            entry.0 += trade.revenue();
            entry.1 += trade.lot_size;
        }

        let by_next_session = sums
            .into_iter()
            .map(|(session_id, (revenue, lot_size))| {
                if lot_size == 0.0 {
                    warn!(session_id, "session has zero total lot size, baseline undefined");
                }
                (session_id + 1, revenue / lot_size)
            })
            .collect();

        Self { by_next_session }
    }

    /// Raw baseline for a session (the previous session's weighted price).
    pub fn raw(&self, session_id: SessionId) -> Option<f64> {
        self.by_next_session.get(&session_id).copied()
    }

    /// Baseline usable as a fill value: present and finite.
    pub fn for_session(&self, session_id: SessionId) -> Option<f64> {
        self.raw(session_id).filter(|v| v.is_finite())
    }

    /// Number of sessions with a baseline entry.
    pub fn len(&self) -> usize {
        self.by_next_session.len()
    }

    /// Whether no baselines were computed.
    pub fn is_empty(&self) -> bool {
        self.by_next_session.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDateTime;

    fn make_trade(session_id: i64, price: f64, lot_size: f64) -> Trade {
        Trade {
            deal_id: 0,
            session_id,
            platform_id: 1,
            time: NaiveDateTime::parse_from_str("2020-01-01 11:30:00", "%Y-%m-%d %H:%M:%S").unwrap(),
            date: None,
            lot_size,
            price,
        }
    }

    #[test]
    fn test_keyed_by_next_session() {
        let trades = vec![
            make_trade(7, 100.0, 1.0),
            make_trade(7, 110.0, 3.0),
            make_trade(8, 50.0, 2.0),
        ];

        let baselines = PriorSessionBaselines::from_trades(&trades);

        // (100 * 1 + 110 * 3) / 4 = 107.5
        assert_relative_eq!(baselines.for_session(8).unwrap(), 107.5);
        assert_relative_eq!(baselines.for_session(9).unwrap(), 50.0);
        assert!(baselines.for_session(7).is_none());
        assert_eq!(baselines.len(), 2);
    }

    #[test]
    fn test_zero_lot_is_undefined() {
        let trades = vec![make_trade(3, 100.0, 0.0)];
        let baselines = PriorSessionBaselines::from_trades(&trades);

        assert!(baselines.raw(4).unwrap().is_nan());
        assert!(baselines.for_session(4).is_none());
    }
}
