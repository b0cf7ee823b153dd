//! Core data types for the session pattern pipeline.

use chrono::{NaiveDate, NaiveDateTime, Timelike};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::Error;

/// Number of minute slots in one reconstructed session.
pub const MINUTES_PER_SESSION: usize = 60;

/// Session identifier.
pub type SessionId = i64;

/// A single executed deal as read from the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Trade {
    /// Unique deal key (may be duplicated upstream).
    pub deal_id: i64,
    /// Trading session the deal belongs to.
    pub session_id: SessionId,
    /// Trading platform.
    pub platform_id: i64,
    /// Execution timestamp.
    pub time: NaiveDateTime,
    /// Session date from the session table.
    pub date: Option<NaiveDate>,
    /// Lot size.
    pub lot_size: f64,
    /// Deal price.
    pub price: f64,
}

impl Trade {
    /// Price times lot size.
    #[inline]
    pub fn revenue(&self) -> f64 {
        self.price * self.lot_size
    }

    /// Hour of the execution timestamp.
    #[inline]
    pub fn hour(&self) -> u32 {
        self.time.hour()
    }

    /// Minute of the execution timestamp.
    #[inline]
    pub fn minute(&self) -> u32 {
        self.time.minute()
    }
}

/// Where the final weighted price of a grid row came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum FillSource {
    /// Aggregated from trades in the slot.
    Observed,
    /// Minute 0 seeded with the previous session's weighted price.
    Baseline,
    /// Minute 0 with no usable baseline, seeded with zero.
    ZeroSeed,
    /// Copied from the preceding minute of the same block.
    ForwardFilled,
    /// Still undefined after all fill steps.
    Missing,
}

/// One (session, hour, minute) row of the reconstructed grid.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MinuteSlot {
    pub session_id: SessionId,
    pub hour: u32,
    pub minute: u32,
    /// Weighted price; None until resolved by the fill policy.
    pub weighted_price: Option<f64>,
    /// Sum of price * lot size.
    pub revenue: f64,
    /// Sum of lot size.
    pub lot_size: f64,
    /// Number of trades in the slot.
    pub trade_count: u32,
    /// Earliest trade timestamp in the slot.
    pub first_time: Option<NaiveDateTime>,
    /// Platform of the first trade in the slot.
    pub platform_id: Option<i64>,
    /// Session date of the first trade in the slot.
    pub date: Option<NaiveDate>,
    /// Provenance of `weighted_price`.
    pub source: FillSource,
}

impl MinuteSlot {
    /// Create an empty grid row with no trades.
    pub fn empty(session_id: SessionId, hour: u32, minute: u32) -> Self {
        Self {
            session_id,
            hour,
            minute,
            weighted_price: None,
            revenue: 0.0,
            lot_size: 0.0,
            trade_count: 0,
            first_time: None,
            platform_id: None,
            date: None,
            source: FillSource::Missing,
        }
    }

    /// Key used to order grid rows.
    #[inline]
    pub fn key(&self) -> (SessionId, u32, u32) {
        (self.session_id, self.hour, self.minute)
    }
}

/// Identifies one 60-minute block of a session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct BlockKey {
    pub session_id: SessionId,
    pub hour: u32,
}

/// Dense matrix of session series, one row per block.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SessionMatrix {
    keys: Vec<BlockKey>,
    rows: Vec<Vec<f64>>,
}

impl SessionMatrix {
    /// Create a matrix from keys and rows of equal count.
    pub fn new(keys: Vec<BlockKey>, rows: Vec<Vec<f64>>) -> crate::Result<Self> {
        if keys.len() != rows.len() {
            return Err(Error::data(format!(
                "matrix has {} keys but {} rows",
                keys.len(),
                rows.len()
            )));
        }
        Ok(Self { keys, rows })
    }

    /// Number of series.
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the matrix has no series.
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Block keys in row order.
    pub fn keys(&self) -> &[BlockKey] {
        &self.keys
    }

    /// Series rows.
    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    /// A single series.
    pub fn row(&self, index: usize) -> Option<&[f64]> {
        self.rows.get(index).map(Vec::as_slice)
    }

    /// Consume the matrix and return its rows.
    pub fn into_rows(self) -> Vec<Vec<f64>> {
        self.rows
    }
}

/// Which sessions a correction rule applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "session_id", rename_all = "snake_case")]
pub enum SessionFilter {
    /// Every session.
    Any,
    /// Exactly this session.
    Only(SessionId),
    /// Every session but this one.
    Except(SessionId),
}

impl SessionFilter {
    /// Check whether a session passes the filter.
    #[inline]
    pub fn accepts(self, session_id: SessionId) -> bool {
        match self {
            SessionFilter::Any => true,
            SessionFilter::Only(id) => session_id == id,
            SessionFilter::Except(id) => session_id != id,
        }
    }
}

/// Predicate side of a boundary correction rule.
///
/// All fields test uncorrected trade values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectionPredicate {
    /// Required `max_hour - min_hour` of the trade's session.
    pub hours_diff: u32,
    /// Required platform, if any.
    pub platform_id: Option<i64>,
    /// Required trade hour.
    pub hour: u32,
    /// Session filter.
    pub sessions: SessionFilter,
}

impl CorrectionPredicate {
    /// Evaluate against a trade's uncorrected fields.
    pub fn matches(&self, hours_diff: u32, platform_id: i64, hour: u32, session_id: SessionId) -> bool {
        self.hours_diff == hours_diff
            && self.platform_id.map_or(true, |p| p == platform_id)
            && self.hour == hour
            && self.sessions.accepts(session_id)
    }
}

/// A boundary correction: predicate mapped to a new (hour, minute).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectionRule {
    pub when: CorrectionPredicate,
    pub remap_hour: u32,
    pub remap_minute: u32,
}

/// Ordered table of boundary corrections. Later rules win.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CorrectionTable {
    pub rules: Vec<CorrectionRule>,
}

impl CorrectionTable {
    /// Table with no rules.
    pub fn empty() -> Self {
        Self { rules: Vec::new() }
    }

    /// Check that every rule targets a valid clock position.
    pub fn validate(&self) -> crate::Result<()> {
        for (i, rule) in self.rules.iter().enumerate() {
            if rule.remap_hour > 23 || rule.remap_minute > 59 {
                return Err(Error::config(format!(
                    "correction rule {} remaps to invalid time {}:{}",
                    i, rule.remap_hour, rule.remap_minute
                )));
            }
        }
        Ok(())
    }
}

impl Default for CorrectionTable {
    /// Known late-clock spills folded back into the session's last minute.
    fn default() -> Self {
        Self {
            rules: vec![
                CorrectionRule {
                    when: CorrectionPredicate {
                        hours_diff: 1,
                        platform_id: Some(1),
                        hour: 12,
                        sessions: SessionFilter::Except(53),
                    },
                    remap_hour: 11,
                    remap_minute: 59,
                },
                CorrectionRule {
                    when: CorrectionPredicate {
                        hours_diff: 1,
                        platform_id: None,
                        hour: 13,
                        sessions: SessionFilter::Any,
                    },
                    remap_hour: 12,
                    remap_minute: 59,
                },
                CorrectionRule {
                    when: CorrectionPredicate {
                        hours_diff: 1,
                        platform_id: None,
                        hour: 12,
                        sessions: SessionFilter::Only(54),
                    },
                    remap_hour: 11,
                    remap_minute: 59,
                },
            ],
        }
    }
}

/// Distance semantics used to cluster session series.
///
/// Omitted parameters take the same defaults as [`Metric::dtw`],
/// [`Metric::mae`], [`Metric::cosine`] and [`Metric::l2`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind")]
pub enum Metric {
    /// k-means with DTW barycenter averaging.
    #[serde(rename = "dtw")]
    Dtw {
        #[serde(default = "defaults::dtw_n_init")]
        n_init: usize,
        #[serde(default = "defaults::dtw_max_iter")]
        max_iter: usize,
        #[serde(default = "defaults::dtw_max_iter_barycenter")]
        max_iter_barycenter: usize,
        #[serde(default = "defaults::dtw_tol")]
        tol: f64,
    },
    /// DBSCAN under L1 distance.
    #[serde(rename = "MAE")]
    Mae {
        #[serde(default = "defaults::mae_eps")]
        eps: f64,
        #[serde(default = "defaults::mae_min_samples")]
        min_samples: usize,
    },
    /// Euclidean k-means on unit-length rows.
    #[serde(rename = "cosine")]
    Cosine {
        #[serde(default = "defaults::cosine_n_init")]
        n_init: usize,
        #[serde(default = "defaults::cosine_max_iter")]
        max_iter: usize,
        #[serde(default = "defaults::cosine_tol")]
        tol: f64,
    },
    /// Euclidean k-means.
    #[serde(rename = "l2")]
    L2 {
        #[serde(default = "defaults::l2_n_init")]
        n_init: usize,
        #[serde(default = "defaults::l2_max_iter")]
        max_iter: usize,
        #[serde(default = "defaults::l2_tol")]
        tol: f64,
    },
}


mod defaults {
    pub fn dtw_n_init() -> usize {
        2
    }

    pub fn dtw_max_iter() -> usize {
        50
    }

    pub fn dtw_max_iter_barycenter() -> usize {
        10
    }

    pub fn dtw_tol() -> f64 {
        1e-6
    }

    pub fn mae_eps() -> f64 {
        30.0
    }

    pub fn mae_min_samples() -> usize {
        5
    }

    pub fn cosine_n_init() -> usize {
        10
    }

    pub fn cosine_max_iter() -> usize {
        300
    }

    pub fn cosine_tol() -> f64 {
        1e-4
    }

    pub fn l2_n_init() -> usize {
        1
    }

    pub fn l2_max_iter() -> usize {
        50
    }

    pub fn l2_tol() -> f64 {
        1e-6
    }
}

impl Metric {
    /// DTW k-means with default parameters.
    pub fn dtw() -> Self {
        Metric::Dtw {
            n_init: defaults::dtw_n_init(),
            max_iter: defaults::dtw_max_iter(),
            max_iter_barycenter: defaults::dtw_max_iter_barycenter(),
            tol: defaults::dtw_tol(),
        }
    }

    /// L1 DBSCAN with default parameters.
    pub fn mae() -> Self {
        Metric::Mae {
            eps: defaults::mae_eps(),
            min_samples: defaults::mae_min_samples(),
        }
    }

    /// Cosine k-means with default parameters.
    pub fn cosine() -> Self {
        Metric::Cosine {
            n_init: defaults::cosine_n_init(),
            max_iter: defaults::cosine_max_iter(),
            tol: defaults::cosine_tol(),
        }
    }

    /// Euclidean k-means with default parameters.
    pub fn l2() -> Self {
        Metric::L2 {
            n_init: defaults::l2_n_init(),
            max_iter: defaults::l2_max_iter(),
            tol: defaults::l2_tol(),
        }
    }

    /// Canonical metric name.
    pub fn name(&self) -> &'static str {
        match self {
            Metric::Dtw { .. } => "dtw",
            Metric::Mae { .. } => "MAE",
            Metric::Cosine { .. } => "cosine",
            Metric::L2 { .. } => "l2",
        }
    }

    /// Whether the algorithm takes a fixed number of clusters.
    pub fn uses_num_clusters(&self) -> bool {
        !matches!(self, Metric::Mae { .. })
    }
}

impl Default for Metric {
    fn default() -> Self {
        Metric::dtw()
    }
}

impl FromStr for Metric {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "dtw" => Ok(Metric::dtw()),
            "MAE" => Ok(Metric::mae()),
            "cosine" => Ok(Metric::cosine()),
            "l2" => Ok(Metric::l2()),
            other => Err(Error::unsupported_metric(other)),
        }
    }
}
