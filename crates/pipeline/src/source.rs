//! Trade sources.
//!
//! A [`TradeSource`] hands the pipeline every trade of the selected sessions.
//! The SQLite source reads the `Chart_data` / `Trading_session` schema.

use std::path::Path;

use chrono::{NaiveDate, NaiveDateTime, NaiveTime};
use rusqlite::{Connection, OpenFlags};
use session_core::{Error, Result, Trade};
use tracing::{debug, info};

/// Anything that can produce the raw trade list.
pub trait TradeSource {
    /// Load every trade.
    fn load_trades(&self) -> Result<Vec<Trade>>;
}

impl TradeSource for Vec<Trade> {
    fn load_trades(&self) -> Result<Vec<Trade>> {
        Ok(self.clone())
    }
}

impl TradeSource for [Trade] {
    fn load_trades(&self) -> Result<Vec<Trade>> {
        Ok(self.to_vec())
    }
}

const TRADES_QUERY: &str = "SELECT C.deal_id, C.session_id, T.platform_id, C.lot_size, C.price, C.time, T.date
     FROM Chart_data C
     JOIN Trading_session T ON C.session_id = T.id
     WHERE T.trading_type = ?1";

fn db_error(err: rusqlite::Error) -> Error {
    Error::database(err.to_string())
}

/// Trades of one trading type from a SQLite database.
#[derive(Debug)]
pub struct SqliteTradeSource {
    conn: Connection,
    trading_type: String,
}

impl SqliteTradeSource {
    /// Open a database file read-only.
    pub fn open(path: impl AsRef<Path>, trading_type: impl Into<String>) -> Result<Self> {
        let path = path.as_ref();
        let conn = Connection::open_with_flags(
            path,
            OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
        )
        .map_err(|e| Error::database(format!("{}: {}", path.display(), e)))?;

        debug!(path = %path.display(), "opened trade database");
        Ok(Self::from_connection(conn, trading_type))
    }

    /// Wrap an existing connection.
    pub fn from_connection(conn: Connection, trading_type: impl Into<String>) -> Self {
        Self {
            conn,
            trading_type: trading_type.into(),
        }
    }

    /// Trading type filter.
    pub fn trading_type(&self) -> &str {
        &self.trading_type
    }
}

/// Raw row before timestamp parsing.
struct TradeRow {
    deal_id: i64,
    session_id: i64,
    platform_id: i64,
    lot_size: f64,
    price: f64,
    time: String,
    date: Option<String>,
}

impl TradeRow {
    fn into_trade(self) -> Result<Trade> {
        let date = self.date.as_deref().map(parse_date).transpose()?;
        let time = parse_timestamp(&self.time, date)?;
        Ok(Trade {
            deal_id: self.deal_id,
            session_id: self.session_id,
            platform_id: self.platform_id,
            time,
            date,
            lot_size: self.lot_size,
            price: self.price,
        })
    }
}

impl TradeSource for SqliteTradeSource {
    fn load_trades(&self) -> Result<Vec<Trade>> {
        let mut stmt = self.conn.prepare(TRADES_QUERY).map_err(db_error)?;
        let rows = stmt
            .query_map([&self.trading_type], |row| {
                Ok(TradeRow {
                    deal_id: row.get(0)?,
                    session_id: row.get(1)?,
                    platform_id: row.get(2)?,
                    lot_size: row.get(3)?,
                    price: row.get(4)?,
                    time: row.get(5)?,
                    date: row.get(6)?,
                })
            })
            .map_err(db_error)?;

        let mut trades = Vec::new();
        for row in rows {
            trades.push(row.map_err(db_error)?.into_trade()?);
        }

        info!(
            trading_type = %self.trading_type,
            trades = trades.len(),
            "loaded trades"
        );
        Ok(trades)
    }
}

/// Parse a `YYYY-MM-DD` session date. A trailing time part is ignored.
pub fn parse_date(text: &str) -> Result<NaiveDate> {
    let text = text.trim();
    let day = text.get(..10).unwrap_or(text);
    NaiveDate::parse_from_str(day, "%Y-%m-%d")
        .map_err(|e| Error::data(format!("invalid date {:?}: {}", text, e)))
}

/// Parse a deal timestamp.
///
/// Accepts a full datetime with a space or `T` separator, or a bare time of
/// day, which is placed on `date`.
pub fn parse_timestamp(text: &str, date: Option<NaiveDate>) -> Result<NaiveDateTime> {
    let text = text.trim();

    for fmt in ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M"] {
        if let Ok(ts) = NaiveDateTime::parse_from_str(text, fmt) {
            return Ok(ts);
        }
    }

    for fmt in ["%H:%M:%S%.f", "%H:%M"] {
        if let Ok(time) = NaiveTime::parse_from_str(text, fmt) {
            return match date {
                Some(day) => Ok(day.and_time(time)),
                None => Err(Error::data(format!("time {:?} has no session date", text))),
            };
        }
    }

    Err(Error::data(format!("invalid timestamp {:?}", text)))
}
