//! End-to-end session pattern pipeline.
//!
//! Loads trades from a [`TradeSource`], rebuilds sessions and clusters them.

pub mod runner;
pub mod source;

pub use runner::{run_from_config, run_pipeline, PipelineRun};
pub use source::{parse_date, parse_timestamp, SqliteTradeSource, TradeSource};
