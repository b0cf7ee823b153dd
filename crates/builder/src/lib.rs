//! Session reconstruction for the session pattern pipeline.
//!
//! This crate handles:
//! - Deal deduplication
//! - Prior-session baselines
//! - Boundary drift correction
//! - Minute slot aggregation
//! - 60-minute grid materialization and gap filling

pub mod dedup;
pub mod baseline;
pub mod correction;
pub mod aggregate;
pub mod grid;
pub mod builder;

pub use dedup::dedup_trades;
pub use baseline::PriorSessionBaselines;
pub use correction::{apply_corrections, ClockedTrade};
pub use aggregate::MinuteAggregator;
pub use builder::{BuildStats, SessionBuilder, SessionTable};
