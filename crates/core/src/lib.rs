//! Core types and configuration for the session pattern pipeline.
//!
//! This crate provides shared types used across all other crates:
//! - Market data types (trades, minute slots, session matrices)
//! - Boundary correction and metric definitions
//! - Configuration structures
//! - Common error types

pub mod config;
pub mod error;
pub mod types;

pub use config::{BuilderConfig, ClusterConfig, Config, SourceConfig};
pub use error::{Error, Result};
pub use types::*;
