//! Signal Engine: a polling RSI / price-threshold trading core
//!
//! This crate provides the decision core of a small crypto-trading bot:
//! - a Wilder-smoothed RSI oscillator over recent close prices
//! - a threshold and RSI decision policy with balance and profitability guards
//! - a start/stop cycle orchestrator driven by a non-overlapping timer
//! - an event channel reporting trades, notes, errors and lifecycle changes
//!
//! Collaborators (price feed, balance source, order sink) are plugged in
//! through the traits in [`exchange`]. A Kraken REST adapter and an
//! in-memory paper broker are included.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use signal_engine::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     let kraken = Arc::new(KrakenClient::new(KrakenConfig::default())?);
//!     let paper = Arc::new(PaperBroker::new([("XXRP", 100.0)]));
//!     paper.map_pair("XXRPZUSD", "XXRP").await;
//!     let engine = SignalEngine::new(TradingParams::default(), kraken, paper.clone(), paper)?;
//!     engine.start().await;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod data;
pub mod engine;
pub mod error;
pub mod exchange;
pub mod indicators;
pub mod strategy;

// Re-export commonly used types
pub mod prelude {
    pub use crate::config::*;
    pub use crate::data::*;
    pub use crate::engine::*;
    pub use crate::error::*;
    pub use crate::exchange::*;
    pub use crate::indicators::*;
    pub use crate::strategy::*;
    pub use crate::Result;
}

/// Result type alias
pub type Result<T> = std::result::Result<T, error::EngineError>;
