//! Exchange integration module
//!
//! The engine talks to the outside world only through the three traits
//! below. [`KrakenClient`] implements all of them over the Kraken REST API;
//! [`PaperBroker`] simulates balances and fills in memory.

pub mod kraken;
pub mod order;
pub mod paper;

pub use kraken::*;
pub use order::*;
pub use paper::*;

use async_trait::async_trait;

use crate::Result;

/// Latest trade price and recent close history.
///
/// Both calls fail with `DataUnavailable`.
#[async_trait]
pub trait MarketDataSource: Send + Sync {
    /// Last traded price of `pair`
    async fn latest_price(&self, pair: &str) -> Result<f64>;

    /// Up to `count` most recent closes of `pair`, oldest first
    async fn recent_closes(&self, pair: &str, count: usize) -> Result<Vec<f64>>;
}

/// Account balances, failing with `DataUnavailable`
#[async_trait]
pub trait AccountBalanceSource: Send + Sync {
    /// Held amount of `asset`
    async fn holding(&self, asset: &str) -> Result<f64>;
}

/// Market order placement, failing with `ExecutionFailed`
#[async_trait]
pub trait OrderExecutionSink: Send + Sync {
    async fn place_market_order(
        &self,
        pair: &str,
        side: OrderSide,
        volume: f64,
    ) -> Result<OrderReceipt>;
}
