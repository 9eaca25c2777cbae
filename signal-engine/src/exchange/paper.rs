//! Paper trading broker
//!
//! In-memory balances and instant market fills, for dry runs and tests.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::info;
use uuid::Uuid;

use crate::error::EngineError;
use crate::exchange::{AccountBalanceSource, OrderExecutionSink, OrderReceipt, OrderSide};
use crate::Result;

/// Simulated account.
///
/// Orders fill immediately and move only the asset mapped to the order's
/// pair; the quote side is not tracked.
pub struct PaperBroker {
    holdings: RwLock<HashMap<String, f64>>,
    /// pair -> asset whose balance the pair trades
    pair_assets: RwLock<HashMap<String, String>>,
    orders: RwLock<Vec<OrderReceipt>>,
}

impl PaperBroker {
    /// Create new broker with starting holdings
    pub fn new<I, S>(holdings: I) -> Self
    where
        I: IntoIterator<Item = (S, f64)>,
        S: Into<String>,
    {
        Self {
            holdings: RwLock::new(
                holdings
                    .into_iter()
                    .map(|(asset, amount)| (asset.into(), amount))
                    .collect(),
            ),
            pair_assets: RwLock::new(HashMap::new()),
            orders: RwLock::new(Vec::new()),
        }
    }

    /// Route fills of `pair` to `asset`
    pub async fn map_pair(&self, pair: impl Into<String>, asset: impl Into<String>) {
        self.pair_assets.write().await.insert(pair.into(), asset.into());
    }

    /// Overwrite a holding
    pub async fn set_holding(&self, asset: impl Into<String>, amount: f64) {
        self.holdings.write().await.insert(asset.into(), amount);
    }

    /// All filled orders, oldest first
    pub async fn orders(&self) -> Vec<OrderReceipt> {
        self.orders.read().await.clone()
    }
}

#[async_trait]
impl AccountBalanceSource for PaperBroker {
    async fn holding(&self, asset: &str) -> Result<f64> {
        Ok(self.holdings.read().await.get(asset).copied().unwrap_or(0.0))
    }
}

#[async_trait]
impl OrderExecutionSink for PaperBroker {
    async fn place_market_order(
        &self,
        pair: &str,
        side: OrderSide,
        volume: f64,
    ) -> Result<OrderReceipt> {
        if !volume.is_finite() || volume <= 0.0 {
            return Err(EngineError::execution_failed(format!(
                "invalid volume {}",
                volume
            )));
        }

        let asset = self
            .pair_assets
            .read()
            .await
            .get(pair)
            .cloned()
            .ok_or_else(|| EngineError::execution_failed(format!("unknown pair {}", pair)))?;

        let mut holdings = self.holdings.write().await;
        let balance = holdings.entry(asset.clone()).or_insert(0.0);
        match side {
            OrderSide::Buy => *balance += volume,
            OrderSide::Sell => {
                if *balance < volume {
                    return Err(EngineError::execution_failed(format!(
                        "insufficient {}: {} < {}",
                        asset, balance, volume
                    )));
                }
                *balance -= volume;
            }
        }
        let balance = *balance;
        drop(holdings);

        let receipt = OrderReceipt::new(
            vec![format!("PAPER-{}", Uuid::new_v4())],
            format!("{} {} {} @ market", side, volume, pair),
            pair.to_string(),
            side,
            volume,
        );
        info!(
            "Paper fill: {} ({} balance now {})",
            receipt.description, asset, balance
        );
        self.orders.write().await.push(receipt.clone());
        Ok(receipt)
    }
}
