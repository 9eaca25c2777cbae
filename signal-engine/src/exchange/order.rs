//! Order types

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Order side
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OrderSide {
    /// Buy
    Buy,
    /// Sell
    Sell,
}

impl OrderSide {
    /// Wire name used by the exchange (`type` field)
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Buy => "buy",
            Self::Sell => "sell",
        }
    }
}

impl fmt::Display for OrderSide {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Acknowledgement of an accepted market order
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderReceipt {
    /// Exchange transaction ids
    pub order_ids: Vec<String>,
    /// Human readable order description
    pub description: String,
    /// Pair
    pub pair: String,
    /// Order side
    pub side: OrderSide,
    /// Requested volume
    pub volume: f64,
    /// Time the order was acknowledged
    pub placed_at: DateTime<Utc>,
}

impl OrderReceipt {
    /// Create new receipt stamped with the current time
    pub fn new(
        order_ids: Vec<String>,
        description: String,
        pair: String,
        side: OrderSide,
        volume: f64,
    ) -> Self {
        Self {
            order_ids,
            description,
            pair,
            side,
            volume,
            placed_at: Utc::now(),
        }
    }
}
