//! Trade decisions produced by the policy

use serde::{Deserialize, Serialize};

use crate::exchange::OrderSide;

/// Action decided for one cycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TradeAction {
    /// Place a market buy
    Buy,
    /// Place a market sell
    Sell,
    /// No action
    Hold,
}

impl TradeAction {
    /// Order side for actionable decisions
    pub fn side(&self) -> Option<OrderSide> {
        match self {
            Self::Buy => Some(OrderSide::Buy),
            Self::Sell => Some(OrderSide::Sell),
            Self::Hold => None,
        }
    }
}

/// Rule that produced a Buy/Sell candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SignalTrigger {
    /// RSI crossed the buy or sell threshold
    Rsi,
    /// Price moved past previous * threshold while RSI was neutral
    PriceRatio,
}

/// Outcome of the decision policy for one cycle
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeDecision {
    pub action: TradeAction,
    pub price: f64,
    pub estimated_fee: f64,
    pub estimated_tax: f64,
    pub rsi: f64,
    /// Rule behind the candidate, if any fired
    pub trigger: Option<SignalTrigger>,
    /// Explanation when a candidate degraded to Hold
    pub note: Option<String>,
}

impl TradeDecision {
    /// Plain hold without any candidate
    pub fn hold(price: f64, rsi: f64) -> Self {
        Self {
            action: TradeAction::Hold,
            price,
            estimated_fee: 0.0,
            estimated_tax: 0.0,
            rsi,
            trigger: None,
            note: None,
        }
    }

    /// Set note
    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    /// Whether an order should be placed
    pub fn is_actionable(&self) -> bool {
        self.action != TradeAction::Hold
    }
}
