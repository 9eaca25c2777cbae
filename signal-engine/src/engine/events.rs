//! Engine notifications

use serde::{Deserialize, Serialize};

use crate::config::TradingParams;
use crate::error::EngineError;
use crate::exchange::{OrderReceipt, OrderSide};

/// Notification emitted by the engine on its broadcast channel
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "event", rename_all = "camelCase", rename_all_fields = "camelCase")]
pub enum EngineEvent {
    /// A market order was accepted
    Trade {
        side: OrderSide,
        price: f64,
        receipt: OrderReceipt,
        estimated_fee: f64,
        estimated_tax: f64,
        rsi: f64,
    },
    /// Informational note, e.g. a guard rejection
    Info { message: String },
    /// A cycle failed
    Error { cause: String },
    Started,
    Stopped,
    ParamsUpdated { params: TradingParams },
}

impl EngineEvent {
    pub fn info(message: impl Into<String>) -> Self {
        Self::Info {
            message: message.into(),
        }
    }

    pub fn error(cause: &EngineError) -> Self {
        Self::Error {
            cause: cause.to_string(),
        }
    }
}
