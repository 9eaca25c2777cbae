//! OHLC candle data structures

use chrono::{DateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::EngineError;
use crate::Result;

/// OHLC candle as delivered by the exchange
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    /// Candle open time
    pub timestamp: DateTime<Utc>,
    /// Opening price
    pub open: f64,
    /// High price
    pub high: f64,
    /// Low price
    pub low: f64,
    /// Closing price
    pub close: f64,
    /// Volume
    pub volume: f64,
}

impl Candle {
    /// Parse one Kraken OHLC row:
    /// `[time, "open", "high", "low", "close", "vwap", "volume", count]`
    pub fn from_kraken_row(row: &Value) -> Result<Self> {
        let fields = row
            .as_array()
            .ok_or_else(|| EngineError::data_unavailable("OHLC row is not an array"))?;
        if fields.len() < 7 {
            return Err(EngineError::data_unavailable(format!(
                "OHLC row has {} fields, expected at least 7",
                fields.len()
            )));
        }

        let secs = fields[0]
            .as_i64()
            .ok_or_else(|| EngineError::data_unavailable("OHLC row time is not an integer"))?;
        let timestamp = Utc.timestamp_opt(secs, 0).single().ok_or_else(|| {
            EngineError::data_unavailable(format!("OHLC time {} out of range", secs))
        })?;

        Ok(Self {
            timestamp,
            open: decimal_field(&fields[1], "open")?,
            high: decimal_field(&fields[2], "high")?,
            low: decimal_field(&fields[3], "low")?,
            close: decimal_field(&fields[4], "close")?,
            volume: decimal_field(&fields[6], "volume")?,
        })
    }
}

/// Kraken encodes prices as decimal strings
pub(crate) fn decimal_field(value: &Value, name: &str) -> Result<f64> {
    let parsed = match value {
        Value::String(s) => s.parse::<f64>().ok(),
        Value::Number(n) => n.as_f64(),
        _ => None,
    };
    match parsed {
        Some(v) if v.is_finite() => Ok(v),
        _ => Err(EngineError::data_unavailable(format!(
            "{} is not a decimal: {}",
            name, value
        ))),
    }
}

/// Chronological collection of candles
#[derive(Debug, Clone, Default)]
pub struct CandleSeries {
    candles: Vec<Candle>,
}

impl CandleSeries {
    /// Create from vector of candles, sorted oldest first
    pub fn from_vec(mut candles: Vec<Candle>) -> Self {
        candles.sort_by_key(|c| c.timestamp);
        Self { candles }
    }

    /// Close prices of the newest `count` candles, oldest first
    pub fn recent_closes(&self, count: usize) -> Vec<f64> {
        let start = self.candles.len().saturating_sub(count);
        self.candles[start..].iter().map(|c| c.close).collect()
    }
}
