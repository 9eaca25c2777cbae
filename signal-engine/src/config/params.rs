//! Trading parameters

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::EngineError;
use crate::Result;

/// Trading parameters of the engine.
///
/// Replaced wholesale on every accepted update; a rejected update leaves the
/// previous record in place.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TradingParams {
    /// Exchange pair identifier (e.g., "XXRPZUSD")
    pub pair: String,
    /// Balance key of the traded asset (e.g., "XXRP")
    pub base_asset: String,
    /// Buy when price <= previous * buy_threshold (e.g., 0.95 = 5% drop)
    pub buy_threshold: f64,
    /// Sell when price >= previous * sell_threshold (e.g., 1.05 = 5% rise)
    pub sell_threshold: f64,
    /// Volume per market order
    pub trade_volume: f64,
    /// Cycle period in milliseconds
    #[serde(rename = "checkInterval")]
    pub check_interval_ms: u64,
    /// Holding floor that trades must preserve
    pub min_holding: f64,
    /// Maker fee rate (e.g., 0.0016 = 0.16%)
    pub maker_fee_rate: f64,
    /// Taker fee rate, applied to every market order
    pub taker_fee_rate: f64,
    /// Estimated tax on realised profit (e.g., 0.15 = 15%)
    pub estimated_tax_rate: f64,
    /// RSI lookback period
    pub rsi_period: usize,
    /// Buy when RSI <= this
    #[serde(rename = "buyRSIThreshold")]
    pub buy_rsi_threshold: f64,
    /// Sell when RSI >= this
    #[serde(rename = "sellRSIThreshold")]
    pub sell_rsi_threshold: f64,
    /// Number of closes requested from the feed each cycle
    pub history_length: usize,
}

impl Default for TradingParams {
    fn default() -> Self {
        Self {
            pair: "XXRPZUSD".to_string(),
            base_asset: "XXRP".to_string(),
            buy_threshold: 0.95,
            sell_threshold: 1.05,
            trade_volume: 10.0,
            check_interval_ms: 60_000,
            min_holding: 50.0,
            maker_fee_rate: 0.0016,
            taker_fee_rate: 0.0026,
            estimated_tax_rate: 0.15,
            rsi_period: 14,
            buy_rsi_threshold: 30.0,
            sell_rsi_threshold: 70.0,
            history_length: 720,
        }
    }
}

impl TradingParams {
    /// Cycle period as a [`Duration`]
    pub fn check_interval(&self) -> Duration {
        Duration::from_millis(self.check_interval_ms)
    }

    /// Check every field against its allowed range
    pub fn validate(&self) -> Result<()> {
        if self.pair.trim().is_empty() {
            return Err(invalid("pair cannot be empty"));
        }
        if self.base_asset.trim().is_empty() {
            return Err(invalid("baseAsset cannot be empty"));
        }
        positive("buyThreshold", self.buy_threshold)?;
        positive("sellThreshold", self.sell_threshold)?;
        positive("tradeVolume", self.trade_volume)?;
        if self.check_interval_ms == 0 {
            return Err(invalid("checkInterval must be > 0"));
        }
        if !self.min_holding.is_finite() || self.min_holding < 0.0 {
            return Err(invalid(format!(
                "minHolding must be >= 0, got {}",
                self.min_holding
            )));
        }
        within("makerFeeRate", self.maker_fee_rate, 0.0, 1.0)?;
        within("takerFeeRate", self.taker_fee_rate, 0.0, 1.0)?;
        within("estimatedTaxRate", self.estimated_tax_rate, 0.0, 1.0)?;
        if self.rsi_period < 2 {
            return Err(invalid(format!(
                "rsiPeriod must be >= 2, got {}",
                self.rsi_period
            )));
        }
        within("buyRSIThreshold", self.buy_rsi_threshold, 0.0, 100.0)?;
        within("sellRSIThreshold", self.sell_rsi_threshold, 0.0, 100.0)?;
        if self.history_length < self.rsi_period + 1 {
            return Err(invalid(format!(
                "historyLength must be >= rsiPeriod + 1 ({}), got {}",
                self.rsi_period + 1,
                self.history_length
            )));
        }
        Ok(())
    }

    /// Apply a partial update on top of these params.
    ///
    /// Returns the new validated record; `self` is never modified.
    pub fn merged(&self, update: &ParamsUpdate) -> Result<Self> {
        let mut next = self.clone();
        if let Some(pair) = &update.pair {
            next.pair = pair.clone();
        }
        if let Some(base_asset) = &update.base_asset {
            next.base_asset = base_asset.clone();
        }
        if let Some(v) = update.buy_threshold {
            next.buy_threshold = v;
        }
        if let Some(v) = update.sell_threshold {
            next.sell_threshold = v;
        }
        if let Some(v) = update.trade_volume {
            next.trade_volume = v;
        }
        if let Some(v) = update.check_interval_ms {
            next.check_interval_ms = v;
        }
        if let Some(v) = update.min_holding {
            next.min_holding = v;
        }
        if let Some(v) = update.maker_fee_rate {
            next.maker_fee_rate = v;
        }
        if let Some(v) = update.taker_fee_rate {
            next.taker_fee_rate = v;
        }
        if let Some(v) = update.estimated_tax_rate {
            next.estimated_tax_rate = v;
        }
        if let Some(v) = update.rsi_period {
            next.rsi_period = v;
        }
        if let Some(v) = update.buy_rsi_threshold {
            next.buy_rsi_threshold = v;
        }
        if let Some(v) = update.sell_rsi_threshold {
            next.sell_rsi_threshold = v;
        }
        if let Some(v) = update.history_length {
            next.history_length = v;
        }
        next.validate()?;
        Ok(next)
    }
}

/// Partial parameter update; absent fields keep their current value.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct ParamsUpdate {
    pub pair: Option<String>,
    pub base_asset: Option<String>,
    pub buy_threshold: Option<f64>,
    pub sell_threshold: Option<f64>,
    pub trade_volume: Option<f64>,
    #[serde(rename = "checkInterval")]
    pub check_interval_ms: Option<u64>,
    pub min_holding: Option<f64>,
    pub maker_fee_rate: Option<f64>,
    pub taker_fee_rate: Option<f64>,
    pub estimated_tax_rate: Option<f64>,
    pub rsi_period: Option<usize>,
    #[serde(rename = "buyRSIThreshold")]
    pub buy_rsi_threshold: Option<f64>,
    #[serde(rename = "sellRSIThreshold")]
    pub sell_rsi_threshold: Option<f64>,
    pub history_length: Option<usize>,
}

impl From<TradingParams> for ParamsUpdate {
    fn from(params: TradingParams) -> Self {
        Self {
            pair: Some(params.pair),
            base_asset: Some(params.base_asset),
            buy_threshold: Some(params.buy_threshold),
            sell_threshold: Some(params.sell_threshold),
            trade_volume: Some(params.trade_volume),
            check_interval_ms: Some(params.check_interval_ms),
            min_holding: Some(params.min_holding),
            maker_fee_rate: Some(params.maker_fee_rate),
            taker_fee_rate: Some(params.taker_fee_rate),
            estimated_tax_rate: Some(params.estimated_tax_rate),
            rsi_period: Some(params.rsi_period),
            buy_rsi_threshold: Some(params.buy_rsi_threshold),
            sell_rsi_threshold: Some(params.sell_rsi_threshold),
            history_length: Some(params.history_length),
        }
    }
}

fn invalid(message: impl Into<String>) -> EngineError {
    EngineError::InvalidParams(message.into())
}

fn positive(name: &str, value: f64) -> Result<()> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(invalid(format!("{} must be > 0, got {}", name, value)))
    }
}

fn within(name: &str, value: f64, min: f64, max: f64) -> Result<()> {
    if value.is_finite() && value >= min && value <= max {
        Ok(())
    } else {
        Err(invalid(format!(
            "{} must be within [{}, {}], got {}",
            name, min, max, value
        )))
    }
}
