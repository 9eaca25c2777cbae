//! Engine state

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::TradingParams;
use crate::error::EngineError;
use crate::Result;

/// Mutable state owned by the engine.
///
/// `last_observed_price` only ever holds a finite positive price.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct EngineState {
    pub(crate) last_observed_price: Option<f64>,
    pub(crate) is_running: bool,
    pub(crate) cycles_completed: u64,
    pub(crate) last_cycle_at: Option<DateTime<Utc>>,
}

impl EngineState {
    pub fn last_observed_price(&self) -> Option<f64> {
        self.last_observed_price
    }

    pub fn is_running(&self) -> bool {
        self.is_running
    }

    /// Record the price of a finished cycle
    pub(crate) fn observe(&mut self, price: f64) -> Result<()> {
        if !price.is_finite() || price <= 0.0 {
            return Err(EngineError::data_unavailable(format!(
                "refusing to record invalid price {}",
                price
            )));
        }
        self.last_observed_price = Some(price);
        self.cycles_completed += 1;
        self.last_cycle_at = Some(Utc::now());
        Ok(())
    }

    /// Forget the baseline; the next cycle seeds it again
    pub(crate) fn reset_baseline(&mut self) {
        self.last_observed_price = None;
    }
}

/// Read-only snapshot returned by [`crate::engine::SignalEngine::status`]
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct EngineStatus {
    pub is_running: bool,
    pub cycle_in_progress: bool,
    pub last_observed_price: Option<f64>,
    pub cycles_completed: u64,
    pub last_cycle_at: Option<DateTime<Utc>>,
    pub params: TradingParams,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_observe_only_accepts_valid_prices() {
        let mut state = EngineState::default();

        for bad in [f64::NAN, f64::INFINITY, 0.0, -3.0] {
            assert!(state.observe(bad).is_err());
        }
        assert_eq!(state.last_observed_price(), None);
        assert_eq!(state.cycles_completed, 0);

        state.observe(0.52).unwrap();
        assert_eq!(state.last_observed_price(), Some(0.52));
        assert_eq!(state.cycles_completed, 1);
        assert!(state.last_cycle_at.is_some());

        state.reset_baseline();
        assert_eq!(state.last_observed_price(), None);
    }
}
