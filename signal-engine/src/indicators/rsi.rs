//! RSI (Relative Strength Index) indicator with Wilder smoothing

use crate::error::EngineError;
use crate::indicators::Indicator;
use crate::Result;

/// Streaming RSI.
///
/// The first `period` price transitions seed the average gain and loss with
/// a simple mean; every later transition applies Wilder's smoothing
/// `avg = (avg * (period - 1) + current) / period`.
#[derive(Debug, Clone)]
pub struct Rsi {
    period: usize,
    prev: Option<f64>,
    transitions: usize,
    gain_sum: f64,
    loss_sum: f64,
    avg_gain: f64,
    avg_loss: f64,
}

impl Rsi {
    /// Create new RSI indicator; `period` must be at least 2
    pub fn new(period: usize) -> Result<Self> {
        if period < 2 {
            return Err(EngineError::InvalidParams(format!(
                "RSI period must be >= 2, got {}",
                period
            )));
        }
        Ok(Self {
            period,
            prev: None,
            transitions: 0,
            gain_sum: 0.0,
            loss_sum: 0.0,
            avg_gain: 0.0,
            avg_loss: 0.0,
        })
    }

    /// Get RSI period
    pub fn period(&self) -> usize {
        self.period
    }
}

impl Indicator for Rsi {
    fn name(&self) -> &str {
        "RSI"
    }

    fn update(&mut self, value: f64) {
        let Some(prev) = self.prev.replace(value) else {
            return;
        };

        let delta = value - prev;
        let (gain, loss) = if delta > 0.0 { (delta, 0.0) } else { (0.0, -delta) };
        self.transitions += 1;

        if self.transitions <= self.period {
            self.gain_sum += gain;
            self.loss_sum += loss;
            if self.transitions == self.period {
                self.avg_gain = self.gain_sum / self.period as f64;
                self.avg_loss = self.loss_sum / self.period as f64;
            }
        } else {
            let n = self.period as f64;
            self.avg_gain = (self.avg_gain * (n - 1.0) + gain) / n;
            self.avg_loss = (self.avg_loss * (n - 1.0) + loss) / n;
        }
    }

    fn value(&self) -> Option<f64> {
        if !self.is_ready() {
            return None;
        }
        if self.avg_loss == 0.0 {
            return Some(100.0);
        }
        let rs = self.avg_gain / self.avg_loss;
        Some(100.0 - 100.0 / (1.0 + rs))
    }

    fn is_ready(&self) -> bool {
        // period transitions need period+1 values
        self.transitions >= self.period
    }
}

/// Calculate the RSI of the last sample of `closes` (oldest first)
pub fn calculate_rsi(closes: &[f64], period: usize) -> Result<f64> {
    let mut rsi = Rsi::new(period)?;

    if closes.len() < period + 1 {
        return Err(EngineError::InsufficientHistory {
            required: period + 1,
            available: closes.len(),
        });
    }

    for (i, &close) in closes.iter().enumerate() {
        if !close.is_finite() {
            return Err(EngineError::data_unavailable(format!(
                "close #{} is not a finite number",
                i
            )));
        }
        rsi.update(close);
    }

    rsi.value().ok_or(EngineError::InsufficientHistory {
        required: period + 1,
        available: closes.len(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rsi_not_ready_before_period_plus_one() {
        let mut rsi = Rsi::new(14).unwrap();
        for value in [100.0, 102.0, 101.0, 103.0, 105.0, 104.0, 106.0] {
            rsi.update(value);
        }

        assert!(!rsi.is_ready());
        assert!(rsi.value().is_none());
    }

    #[test]
    fn test_insufficient_history() {
        for len in 0..15 {
            let closes: Vec<f64> = (0..len).map(|i| 100.0 + i as f64).collect();
            let err = calculate_rsi(&closes, 14).unwrap_err();
            assert_eq!(
                err,
                EngineError::InsufficientHistory {
                    required: 15,
                    available: len
                }
            );
        }
    }

    #[test]
    fn test_rejects_short_period() {
        assert!(matches!(Rsi::new(1), Err(EngineError::InvalidParams(_))));
        assert!(matches!(
            calculate_rsi(&[1.0, 2.0, 3.0], 0),
            Err(EngineError::InvalidParams(_))
        ));
    }

    #[test]
    fn test_monotonic_extremes() {
        let rising: Vec<f64> = (0..40).map(|i| 100.0 + i as f64).collect();
        let falling: Vec<f64> = (0..40).map(|i| 100.0 - i as f64).collect();

        assert_eq!(calculate_rsi(&rising, 14).unwrap(), 100.0);
        assert_eq!(calculate_rsi(&falling, 14).unwrap(), 0.0);
    }

    #[test]
    fn test_seed_average_only() {
        // period 2, closes 10 -> 12 -> 11: gains 2, losses 1 => RS = 2
        let rsi = calculate_rsi(&[10.0, 12.0, 11.0], 2).unwrap();
        assert!((rsi - (100.0 - 100.0 / 3.0)).abs() < 1e-9);
    }

    #[test]
    fn test_wilder_smoothing_step() {
        // seed (period 2): 10 -> 12 -> 11 => avg_gain 1.0, avg_loss 0.5
        // next 11 -> 10: avg_gain 0.5, avg_loss 0.75 => RS = 2/3 => RSI 40
        let rsi = calculate_rsi(&[10.0, 12.0, 11.0, 10.0], 2).unwrap();
        assert!((rsi - 40.0).abs() < 1e-9);
    }

    #[test]
    fn test_streaming_matches_batch() {
        let closes = [
            44.34, 44.09, 44.15, 43.61, 44.33, 44.83, 45.10, 45.42, 45.84, 46.08, 45.89, 46.03,
            45.61, 46.28, 46.28, 46.00, 46.03, 46.41, 46.22, 45.64,
        ];
        let mut rsi = Rsi::new(14).unwrap();
        for &close in &closes {
            rsi.update(close);
        }

        let streamed = rsi.value().unwrap();
        let batch = calculate_rsi(&closes, 14).unwrap();
        assert_eq!(streamed, batch);
        assert!(streamed > 0.0 && streamed < 100.0);
    }

    #[test]
    fn test_non_finite_close_is_data_unavailable() {
        let mut closes: Vec<f64> = (0..20).map(|i| 100.0 + i as f64).collect();
        closes[7] = f64::NAN;

        let err = calculate_rsi(&closes, 14).unwrap_err();
        assert!(err.is_data_unavailable());
    }
}
