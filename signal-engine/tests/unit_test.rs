//! Unit tests for signal-engine building blocks

#[cfg(test)]
mod tests {
    use chrono::{TimeZone, Utc};
    use serde_json::json;
    use signal_engine::prelude::*;

    fn candle(secs: i64, close: f64) -> Candle {
        Candle {
            timestamp: Utc.timestamp_opt(secs, 0).unwrap(),
            open: close,
            high: close + 0.01,
            low: close - 0.01,
            close,
            volume: 1_000.0,
        }
    }

    #[test]
    fn test_rsi_indicator() {
        let mut rsi = Rsi::new(14).unwrap();
        assert_eq!(rsi.name(), "RSI");
        assert_eq!(rsi.period(), 14);
        assert!(!rsi.is_ready());

        for i in 0..15 {
            rsi.update(if i % 2 == 0 { 100.0 } else { 101.0 });
        }

        assert!(rsi.is_ready());
        assert!((rsi.value().unwrap() - 50.0).abs() < 1e-9);
    }

    #[test]
    fn test_flat_series_reads_overbought() {
        let closes = vec![0.5; 30];
        assert_eq!(calculate_rsi(&closes, 14).unwrap(), 100.0);
    }

    #[test]
    fn test_rsi_rejects_non_finite_close() {
        let mut closes: Vec<f64> = (0..20).map(|i| 1.0 + i as f64 * 0.01).collect();
        closes[7] = f64::NAN;

        let err = calculate_rsi(&closes, 14).unwrap_err();
        assert!(err.is_data_unavailable());
    }

    #[test]
    fn test_series_closes_feed_rsi() {
        // out of order on purpose
        let series = CandleSeries::from_vec(
            (0..20)
                .rev()
                .map(|i| candle(1_700_000_000 + i * 60, 0.50 + i as f64 * 0.01))
                .collect(),
        );

        let closes = series.recent_closes(15);
        assert_eq!(closes.len(), 15);
        assert!((closes[0] - 0.55).abs() < 1e-9);
        assert!((closes[14] - 0.69).abs() < 1e-9);
        assert_eq!(calculate_rsi(&closes, 14).unwrap(), 100.0);
    }

    #[test]
    fn test_params_from_json_document() {
        let params: TradingParams = serde_json::from_value(json!({
            "pair": "XXBTZUSD",
            "baseAsset": "XXBT",
            "buyThreshold": 0.97,
            "sellThreshold": 1.03,
            "tradeVolume": 0.01,
            "checkInterval": 30000,
            "minHolding": 0.05,
            "makerFeeRate": 0.0016,
            "takerFeeRate": 0.0026,
            "estimatedTaxRate": 0.15,
            "rsiPeriod": 14,
            "buyRSIThreshold": 25,
            "sellRSIThreshold": 75,
            "historyLength": 100
        }))
        .unwrap();

        params.validate().unwrap();
        assert_eq!(params.check_interval().as_secs(), 30);
        assert_eq!(params.buy_rsi_threshold, 25.0);
    }

    #[test]
    fn test_hold_decision_is_not_actionable() {
        let decision = TradeDecision::hold(0.52, 48.0);
        assert!(!decision.is_actionable());
        assert_eq!(decision.action.side(), None);
        assert_eq!(TradeAction::Buy.side(), Some(OrderSide::Buy));
    }
}
