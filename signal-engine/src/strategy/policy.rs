//! Threshold and RSI decision policy

use tracing::debug;

use crate::config::TradingParams;
use crate::strategy::{SignalTrigger, TradeAction, TradeDecision};

/// Buy or Sell proposal before balance and profitability gating
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Candidate {
    pub action: TradeAction,
    pub trigger: SignalTrigger,
}

/// Decision policy evaluated once per cycle.
///
/// Rules, first match wins:
/// 1. no previous price: hold (the caller seeds the baseline)
/// 2. RSI <= buy RSI threshold: buy
/// 3. RSI >= sell RSI threshold: sell
/// 4. price <= previous * buy threshold: buy
/// 5. price >= previous * sell threshold: sell
/// 6. otherwise hold
///
/// Candidates are then gated by the holding floor, and sells also by the
/// estimated profit net of taker fee and tax.
#[derive(Debug, Clone, Copy)]
pub struct DecisionPolicy<'a> {
    params: &'a TradingParams,
}

impl<'a> DecisionPolicy<'a> {
    pub fn new(params: &'a TradingParams) -> Self {
        Self { params }
    }

    /// Full policy, including the first-observation rule
    pub fn evaluate(
        &self,
        current_price: f64,
        previous_price: Option<f64>,
        rsi: f64,
        holding: f64,
    ) -> TradeDecision {
        let Some(previous_price) = previous_price else {
            return TradeDecision::hold(current_price, rsi)
                .with_note(format!("Baseline price seeded at {}", current_price));
        };

        match self.candidate(current_price, previous_price, rsi) {
            Some(candidate) => {
                self.authorize(candidate, current_price, previous_price, rsi, holding)
            }
            None => TradeDecision::hold(current_price, rsi),
        }
    }

    /// Rules 2-6: the raw signal, ignoring balances and costs
    pub fn candidate(
        &self,
        current_price: f64,
        previous_price: f64,
        rsi: f64,
    ) -> Option<Candidate> {
        let p = self.params;
        let candidate = if rsi <= p.buy_rsi_threshold {
            Some((TradeAction::Buy, SignalTrigger::Rsi))
        } else if rsi >= p.sell_rsi_threshold {
            Some((TradeAction::Sell, SignalTrigger::Rsi))
        } else if current_price <= previous_price * p.buy_threshold {
            Some((TradeAction::Buy, SignalTrigger::PriceRatio))
        } else if current_price >= previous_price * p.sell_threshold {
            Some((TradeAction::Sell, SignalTrigger::PriceRatio))
        } else {
            None
        };

        debug!(
            "Policy: price={}, previous={}, RSI={:.2}, candidate={:?}",
            current_price, previous_price, rsi, candidate
        );

        candidate.map(|(action, trigger)| Candidate { action, trigger })
    }

    /// Gate a candidate against the holding floor and, for sells, net profit
    pub fn authorize(
        &self,
        candidate: Candidate,
        current_price: f64,
        previous_price: f64,
        rsi: f64,
        holding: f64,
    ) -> TradeDecision {
        let p = self.params;
        let estimated_fee = p.trade_volume * current_price * p.taker_fee_rate;

        match candidate.action {
            TradeAction::Buy => {
                if holding + p.trade_volume >= p.min_holding {
                    TradeDecision {
                        action: TradeAction::Buy,
                        price: current_price,
                        estimated_fee,
                        estimated_tax: 0.0,
                        rsi,
                        trigger: Some(candidate.trigger),
                        note: None,
                    }
                } else {
                    degraded(candidate, current_price, rsi, estimated_fee, 0.0).with_note(format!(
                        "Buy skipped to preserve minimum holding: {} {}",
                        p.min_holding, p.base_asset
                    ))
                }
            }
            TradeAction::Sell => {
                let estimated_profit = (current_price - previous_price) * p.trade_volume;
                let estimated_tax = if estimated_profit > 0.0 {
                    estimated_profit * p.estimated_tax_rate
                } else {
                    0.0
                };
                let keeps_floor = holding - p.trade_volume >= p.min_holding;
                let net = estimated_profit - estimated_fee - estimated_tax;

                if keeps_floor && net > 0.0 {
                    TradeDecision {
                        action: TradeAction::Sell,
                        price: current_price,
                        estimated_fee,
                        estimated_tax,
                        rsi,
                        trigger: Some(candidate.trigger),
                        note: None,
                    }
                } else {
                    let reason = match (keeps_floor, net > 0.0) {
                        (false, false) => "minimum holding and fees/tax",
                        (false, true) => "minimum holding",
                        _ => "fees/tax",
                    };
                    degraded(candidate, current_price, rsi, estimated_fee, estimated_tax)
                        .with_note(format!(
                            "Sell skipped due to {} constraints (holding {}, net {:.4})",
                            reason, holding, net
                        ))
                }
            }
            TradeAction::Hold => TradeDecision::hold(current_price, rsi),
        }
    }
}

fn degraded(
    candidate: Candidate,
    price: f64,
    rsi: f64,
    estimated_fee: f64,
    estimated_tax: f64,
) -> TradeDecision {
    TradeDecision {
        action: TradeAction::Hold,
        price,
        estimated_fee,
        estimated_tax,
        rsi,
        trigger: Some(candidate.trigger),
        note: None,
    }
}
