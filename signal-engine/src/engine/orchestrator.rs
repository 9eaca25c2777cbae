//! Cycle orchestrator

use std::sync::{Arc, Weak};
use std::time::Duration;

use tokio::sync::{broadcast, watch, Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::{interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{debug, error, info, warn};

use crate::config::{ParamsUpdate, TradingParams};
use crate::engine::{EngineEvent, EngineState, EngineStatus};
use crate::error::EngineError;
use crate::exchange::{AccountBalanceSource, MarketDataSource, OrderExecutionSink};
use crate::indicators::calculate_rsi;
use crate::strategy::{DecisionPolicy, TradeDecision};
use crate::Result;

const EVENT_CAPACITY: usize = 256;

/// Running worker task
struct Worker {
    shutdown: watch::Sender<bool>,
    _handle: JoinHandle<()>,
}

struct Inner {
    market: Arc<dyn MarketDataSource>,
    balances: Arc<dyn AccountBalanceSource>,
    orders: Arc<dyn OrderExecutionSink>,
    params: RwLock<TradingParams>,
    state: RwLock<EngineState>,
    /// Held for the whole duration of a cycle
    cycle_guard: Mutex<()>,
    worker: Mutex<Option<Worker>>,
    /// Current `checkInterval`, watched by the worker
    interval: watch::Sender<Duration>,
    events: broadcast::Sender<EngineEvent>,
}

/// Signal engine handle.
///
/// Cloning is cheap; every clone drives the same engine. While running, a
/// single worker task fires one cycle per `checkInterval`: fetch price,
/// fetch closes, compute RSI, evaluate the policy, optionally place an
/// order, record the price. Cycles never overlap.
#[derive(Clone)]
pub struct SignalEngine {
    inner: Arc<Inner>,
}

impl SignalEngine {
    /// Create new stopped engine
    pub fn new(
        params: TradingParams,
        market: Arc<dyn MarketDataSource>,
        balances: Arc<dyn AccountBalanceSource>,
        orders: Arc<dyn OrderExecutionSink>,
    ) -> Result<Self> {
        params.validate()?;
        let (events, _) = broadcast::channel(EVENT_CAPACITY);
        let (interval, _) = watch::channel(params.check_interval());

        Ok(Self {
            inner: Arc::new(Inner {
                market,
                balances,
                orders,
                params: RwLock::new(params),
                state: RwLock::new(EngineState::default()),
                cycle_guard: Mutex::new(()),
                worker: Mutex::new(None),
                interval,
                events,
            }),
        })
    }

    /// Receive engine events from now on
    pub fn subscribe(&self) -> broadcast::Receiver<EngineEvent> {
        self.inner.events.subscribe()
    }

    /// Arm the periodic trigger. Returns false if already running.
    pub async fn start(&self) -> bool {
        let mut worker = self.inner.worker.lock().await;
        {
            let mut state = self.inner.state.write().await;
            if state.is_running {
                debug!("start() ignored: engine already running");
                return false;
            }
            state.is_running = true;
        }

        let mut interval_rx = self.inner.interval.subscribe();
        let period = *interval_rx.borrow_and_update();
        let (shutdown, shutdown_rx) = watch::channel(false);
        let handle = tokio::spawn(run_loop(
            Arc::downgrade(&self.inner),
            period,
            interval_rx,
            shutdown_rx,
        ));
        *worker = Some(Worker {
            shutdown,
            _handle: handle,
        });

        info!("Signal engine started (interval {:?})", period);
        self.emit(EngineEvent::Started);
        true
    }

    /// Disarm the periodic trigger. An in-flight cycle runs to completion.
    /// Returns false if already stopped.
    pub async fn stop(&self) -> bool {
        let mut worker = self.inner.worker.lock().await;
        {
            let mut state = self.inner.state.write().await;
            if !state.is_running {
                debug!("stop() ignored: engine not running");
                return false;
            }
            state.is_running = false;
        }

        if let Some(worker) = worker.take() {
            let _ = worker.shutdown.send(true);
        }

        info!("Signal engine stopped");
        self.emit(EngineEvent::Stopped);
        true
    }

    /// Replace the params with `update` applied on top of the current ones.
    ///
    /// The next cycle sees the whole new record and a new `checkInterval`
    /// re-arms the timer at once. A rejected update changes nothing.
    pub async fn update_params(&self, update: ParamsUpdate) -> Result<TradingParams> {
        let mut params = self.inner.params.write().await;
        let next = params.merged(&update).map_err(|e| {
            warn!("Rejected params update: {}", e);
            e
        })?;
        *params = next.clone();
        drop(params);
        self.inner.interval.send_replace(next.check_interval());

        info!("Trading params updated: {:?}", next);
        self.emit(EngineEvent::ParamsUpdated {
            params: next.clone(),
        });
        Ok(next)
    }

    /// Current params
    pub async fn params(&self) -> TradingParams {
        self.inner.params.read().await.clone()
    }

    /// Status snapshot
    pub async fn status(&self) -> EngineStatus {
        let state = self.inner.state.read().await.clone();
        EngineStatus {
            is_running: state.is_running,
            cycle_in_progress: self.inner.cycle_guard.try_lock().is_err(),
            last_observed_price: state.last_observed_price,
            cycles_completed: state.cycles_completed,
            last_cycle_at: state.last_cycle_at,
            params: self.params().await,
        }
    }

    /// Forget the previous price; the next cycle only seeds it
    pub async fn reset_baseline(&self) {
        self.inner.state.write().await.reset_baseline();
        info!("Price baseline reset");
    }

    /// Run one cycle now.
    ///
    /// Returns `Ok(None)` when another cycle is still in progress and this
    /// one was skipped. Failures are also reported on the event channel.
    pub async fn run_cycle(&self) -> Result<Option<TradeDecision>> {
        let Ok(_guard) = self.inner.cycle_guard.try_lock() else {
            warn!("Cycle skipped: previous cycle still in progress");
            self.emit(EngineEvent::info(
                "Cycle skipped: previous cycle still in progress",
            ));
            return Ok(None);
        };

        // one consistent snapshot per cycle
        let params = self.inner.params.read().await.clone();
        match self.execute_cycle(&params).await {
            Ok(decision) => Ok(Some(decision)),
            Err(e) => {
                error!("Cycle failed for {}: {}", params.pair, e);
                self.emit(EngineEvent::error(&e));
                Err(e)
            }
        }
    }

    async fn execute_cycle(&self, params: &TradingParams) -> Result<TradeDecision> {
        let price = self.inner.market.latest_price(&params.pair).await?;
        if !price.is_finite() || price <= 0.0 {
            return Err(EngineError::data_unavailable(format!(
                "invalid price {} for {}",
                price, params.pair
            )));
        }

        let closes = self
            .inner
            .market
            .recent_closes(&params.pair, params.history_length)
            .await?;
        let rsi = calculate_rsi(&closes, params.rsi_period)?;
        debug!(
            "{}: price={}, RSI({})={:.2} over {} closes",
            params.pair,
            price,
            params.rsi_period,
            rsi,
            closes.len()
        );

        let previous = self.inner.state.read().await.last_observed_price;
        let policy = DecisionPolicy::new(params);

        let Some(previous) = previous else {
            let decision = policy.evaluate(price, None, rsi, 0.0);
            self.record_price(price).await?;
            info!("Baseline price for {} seeded at {}", params.pair, price);
            if let Some(note) = &decision.note {
                self.emit(EngineEvent::info(note.clone()));
            }
            return Ok(decision);
        };

        let decision = match policy.candidate(price, previous, rsi) {
            Some(candidate) => {
                let holding = self.inner.balances.holding(&params.base_asset).await?;
                policy.authorize(candidate, price, previous, rsi, holding)
            }
            None => TradeDecision::hold(price, rsi),
        };

        if let Some(note) = &decision.note {
            warn!("{}", note);
            self.emit(EngineEvent::info(note.clone()));
        }

        let placed = match decision.action.side() {
            Some(side) => {
                info!(
                    "{} signal ({:?}): price={}, RSI={:.2}, fee~{:.4}, tax~{:.4}",
                    side,
                    decision.trigger,
                    price,
                    rsi,
                    decision.estimated_fee,
                    decision.estimated_tax
                );
                self.inner
                    .orders
                    .place_market_order(&params.pair, side, params.trade_volume)
                    .await
                    .map(|receipt| {
                        self.emit(EngineEvent::Trade {
                            side,
                            price,
                            receipt,
                            estimated_fee: decision.estimated_fee,
                            estimated_tax: decision.estimated_tax,
                            rsi,
                        });
                    })
            }
            None => Ok(()),
        };

        // the decided cycle ends here whether or not the order went through
        self.record_price(price).await?;
        placed.map(|_| decision)
    }

    async fn record_price(&self, price: f64) -> Result<()> {
        self.inner.state.write().await.observe(price)
    }

    fn emit(&self, event: EngineEvent) {
        // no subscribers is fine
        let _ = self.inner.events.send(event);
    }
}

/// Worker body. Holds only a weak handle so dropping every `SignalEngine`
/// ends the loop even without `stop()`.
async fn run_loop(
    engine: Weak<Inner>,
    mut period: Duration,
    mut interval: watch::Receiver<Duration>,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = arm_ticker(period);

    loop {
        tokio::select! {
            _ = ticker.tick() => {}
            Ok(()) = interval.changed() => {
                let next = *interval.borrow_and_update();
                if next != period {
                    info!("Check interval changed: {:?} -> {:?}", period, next);
                    period = next;
                    ticker = arm_ticker(period);
                }
                continue;
            }
            _ = shutdown.changed() => break,
        }
        if *shutdown.borrow() {
            break;
        }

        let Some(inner) = engine.upgrade() else {
            break;
        };
        // failures are already logged and emitted
        let _ = SignalEngine { inner }.run_cycle().await;
    }

    debug!("Signal engine worker exited");
}

/// First firing one full period after arming
fn arm_ticker(period: Duration) -> Interval {
    let mut ticker = interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
    ticker
}
