use std::sync::Arc;

use anyhow::{Context, Result};
use signal_engine::prelude::*;
use tokio::sync::broadcast::{self, error::RecvError};
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

mod config;
mod version;

use crate::config::{Config, LogFormat};

const DEFAULT_LOG_FILTER: &str = "bot=info,signal_engine=info";

fn init_tracing(format: LogFormat) {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(DEFAULT_LOG_FILTER));
    let builder = tracing_subscriber::fmt().with_env_filter(filter);

    match format {
        LogFormat::Json => builder.json().init(),
        LogFormat::Pretty => builder.init(),
    }
}

/// Defaults, overridden by the JSON document at `path` if given
async fn load_params(path: Option<&str>) -> Result<TradingParams> {
    let defaults = TradingParams::default();
    let Some(path) = path else {
        return Ok(defaults);
    };

    let raw = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read params file {}", path))?;
    let update: ParamsUpdate = serde_json::from_str(&raw)
        .with_context(|| format!("failed to parse params file {}", path))?;
    let params = defaults
        .merged(&update)
        .with_context(|| format!("invalid params in {}", path))?;

    info!("Loaded params overrides from {}", path);
    Ok(params)
}

async fn check_min_order_volume(kraken: &KrakenClient, params: &TradingParams) {
    match kraken.min_order_volume(&params.pair).await {
        Ok(Some(min)) if params.trade_volume < min => warn!(
            "tradeVolume {} is below the {} ordermin {}; Kraken will reject these orders",
            params.trade_volume, params.pair, min
        ),
        Ok(Some(min)) => debug!("{} ordermin {}", params.pair, min),
        Ok(None) => warn!("Kraken publishes no ordermin for {}", params.pair),
        Err(e) => warn!("Could not check ordermin for {}: {}", params.pair, e),
    }
}

/// Forward every engine event to the log as one JSON line
fn spawn_event_logger(mut events: broadcast::Receiver<EngineEvent>) {
    tokio::spawn(async move {
        loop {
            match events.recv().await {
                Ok(event) => match serde_json::to_string(&event) {
                    Ok(json) => info!(target: "bot::events", "{}", json),
                    Err(e) => warn!("Unserializable engine event {:?}: {}", event, e),
                },
                Err(RecvError::Lagged(skipped)) => {
                    warn!("Event logger lagging, {} events dropped", skipped)
                }
                Err(RecvError::Closed) => break,
            }
        }
    });
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = Config::from_env()?;
    init_tracing(config.log_format);

    info!("Starting signal bot {}", version::summary());

    let params = load_params(config.params_file.as_deref()).await?;
    info!(
        "Trading {} ({}) every {:?}: volume {}, thresholds {}/{}, RSI({}) {}/{}",
        params.pair,
        params.base_asset,
        params.check_interval(),
        params.trade_volume,
        params.buy_threshold,
        params.sell_threshold,
        params.rsi_period,
        params.buy_rsi_threshold,
        params.sell_rsi_threshold
    );

    if !config.has_credentials() {
        warn!("KRAKEN_API_KEY or KRAKEN_API_SECRET not set; balance and order calls will fail");
    }

    let kraken = Arc::new(
        KrakenClient::new(config.kraken()).context("failed to build Kraken client")?,
    );
    check_min_order_volume(&kraken, &params).await;

    let engine = if config.dry_run {
        info!(
            "DRY_RUN: orders go to the paper broker starting with {} {}",
            config.paper_holding, params.base_asset
        );
        let paper = Arc::new(PaperBroker::new([(
            params.base_asset.clone(),
            config.paper_holding,
        )]));
        paper
            .map_pair(params.pair.clone(), params.base_asset.clone())
            .await;
        SignalEngine::new(params, kraken, paper.clone(), paper)?
    } else {
        warn!("DRY_RUN disabled: live market orders will be placed on Kraken");
        SignalEngine::new(params, kraken.clone(), kraken.clone(), kraken)?
    };

    spawn_event_logger(engine.subscribe());

    // seed the baseline now instead of one interval from now
    let _ = engine.run_cycle().await;
    engine.start().await;

    tokio::signal::ctrl_c()
        .await
        .context("failed to listen for Ctrl-C")?;

    info!("Shutdown requested");
    engine.stop().await;
    info!("Final status: {:?}", engine.status().await);

    Ok(())
}
