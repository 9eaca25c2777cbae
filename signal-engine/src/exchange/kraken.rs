//! Kraken REST client
//!
//! Public endpoints (Ticker, OHLC, AssetPairs) and the two private ones the
//! bot needs (Balance, AddOrder). Every response is unwrapped from Kraken's
//! `{"error": [...], "result": ...}` envelope and checked against the shape
//! the engine relies on before anything is returned.

use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::Utc;
use hmac::{Hmac, Mac};
use reqwest::header::CONTENT_TYPE;
use reqwest::Client;
use serde::Deserialize;
use serde_json::{Map, Value};
use sha2::{Digest, Sha256, Sha512};
use tracing::{debug, info, warn};

use crate::data::candle::decimal_field;
use crate::data::{Candle, CandleSeries};
use crate::error::EngineError;
use crate::exchange::{
    AccountBalanceSource, MarketDataSource, OrderExecutionSink, OrderReceipt, OrderSide,
};
use crate::Result;

type HmacSha512 = Hmac<Sha512>;

/// Kraken connection settings
#[derive(Debug, Clone)]
pub struct KrakenConfig {
    /// API root, e.g. `https://api.kraken.com`
    pub api_url: String,
    pub api_key: Option<String>,
    /// Base64 encoded private key
    pub api_secret: Option<String>,
    /// OHLC candle interval in minutes
    pub ohlc_interval_minutes: u32,
    /// Per-request timeout
    pub timeout: Duration,
}

impl Default for KrakenConfig {
    fn default() -> Self {
        Self {
            api_url: "https://api.kraken.com".to_string(),
            api_key: None,
            api_secret: None,
            ohlc_interval_minutes: 1,
            timeout: Duration::from_secs(10),
        }
    }
}

/// Kraken response envelope
#[derive(Debug, Deserialize)]
struct KrakenResponse {
    #[serde(default)]
    error: Vec<String>,
    result: Option<Value>,
}

impl KrakenResponse {
    fn into_result(self) -> std::result::Result<Value, String> {
        if !self.error.is_empty() {
            return Err(self.error.join(", "));
        }
        self.result
            .ok_or_else(|| "response has neither error nor result".to_string())
    }
}

/// Kraken REST client
pub struct KrakenClient {
    client: Client,
    config: KrakenConfig,
    last_nonce: AtomicU64,
}

impl KrakenClient {
    /// Create new client
    pub fn new(config: KrakenConfig) -> Result<Self> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| EngineError::client_setup(format!("HTTP client: {}", e)))?;

        info!(
            "Kraken client initialized: {} (OHLC interval {}m, credentials: {})",
            config.api_url,
            config.ohlc_interval_minutes,
            config.api_key.is_some() && config.api_secret.is_some()
        );

        Ok(Self {
            client,
            config,
            last_nonce: AtomicU64::new(0),
        })
    }

    /// Whether private endpoints can be called
    pub fn has_credentials(&self) -> bool {
        self.config.api_key.is_some() && self.config.api_secret.is_some()
    }

    /// Last traded price of `pair` (`c[0]` of the ticker)
    pub async fn ticker_price(&self, pair: &str) -> Result<f64> {
        let result = self
            .public_get("/0/public/Ticker", &[("pair", pair.to_string())])
            .await
            .map_err(|e| EngineError::data_unavailable(format!("Ticker {}: {}", pair, e)))?;
        parse_ticker_price(&result, pair)
    }

    /// OHLC candles of `pair` at the configured interval
    pub async fn ohlc(&self, pair: &str) -> Result<CandleSeries> {
        let query = [
            ("pair", pair.to_string()),
            ("interval", self.config.ohlc_interval_minutes.to_string()),
        ];
        let result = self
            .public_get("/0/public/OHLC", &query)
            .await
            .map_err(|e| EngineError::data_unavailable(format!("OHLC {}: {}", pair, e)))?;
        parse_ohlc(&result, pair)
    }

    /// Minimum order volume of `pair`, if the exchange publishes one
    pub async fn min_order_volume(&self, pair: &str) -> Result<Option<f64>> {
        let result = self
            .public_get("/0/public/AssetPairs", &[("pair", pair.to_string())])
            .await
            .map_err(|e| EngineError::data_unavailable(format!("AssetPairs {}: {}", pair, e)))?;
        let info = pair_entry(&result, pair)?;
        match info.get("ordermin") {
            Some(value) => decimal_field(value, "ordermin").map(Some),
            None => Ok(None),
        }
    }

    /// All account balances
    pub async fn balances(&self) -> Result<HashMap<String, f64>> {
        let result = self
            .private_post("/0/private/Balance", &[])
            .await
            .map_err(|e| EngineError::data_unavailable(format!("Balance: {}", e)))?;
        parse_balances(&result)
    }

    /// Place a market order
    pub async fn add_market_order(
        &self,
        pair: &str,
        side: OrderSide,
        volume: f64,
    ) -> Result<OrderReceipt> {
        let params = [
            ("pair", pair.to_string()),
            ("type", side.as_str().to_string()),
            ("ordertype", "market".to_string()),
            ("volume", volume.to_string()),
        ];
        let result = self
            .private_post("/0/private/AddOrder", &params)
            .await
            .map_err(|e| {
                EngineError::execution_failed(format!("AddOrder {} {}: {}", side, pair, e))
            })?;
        let (order_ids, description) = parse_add_order(&result)?;

        info!("Kraken accepted order {:?}: {}", order_ids, description);
        Ok(OrderReceipt::new(
            order_ids,
            description,
            pair.to_string(),
            side,
            volume,
        ))
    }

    async fn public_get(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> std::result::Result<Value, String> {
        let url = format!("{}{}", self.config.api_url, path);
        debug!("GET {} {:?}", path, query);

        let response = self
            .client
            .get(&url)
            .query(query)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| e.to_string())?;
        let envelope: KrakenResponse = response.json().await.map_err(|e| e.to_string())?;
        envelope.into_result()
    }

    async fn private_post(
        &self,
        path: &str,
        params: &[(&str, String)],
    ) -> std::result::Result<Value, String> {
        let (Some(api_key), Some(api_secret)) = (&self.config.api_key, &self.config.api_secret)
        else {
            return Err("missing API credentials".to_string());
        };

        let nonce = self.next_nonce();
        // the serializer is not Send; finish it before the first await
        let post_data = {
            let mut form = url::form_urlencoded::Serializer::new(String::new());
            form.append_pair("nonce", &nonce.to_string());
            for (key, value) in params {
                form.append_pair(key, value);
            }
            form.finish()
        };
        let signature =
            sign_request(api_secret, path, nonce, &post_data).map_err(|e| e.to_string())?;

        debug!("POST {}", path);
        let response = self
            .client
            .post(format!("{}{}", self.config.api_url, path))
            .header("API-Key", api_key)
            .header("API-Sign", signature)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(post_data)
            .send()
            .await
            .and_then(|r| r.error_for_status())
            .map_err(|e| e.to_string())?;
        let envelope: KrakenResponse = response.json().await.map_err(|e| e.to_string())?;
        envelope.into_result()
    }

    /// Microsecond-scale nonce, strictly increasing per client
    fn next_nonce(&self) -> u64 {
        let now = Utc::now().timestamp_millis().max(0) as u64 * 1000;
        let mut last = self.last_nonce.load(Ordering::Relaxed);
        loop {
            let next = now.max(last + 1);
            match self
                .last_nonce
                .compare_exchange_weak(last, next, Ordering::Relaxed, Ordering::Relaxed)
            {
                Ok(_) => return next,
                Err(current) => last = current,
            }
        }
    }
}

#[async_trait]
impl MarketDataSource for KrakenClient {
    async fn latest_price(&self, pair: &str) -> Result<f64> {
        self.ticker_price(pair).await
    }

    async fn recent_closes(&self, pair: &str, count: usize) -> Result<Vec<f64>> {
        let closes = self.ohlc(pair).await?.recent_closes(count);
        if closes.len() < count {
            debug!("OHLC for {} has {} closes, {} requested", pair, closes.len(), count);
        }
        Ok(closes)
    }
}

#[async_trait]
impl AccountBalanceSource for KrakenClient {
    async fn holding(&self, asset: &str) -> Result<f64> {
        let balances = self.balances().await?;
        // Kraken omits assets that were never held
        Ok(balances.get(asset).copied().unwrap_or(0.0))
    }
}

#[async_trait]
impl OrderExecutionSink for KrakenClient {
    async fn place_market_order(
        &self,
        pair: &str,
        side: OrderSide,
        volume: f64,
    ) -> Result<OrderReceipt> {
        self.add_market_order(pair, side, volume).await
    }
}

/// `API-Sign` header:
/// `base64(HMAC-SHA512(base64decode(secret), path || SHA256(nonce || post_data)))`
pub fn sign_request(secret: &str, path: &str, nonce: u64, post_data: &str) -> Result<String> {
    let key = STANDARD
        .decode(secret)
        .map_err(|e| EngineError::client_setup(format!("API secret is not base64: {}", e)))?;

    let mut sha = Sha256::new();
    sha.update(nonce.to_string().as_bytes());
    sha.update(post_data.as_bytes());
    let digest = sha.finalize();

    let mut mac = HmacSha512::new_from_slice(&key)
        .map_err(|e| EngineError::client_setup(format!("HMAC key: {}", e)))?;
    mac.update(path.as_bytes());
    mac.update(&digest);
    Ok(STANDARD.encode(mac.finalize().into_bytes()))
}

fn as_object<'a>(value: &'a Value, what: &str) -> Result<&'a Map<String, Value>> {
    value
        .as_object()
        .ok_or_else(|| EngineError::data_unavailable(format!("{} result is not an object", what)))
}

/// Kraken answers under its own pair name (e.g. `XRPUSD` -> `XXRPZUSD`),
/// so fall back to the only entry when the requested key is absent.
fn pair_entry<'a>(result: &'a Value, pair: &str) -> Result<&'a Value> {
    let obj = as_object(result, pair)?;
    if let Some(entry) = obj.get(pair) {
        return Ok(entry);
    }
    let mut entries = obj.iter().filter(|(key, _)| key.as_str() != "last");
    match (entries.next(), entries.next()) {
        (Some((_, entry)), None) => Ok(entry),
        (None, _) => Err(EngineError::data_unavailable(format!("no entry for {}", pair))),
        (Some(_), Some(_)) => Err(EngineError::data_unavailable(format!(
            "ambiguous response for {}",
            pair
        ))),
    }
}

fn parse_ticker_price(result: &Value, pair: &str) -> Result<f64> {
    let last_trade = pair_entry(result, pair)?
        .get("c")
        .and_then(Value::as_array)
        .and_then(|c| c.first())
        .ok_or_else(|| EngineError::data_unavailable("Invalid ticker data structure"))?;
    let price = decimal_field(last_trade, "last trade price")?;
    if price <= 0.0 {
        return Err(EngineError::data_unavailable(format!(
            "non-positive ticker price {}",
            price
        )));
    }
    Ok(price)
}

fn parse_ohlc(result: &Value, pair: &str) -> Result<CandleSeries> {
    let rows = pair_entry(result, pair)?
        .as_array()
        .ok_or_else(|| EngineError::data_unavailable("Invalid OHLC data structure"))?;
    let candles = rows
        .iter()
        .map(Candle::from_kraken_row)
        .collect::<Result<Vec<_>>>()?;
    Ok(CandleSeries::from_vec(candles))
}

fn parse_balances(result: &Value) -> Result<HashMap<String, f64>> {
    as_object(result, "Balance")?
        .iter()
        .map(|(asset, amount)| -> Result<(String, f64)> {
            Ok((asset.clone(), decimal_field(amount, asset)?))
        })
        .collect()
}

fn parse_add_order(result: &Value) -> Result<(Vec<String>, String)> {
    let order_ids: Vec<String> = result
        .get("txid")
        .and_then(Value::as_array)
        .map(|ids| ids.iter().filter_map(|id| id.as_str().map(str::to_string)).collect())
        .unwrap_or_default();
    if order_ids.is_empty() {
        warn!("AddOrder result without txid: {}", result);
        return Err(EngineError::execution_failed("order acknowledged without txid"));
    }
    let description = result
        .get("descr")
        .and_then(|d| d.get("order"))
        .and_then(Value::as_str)
        .unwrap_or_default()
        .to_string();
    Ok((order_ids, description))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::sync::Arc;

    #[test]
    fn test_sign_request_matches_documented_vector() {
        let secret = "kQH5HW/8p1uGOVjbgWA7FunAmGO8lsSUXNsu3eow76sz84Q18fWxnyRzBHCd3pd5nE9qa99HAZtuZuj6F1huXg==";
        let post_data = "nonce=1616492376594&ordertype=limit&pair=XBTUSD&price=37500&type=buy&volume=1.25";

        let signature =
            sign_request(secret, "/0/private/AddOrder", 1616492376594, post_data).unwrap();

        assert_eq!(
            signature,
            "4/dpxb3iT4tp/ZCVEwSnEsLxx0bqyhLpdfOpc6fn7OR8+UClSV5n9E6aSS8MPtnRfp32bAb0nmbRn6H8ndwLUQ=="
        );
    }

    #[test]
    fn test_sign_request_rejects_bad_secret() {
        assert!(matches!(
            sign_request("not base64!", "/0/private/Balance", 1, "nonce=1"),
            Err(EngineError::ClientSetup(_))
        ));
    }

    #[test]
    fn test_envelope_errors_are_joined() {
        let envelope: KrakenResponse = serde_json::from_value(json!({
            "error": ["EQuery:Unknown asset pair", "EGeneral:Invalid"]
        }))
        .unwrap();
        assert_eq!(
            envelope.into_result().unwrap_err(),
            "EQuery:Unknown asset pair, EGeneral:Invalid"
        );
    }

    #[test]
    fn test_parse_ticker_price() {
        let result = json!({"XXRPZUSD": {"a": ["0.5", "1", "1.0"], "c": ["0.51230", "12.5"]}});
        assert_eq!(parse_ticker_price(&result, "XRPUSD").unwrap(), 0.5123);
        assert_eq!(parse_ticker_price(&result, "XXRPZUSD").unwrap(), 0.5123);
    }

    #[test]
    fn test_parse_ticker_rejects_bad_shapes() {
        let results = [
            json!([]),
            json!({}),
            json!({"XXRPZUSD": {"c": "0.5"}}),
            json!({"XXRPZUSD": {"c": []}}),
            json!({"XXRPZUSD": {"c": ["abc"]}}),
            json!({"XXRPZUSD": {"c": ["0"]}}),
            json!({"A": {"c": ["1"]}, "B": {"c": ["2"]}}),
        ];
        for result in results.iter() {
            let err = parse_ticker_price(result, "XRPUSD").unwrap_err();
            assert!(err.is_data_unavailable(), "{}", result);
        }
    }

    #[test]
    fn test_parse_ohlc_skips_cursor() {
        let result = json!({
            "XXRPZUSD": [
                [1700000000, "0.50", "0.52", "0.49", "0.51", "0.50", "1000", 5],
                [1700000060, "0.51", "0.53", "0.50", "0.52", "0.51", "1200", 7]
            ],
            "last": 1700000000
        });

        let series = parse_ohlc(&result, "XRPUSD").unwrap();
        assert_eq!(series.recent_closes(10), vec![0.51, 0.52]);
    }

    #[test]
    fn test_parse_balances_and_missing_asset() {
        let result = json!({"XXRP": "60.50000000", "ZUSD": "12.3400"});
        let balances = parse_balances(&result).unwrap();

        assert_eq!(balances.get("XXRP"), Some(&60.5));
        assert_eq!(balances.get("XXBT"), None);
        assert!(parse_balances(&json!({"XXRP": true})).is_err());
    }

    #[test]
    fn test_parse_add_order() {
        let result = json!({
            "descr": {"order": "buy 10.00000000 XRPUSD @ market"},
            "txid": ["OUF4EM-FRGI2-MQMWZD"]
        });
        let (ids, description) = parse_add_order(&result).unwrap();
        assert_eq!(ids, vec!["OUF4EM-FRGI2-MQMWZD".to_string()]);
        assert_eq!(description, "buy 10.00000000 XRPUSD @ market");

        let err = parse_add_order(&json!({"descr": {"order": "x"}})).unwrap_err();
        assert!(matches!(err, EngineError::ExecutionFailed { .. }));
    }

    #[test]
    fn test_nonce_strictly_increases() {
        let client = KrakenClient::new(KrakenConfig::default()).unwrap();
        let first = client.next_nonce();
        let second = client.next_nonce();
        assert!(second > first);
    }

    #[tokio::test]
    async fn test_private_calls_need_credentials() {
        let client = KrakenClient::new(KrakenConfig::default()).unwrap();
        assert!(!client.has_credentials());

        let err = client.holding("XXRP").await.unwrap_err();
        assert!(err.is_data_unavailable());

        let err = client
            .place_market_order("XXRPZUSD", OrderSide::Buy, 10.0)
            .await
            .unwrap_err();
        assert!(matches!(err, EngineError::ExecutionFailed { .. }));
    }

    #[tokio::test]
    async fn test_calls_can_run_on_spawned_tasks() {
        let client = Arc::new(KrakenClient::new(KrakenConfig::default()).unwrap());

        let balance = tokio::spawn({
            let client = client.clone();
            async move { client.holding("XXRP").await }
        });
        let order = tokio::spawn({
            let client = client.clone();
            async move {
                client
                    .place_market_order("XXRPZUSD", OrderSide::Sell, 10.0)
                    .await
            }
        });

        assert!(balance.await.unwrap().unwrap_err().is_data_unavailable());
        assert!(matches!(
            order.await.unwrap().unwrap_err(),
            EngineError::ExecutionFailed { .. }
        ));
    }
}
