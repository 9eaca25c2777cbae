use std::str::FromStr;
use std::time::Duration;

use anyhow::{Context, Result};
use dotenv::dotenv;
use signal_engine::exchange::KrakenConfig;

/// Log output format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogFormat {
    Pretty,
    Json,
}

impl FromStr for LogFormat {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_lowercase().as_str() {
            "pretty" | "text" => Ok(Self::Pretty),
            "json" => Ok(Self::Json),
            other => anyhow::bail!("unknown log format '{}' (expected pretty or json)", other),
        }
    }
}

pub struct Config {
    pub kraken_api_url: String,
    pub kraken_api_key: Option<String>,
    pub kraken_api_secret: Option<String>,
    pub ohlc_interval_minutes: u32,
    pub http_timeout: Duration,
    /// Trade against the in-memory paper broker instead of the account
    pub dry_run: bool,
    pub paper_holding: f64,
    /// JSON params overrides applied on top of the defaults
    pub params_file: Option<String>,
    pub log_format: LogFormat,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        dotenv().ok();
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    fn from_lookup(var: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let non_empty = |name: &str| var(name).filter(|v| !v.trim().is_empty());

        Ok(Config {
            kraken_api_url: var("KRAKEN_API_URL")
                .unwrap_or_else(|| "https://api.kraken.com".to_string()),
            kraken_api_key: non_empty("KRAKEN_API_KEY"),
            kraken_api_secret: non_empty("KRAKEN_API_SECRET"),
            ohlc_interval_minutes: parsed(&var, "KRAKEN_OHLC_INTERVAL", 1)?,
            http_timeout: Duration::from_secs(parsed(&var, "HTTP_TIMEOUT_SECS", 10)?),
            dry_run: parsed(&var, "DRY_RUN", true)?,
            paper_holding: parsed(&var, "PAPER_HOLDING", 100.0)?,
            params_file: non_empty("PARAMS_FILE"),
            log_format: parsed(&var, "LOG_FORMAT", LogFormat::Pretty)?,
        })
    }

    pub fn has_credentials(&self) -> bool {
        self.kraken_api_key.is_some() && self.kraken_api_secret.is_some()
    }

    pub fn kraken(&self) -> KrakenConfig {
        KrakenConfig {
            api_url: self.kraken_api_url.clone(),
            api_key: self.kraken_api_key.clone(),
            api_secret: self.kraken_api_secret.clone(),
            ohlc_interval_minutes: self.ohlc_interval_minutes,
            timeout: self.http_timeout,
        }
    }
}

fn parsed<T>(var: &impl Fn(&str) -> Option<String>, name: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match var(name) {
        Some(raw) if !raw.trim().is_empty() => raw
            .trim()
            .parse()
            .map_err(|e| anyhow::anyhow!("{}", e))
            .with_context(|| format!("invalid {}='{}'", name, raw)),
        _ => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |name| map.get(name).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = Config::from_lookup(lookup(&[])).unwrap();

        assert_eq!(config.kraken_api_url, "https://api.kraken.com");
        assert_eq!(config.ohlc_interval_minutes, 1);
        assert_eq!(config.http_timeout, Duration::from_secs(10));
        assert!(config.dry_run);
        assert_eq!(config.paper_holding, 100.0);
        assert_eq!(config.log_format, LogFormat::Pretty);
        assert!(!config.has_credentials());
    }

    #[test]
    fn test_overrides() {
        let config = Config::from_lookup(lookup(&[
            ("KRAKEN_API_KEY", "key"),
            ("KRAKEN_API_SECRET", "c2VjcmV0"),
            ("KRAKEN_OHLC_INTERVAL", "5"),
            ("DRY_RUN", "false"),
            ("LOG_FORMAT", "JSON"),
            ("PARAMS_FILE", "params.json"),
        ]))
        .unwrap();

        assert!(config.has_credentials());
        assert!(!config.dry_run);
        assert_eq!(config.log_format, LogFormat::Json);
        assert_eq!(config.params_file.as_deref(), Some("params.json"));
        assert_eq!(config.kraken().ohlc_interval_minutes, 5);
    }

    #[test]
    fn test_blank_credentials_are_missing() {
        let config = Config::from_lookup(lookup(&[("KRAKEN_API_KEY", "  ")])).unwrap();
        assert!(config.kraken_api_key.is_none());
    }

    #[test]
    fn test_bad_number_is_reported() {
        let err = Config::from_lookup(lookup(&[("PAPER_HOLDING", "lots")]))
            .err()
            .unwrap();
        assert!(err.to_string().contains("PAPER_HOLDING"));
    }
}
