//! Process configuration loaded from environment variables.
//!
//! Binaries call `dotenvy::dotenv().ok()` first so a local `.env` file can
//! provide the same keys.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::error::ConfigError;
use crate::models::{is_supported_interval, Pair};
use crate::services::binance::{DEFAULT_KLINES_URL, DEFAULT_PAGE_LIMIT};

pub const DEFAULT_SYMBOLS: &[&str] = &["BTCUSDT", "ETHUSDT", "XRPUSDT"];
pub const DEFAULT_INTERVALS: &[&str] = &[
    "1m", "3m", "5m", "15m", "30m", "1h", "2h", "4h", "6h", "12h", "1d", "1w", "1M",
];

/// `APP_ENV`, defaulting to `sandbox`.
pub fn get_environment() -> String {
    env::var("APP_ENV").unwrap_or_else(|_| "sandbox".to_string())
}

#[derive(Debug, Clone, PartialEq)]
pub struct RsiConfig {
    pub period: u32,
    pub oversold: f64,
    pub overbought: f64,
}

impl Default for RsiConfig {
    fn default() -> Self {
        Self {
            period: 14,
            oversold: 30.0,
            overbought: 70.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Config {
    pub environment: String,
    pub base_url: String,
    pub symbols: Vec<String>,
    pub intervals: Vec<String>,
    /// Pause after each successful pair in a live cycle.
    pub request_delay: Duration,
    /// Ticker period of the live scheduler.
    pub cycle_interval: Duration,
    pub http_timeout: Duration,
    pub page_limit: u32,
    pub snapshot_dir: PathBuf,
    pub backfill_max_candles: usize,
    pub backfill_clean: bool,
    pub live_max_candles: usize,
    pub port: u16,
    pub rsi: RsiConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: "sandbox".to_string(),
            base_url: DEFAULT_KLINES_URL.to_string(),
            symbols: DEFAULT_SYMBOLS.iter().map(|s| s.to_string()).collect(),
            intervals: DEFAULT_INTERVALS.iter().map(|s| s.to_string()).collect(),
            request_delay: Duration::from_millis(500),
            cycle_interval: Duration::from_millis(1000),
            http_timeout: Duration::from_secs(5),
            page_limit: DEFAULT_PAGE_LIMIT,
            snapshot_dir: PathBuf::from("data"),
            backfill_max_candles: 50_000,
            backfill_clean: false,
            live_max_candles: 1000,
            port: 8080,
            rsi: RsiConfig::default(),
        }
    }
}

impl Config {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset keys keep their defaults.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let symbols = match get("SYMBOLS") {
            Some(raw) => parse_list("SYMBOLS", &raw)?,
            None => defaults.symbols,
        };
        let intervals = match get("INTERVALS") {
            Some(raw) => parse_list("INTERVALS", &raw)?,
            None => defaults.intervals,
        };
        if let Some(bad) = intervals.iter().find(|i| !is_supported_interval(i)) {
            return Err(ConfigError::Invalid {
                key: "INTERVALS",
                value: bad.clone(),
                reason: "unsupported kline interval".to_string(),
            });
        }

        let config = Self {
            environment: get("APP_ENV").unwrap_or(defaults.environment),
            base_url: get("BINANCE_BASE_URL").unwrap_or(defaults.base_url),
            symbols,
            intervals,
            request_delay: parse_millis(&get, "REQUEST_DELAY_MS", defaults.request_delay)?,
            cycle_interval: parse_millis(&get, "CYCLE_INTERVAL_MS", defaults.cycle_interval)?,
            http_timeout: Duration::from_secs(parse(
                &get,
                "HTTP_TIMEOUT_SECS",
                defaults.http_timeout.as_secs(),
            )?),
            page_limit: parse(&get, "PAGE_LIMIT", defaults.page_limit)?,
            snapshot_dir: get("SNAPSHOT_DIR")
                .map(PathBuf::from)
                .unwrap_or(defaults.snapshot_dir),
            backfill_max_candles: parse(
                &get,
                "BACKFILL_MAX_CANDLES",
                defaults.backfill_max_candles,
            )?,
            backfill_clean: parse(&get, "BACKFILL_CLEAN", defaults.backfill_clean)?,
            live_max_candles: parse(&get, "LIVE_MAX_CANDLES", defaults.live_max_candles)?,
            port: parse(&get, "PORT", defaults.port)?,
            rsi: RsiConfig {
                period: parse(&get, "RSI_PERIOD", defaults.rsi.period)?,
                oversold: parse(&get, "RSI_OVERSOLD", defaults.rsi.oversold)?,
                overbought: parse(&get, "RSI_OVERBOUGHT", defaults.rsi.overbought)?,
            },
        };

        if config.cycle_interval.is_zero() {
            return Err(ConfigError::Invalid {
                key: "CYCLE_INTERVAL_MS",
                value: "0".to_string(),
                reason: "must be greater than zero".to_string(),
            });
        }
        if config.page_limit < 2 {
            return Err(ConfigError::Invalid {
                key: "PAGE_LIMIT",
                value: config.page_limit.to_string(),
                reason: "pages must hold at least two candles to overlap".to_string(),
            });
        }
        Ok(config)
    }

    /// Every configured symbol crossed with every configured interval.
    pub fn pairs(&self) -> Vec<Pair> {
        Pair::cartesian(&self.symbols, &self.intervals)
    }
}

fn parse_list(key: &'static str, raw: &str) -> Result<Vec<String>, ConfigError> {
    let items: Vec<String> = raw
        .split(',')
        .map(|s| s.trim().to_string())
        .filter(|s| !s.is_empty())
        .collect();
    if items.is_empty() {
        return Err(ConfigError::Empty { key });
    }
    Ok(items)
}

fn parse<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw.trim().parse().map_err(|e: T::Err| ConfigError::Invalid {
            key,
            value: raw.clone(),
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}

fn parse_millis<G>(get: &G, key: &'static str, default: Duration) -> Result<Duration, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    parse(get, key, default.as_millis() as u64).map(Duration::from_millis)
}
