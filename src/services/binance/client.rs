//! Binance spot REST kline client

use std::time::Duration;

use async_trait::async_trait;
use tracing::trace;
use url::Url;

use crate::error::FetchError;
use crate::services::market_data::KlineSource;

pub const DEFAULT_KLINES_URL: &str = "https://api.binance.com/api/v3/klines";
pub const DEFAULT_PAGE_LIMIT: u32 = 1000;
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

const MAX_ERROR_BODY: usize = 256;

#[derive(Debug, Clone)]
pub struct BinanceRestClient {
    base_url: String,
    client: reqwest::Client,
    limit: u32,
}

impl BinanceRestClient {
    /// Client with its own connection pool and a per-request timeout.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, FetchError> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self::with_client(base_url, client))
    }

    pub fn with_client(base_url: impl Into<String>, client: reqwest::Client) -> Self {
        Self {
            base_url: base_url.into(),
            client,
            limit: DEFAULT_PAGE_LIMIT,
        }
    }

    pub fn with_limit(mut self, limit: u32) -> Self {
        self.limit = limit;
        self
    }

    /// `<base>?symbol=..&interval=..[&endTime=..]&limit=..`
    pub fn klines_url(
        &self,
        symbol: &str,
        interval: &str,
        end_time: Option<i64>,
    ) -> Result<Url, FetchError> {
        if symbol.is_empty() || interval.is_empty() {
            return Err(FetchError::MissingParameters);
        }
        let mut params = vec![
            ("symbol", symbol.to_string()),
            ("interval", interval.to_string()),
        ];
        if let Some(end_time) = end_time {
            params.push(("endTime", end_time.to_string()));
        }
        params.push(("limit", self.limit.to_string()));
        Ok(Url::parse_with_params(&self.base_url, &params)?)
    }
}

#[async_trait]
impl KlineSource for BinanceRestClient {
    async fn fetch_raw(
        &self,
        symbol: &str,
        interval: &str,
        end_time: Option<i64>,
    ) -> Result<Vec<u8>, FetchError> {
        let url = self.klines_url(symbol, interval, end_time)?;
        trace!(url = %url, "GET klines");

        let response = self.client.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let body = body.chars().take(MAX_ERROR_BODY).collect();
            return Err(FetchError::Status {
                status: status.as_u16(),
                body,
            });
        }
        Ok(response.bytes().await?.to_vec())
    }
}
