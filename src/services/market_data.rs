//! Market data source abstraction.

use async_trait::async_trait;

use crate::error::FetchError;
use crate::models::Series;
use crate::services::binance::decode_klines;

/// A paginated kline source.
///
/// `end_time = None` asks for the most recent page; `Some(ms)` asks for the
/// page whose newest candle opens at or before `ms`.
#[async_trait]
pub trait KlineSource: Send + Sync {
    /// One request, returning the raw response body.
    async fn fetch_raw(
        &self,
        symbol: &str,
        interval: &str,
        end_time: Option<i64>,
    ) -> Result<Vec<u8>, FetchError>;

    /// One request decoded into a series.
    async fn fetch_page(
        &self,
        symbol: &str,
        interval: &str,
        end_time: Option<i64>,
    ) -> Result<Series, FetchError> {
        let raw = self.fetch_raw(symbol, interval, end_time).await?;
        Ok(decode_klines(&raw)?)
    }
}
