//! Shared fixtures: synthetic candles and an in-memory kline source.

#![allow(dead_code)]

use std::sync::Mutex;

use async_trait::async_trait;
use klinefeed::models::{Candle, Series};
use klinefeed::services::KlineSource;
use klinefeed::FetchError;
use serde_json::{json, Value};

pub const MINUTE_MS: i64 = 60_000;
pub const START_MS: i64 = 1_700_000_000_000;

/// `count` one-minute candles with a zig-zag close.
pub fn make_candles(count: usize) -> Vec<Candle> {
    make_candles_from(0, count)
}

/// Candles `first..first + count` of the same synthetic market.
pub fn make_candles_from(first: usize, count: usize) -> Vec<Candle> {
    (first..first + count)
        .map(|i| {
            let open_time = START_MS + i as i64 * MINUTE_MS;
            let close = 100.0 + (i % 7) as f64 - (i % 3) as f64 * 0.5;
            Candle::new(
                open_time,
                close - 0.25,
                close + 1.0,
                close - 1.0,
                close,
                10.0 + i as f64,
                open_time + MINUTE_MS - 1,
            )
        })
        .collect()
}

pub fn series_of(candles: &[Candle]) -> Series {
    Series::from_candles(candles.iter().copied()).expect("fixture candles are ordered")
}

/// Encode candles the way the exchange does: integer times, decimal strings.
pub fn raw_klines(candles: &[Candle]) -> Vec<u8> {
    let rows: Vec<Value> = candles
        .iter()
        .map(|c| {
            json!([
                c.open_time,
                c.open.to_string(),
                c.high.to_string(),
                c.low.to_string(),
                c.close.to_string(),
                c.volume.to_string(),
                c.close_time,
                "0",
                0,
                "0",
                "0",
                "0"
            ])
        })
        .collect();
    serde_json::to_vec(&rows).expect("encode klines")
}

/// Pages over a fixed history: the newest `limit` candles opening at or
/// before `end_time`, oldest first.
pub struct FakeSource {
    history: Vec<Candle>,
    limit: usize,
    failures_left: Mutex<u32>,
    successes_left: Mutex<Option<u32>>,
    calls: Mutex<Vec<Option<i64>>>,
}

impl FakeSource {
    pub fn new(history: Vec<Candle>) -> Self {
        Self {
            history,
            limit: 1000,
            failures_left: Mutex::new(0),
            successes_left: Mutex::new(None),
            calls: Mutex::new(Vec::new()),
        }
    }

    pub fn with_limit(mut self, limit: usize) -> Self {
        self.limit = limit;
        self
    }

    /// Fail the next `n` requests with a 500.
    pub fn failing_first(self, n: u32) -> Self {
        *self.failures_left.lock().unwrap() = n;
        self
    }

    /// Serve `n` requests, then fail every later one with a 500.
    pub fn failing_after(self, n: u32) -> Self {
        *self.successes_left.lock().unwrap() = Some(n);
        self
    }

    pub fn always_failing() -> Self {
        Self::new(Vec::new()).failing_first(u32::MAX)
    }

    /// `end_time` of every request received, in order.
    pub fn calls(&self) -> Vec<Option<i64>> {
        self.calls.lock().unwrap().clone()
    }

    pub fn page(&self, end_time: Option<i64>) -> Vec<Candle> {
        let eligible: Vec<Candle> = self
            .history
            .iter()
            .filter(|c| end_time.map_or(true, |end| c.open_time <= end))
            .copied()
            .collect();
        let start = eligible.len().saturating_sub(self.limit);
        eligible[start..].to_vec()
    }
}

#[async_trait]
impl KlineSource for FakeSource {
    async fn fetch_raw(
        &self,
        _symbol: &str,
        _interval: &str,
        end_time: Option<i64>,
    ) -> Result<Vec<u8>, FetchError> {
        self.calls.lock().unwrap().push(end_time);
        {
            let mut failures = self.failures_left.lock().unwrap();
            let mut successes = self.successes_left.lock().unwrap();
            let exhausted = match successes.as_mut() {
                Some(0) => true,
                Some(n) => {
                    *n -= 1;
                    false
                }
                None => false,
            };
            if *failures > 0 || exhausted {
                *failures = failures.saturating_sub(1);
                return Err(FetchError::Status {
                    status: 500,
                    body: "upstream unavailable".to_string(),
                });
            }
        }
        Ok(raw_klines(&self.page(end_time)))
    }
}
