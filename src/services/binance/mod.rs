//! Binance spot kline integration.

pub mod client;
pub mod decoder;

pub use client::{BinanceRestClient, DEFAULT_KLINES_URL, DEFAULT_PAGE_LIMIT, DEFAULT_TIMEOUT};
pub use decoder::decode_klines;
