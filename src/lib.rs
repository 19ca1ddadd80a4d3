//! Candlestick ingestion and reconciliation service.
//!
//! Pulls OHLCV pages from a remote market-data API, stitches them into
//! gap-free series, keeps the latest series in a shared cache and persists
//! long histories as compressed snapshots.

pub mod cache;
pub mod config;
pub mod core;
pub mod error;
pub mod indicators;
pub mod logging;
pub mod metrics;
pub mod models;
pub mod services;
pub mod signals;
pub mod storage;

pub use error::{ConfigError, DecodeError, FetchError, IngestError, SeriesError, SnapshotError};
pub use models::{Candle, Pair, Series};
