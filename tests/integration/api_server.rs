//! Integration tests for the read API
//!
//! Tests health checks, metrics, and the cache-backed candle and signal routes.

use std::sync::Arc;

use chrono::Utc;
use klinefeed::cache::CacheValue;
use klinefeed::models::{IndicatorReading, RsiIndicator, Series};
use serde_json::Value;

use crate::test_utils::{make_candles, TestApiServer};

fn series(count: usize) -> Series {
    Series::from_candles(make_candles(count)).unwrap()
}

#[tokio::test]
async fn test_health_endpoint_reports_healthy_status() {
    let app = TestApiServer::new();
    let response = app.server.get("/health").await;
    assert_eq!(response.status_code(), 200);

    let body: Value = response.json();
    assert_eq!(body["status"], "healthy");
    assert!(body["uptime_seconds"].as_u64().is_some());
    assert_eq!(body["cached_entries"], 0);
    assert_eq!(body["service"], "klinefeed");
}

#[tokio::test]
async fn test_metrics_endpoint_exposes_prometheus_metrics() {
    let app = TestApiServer::new();
    let _ = app.server.get("/health").await;

    let response = app.server.get("/metrics").await;
    assert_eq!(response.status_code(), 200);

    let body = response.text();
    for metric in [
        "http_requests_total",
        "http_request_duration_seconds",
        "http_requests_in_flight",
        "fetch_attempts_total",
        "live_cycles_total",
        "snapshot_writes_total",
    ] {
        assert!(body.contains(metric), "Expected {metric} metric");
    }
}

#[tokio::test]
async fn test_metrics_endpoint_tracks_request_count() {
    let app = TestApiServer::new();
    for _ in 0..3 {
        let _ = app.server.get("/health").await;
    }
    assert_eq!(app.metrics.http_requests_total.get(), 3);
}

#[tokio::test]
async fn test_candles_endpoint_returns_cached_series() {
    let app = TestApiServer::new();
    app.cache.set("BTCUSDT_1m", CacheValue::from(series(5)));

    let response = app.server.get("/api/candles/BTCUSDT/1m").await;
    assert_eq!(response.status_code(), 200);

    let body: Value = response.json();
    assert_eq!(body["symbol"], "BTCUSDT");
    assert_eq!(body["interval"], "1m");
    assert_eq!(body["count"], 5);
    let candles = body["candles"].as_array().unwrap();
    assert_eq!(candles.len(), 5);
    assert_eq!(candles[0]["open_time"], make_candles(1)[0].open_time);
    assert!(candles[4]["close"].as_f64().is_some());
}

#[tokio::test]
async fn test_candles_endpoint_returns_404_on_miss() {
    let app = TestApiServer::new();
    let response = app.server.get("/api/candles/ETHUSDT/1m").await;
    assert_eq!(response.status_code(), 404);
}

#[tokio::test]
async fn test_history_endpoint_reads_snapshot_key() {
    let app = TestApiServer::new();
    app.cache.set("BTCUSDT_1m", CacheValue::from(series(5)));
    app.cache.set("BTCUSDT_1m_old", CacheValue::from(series(40)));

    let response = app.server.get("/api/candles/BTCUSDT/1m/history").await;
    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["count"], 40);

    let missing = app.server.get("/api/candles/XRPUSDT/1m/history").await;
    assert_eq!(missing.status_code(), 404);
}

#[tokio::test]
async fn test_signals_endpoint_returns_latest_reading() {
    let app = TestApiServer::new();
    let reading = IndicatorReading {
        symbol: "BTCUSDT".to_string(),
        interval: "1m".to_string(),
        rsi: RsiIndicator {
            value: 27.5,
            period: Some(14),
        },
        bar_open_time: 1_700_000_000_000,
        computed_at: Utc::now(),
    };
    app.cache
        .set("BTCUSDT_1m_rsi", CacheValue::Indicator(Arc::new(reading)));

    let response = app.server.get("/api/signals/BTCUSDT/1m").await;
    assert_eq!(response.status_code(), 200);
    let body: Value = response.json();
    assert_eq!(body["rsi"]["value"], 27.5);
    assert_eq!(body["rsi"]["period"], 14);

    let missing = app.server.get("/api/signals/BTCUSDT/5m").await;
    assert_eq!(missing.status_code(), 404);
}

#[tokio::test]
async fn test_signals_endpoint_ignores_series_payloads() {
    let app = TestApiServer::new();
    app.cache.set("BTCUSDT_1m_rsi", CacheValue::from(series(3)));

    let response = app.server.get("/api/signals/BTCUSDT/1m").await;
    assert_eq!(response.status_code(), 404);
}
