//! Read API over the shared cache, using Axum

use axum::{
    extract::{Path, Request, State},
    http::StatusCode,
    middleware::Next,
    response::{Json, Response},
    routing::get,
    Router,
};
use serde::Serialize;
use serde_json::{json, Value};
use std::future::Future;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::RwLock;
use tower::ServiceBuilder;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnRequest, DefaultOnResponse, TraceLayer},
};
use tracing::{info, Level};

use crate::cache::Cache;
use crate::metrics::Metrics;
use crate::models::{Candle, IndicatorReading, Pair, Series};

#[derive(Clone)]
pub struct AppState {
    pub health: Arc<RwLock<HealthStatus>>,
    pub metrics: Arc<Metrics>,
    pub start_time: Arc<Instant>,
    pub cache: Arc<dyn Cache>,
}

impl AppState {
    pub fn new(metrics: Arc<Metrics>, cache: Arc<dyn Cache>) -> Self {
        Self {
            health: Arc::new(RwLock::new(HealthStatus::default())),
            metrics,
            start_time: Arc::new(Instant::now()),
            cache,
        }
    }
}

#[derive(Clone, Debug)]
pub struct HealthStatus {
    pub status: String,
}

impl Default for HealthStatus {
    fn default() -> Self {
        Self {
            status: "healthy".to_string(),
        }
    }
}

pub async fn health_check(State(state): State<AppState>) -> Result<Json<Value>, StatusCode> {
    let health = state.health.read().await;
    let uptime_seconds = state.start_time.elapsed().as_secs();
    Ok(Json(json!({
        "status": health.status,
        "uptime_seconds": uptime_seconds,
        "cached_entries": state.cache.len(),
        "service": "klinefeed"
    })))
}

pub async fn metrics_handler(State(state): State<AppState>) -> Result<String, StatusCode> {
    state
        .metrics
        .export()
        .map_err(|_| StatusCode::INTERNAL_SERVER_ERROR)
}

/// Middleware to track HTTP request metrics
async fn metrics_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let start = Instant::now();
    let method = request.method().clone();
    let path = request.uri().path().to_string();

    state.metrics.http_requests_in_flight.inc();
    let response = next.run(request).await;
    let status = response.status();
    let duration = start.elapsed();
    state.metrics.http_requests_in_flight.dec();

    state.metrics.http_requests_total.inc();
    state
        .metrics
        .http_request_duration_seconds
        .observe(duration.as_secs_f64());

    if status.is_server_error() {
        tracing::error!(
            method = %method,
            path = %path,
            status = %status,
            duration_ms = duration.as_millis(),
            "HTTP request error"
        );
    }

    response
}

#[derive(Debug, Serialize)]
struct SeriesResponse {
    symbol: String,
    interval: String,
    count: usize,
    candles: Vec<Candle>,
}

impl SeriesResponse {
    fn new(pair: Pair, series: &Series) -> Self {
        let candles: Vec<Candle> = series.iter().collect();
        Self {
            symbol: pair.symbol,
            interval: pair.interval,
            count: candles.len(),
            candles,
        }
    }
}

/// Latest live series for a pair
async fn get_candles(
    State(state): State<AppState>,
    Path((symbol, interval)): Path<(String, String)>,
) -> Result<Json<SeriesResponse>, StatusCode> {
    let pair = Pair::new(symbol, interval);
    let series = state
        .cache
        .get_series(&pair.cache_key())
        .ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(SeriesResponse::new(pair, &series)))
}

/// Snapshot history loaded at startup
async fn get_history(
    State(state): State<AppState>,
    Path((symbol, interval)): Path<(String, String)>,
) -> Result<Json<SeriesResponse>, StatusCode> {
    let pair = Pair::new(symbol, interval);
    let series = state
        .cache
        .get_series(&pair.history_key())
        .ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(SeriesResponse::new(pair, &series)))
}

/// Latest RSI reading for a pair
async fn get_signal(
    State(state): State<AppState>,
    Path((symbol, interval)): Path<(String, String)>,
) -> Result<Json<IndicatorReading>, StatusCode> {
    let pair = Pair::new(symbol, interval);
    let reading = state
        .cache
        .get_indicator(&pair.rsi_key())
        .ok_or(StatusCode::NOT_FOUND)?;
    Ok(Json(reading.as_ref().clone()))
}

pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/health", get(health_check))
        .route("/metrics", get(metrics_handler))
        .route("/api/candles/{symbol}/{interval}", get(get_candles))
        .route("/api/candles/{symbol}/{interval}/history", get(get_history))
        .route("/api/signals/{symbol}/{interval}", get(get_signal))
        .layer(
            ServiceBuilder::new()
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(DefaultMakeSpan::new().level(Level::DEBUG))
                        .on_request(DefaultOnRequest::new().level(Level::DEBUG))
                        .on_response(DefaultOnResponse::new().level(Level::DEBUG)),
                )
                .layer(axum::middleware::from_fn_with_state(
                    state.clone(),
                    metrics_middleware,
                ))
                .layer(CorsLayer::permissive()),
        )
        .with_state(state)
}

/// Serve the read API until `shutdown` resolves.
pub async fn start_server<F>(
    port: u16,
    state: AppState,
    shutdown: F,
) -> Result<(), Box<dyn std::error::Error + Send + Sync>>
where
    F: Future<Output = ()> + Send + 'static,
{
    let app = create_router(state);
    let listener = tokio::net::TcpListener::bind(format!("0.0.0.0:{}", port)).await?;

    info!(port = port, "HTTP server listening on port {}", port);
    info!(
        "Metrics endpoint available at http://0.0.0.0:{}/metrics",
        port
    );
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown)
        .await?;

    Ok(())
}
