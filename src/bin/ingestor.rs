//! Klinefeed Ingestor
//!
//! Warms the cache from snapshots, keeps every configured pair fresh on a
//! fixed cadence and serves the cache over HTTP until Ctrl-C.

use std::sync::Arc;

use dotenvy::dotenv;
use klinefeed::cache::{Cache, MemoryCache};
use klinefeed::config::Config;
use klinefeed::core::http::{start_server, AppState};
use klinefeed::core::live::LiveUpdater;
use klinefeed::core::scheduler::LiveScheduler;
use klinefeed::logging;
use klinefeed::metrics::Metrics;
use klinefeed::services::BinanceRestClient;
use klinefeed::signals::RsiThresholdHook;
use klinefeed::storage::{load_into_cache, SnapshotStore};
use tokio::signal;
use tokio::sync::oneshot;
use tracing::{error, info};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    logging::init_logging();

    let config = Config::from_env()?;
    let pairs = config.pairs();

    info!("Starting Klinefeed Ingestor");
    info!(environment = %config.environment, "Environment");
    info!(
        symbols = %config.symbols.join(","),
        intervals = %config.intervals.join(","),
        pairs = pairs.len(),
        "Tracking pairs"
    );

    let metrics = Arc::new(Metrics::new()?);
    let cache: Arc<dyn Cache> = Arc::new(MemoryCache::new());

    let store = SnapshotStore::new(&config.snapshot_dir);
    load_into_cache(&store, &pairs, cache.as_ref()).await;
    metrics.cached_series.set(cache.len() as i64);

    let client = BinanceRestClient::new(&config.base_url, config.http_timeout)?
        .with_limit(config.page_limit);
    let hook = RsiThresholdHook::new(config.rsi.clone()).with_cache(cache.clone());
    let updater = LiveUpdater::new(Arc::new(client), cache.clone(), pairs)
        .with_hook(Arc::new(hook))
        .with_request_delay(config.request_delay)
        .with_max_candles(config.live_max_candles)
        .with_metrics(metrics.clone());

    let scheduler = LiveScheduler::new(Arc::new(updater), config.cycle_interval)?;
    scheduler.start().await;

    let (shutdown_tx, shutdown_rx) = oneshot::channel::<()>();
    let state = AppState::new(metrics.clone(), cache.clone());
    let port = config.port;
    let mut server_handle = tokio::spawn(async move {
        let shutdown = async {
            let _ = shutdown_rx.await;
        };
        if let Err(e) = start_server(port, state, shutdown).await {
            error!(error = %e, "HTTP server error");
        }
    });

    info!("Ingestor started, waiting for shutdown signal...");
    let server_running = tokio::select! {
        _ = signal::ctrl_c() => {
            info!("Shutting down ingestor...");
            true
        }
        _ = &mut server_handle => {
            error!("HTTP server stopped");
            false
        }
    };

    scheduler.stop().await;
    let _ = shutdown_tx.send(());
    if server_running {
        let _ = server_handle.await;
    }
    info!("Ingestor stopped");

    Ok(())
}
