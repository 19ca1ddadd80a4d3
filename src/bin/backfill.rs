//! Klinefeed Backfill
//!
//! One-shot job: pages every configured pair back through history and writes
//! one compressed snapshot per pair, then exits.

use std::sync::Arc;

use dotenvy::dotenv;
use klinefeed::config::Config;
use klinefeed::core::backfill::Backfiller;
use klinefeed::logging;
use klinefeed::metrics::Metrics;
use klinefeed::services::BinanceRestClient;
use klinefeed::storage::SnapshotStore;
use tracing::{info, warn};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenv().ok();
    logging::init_logging();

    let config = Config::from_env()?;
    let pairs = config.pairs();

    info!("Starting Klinefeed Backfill");
    info!(environment = %config.environment, "Environment");
    info!(
        dir = %config.snapshot_dir.display(),
        max_candles = config.backfill_max_candles,
        pairs = pairs.len(),
        "Snapshot settings"
    );

    let store = SnapshotStore::new(&config.snapshot_dir);
    if config.backfill_clean {
        let removed = store.clear()?;
        info!(removed, dir = %store.dir().display(), "Cleared snapshot directory");
    }

    let metrics = Arc::new(Metrics::new()?);
    let client = BinanceRestClient::new(&config.base_url, config.http_timeout)?
        .with_limit(config.page_limit);
    let backfiller = Backfiller::new(Arc::new(client), store)
        .with_max_candles(config.backfill_max_candles)
        .with_metrics(metrics);

    let outcomes = backfiller.run(&pairs).await;
    let failed = outcomes.iter().filter(|o| o.result.is_err()).count();
    if failed > 0 {
        warn!(failed, total = outcomes.len(), "Backfill finished with failures");
    } else {
        info!(total = outcomes.len(), "Backfill finished");
    }

    Ok(())
}
