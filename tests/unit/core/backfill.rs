//! Unit tests for the backfill reconciler

use std::sync::Arc;
use std::time::Duration;

use klinefeed::core::backfill::Backfiller;
use klinefeed::core::retry::RetryPolicy;
use klinefeed::metrics::Metrics;
use klinefeed::models::Pair;
use klinefeed::storage::SnapshotStore;
use klinefeed::IngestError;
use tempfile::TempDir;

use crate::common::{make_candles, series_of, FakeSource};

fn backfiller(source: Arc<FakeSource>, dir: &TempDir) -> Backfiller {
    Backfiller::new(source, SnapshotStore::new(dir.path()))
        .with_retry_policy(RetryPolicy::new(1, Duration::ZERO))
}

#[tokio::test]
async fn test_three_pages_stitch_without_duplicates() {
    let history = make_candles(2998);
    let source = Arc::new(FakeSource::new(history.clone()).with_limit(1000));
    let dir = TempDir::new().unwrap();

    let series = backfiller(source.clone(), &dir)
        .collect(&Pair::new("BTCUSDT", "1m"))
        .await
        .unwrap();

    // 1000 + 999 + 999: each older page loses its boundary candle.
    assert_eq!(series.len(), 2998);
    assert_eq!(series, series_of(&history));
    assert!(series.open_times().windows(2).all(|w| w[0] < w[1]));

    assert_eq!(
        source.calls(),
        vec![
            None,
            Some(history[1998].open_time),
            Some(history[999].open_time),
            Some(history[0].open_time),
        ]
    );
}

#[tokio::test]
async fn test_stops_when_source_repeats_first_open_time() {
    let history = make_candles(500);
    let source = Arc::new(FakeSource::new(history.clone()));
    let dir = TempDir::new().unwrap();

    let series = backfiller(source.clone(), &dir)
        .collect(&Pair::new("ETHUSDT", "1h"))
        .await
        .unwrap();

    assert_eq!(series.len(), 500);
    assert_eq!(source.calls(), vec![None, Some(history[0].open_time)]);
}

#[tokio::test]
async fn test_stops_at_candle_cap() {
    let source = Arc::new(FakeSource::new(make_candles(5000)).with_limit(1000));
    let dir = TempDir::new().unwrap();

    let series = backfiller(source.clone(), &dir)
        .with_max_candles(2500)
        .collect(&Pair::new("BTCUSDT", "1m"))
        .await
        .unwrap();

    assert_eq!(series.len(), 2998);
    assert_eq!(source.calls().len(), 3);
}

#[tokio::test]
async fn test_single_failed_page_is_retried() {
    let history = make_candles(2998);
    let source = Arc::new(FakeSource::new(history.clone()).failing_first(1));
    let dir = TempDir::new().unwrap();

    let series = backfiller(source.clone(), &dir)
        .collect(&Pair::new("BTCUSDT", "1m"))
        .await
        .unwrap();

    assert_eq!(series, series_of(&history));
    assert_eq!(source.calls()[0], None);
    assert_eq!(source.calls()[1], None);
}

#[tokio::test]
async fn test_abandons_after_consecutive_failures() {
    let source = Arc::new(FakeSource::always_failing());
    let dir = TempDir::new().unwrap();

    let err = backfiller(source.clone(), &dir)
        .with_max_consecutive_failures(3)
        .collect(&Pair::new("XRPUSDT", "1d"))
        .await
        .unwrap_err();

    assert!(matches!(
        err,
        IngestError::BackfillAbandoned { failures: 3, .. }
    ));
    assert_eq!(source.calls().len(), 3);
}

#[tokio::test]
async fn test_failures_after_progress_keep_collected_history() {
    let history = make_candles(2998);
    let source = Arc::new(FakeSource::new(history.clone()).failing_after(2));
    let dir = TempDir::new().unwrap();

    let backfiller = backfiller(source.clone(), &dir).with_max_consecutive_failures(3);
    let summary = backfiller
        .backfill_pair(&Pair::new("BTCUSDT", "1m"))
        .await
        .unwrap();

    // Two pages made it before the source went down: 1000 + 999.
    assert_eq!(summary.candles, 1999);
    assert_eq!(source.calls().len(), 5);
    let restored = backfiller.store().read(&summary.path).unwrap();
    assert_eq!(restored, series_of(&history[999..]));
}

#[tokio::test]
async fn test_backfill_pair_writes_one_snapshot() {
    let history = make_candles(2998);
    let source = Arc::new(FakeSource::new(history.clone()));
    let dir = TempDir::new().unwrap();
    let metrics = Arc::new(Metrics::new().unwrap());
    let pair = Pair::new("BTCUSDT", "1m");

    let backfiller = backfiller(source, &dir).with_metrics(metrics.clone());
    let summary = backfiller.backfill_pair(&pair).await.unwrap();

    assert_eq!(summary.candles, 2998);
    let files: Vec<_> = std::fs::read_dir(dir.path()).unwrap().collect();
    assert_eq!(files.len(), 1);

    let name = summary.path.file_name().unwrap().to_string_lossy().to_string();
    assert!(name.starts_with("BTCUSDT_1m_old_"), "unexpected name {name}");
    assert!(name.ends_with(".gz"));

    let restored = backfiller.store().read(&summary.path).unwrap();
    assert_eq!(restored, series_of(&history));
    assert_eq!(metrics.snapshot_writes_total.get(), 1);
    assert_eq!(metrics.backfill_pages_total.get(), 3);
}

#[tokio::test]
async fn test_run_reports_every_pair() {
    let source = Arc::new(FakeSource::new(make_candles(10)));
    let dir = TempDir::new().unwrap();
    let pairs = vec![Pair::new("BTCUSDT", "1m"), Pair::new("BTCUSDT", "5m")];

    let outcomes = backfiller(source, &dir).run(&pairs).await;

    assert_eq!(outcomes.len(), 2);
    assert_eq!(outcomes[0].pair, pairs[0]);
    assert_eq!(outcomes[1].pair, pairs[1]);
    assert!(outcomes.iter().all(|o| o.result.is_ok()));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 2);
}
