//! Unit tests for the snapshot store

use std::fs::File;
use std::io::Write;

use chrono::{TimeZone, Utc};
use flate2::write::GzEncoder;
use flate2::Compression;
use klinefeed::cache::{Cache, MemoryCache};
use klinefeed::models::{Pair, Series};
use klinefeed::storage::{load_into_cache, SnapshotStore};
use klinefeed::SnapshotError;
use tempfile::TempDir;

use crate::common::{make_candles, series_of};

fn name_at(pair: &Pair, unix: i64) -> String {
    SnapshotStore::snapshot_name(pair, Utc.timestamp_opt(unix, 0).single().unwrap())
}

#[test]
fn test_write_then_read_restores_series() {
    let dir = TempDir::new().unwrap();
    let store = SnapshotStore::new(dir.path());
    let series = series_of(&make_candles(1500));

    let path = store
        .write(&name_at(&Pair::new("BTCUSDT", "1m"), 1_700_000_000), &series)
        .unwrap();

    assert_eq!(
        path.file_name().unwrap().to_str().unwrap(),
        "BTCUSDT_1m_old_1700000000.gz"
    );
    let snapshot = store.read_snapshot(&path).unwrap();
    assert_eq!(snapshot.series, series);
    assert!(snapshot.captured_at.timestamp() > 0);
}

#[test]
fn test_write_creates_directory_and_leaves_no_temp_file() {
    let dir = TempDir::new().unwrap();
    let store = SnapshotStore::new(dir.path().join("nested").join("data"));

    store.write("BTCUSDT_1m_old_1", &series_of(&make_candles(3))).unwrap();

    let names: Vec<String> = std::fs::read_dir(store.dir())
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().to_string())
        .collect();
    assert_eq!(names, vec!["BTCUSDT_1m_old_1.gz"]);
}

#[test]
fn test_empty_series_is_not_written() {
    let dir = TempDir::new().unwrap();
    let store = SnapshotStore::new(dir.path());

    let err = store.write("BTCUSDT_1m_old_1", &Series::default()).unwrap_err();

    assert!(matches!(err, SnapshotError::EmptySeries { .. }));
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
}

#[test]
fn test_find_latest_picks_newest_capture() {
    let dir = TempDir::new().unwrap();
    let store = SnapshotStore::new(dir.path());
    let pair = Pair::new("BTCUSDT", "1m");

    store.write(&name_at(&pair, 1_600_000_000), &series_of(&make_candles(2))).unwrap();
    store.write(&name_at(&pair, 1_700_000_000), &series_of(&make_candles(3))).unwrap();
    store.write(&name_at(&pair, 999_999_999), &series_of(&make_candles(4))).unwrap();
    // Other pairs sharing a prefix must not match.
    store
        .write(&name_at(&Pair::new("BTCUSDT", "1mo"), 1_900_000_000), &series_of(&make_candles(5)))
        .unwrap();
    store
        .write(&name_at(&Pair::new("BTC", "1m"), 1_900_000_000), &series_of(&make_candles(6)))
        .unwrap();

    let latest = store.find_latest(&pair).unwrap();
    assert!(latest.ends_with("BTCUSDT_1m_old_1700000000.gz"));
    assert_eq!(store.read(&latest).unwrap().len(), 3);
}

#[test]
fn test_find_latest_without_match_is_not_found() {
    let dir = TempDir::new().unwrap();
    let store = SnapshotStore::new(dir.path());
    File::create(dir.path().join("BTCUSDT_1m_old_123.json")).unwrap();

    let err = store.find_latest(&Pair::new("BTCUSDT", "1m")).unwrap_err();
    assert!(matches!(err, SnapshotError::NotFound { .. }));
}

#[test]
fn test_unknown_format_version_is_rejected() {
    let dir = TempDir::new().unwrap();
    let store = SnapshotStore::new(dir.path());
    let path = dir.path().join("BTCUSDT_1m_old_1.gz");

    let mut encoder = GzEncoder::new(File::create(&path).unwrap(), Compression::default());
    bincode::serialize_into(&mut encoder, &99u32).unwrap();
    encoder.finish().unwrap().flush().unwrap();

    let err = store.read(&path).unwrap_err();
    assert!(matches!(
        err,
        SnapshotError::VersionMismatch { found: 99, expected: 1 }
    ));
}

#[test]
fn test_clear_removes_only_snapshots() {
    let dir = TempDir::new().unwrap();
    let store = SnapshotStore::new(dir.path());
    store.write("BTCUSDT_1m_old_1", &series_of(&make_candles(2))).unwrap();
    store.write("ETHUSDT_1h_old_1", &series_of(&make_candles(2))).unwrap();
    File::create(dir.path().join("notes.txt")).unwrap();

    assert_eq!(store.clear().unwrap(), 2);
    assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 1);
}

#[tokio::test]
async fn test_load_into_cache_uses_history_keys() {
    let dir = TempDir::new().unwrap();
    let store = SnapshotStore::new(dir.path());
    let btc = Pair::new("BTCUSDT", "1m");
    let eth = Pair::new("ETHUSDT", "1m");
    let history = series_of(&make_candles(50));
    store.write(&name_at(&btc, 1_700_000_000), &history).unwrap();

    let cache = MemoryCache::new();
    let loaded = load_into_cache(&store, &[btc, eth], &cache).await;

    assert_eq!(loaded, 1);
    assert_eq!(*cache.get_series("BTCUSDT_1m_old").unwrap(), history);
    assert!(!cache.exists("BTCUSDT_1m"));
    assert!(!cache.exists("ETHUSDT_1m_old"));
}

#[tokio::test]
async fn test_unreadable_snapshot_is_skipped() {
    let dir = TempDir::new().unwrap();
    let store = SnapshotStore::new(dir.path());
    std::fs::write(dir.path().join("BTCUSDT_1m_old_1.gz"), b"not gzip").unwrap();

    let cache = MemoryCache::new();
    let loaded = load_into_cache(&store, &[Pair::new("BTCUSDT", "1m")], &cache).await;

    assert_eq!(loaded, 0);
    assert!(cache.is_empty());
}
