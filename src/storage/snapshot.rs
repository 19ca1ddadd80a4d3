//! Gzip-compressed bincode snapshots of a [`Series`].
//!
//! A snapshot file is a gzip stream holding the format version followed by the
//! capture time and the series. Files are named
//! `<symbol>_<interval>_old_<unix seconds>.gz` and written to a `.tmp` sibling
//! before being renamed into place, so a reader never sees a partial file.

use std::fs::{self, File};
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;

use chrono::{DateTime, TimeZone, Utc};
use flate2::read::GzDecoder;
use flate2::write::GzEncoder;
use flate2::Compression;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::cache::{Cache, CacheValue};
use crate::error::SnapshotError;
use crate::models::{Pair, Series};

pub const SNAPSHOT_EXTENSION: &str = "gz";
pub const SNAPSHOT_FORMAT_VERSION: u32 = 1;

const TMP_SUFFIX: &str = ".tmp";

#[derive(Serialize)]
struct SnapshotBodyRef<'a> {
    captured_at_ms: i64,
    series: &'a Series,
}

#[derive(Deserialize)]
struct SnapshotBody {
    captured_at_ms: i64,
    series: Series,
}

/// A snapshot read back from disk.
#[derive(Debug, Clone, PartialEq)]
pub struct Snapshot {
    pub captured_at: DateTime<Utc>,
    pub series: Series,
}

#[derive(Debug, Clone)]
pub struct SnapshotStore {
    dir: PathBuf,
}

impl SnapshotStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// `<symbol>_<interval>_old_<unix seconds>`
    pub fn snapshot_name(pair: &Pair, captured_at: DateTime<Utc>) -> String {
        format!("{}_{}", pair.history_key(), captured_at.timestamp())
    }

    pub fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.{SNAPSHOT_EXTENSION}"))
    }

    /// Compress and write `series` as `<dir>/<name>.gz`, replacing any
    /// existing file of that name.
    pub fn write(&self, name: &str, series: &Series) -> Result<PathBuf, SnapshotError> {
        if series.is_empty() {
            return Err(SnapshotError::EmptySeries {
                name: name.to_string(),
            });
        }
        fs::create_dir_all(&self.dir)?;

        let path = self.path_for(name);
        let tmp = self.dir.join(format!("{name}.{SNAPSHOT_EXTENSION}{TMP_SUFFIX}"));

        if let Err(e) = write_compressed(&tmp, series) {
            let _ = fs::remove_file(&tmp);
            return Err(e);
        }
        fs::rename(&tmp, &path)?;

        debug!(path = %path.display(), candles = series.len(), "snapshot written");
        Ok(path)
    }

    pub fn read(&self, path: impl AsRef<Path>) -> Result<Series, SnapshotError> {
        Ok(self.read_snapshot(path)?.series)
    }

    pub fn read_snapshot(&self, path: impl AsRef<Path>) -> Result<Snapshot, SnapshotError> {
        let file = File::open(path.as_ref())?;
        let mut decoder = GzDecoder::new(BufReader::new(file));

        let version: u32 = bincode::deserialize_from(&mut decoder)?;
        if version != SNAPSHOT_FORMAT_VERSION {
            return Err(SnapshotError::VersionMismatch {
                found: version,
                expected: SNAPSHOT_FORMAT_VERSION,
            });
        }
        let body: SnapshotBody = bincode::deserialize_from(&mut decoder)?;
        body.series.validate()?;

        Ok(Snapshot {
            captured_at: Utc
                .timestamp_millis_opt(body.captured_at_ms)
                .single()
                .unwrap_or_default(),
            series: body.series,
        })
    }

    /// Newest snapshot for `pair`, judged by the capture time in its name.
    pub fn find_latest(&self, pair: &Pair) -> Result<PathBuf, SnapshotError> {
        let not_found = || SnapshotError::NotFound {
            key: pair.history_key(),
        };
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Err(not_found()),
            Err(e) => return Err(e.into()),
        };

        let prefix = format!("{}_", pair.history_key());
        let extension = format!(".{SNAPSHOT_EXTENSION}");

        entries
            .filter_map(Result::ok)
            .filter_map(|entry| {
                let name = entry.file_name().into_string().ok()?;
                let captured = name
                    .strip_suffix(extension.as_str())?
                    .strip_prefix(prefix.as_str())?
                    .parse::<i64>()
                    .ok()?;
                Some((captured, entry.path()))
            })
            .max_by_key(|(captured, _)| *captured)
            .map(|(_, path)| path)
            .ok_or_else(not_found)
    }

    /// Remove every snapshot (and leftover temp file) in the directory.
    /// Returns how many files were deleted.
    pub fn clear(&self) -> Result<usize, SnapshotError> {
        let entries = match fs::read_dir(&self.dir) {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(0),
            Err(e) => return Err(e.into()),
        };

        let extension = format!(".{SNAPSHOT_EXTENSION}");
        let temp_extension = format!(".{SNAPSHOT_EXTENSION}{TMP_SUFFIX}");
        let mut removed = 0;
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name();
            let name = name.to_string_lossy();
            if name.ends_with(&extension) || name.ends_with(&temp_extension) {
                fs::remove_file(entry.path())?;
                removed += 1;
            }
        }
        info!(dir = %self.dir.display(), removed, "snapshot directory cleared");
        Ok(removed)
    }

    /// [`SnapshotStore::write`] on the blocking pool.
    pub async fn write_async(
        &self,
        name: String,
        series: Arc<Series>,
    ) -> Result<PathBuf, SnapshotError> {
        let store = self.clone();
        tokio::task::spawn_blocking(move || store.write(&name, &series))
            .await
            .map_err(|e| SnapshotError::Task(e.to_string()))?
    }

    /// [`SnapshotStore::read`] on the blocking pool.
    pub async fn read_async(&self, path: PathBuf) -> Result<Series, SnapshotError> {
        let store = self.clone();
        tokio::task::spawn_blocking(move || store.read(path))
            .await
            .map_err(|e| SnapshotError::Task(e.to_string()))?
    }
}

fn write_compressed(path: &Path, series: &Series) -> Result<(), SnapshotError> {
    let file = File::create(path)?;
    let mut encoder = GzEncoder::new(BufWriter::new(file), Compression::best());

    bincode::serialize_into(&mut encoder, &SNAPSHOT_FORMAT_VERSION)?;
    bincode::serialize_into(
        &mut encoder,
        &SnapshotBodyRef {
            captured_at_ms: Utc::now().timestamp_millis(),
            series,
        },
    )?;

    let mut writer = encoder.finish()?;
    writer.flush()?;
    writer.get_ref().sync_all()?;
    Ok(())
}

/// Warm `cache` with the newest snapshot of every pair, stored under
/// [`Pair::history_key`]. Pairs without a readable snapshot are skipped.
/// Returns how many entries were loaded.
pub async fn load_into_cache(store: &SnapshotStore, pairs: &[Pair], cache: &dyn Cache) -> usize {
    let mut loaded = 0;
    for pair in pairs {
        let path = match store.find_latest(pair) {
            Ok(path) => path,
            Err(e) => {
                debug!(symbol = %pair.symbol, interval = %pair.interval, error = %e, "no snapshot to load");
                continue;
            }
        };
        match store.read_async(path.clone()).await {
            Ok(series) => {
                debug!(
                    symbol = %pair.symbol,
                    interval = %pair.interval,
                    path = %path.display(),
                    candles = series.len(),
                    "snapshot loaded"
                );
                cache.set(&pair.history_key(), CacheValue::from(series));
                loaded += 1;
            }
            Err(e) => {
                warn!(
                    symbol = %pair.symbol,
                    interval = %pair.interval,
                    path = %path.display(),
                    error = %e,
                    "failed to read snapshot"
                );
            }
        }
    }
    info!(loaded, pairs = pairs.len(), "cache warmed from snapshots");
    loaded
}
