//! On-disk persistence for backfilled history.

pub mod snapshot;

pub use snapshot::{load_into_cache, SnapshotStore, SNAPSHOT_EXTENSION, SNAPSHOT_FORMAT_VERSION};
