//! Error taxonomy for the ingestion pipeline.
//!
//! Transient fetch and decode failures are retried by the retry executor and
//! only surface to callers as [`IngestError::TooManyAttempts`]. Persistence
//! failures are reported as [`SnapshotError`]. A cache miss is never an error.

use thiserror::Error;

/// Structural violation inside a [`crate::Series`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SeriesError {
    #[error("column lengths differ: {open_time} open times vs {other} values")]
    LengthMismatch { open_time: usize, other: usize },
    #[error("candle {index}: open time {open_time} is not before close time {close_time}")]
    InvalidBar {
        index: usize,
        open_time: i64,
        close_time: i64,
    },
    #[error("candle {index}: open time {open_time} does not follow previous open time {previous}")]
    OutOfOrder {
        index: usize,
        previous: i64,
        open_time: i64,
    },
}

/// Failure turning a raw response body into a [`crate::Series`].
#[derive(Debug, Clone, PartialEq, Error)]
pub enum DecodeError {
    #[error("empty data")]
    EmptyData,
    #[error("malformed payload: {0}")]
    Malformed(String),
    #[error("row {row}: expected at least {expected} fields, found {found}")]
    RowTooShort {
        row: usize,
        expected: usize,
        found: usize,
    },
    #[error("row {row}: field `{field}` is not an integer")]
    BadInteger { row: usize, field: &'static str },
    #[error("row {row}: field `{field}` is not a decimal string: {value}")]
    BadDecimal {
        row: usize,
        field: &'static str,
        value: String,
    },
    #[error(transparent)]
    Invalid(#[from] SeriesError),
}

/// A single failed fetch attempt (transport, status or decode).
#[derive(Debug, Error)]
pub enum FetchError {
    #[error("parameters not provided")]
    MissingParameters,
    #[error("invalid request url: {0}")]
    Url(#[from] url::ParseError),
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("decode failed: {0}")]
    Decode(#[from] DecodeError),
    #[error("{0}")]
    Other(String),
}

/// Snapshot read/write failure.
#[derive(Debug, Error)]
pub enum SnapshotError {
    #[error("snapshot io error: {0}")]
    Io(#[from] std::io::Error),
    #[error("snapshot encoding error: {0}")]
    Encoding(#[from] bincode::Error),
    #[error("no snapshot found for {key}")]
    NotFound { key: String },
    #[error("snapshot holds an invalid series: {0}")]
    Corrupt(#[from] SeriesError),
    #[error("snapshot format version {found} is not supported (expected {expected})")]
    VersionMismatch { found: u32, expected: u32 },
    #[error("refusing to write an empty series to {name}")]
    EmptySeries { name: String },
    #[error("snapshot task failed: {0}")]
    Task(String),
}

/// Terminal outcome of an ingestion step for one (symbol, interval) pair.
#[derive(Debug, Error)]
pub enum IngestError {
    #[error("{key}: too many attempts ({attempts}), last error: {last_error}")]
    TooManyAttempts {
        key: String,
        attempts: u32,
        #[source]
        last_error: FetchError,
    },
    #[error("{key}: backfill abandoned after {failures} consecutive failed pages")]
    BackfillAbandoned { key: String, failures: u32 },
    #[error(transparent)]
    Snapshot(#[from] SnapshotError),
}

/// Invalid process configuration, only raised at startup.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ConfigError {
    #[error("{key} must not be empty")]
    Empty { key: &'static str },
    #[error("invalid value for {key}: {value} ({reason})")]
    Invalid {
        key: &'static str,
        value: String,
        reason: String,
    },
}
