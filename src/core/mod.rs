//! Ingestion engine: retry, backfill, live updates, scheduling and the read API

pub mod backfill;
pub mod http;
pub mod live;
pub mod retry;
pub mod scheduler;

pub use backfill::{Backfiller, BackfillOutcome, SnapshotSummary};
pub use http::{create_router, start_server, AppState};
pub use live::{CycleReport, LiveUpdater};
pub use retry::{RetryExecutor, RetryPolicy};
pub use scheduler::LiveScheduler;
