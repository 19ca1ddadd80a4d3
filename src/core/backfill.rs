//! Backward-paging history reconciler.
//!
//! Pages are requested newest first. Each request asks for candles opening at
//! or before the oldest open time collected so far, so consecutive pages share
//! their boundary candle. Paging stops when the source hands back a page that
//! starts where the previous one did (no older history) or when the
//! accumulated series reaches the candle cap.

use std::path::PathBuf;
use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, error, info, warn};

use crate::core::retry::{RetryExecutor, RetryPolicy};
use crate::error::{IngestError, SnapshotError};
use crate::metrics::Metrics;
use crate::models::{Pair, Series};
use crate::services::KlineSource;
use crate::storage::SnapshotStore;

pub const BACKFILL_MAX_CANDLES: usize = 50_000;
pub const MAX_CONSECUTIVE_FAILURES: u32 = 3;

/// Where a pair's history ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SnapshotSummary {
    pub path: PathBuf,
    pub candles: usize,
}

#[derive(Debug)]
pub struct BackfillOutcome {
    pub pair: Pair,
    pub result: Result<SnapshotSummary, IngestError>,
}

pub struct Backfiller {
    source: Arc<dyn KlineSource>,
    retry: RetryExecutor,
    store: SnapshotStore,
    max_candles: usize,
    max_consecutive_failures: u32,
    metrics: Option<Arc<Metrics>>,
}

impl Backfiller {
    pub fn new(source: Arc<dyn KlineSource>, store: SnapshotStore) -> Self {
        Self {
            source,
            retry: RetryExecutor::new(RetryPolicy::backfill()),
            store,
            max_candles: BACKFILL_MAX_CANDLES,
            max_consecutive_failures: MAX_CONSECUTIVE_FAILURES,
            metrics: None,
        }
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = match &self.metrics {
            Some(metrics) => RetryExecutor::new(policy).with_metrics(metrics.clone()),
            None => RetryExecutor::new(policy),
        };
        self
    }

    pub fn with_max_candles(mut self, max_candles: usize) -> Self {
        self.max_candles = max_candles.max(1);
        self
    }

    pub fn with_max_consecutive_failures(mut self, failures: u32) -> Self {
        self.max_consecutive_failures = failures.max(1);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.retry = RetryExecutor::new(self.retry.policy()).with_metrics(metrics.clone());
        self.metrics = Some(metrics);
        self
    }

    pub fn store(&self) -> &SnapshotStore {
        &self.store
    }

    /// Page backward from the latest candle and return the merged history.
    ///
    /// An exhausted page fetch is logged and the same page is requested again.
    /// A run of `max_consecutive_failures` such failures ends paging: whatever
    /// was collected so far is returned, and a pair with nothing collected is
    /// abandoned.
    pub async fn collect(&self, pair: &Pair) -> Result<Series, IngestError> {
        let mut acc = Series::default();
        let mut last_open_time: Option<i64> = None;
        let mut failures = 0;

        while acc.len() < self.max_candles {
            let page = match self
                .retry
                .execute(self.source.as_ref(), pair, last_open_time)
                .await
            {
                Ok(page) => {
                    failures = 0;
                    page
                }
                Err(e) => {
                    failures += 1;
                    warn!(
                        symbol = %pair.symbol,
                        interval = %pair.interval,
                        end_time = ?last_open_time,
                        failures,
                        error = %e,
                        "backfill page failed"
                    );
                    if failures < self.max_consecutive_failures {
                        continue;
                    }
                    if acc.is_empty() {
                        return Err(IngestError::BackfillAbandoned {
                            key: pair.cache_key(),
                            failures,
                        });
                    }
                    warn!(
                        symbol = %pair.symbol,
                        interval = %pair.interval,
                        candles = acc.len(),
                        "backfill stopped early, keeping collected history"
                    );
                    break;
                }
            };

            let Some(first) = page.first_open_time() else {
                break;
            };
            if Some(first) == last_open_time {
                debug!(symbol = %pair.symbol, interval = %pair.interval, "reached start of history");
                break;
            }

            let (merged, overlap) = acc.prepend_older(&page);
            if !acc.is_empty() && overlap != 1 {
                warn!(
                    symbol = %pair.symbol,
                    interval = %pair.interval,
                    overlap,
                    "page boundary overlapped by an unexpected number of candles"
                );
            }
            if merged.len() == acc.len() {
                warn!(symbol = %pair.symbol, interval = %pair.interval, "page added no older candles");
                break;
            }

            acc = merged;
            last_open_time = Some(first);
            if let Some(metrics) = &self.metrics {
                metrics.backfill_pages_total.inc();
            }
            debug!(
                symbol = %pair.symbol,
                interval = %pair.interval,
                candles = acc.len(),
                oldest = first,
                "backfill page merged"
            );
        }

        Ok(acc)
    }

    /// Collect `pair` and persist it as a snapshot named with the current time.
    pub async fn backfill_pair(&self, pair: &Pair) -> Result<SnapshotSummary, IngestError> {
        let series = self.collect(pair).await?;
        let candles = series.len();
        let name = SnapshotStore::snapshot_name(pair, Utc::now());

        match self.store.write_async(name, Arc::new(series)).await {
            Ok(path) => {
                if let Some(metrics) = &self.metrics {
                    metrics.snapshot_writes_total.inc();
                }
                Ok(SnapshotSummary { path, candles })
            }
            Err(e) => {
                if let Some(metrics) = &self.metrics {
                    metrics.snapshot_failures_total.inc();
                }
                Err(e.into())
            }
        }
    }

    /// Backfill every pair in order. A failed pair is logged and abandoned;
    /// the rest still run.
    pub async fn run(&self, pairs: &[Pair]) -> Vec<BackfillOutcome> {
        let mut outcomes = Vec::with_capacity(pairs.len());
        for pair in pairs {
            info!(symbol = %pair.symbol, interval = %pair.interval, "collecting history");
            let result = self.backfill_pair(pair).await;
            match &result {
                Ok(summary) => info!(
                    symbol = %pair.symbol,
                    interval = %pair.interval,
                    candles = summary.candles,
                    path = %summary.path.display(),
                    "history saved"
                ),
                Err(IngestError::Snapshot(SnapshotError::EmptySeries { .. })) => warn!(
                    symbol = %pair.symbol,
                    interval = %pair.interval,
                    "no history collected"
                ),
                Err(e) => error!(
                    symbol = %pair.symbol,
                    interval = %pair.interval,
                    error = %e,
                    "backfill abandoned"
                ),
            }
            outcomes.push(BackfillOutcome {
                pair: pair.clone(),
                result,
            });
        }
        outcomes
    }
}
