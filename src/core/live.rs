//! Steady-state live updater: one sequential pass over every pair per cycle.

use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, info, warn};

use crate::cache::{Cache, CacheValue};
use crate::core::retry::{RetryExecutor, RetryPolicy};
use crate::error::IngestError;
use crate::metrics::Metrics;
use crate::models::{Pair, Series};
use crate::services::KlineSource;
use crate::signals::{IndicatorHook, NoopHook};

pub const LIVE_MAX_CANDLES: usize = 1000;

/// Outcome of one [`LiveUpdater::run_cycle`] pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub updated: usize,
    pub skipped: usize,
}

pub struct LiveUpdater {
    source: Arc<dyn KlineSource>,
    cache: Arc<dyn Cache>,
    hook: Arc<dyn IndicatorHook>,
    retry: RetryExecutor,
    pairs: Vec<Pair>,
    request_delay: Duration,
    max_candles: usize,
    metrics: Option<Arc<Metrics>>,
}

impl LiveUpdater {
    pub fn new(source: Arc<dyn KlineSource>, cache: Arc<dyn Cache>, pairs: Vec<Pair>) -> Self {
        Self {
            source,
            cache,
            hook: Arc::new(NoopHook),
            retry: RetryExecutor::new(RetryPolicy::live()),
            pairs,
            request_delay: Duration::from_millis(500),
            max_candles: LIVE_MAX_CANDLES,
            metrics: None,
        }
    }

    pub fn with_hook(mut self, hook: Arc<dyn IndicatorHook>) -> Self {
        self.hook = hook;
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.retry = RetryExecutor::new(policy);
        if let Some(metrics) = &self.metrics {
            self.retry = self.retry.with_metrics(metrics.clone());
        }
        self
    }

    pub fn with_request_delay(mut self, delay: Duration) -> Self {
        self.request_delay = delay;
        self
    }

    pub fn with_max_candles(mut self, max_candles: usize) -> Self {
        self.max_candles = max_candles.max(1);
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.retry = RetryExecutor::new(self.retry.policy()).with_metrics(metrics.clone());
        self.metrics = Some(metrics);
        self
    }

    pub fn pairs(&self) -> &[Pair] {
        &self.pairs
    }

    /// Refresh every pair once, strictly in order.
    ///
    /// A pair whose fetch exhausts its retries is skipped for this cycle and
    /// leaves its cache entry untouched. The request delay is only observed
    /// after a successful pair.
    pub async fn run_cycle(&self) -> CycleReport {
        let mut report = CycleReport::default();

        for pair in &self.pairs {
            match self.update_pair(pair).await {
                Ok(series) => {
                    report.updated += 1;
                    debug!(
                        symbol = %pair.symbol,
                        interval = %pair.interval,
                        candles = series.len(),
                        "live series updated"
                    );
                    if !self.request_delay.is_zero() {
                        tokio::time::sleep(self.request_delay).await;
                    }
                }
                Err(e) => {
                    report.skipped += 1;
                    warn!(
                        symbol = %pair.symbol,
                        interval = %pair.interval,
                        error = %e,
                        "skipping pair for this cycle"
                    );
                }
            }
        }

        if let Some(metrics) = &self.metrics {
            metrics.live_cycles_total.inc();
            metrics.live_pairs_updated_total.inc_by(report.updated as u64);
            metrics.live_pairs_skipped_total.inc_by(report.skipped as u64);
            metrics.cached_series.set(self.cache.len() as i64);
        }

        info!(
            updated = report.updated,
            skipped = report.skipped,
            "live cycle complete"
        );
        report
    }

    /// Fetch the latest page for `pair`, run the indicator hook on it, merge
    /// it over the cached entry and replace the entry.
    ///
    /// A cached entry that no longer reaches the page (the pair was skipped for
    /// too long) is replaced by the page instead of being joined across the hole.
    pub async fn update_pair(&self, pair: &Pair) -> Result<Arc<Series>, IngestError> {
        let page = self.retry.execute(self.source.as_ref(), pair, None).await?;
        self.hook.on_series(pair, &page);

        let key = pair.cache_key();
        let merged = match self.cache.get_series(&key) {
            Some(existing) => existing.merge_newer(&page),
            None => page,
        };
        let series = Arc::new(if merged.len() > self.max_candles {
            merged.tail(self.max_candles)
        } else {
            merged
        });

        self.cache.set(&key, CacheValue::Series(series.clone()));

        if let Some(metrics) = &self.metrics {
            metrics.cache_writes_total.inc();
        }
        Ok(series)
    }
}
