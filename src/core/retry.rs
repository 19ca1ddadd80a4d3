//! Bounded retry with linear backoff around a kline fetch.

use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::time::{sleep, Instant};
use tracing::{debug, warn};

use crate::error::{FetchError, IngestError};
use crate::metrics::Metrics;
use crate::models::{Pair, Series};
use crate::services::KlineSource;

/// Attempt budget and base delay. The pause after attempt `n` is `n * base_delay`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
}

impl RetryPolicy {
    pub const LIVE_MAX_ATTEMPTS: u32 = 5;
    pub const BACKFILL_MAX_ATTEMPTS: u32 = 10;
    pub const BASE_DELAY: Duration = Duration::from_secs(1);

    pub fn new(max_attempts: u32, base_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
        }
    }

    /// Policy used by the live updater.
    pub fn live() -> Self {
        Self::new(Self::LIVE_MAX_ATTEMPTS, Self::BASE_DELAY)
    }

    /// Policy used for backfill pages.
    pub fn backfill() -> Self {
        Self::new(Self::BACKFILL_MAX_ATTEMPTS, Self::BASE_DELAY)
    }

    pub fn delay_for(&self, attempt: u32) -> Duration {
        self.base_delay.saturating_mul(attempt)
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::live()
    }
}

pub struct RetryExecutor {
    policy: RetryPolicy,
    metrics: Option<Arc<Metrics>>,
}

impl RetryExecutor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self {
            policy,
            metrics: None,
        }
    }

    pub fn with_metrics(mut self, metrics: Arc<Metrics>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Fetch and decode one page for `pair`, retrying transient failures.
    pub async fn execute(
        &self,
        source: &dyn KlineSource,
        pair: &Pair,
        end_time: Option<i64>,
    ) -> Result<Series, IngestError> {
        self.run(&pair.cache_key(), move || {
            source.fetch_page(&pair.symbol, &pair.interval, end_time)
        })
        .await
    }

    /// Call `attempt` until it succeeds or the budget runs out.
    ///
    /// One sleep timer is created up front and reset before every wait.
    pub async fn run<T, F, Fut>(&self, key: &str, mut attempt: F) -> Result<T, IngestError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, FetchError>>,
    {
        let max_attempts = self.policy.max_attempts.max(1);
        let timer = sleep(Duration::ZERO);
        tokio::pin!(timer);

        let mut count = 0;
        loop {
            count += 1;
            if let Some(metrics) = &self.metrics {
                metrics.fetch_attempts_total.inc();
            }

            let err = match attempt().await {
                Ok(value) => {
                    if count > 1 {
                        debug!(key = %key, attempt = count, "fetch succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(err) => err,
            };

            if let Some(metrics) = &self.metrics {
                metrics.fetch_failures_total.inc();
            }
            warn!(key = %key, attempt = count, error = %err, "fetch attempt failed");

            if count >= max_attempts {
                if let Some(metrics) = &self.metrics {
                    metrics.fetch_exhausted_total.inc();
                }
                return Err(IngestError::TooManyAttempts {
                    key: key.to_string(),
                    attempts: count,
                    last_error: err,
                });
            }

            timer
                .as_mut()
                .reset(Instant::now() + self.policy.delay_for(count));
            timer.as_mut().await;
        }
    }
}
