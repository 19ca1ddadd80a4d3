//! Fixed-cadence driver for the live updater.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{watch, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{info, warn};

use crate::core::live::LiveUpdater;
use crate::error::ConfigError;

/// How long [`LiveScheduler::stop`] waits for an in-flight cycle.
pub const DEFAULT_STOP_GRACE: Duration = Duration::from_secs(30);

/// Runs [`LiveUpdater::run_cycle`] on a ticker inside a spawned task.
///
/// Missed ticks are delayed rather than bursted, so cycles never overlap. The
/// stop signal is checked between cycles only; a cycle that is already
/// running finishes unless the grace period runs out.
pub struct LiveScheduler {
    updater: Arc<LiveUpdater>,
    period: Duration,
    grace: Duration,
    stop_tx: watch::Sender<bool>,
    handle: Arc<RwLock<Option<JoinHandle<()>>>>,
}

impl LiveScheduler {
    pub fn new(updater: Arc<LiveUpdater>, period: Duration) -> Result<Self, ConfigError> {
        if period.is_zero() {
            return Err(ConfigError::Invalid {
                key: "CYCLE_INTERVAL_MS",
                value: "0".to_string(),
                reason: "scheduler period must be greater than zero".to_string(),
            });
        }
        let (stop_tx, _) = watch::channel(false);

        info!(
            period_ms = period.as_millis() as u64,
            pairs = updater.pairs().len(),
            "LiveScheduler: created"
        );

        Ok(Self {
            updater,
            period,
            grace: DEFAULT_STOP_GRACE,
            stop_tx,
            handle: Arc::new(RwLock::new(None)),
        })
    }

    pub fn with_grace(mut self, grace: Duration) -> Self {
        self.grace = grace;
        self
    }

    /// Spawn the cycle loop. Calling `start` on a running scheduler is a no-op.
    pub async fn start(&self) {
        let mut handle = self.handle.write().await;
        if handle.as_ref().is_some_and(|h| !h.is_finished()) {
            warn!("LiveScheduler: already running");
            return;
        }

        self.stop_tx.send_replace(false);
        let mut stop_rx = self.stop_tx.subscribe();
        let updater = self.updater.clone();
        let period = self.period;

        *handle = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            info!("LiveScheduler: started");

            loop {
                tokio::select! {
                    _ = ticker.tick() => {}
                    changed = stop_rx.changed() => {
                        if changed.is_err() || *stop_rx.borrow() {
                            break;
                        }
                        continue;
                    }
                }
                if *stop_rx.borrow() {
                    break;
                }
                updater.run_cycle().await;
            }

            info!("LiveScheduler: loop exited");
        }));
    }

    /// Signal the loop to stop and wait for it, aborting after the grace period.
    pub async fn stop(&self) {
        let Some(mut handle) = self.handle.write().await.take() else {
            return;
        };
        self.stop_tx.send_replace(true);

        match tokio::time::timeout(self.grace, &mut handle).await {
            Ok(_) => info!("LiveScheduler: stopped"),
            Err(_) => {
                warn!(
                    grace_ms = self.grace.as_millis() as u64,
                    "LiveScheduler: cycle did not finish in time, aborting"
                );
                handle.abort();
            }
        }
    }

    pub async fn is_running(&self) -> bool {
        let handle = self.handle.read().await;
        handle.as_ref().is_some_and(|h| !h.is_finished())
    }
}
