//! RSI oversold/overbought signalling

use std::sync::Arc;

use chrono::Utc;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::cache::Cache;
use crate::config::RsiConfig;
use crate::indicators::momentum::calculate_rsi;
use crate::models::{IndicatorReading, Pair, Series};
use crate::signals::hook::IndicatorHook;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ThresholdSignal {
    Oversold,
    Overbought,
}

/// Classify an RSI value against the configured thresholds.
pub fn classify_rsi(value: f64, config: &RsiConfig) -> Option<ThresholdSignal> {
    if value < config.oversold {
        Some(ThresholdSignal::Oversold)
    } else if value > config.overbought {
        Some(ThresholdSignal::Overbought)
    } else {
        None
    }
}

/// Computes RSI on every refreshed series, logs threshold crossings and keeps
/// the latest reading in the cache under `<symbol>_<interval>_rsi`.
pub struct RsiThresholdHook {
    config: RsiConfig,
    cache: Option<Arc<dyn Cache>>,
}

impl RsiThresholdHook {
    pub fn new(config: RsiConfig) -> Self {
        Self {
            config,
            cache: None,
        }
    }

    pub fn with_cache(mut self, cache: Arc<dyn Cache>) -> Self {
        self.cache = Some(cache);
        self
    }

    /// Latest-bar reading, if the series is long enough.
    pub fn evaluate(&self, pair: &Pair, series: &Series) -> Option<IndicatorReading> {
        let rsi = calculate_rsi(series.closes(), self.config.period)?;
        Some(IndicatorReading {
            symbol: pair.symbol.clone(),
            interval: pair.interval.clone(),
            rsi,
            bar_open_time: series.last_open_time()?,
            computed_at: Utc::now(),
        })
    }
}

impl IndicatorHook for RsiThresholdHook {
    fn on_series(&self, pair: &Pair, series: &Series) {
        let Some(reading) = self.evaluate(pair, series) else {
            debug!(
                symbol = %pair.symbol,
                interval = %pair.interval,
                candles = series.len(),
                "RSI: not enough candles for period {}",
                self.config.period
            );
            return;
        };

        if let Some(signal) = classify_rsi(reading.rsi.value, &self.config) {
            info!(
                symbol = %pair.symbol,
                interval = %pair.interval,
                rsi = reading.rsi.value,
                signal = ?signal,
                "RSI signal for {}: {:?} ({:.2})",
                pair,
                signal,
                reading.rsi.value
            );
        }

        if let Some(cache) = &self.cache {
            cache.set(&pair.rsi_key(), reading.into());
        }
    }
}
