//! Shared key/value store for the latest series.
//!
//! Every operation takes a single lock over the whole map, so readers never
//! observe a half-written entry. Values are replaced wholesale; a series
//! already handed out through [`Cache::get`] is never mutated.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use crate::models::{IndicatorReading, Series};

/// Payload kinds the cache can hold.
#[derive(Debug, Clone, PartialEq)]
pub enum CacheValue {
    Series(Arc<Series>),
    Indicator(Arc<IndicatorReading>),
}

impl CacheValue {
    pub fn into_series(self) -> Option<Arc<Series>> {
        match self {
            CacheValue::Series(series) => Some(series),
            _ => None,
        }
    }

    pub fn into_indicator(self) -> Option<Arc<IndicatorReading>> {
        match self {
            CacheValue::Indicator(reading) => Some(reading),
            _ => None,
        }
    }
}

impl From<Series> for CacheValue {
    fn from(series: Series) -> Self {
        CacheValue::Series(Arc::new(series))
    }
}

impl From<Arc<Series>> for CacheValue {
    fn from(series: Arc<Series>) -> Self {
        CacheValue::Series(series)
    }
}

impl From<IndicatorReading> for CacheValue {
    fn from(reading: IndicatorReading) -> Self {
        CacheValue::Indicator(Arc::new(reading))
    }
}

/// Store capability the ingestion components depend on.
pub trait Cache: Send + Sync {
    fn set(&self, key: &str, value: CacheValue);

    /// `None` when the key was never set or has been deleted.
    fn get(&self, key: &str) -> Option<CacheValue>;

    fn exists(&self, key: &str) -> bool;

    /// Returns whether an entry was removed.
    fn delete(&self, key: &str) -> bool;

    fn keys(&self) -> Vec<String>;

    fn len(&self) -> usize;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Typed read; `None` for a miss or for a non-series payload.
    fn get_series(&self, key: &str) -> Option<Arc<Series>> {
        self.get(key).and_then(CacheValue::into_series)
    }

    fn get_indicator(&self, key: &str) -> Option<Arc<IndicatorReading>> {
        self.get(key).and_then(CacheValue::into_indicator)
    }
}

/// In-process [`Cache`] guarded by one mutex.
#[derive(Debug, Default)]
pub struct MemoryCache {
    entries: Mutex<HashMap<String, CacheValue>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    // A panic while holding the guard cannot leave a half-written value behind
    // (inserts and removals are single map operations), so a poisoned lock is
    // still safe to use.
    fn lock(&self) -> MutexGuard<'_, HashMap<String, CacheValue>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Cache for MemoryCache {
    fn set(&self, key: &str, value: CacheValue) {
        self.lock().insert(key.to_string(), value);
    }

    fn get(&self, key: &str) -> Option<CacheValue> {
        self.lock().get(key).cloned()
    }

    fn exists(&self, key: &str) -> bool {
        self.lock().contains_key(key)
    }

    fn delete(&self, key: &str) -> bool {
        self.lock().remove(key).is_some()
    }

    fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.lock().keys().cloned().collect();
        keys.sort();
        keys
    }

    fn len(&self) -> usize {
        self.lock().len()
    }
}
