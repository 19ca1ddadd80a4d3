//! Indicator hook boundary.

use crate::models::{Pair, Series};

/// Callback fired with every freshly refreshed series.
///
/// The ingestion loop consumes no result from the hook: signalling is a side
/// effect and a slow or failing hook never changes what gets cached.
pub trait IndicatorHook: Send + Sync {
    fn on_series(&self, pair: &Pair, series: &Series);
}

/// Hook that does nothing.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopHook;

impl IndicatorHook for NoopHook {
    fn on_series(&self, _pair: &Pair, _series: &Series) {}
}
