//! Shared data models spanning the ingestion layers.

pub mod indicators;
pub mod pair;
pub mod series;

pub use indicators::{IndicatorReading, RsiIndicator};
pub use pair::{is_supported_interval, Pair, SUPPORTED_INTERVALS};
pub use series::{Candle, Series};
