//! Signal hooks fired by the live updater.

pub mod hook;
pub mod rsi_threshold;

pub use hook::{IndicatorHook, NoopHook};
pub use rsi_threshold::{classify_rsi, RsiThresholdHook, ThresholdSignal};
