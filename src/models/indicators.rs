use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RsiIndicator {
    pub value: f64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub period: Option<u32>,
}

/// Latest indicator reading for one pair, keyed by the bar it was computed on.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndicatorReading {
    pub symbol: String,
    pub interval: String,
    pub rsi: RsiIndicator,
    /// Open time of the bar the reading was taken on (epoch ms).
    pub bar_open_time: i64,
    pub computed_at: DateTime<Utc>,
}
