use serde::{Deserialize, Serialize};

/// Kline intervals accepted by the exchange.
pub const SUPPORTED_INTERVALS: &[&str] = &[
    "1s", "1m", "3m", "5m", "15m", "30m", "1h", "2h", "4h", "6h", "8h", "12h", "1d", "3d", "1w",
    "1M",
];

/// A (symbol, interval) pair, the unit of ingestion.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Pair {
    pub symbol: String,
    pub interval: String,
}

impl Pair {
    pub fn new(symbol: impl Into<String>, interval: impl Into<String>) -> Self {
        Self {
            symbol: symbol.into(),
            interval: interval.into(),
        }
    }

    /// Cache key of the live series: `<symbol>_<interval>`.
    pub fn cache_key(&self) -> String {
        format!("{}_{}", self.symbol, self.interval)
    }

    /// Cache key of the snapshot loaded at cold start.
    pub fn history_key(&self) -> String {
        format!("{}_{}_old", self.symbol, self.interval)
    }

    /// Cache key of the latest RSI reading.
    pub fn rsi_key(&self) -> String {
        format!("{}_{}_rsi", self.symbol, self.interval)
    }

    /// Every symbol crossed with every interval, symbol-major.
    pub fn cartesian(symbols: &[String], intervals: &[String]) -> Vec<Pair> {
        symbols
            .iter()
            .flat_map(|symbol| {
                intervals
                    .iter()
                    .map(move |interval| Pair::new(symbol.clone(), interval.clone()))
            })
            .collect()
    }
}

impl std::fmt::Display for Pair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}_{}", self.symbol, self.interval)
    }
}

pub fn is_supported_interval(interval: &str) -> bool {
    SUPPORTED_INTERVALS.contains(&interval)
}
