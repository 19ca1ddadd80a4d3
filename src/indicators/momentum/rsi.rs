//! RSI (Relative Strength Index) indicator

use crate::models::RsiIndicator;

pub const DEFAULT_RSI_PERIOD: u32 = 14;

/// Calculate RSI over the last `period` price changes of `closes`.
///
/// RSI = 100 - (100 / (1 + RS))
/// RS = Average Gain / Average Loss
pub fn calculate_rsi(closes: &[f64], period: u32) -> Option<RsiIndicator> {
    if period == 0 || closes.len() < period as usize + 1 {
        return None;
    }

    let (gains, losses) = closes
        .windows(2)
        .rev()
        .take(period as usize)
        .fold((0.0, 0.0), |(gains, losses), w| {
            let change = w[1] - w[0];
            if change > 0.0 {
                (gains + change, losses)
            } else {
                (gains, losses + change.abs())
            }
        });

    let avg_gain = gains / period as f64;
    let avg_loss = losses / period as f64;

    if avg_loss == 0.0 {
        return Some(RsiIndicator {
            value: 100.0,
            period: Some(period),
        });
    }

    let rs = avg_gain / avg_loss;
    Some(RsiIndicator {
        value: 100.0 - (100.0 / (1.0 + rs)),
        period: Some(period),
    })
}

/// Calculate RSI with the default period (14)
pub fn calculate_rsi_default(closes: &[f64]) -> Option<RsiIndicator> {
    calculate_rsi(closes, DEFAULT_RSI_PERIOD)
}
