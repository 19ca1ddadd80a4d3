//! Kline response decoding.
//!
//! The exchange answers with an array of rows:
//! `[openTime, open, high, low, close, volume, closeTime, ...]` where the
//! timestamps are JSON integers and prices/volume are decimal strings. Trailing
//! fields (quote volume, trade count, taker volumes) are ignored.

use serde_json::Value;

use crate::error::DecodeError;
use crate::models::{Candle, Series};

const MIN_ROW_FIELDS: usize = 7;

/// Decode a raw kline payload into a [`Series`].
///
/// The first malformed row aborts the whole decode; no partial series is
/// returned.
pub fn decode_klines(raw: &[u8]) -> Result<Series, DecodeError> {
    let rows: Vec<Vec<Value>> =
        serde_json::from_slice(raw).map_err(|e| DecodeError::Malformed(e.to_string()))?;
    if rows.is_empty() {
        return Err(DecodeError::EmptyData);
    }

    let mut series = Series::with_capacity(rows.len());
    for (index, row) in rows.iter().enumerate() {
        series.try_push(decode_row(index, row)?)?;
    }
    Ok(series)
}

fn decode_row(row: usize, fields: &[Value]) -> Result<Candle, DecodeError> {
    if fields.len() < MIN_ROW_FIELDS {
        return Err(DecodeError::RowTooShort {
            row,
            expected: MIN_ROW_FIELDS,
            found: fields.len(),
        });
    }

    Ok(Candle {
        open_time: integer(row, &fields[0], "open_time")?,
        open: decimal(row, &fields[1], "open")?,
        high: decimal(row, &fields[2], "high")?,
        low: decimal(row, &fields[3], "low")?,
        close: decimal(row, &fields[4], "close")?,
        volume: decimal(row, &fields[5], "volume")?,
        close_time: integer(row, &fields[6], "close_time")?,
    })
}

// serde_json keeps integer literals as i64/u64, so epoch millis never pass through f64.
fn integer(row: usize, value: &Value, field: &'static str) -> Result<i64, DecodeError> {
    value
        .as_i64()
        .ok_or(DecodeError::BadInteger { row, field })
}

fn decimal(row: usize, value: &Value, field: &'static str) -> Result<f64, DecodeError> {
    let bad = || DecodeError::BadDecimal {
        row,
        field,
        value: value.to_string(),
    };
    let text = value.as_str().ok_or_else(bad)?;
    match text.trim().parse::<f64>() {
        Ok(parsed) if parsed.is_finite() => Ok(parsed),
        _ => Err(bad()),
    }
}
