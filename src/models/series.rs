//! Columnar OHLCV series

use serde::{Deserialize, Serialize};

use crate::error::SeriesError;

/// One OHLCV bar.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candle {
    pub open_time: i64,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: f64,
    pub close_time: i64,
}

impl Candle {
    pub fn new(
        open_time: i64,
        open: f64,
        high: f64,
        low: f64,
        close: f64,
        volume: f64,
        close_time: i64,
    ) -> Self {
        Self {
            open_time,
            open,
            high,
            low,
            close,
            volume,
            close_time,
        }
    }
}

/// Ordered candles stored as parallel arrays of equal length.
///
/// Open times are strictly increasing, so no two candles share an open time.
/// A `Series` handed to the cache is never mutated again; updates build a new
/// value through [`Series::prepend_older`] or [`Series::merge_newer`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Series {
    open_time: Vec<i64>,
    open: Vec<f64>,
    high: Vec<f64>,
    low: Vec<f64>,
    close: Vec<f64>,
    volume: Vec<f64>,
    close_time: Vec<i64>,
}

impl Series {
    pub fn with_capacity(capacity: usize) -> Self {
        Self {
            open_time: Vec::with_capacity(capacity),
            open: Vec::with_capacity(capacity),
            high: Vec::with_capacity(capacity),
            low: Vec::with_capacity(capacity),
            close: Vec::with_capacity(capacity),
            volume: Vec::with_capacity(capacity),
            close_time: Vec::with_capacity(capacity),
        }
    }

    /// Build a series from candles, rejecting bad bars and unordered open times.
    pub fn from_candles<I>(candles: I) -> Result<Self, SeriesError>
    where
        I: IntoIterator<Item = Candle>,
    {
        let candles = candles.into_iter();
        let mut series = Self::with_capacity(candles.size_hint().0);
        for candle in candles {
            series.try_push(candle)?;
        }
        Ok(series)
    }

    /// Append a candle that must open after the current last candle.
    pub fn try_push(&mut self, candle: Candle) -> Result<(), SeriesError> {
        let index = self.len();
        if candle.open_time >= candle.close_time {
            return Err(SeriesError::InvalidBar {
                index,
                open_time: candle.open_time,
                close_time: candle.close_time,
            });
        }
        if let Some(previous) = self.last_open_time() {
            if candle.open_time <= previous {
                return Err(SeriesError::OutOfOrder {
                    index,
                    previous,
                    open_time: candle.open_time,
                });
            }
        }
        self.push_unchecked(candle);
        Ok(())
    }

    fn push_unchecked(&mut self, candle: Candle) {
        self.open_time.push(candle.open_time);
        self.open.push(candle.open);
        self.high.push(candle.high);
        self.low.push(candle.low);
        self.close.push(candle.close);
        self.volume.push(candle.volume);
        self.close_time.push(candle.close_time);
    }

    fn extend_from(&mut self, other: &Series, range: std::ops::Range<usize>) {
        self.open_time.extend_from_slice(&other.open_time[range.clone()]);
        self.open.extend_from_slice(&other.open[range.clone()]);
        self.high.extend_from_slice(&other.high[range.clone()]);
        self.low.extend_from_slice(&other.low[range.clone()]);
        self.close.extend_from_slice(&other.close[range.clone()]);
        self.volume.extend_from_slice(&other.volume[range.clone()]);
        self.close_time.extend_from_slice(&other.close_time[range]);
    }

    /// Check the column lengths and ordering of a series built elsewhere,
    /// e.g. one deserialized from disk.
    pub fn validate(&self) -> Result<(), SeriesError> {
        let n = self.open_time.len();
        for other in [
            self.open.len(),
            self.high.len(),
            self.low.len(),
            self.close.len(),
            self.volume.len(),
            self.close_time.len(),
        ] {
            if other != n {
                return Err(SeriesError::LengthMismatch { open_time: n, other });
            }
        }
        for index in 0..n {
            let (open_time, close_time) = (self.open_time[index], self.close_time[index]);
            if open_time >= close_time {
                return Err(SeriesError::InvalidBar {
                    index,
                    open_time,
                    close_time,
                });
            }
            if index > 0 && open_time <= self.open_time[index - 1] {
                return Err(SeriesError::OutOfOrder {
                    index,
                    previous: self.open_time[index - 1],
                    open_time,
                });
            }
        }
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.open_time.len()
    }

    pub fn is_empty(&self) -> bool {
        self.open_time.is_empty()
    }

    pub fn open_times(&self) -> &[i64] {
        &self.open_time
    }

    pub fn opens(&self) -> &[f64] {
        &self.open
    }

    pub fn highs(&self) -> &[f64] {
        &self.high
    }

    pub fn lows(&self) -> &[f64] {
        &self.low
    }

    pub fn closes(&self) -> &[f64] {
        &self.close
    }

    pub fn volumes(&self) -> &[f64] {
        &self.volume
    }

    pub fn close_times(&self) -> &[i64] {
        &self.close_time
    }

    pub fn first_open_time(&self) -> Option<i64> {
        self.open_time.first().copied()
    }

    pub fn last_open_time(&self) -> Option<i64> {
        self.open_time.last().copied()
    }

    pub fn candle(&self, index: usize) -> Option<Candle> {
        (index < self.len()).then(|| {
            Candle::new(
                self.open_time[index],
                self.open[index],
                self.high[index],
                self.low[index],
                self.close[index],
                self.volume[index],
                self.close_time[index],
            )
        })
    }

    pub fn iter(&self) -> impl Iterator<Item = Candle> + '_ {
        (0..self.len()).filter_map(move |i| self.candle(i))
    }

    /// Index of the first candle whose open time is `>= open_time`.
    fn partition_at(&self, open_time: i64) -> usize {
        self.open_time.partition_point(|&t| t < open_time)
    }

    /// Prepend the part of an older `page` that precedes this series.
    ///
    /// Page rows opening at or after this series' first open time are already
    /// present and are dropped. Returns the merged series and how many page rows
    /// overlapped. Pages normally overlap by exactly one row, the boundary candle.
    pub fn prepend_older(&self, page: &Series) -> (Series, usize) {
        let keep = match self.first_open_time() {
            Some(first) => page.partition_at(first),
            None => page.len(),
        };
        let mut merged = Series::with_capacity(keep + self.len());
        merged.extend_from(page, 0..keep);
        merged.extend_from(self, 0..self.len());
        (merged, page.len() - keep)
    }

    /// Append a newer `page`, replacing every candle it overlaps.
    ///
    /// The last bar of a live page is usually still forming, so page rows win
    /// over cached rows sharing the same open time. A page that starts after
    /// this series' last close (a hole between the two) replaces it outright.
    pub fn merge_newer(&self, page: &Series) -> Series {
        let Some(first) = page.first_open_time() else {
            return self.clone();
        };
        if !self.reaches(first) {
            return page.clone();
        }
        let keep = self.partition_at(first);
        let mut merged = Series::with_capacity(keep + page.len());
        merged.extend_from(self, 0..keep);
        merged.extend_from(page, 0..page.len());
        merged
    }

    /// Whether a candle opening at `open_time` overlaps or directly follows
    /// this series.
    fn reaches(&self, open_time: i64) -> bool {
        match self.close_time.last() {
            Some(&last_close) => open_time <= last_close + 1,
            None => false,
        }
    }

    /// The newest `max` candles.
    pub fn tail(&self, max: usize) -> Series {
        let start = self.len().saturating_sub(max);
        let mut tail = Series::with_capacity(self.len() - start);
        tail.extend_from(self, start..self.len());
        tail
    }
}
