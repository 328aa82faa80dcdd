//! Bar — one day of price/volume history.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// Daily OHLCV bar for a single ticker.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bar {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    pub volume: u64,
}

impl Bar {
    pub fn new(date: NaiveDate, open: f64, high: f64, low: f64, close: f64, volume: u64) -> Self {
        Self {
            date,
            open,
            high,
            low,
            close,
            volume,
        }
    }

    /// Returns true if any price field is NaN.
    pub fn is_void(&self) -> bool {
        self.open.is_nan() || self.high.is_nan() || self.low.is_nan() || self.close.is_nan()
    }

    /// Basic OHLC sanity check: high bounds the bar from above, low from below.
    pub fn is_sane(&self) -> bool {
        if self.is_void() {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.low > 0.0
    }

    pub fn volume_f64(&self) -> f64 {
        self.volume as f64
    }
}

/// High/low envelope of a run of bars.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PriceRange {
    pub high: f64,
    pub low: f64,
}

impl PriceRange {
    /// Envelope of `bars`, or `None` for an empty slice.
    pub fn of(bars: &[Bar]) -> Option<Self> {
        let first = bars.first()?;
        let init = PriceRange {
            high: first.high,
            low: first.low,
        };
        Some(bars[1..].iter().fold(init, |acc, b| PriceRange {
            high: acc.high.max(b.high),
            low: acc.low.min(b.low),
        }))
    }

    /// Height of the range relative to its low. Zero for a degenerate low.
    pub fn width_pct(&self) -> f64 {
        if self.low <= 0.0 {
            return 0.0;
        }
        (self.high - self.low) / self.low
    }
}
