//! Candlestick: the fundamental market data unit.

use serde::{Deserialize, Serialize};

use super::Timestamp;

/// OHLCV candlestick for a fixed interval.
///
/// The same type backs the 1-minute series, the prediction-bucket series and
/// its normalized counterpart. Persisted with the short column names
/// `ot,ct,o,h,l,c,v`.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Candlestick {
    #[serde(rename = "ot")]
    pub open_time: Timestamp,
    #[serde(rename = "ct")]
    pub close_time: Timestamp,
    #[serde(rename = "o")]
    pub open: f64,
    #[serde(rename = "h")]
    pub high: f64,
    #[serde(rename = "l")]
    pub low: f64,
    #[serde(rename = "c")]
    pub close: f64,
    #[serde(rename = "v", default, skip_serializing_if = "Option::is_none")]
    pub volume: Option<f64>,
}

impl Candlestick {
    /// Basic OHLC sanity check: high >= low and both bracket open/close.
    pub fn is_sane(&self) -> bool {
        if [self.open, self.high, self.low, self.close]
            .iter()
            .any(|v| v.is_nan())
        {
            return false;
        }
        self.high >= self.low
            && self.high >= self.open
            && self.high >= self.close
            && self.low <= self.open
            && self.low <= self.close
            && self.close_time > self.open_time
    }

    /// Interval covered by the candle in milliseconds (inclusive close time).
    pub fn duration_ms(&self) -> Timestamp {
        self.close_time - self.open_time + 1
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Candlestick {
        Candlestick {
            open_time: 1_640_995_200_000,
            close_time: 1_640_995_259_999,
            open: 46_216.93,
            high: 46_271.08,
            low: 46_208.37,
            close: 46_250.0,
            volume: Some(12.5),
        }
    }

    #[test]
    fn candlestick_is_sane() {
        assert!(sample().is_sane());
    }

    #[test]
    fn candlestick_inverted_range_is_not_sane() {
        let mut c = sample();
        c.low = c.high + 1.0;
        assert!(!c.is_sane());
    }

    #[test]
    fn candlestick_nan_is_not_sane() {
        let mut c = sample();
        c.close = f64::NAN;
        assert!(!c.is_sane());
    }

    #[test]
    fn one_minute_duration() {
        assert_eq!(sample().duration_ms(), 60_000);
    }

    #[test]
    fn serializes_short_keys_and_skips_missing_volume() {
        let mut c = sample();
        c.volume = None;
        let json = serde_json::to_value(c).unwrap();
        assert_eq!(json["ot"], 1_640_995_200_000_i64);
        assert_eq!(json["h"], 46_271.08);
        assert!(json.get("v").is_none());
    }
}
