//! Candlestick context: the three aligned series a backtest walks over.
//!
//! Built once per batch and shared immutably by every model. All cross-series
//! invariants are validated in `CandlestickSet::new` and trusted afterwards:
//! - the prediction and normalized series have identical rows (same `ot`/`ct`)
//! - the 1-minute series, trimmed to the first predictable candle, starts at
//!   `prediction[max_lookback].ot` and ends at the prediction series' last `ct`
//! - the trimmed 1-minute series has more rows than the prediction series

use thiserror::Error;

use crate::domain::{Candlestick, Timestamp};

/// Which of the three series an error refers to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Series {
    Minute,
    Prediction,
    Normalized,
}

impl std::fmt::Display for Series {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Series::Minute => write!(f, "1m"),
            Series::Prediction => write!(f, "prediction"),
            Series::Normalized => write!(f, "normalized prediction"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DataError {
    #[error("the {0} candlestick series is empty")]
    Empty(Series),

    #[error("the {series} candlestick series is not sorted by open time at row {row}")]
    Unsorted { series: Series, row: usize },

    #[error("the prediction and normalized series differ in length: {prediction} != {normalized}")]
    LengthMismatch { prediction: usize, normalized: usize },

    #[error("the prediction and normalized series differ at row {row}: ({expected_ot}, {expected_ct}) != ({received_ot}, {received_ct})")]
    RowMismatch {
        row: usize,
        expected_ot: Timestamp,
        expected_ct: Timestamp,
        received_ot: Timestamp,
        received_ct: Timestamp,
    },

    #[error("max lookback {max_lookback} requires more than {available} prediction candlesticks")]
    LookbackExceedsSeries { max_lookback: usize, available: usize },

    #[error("the candlestick series dont start at the same time: {minute_ot} != {prediction_ot}")]
    StartMismatch {
        minute_ot: Timestamp,
        prediction_ot: Timestamp,
    },

    #[error("the candlestick series dont end at the same time: {minute_ct} != {prediction_ct}")]
    EndMismatch {
        minute_ct: Timestamp,
        prediction_ct: Timestamp,
    },

    #[error("the 1m series must contain more rows than the prediction series: {minute} <= {prediction}")]
    TooFewMinuteCandles { minute: usize, prediction: usize },

    #[error("lookback must be at least 1")]
    InvalidLookback,

    #[error("{required} closed prediction candlesticks required at {timestamp}, only {available} available")]
    InsufficientLookback {
        required: usize,
        available: usize,
        timestamp: Timestamp,
    },
}

#[derive(Debug, Clone)]
pub struct CandlestickSet {
    minute: Vec<Candlestick>,
    prediction: Vec<Candlestick>,
    normalized: Vec<Candlestick>,
    max_lookback: usize,
}

impl CandlestickSet {
    /// Validate and align the three series. The 1-minute series is trimmed
    /// so the walk starts on the first candle every model can predict on.
    pub fn new(
        minute: Vec<Candlestick>,
        prediction: Vec<Candlestick>,
        normalized: Vec<Candlestick>,
        max_lookback: usize,
    ) -> Result<Self, DataError> {
        for (series, candles) in [
            (Series::Minute, &minute),
            (Series::Prediction, &prediction),
            (Series::Normalized, &normalized),
        ] {
            check_sorted(series, candles)?;
        }

        if prediction.len() != normalized.len() {
            return Err(DataError::LengthMismatch {
                prediction: prediction.len(),
                normalized: normalized.len(),
            });
        }
        for (row, (p, n)) in prediction.iter().zip(&normalized).enumerate() {
            if p.open_time != n.open_time || p.close_time != n.close_time {
                return Err(DataError::RowMismatch {
                    row,
                    expected_ot: p.open_time,
                    expected_ct: p.close_time,
                    received_ot: n.open_time,
                    received_ct: n.close_time,
                });
            }
        }

        let Some(first_predictable) = prediction.get(max_lookback) else {
            return Err(DataError::LookbackExceedsSeries {
                max_lookback,
                available: prediction.len(),
            });
        };
        let start_ot = first_predictable.open_time;
        let skip = minute.partition_point(|c| c.open_time < start_ot);
        let minute: Vec<Candlestick> = minute.into_iter().skip(skip).collect();

        let Some(first_minute) = minute.first() else {
            return Err(DataError::Empty(Series::Minute));
        };
        if first_minute.open_time != start_ot {
            return Err(DataError::StartMismatch {
                minute_ot: first_minute.open_time,
                prediction_ot: start_ot,
            });
        }
        if let (Some(last_minute), Some(last_prediction)) = (minute.last(), prediction.last()) {
            if last_minute.close_time != last_prediction.close_time {
                return Err(DataError::EndMismatch {
                    minute_ct: last_minute.close_time,
                    prediction_ct: last_prediction.close_time,
                });
            }
        }
        if minute.len() <= prediction.len() {
            return Err(DataError::TooFewMinuteCandles {
                minute: minute.len(),
                prediction: prediction.len(),
            });
        }

        Ok(Self {
            minute,
            prediction,
            normalized,
            max_lookback,
        })
    }

    /// Trimmed 1-minute candles the backtest walks over.
    pub fn minute(&self) -> &[Candlestick] {
        &self.minute
    }

    pub fn prediction(&self) -> &[Candlestick] {
        &self.prediction
    }

    pub fn normalized(&self) -> &[Candlestick] {
        &self.normalized
    }

    pub fn max_lookback(&self) -> usize {
        self.max_lookback
    }

    /// Open time of the first walked candle.
    pub fn start(&self) -> Timestamp {
        self.minute.first().map(|c| c.open_time).unwrap_or_default()
    }

    /// Close time of the last walked candle.
    pub fn end(&self) -> Timestamp {
        self.minute.last().map(|c| c.close_time).unwrap_or_default()
    }

    /// The last `lookback` prediction candles closed at `timestamp`.
    pub fn lookback_window(
        &self,
        lookback: usize,
        timestamp: Timestamp,
        normalized: bool,
    ) -> Result<&[Candlestick], DataError> {
        if lookback == 0 {
            return Err(DataError::InvalidLookback);
        }
        let series = if normalized {
            &self.normalized
        } else {
            &self.prediction
        };
        let end = series.partition_point(|c| c.close_time <= timestamp);
        if end < lookback {
            return Err(DataError::InsufficientLookback {
                required: lookback,
                available: end,
                timestamp,
            });
        }
        Ok(&series[end - lookback..end])
    }

    /// `(first_ot, last_ct)` of the lookback window at `timestamp`.
    pub fn lookback_range(
        &self,
        lookback: usize,
        timestamp: Timestamp,
    ) -> Result<(Timestamp, Timestamp), DataError> {
        let window = self.lookback_window(lookback, timestamp, false)?;
        match (window.first(), window.last()) {
            (Some(first), Some(last)) => Ok((first.open_time, last.close_time)),
            _ => Err(DataError::InvalidLookback),
        }
    }
}

fn check_sorted(series: Series, candles: &[Candlestick]) -> Result<(), DataError> {
    if candles.is_empty() {
        return Err(DataError::Empty(series));
    }
    if let Some(row) = candles
        .windows(2)
        .position(|w| w[1].open_time <= w[0].open_time)
    {
        return Err(DataError::Unsorted { series, row: row + 1 });
    }
    Ok(())
}

/// Build three aligned series for tests: `buckets` prediction candles of
/// `bucket_minutes` each, flat at `price`, starting at `start`.
#[cfg(test)]
pub(crate) fn flat_series(
    start: Timestamp,
    buckets: usize,
    bucket_minutes: usize,
    price: f64,
) -> (Vec<Candlestick>, Vec<Candlestick>, Vec<Candlestick>) {
    use crate::domain::MINUTE_MS;
    let candle = |ot: Timestamp, minutes: usize, price: f64| Candlestick {
        open_time: ot,
        close_time: ot + minutes as Timestamp * MINUTE_MS - 1,
        open: price,
        high: price,
        low: price,
        close: price,
        volume: None,
    };
    let bucket_ms = bucket_minutes as Timestamp * MINUTE_MS;
    let prediction: Vec<Candlestick> = (0..buckets)
        .map(|i| candle(start + i as Timestamp * bucket_ms, bucket_minutes, price))
        .collect();
    let normalized = prediction
        .iter()
        .map(|c| candle(c.open_time, bucket_minutes, 1.0))
        .collect();
    let minute = (0..buckets * bucket_minutes)
        .map(|i| candle(start + i as Timestamp * MINUTE_MS, 1, price))
        .collect();
    (minute, prediction, normalized)
}
