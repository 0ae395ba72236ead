//! Technical indicators used by the legacy indicator-veto model path.
//!
//! Indicators are pure functions: candle history in, numeric series out,
//! one value per candle. The first `lookback()` values are `f64::NAN` (warmup).
//! No value at candle t may depend on candles after t.

pub mod ema;
pub mod rsi;

pub use ema::Ema;
pub use rsi::Rsi;

use crate::domain::Candlestick;

pub trait Indicator: Send + Sync {
    /// Human-readable name (e.g., "rsi_14", "ema_25").
    fn name(&self) -> &str;

    /// Number of candles needed before the indicator produces valid output.
    fn lookback(&self) -> usize;

    /// Compute the indicator over the whole series.
    fn compute(&self, candles: &[Candlestick]) -> Vec<f64>;

    /// Value at the last candle, `None` during warmup.
    fn last(&self, candles: &[Candlestick]) -> Option<f64> {
        self.compute(candles).last().copied().filter(|v| v.is_finite())
    }
}

/// Candles from close prices for testing: open = previous close,
/// high/low one unit around the body.
#[cfg(test)]
pub fn make_candles(closes: &[f64]) -> Vec<Candlestick> {
    use crate::domain::MINUTE_MS;
    closes
        .iter()
        .enumerate()
        .map(|(i, &close)| {
            let open = if i == 0 { close } else { closes[i - 1] };
            let open_time = i as i64 * 30 * MINUTE_MS;
            Candlestick {
                open_time,
                close_time: open_time + 30 * MINUTE_MS - 1,
                open,
                high: open.max(close) + 1.0,
                low: open.min(close) - 1.0,
                close,
                volume: None,
            }
        })
        .collect()
}

#[cfg(test)]
pub fn assert_approx(actual: f64, expected: f64, epsilon: f64) {
    assert!(
        (actual - expected).abs() < epsilon,
        "assert_approx failed: actual={actual}, expected={expected}, diff={}, epsilon={epsilon}",
        (actual - expected).abs()
    );
}

#[cfg(test)]
pub const DEFAULT_EPSILON: f64 = 1e-10;
