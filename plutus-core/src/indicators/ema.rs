//! Exponential Moving Average (EMA) of close prices.
//!
//! EMA[t] = alpha * close[t] + (1 - alpha) * EMA[t-1], alpha = 2 / (period + 1)
//! Seeded with the SMA of the first `period` closes.

use super::Indicator;
use crate::domain::Candlestick;

pub const DEFAULT_SHORT_EMA_PERIOD: usize = 7;
pub const DEFAULT_LONG_EMA_PERIOD: usize = 25;

#[derive(Debug, Clone)]
pub struct Ema {
    period: usize,
    name: String,
}

impl Ema {
    /// Periods below 1 are clamped to 1.
    pub fn new(period: usize) -> Self {
        let period = period.max(1);
        Self {
            period,
            name: format!("ema_{period}"),
        }
    }
}

impl Indicator for Ema {
    fn name(&self) -> &str {
        &self.name
    }

    fn lookback(&self) -> usize {
        self.period - 1
    }

    fn compute(&self, candles: &[Candlestick]) -> Vec<f64> {
        let n = candles.len();
        let mut result = vec![f64::NAN; n];
        if n < self.period {
            return result;
        }

        let seed_window = &candles[..self.period];
        if seed_window.iter().any(|c| c.close.is_nan()) {
            return result;
        }
        let seed = seed_window.iter().map(|c| c.close).sum::<f64>() / self.period as f64;
        result[self.period - 1] = seed;

        let alpha = 2.0 / (self.period as f64 + 1.0);
        let mut prev = seed;
        for i in self.period..n {
            let close = candles[i].close;
            if close.is_nan() {
                for v in result.iter_mut().skip(i) {
                    *v = f64::NAN;
                }
                return result;
            }
            prev = alpha * close + (1.0 - alpha) * prev;
            result[i] = prev;
        }
        result
    }
}
