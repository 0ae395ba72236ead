//! Percent-change interpreter for regression forecasts.

use serde::{Deserialize, Serialize};

use super::{Interpretation, InterpreterError};
use crate::numbers::percentage_change;

/// Smallest accepted change threshold, in percent.
pub const MIN_CHANGE_VALUE: f64 = 0.05;

/// Smallest forecast length accepted by `interpret`.
pub const MIN_PREDICTIONS: usize = 5;

/// Compares the first and last forecast prices against change thresholds.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PercentChange {
    #[serde(alias = "long")]
    pub min_increase_change: f64,
    #[serde(alias = "short")]
    pub min_decrease_change: f64,
}

impl PercentChange {
    pub fn new(min_increase_change: f64, min_decrease_change: f64) -> Result<Self, InterpreterError> {
        let interpreter = Self {
            min_increase_change,
            min_decrease_change,
        };
        interpreter.validate()?;
        Ok(interpreter)
    }

    pub fn validate(&self) -> Result<(), InterpreterError> {
        check_min("min_increase_change", self.min_increase_change)?;
        check_min("min_decrease_change", self.min_decrease_change)
    }

    /// `long` if the change reaches the increase threshold, `short` if it
    /// reaches the negated decrease threshold, `neutral` otherwise.
    pub fn interpret(&self, prices: &[f64]) -> Result<Interpretation, InterpreterError> {
        if prices.len() < MIN_PREDICTIONS {
            return Err(InterpreterError::InsufficientPredictions {
                required: MIN_PREDICTIONS,
                received: prices.len(),
            });
        }
        let change = percentage_change(prices[0], prices[prices.len() - 1]);
        Ok(if change >= self.min_increase_change {
            Interpretation::long()
        } else if change <= -self.min_decrease_change {
            Interpretation::short()
        } else {
            Interpretation::neutral()
        })
    }
}

fn check_min(name: &'static str, value: f64) -> Result<(), InterpreterError> {
    if value.is_nan() || value < MIN_CHANGE_VALUE {
        return Err(InterpreterError::ThresholdTooLow {
            name,
            value,
            min: MIN_CHANGE_VALUE,
        });
    }
    Ok(())
}

#[cfg(test)]
pub(crate) fn forecast(change: f64) -> Vec<f64> {
    vec![100.0, 101.0, 102.0, 101.0, crate::numbers::alter_by_percentage(100.0, change)]
}
