//! Legacy multi-indicator interpreter.
//!
//! The base signal comes from percent-change thresholds. A long or short is
//! then neutralized by RSI extremes and, after that, by an EMA trend running
//! against it. Missing readings (warmup, inactive indicator) skip the veto.

use serde::{Deserialize, Serialize};

use super::{Interpretation, InterpreterError, PercentChange, SignalDescription};
use crate::domain::Signal;
use crate::numbers::percentage_change;

pub const DEFAULT_RSI_OVERBOUGHT: f64 = 70.0;
pub const DEFAULT_RSI_OVERSOLD: f64 = 30.0;
pub const DEFAULT_EMA_DISTANCE: f64 = 0.5;

/// RSI veto levels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RsiVeto {
    #[serde(default = "default_overbought")]
    pub overbought: f64,
    #[serde(default = "default_oversold")]
    pub oversold: f64,
}

impl Default for RsiVeto {
    fn default() -> Self {
        Self {
            overbought: DEFAULT_RSI_OVERBOUGHT,
            oversold: DEFAULT_RSI_OVERSOLD,
        }
    }
}

/// EMA trend veto: percent distance between the long and short EMA.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EmaVeto {
    #[serde(default = "default_distance")]
    pub distance: f64,
}

impl Default for EmaVeto {
    fn default() -> Self {
        Self {
            distance: DEFAULT_EMA_DISTANCE,
        }
    }
}

fn default_overbought() -> f64 {
    DEFAULT_RSI_OVERBOUGHT
}

fn default_oversold() -> f64 {
    DEFAULT_RSI_OVERSOLD
}

fn default_distance() -> f64 {
    DEFAULT_EMA_DISTANCE
}

/// Indicator values at the prediction time. `None` or NaN disables a veto.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct IndicatorReadings {
    pub rsi: Option<f64>,
    pub short_ema: Option<f64>,
    pub long_ema: Option<f64>,
}

impl IndicatorReadings {
    fn rsi(&self) -> Option<f64> {
        self.rsi.filter(|v| v.is_finite())
    }

    /// Percent change from the long EMA to the short EMA.
    fn ema_trend(&self) -> Option<f64> {
        match (self.short_ema, self.long_ema) {
            (Some(short), Some(long)) if short.is_finite() && long.is_finite() => {
                Some(percentage_change(long, short))
            }
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct IndicatorVeto {
    #[serde(flatten)]
    pub change: PercentChange,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rsi: Option<RsiVeto>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ema: Option<EmaVeto>,
}

impl IndicatorVeto {
    pub fn validate(&self) -> Result<(), InterpreterError> {
        self.change.validate()?;
        if let Some(rsi) = &self.rsi {
            let in_bounds = (0.0..=100.0).contains(&rsi.oversold) && (0.0..=100.0).contains(&rsi.overbought);
            if !in_bounds || rsi.oversold >= rsi.overbought {
                return Err(InterpreterError::InvalidIndicatorConfig {
                    name: "rsi",
                    reason: format!(
                        "oversold {} must be below overbought {} within [0, 100]",
                        rsi.oversold, rsi.overbought
                    ),
                });
            }
        }
        if let Some(ema) = &self.ema {
            if ema.distance.is_nan() || ema.distance <= 0.0 {
                return Err(InterpreterError::InvalidIndicatorConfig {
                    name: "ema",
                    reason: format!("distance must be positive (received {})", ema.distance),
                });
            }
        }
        Ok(())
    }

    pub fn interpret(
        &self,
        prices: &[f64],
        readings: IndicatorReadings,
    ) -> Result<Interpretation, InterpreterError> {
        let base = self.change.interpret(prices)?;
        Ok(match base.signal {
            Signal::Long => self.veto_long(readings).unwrap_or(base),
            Signal::Short => self.veto_short(readings).unwrap_or(base),
            Signal::Neutral => base,
        })
    }

    fn veto_long(&self, readings: IndicatorReadings) -> Option<Interpretation> {
        if let (Some(cfg), Some(rsi)) = (self.rsi, readings.rsi()) {
            if rsi >= cfg.overbought {
                return Some(Interpretation::neutralized(
                    SignalDescription::LongNeutralizedByRsiOverbought,
                ));
            }
        }
        if let (Some(cfg), Some(trend)) = (self.ema, readings.ema_trend()) {
            if trend <= -cfg.distance {
                return Some(Interpretation::neutralized(
                    SignalDescription::LongNeutralizedByEmaDowntrend,
                ));
            }
        }
        None
    }

    fn veto_short(&self, readings: IndicatorReadings) -> Option<Interpretation> {
        if let (Some(cfg), Some(rsi)) = (self.rsi, readings.rsi()) {
            if rsi <= cfg.oversold {
                return Some(Interpretation::neutralized(
                    SignalDescription::ShortNeutralizedByRsiOversold,
                ));
            }
        }
        if let (Some(cfg), Some(trend)) = (self.ema, readings.ema_trend()) {
            if trend >= cfg.distance {
                return Some(Interpretation::neutralized(
                    SignalDescription::ShortNeutralizedByEmaUptrend,
                ));
            }
        }
        None
    }
}
