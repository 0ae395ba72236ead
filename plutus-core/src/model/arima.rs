//! Legacy ARIMA path: cached forecast filtered by RSI and EMA vetoes.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::{ForecastCache, Model, ModelConfig, ModelError, ModelKind};
use crate::data::CandlestickSet;
use crate::domain::{Prediction, PredictionMetadata, Timestamp};
use crate::indicators::ema::{DEFAULT_LONG_EMA_PERIOD, DEFAULT_SHORT_EMA_PERIOD};
use crate::indicators::rsi::DEFAULT_RSI_PERIOD;
use crate::indicators::{Ema, Indicator, Rsi};
use crate::interpreter::{IndicatorReadings, IndicatorVeto, Interpreter, InterpreterInput};

fn default_rsi_period() -> usize {
    DEFAULT_RSI_PERIOD
}

fn default_short_ema_period() -> usize {
    DEFAULT_SHORT_EMA_PERIOD
}

fn default_long_ema_period() -> usize {
    DEFAULT_LONG_EMA_PERIOD
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArimaModelConfig {
    pub id: String,
    pub lookback: usize,
    pub predictions: PathBuf,
    pub interpreter: IndicatorVeto,
    #[serde(default = "default_rsi_period")]
    pub rsi_period: usize,
    #[serde(default = "default_short_ema_period")]
    pub short_ema_period: usize,
    #[serde(default = "default_long_ema_period")]
    pub long_ema_period: usize,
}

#[derive(Debug)]
pub struct ArimaModel {
    config: ArimaModelConfig,
    interpreter: Interpreter,
    cache: ForecastCache,
    rsi: Rsi,
    short_ema: Ema,
    long_ema: Ema,
}

impl ArimaModel {
    pub fn new(config: ArimaModelConfig, cache: ForecastCache) -> Result<Self, ModelError> {
        if config.short_ema_period >= config.long_ema_period {
            return Err(ModelError::InvalidConfig {
                model: config.id,
                reason: format!(
                    "short EMA period ({}) must be below the long EMA period ({})",
                    config.short_ema_period, config.long_ema_period
                ),
            });
        }
        let model = Self {
            interpreter: Interpreter::IndicatorVeto(config.interpreter),
            rsi: Rsi::new(config.rsi_period),
            short_ema: Ema::new(config.short_ema_period),
            long_ema: Ema::new(config.long_ema_period),
            config,
            cache,
        };
        model.config().validate()?;
        Ok(model)
    }
}

impl Model for ArimaModel {
    fn id(&self) -> &str {
        &self.config.id
    }

    fn kind(&self) -> ModelKind {
        ModelKind::Arima
    }

    fn lookback(&self) -> usize {
        self.config.lookback
    }

    fn predict(&self, candles: &CandlestickSet, timestamp: Timestamp) -> Result<Prediction, ModelError> {
        let window = candles.lookback_window(self.config.lookback, timestamp, false)?;
        let last_ct = window.last().map(|c| c.close_time).unwrap_or_default();
        let forecast = self
            .cache
            .get(last_ct)
            .ok_or_else(|| ModelError::MissingPrediction {
                model: self.config.id.clone(),
                last_ct,
            })?;

        // Windows shorter than an indicator's warmup leave that veto disabled.
        let readings = IndicatorReadings {
            rsi: self.rsi.last(window),
            short_ema: self.short_ema.last(window),
            long_ema: self.long_ema.last(window),
        };
        let interpretation = self.interpreter.interpret(InterpreterInput::Indicators {
            prices: forecast,
            readings,
        })?;

        Ok(Prediction::new(
            interpretation.signal,
            timestamp,
            PredictionMetadata::Legacy {
                d: interpretation.description.to_string(),
                pl: forecast.to_vec(),
                rsi: readings.rsi,
                sema: readings.short_ema,
                lema: readings.long_ema,
            },
        ))
    }

    fn config(&self) -> ModelConfig {
        ModelConfig::Arima(self.config.clone())
    }
}
