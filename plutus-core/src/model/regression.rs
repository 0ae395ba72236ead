//! Regression replay (Keras and XGBoost price forecasters).

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::{ForecastCache, Model, ModelConfig, ModelError, ModelKind};
use crate::data::CandlestickSet;
use crate::domain::{Prediction, PredictionMetadata, Timestamp};
use crate::interpreter::{Interpreter, InterpreterInput, PercentChange};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionModelConfig {
    pub id: String,
    pub lookback: usize,
    /// JSONL forecast cache.
    pub predictions: PathBuf,
    pub interpreter: PercentChange,
}

#[derive(Debug)]
pub struct RegressionModel {
    kind: ModelKind,
    config: RegressionModelConfig,
    interpreter: Interpreter,
    cache: ForecastCache,
}

impl RegressionModel {
    /// `kind` must be one of the regression families other than ARIMA.
    pub fn new(
        kind: ModelKind,
        config: RegressionModelConfig,
        cache: ForecastCache,
    ) -> Result<Self, ModelError> {
        if !matches!(kind, ModelKind::KerasRegression | ModelKind::XgbRegression) {
            return Err(ModelError::InvalidConfig {
                model: config.id,
                reason: format!("{kind} is not a regression replay family"),
            });
        }
        let model = Self {
            kind,
            interpreter: Interpreter::PercentChange(config.interpreter),
            config,
            cache,
        };
        model.config().validate()?;
        Ok(model)
    }
}

impl Model for RegressionModel {
    fn id(&self) -> &str {
        &self.config.id
    }

    fn kind(&self) -> ModelKind {
        self.kind
    }

    fn lookback(&self) -> usize {
        self.config.lookback
    }

    fn predict(&self, candles: &CandlestickSet, timestamp: Timestamp) -> Result<Prediction, ModelError> {
        let (_, last_ct) = candles.lookback_range(self.config.lookback, timestamp)?;
        let forecast = self
            .cache
            .get(last_ct)
            .ok_or_else(|| ModelError::MissingPrediction {
                model: self.config.id.clone(),
                last_ct,
            })?;
        let interpretation = self.interpreter.interpret(InterpreterInput::Prices(forecast))?;
        Ok(Prediction::new(
            interpretation.signal,
            timestamp,
            PredictionMetadata::Regression {
                d: interpretation.description.to_string(),
                npl: forecast.to_vec(),
            },
        ))
    }

    fn config(&self) -> ModelConfig {
        match self.kind {
            ModelKind::XgbRegression => ModelConfig::XgbRegression(self.config.clone()),
            _ => ModelConfig::KerasRegression(self.config.clone()),
        }
    }
}
