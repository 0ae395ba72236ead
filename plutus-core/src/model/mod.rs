//! Models: anything that turns a timestamp into a prediction.
//!
//! Model internals (ARIMA fits, Keras and XGBoost weights) live outside this
//! workspace. Their outputs reach the engine as forecast caches keyed by the
//! close time of the last candle in the lookback window; the models here
//! replay those outputs through the matching interpreter.
//!
//! The family is carried as structured data (`ModelKind`), never recovered
//! from the model id.

pub mod arima;
pub mod cache;
pub mod classification;
pub mod consensus;
pub mod regression;

pub use arima::{ArimaModel, ArimaModelConfig};
pub use cache::{ForecastCache, ForecastEntry, PredictionMemo};
pub use classification::{ClassificationModel, ClassificationModelConfig};
pub use consensus::{ConsensusModel, ConsensusModelConfig};
pub use regression::{RegressionModel, RegressionModelConfig};

use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::data::{CandlestickSet, DataError};
use crate::domain::{Prediction, Timestamp};
use crate::interpreter::{Interpreter, InterpreterError};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("data error: {0}")]
    Data(#[from] DataError),

    #[error("interpreter error: {0}")]
    Interpreter(#[from] InterpreterError),

    #[error("model '{model}' has no cached prediction for the window closing at {last_ct}")]
    MissingPrediction { model: String, last_ct: Timestamp },

    #[error("invalid model '{model}': {reason}")]
    InvalidConfig { model: String, reason: String },
}

/// Model family.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ModelKind {
    Arima,
    KerasRegression,
    XgbRegression,
    KerasClassification,
    XgbClassification,
    Consensus,
}

impl ModelKind {
    pub fn is_regression(self) -> bool {
        matches!(
            self,
            ModelKind::Arima | ModelKind::KerasRegression | ModelKind::XgbRegression
        )
    }

    pub fn is_classification(self) -> bool {
        matches!(
            self,
            ModelKind::KerasClassification | ModelKind::XgbClassification
        )
    }
}

impl std::fmt::Display for ModelKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ModelKind::Arima => "arima",
            ModelKind::KerasRegression => "keras_regression",
            ModelKind::XgbRegression => "xgb_regression",
            ModelKind::KerasClassification => "keras_classification",
            ModelKind::XgbClassification => "xgb_classification",
            ModelKind::Consensus => "consensus",
        };
        f.write_str(name)
    }
}

/// A prediction source the backtest runner can drive.
pub trait Model: Send + Sync {
    fn id(&self) -> &str;

    fn kind(&self) -> ModelKind;

    /// Number of prediction candles the model looks back on.
    fn lookback(&self) -> usize;

    /// Predict at `timestamp` (the open time of the current 1-minute candle).
    fn predict(&self, candles: &CandlestickSet, timestamp: Timestamp) -> Result<Prediction, ModelError>;

    /// Serializable description, persisted with every backtest result.
    fn config(&self) -> ModelConfig;
}

/// Model configuration (serializable enum).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelConfig {
    Arima(ArimaModelConfig),
    KerasRegression(RegressionModelConfig),
    XgbRegression(RegressionModelConfig),
    KerasClassification(ClassificationModelConfig),
    XgbClassification(ClassificationModelConfig),
    Consensus(ConsensusModelConfig),
}

impl ModelConfig {
    pub fn id(&self) -> &str {
        match self {
            ModelConfig::Arima(c) => &c.id,
            ModelConfig::KerasRegression(c) | ModelConfig::XgbRegression(c) => &c.id,
            ModelConfig::KerasClassification(c) | ModelConfig::XgbClassification(c) => &c.id,
            ModelConfig::Consensus(c) => &c.id,
        }
    }

    pub fn kind(&self) -> ModelKind {
        match self {
            ModelConfig::Arima(_) => ModelKind::Arima,
            ModelConfig::KerasRegression(_) => ModelKind::KerasRegression,
            ModelConfig::XgbRegression(_) => ModelKind::XgbRegression,
            ModelConfig::KerasClassification(_) => ModelKind::KerasClassification,
            ModelConfig::XgbClassification(_) => ModelKind::XgbClassification,
            ModelConfig::Consensus(_) => ModelKind::Consensus,
        }
    }

    /// Lookback of the model; a consensus looks back as far as its widest member.
    pub fn lookback(&self) -> usize {
        match self {
            ModelConfig::Arima(c) => c.lookback,
            ModelConfig::KerasRegression(c) | ModelConfig::XgbRegression(c) => c.lookback,
            ModelConfig::KerasClassification(c) | ModelConfig::XgbClassification(c) => c.lookback,
            ModelConfig::Consensus(c) => c.models.iter().map(|m| m.lookback()).max().unwrap_or(0),
        }
    }

    pub fn interpreter(&self) -> Interpreter {
        match self {
            ModelConfig::Arima(c) => Interpreter::IndicatorVeto(c.interpreter),
            ModelConfig::KerasRegression(c) | ModelConfig::XgbRegression(c) => {
                Interpreter::PercentChange(c.interpreter)
            }
            ModelConfig::KerasClassification(c) | ModelConfig::XgbClassification(c) => {
                Interpreter::Probability(c.interpreter)
            }
            ModelConfig::Consensus(c) => Interpreter::Consensus(crate::interpreter::Consensus {
                min_consensus: c.min_consensus,
            }),
        }
    }

    /// Forecast cache files this model (and its members) replay.
    pub fn prediction_files(&self) -> Vec<&Path> {
        match self {
            ModelConfig::Arima(c) => vec![c.predictions.as_path()],
            ModelConfig::KerasRegression(c) | ModelConfig::XgbRegression(c) => {
                vec![c.predictions.as_path()]
            }
            ModelConfig::KerasClassification(c) | ModelConfig::XgbClassification(c) => {
                vec![c.predictions.as_path()]
            }
            ModelConfig::Consensus(c) => c.models.iter().flat_map(|m| m.prediction_files()).collect(),
        }
    }

    /// Check lookbacks, interpreter thresholds and consensus membership.
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.id().trim().is_empty() {
            return Err(self.invalid("model id must not be empty"));
        }
        if self.lookback() == 0 {
            return Err(self.invalid("lookback must be at least 1"));
        }
        match self {
            ModelConfig::Consensus(c) => {
                crate::interpreter::Consensus::for_votes(c.min_consensus, c.models.len())
                    .map_err(|e| self.invalid(e.to_string()))?;
                for member in &c.models {
                    member.validate()?;
                }
                Ok(())
            }
            _ => self
                .interpreter()
                .validate()
                .map_err(|e| self.invalid(e.to_string())),
        }
    }

    fn invalid(&self, reason: impl Into<String>) -> ModelError {
        ModelError::InvalidConfig {
            model: self.id().to_string(),
            reason: reason.into(),
        }
    }
}
