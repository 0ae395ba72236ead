//! Classification replay (Keras and XGBoost up/down classifiers).

use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use super::{ForecastCache, Model, ModelConfig, ModelError, ModelKind};
use crate::data::CandlestickSet;
use crate::domain::{Prediction, PredictionMetadata, Timestamp};
use crate::interpreter::{Interpreter, InterpreterInput, Probability};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassificationModelConfig {
    pub id: String,
    pub lookback: usize,
    /// JSONL cache of `[up, down]` probability pairs.
    pub predictions: PathBuf,
    pub interpreter: Probability,
}

#[derive(Debug)]
pub struct ClassificationModel {
    kind: ModelKind,
    config: ClassificationModelConfig,
    interpreter: Interpreter,
    cache: ForecastCache,
}

impl ClassificationModel {
    pub fn new(
        kind: ModelKind,
        config: ClassificationModelConfig,
        cache: ForecastCache,
    ) -> Result<Self, ModelError> {
        if !kind.is_classification() {
            return Err(ModelError::InvalidConfig {
                model: config.id,
                reason: format!("{kind} is not a classification family"),
            });
        }
        let model = Self {
            kind,
            interpreter: Interpreter::Probability(config.interpreter),
            config,
            cache,
        };
        model.config().validate()?;
        Ok(model)
    }
}

impl Model for ClassificationModel {
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
        let probabilities = self
            .cache
            .get(last_ct)
            .ok_or_else(|| ModelError::MissingPrediction {
                model: self.config.id.clone(),
                last_ct,
            })?;
        let interpretation = self
            .interpreter
            .interpret(InterpreterInput::Probabilities(probabilities))?;
        // the interpreter has already checked the pair
        let (up, dp) = (probabilities[0], probabilities[1]);
        Ok(Prediction::new(
            interpretation.signal,
            timestamp,
            PredictionMetadata::Classification {
                d: interpretation.description.to_string(),
                up,
                dp,
            },
        ))
    }

    fn config(&self) -> ModelConfig {
        match self.kind {
            ModelKind::XgbClassification => ModelConfig::XgbClassification(self.config.clone()),
            _ => ModelConfig::KerasClassification(self.config.clone()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::flat_series;
    use crate::domain::Signal;

    const START: Timestamp = 1_640_995_200_000;

    fn setup(values: Vec<f64>) -> (CandlestickSet, Timestamp, ClassificationModel) {
        let (m, p, n) = flat_series(START, 10, 30, 100.0);
        let set = CandlestickSet::new(m, p, n, 4).unwrap();
        let ts = set.minute()[45].open_time;
        let (_, last_ct) = set.lookback_range(4, ts).unwrap();
        let mut cache = ForecastCache::new();
        cache.insert(last_ct, values);
        let model = ClassificationModel::new(
            ModelKind::XgbClassification,
            ClassificationModelConfig {
                id: "XGBC_UNIT".into(),
                lookback: 4,
                predictions: "xgbc.jsonl".into(),
                interpreter: Probability::new(0.6, 0.6).unwrap(),
            },
            cache,
        )
        .unwrap();
        (set, ts, model)
    }

    #[test]
    fn short_on_down_probability() {
        let (set, ts, model) = setup(vec![0.3, 0.7]);
        let prediction = model.predict(&set, ts).unwrap();
        assert_eq!(prediction.result, Signal::Short);
        assert_eq!(
            prediction.metadata,
            vec![PredictionMetadata::Classification {
                d: "short".into(),
                up: 0.3,
                dp: 0.7
            }]
        );
        assert!(matches!(model.config(), ModelConfig::XgbClassification(_)));
    }

    #[test]
    fn malformed_pair_is_an_error() {
        let (set, ts, model) = setup(vec![0.3, 0.5, 0.2]);
        assert!(matches!(
            model.predict(&set, ts),
            Err(ModelError::Interpreter(_))
        ));
    }
}
