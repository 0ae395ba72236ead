//! Consensus model: sub-model votes reduced by the consensus interpreter.

use serde::{Deserialize, Serialize};
use tracing::warn;

use super::{Model, ModelConfig, ModelError, ModelKind, PredictionMemo};
use crate::data::CandlestickSet;
use crate::domain::{Prediction, Signal, Timestamp};
use crate::interpreter::{Consensus, Interpreter, InterpreterInput};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConsensusModelConfig {
    pub id: String,
    pub min_consensus: usize,
    pub models: Vec<ModelConfig>,
}

/// Each member keeps its own memo, keyed by the member's lookback range, so
/// a member whose window did not move is never asked twice.
pub struct ConsensusModel {
    id: String,
    interpreter: Interpreter,
    members: Vec<(Box<dyn Model>, PredictionMemo)>,
    lookback: usize,
}

impl ConsensusModel {
    pub fn new(
        id: impl Into<String>,
        min_consensus: usize,
        models: Vec<Box<dyn Model>>,
    ) -> Result<Self, ModelError> {
        let id = id.into();
        let consensus = Consensus::for_votes(min_consensus, models.len()).map_err(|e| {
            ModelError::InvalidConfig {
                model: id.clone(),
                reason: e.to_string(),
            }
        })?;
        let lookback = models.iter().map(|m| m.lookback()).max().unwrap_or(0);
        Ok(Self {
            id,
            interpreter: Interpreter::Consensus(consensus),
            members: models.into_iter().map(|m| (m, PredictionMemo::new())).collect(),
            lookback,
        })
    }

    fn min_consensus(&self) -> usize {
        match self.interpreter {
            Interpreter::Consensus(c) => c.min_consensus,
            _ => 0,
        }
    }

    fn member_prediction(
        &self,
        model: &dyn Model,
        memo: &PredictionMemo,
        candles: &CandlestickSet,
        timestamp: Timestamp,
    ) -> Result<Prediction, ModelError> {
        let range = candles.lookback_range(model.lookback(), timestamp)?;
        Ok(memo.get_or_insert_with(range, || {
            model.predict(candles, timestamp).unwrap_or_else(|e| {
                warn!(consensus = %self.id, model = model.id(), error = %e, "member prediction failed, voting neutral");
                Prediction::neutral_due_to_error(timestamp, e)
            })
        }))
    }
}

impl std::fmt::Debug for ConsensusModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConsensusModel")
            .field("id", &self.id)
            .field("min_consensus", &self.min_consensus())
            .field("members", &self.members.iter().map(|(m, _)| m.id()).collect::<Vec<_>>())
            .finish()
    }
}

impl Model for ConsensusModel {
    fn id(&self) -> &str {
        &self.id
    }

    fn kind(&self) -> ModelKind {
        ModelKind::Consensus
    }

    fn lookback(&self) -> usize {
        self.lookback
    }

    fn predict(&self, candles: &CandlestickSet, timestamp: Timestamp) -> Result<Prediction, ModelError> {
        let mut votes: Vec<Signal> = Vec::with_capacity(self.members.len());
        let mut metadata = Vec::with_capacity(self.members.len());
        for (model, memo) in &self.members {
            let prediction = self.member_prediction(model.as_ref(), memo, candles, timestamp)?;
            votes.push(prediction.result);
            metadata.extend(prediction.metadata);
        }
        let interpretation = self.interpreter.interpret(InterpreterInput::Votes(&votes))?;
        Ok(Prediction {
            result: interpretation.signal,
            timestamp,
            metadata,
        })
    }

    fn config(&self) -> ModelConfig {
        ModelConfig::Consensus(ConsensusModelConfig {
            id: self.id.clone(),
            min_consensus: self.min_consensus(),
            models: self.members.iter().map(|(m, _)| m.config()).collect(),
        })
    }
}
