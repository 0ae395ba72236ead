//! Predictions and the ternary trading signal.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::Timestamp;

/// Ternary trading signal. Persisted as `1`, `0` or `-1`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(into = "i8", try_from = "i8")]
pub enum Signal {
    Long,
    Neutral,
    Short,
}

/// Raised when decoding a signal from an integer outside `{-1, 0, 1}`.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid signal value {0} (expected -1, 0 or 1)")]
pub struct SignalError(pub i64);

impl Signal {
    pub fn as_i8(self) -> i8 {
        match self {
            Signal::Long => 1,
            Signal::Neutral => 0,
            Signal::Short => -1,
        }
    }

    pub fn is_neutral(self) -> bool {
        self == Signal::Neutral
    }
}

impl From<Signal> for i8 {
    fn from(signal: Signal) -> Self {
        signal.as_i8()
    }
}

impl TryFrom<i8> for Signal {
    type Error = SignalError;

    fn try_from(value: i8) -> Result<Self, Self::Error> {
        Signal::try_from(i64::from(value))
    }
}

impl TryFrom<i64> for Signal {
    type Error = SignalError;

    fn try_from(value: i64) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Signal::Long),
            0 => Ok(Signal::Neutral),
            -1 => Ok(Signal::Short),
            other => Err(SignalError(other)),
        }
    }
}

impl std::fmt::Display for Signal {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Signal::Long => write!(f, "long"),
            Signal::Neutral => write!(f, "neutral"),
            Signal::Short => write!(f, "short"),
        }
    }
}

/// Inspection payload attached to a prediction. Never read by control flow.
///
/// Variants are distinguished by which keys are present, most specific first,
/// so a bare `{ "d": ... }` object always decodes as `Minimal`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PredictionMetadata {
    /// Legacy indicator-veto path: forecast list plus the indicator readings.
    Legacy {
        d: String,
        pl: Vec<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        rsi: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        sema: Option<f64>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        lema: Option<f64>,
    },
    /// Regression forecast (normalized prediction list).
    Regression { d: String, npl: Vec<f64> },
    /// Classification probabilities.
    Classification { d: String, up: f64, dp: f64 },
    /// Description only.
    Minimal { d: String },
}

impl PredictionMetadata {
    pub fn minimal(description: impl Into<String>) -> Self {
        PredictionMetadata::Minimal {
            d: description.into(),
        }
    }

    pub fn description(&self) -> &str {
        match self {
            PredictionMetadata::Legacy { d, .. }
            | PredictionMetadata::Regression { d, .. }
            | PredictionMetadata::Classification { d, .. }
            | PredictionMetadata::Minimal { d } => d,
        }
    }

    /// Reduce to the description only.
    pub fn minimized(&self) -> Self {
        PredictionMetadata::minimal(self.description())
    }
}

/// Output of a model at one timestamp.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Prediction {
    #[serde(rename = "r")]
    pub result: Signal,
    #[serde(rename = "t")]
    pub timestamp: Timestamp,
    #[serde(rename = "md", default)]
    pub metadata: Vec<PredictionMetadata>,
}

/// Prefix of the description attached to predictions degraded by a model error.
pub const NEUTRAL_DUE_TO_ERROR: &str = "neutral-due-to-error";

impl Prediction {
    pub fn new(result: Signal, timestamp: Timestamp, metadata: PredictionMetadata) -> Self {
        Self {
            result,
            timestamp,
            metadata: vec![metadata],
        }
    }

    /// Neutral prediction standing in for a model that could not produce a signal.
    pub fn neutral_due_to_error(timestamp: Timestamp, message: impl std::fmt::Display) -> Self {
        Self::new(
            Signal::Neutral,
            timestamp,
            PredictionMetadata::minimal(format!("{NEUTRAL_DUE_TO_ERROR}: {message}")),
        )
    }

    /// Same prediction with every metadata item reduced to its description.
    pub fn minimized(&self) -> Self {
        Self {
            result: self.result,
            timestamp: self.timestamp,
            metadata: self.metadata.iter().map(|m| m.minimized()).collect(),
        }
    }
}
