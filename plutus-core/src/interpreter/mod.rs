//! Signal interpretation: raw model output in, ternary signal out.
//!
//! Interpreters are pure: the same input always yields the same
//! `(signal, description)` pair. Thresholds are inclusive everywhere, so a
//! value sitting exactly on a threshold counts as a signal.
//!
//! Four variants share one contract:
//! - `PercentChange`: forecast price list → change between first and last
//! - `Probability`: `[up, down]` probability pair
//! - `Consensus`: sub-model votes
//! - `IndicatorVeto`: percent change, then vetoed by RSI and EMA trend

pub mod consensus;
pub mod indicator_veto;
pub mod percent_change;
pub mod probability;

pub use consensus::Consensus;
pub use indicator_veto::{EmaVeto, IndicatorReadings, IndicatorVeto, RsiVeto};
pub use percent_change::PercentChange;
pub use probability::Probability;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::Signal;

/// Errors raised while building or applying an interpreter.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum InterpreterError {
    #[error("{name} must be >= {min} (received {value})")]
    ThresholdTooLow {
        name: &'static str,
        value: f64,
        min: f64,
    },

    #[error("{name} must be within [{min}, {max}) (received {value})")]
    ThresholdOutOfRange {
        name: &'static str,
        value: f64,
        min: f64,
        max: f64,
    },

    #[error("an interpretation requires a minimum of {required} predictions (received {received})")]
    InsufficientPredictions { required: usize, received: usize },

    #[error("a probability interpretation requires exactly [up, down] (received {received} values)")]
    InvalidProbabilities { received: usize },

    #[error("min_consensus {min_consensus} does not represent a majority of {total} votes")]
    NoMajority { min_consensus: usize, total: usize },

    #[error("a consensus requires at least 2 votes (received {0})")]
    TooFewVotes(usize),

    #[error("invalid {name}: {reason}")]
    InvalidIndicatorConfig { name: &'static str, reason: String },

    #[error("{interpreter} interpreter cannot read {input} input")]
    InputMismatch {
        interpreter: &'static str,
        input: &'static str,
    },
}

/// Exact description taxonomy attached to every interpretation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum SignalDescription {
    Long,
    Short,
    Neutral,
    LongNeutralizedByRsiOverbought,
    ShortNeutralizedByRsiOversold,
    LongNeutralizedByEmaDowntrend,
    ShortNeutralizedByEmaUptrend,
}

impl SignalDescription {
    pub fn as_str(&self) -> &'static str {
        match self {
            SignalDescription::Long => "long",
            SignalDescription::Short => "short",
            SignalDescription::Neutral => "neutral",
            SignalDescription::LongNeutralizedByRsiOverbought => {
                "long-neutralized-by-rsi-overbought"
            }
            SignalDescription::ShortNeutralizedByRsiOversold => "short-neutralized-by-rsi-oversold",
            SignalDescription::LongNeutralizedByEmaDowntrend => "long-neutralized-by-ema-downtrend",
            SignalDescription::ShortNeutralizedByEmaUptrend => "short-neutralized-by-ema-uptrend",
        }
    }
}

impl std::fmt::Display for SignalDescription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Result of an interpretation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Interpretation {
    pub signal: Signal,
    pub description: SignalDescription,
}

impl Interpretation {
    pub fn long() -> Self {
        Self {
            signal: Signal::Long,
            description: SignalDescription::Long,
        }
    }

    pub fn short() -> Self {
        Self {
            signal: Signal::Short,
            description: SignalDescription::Short,
        }
    }

    pub fn neutral() -> Self {
        Self::neutralized(SignalDescription::Neutral)
    }

    /// Neutral signal carrying the reason it was neutralized.
    pub fn neutralized(description: SignalDescription) -> Self {
        Self {
            signal: Signal::Neutral,
            description,
        }
    }
}

/// Raw model output handed to an interpreter.
#[derive(Debug, Clone, Copy)]
pub enum InterpreterInput<'a> {
    /// Forecast price list, first element is the reference price.
    Prices(&'a [f64]),
    /// `[up, down]` probabilities.
    Probabilities(&'a [f64]),
    /// Signed sub-model votes.
    Votes(&'a [Signal]),
    /// Forecast price list plus optional indicator readings.
    Indicators {
        prices: &'a [f64],
        readings: IndicatorReadings,
    },
}

impl InterpreterInput<'_> {
    fn kind(&self) -> &'static str {
        match self {
            InterpreterInput::Prices(_) => "prices",
            InterpreterInput::Probabilities(_) => "probabilities",
            InterpreterInput::Votes(_) => "votes",
            InterpreterInput::Indicators { .. } => "indicators",
        }
    }
}

/// Interpreter configuration (serializable enum).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Interpreter {
    PercentChange(PercentChange),
    Probability(Probability),
    Consensus(Consensus),
    IndicatorVeto(IndicatorVeto),
}

impl Interpreter {
    pub fn name(&self) -> &'static str {
        match self {
            Interpreter::PercentChange(_) => "percent_change",
            Interpreter::Probability(_) => "probability",
            Interpreter::Consensus(_) => "consensus",
            Interpreter::IndicatorVeto(_) => "indicator_veto",
        }
    }

    /// Check thresholds. Deserialized configs must pass this before use.
    ///
    /// A consensus threshold is checked against its vote count when votes
    /// are interpreted.
    pub fn validate(&self) -> Result<(), InterpreterError> {
        match self {
            Interpreter::PercentChange(i) => i.validate(),
            Interpreter::Probability(i) => i.validate(),
            Interpreter::Consensus(i) => i.validate(),
            Interpreter::IndicatorVeto(i) => i.validate(),
        }
    }

    pub fn interpret(&self, input: InterpreterInput<'_>) -> Result<Interpretation, InterpreterError> {
        match (self, input) {
            (Interpreter::PercentChange(i), InterpreterInput::Prices(prices)) => i.interpret(prices),
            (Interpreter::PercentChange(i), InterpreterInput::Indicators { prices, .. }) => {
                i.interpret(prices)
            }
            (Interpreter::Probability(i), InterpreterInput::Probabilities(p)) => i.interpret(p),
            (Interpreter::Consensus(i), InterpreterInput::Votes(votes)) => {
                i.validate_votes(votes.len())?;
                Ok(i.interpret(votes))
            }
            (Interpreter::IndicatorVeto(i), InterpreterInput::Indicators { prices, readings }) => {
                i.interpret(prices, readings)
            }
            (Interpreter::IndicatorVeto(i), InterpreterInput::Prices(prices)) => {
                i.interpret(prices, IndicatorReadings::default())
            }
            (interpreter, input) => Err(InterpreterError::InputMismatch {
                interpreter: interpreter.name(),
                input: input.kind(),
            }),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn description_strings_match_taxonomy() {
        assert_eq!(
            SignalDescription::LongNeutralizedByRsiOverbought.to_string(),
            "long-neutralized-by-rsi-overbought"
        );
        assert_eq!(
            serde_json::to_string(&SignalDescription::ShortNeutralizedByEmaUptrend).unwrap(),
            "\"short-neutralized-by-ema-uptrend\""
        );
        assert_eq!(
            serde_json::to_string(&SignalDescription::LongNeutralizedByEmaDowntrend).unwrap(),
            format!("\"{}\"", SignalDescription::LongNeutralizedByEmaDowntrend.as_str())
        );
    }

    #[test]
    fn interpreter_config_is_tagged() {
        let toml_like = serde_json::json!({
            "type": "percent_change",
            "long": 0.5,
            "short": 0.75
        });
        let interpreter: Interpreter = serde_json::from_value(toml_like).unwrap();
        assert_eq!(
            interpreter,
            Interpreter::PercentChange(PercentChange {
                min_increase_change: 0.5,
                min_decrease_change: 0.75,
            })
        );
        assert!(interpreter.validate().is_ok());
    }

    #[test]
    fn mismatched_input_is_an_error() {
        let interpreter = Interpreter::Probability(Probability::new(0.6, 0.6).unwrap());
        let err = interpreter
            .interpret(InterpreterInput::Votes(&[Signal::Long]))
            .unwrap_err();
        assert_eq!(
            err,
            InterpreterError::InputMismatch {
                interpreter: "probability",
                input: "votes"
            }
        );
    }

    #[test]
    fn dispatches_to_variant() {
        let interpreter = Interpreter::Consensus(Consensus::new(2).unwrap());
        let out = interpreter
            .interpret(InterpreterInput::Votes(&[Signal::Short, Signal::Short, Signal::Long]))
            .unwrap();
        assert_eq!(out, Interpretation::short());
    }
}
