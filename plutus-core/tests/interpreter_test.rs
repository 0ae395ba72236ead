//! Integration tests for the interpreter enum as configured from JSON.
//!
//! Tests:
//! 1. Tagged configs deserialize and dispatch to the matching variant
//! 2. Threshold edges are inclusive
//! 3. Mismatched inputs are rejected rather than guessed at
//! 4. Consensus three-of-five scenario

use plutus_core::domain::Signal;
use plutus_core::interpreter::{
    IndicatorReadings, Interpreter, InterpreterError, InterpreterInput, SignalDescription,
};
use plutus_core::numbers::alter_by_percentage;

fn parse(json: serde_json::Value) -> Interpreter {
    let interpreter: Interpreter = serde_json::from_value(json).unwrap();
    interpreter.validate().unwrap();
    interpreter
}

fn forecast(change: f64) -> Vec<f64> {
    vec![100.0, 100.5, 99.5, 100.2, alter_by_percentage(100.0, change)]
}

#[test]
fn percent_change_threshold_is_inclusive() {
    let interpreter = parse(serde_json::json!({"type": "percent_change", "long": 1.5, "short": 2.0}));
    let at_long = interpreter.interpret(InterpreterInput::Prices(&forecast(1.5))).unwrap();
    let at_short = interpreter.interpret(InterpreterInput::Prices(&forecast(-2.0))).unwrap();
    let between = interpreter.interpret(InterpreterInput::Prices(&forecast(-1.99))).unwrap();
    assert_eq!(at_long.signal, Signal::Long);
    assert_eq!(at_short.signal, Signal::Short);
    assert_eq!(between.signal, Signal::Neutral);
    assert_eq!(between.description, SignalDescription::Neutral);
}

#[test]
fn percent_change_tie_rounds_to_even_before_the_threshold() {
    // GIVEN a 0.13% long threshold and a move of exactly 0.125%
    let interpreter = parse(serde_json::json!({"type": "percent_change", "long": 0.13, "short": 1.0}));
    let prices = [800.0, 800.0, 800.0, 800.0, 801.0];

    // WHEN it is interpreted
    let result = interpreter.interpret(InterpreterInput::Prices(&prices)).unwrap();

    // THEN the change rounds down to 0.12 and stays neutral
    assert_eq!(result.signal, Signal::Neutral);
}

#[test]
fn probability_up_checked_first() {
    let interpreter = parse(serde_json::json!({
        "type": "probability",
        "min_increase_probability": 0.55,
        "min_decrease_probability": 0.55
    }));
    // Both thresholds met
    let both = interpreter
        .interpret(InterpreterInput::Probabilities(&[0.6, 0.6]))
        .unwrap();
    assert_eq!(both.signal, Signal::Long);
}

#[test]
fn probability_threshold_range() {
    let json = serde_json::json!({
        "type": "probability",
        "min_increase_probability": 0.99,
        "min_decrease_probability": 0.6
    });
    let interpreter: Interpreter = serde_json::from_value(json).unwrap();
    assert!(matches!(
        interpreter.validate(),
        Err(InterpreterError::ThresholdOutOfRange { .. })
    ));
}

#[test]
fn consensus_three_of_five() {
    let interpreter = parse(serde_json::json!({"type": "consensus", "min_consensus": 3}));
    let votes = [Signal::Long, Signal::Long, Signal::Long, Signal::Short, Signal::Short];
    let result = interpreter.interpret(InterpreterInput::Votes(&votes)).unwrap();
    assert_eq!(result.signal, Signal::Long);
}

#[test]
fn consensus_without_majority_rejects_votes() {
    // GIVEN a deserialized consensus of 2 that passes standalone validation
    let interpreter = parse(serde_json::json!({"type": "consensus", "min_consensus": 2}));
    assert!(interpreter.validate().is_ok());

    // WHEN it is handed 4 votes, where 2 is no majority
    let votes = [Signal::Long, Signal::Long, Signal::Short, Signal::Short];
    let result = interpreter.interpret(InterpreterInput::Votes(&votes));

    // THEN the threshold is rejected instead of picking a side
    assert_eq!(
        result,
        Err(InterpreterError::NoMajority {
            min_consensus: 2,
            total: 4
        })
    );
}

#[test]
fn indicator_veto_from_json() {
    let interpreter = parse(serde_json::json!({
        "type": "indicator_veto",
        "min_increase_change": 1.0,
        "min_decrease_change": 1.0,
        "rsi": {"overbought": 70.0, "oversold": 30.0},
        "ema": {"distance": 0.5}
    }));
    let prices = forecast(-3.0);
    let oversold = IndicatorReadings {
        rsi: Some(25.0),
        ..IndicatorReadings::default()
    };
    let vetoed = interpreter
        .interpret(InterpreterInput::Indicators {
            prices: &prices,
            readings: oversold,
        })
        .unwrap();
    assert_eq!(vetoed.signal, Signal::Neutral);
    assert_eq!(vetoed.description.as_str(), "short-neutralized-by-rsi-oversold");

    // Missing readings leave the base signal alone.
    let plain = interpreter.interpret(InterpreterInput::Prices(&prices)).unwrap();
    assert_eq!(plain.signal, Signal::Short);
}

#[test]
fn mismatched_input_is_rejected() {
    let interpreter = parse(serde_json::json!({"type": "consensus", "min_consensus": 2}));
    let err = interpreter
        .interpret(InterpreterInput::Prices(&forecast(5.0)))
        .unwrap_err();
    assert!(matches!(err, InterpreterError::InputMismatch { .. }));
}

#[test]
fn too_few_predictions() {
    let interpreter = parse(serde_json::json!({"type": "percent_change", "long": 1.0, "short": 1.0}));
    let err = interpreter
        .interpret(InterpreterInput::Prices(&[100.0, 101.0, 102.0]))
        .unwrap_err();
    assert_eq!(
        err,
        InterpreterError::InsufficientPredictions {
            required: 5,
            received: 3
        }
    );
}
