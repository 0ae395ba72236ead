//! BDD scenarios for the position ledger.
//!
//! Tests:
//! 1. Long hits take-profit on the next candle → win, +0.9
//! 2. Long hits stop-loss on the next candle → loss, -1.1
//! 3. A candle touching both exits closes at the stop-loss
//! 4. A non-touching candle leaves state untouched
//! 5. Shorts mirror the exit prices and the tie-break

use plutus_core::domain::{Candlestick, Prediction, PredictionMetadata, Signal};
use plutus_core::numbers::alter_by_percentage;
use plutus_core::position::{Position, PositionError};

// ──────────────────────────────────────────────
// Helpers
// ──────────────────────────────────────────────

const OPEN_TIME: i64 = 1_640_995_200_000;
const OPEN_PRICE: f64 = 40_050.85;

fn candle(minute: i64, open: f64, high: f64, low: f64) -> Candlestick {
    let open_time = OPEN_TIME + minute * 60_000;
    Candlestick {
        open_time,
        close_time: open_time + 59_999,
        open,
        high,
        low,
        close: open,
        volume: None,
    }
}

fn prediction(signal: Signal) -> Prediction {
    Prediction::new(signal, OPEN_TIME, PredictionMetadata::minimal(signal.to_string()))
}

/// GIVEN a 1% / 1% position with a long opened at 40050.85
fn opened(signal: Signal) -> Position {
    let mut position = Position::new(1.0, 1.0).unwrap();
    position
        .open(&candle(0, OPEN_PRICE, OPEN_PRICE, OPEN_PRICE), prediction(signal))
        .unwrap();
    position
}

// ──────────────────────────────────────────────
// Scenarios
// ──────────────────────────────────────────────

#[test]
fn long_take_profit_wins() {
    // GIVEN an open long
    let mut position = opened(Signal::Long);

    // WHEN the next candle's high rises 1%
    let high = alter_by_percentage(OPEN_PRICE, 1.0);
    let closed = position.check(&candle(1, OPEN_PRICE, high, OPEN_PRICE));

    // THEN the trade closes as a win worth the fee-adjusted reward
    assert!(closed);
    let performance = position.performance(0);
    assert_eq!(performance.points, 0.9);
    assert_eq!(performance.long_num, 1);
    assert_eq!(performance.long_acc, 100.0);
    assert!(performance.positions[0].outcome);
    assert_eq!(performance.positions[0].close_price, 40_451.36);
    assert_eq!(performance.points_hist, vec![0.0, 0.9]);
}

#[test]
fn long_stop_loss_loses() {
    // GIVEN an open long
    let mut position = opened(Signal::Long);

    // WHEN the next candle's low drops 1%
    let low = alter_by_percentage(OPEN_PRICE, -1.0);
    let closed = position.check(&candle(1, OPEN_PRICE, OPEN_PRICE, low));

    // THEN the trade closes as a loss worth the fee-adjusted penalty
    assert!(closed);
    let performance = position.performance(0);
    assert_eq!(performance.points, -1.1);
    assert_eq!(performance.long_num, 1);
    assert_eq!(performance.long_acc, 0.0);
    assert_eq!(performance.positions[0].close_price, 39_650.34);
}

#[test]
fn same_candle_touching_both_exits_is_a_loss() {
    // GIVEN an open long
    let mut position = opened(Signal::Long);

    // WHEN one wide candle touches both the take-profit and the stop-loss
    let closed = position.check(&candle(1, OPEN_PRICE, 41_000.0, 39_000.0));

    // THEN the stop-loss wins
    assert!(closed);
    assert!(!position.positions()[0].outcome);
    assert_eq!(position.last_points(), -1.1);
}

#[test]
fn non_touching_candle_changes_nothing() {
    // GIVEN an open long
    let mut position = opened(Signal::Long);
    let before = position.clone();

    // WHEN a candle stays inside both exits
    let closed = position.check(&candle(1, OPEN_PRICE, OPEN_PRICE + 10.0, OPEN_PRICE - 10.0));

    // THEN nothing closes and the state is unchanged
    assert!(!closed);
    assert_eq!(position, before);
    assert!(position.is_active());
}

#[test]
fn short_mirrors_exits_and_tie_break() {
    // GIVEN an open short
    let mut position = opened(Signal::Short);
    let active = position.active().unwrap();
    assert_eq!(active.take_profit_price, 39_650.34);
    assert_eq!(active.stop_loss_price, 40_451.36);

    // WHEN a candle touches both exits
    let closed = position.check(&candle(1, OPEN_PRICE, 41_000.0, 39_000.0));

    // THEN the short is stopped out
    assert!(closed);
    let performance = position.performance(3);
    assert_eq!(performance.short_num, 1);
    assert_eq!(performance.short_acc, 0.0);
    assert_eq!(performance.neutral_num, 3);
    assert_eq!(performance.points, -1.1);
}

#[test]
fn second_open_is_rejected() {
    // GIVEN an open long
    let mut position = opened(Signal::Long);

    // WHEN another open is attempted
    let result = position.open(&candle(1, OPEN_PRICE, OPEN_PRICE, OPEN_PRICE), prediction(Signal::Short));

    // THEN it fails and the original trade stays
    assert!(matches!(result, Err(PositionError::AlreadyActive { .. })));
    assert_eq!(position.active().unwrap().side, Signal::Long);
}

#[test]
fn ledger_accumulates_across_trades() {
    // GIVEN a win followed by a loss
    let mut position = opened(Signal::Long);
    position.check(&candle(1, OPEN_PRICE, 41_000.0, OPEN_PRICE));
    position
        .open(&candle(2, OPEN_PRICE, OPEN_PRICE, OPEN_PRICE), prediction(Signal::Long))
        .unwrap();
    position.check(&candle(3, OPEN_PRICE, OPEN_PRICE, 39_000.0));

    // THEN the ledger is cumulative and one longer than the trade list
    let performance = position.performance(0);
    assert_eq!(performance.points_hist, vec![0.0, 0.9, -0.2]);
    assert_eq!(performance.positions.len() + 1, performance.points_hist.len());
    assert_eq!(performance.positions[1].points, -0.2);
    assert_eq!(performance.general_acc, 50.0);
}
