//! Position: single-trade state machine and points ledger.
//!
//! One `Position` tracks at most one active trade. A trade opens on a
//! non-neutral prediction and closes the instant a later candle touches its
//! take-profit or stop-loss price. When a single candle touches both, the
//! stop-loss wins: performance is never overstated by intrabar ordering we
//! cannot observe.
//!
//! Each close appends one entry to the points ledger, rounded to 2 decimals
//! at that step, so `points.len() == positions.len() + 1` always holds.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::domain::{Candlestick, PerformanceRecord, PositionRecord, Prediction, Signal, Timestamp};
use crate::numbers::{alter_by_percentage, median, percentage_out_of_total, round2};

/// Simulated exchange fee, as a percentage of the exit percentages.
pub const FEE: f64 = 10.0;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum PositionError {
    #[error("cannot open a position while another one is active (opened at {open_time})")]
    AlreadyActive { open_time: Timestamp },

    #[error("cannot open a position from a neutral prediction (t = {timestamp})")]
    NeutralPrediction { timestamp: Timestamp },

    #[error("{name} must be a positive percentage (received {value})")]
    InvalidPercentage { name: &'static str, value: f64 },
}

/// The open trade. Exit prices are fixed at open.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivePosition {
    pub side: Signal,
    pub prediction: Prediction,
    pub open_time: Timestamp,
    pub open_price: f64,
    pub take_profit_price: f64,
    pub stop_loss_price: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Position {
    take_profit: f64,
    stop_loss: f64,
    reward: f64,
    penalty: f64,
    points: Vec<f64>,
    active: Option<ActivePosition>,
    positions: Vec<PositionRecord>,
    long_num: usize,
    successful_long_num: usize,
    short_num: usize,
    successful_short_num: usize,
}

impl Position {
    /// `take_profit` and `stop_loss` are percentages (1.0 = 1%).
    pub fn new(take_profit: f64, stop_loss: f64) -> Result<Self, PositionError> {
        for (name, value) in [("take_profit", take_profit), ("stop_loss", stop_loss)] {
            if value.is_nan() || value <= 0.0 {
                return Err(PositionError::InvalidPercentage { name, value });
            }
        }
        Ok(Self {
            take_profit,
            stop_loss,
            reward: alter_by_percentage(take_profit, -FEE),
            penalty: alter_by_percentage(stop_loss, FEE),
            points: vec![0.0],
            active: None,
            positions: Vec::new(),
            long_num: 0,
            successful_long_num: 0,
            short_num: 0,
            successful_short_num: 0,
        })
    }

    /// Points added by a successful position.
    pub fn reward(&self) -> f64 {
        self.reward
    }

    /// Points deducted by an unsuccessful position (positive magnitude).
    pub fn penalty(&self) -> f64 {
        self.penalty
    }

    pub fn active(&self) -> Option<&ActivePosition> {
        self.active.as_ref()
    }

    pub fn is_active(&self) -> bool {
        self.active.is_some()
    }

    pub fn points(&self) -> &[f64] {
        &self.points
    }

    /// Current ledger value.
    pub fn last_points(&self) -> f64 {
        self.points.last().copied().unwrap_or(0.0)
    }

    pub fn positions(&self) -> &[PositionRecord] {
        &self.positions
    }

    pub fn long_num(&self) -> usize {
        self.long_num
    }

    pub fn short_num(&self) -> usize {
        self.short_num
    }

    /// Take-profit and stop-loss prices for a trade opened at `open_price`.
    pub fn exit_prices(&self, side: Signal, open_price: f64) -> (f64, f64) {
        match side {
            Signal::Short => (
                alter_by_percentage(open_price, -self.take_profit),
                alter_by_percentage(open_price, self.stop_loss),
            ),
            _ => (
                alter_by_percentage(open_price, self.take_profit),
                alter_by_percentage(open_price, -self.stop_loss),
            ),
        }
    }

    /// Open a trade at the candle's open price.
    pub fn open(&mut self, candle: &Candlestick, prediction: Prediction) -> Result<(), PositionError> {
        if let Some(active) = &self.active {
            return Err(PositionError::AlreadyActive {
                open_time: active.open_time,
            });
        }
        if prediction.result.is_neutral() {
            return Err(PositionError::NeutralPrediction {
                timestamp: prediction.timestamp,
            });
        }
        let side = prediction.result;
        let (take_profit_price, stop_loss_price) = self.exit_prices(side, candle.open);
        tracing::debug!(
            side = %side,
            open_time = candle.open_time,
            open_price = candle.open,
            take_profit_price,
            stop_loss_price,
            "position opened"
        );
        self.active = Some(ActivePosition {
            side,
            prediction,
            open_time: candle.open_time,
            open_price: candle.open,
            take_profit_price,
            stop_loss_price,
        });
        Ok(())
    }

    /// Check the active trade against the candle's high and low.
    ///
    /// Returns `true` if the trade was closed. With no active trade, or when
    /// neither exit price is touched, returns `false` and changes nothing.
    pub fn check(&mut self, candle: &Candlestick) -> bool {
        let Some(active) = &self.active else {
            return false;
        };
        let exit = match active.side {
            Signal::Short => {
                if candle.high >= active.stop_loss_price {
                    Some((false, active.stop_loss_price))
                } else if candle.low <= active.take_profit_price {
                    Some((true, active.take_profit_price))
                } else {
                    None
                }
            }
            _ => {
                if candle.low <= active.stop_loss_price {
                    Some((false, active.stop_loss_price))
                } else if candle.high >= active.take_profit_price {
                    Some((true, active.take_profit_price))
                } else {
                    None
                }
            }
        };
        match exit {
            Some((outcome, close_price)) => {
                self.close(outcome, close_price, candle.close_time);
                true
            }
            None => false,
        }
    }

    fn close(&mut self, outcome: bool, close_price: f64, close_time: Timestamp) {
        let Some(active) = self.active.take() else {
            return;
        };
        let delta = if outcome { self.reward } else { -self.penalty };
        let points = round2(self.last_points() + delta);
        self.points.push(points);

        match active.side {
            Signal::Short => {
                self.short_num += 1;
                if outcome {
                    self.successful_short_num += 1;
                }
            }
            _ => {
                self.long_num += 1;
                if outcome {
                    self.successful_long_num += 1;
                }
            }
        }

        tracing::debug!(
            side = %active.side,
            outcome,
            close_price,
            close_time,
            points,
            "position closed"
        );

        self.positions.push(PositionRecord {
            side: active.side,
            prediction: active.prediction,
            open_time: active.open_time,
            close_time,
            open_price: active.open_price,
            take_profit_price: active.take_profit_price,
            stop_loss_price: active.stop_loss_price,
            close_price,
            outcome,
            points,
        });
    }

    /// Summary of the run. `neutral_num` is tracked by the caller.
    pub fn performance(&self, neutral_num: usize) -> PerformanceRecord {
        let successful = self.successful_long_num + self.successful_short_num;
        PerformanceRecord {
            points: self.last_points(),
            points_hist: self.points.clone(),
            points_median: round2(median(&self.points)),
            positions: self.positions.clone(),
            neutral_num,
            long_num: self.long_num,
            short_num: self.short_num,
            long_outcome_num: self.successful_long_num + (self.short_num - self.successful_short_num),
            short_outcome_num: self.successful_short_num + (self.long_num - self.successful_long_num),
            long_acc: accuracy(self.successful_long_num, self.long_num),
            short_acc: accuracy(self.successful_short_num, self.short_num),
            general_acc: accuracy(successful, self.positions.len()),
        }
    }
}

/// Zero attempts report 0% rather than dividing by zero.
fn accuracy(successful: usize, total: usize) -> f64 {
    percentage_out_of_total(successful as f64, total.max(1) as f64)
}
