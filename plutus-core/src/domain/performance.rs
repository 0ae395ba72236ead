//! Closed positions and the per-model performance summary.

use serde::{Deserialize, Serialize};

use super::{Prediction, Signal, Timestamp};

/// A closed position. The short keys are the persisted wire format.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionRecord {
    /// Long or short.
    #[serde(rename = "t")]
    pub side: Signal,
    /// Prediction that opened the position.
    #[serde(rename = "p")]
    pub prediction: Prediction,
    #[serde(rename = "ot")]
    pub open_time: Timestamp,
    #[serde(rename = "ct")]
    pub close_time: Timestamp,
    #[serde(rename = "op")]
    pub open_price: f64,
    #[serde(rename = "tpp")]
    pub take_profit_price: f64,
    #[serde(rename = "slp")]
    pub stop_loss_price: f64,
    #[serde(rename = "cp")]
    pub close_price: f64,
    /// True when the take-profit price was reached.
    #[serde(rename = "o")]
    pub outcome: bool,
    /// Ledger value right after this close.
    #[serde(rename = "pts")]
    pub points: f64,
}

impl PositionRecord {
    /// Position duration in whole minutes.
    pub fn duration_minutes(&self) -> i64 {
        (self.close_time - self.open_time + 1) / super::MINUTE_MS
    }
}

/// Summary snapshot of one model's run, computed once at the end.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerformanceRecord {
    /// Final ledger value.
    pub points: f64,
    /// Full ledger, starting with the 0 sentinel.
    pub points_hist: Vec<f64>,
    pub points_median: f64,
    pub positions: Vec<PositionRecord>,
    /// Predictions that produced no signal.
    pub neutral_num: usize,
    pub long_num: usize,
    pub short_num: usize,
    /// Times the market moved in favor of a long (won longs plus lost shorts).
    pub long_outcome_num: usize,
    /// Times the market moved in favor of a short (won shorts plus lost longs).
    pub short_outcome_num: usize,
    pub long_acc: f64,
    pub short_acc: f64,
    pub general_acc: f64,
}

impl PerformanceRecord {
    pub fn positions_num(&self) -> usize {
        self.positions.len()
    }
}
