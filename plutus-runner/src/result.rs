//! Persisted backtest result: one per (backtest, model).

use serde::{Deserialize, Serialize};

use plutus_core::domain::{PerformanceRecord, Timestamp};
use plutus_core::model::ModelConfig;

/// Backtest parameters and timing recorded with each model's performance.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestSummary {
    pub id: String,
    #[serde(default)]
    pub description: String,
    pub start: Timestamp,
    pub end: Timestamp,
    pub take_profit: f64,
    pub stop_loss: f64,
    pub idle_minutes_on_position_close: u32,
    pub model_start: Timestamp,
    pub model_end: Timestamp,
    /// Whole minutes, rounded.
    pub model_duration: i64,
    /// Motive when the walk ended before the last candle.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub early_stopping: Option<String>,
    #[serde(default, skip_serializing_if = "String::is_empty")]
    pub dataset_hash: String,
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub synthetic: bool,
}

impl BacktestSummary {
    /// Exit combination id, `TP15_SL20` for take-profit 1.5 and stop-loss 2.
    pub fn combination_id(&self) -> String {
        format!(
            "TP{}_SL{}",
            format_exit(self.take_profit),
            format_exit(self.stop_loss)
        )
    }
}

/// One decimal, dot removed: 1 → `10`, 1.5 → `15`.
fn format_exit(value: f64) -> String {
    format!("{value:.1}").replace('.', "")
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestResult {
    pub backtest: BacktestSummary,
    pub model: ModelConfig,
    pub performance: PerformanceRecord,
}

impl BacktestResult {
    pub fn model_id(&self) -> &str {
        self.model.id()
    }

    pub fn stopped_early(&self) -> bool {
        self.backtest.early_stopping.is_some()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn summary(take_profit: f64, stop_loss: f64) -> BacktestSummary {
        BacktestSummary {
            id: "UNIT".into(),
            description: String::new(),
            start: 0,
            end: 1,
            take_profit,
            stop_loss,
            idle_minutes_on_position_close: 0,
            model_start: 0,
            model_end: 0,
            model_duration: 0,
            early_stopping: None,
            dataset_hash: String::new(),
            synthetic: false,
        }
    }

    #[test]
    fn combination_id_formatting() {
        assert_eq!(summary(1.0, 1.0).combination_id(), "TP10_SL10");
        assert_eq!(summary(1.5, 2.0).combination_id(), "TP15_SL20");
        assert_eq!(summary(4.0, 3.5).combination_id(), "TP40_SL35");
    }

    #[test]
    fn optional_fields_are_omitted() {
        let json = serde_json::to_value(summary(1.0, 1.0)).unwrap();
        let obj = json.as_object().unwrap();
        assert!(!obj.contains_key("early_stopping"));
        assert!(!obj.contains_key("dataset_hash"));
        assert!(!obj.contains_key("synthetic"));
        assert_eq!(obj["idle_minutes_on_position_close"], 0);
    }
}
