//! Early stopping: abandon runs that are clearly not going anywhere.
//!
//! A policy is a list of checkpoints placed at fractions of the dataset, each
//! requiring a minimum number of longs and shorts by the time the run reaches
//! it, plus an optional floor on points that is checked on every call.
//!
//! Checkpoints latch: once passed, a checkpoint is never evaluated again even
//! if later counts would fail it.

use serde::{Deserialize, Serialize};

/// Process consulting the policy. Used in motive messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProcessName {
    ModelEvaluation,
    Backtest,
    RegressionDiscovery,
    ClassificationDiscovery,
}

impl std::fmt::Display for ProcessName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            ProcessName::ModelEvaluation => "ModelEvaluation",
            ProcessName::Backtest => "Backtest",
            ProcessName::RegressionDiscovery => "RegressionDiscovery",
            ProcessName::ClassificationDiscovery => "ClassificationDiscovery",
        };
        f.write_str(name)
    }
}

/// Serializable checkpoint definition.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CheckpointConfig {
    pub required_longs: usize,
    pub required_shorts: usize,
    /// Fraction of the dataset in `(0, 1]`.
    pub dataset_percent: f64,
}

impl CheckpointConfig {
    pub const fn new(required_longs: usize, required_shorts: usize, dataset_percent: f64) -> Self {
        Self {
            required_longs,
            required_shorts,
            dataset_percent,
        }
    }
}

/// Default model-evaluation checkpoints.
pub const DEFAULT_CHECKPOINTS: [CheckpointConfig; 4] = [
    CheckpointConfig::new(1, 1, 0.15),
    CheckpointConfig::new(3, 3, 0.3),
    CheckpointConfig::new(7, 7, 0.5),
    CheckpointConfig::new(10, 10, 0.7),
];

/// Default points floor for model evaluations.
pub const DEFAULT_MIN_POINTS: f64 = -35.0;

#[derive(Debug, Clone, PartialEq)]
pub struct Checkpoint {
    /// Candle index at which the checkpoint becomes due.
    pub index: usize,
    pub required_longs: usize,
    pub required_shorts: usize,
    pub passed: bool,
    pub motive: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct EarlyStopping {
    process: ProcessName,
    checkpoints: Vec<Checkpoint>,
    min_points: Option<f64>,
    points_motive: Option<String>,
}

impl EarlyStopping {
    /// Build the policy for a dataset of `candlesticks_num` candles.
    ///
    /// Checkpoints are sorted by dataset fraction so evaluation order never
    /// depends on the order they were configured in.
    pub fn new(
        process: ProcessName,
        candlesticks_num: usize,
        checkpoints: &[CheckpointConfig],
        min_points: Option<f64>,
    ) -> Self {
        let mut configs = checkpoints.to_vec();
        configs.sort_by(|a, b| a.dataset_percent.total_cmp(&b.dataset_percent));
        let checkpoints = configs
            .iter()
            .map(|c| Checkpoint {
                index: (candlesticks_num as f64 * c.dataset_percent).floor() as usize,
                required_longs: c.required_longs,
                required_shorts: c.required_shorts,
                passed: false,
                motive: format!(
                    "{process} stopped early because the model had less than {} longs or {} shorts at {}% of the dataset.",
                    c.required_longs,
                    c.required_shorts,
                    format_percent(c.dataset_percent * 100.0)
                ),
            })
            .collect();
        let points_motive = min_points.map(|p| {
            format!("{process} stopped early because the model has less than {p} points.")
        });
        Self {
            process,
            checkpoints,
            min_points,
            points_motive,
        }
    }

    /// Default policy used by model evaluations.
    pub fn model_evaluation(candlesticks_num: usize) -> Self {
        Self::new(
            ProcessName::ModelEvaluation,
            candlesticks_num,
            &DEFAULT_CHECKPOINTS,
            Some(DEFAULT_MIN_POINTS),
        )
    }

    pub fn process(&self) -> ProcessName {
        self.process
    }

    pub fn checkpoints(&self) -> &[Checkpoint] {
        &self.checkpoints
    }

    /// Returns the motive if the run should stop, `None` to continue.
    pub fn check(
        &mut self,
        current_index: usize,
        longs_num: usize,
        shorts_num: usize,
        points: Option<f64>,
    ) -> Option<String> {
        if let (Some(min_points), Some(points)) = (self.min_points, points) {
            if points <= min_points {
                return self.points_motive.clone();
            }
        }
        for checkpoint in self.checkpoints.iter_mut().filter(|c| !c.passed) {
            if current_index >= checkpoint.index {
                checkpoint.passed = longs_num >= checkpoint.required_longs
                    && shorts_num >= checkpoint.required_shorts;
                if !checkpoint.passed {
                    return Some(checkpoint.motive.clone());
                }
            }
        }
        None
    }
}

/// `15.0` renders as `15`, `12.5` as `12.5`.
fn format_percent(value: f64) -> String {
    let rounded = (value * 1e6).round() / 1e6;
    if rounded.fract() == 0.0 {
        format!("{}", rounded as i64)
    } else {
        format!("{rounded}")
    }
}
