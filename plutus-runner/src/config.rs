//! Backtest configuration loaded from TOML.
//!
//! ```toml
//! [backtest]
//! id = "BTC_Q1"
//! description = "Q1 regression sweep"
//! take_profit = 1.5
//! stop_loss = 1.5
//! idle_minutes = 30
//! parallel = true
//!
//! [data]
//! minute = "data/btc_1m.csv"
//! prediction = "data/btc_30m.csv"
//! normalized = "data/btc_30m_normalized.csv"
//!
//! [early_stopping]
//! enabled = true
//! min_points = -35.0
//!
//! [[models]]
//! kind = "keras_regression"
//! id = "KR_UNIT"
//! lookback = 100
//! predictions = "caches/kr_unit.jsonl"
//! interpreter = { long = 1.0, short = 1.0 }
//! ```

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use plutus_core::domain::Timestamp;
use plutus_core::early_stopping::{CheckpointConfig, DEFAULT_CHECKPOINTS, DEFAULT_MIN_POINTS};
use plutus_core::model::{ModelConfig, ModelError};

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("failed to parse config: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid config: {0}")]
    Invalid(String),

    #[error(transparent)]
    Model(#[from] ModelError),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestConfig {
    pub backtest: BacktestSection,
    pub data: DataConfig,
    #[serde(default)]
    pub early_stopping: EarlyStoppingConfig,
    pub models: Vec<ModelConfig>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BacktestSection {
    pub id: String,
    #[serde(default)]
    pub description: String,
    /// Percent, 1.0 = 1%.
    pub take_profit: f64,
    pub stop_loss: f64,
    /// Cooldown after a position closes before the model is asked again.
    #[serde(default)]
    pub idle_minutes: u32,
    #[serde(default)]
    pub parallel: bool,
}

fn default_bucket_minutes() -> u32 {
    30
}

fn default_synthetic_buckets() -> usize {
    2_000
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataConfig {
    pub minute: Option<PathBuf>,
    pub prediction: Option<PathBuf>,
    pub normalized: Option<PathBuf>,
    /// Inclusive bounds in ms, applied to all three series.
    pub start: Option<Timestamp>,
    pub end: Option<Timestamp>,
    /// Generate candles and forecasts instead of reading files.
    #[serde(default)]
    pub synthetic: bool,
    #[serde(default = "default_bucket_minutes")]
    pub bucket_minutes: u32,
    #[serde(default = "default_synthetic_buckets")]
    pub synthetic_buckets: usize,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            minute: None,
            prediction: None,
            normalized: None,
            start: None,
            end: None,
            synthetic: false,
            bucket_minutes: default_bucket_minutes(),
            synthetic_buckets: default_synthetic_buckets(),
        }
    }
}

fn default_checkpoints() -> Vec<CheckpointConfig> {
    DEFAULT_CHECKPOINTS.to_vec()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EarlyStoppingConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default = "default_checkpoints")]
    pub checkpoints: Vec<CheckpointConfig>,
    #[serde(default)]
    pub min_points: Option<f64>,
}

impl Default for EarlyStoppingConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            checkpoints: default_checkpoints(),
            min_points: Some(DEFAULT_MIN_POINTS),
        }
    }
}

impl BacktestConfig {
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let mut config = Self::from_toml(&content)?;
        if let Some(base) = path.parent() {
            config.resolve_paths(base);
        }
        Ok(config)
    }

    /// Parse and validate.
    pub fn from_toml(content: &str) -> Result<Self, ConfigError> {
        let config: Self = toml::from_str(content)?;
        config.validate()?;
        Ok(config)
    }

    /// Widest lookback across all configured models.
    pub fn max_lookback(&self) -> usize {
        self.models.iter().map(|m| m.lookback()).max().unwrap_or(0)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        let b = &self.backtest;
        if b.id.trim().is_empty() {
            return Err(ConfigError::Invalid("backtest.id must not be empty".into()));
        }
        for (name, value) in [("take_profit", b.take_profit), ("stop_loss", b.stop_loss)] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ConfigError::Invalid(format!(
                    "backtest.{name} must be a positive percentage (received {value})"
                )));
            }
        }

        let d = &self.data;
        if !d.synthetic && (d.minute.is_none() || d.prediction.is_none() || d.normalized.is_none()) {
            return Err(ConfigError::Invalid(
                "data.minute, data.prediction and data.normalized are required unless data.synthetic is set".into(),
            ));
        }
        if let (Some(start), Some(end)) = (d.start, d.end) {
            if start >= end {
                return Err(ConfigError::Invalid(format!(
                    "data.start ({start}) must be before data.end ({end})"
                )));
            }
        }
        if d.bucket_minutes == 0 {
            return Err(ConfigError::Invalid("data.bucket_minutes must be at least 1".into()));
        }

        for checkpoint in &self.early_stopping.checkpoints {
            if !(checkpoint.dataset_percent > 0.0 && checkpoint.dataset_percent <= 1.0) {
                return Err(ConfigError::Invalid(format!(
                    "early_stopping checkpoint fraction must be within (0, 1] (received {})",
                    checkpoint.dataset_percent
                )));
            }
        }

        if self.models.is_empty() {
            return Err(ConfigError::Invalid("at least one [[models]] entry is required".into()));
        }
        let mut seen = HashSet::new();
        for model in &self.models {
            if !seen.insert(model.id()) {
                return Err(ConfigError::Invalid(format!("duplicate model id '{}'", model.id())));
            }
            model.validate()?;
        }
        Ok(())
    }

    /// Make relative data and cache paths relative to `base`.
    pub fn resolve_paths(&mut self, base: &Path) {
        let resolve = |p: &mut PathBuf| {
            if p.is_relative() {
                *p = base.join(&*p);
            }
        };
        for path in [&mut self.data.minute, &mut self.data.prediction, &mut self.data.normalized]
            .into_iter()
            .flatten()
        {
            resolve(path);
        }
        for model in &mut self.models {
            resolve_model_paths(model, &resolve);
        }
    }
}

fn resolve_model_paths(model: &mut ModelConfig, resolve: &impl Fn(&mut PathBuf)) {
    match model {
        ModelConfig::Arima(c) => resolve(&mut c.predictions),
        ModelConfig::KerasRegression(c) | ModelConfig::XgbRegression(c) => resolve(&mut c.predictions),
        ModelConfig::KerasClassification(c) | ModelConfig::XgbClassification(c) => {
            resolve(&mut c.predictions)
        }
        ModelConfig::Consensus(c) => {
            for member in &mut c.models {
                resolve_model_paths(member, resolve);
            }
        }
    }
}
