//! Model factory: converts `ModelConfig` into runtime trait objects.
//!
//! Replay models need their forecast caches. Those come either from the JSONL
//! files named in the config or, for synthetic runs, from the deterministic
//! generator in `data_loader`.

use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};

use thiserror::Error;

use plutus_core::data::CandlestickSet;
use plutus_core::model::{
    ArimaModel, ClassificationModel, ConsensusModel, ForecastCache, ForecastEntry, Model,
    ModelConfig, ModelError, RegressionModel,
};

use crate::data_loader::synthetic_forecasts;

// ─── Error type ──────────────────────────────────────────────────────

#[derive(Debug, Error)]
pub enum FactoryError {
    #[error("failed to read prediction cache '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid prediction cache '{path}' at line {line}: {source}")]
    Parse {
        path: PathBuf,
        line: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error(transparent)]
    Model(#[from] ModelError),
}

/// Where replay models get their forecasts.
#[derive(Debug, Clone, Copy)]
pub enum ForecastSource<'a> {
    /// JSONL files named in each model config.
    Files,
    /// Generated per model from the loaded candles.
    Synthetic(&'a CandlestickSet),
}

// ─── Cache loading ───────────────────────────────────────────────────

/// Read a JSONL forecast cache. Blank lines are skipped.
pub fn read_forecast_cache(path: &Path) -> Result<ForecastCache, FactoryError> {
    let io_err = |source| FactoryError::Io {
        path: path.to_path_buf(),
        source,
    };
    let reader = BufReader::new(File::open(path).map_err(io_err)?);
    let mut cache = ForecastCache::new();
    for (i, line) in reader.lines().enumerate() {
        let line = line.map_err(io_err)?;
        if line.trim().is_empty() {
            continue;
        }
        let entry: ForecastEntry = serde_json::from_str(&line).map_err(|source| FactoryError::Parse {
            path: path.to_path_buf(),
            line: i + 1,
            source,
        })?;
        cache.insert(entry.last_ct, entry.values);
    }
    Ok(cache)
}

fn forecasts(
    source: ForecastSource<'_>,
    config: &ModelConfig,
    path: &Path,
) -> Result<ForecastCache, FactoryError> {
    match source {
        ForecastSource::Files => read_forecast_cache(path),
        ForecastSource::Synthetic(candles) => Ok(synthetic_forecasts(
            candles,
            config.id(),
            config.kind(),
            config.lookback(),
        )),
    }
}

// ─── Model factory ───────────────────────────────────────────────────

/// Create a model from its config, loading whatever caches it replays.
pub fn create_model(
    config: &ModelConfig,
    source: ForecastSource<'_>,
) -> Result<Box<dyn Model>, FactoryError> {
    let kind = config.kind();
    let model: Box<dyn Model> = match config {
        ModelConfig::Arima(c) => {
            let cache = forecasts(source, config, &c.predictions)?;
            Box::new(ArimaModel::new(c.clone(), cache)?)
        }
        ModelConfig::KerasRegression(c) | ModelConfig::XgbRegression(c) => {
            let cache = forecasts(source, config, &c.predictions)?;
            Box::new(RegressionModel::new(kind, c.clone(), cache)?)
        }
        ModelConfig::KerasClassification(c) | ModelConfig::XgbClassification(c) => {
            let cache = forecasts(source, config, &c.predictions)?;
            Box::new(ClassificationModel::new(kind, c.clone(), cache)?)
        }
        ModelConfig::Consensus(c) => {
            let members = create_models(&c.models, source)?;
            Box::new(ConsensusModel::new(c.id.clone(), c.min_consensus, members)?)
        }
    };
    tracing::debug!(model = model.id(), kind = %kind, lookback = model.lookback(), "model created");
    Ok(model)
}

pub fn create_models(
    configs: &[ModelConfig],
    source: ForecastSource<'_>,
) -> Result<Vec<Box<dyn Model>>, FactoryError> {
    configs.iter().map(|c| create_model(c, source)).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use plutus_core::interpreter::{PercentChange, Probability};
    use plutus_core::model::{
        ClassificationModelConfig, ConsensusModelConfig, ModelKind, RegressionModelConfig,
    };

    use crate::data_loader::{synthetic_series, SYNTHETIC_START};

    fn regression(id: &str, predictions: PathBuf) -> ModelConfig {
        ModelConfig::XgbRegression(RegressionModelConfig {
            id: id.into(),
            lookback: 6,
            predictions,
            interpreter: PercentChange::new(0.5, 0.5).unwrap(),
        })
    }

    #[test]
    fn reads_jsonl_cache() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("cache.jsonl");
        std::fs::write(
            &path,
            "{\"t\": 1799999, \"v\": [1.0, 2.0, 3.0, 4.0, 5.0]}\n\n{\"t\": 3599999, \"v\": [0.6, 0.4]}\n",
        )
        .unwrap();
        let cache = read_forecast_cache(&path).unwrap();
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(3_599_999), Some(&[0.6, 0.4][..]));
    }

    #[test]
    fn malformed_line_reports_line_number() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bad.jsonl");
        std::fs::write(&path, "{\"t\": 1, \"v\": [1.0]}\nnot json\n").unwrap();
        match read_forecast_cache(&path) {
            Err(FactoryError::Parse { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected parse error, got {other:?}"),
        }
    }

    #[test]
    fn missing_cache_file_fails() {
        let config = regression("X", "/nonexistent/x.jsonl".into());
        assert!(matches!(
            create_model(&config, ForecastSource::Files),
            Err(FactoryError::Io { .. })
        ));
    }

    #[test]
    fn builds_consensus_from_synthetic_forecasts() {
        let (m, p, n) = synthetic_series("FACTORY", 40, 30, SYNTHETIC_START);
        let set = CandlestickSet::new(m, p, n, 6).unwrap();
        let config = ModelConfig::Consensus(ConsensusModelConfig {
            id: "CON".into(),
            min_consensus: 2,
            models: vec![
                regression("R", "unused.jsonl".into()),
                ModelConfig::KerasClassification(ClassificationModelConfig {
                    id: "C".into(),
                    lookback: 4,
                    predictions: "unused.jsonl".into(),
                    interpreter: Probability::new(0.6, 0.6).unwrap(),
                }),
            ],
        });
        let model = create_model(&config, ForecastSource::Synthetic(&set)).unwrap();
        assert_eq!(model.kind(), ModelKind::Consensus);
        assert_eq!(model.lookback(), 6);
        assert_eq!(model.config(), config);
        let prediction = model.predict(&set, set.minute()[0].open_time).unwrap();
        assert_eq!(prediction.metadata.len(), 2);
    }
}
