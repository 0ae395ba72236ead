//! Result persistence.

use std::path::{Path, PathBuf};

use serde::Deserialize;
use thiserror::Error;

use crate::result::BacktestResult;

#[derive(Debug, Error)]
pub enum SinkError {
    #[error("I/O error on '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid result file '{path}': {source}")]
    Json {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("no results to save")]
    EmptyBatch,
}

/// Destination for finished backtest results.
pub trait ResultSink: Send + Sync {
    /// Persist one backtest's results, returning where they went.
    fn save(&self, results: &[BacktestResult]) -> Result<PathBuf, SinkError>;
}

/// Writes one pretty JSON array per backtest: `{backtest_id}_{model_end}.json`.
#[derive(Debug, Clone)]
pub struct JsonDirectorySink {
    dir: PathBuf,
}

impl JsonDirectorySink {
    /// Creates the directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self, SinkError> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir).map_err(|source| SinkError::Io {
            path: dir.clone(),
            source,
        })?;
        Ok(Self { dir })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Named after the first result's backtest id and the latest `model_end`.
    pub fn file_name(results: &[BacktestResult]) -> Result<String, SinkError> {
        let first = results.first().ok_or(SinkError::EmptyBatch)?;
        let finished = results
            .iter()
            .map(|r| r.backtest.model_end)
            .max()
            .unwrap_or(first.backtest.model_end);
        Ok(format!("{}_{}.json", first.backtest.id, finished))
    }
}

impl ResultSink for JsonDirectorySink {
    fn save(&self, results: &[BacktestResult]) -> Result<PathBuf, SinkError> {
        let path = self.dir.join(Self::file_name(results)?);
        let json = serde_json::to_string_pretty(results).map_err(|source| SinkError::Json {
            path: path.clone(),
            source,
        })?;
        std::fs::write(&path, json).map_err(|source| SinkError::Io {
            path: path.clone(),
            source,
        })?;
        tracing::debug!(path = %path.display(), results = results.len(), "results saved");
        Ok(path)
    }
}

/// A result file holds either a batch or a single result.
#[derive(Deserialize)]
#[serde(untagged)]
enum ResultFile {
    Batch(Vec<BacktestResult>),
    Single(Box<BacktestResult>),
}

/// Load every `*.json` file in `dir`, sorted by file name, flattening batches.
pub fn load_results(dir: &Path) -> Result<Vec<BacktestResult>, SinkError> {
    let io_err = |path: &Path, source| SinkError::Io {
        path: path.to_path_buf(),
        source,
    };
    let mut paths = Vec::new();
    for entry in std::fs::read_dir(dir).map_err(|e| io_err(dir, e))? {
        let path = entry.map_err(|e| io_err(dir, e))?.path();
        if path.extension().is_some_and(|ext| ext == "json") {
            paths.push(path);
        }
    }
    paths.sort();

    let mut results = Vec::new();
    for path in paths {
        let content = std::fs::read_to_string(&path).map_err(|e| io_err(&path, e))?;
        match serde_json::from_str(&content).map_err(|source| SinkError::Json { path, source })? {
            ResultFile::Batch(batch) => results.extend(batch),
            ResultFile::Single(result) => results.push(*result),
        }
    }
    Ok(results)
}
