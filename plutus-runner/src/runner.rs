//! Backtest runner: walks every model over the 1-minute series.
//!
//! Two entry points:
//! - `run_from_config()`: loads candles, builds models, runs. Used by the CLI.
//! - `run_backtest()`: takes a pre-built context and models. No I/O.
//!
//! Each model owns its `Position` and `EarlyStopping`; the candlestick
//! context is shared read-only, so models run independently (in parallel when
//! `backtest.parallel` is set).

use std::sync::atomic::{AtomicBool, Ordering};

use rayon::prelude::*;
use thiserror::Error;
use tracing::{info, warn};

use plutus_core::data::CandlestickSet;
use plutus_core::domain::{Prediction, Timestamp, MINUTE_MS};
use plutus_core::early_stopping::{EarlyStopping, ProcessName};
use plutus_core::model::Model;
use plutus_core::position::{Position, PositionError};

use crate::config::{BacktestConfig, ConfigError};
use crate::data_loader::{load_candles, LoadError};
use crate::models::{create_models, FactoryError, ForecastSource};
use crate::result::{BacktestResult, BacktestSummary};

/// Motive recorded on results whose walk was cancelled.
pub const CANCELLED: &str = "cancelled";

#[derive(Debug, Error)]
pub enum RunError {
    #[error("config error: {0}")]
    Config(#[from] ConfigError),
    #[error("data error: {0}")]
    Data(#[from] LoadError),
    #[error("model error: {0}")]
    Factory(#[from] FactoryError),
    #[error("position error in model '{model}': {source}")]
    Position {
        model: String,
        #[source]
        source: PositionError,
    },
}

/// Results of one batch plus the provenance of its data.
#[derive(Debug)]
pub struct BacktestRun {
    pub results: Vec<BacktestResult>,
    pub dataset_hash: String,
    pub has_synthetic: bool,
}

/// Load data, build every configured model and run the batch.
pub fn run_from_config(
    config: &BacktestConfig,
    cancel: Option<&AtomicBool>,
) -> Result<BacktestRun, RunError> {
    config.validate()?;
    let loaded = load_candles(&config.data, config.max_lookback())?;
    let source = if loaded.has_synthetic {
        ForecastSource::Synthetic(&loaded.candles)
    } else {
        ForecastSource::Files
    };
    let models = create_models(&config.models, source)?;

    let mut results = run_backtest(config, &loaded.candles, &models, cancel)?;
    for result in &mut results {
        result.backtest.dataset_hash = loaded.dataset_hash.clone();
        result.backtest.synthetic = loaded.has_synthetic;
    }
    Ok(BacktestRun {
        results,
        dataset_hash: loaded.dataset_hash,
        has_synthetic: loaded.has_synthetic,
    })
}

/// Run every model over the same context. Results keep the model order.
pub fn run_backtest(
    config: &BacktestConfig,
    candles: &CandlestickSet,
    models: &[Box<dyn Model>],
    cancel: Option<&AtomicBool>,
) -> Result<Vec<BacktestResult>, RunError> {
    info!(
        backtest = %config.backtest.id,
        models = models.len(),
        parallel = config.backtest.parallel,
        take_profit = config.backtest.take_profit,
        stop_loss = config.backtest.stop_loss,
        "backtest started"
    );
    let evaluate = |model: &Box<dyn Model>| evaluate_model(config, candles, model.as_ref(), cancel);
    let results: Result<Vec<BacktestResult>, RunError> = if config.backtest.parallel {
        models.par_iter().map(evaluate).collect()
    } else {
        models.iter().map(evaluate).collect()
    };
    let results = results?;
    info!(
        backtest = %config.backtest.id,
        stopped_early = results.iter().filter(|r| r.stopped_early()).count(),
        "backtest finished"
    );
    Ok(results)
}

/// Walk one model over the 1-minute series.
pub fn evaluate_model(
    config: &BacktestConfig,
    candles: &CandlestickSet,
    model: &dyn Model,
    cancel: Option<&AtomicBool>,
) -> Result<BacktestResult, RunError> {
    let model_start = chrono::Utc::now().timestamp_millis();
    let position_err = |source| RunError::Position {
        model: model.id().to_string(),
        source,
    };
    info!(model = model.id(), kind = %model.kind(), lookback = model.lookback(), "model evaluation started");

    let minute = candles.minute();
    let last_index = minute.len().saturating_sub(1);
    let idle_ms = Timestamp::from(config.backtest.idle_minutes) * MINUTE_MS;
    let mut position =
        Position::new(config.backtest.take_profit, config.backtest.stop_loss).map_err(position_err)?;
    let mut early_stopping = config.early_stopping.enabled.then(|| {
        EarlyStopping::new(
            ProcessName::Backtest,
            minute.len(),
            &config.early_stopping.checkpoints,
            config.early_stopping.min_points,
        )
    });

    let mut idle_until = Timestamp::MIN;
    let mut neutral_num = 0usize;
    let mut last_neutral_bucket: Option<Timestamp> = None;
    let mut motive: Option<String> = None;

    for (index, candle) in minute.iter().enumerate() {
        if cancel.is_some_and(|f| f.load(Ordering::Relaxed)) {
            motive = Some(CANCELLED.to_string());
            break;
        }

        if position.is_active() {
            if position.check(candle) {
                idle_until = candle.close_time + idle_ms;
            }
        } else if candle.open_time > idle_until && index < last_index {
            let bucket = candles
                .lookback_range(model.lookback(), candle.open_time)
                .ok()
                .map(|(_, last_ct)| last_ct);
            if bucket.is_none() || bucket != last_neutral_bucket {
                let prediction = model.predict(candles, candle.open_time).unwrap_or_else(|e| {
                    warn!(model = model.id(), timestamp = candle.open_time, error = %e, "prediction failed, treating as neutral");
                    Prediction::neutral_due_to_error(candle.open_time, e)
                });
                if prediction.result.is_neutral() {
                    neutral_num += 1;
                    last_neutral_bucket = bucket;
                } else {
                    position.open(candle, prediction).map_err(position_err)?;
                }
            }
        }

        if let Some(policy) = early_stopping.as_mut() {
            let points = Some(position.last_points());
            if let Some(m) = policy.check(index, position.long_num(), position.short_num(), points) {
                motive = Some(m);
                break;
            }
        }
    }

    let performance = position.performance(neutral_num);
    let model_end = chrono::Utc::now().timestamp_millis();
    info!(
        model = model.id(),
        points = performance.points,
        positions = performance.positions_num(),
        neutral = neutral_num,
        general_acc = performance.general_acc,
        stopped_early = motive.is_some(),
        "model evaluation finished"
    );
    if let Some(m) = &motive {
        info!(model = model.id(), motive = %m, "model evaluation stopped early");
    }

    Ok(BacktestResult {
        backtest: BacktestSummary {
            id: config.backtest.id.clone(),
            description: config.backtest.description.clone(),
            start: candles.start(),
            end: candles.end(),
            take_profit: config.backtest.take_profit,
            stop_loss: config.backtest.stop_loss,
            idle_minutes_on_position_close: config.backtest.idle_minutes,
            model_start,
            model_end,
            model_duration: ((model_end - model_start) as f64 / MINUTE_MS as f64).round() as i64,
            early_stopping: motive,
            dataset_hash: String::new(),
            synthetic: false,
        },
        model: model.config(),
        performance,
    })
}
