//! Plutus Runner: backtest orchestration on top of `plutus-core`.
//!
//! - TOML backtest configuration
//! - Candlestick CSV loading with a deterministic synthetic fallback
//! - Model factory and forecast-cache loading
//! - Per-model backtest walk (sequential or rayon-parallel)
//! - JSON result persistence and CSV exports
//! - Regression selection across exit combinations

pub mod config;
pub mod data_loader;
pub mod export;
pub mod models;
pub mod result;
pub mod runner;
pub mod selection;
pub mod sink;

pub use config::{BacktestConfig, ConfigError};
pub use data_loader::{load_candles, LoadError, LoadedData};
pub use export::{export_positions_csv, export_summary_csv, save_csv_exports};
pub use models::{create_model, create_models, FactoryError, ForecastSource};
pub use result::{BacktestResult, BacktestSummary};
pub use runner::{evaluate_model, run_backtest, run_from_config, BacktestRun, RunError};
pub use selection::{RegressionSelection, SelectionError};
pub use sink::{load_results, JsonDirectorySink, ResultSink, SinkError};
