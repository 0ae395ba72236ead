//! Plutus Core: signal interpretation, position simulation, early stopping.
//!
//! This crate contains the pure, synchronous heart of the backtester:
//! - Domain types (candlesticks, predictions, position and performance records)
//! - Signal interpreters (percent change, probability, consensus, indicator veto)
//! - Position ledger with the stop-loss-first exit rule
//! - Early-stopping checkpoints
//! - The aligned candlestick context models read from
//! - Models replaying externally produced forecasts
//! - The exit-combination catalog

pub mod data;
pub mod domain;
pub mod early_stopping;
pub mod exit_combination;
pub mod indicators;
pub mod interpreter;
pub mod model;
pub mod numbers;
pub mod position;
