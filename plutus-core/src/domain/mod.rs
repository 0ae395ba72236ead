//! Domain types for Plutus

pub mod candlestick;
pub mod performance;
pub mod prediction;

pub use candlestick::Candlestick;
pub use performance::{PerformanceRecord, PositionRecord};
pub use prediction::{Prediction, PredictionMetadata, Signal, SignalError};

/// Millisecond UNIX timestamp.
pub type Timestamp = i64;

/// Milliseconds in one minute.
pub const MINUTE_MS: Timestamp = 60_000;
