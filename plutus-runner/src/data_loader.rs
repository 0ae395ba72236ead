//! Candlestick loading for the runner.
//!
//! Reads the three series from CSV (`ot,ct,o,h,l,c[,v]`), applies the
//! optional start/end window and builds the validated `CandlestickSet`.
//! With `synthetic` set, a deterministic random walk replaces the files.
//! Synthetic data is a developer-only mode; results produced on it are
//! tagged as such.

use std::path::{Path, PathBuf};

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use thiserror::Error;

use plutus_core::data::{CandlestickSet, DataError};
use plutus_core::domain::{Candlestick, Timestamp, MINUTE_MS};
use plutus_core::model::{ForecastCache, ModelKind};
use plutus_core::numbers::round2;

use crate::config::DataConfig;

/// First open time of generated series: 2022-01-01T00:00:00Z.
pub const SYNTHETIC_START: Timestamp = 1_640_995_200_000;

/// Number of forecast steps in generated regression forecasts.
const SYNTHETIC_FORECAST_STEPS: usize = 8;

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to read '{path}': {source}")]
    Csv {
        path: PathBuf,
        #[source]
        source: csv::Error,
    },

    #[error("no '{0}' series configured")]
    MissingSeries(&'static str),

    #[error("the {series} series is empty after applying the start/end window")]
    EmptyWindow { series: &'static str },

    #[error("data error: {0}")]
    Data(#[from] DataError),
}

#[derive(Debug)]
pub struct LoadedData {
    pub candles: CandlestickSet,
    /// BLAKE3 over all three series.
    pub dataset_hash: String,
    pub has_synthetic: bool,
}

/// Load the configured series and build the context for `max_lookback`.
pub fn load_candles(config: &DataConfig, max_lookback: usize) -> Result<LoadedData, LoadError> {
    let (minute, prediction, normalized, has_synthetic) = if config.synthetic {
        let (m, p, n) = synthetic_series(
            "plutus-synthetic",
            config.synthetic_buckets.max(max_lookback + 2),
            config.bucket_minutes,
            config.start.unwrap_or(SYNTHETIC_START),
        );
        (m, p, n, true)
    } else {
        let read = |path: &Option<PathBuf>, name: &'static str| match path {
            Some(path) => read_candles_csv(path),
            None => Err(LoadError::MissingSeries(name)),
        };
        (
            read(&config.minute, "minute")?,
            read(&config.prediction, "prediction")?,
            read(&config.normalized, "normalized")?,
            false,
        )
    };

    let minute = apply_window(minute, config.start, config.end, "minute")?;
    let prediction = apply_window(prediction, config.start, config.end, "prediction")?;
    let normalized = apply_window(normalized, config.start, config.end, "normalized")?;

    let dataset_hash = compute_dataset_hash(&[&minute, &prediction, &normalized]);
    let candles = CandlestickSet::new(minute, prediction, normalized, max_lookback)?;
    tracing::info!(
        minute = candles.minute().len(),
        prediction = candles.prediction().len(),
        start = candles.start(),
        end = candles.end(),
        synthetic = has_synthetic,
        hash = %&dataset_hash[..12],
        "candlesticks loaded"
    );
    Ok(LoadedData {
        candles,
        dataset_hash,
        has_synthetic,
    })
}

/// Read one series. The `v` column is optional.
pub fn read_candles_csv(path: &Path) -> Result<Vec<Candlestick>, LoadError> {
    let err = |source| LoadError::Csv {
        path: path.to_path_buf(),
        source,
    };
    let mut reader = csv::Reader::from_path(path).map_err(err)?;
    reader
        .deserialize::<Candlestick>()
        .collect::<Result<Vec<_>, _>>()
        .map_err(err)
}

fn apply_window(
    candles: Vec<Candlestick>,
    start: Option<Timestamp>,
    end: Option<Timestamp>,
    series: &'static str,
) -> Result<Vec<Candlestick>, LoadError> {
    if start.is_none() && end.is_none() {
        return Ok(candles);
    }
    let kept: Vec<Candlestick> = candles
        .into_iter()
        .filter(|c| start.map_or(true, |s| c.open_time >= s) && end.map_or(true, |e| c.close_time <= e))
        .collect();
    if kept.is_empty() {
        return Err(LoadError::EmptyWindow { series });
    }
    Ok(kept)
}

/// Deterministic BLAKE3 hash over every candle of every series, in order.
pub fn compute_dataset_hash(series: &[&[Candlestick]]) -> String {
    let mut hasher = blake3::Hasher::new();
    for (i, candles) in series.iter().enumerate() {
        hasher.update(&(i as u64).to_le_bytes());
        for c in candles.iter() {
            hasher.update(&c.open_time.to_le_bytes());
            hasher.update(&c.close_time.to_le_bytes());
            hasher.update(&c.open.to_le_bytes());
            hasher.update(&c.high.to_le_bytes());
            hasher.update(&c.low.to_le_bytes());
            hasher.update(&c.close.to_le_bytes());
            hasher.update(&c.volume.unwrap_or(0.0).to_le_bytes());
        }
    }
    hasher.finalize().to_hex().to_string()
}

fn seeded_rng(label: &str) -> StdRng {
    let seed: [u8; 32] = *blake3::hash(label.as_bytes()).as_bytes();
    StdRng::from_seed(seed)
}

/// Generate aligned synthetic series: a 1-minute random walk from 40000,
/// aggregated into `bucket_minutes` prediction candles, and a normalized copy
/// scaled by the first close.
pub fn synthetic_series(
    label: &str,
    buckets: usize,
    bucket_minutes: u32,
    start: Timestamp,
) -> (Vec<Candlestick>, Vec<Candlestick>, Vec<Candlestick>) {
    let mut rng = seeded_rng(label);
    let bucket_minutes = bucket_minutes.max(1) as usize;

    let mut minute = Vec::with_capacity(buckets * bucket_minutes);
    let mut price = 40_000.0_f64;
    for i in 0..buckets * bucket_minutes {
        let change: f64 = rng.gen_range(-0.002..0.002);
        let open = price;
        let close = round2(price * (1.0 + change));
        let high = round2(open.max(close) * (1.0 + rng.gen_range(0.0..0.001)));
        let low = round2(open.min(close) * (1.0 - rng.gen_range(0.0..0.001)));
        let open_time = start + i as Timestamp * MINUTE_MS;
        minute.push(Candlestick {
            open_time,
            close_time: open_time + MINUTE_MS - 1,
            open,
            high,
            low,
            close,
            volume: Some(round2(rng.gen_range(1.0..50.0))),
        });
        price = close;
    }

    let prediction: Vec<Candlestick> = minute
        .chunks(bucket_minutes)
        .filter_map(aggregate)
        .collect();
    let base = prediction.first().map(|c| c.close).unwrap_or(1.0);
    let normalized = prediction
        .iter()
        .map(|c| Candlestick {
            open: c.open / base,
            high: c.high / base,
            low: c.low / base,
            close: c.close / base,
            ..*c
        })
        .collect();
    (minute, prediction, normalized)
}

fn aggregate(chunk: &[Candlestick]) -> Option<Candlestick> {
    let (first, last) = (chunk.first()?, chunk.last()?);
    Some(Candlestick {
        open_time: first.open_time,
        close_time: last.close_time,
        open: first.open,
        high: chunk.iter().map(|c| c.high).fold(f64::MIN, f64::max),
        low: chunk.iter().map(|c| c.low).fold(f64::MAX, f64::min),
        close: last.close,
        volume: Some(round2(chunk.iter().filter_map(|c| c.volume).sum())),
    })
}

/// Generate a forecast cache covering every window a model with `lookback`
/// can see: price paths for regression kinds, `[up, down]` pairs for
/// classification kinds.
pub fn synthetic_forecasts(
    candles: &CandlestickSet,
    model_id: &str,
    kind: ModelKind,
    lookback: usize,
) -> ForecastCache {
    let mut rng = seeded_rng(&format!("forecast:{model_id}"));
    let mut cache = ForecastCache::new();
    for candle in candles.prediction().iter().skip(lookback.saturating_sub(1)) {
        let values = if kind.is_classification() {
            let up = round2(rng.gen_range(0.2..0.8));
            vec![up, round2(1.0 - up)]
        } else {
            let mut price = candle.close;
            let drift: f64 = rng.gen_range(-0.004..0.004);
            let mut path = vec![price];
            for _ in 0..SYNTHETIC_FORECAST_STEPS {
                price = round2(price * (1.0 + drift + rng.gen_range(-0.001..0.001)));
                path.push(price);
            }
            path
        };
        cache.insert(candle.close_time, values);
    }
    cache
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    fn write_csv(dir: &Path, name: &str, candles: &[Candlestick]) -> PathBuf {
        let path = dir.join(name);
        let mut file = std::fs::File::create(&path).unwrap();
        writeln!(file, "ot,ct,o,h,l,c,v").unwrap();
        for c in candles {
            writeln!(
                file,
                "{},{},{},{},{},{},{}",
                c.open_time,
                c.close_time,
                c.open,
                c.high,
                c.low,
                c.close,
                c.volume.unwrap_or(0.0)
            )
            .unwrap();
        }
        path
    }

    #[test]
    fn synthetic_data_is_deterministic() {
        let a = synthetic_series("BTC", 20, 30, SYNTHETIC_START);
        let b = synthetic_series("BTC", 20, 30, SYNTHETIC_START);
        assert_eq!(a, b);
        let c = synthetic_series("ETH", 20, 30, SYNTHETIC_START);
        assert_ne!(a.0, c.0);
    }

    #[test]
    fn synthetic_series_are_aligned() {
        let (minute, prediction, normalized) = synthetic_series("BTC", 20, 30, SYNTHETIC_START);
        assert_eq!(minute.len(), 600);
        assert_eq!(prediction.len(), 20);
        assert_eq!(prediction[0].open_time, minute[0].open_time);
        assert_eq!(prediction[0].close_time, minute[29].close_time);
        assert_eq!(prediction.last().unwrap().close_time, minute.last().unwrap().close_time);
        assert!((normalized[0].close - 1.0).abs() < 1e-12);
        assert!(prediction.iter().all(|c| c.is_sane()));
    }

    #[test]
    fn loads_from_csv_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let (m, p, n) = synthetic_series("CSV", 12, 30, SYNTHETIC_START);
        let config = DataConfig {
            minute: Some(write_csv(dir.path(), "m.csv", &m)),
            prediction: Some(write_csv(dir.path(), "p.csv", &p)),
            normalized: Some(write_csv(dir.path(), "n.csv", &n)),
            ..DataConfig::default()
        };
        let loaded = load_candles(&config, 4).unwrap();
        assert!(!loaded.has_synthetic);
        assert_eq!(loaded.candles.prediction().len(), 12);
        assert_eq!(loaded.candles.minute().len(), 8 * 30);
        assert_eq!(loaded.dataset_hash.len(), 64);
    }

    #[test]
    fn volume_column_is_optional() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("p.csv");
        std::fs::write(&path, "ot,ct,o,h,l,c\n0,1799999,1,2,0.5,1.5\n").unwrap();
        let candles = read_candles_csv(&path).unwrap();
        assert_eq!(candles.len(), 1);
        assert_eq!(candles[0].volume, None);
        assert_eq!(candles[0].close, 1.5);
    }

    #[test]
    fn window_applies_to_every_series() {
        let config = DataConfig {
            synthetic: true,
            synthetic_buckets: 40,
            start: Some(SYNTHETIC_START),
            end: Some(SYNTHETIC_START + 20 * 30 * MINUTE_MS - 1),
            ..DataConfig::default()
        };
        let loaded = load_candles(&config, 5).unwrap();
        assert!(loaded.has_synthetic);
        assert_eq!(loaded.candles.prediction().len(), 20);
        assert_eq!(loaded.candles.end(), SYNTHETIC_START + 20 * 30 * MINUTE_MS - 1);
    }

    #[test]
    fn missing_file_is_reported_with_path() {
        let config = DataConfig {
            minute: Some("/nonexistent/m.csv".into()),
            prediction: Some("/nonexistent/p.csv".into()),
            normalized: Some("/nonexistent/n.csv".into()),
            ..DataConfig::default()
        };
        let err = load_candles(&config, 1).unwrap_err();
        assert!(err.to_string().contains("/nonexistent/m.csv"));
    }

    #[test]
    fn hash_changes_with_data() {
        let (m, p, n) = synthetic_series("H", 5, 30, SYNTHETIC_START);
        let a = compute_dataset_hash(&[&m, &p, &n]);
        let mut p2 = p.clone();
        p2[0].close += 0.01;
        let b = compute_dataset_hash(&[&m, &p2, &n]);
        assert_ne!(a, b);
        assert_eq!(a, compute_dataset_hash(&[&m, &p, &n]));
    }

    #[test]
    fn synthetic_forecasts_cover_every_window() {
        let (m, p, n) = synthetic_series("F", 30, 30, SYNTHETIC_START);
        let set = CandlestickSet::new(m, p, n, 10).unwrap();
        let regression = synthetic_forecasts(&set, "KR", ModelKind::KerasRegression, 10);
        let ts = set.minute()[0].open_time;
        let (_, last_ct) = set.lookback_range(10, ts).unwrap();
        assert_eq!(regression.get(last_ct).unwrap().len(), SYNTHETIC_FORECAST_STEPS + 1);
        let classification = synthetic_forecasts(&set, "KC", ModelKind::KerasClassification, 10);
        let pair = classification.get(last_ct).unwrap();
        assert_eq!(pair.len(), 2);
        assert!((pair[0] + pair[1] - 1.0).abs() < 0.011);
    }
}
