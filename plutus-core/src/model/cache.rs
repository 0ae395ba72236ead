//! Forecast caches and prediction memos.

use std::collections::HashMap;
use std::sync::RwLock;

use serde::{Deserialize, Serialize};

use crate::domain::{Prediction, Timestamp};

/// One line of a forecast cache file (`{"t": <last_ct>, "v": [..]}`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastEntry {
    #[serde(rename = "t")]
    pub last_ct: Timestamp,
    #[serde(rename = "v")]
    pub values: Vec<f64>,
}

/// Raw model outputs keyed by the close time of the last lookback candle.
///
/// Regression models store forecast price lists, classification models
/// store `[up, down]` probabilities.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ForecastCache {
    entries: HashMap<Timestamp, Vec<f64>>,
}

impl ForecastCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Later entries for the same window replace earlier ones.
    pub fn insert(&mut self, last_ct: Timestamp, values: Vec<f64>) {
        self.entries.insert(last_ct, values);
    }

    pub fn get(&self, last_ct: Timestamp) -> Option<&[f64]> {
        self.entries.get(&last_ct).map(Vec::as_slice)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

impl FromIterator<ForecastEntry> for ForecastCache {
    fn from_iter<I: IntoIterator<Item = ForecastEntry>>(iter: I) -> Self {
        let mut cache = Self::new();
        for entry in iter {
            cache.insert(entry.last_ct, entry.values);
        }
        cache
    }
}

/// Minimized sub-model predictions keyed by lookback range `(first_ot, last_ct)`.
///
/// Shared across threads when one consensus model is driven in parallel
/// batches; lock poisoning is recovered from since entries are write-once.
#[derive(Debug, Default)]
pub struct PredictionMemo {
    entries: RwLock<HashMap<(Timestamp, Timestamp), Prediction>>,
}

impl PredictionMemo {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, range: (Timestamp, Timestamp)) -> Option<Prediction> {
        let entries = self.entries.read().unwrap_or_else(|e| e.into_inner());
        entries.get(&range).cloned()
    }

    /// Return the memoized prediction for `range`, computing and storing it
    /// (minimized) on a miss.
    pub fn get_or_insert_with(
        &self,
        range: (Timestamp, Timestamp),
        compute: impl FnOnce() -> Prediction,
    ) -> Prediction {
        if let Some(hit) = self.get(range) {
            return hit;
        }
        let prediction = compute().minimized();
        let mut entries = self.entries.write().unwrap_or_else(|e| e.into_inner());
        entries.entry(range).or_insert(prediction).clone()
    }

    pub fn len(&self) -> usize {
        self.entries.read().unwrap_or_else(|e| e.into_inner()).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{PredictionMetadata, Signal};

    #[test]
    fn cache_from_jsonl_entries() {
        let lines = [
            r#"{"t": 1000, "v": [1.0, 2.0]}"#,
            r#"{"t": 2000, "v": [3.0]}"#,
            r#"{"t": 1000, "v": [9.0]}"#,
        ];
        let cache: ForecastCache = lines
            .iter()
            .map(|l| serde_json::from_str::<ForecastEntry>(l).unwrap())
            .collect();
        assert_eq!(cache.len(), 2);
        assert_eq!(cache.get(1000), Some(&[9.0][..]));
        assert_eq!(cache.get(3000), None);
    }

    #[test]
    fn memo_computes_once_and_minimizes() {
        let memo = PredictionMemo::new();
        let mut calls = 0;
        let full = Prediction::new(
            Signal::Long,
            5,
            PredictionMetadata::Regression {
                d: "long".into(),
                npl: vec![1.0, 2.0],
            },
        );
        let first = memo.get_or_insert_with((0, 10), || {
            calls += 1;
            full.clone()
        });
        let second = memo.get_or_insert_with((0, 10), || {
            calls += 1;
            full.clone()
        });
        assert_eq!(calls, 1);
        assert_eq!(first, second);
        assert_eq!(first.metadata, vec![PredictionMetadata::minimal("long")]);
        assert_eq!(memo.len(), 1);
    }
}
