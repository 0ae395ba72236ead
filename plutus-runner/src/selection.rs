//! Regression selection: groups finished backtests by exit combination and
//! keeps the best performers of each group.
//!
//! Ranking uses the median of the points ledger rather than its final value,
//! so a model with one lucky streak does not outrank a steady one.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::info;

use plutus_core::domain::Timestamp;
use plutus_core::exit_combination::ExitCombination;
use plutus_core::numbers::{mean, median, round2};

use crate::result::BacktestResult;

/// Smallest accepted `models_limit`.
pub const MIN_MODELS_LIMIT: usize = 5;

/// Fractions of the ledger sampled by `points_median_hist`.
const HIST_STEPS: usize = 10;

#[derive(Debug, Error, PartialEq)]
pub enum SelectionError {
    #[error("models limit must be at least {MIN_MODELS_LIMIT}, got {0}")]
    LimitTooLow(usize),

    #[error("not enough backtest results: need at least {needed}, found {found}")]
    NotEnoughResults { needed: usize, found: usize },

    #[error(
        "backtest range mismatch for model '{model}': expected {expected_start}..{expected_end}, \
         found {start}..{end}"
    )]
    DateMismatch {
        model: String,
        expected_start: Timestamp,
        expected_end: Timestamp,
        start: Timestamp,
        end: Timestamp,
    },

    #[error("model '{model}' used exit combination {combination}, which is not in the catalog")]
    UnknownCombination { model: String, combination: String },
}

/// Per-model figures kept in a selection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSelection {
    pub model_id: String,
    pub points_median: f64,
    /// Median of the first 10%, 20%, ... 100% of the ledger.
    pub points_median_hist: Vec<f64>,
    pub long_num: usize,
    pub short_num: usize,
    pub long_acc: f64,
    pub short_acc: f64,
    pub general_acc: f64,
}

impl ModelSelection {
    fn from_result(result: &BacktestResult) -> Self {
        let perf = &result.performance;
        Self {
            model_id: result.model_id().to_string(),
            points_median: perf.points_median,
            points_median_hist: points_median_hist(&perf.points_hist),
            long_num: perf.long_num,
            short_num: perf.short_num,
            long_acc: perf.long_acc,
            short_acc: perf.short_acc,
            general_acc: perf.general_acc,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CombinationSelection {
    /// `TP10_SL15`
    pub combination_id: String,
    /// `02_TP10_SL15`
    pub combination_path: String,
    pub models_num: usize,
    /// Mean of the members' `points_median`.
    pub points_mean: f64,
    pub model_results: Vec<ModelSelection>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionSelection {
    pub id: String,
    pub models_limit: usize,
    pub start: Timestamp,
    pub end: Timestamp,
    /// Results considered, before truncation.
    pub models_num: usize,
    pub results: Vec<CombinationSelection>,
}

/// `hist[i]` is the median of the first `floor(len * (i + 1) / 10)` entries.
pub fn points_median_hist(points: &[f64]) -> Vec<f64> {
    (1..=HIST_STEPS)
        .map(|step| {
            let n = points.len() * step / HIST_STEPS;
            round2(median(&points[..n]))
        })
        .collect()
}

impl RegressionSelection {
    /// Build a selection stamped with the current time.
    pub fn new(results: &[BacktestResult], models_limit: usize) -> Result<Self, SelectionError> {
        Self::build(results, models_limit, chrono::Utc::now().timestamp_millis())
    }

    /// Build a selection; `created_at` only feeds the id.
    pub fn build(
        results: &[BacktestResult],
        models_limit: usize,
        created_at: Timestamp,
    ) -> Result<Self, SelectionError> {
        if models_limit < MIN_MODELS_LIMIT {
            return Err(SelectionError::LimitTooLow(models_limit));
        }
        if results.len() < models_limit {
            return Err(SelectionError::NotEnoughResults {
                needed: models_limit,
                found: results.len(),
            });
        }

        let first = &results[0].backtest;
        let (start, end) = (first.start, first.end);
        let mut groups: BTreeMap<u8, (ExitCombination, Vec<ModelSelection>)> = BTreeMap::new();
        for result in results {
            let b = &result.backtest;
            if b.start != start || b.end != end {
                return Err(SelectionError::DateMismatch {
                    model: result.model_id().to_string(),
                    expected_start: start,
                    expected_end: end,
                    start: b.start,
                    end: b.end,
                });
            }
            let combination_id = b.combination_id();
            let combination = ExitCombination::by_id(&combination_id).ok_or_else(|| {
                SelectionError::UnknownCombination {
                    model: result.model_id().to_string(),
                    combination: combination_id.clone(),
                }
            })?;
            groups
                .entry(combination.ordinal)
                .or_insert_with(|| (combination, Vec::new()))
                .1
                .push(ModelSelection::from_result(result));
        }

        let mut combos: Vec<CombinationSelection> = groups
            .into_values()
            .map(|(combination, mut models)| {
                models.sort_by(|a, b| b.points_median.total_cmp(&a.points_median));
                models.truncate(models_limit);
                let medians: Vec<f64> = models.iter().map(|m| m.points_median).collect();
                CombinationSelection {
                    combination_id: combination.id(),
                    combination_path: combination.path(),
                    models_num: models.len(),
                    points_mean: round2(mean(&medians)),
                    model_results: models,
                }
            })
            .collect();
        // Stable sort: equal means keep catalog order.
        combos.sort_by(|a, b| b.points_mean.total_cmp(&a.points_mean));

        let models_num = results.len();
        let selected: usize = combos.iter().map(|c| c.models_num).sum();
        let id = selection_id(&combos, created_at);
        info!(
            id = %id,
            groups = combos.len(),
            models = models_num,
            selected,
            models_limit,
            "regression selection built"
        );
        Ok(Self {
            id,
            models_limit,
            start,
            end,
            models_num,
            results: combos,
        })
    }
}

fn selection_id(combos: &[CombinationSelection], created_at: Timestamp) -> String {
    let mut hasher = blake3::Hasher::new();
    for model in combos.iter().flat_map(|c| &c.model_results) {
        hasher.update(model.model_id.as_bytes());
        hasher.update(b"\n");
    }
    hasher.update(&created_at.to_le_bytes());
    hasher.finalize().to_hex().as_str()[..16].to_string()
}
