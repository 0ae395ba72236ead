//! CSV export of backtest results for external analysis tools.
//!
//! - **positions**: one row per closed position, across all models
//! - **summary**: one row per model

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};

use plutus_core::domain::Timestamp;

use crate::result::BacktestResult;

// ─── CSV export ─────────────────────────────────────────────────────

fn format_time(ms: Timestamp) -> String {
    DateTime::<Utc>::from_timestamp_millis(ms)
        .map(|t| t.format("%Y-%m-%d %H:%M:%S").to_string())
        .unwrap_or_else(|| ms.to_string())
}

/// Columns: model_id, side, open_time, close_time, duration_minutes,
/// open_price, take_profit_price, stop_loss_price, close_price, outcome,
/// points, prediction
pub fn export_positions_csv(results: &[BacktestResult]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);

    wtr.write_record([
        "model_id",
        "side",
        "open_time",
        "close_time",
        "duration_minutes",
        "open_price",
        "take_profit_price",
        "stop_loss_price",
        "close_price",
        "outcome",
        "points",
        "prediction",
    ])?;

    for result in results {
        for p in &result.performance.positions {
            let description = p
                .prediction
                .metadata
                .iter()
                .map(|m| m.description())
                .collect::<Vec<_>>()
                .join("|");
            wtr.write_record([
                result.model_id(),
                &p.side.to_string(),
                &format_time(p.open_time),
                &format_time(p.close_time),
                &p.duration_minutes().to_string(),
                &format!("{:.2}", p.open_price),
                &format!("{:.2}", p.take_profit_price),
                &format!("{:.2}", p.stop_loss_price),
                &format!("{:.2}", p.close_price),
                if p.outcome { "win" } else { "loss" },
                &format!("{:.2}", p.points),
                &description,
            ])?;
        }
    }

    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Columns: backtest_id, model_id, kind, combination, points,
/// points_median, positions, long_num, short_num, neutral_num, long_acc,
/// short_acc, general_acc, early_stopping
pub fn export_summary_csv(results: &[BacktestResult]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record([
        "backtest_id",
        "model_id",
        "kind",
        "combination",
        "points",
        "points_median",
        "positions",
        "long_num",
        "short_num",
        "neutral_num",
        "long_acc",
        "short_acc",
        "general_acc",
        "early_stopping",
    ])?;
    for r in results {
        let perf = &r.performance;
        wtr.write_record([
            r.backtest.id.as_str(),
            r.model_id(),
            &r.model.kind().to_string(),
            &r.backtest.combination_id(),
            &format!("{:.2}", perf.points),
            &format!("{:.2}", perf.points_median),
            &perf.positions_num().to_string(),
            &perf.long_num.to_string(),
            &perf.short_num.to_string(),
            &perf.neutral_num.to_string(),
            &format!("{:.2}", perf.long_acc),
            &format!("{:.2}", perf.short_acc),
            &format!("{:.2}", perf.general_acc),
            r.backtest.early_stopping.as_deref().unwrap_or(""),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Write `positions.csv` and `summary.csv` into `dir`.
pub fn save_csv_exports(results: &[BacktestResult], dir: &Path) -> Result<()> {
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create export dir: {}", dir.display()))?;
    std::fs::write(dir.join("positions.csv"), export_positions_csv(results)?)?;
    std::fs::write(dir.join("summary.csv"), export_summary_csv(results)?)?;
    Ok(())
}
