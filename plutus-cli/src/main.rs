//! Plutus CLI: backtest and selection commands.
//!
//! Commands:
//! - `run`: backtest every model in a TOML config and save the results as one JSON batch
//! - `select`: build a regression selection from a results directory
//! - `combinations`: list the exit-combination catalog

use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use plutus_core::exit_combination::ExitCombination;
use plutus_runner::{
    load_results, run_from_config, save_csv_exports, BacktestConfig, BacktestResult,
    JsonDirectorySink, RegressionSelection, ResultSink,
};

#[derive(Parser)]
#[command(name = "plutus", about = "Plutus CLI: crypto signal backtesting engine")]
struct Cli {
    /// Emit logs as JSON lines.
    #[arg(long, global = true, default_value_t = false)]
    json_logs: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Backtest every model in a TOML config file.
    Run {
        /// Path to a TOML config file.
        #[arg(long)]
        config: PathBuf,

        /// Output directory for result JSON and CSV exports.
        #[arg(long, default_value = "results")]
        output_dir: PathBuf,

        /// Generate candles and forecasts instead of reading files.
        #[arg(long, default_value_t = false)]
        synthetic: bool,
    },
    /// Rank saved backtest results per exit combination.
    Select {
        /// Directory of saved backtest result JSON files.
        #[arg(long)]
        results_dir: PathBuf,

        /// Models kept per exit combination (at least 5).
        #[arg(long)]
        models_limit: usize,

        /// Write the selection here instead of stdout.
        #[arg(long)]
        output: Option<PathBuf>,
    },
    /// List the exit-combination catalog.
    Combinations,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.json_logs);

    match cli.command {
        Commands::Run {
            config,
            output_dir,
            synthetic,
        } => run_cmd(config, output_dir, synthetic),
        Commands::Select {
            results_dir,
            models_limit,
            output,
        } => select_cmd(results_dir, models_limit, output),
        Commands::Combinations => {
            for combination in ExitCombination::all() {
                println!(
                    "{}  take_profit={:.1}%  stop_loss={:.1}%",
                    combination.path(),
                    combination.take_profit_percent(),
                    combination.stop_loss_percent()
                );
            }
            Ok(())
        }
    }
}

/// `RUST_LOG` overrides the default `info` level.
fn init_logging(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);
    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

fn run_cmd(config_path: PathBuf, output_dir: PathBuf, synthetic: bool) -> Result<()> {
    let mut config = BacktestConfig::from_file(&config_path)
        .with_context(|| format!("failed to load config {}", config_path.display()))?;
    if synthetic {
        config.data.synthetic = true;
    }

    let run = run_from_config(&config, None)?;
    if run.results.is_empty() {
        bail!("backtest '{}' produced no results", config.backtest.id);
    }

    let sink = JsonDirectorySink::new(&output_dir)?;
    let path = sink.save(&run.results)?;
    tracing::info!(path = %path.display(), results = run.results.len(), "results saved");
    save_csv_exports(&run.results, &output_dir)?;

    print_summary(&run.results);
    if run.has_synthetic {
        println!("WARNING: Results based on SYNTHETIC data");
    }
    println!("Dataset hash:   {}", run.dataset_hash);
    println!("Results saved to: {}", output_dir.display());
    Ok(())
}

fn select_cmd(results_dir: PathBuf, models_limit: usize, output: Option<PathBuf>) -> Result<()> {
    let results = load_results(&results_dir)
        .with_context(|| format!("failed to load results from {}", results_dir.display()))?;
    let selection = RegressionSelection::new(&results, models_limit)?;
    let json = serde_json::to_string_pretty(&selection)?;

    match output {
        Some(path) => {
            std::fs::write(&path, json)
                .with_context(|| format!("failed to write {}", path.display()))?;
            println!(
                "Selection {} ({} results over {} combinations) saved to: {}",
                selection.id,
                selection.models_num,
                selection.results.len(),
                path.display()
            );
        }
        None => println!("{json}"),
    }
    Ok(())
}

fn print_summary(results: &[BacktestResult]) {
    println!();
    println!("=== Backtest {} ({}) ===", results[0].backtest.id, results[0].backtest.combination_id());
    println!(
        "{:<24} {:>9} {:>9} {:>6} {:>6} {:>8} {:>8}",
        "Model", "Points", "Median", "Longs", "Shorts", "Neutral", "Acc %"
    );
    for result in results {
        let perf = &result.performance;
        println!(
            "{:<24} {:>9.2} {:>9.2} {:>6} {:>6} {:>8} {:>8.2}",
            result.model_id(),
            perf.points,
            perf.points_median,
            perf.long_num,
            perf.short_num,
            perf.neutral_num,
            perf.general_acc
        );
        if let Some(motive) = &result.backtest.early_stopping {
            println!("  stopped early: {motive}");
        }
    }
    println!();
}
