//! Headless Tower Conquest runner.
//!
//! Runs matches without graphics, either driven by JSON on stdin/stdout or
//! played by a built-in auto-player for balance testing.
//!
//! # Usage
//!
//! ```bash
//! # Interactive mode - read commands from stdin
//! cargo run -p conquest_headless
//!
//! # Play the campaign once with an auto-player
//! cargo run -p conquest_headless -- run --strategy weakest --seed 7
//!
//! # Run a batch of seeds
//! cargo run -p conquest_headless -- batch --count 200 --output results/
//!
//! # Verify determinism
//! cargo run -p conquest_headless -- verify --seed 12345 --runs 5
//! ```
//!
//! Input (stdin): JSON commands, one per line
//! Output (stdout): JSON responses, one per line
//! Logs (stderr): Debug information

use std::io;
use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use conquest_headless::{
    batch::{run_batch, verify_determinism, BatchConfig},
    game_runner::{run_game, GameConfig, DEFAULT_MAX_TICKS},
    runner::{HeadlessConfig, HeadlessRunner},
    scenario::{Scenario, BUILTIN},
    strategies::Strategy,
};

#[derive(Parser)]
#[command(name = "conquest_headless")]
#[command(about = "Headless Tower Conquest runner for AI testing and CI")]
#[command(version)]
struct Cli {
    /// Enable verbose logging to stderr
    #[arg(short, long, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Option<Commands>,
}

#[derive(Subcommand)]
enum Commands {
    /// Drive a match with JSON commands on stdin
    Interactive {
        /// Scenario file, or "builtin"
        #[arg(short, long, default_value = BUILTIN)]
        scenario: String,

        /// Match seed
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Progress file to load and save
        #[arg(short, long)]
        progress: Option<PathBuf>,

        /// Output state after every tick command
        #[arg(long)]
        auto_state: bool,
    },

    /// Play one game with an auto-player and print its metrics
    Run {
        /// Scenario file, or "builtin"
        #[arg(short, long, default_value = BUILTIN)]
        scenario: String,

        /// Auto-player preset or strategy file
        #[arg(long, default_value = "nearest")]
        strategy: String,

        /// Match seed
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Tick budget
        #[arg(long, default_value_t = DEFAULT_MAX_TICKS)]
        max_ticks: u64,
    },

    /// Run a batch of games for balance testing
    Batch {
        /// Scenario file, or "builtin"
        #[arg(short, long, default_value = BUILTIN)]
        scenario: String,

        /// Number of games to run
        #[arg(short, long, default_value = "100")]
        count: u32,

        /// Maximum parallel games (0 = auto)
        #[arg(short, long, default_value = "0")]
        parallel: u32,

        /// Output directory for results
        #[arg(short, long, default_value = "results")]
        output: PathBuf,

        /// Starting random seed
        #[arg(long, default_value = "0")]
        seed: u64,

        /// Auto-player preset or strategy file
        #[arg(long, default_value = "nearest")]
        strategy: String,

        /// Tick budget per game
        #[arg(long, default_value_t = DEFAULT_MAX_TICKS)]
        max_ticks: u64,
    },

    /// Verify determinism by running the same seed multiple times
    Verify {
        /// Scenario file, or "builtin"
        #[arg(short, long, default_value = BUILTIN)]
        scenario: String,

        /// Seed to verify
        #[arg(long, default_value = "12345")]
        seed: u64,

        /// Number of verification runs
        #[arg(short, long, default_value = "5")]
        runs: u32,

        /// Tick budget per run
        #[arg(long, default_value_t = DEFAULT_MAX_TICKS)]
        max_ticks: u64,
    },
}

fn main() -> ExitCode {
    let cli = Cli::parse();

    // Logs go to stderr; stdout is for protocol
    let log_level = if cli.verbose {
        tracing::Level::DEBUG
    } else {
        tracing::Level::INFO
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::fmt::layer()
                .with_writer(std::io::stderr)
                .with_ansi(true),
        )
        .with(tracing_subscriber::filter::LevelFilter::from_level(
            log_level,
        ))
        .init();

    let result = match cli.command {
        Some(Commands::Interactive {
            scenario,
            seed,
            progress,
            auto_state,
        }) => cmd_interactive(&scenario, seed, progress, auto_state),
        Some(Commands::Run {
            scenario,
            strategy,
            seed,
            max_ticks,
        }) => cmd_run(&scenario, &strategy, seed, max_ticks),
        Some(Commands::Batch {
            scenario,
            count,
            parallel,
            output,
            seed,
            strategy,
            max_ticks,
        }) => cmd_batch(&scenario, count, parallel, output, seed, &strategy, max_ticks),
        Some(Commands::Verify {
            scenario,
            seed,
            runs,
            max_ticks,
        }) => cmd_verify(&scenario, seed, runs, max_ticks),
        None => cmd_interactive(BUILTIN, 0, None, false),
    };

    match result {
        Ok(code) => code,
        Err(message) => {
            tracing::error!(error = %message, "Command failed");
            eprintln!("FATAL: {message}");
            ExitCode::FAILURE
        }
    }
}

type CmdResult = Result<ExitCode, String>;

fn load_scenario(name: &str) -> Result<Scenario, String> {
    Scenario::resolve(name).map_err(|e| format!("Cannot load scenario '{name}': {e}"))
}

fn load_strategy(name: &str) -> Result<Strategy, String> {
    Strategy::resolve(name).map_err(|e| format!("Cannot load strategy '{name}': {e}"))
}

/// Drive a match from stdin
fn cmd_interactive(
    scenario: &str,
    seed: u64,
    progress: Option<PathBuf>,
    auto_state: bool,
) -> CmdResult {
    let scenario = load_scenario(scenario)?;
    tracing::info!(scenario = %scenario.name, seed, "Starting interactive session");

    let config = HeadlessConfig {
        seed,
        auto_state_output: auto_state,
        progress_path: progress,
    };
    let mut runner = HeadlessRunner::new(&scenario, config).map_err(|e| e.to_string())?;
    runner
        .run(io::stdin().lock(), io::stdout().lock())
        .map_err(|e| format!("I/O error: {e}"))?;
    Ok(ExitCode::SUCCESS)
}

/// Play one game with an auto-player
fn cmd_run(scenario: &str, strategy: &str, seed: u64, max_ticks: u64) -> CmdResult {
    let scenario = load_scenario(scenario)?;
    let strategy = load_strategy(strategy)?;

    let config = GameConfig {
        strategy,
        max_ticks,
        ..GameConfig::new(scenario, seed)
    };
    let result = run_game(config).map_err(|e| e.to_string())?;

    let json = serde_json::to_string_pretty(&result.metrics).map_err(|e| e.to_string())?;
    println!("{json}");
    Ok(ExitCode::SUCCESS)
}

/// Run a batch of games
fn cmd_batch(
    scenario: &str,
    count: u32,
    parallel: u32,
    output: PathBuf,
    seed: u64,
    strategy: &str,
    max_ticks: u64,
) -> CmdResult {
    let scenario_data = load_scenario(scenario)?;
    let strategy = load_strategy(strategy)?;

    std::fs::create_dir_all(&output)
        .map_err(|e| format!("Cannot create output directory '{}': {e}", output.display()))?;

    let config = BatchConfig {
        parallel_games: parallel,
        ..BatchConfig::new(scenario, count)
    }
    .with_output(output.clone())
    .with_seed(seed)
    .with_strategy(strategy)
    .with_max_ticks(max_ticks);

    let results = run_batch(&scenario_data, config);

    let results_path = output.join("batch_results.json");
    results
        .save(&results_path)
        .map_err(|e| format!("Failed to save results: {e}"))?;

    let summary = &results.summary;
    eprintln!("\n{}", "=".repeat(50));
    eprintln!("BATCH COMPLETE");
    eprintln!("{}", "=".repeat(50));
    eprintln!("Games played: {}", results.games.len());
    if !results.errors.is_empty() {
        eprintln!("Games failed: {}", results.errors.len());
    }
    eprintln!(
        "Campaigns completed: {} ({:.1}%)",
        summary.campaigns_completed,
        summary.completion_rate * 100.0
    );
    eprintln!(
        "Duration (ticks): avg {:.0}, min {}, max {}",
        summary.avg_duration_ticks, summary.min_duration_ticks, summary.max_duration_ticks
    );
    for (level, stats) in &summary.levels {
        eprintln!(
            "  Level {}: {} attempts, {:.1}% won, {:.0} ticks to win",
            level + 1,
            stats.attempts,
            stats.win_rate * 100.0,
            stats.avg_ticks_to_win
        );
    }
    eprintln!("Results: {}", results_path.display());

    if results.errors.is_empty() {
        Ok(ExitCode::SUCCESS)
    } else {
        Ok(ExitCode::FAILURE)
    }
}

/// Verify determinism
fn cmd_verify(scenario: &str, seed: u64, runs: u32, max_ticks: u64) -> CmdResult {
    let scenario = load_scenario(scenario)?;
    tracing::info!(scenario = %scenario.name, seed, runs, "Verifying determinism");

    if verify_determinism(&scenario, seed, runs, max_ticks) {
        eprintln!("PASS: {runs} runs of seed {seed} produced identical results");
        Ok(ExitCode::SUCCESS)
    } else {
        eprintln!("FAIL: runs of seed {seed} diverged");
        Ok(ExitCode::FAILURE)
    }
}
