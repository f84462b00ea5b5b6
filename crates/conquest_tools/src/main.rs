//! Tower Conquest - Development Tools

use std::path::PathBuf;
use std::process::ExitCode;

use clap::{Parser, Subcommand};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use conquest_core::config::MatchConfig;
use conquest_tools::validate::{validate_data_directory, validate_levels_file, ValidationReport};

#[derive(Parser)]
#[command(name = "conquest-tools")]
#[command(about = "Development tools for Tower Conquest")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Validate data files
    Validate {
        /// Path to the data directory
        #[arg(default_value = "data")]
        path: PathBuf,

        /// Validate a single level file instead of a data directory
        #[arg(long, conflicts_with = "path")]
        levels: Option<PathBuf>,

        /// Config file to check the level file against
        #[arg(long, requires = "levels")]
        config: Option<PathBuf>,

        /// Treat warnings as failures
        #[arg(long)]
        deny_warnings: bool,
    },
}

fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer())
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Validate {
            path,
            levels,
            config,
            deny_warnings,
        } => {
            let report = match levels {
                Some(levels) => {
                    tracing::info!("Validating level file: {}", levels.display());
                    config
                        .map_or_else(|| Ok(MatchConfig::default()), MatchConfig::load)
                        .and_then(|config| validate_levels_file(&levels, &config))
                }
                None => {
                    tracing::info!("Validating data files in: {}", path.display());
                    validate_data_directory(&path)
                }
            };
            finish(report, deny_warnings)
        }
    }
}

fn finish(report: conquest_core::error::Result<ValidationReport>, deny_warnings: bool) -> ExitCode {
    match report {
        Ok(report) => {
            report.log();
            let warnings = report.warning_count();
            if report.has_errors() || (deny_warnings && warnings > 0) {
                tracing::error!(issues = report.issues.len(), "Validation failed");
                ExitCode::FAILURE
            } else {
                tracing::info!(warnings, "Validation passed");
                ExitCode::SUCCESS
            }
        }
        Err(e) => {
            tracing::error!("Validation failed: {e}");
            ExitCode::FAILURE
        }
    }
}
