//! Launchcast CLI
//!
//! A command-line tool for training the launch-weather classifier, checking
//! saved artifacts, and predicting launch suitability from live forecasts.

mod commands;
mod config;
mod output;

use anyhow::Result;
use clap::{Parser, Subcommand};
use commands::{evaluate, predict, schema, sites, train};
use std::path::PathBuf;
use tracing::debug;
use tracing_subscriber::EnvFilter;

/// Launchcast CLI
#[derive(Parser)]
#[command(name = "lcast")]
#[command(author, version, about = "Launch-weather suitability predictor", long_about = None)]
pub struct Cli {
    /// Artifact directory (falls back to the config file, then ./artifacts)
    #[arg(long, global = true, env = "LAUNCHCAST_ARTIFACT_DIR")]
    pub artifacts: Option<PathBuf>,

    /// Output format
    #[arg(long, short, global = true, default_value = "table")]
    pub format: output::OutputFormat,

    /// Enable verbose output
    #[arg(long, short, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Train a model from historical CSV data and save its artifacts
    Train(train::TrainArgs),

    /// Predict launch suitability for a site and date from the live forecast
    Predict(predict::PredictArgs),

    /// List known launch sites
    Sites,

    /// Show the feature schema of the saved model
    Schema,

    /// Evaluate the saved model against a labelled CSV
    Evaluate {
        /// Path to a CSV in the historical data layout
        data: PathBuf,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let level = if cli.verbose { "debug" } else { "info" };
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .with_writer(std::io::stderr)
        .init();

    let config = config::Config::load()?;
    let artifact_dir = cli
        .artifacts
        .clone()
        .or_else(|| config.artifact_dir.clone())
        .unwrap_or_else(|| PathBuf::from("./artifacts"));
    debug!(artifact_dir = %artifact_dir.display(), "Resolved artifact directory");

    match cli.command {
        Commands::Train(args) => {
            train::run(&args, &artifact_dir, cli.format)?;
        }
        Commands::Predict(args) => {
            predict::run(&args, &artifact_dir, &config, cli.format).await?;
        }
        Commands::Sites => {
            sites::list_sites(&config, cli.format)?;
        }
        Commands::Schema => {
            schema::show_schema(&artifact_dir, cli.format)?;
        }
        Commands::Evaluate { data } => {
            evaluate::run(&data, &artifact_dir, cli.format)?;
        }
    }

    Ok(())
}
