//! FallWatch CLI
//!
//! Command-line front end for the fall and immobility monitor: replays
//! keypoint streams through the risk engine, drives the alert lifecycle and
//! inspects configuration.
//!
//! # Usage
//!
//! ```bash
//! # Monitor a recorded stream, acknowledging alerts from the terminal
//! fallwatch run --input night.jsonl --interactive
//!
//! # Replay a built-in scenario at 02:00 local time
//! fallwatch simulate hard-fall --hour 2
//!
//! # Thresholds in force at 08:00 for a lying posture
//! fallwatch thresholds --hour 8 --angle 10
//!
//! # Write a configuration file with defaults
//! fallwatch config init fallwatch.json
//! ```

use clap::{Parser, Subcommand, ValueEnum};

pub mod config;
pub mod input;
pub mod output;
pub mod run;
pub mod session;
pub mod settings;
pub mod simulate;
pub mod thresholds;

/// FallWatch Command Line Interface
#[derive(Parser, Debug)]
#[command(name = "fallwatch")]
#[command(author, version, about = "Fall and immobility monitoring from pose keypoints")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Log filter (overrides RUST_LOG), e.g. "debug" or "fallwatch_risk=trace"
    #[arg(long, global = true)]
    pub log_level: Option<String>,

    /// Command to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Top-level commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Evaluate a JSON-lines keypoint stream
    Run(run::RunArgs),

    /// Replay a synthetic scenario
    Simulate(simulate::SimulateArgs),

    /// Show effective thresholds
    Thresholds(thresholds::ThresholdsArgs),

    /// Configuration file commands
    #[command(subcommand)]
    Config(config::ConfigCommand),

    /// Display version information
    Version,
}

/// Output format for report commands
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum OutputFormat {
    /// Human-readable tables
    Table,
    /// Pretty-printed JSON
    Json,
}

/// Execute a top-level command
pub async fn execute(command: Commands) -> anyhow::Result<()> {
    match command {
        Commands::Run(args) => run::execute(args).await,
        Commands::Simulate(args) => simulate::execute(args).await,
        Commands::Thresholds(args) => thresholds::execute(args).await,
        Commands::Config(cmd) => config::execute(cmd).await,
        Commands::Version => {
            println!("fallwatch {}", env!("CARGO_PKG_VERSION"));
            println!("risk engine version: {}", fallwatch_risk::VERSION);
            println!("alerting version: {}", fallwatch_alerting::VERSION);
            Ok(())
        }
    }
}
