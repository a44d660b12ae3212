//! CLI interface for paper-watch
//!
//! Provides subcommands for:
//! - `run`: Open simulated positions and monitor them until closed
//! - `config`: Show the effective configuration

mod run;

pub use run::RunArgs;

use clap::{Parser, Subcommand};

#[derive(Parser, Debug)]
#[command(name = "paper-watch")]
#[command(about = "Paper-trading monitor for leveraged long positions")]
#[command(version)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// Path to configuration file
    #[arg(short, long, default_value = "config.toml")]
    pub config: String,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Open simulated positions and monitor them
    Run(RunArgs),
    /// Show configuration
    Config,
}
