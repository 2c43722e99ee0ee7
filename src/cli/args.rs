//! Command-line argument parsing for archduel
//!
//! Provides clap-based CLI with subcommands and verbosity control.

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// archduel - orchestration engine for two-player system design duels
#[derive(Parser, Debug)]
#[command(name = "archduel")]
#[command(version)]
#[command(about = "Drive a system design duel round with coach, chaos and judge agents", long_about = None)]
pub struct Args {
    /// Configuration file path (defaults to ~/.archduel/config.toml)
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Enable the Ollama oracle regardless of the configuration file
    #[arg(long)]
    pub oracle: bool,

    /// Ollama model override
    #[arg(short, long)]
    pub model: Option<String>,

    /// Ollama base URL override
    #[arg(long)]
    pub ollama_url: Option<String>,

    /// Verbosity level: default info, -v debug, -vv trace
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Subcommand
    #[command(subcommand)]
    pub command: Commands,
}

/// Available subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Replay a scenario through the engine and print outbound events as JSON lines
    Simulate {
        /// Scenario file (JSON); the built-in demo round when omitted
        #[arg(value_name = "SCENARIO")]
        scenario: Option<PathBuf>,

        /// Room id used by the built-in demo round
        #[arg(long, default_value = "demo")]
        room: String,
    },

    /// Display the effective configuration as TOML
    Config,
}

impl Args {
    /// Default log filter for the verbosity level
    pub fn log_filter(&self) -> &'static str {
        match self.verbose {
            0 => "archduel=info",
            1 => "archduel=debug",
            _ => "archduel=trace",
        }
    }
}
