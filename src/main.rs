//! archduel - Main CLI Entry Point

use anyhow::{Context, Result};
use archduel::cli::{Args, Commands, Scenario};
use archduel::config::EngineConfig;
use archduel::engine::GameEngine;
use chrono::{Duration, Utc};
use clap::Parser;
use std::path::Path;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Load configuration and apply command-line overrides
fn load_config(args: &Args) -> Result<EngineConfig> {
    let mut config = match &args.config {
        Some(path) => EngineConfig::from_file(path)?,
        None => EngineConfig::load()?,
    };

    if args.oracle {
        config.oracle.enabled = true;
    }
    if let Some(model) = &args.model {
        config.oracle.model = model.clone();
    }
    if let Some(url) = &args.ollama_url {
        config.oracle.base_url = url.clone();
    }

    Ok(config)
}

/// Replay a scenario on a simulated clock, printing outbound events as JSON lines
async fn simulate(config: EngineConfig, scenario: Option<&Path>, room: &str) -> Result<()> {
    let scenario = match scenario {
        Some(path) => Scenario::from_file(path)?,
        None => Scenario::demo(room),
    };
    let engine = GameEngine::new(config).context("Failed to build engine")?;

    let t0 = Utc::now();
    info!(events = scenario.events.len(), "simulation started");

    for timed in scenario.events {
        let now = t0 + Duration::milliseconds((timed.at_secs * 1000.0) as i64);
        for event in engine.handle_at(timed.event, now).await {
            let line = serde_json::json!({ "at_secs": timed.at_secs, "event": event });
            println!("{}", line);
        }
    }

    info!(rooms = engine.registry().len(), "simulation finished");
    Ok(())
}

/// Print the effective configuration
fn show_config(config: &EngineConfig) -> Result<()> {
    let path = EngineConfig::config_path()?;
    println!("# {}", path.display());
    println!("{}", toml::to_string_pretty(config).context("Failed to serialize config")?);
    Ok(())
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(args.log_filter()));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();

    let config = load_config(&args)?;

    match &args.command {
        Commands::Simulate { scenario, room } => simulate(config, scenario.as_deref(), room).await,
        Commands::Config => show_config(&config),
    }
}
