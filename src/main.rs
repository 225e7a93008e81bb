//! Main entry point for the application.
//!
//! This module initializes logging, loads environment variables and configuration,
//! builds the task execution engine and dispatches the selected subcommand:
//! - `serve` runs the HTTP API
//! - `run` creates a task and executes it in the foreground
//! - `search` queries long-term memory
//! - `check` verifies the vector index against the database

use clap::Parser;
use orchestrator::api::{server::launch_server, AppState, RateLimits};
use orchestrator::cli::{Cli, Command};
use orchestrator::config::{load_config, AppConfig};
use orchestrator::core::TaskExecutionEngine;
use orchestrator::rate_limit::FixedWindowRateLimiter;
use orchestrator::utils;
use serde_json::Value;
use std::error::Error;
use std::sync::Arc;
use tracing::{error, info, warn};

#[tokio::main]
async fn main() {
    let cli = Cli::parse();
    utils::init_logging(&cli.logging_level, cli.log_dir.as_deref());

    if let Err(e) = dotenvy::dotenv() {
        warn!("Failed to load .env file: {}", e);
    }

    if let Err(e) = run(cli).await {
        error!("{}", e);
        std::process::exit(1);
    }
}

fn resolve_config(cli: &Cli) -> Result<AppConfig, Box<dyn Error>> {
    let mut config = match &cli.config {
        Some(path) => load_config(path)?,
        None => AppConfig::default(),
    };
    config.apply_env_overrides()?;
    config.validate()?;
    Ok(config)
}

async fn run(cli: Cli) -> Result<(), Box<dyn Error>> {
    let config = resolve_config(&cli)?;
    let engine = TaskExecutionEngine::from_config(&config)?;

    match cli.command {
        Command::Serve { port } => {
            let state = AppState {
                engine,
                rate_limiter: Arc::new(FixedWindowRateLimiter::new()),
                limits: RateLimits::from_config(&config.rate_limit)?,
            };
            let port = port.unwrap_or(config.api.port);
            info!("Starting API server on port {}", port);
            launch_server(state, &config.api.host, port).await?;
        }
        Command::Run {
            description,
            user_id,
            metadata,
        } => {
            let metadata = match metadata {
                Some(raw) => serde_json::from_str(&raw)?,
                None => Value::Null,
            };
            let task = engine.create_task(&user_id, &description, metadata).await?;
            let status = engine.run(&task.id).await?;
            info!("Task {} ended as {}", task.id, status);

            let detail = engine.get_task_detail(&task.id).await?;
            println!("{}", serde_json::to_string_pretty(&detail)?);
        }
        Command::Search { query, limit } => {
            let hits = engine.search_long_term_memory(&query, limit).await?;
            println!("{}", serde_json::to_string_pretty(&hits)?);
        }
        Command::Check => {
            let count = engine.long_term().check_consistency().await?;
            println!(
                "Vector index {} is consistent with the database ({} memories)",
                engine.long_term().index_path().display(),
                count
            );
        }
    }
    Ok(())
}
