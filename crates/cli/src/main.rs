//! Stake Drafter - command-line entry point
//!
//! # Usage
//!
//! ```bash
//! # Aggregate the staking resources of an address from the node
//! stake-drafter sync --address cosmos1...
//!
//! # List the validator roster
//! stake-drafter validators --format json
//!
//! # Prepare and validate a delegation
//! stake-drafter draft --account account.json --mode delegate \
//!     --validator cosmosvaloper1... --validator-amount 1.5
//!
//! # Generate a synthetic fixture account
//! stake-drafter simulate --seed 42
//! ```

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use config::{Config, ConfigLoader, ConfigValidator, LoggingConfig};
use std::env;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::fmt::writer::BoxMakeWriter;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

mod commands;
mod context;

use commands::{DraftCommand, SimulateCommand, SyncCommand, ValidatorsCommand};
use context::AppContext;

/// Staking transaction drafter
#[derive(Parser)]
#[command(name = "stake-drafter")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Build, price and validate staking transactions", long_about = None)]
struct Cli {
    /// Path to the configuration file
    #[arg(short, long, global = true, env = "CONFIG_PATH", default_value = "config.yaml")]
    config: PathBuf,

    /// Log format (json, pretty); overrides the configuration
    #[arg(long, global = true, env = "LOG_FORMAT")]
    log_format: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Aggregate the staking resources of an address
    Sync(SyncCommand),

    /// Print the validator roster
    Validators(ValidatorsCommand),

    /// Prepare and validate a transaction draft
    Draft(DraftCommand),

    /// Generate a synthetic account
    Simulate(SimulateCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if it exists
    let dotenv_result = dotenv::dotenv();

    let cli = Cli::parse();
    let (config, from_file) = load_config(&cli.config)?;

    init_logging(&config.logging, cli.log_format.as_deref())?;

    match dotenv_result {
        Ok(path) => info!(path = %path.display(), "Loaded environment variables from .env file"),
        Err(e) if !e.not_found() => warn!("Could not load .env file: {}", e),
        Err(_) => {}
    }

    if from_file {
        info!(path = %cli.config.display(), "Configuration loaded");
    } else {
        warn!(path = %cli.config.display(), "Configuration file not found, using defaults and environment");
    }

    let report = ConfigValidator::validate(&config).context("Failed to validate configuration")?;
    for issue in &report.warnings {
        warn!(field = %issue.field, "{}", issue.message);
    }
    if report.has_errors() {
        let details: Vec<String> = report
            .errors
            .iter()
            .map(|issue| format!("{}: {}", issue.field, issue.message))
            .collect();
        anyhow::bail!("Invalid configuration: {}", details.join("; "));
    }

    let ctx = AppContext::new(config).context("Failed to create application context")?;

    let cancel = CancellationToken::new();
    let signal_token = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            info!("Shutdown signal received");
            signal_token.cancel();
        }
    });

    match cli.command {
        Commands::Sync(cmd) => cmd.execute(&ctx, &cancel).await,
        Commands::Validators(cmd) => cmd.execute(&ctx, &cancel).await,
        Commands::Draft(cmd) => cmd.execute(&ctx, &cancel).await,
        Commands::Simulate(cmd) => cmd.execute(&ctx),
    }
}

/// Load the configuration file, or defaults plus environment when it is missing
fn load_config(path: &Path) -> Result<(Config, bool)> {
    if path.exists() {
        let config = ConfigLoader::load(path).context("Failed to load configuration")?;
        Ok((config, true))
    } else {
        let config = ConfigLoader::load_from_env().context("Failed to load configuration")?;
        Ok((config, false))
    }
}

/// Initialize logging from the configuration, `RUST_LOG` taking precedence
fn init_logging(logging: &LoggingConfig, format_override: Option<&str>) -> Result<()> {
    let log_format = format_override.unwrap_or(&logging.format).to_string();

    let env_filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&logging.level));

    // stdout carries command output
    let writer = match &logging.file_path {
        Some(path) => {
            let file = std::fs::OpenOptions::new()
                .create(true)
                .append(true)
                .open(path)
                .with_context(|| format!("Failed to open log file {path}"))?;
            BoxMakeWriter::new(std::sync::Mutex::new(file))
        }
        None => BoxMakeWriter::new(std::io::stderr),
    };

    let registry = tracing_subscriber::registry().with(env_filter);

    match log_format.as_str() {
        "pretty" => {
            registry
                .with(tracing_subscriber::fmt::layer().pretty().with_writer(writer))
                .try_init()
                .context("Failed to initialize pretty logging")?;
        }
        _ => {
            registry
                .with(tracing_subscriber::fmt::layer().json().with_writer(writer))
                .try_init()
                .context("Failed to initialize JSON logging")?;
        }
    }

    let log_level = env::var("RUST_LOG").unwrap_or_else(|_| logging.level.clone());
    tracing::debug!(level = %log_level, format = %log_format, "Logging initialized");

    Ok(())
}
