//! Clubledger main entry point

use anyhow::Context;
use clap::Parser;
use clubledger_api::{start_server, AppState};
use clubledger_client::{BackendRef, HttpBackend, InMemoryBackend};
use clubledger_config::{Config, ConfigError};
use clubledger_core::RecordStore;
use clubledger_utils::format_amount;
use std::path::{Path, PathBuf};
use std::sync::Arc;

#[derive(Parser, Debug)]
#[command(name = "clubledger")]
#[command(version = "0.1.0")]
#[command(about = "Finance ledger and refund reconciliation for club administration", long_about = None)]
struct Args {
    /// Configuration file path
    #[arg(short, long, default_value = "config.yaml")]
    config: PathBuf,

    /// Serve records from a JSON fixture instead of the backend
    #[arg(long)]
    fixture: Option<PathBuf>,
}

/// Load the config file; a missing file falls back to defaults
fn load_config(path: &Path) -> anyhow::Result<(Config, Option<String>)> {
    match Config::load(path) {
        Ok(config) => Ok((config, None)),
        Err(ConfigError::FileNotFound { path }) => Ok((Config::default(), Some(path))),
        Err(e) => Err(e).context("failed to load configuration"),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    let (config, missing) = load_config(&args.config)?;

    env_logger::Builder::from_env(
        env_logger::Env::default().default_filter_or(config.logging.level.as_str()),
    )
    .init();

    if let Some(path) = missing {
        log::warn!("Config file not found: {}; using defaults", path);
    }

    let backend: BackendRef = match &args.fixture {
        Some(path) => Arc::new(
            InMemoryBackend::from_fixture_file(path)
                .await
                .with_context(|| format!("failed to load fixture {}", path.display()))?,
        ),
        None => {
            log::info!("Using backend at {}", config.backend_url());
            Arc::new(HttpBackend::new(&config).context("failed to build backend client")?)
        }
    };

    let store = Arc::new(RecordStore::new(backend));
    match store.refresh().await {
        Ok(_) => {
            let stats = store.stats().await;
            let places = config.finance.decimal_places;
            log::info!(
                "Income {} {}, expenses {} {}, net {} {}",
                format_amount(stats.transactions.total_income, places),
                config.finance.currency,
                format_amount(stats.transactions.total_expenses, places),
                config.finance.currency,
                format_amount(stats.transactions.net_income, places),
                config.finance.currency,
            );
        }
        Err(e) => log::warn!("Initial load failed: {}", e),
    }

    start_server(AppState::new(config, store)).await
}
