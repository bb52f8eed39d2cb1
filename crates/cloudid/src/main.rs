//! `cloudid` - manage locally registered cloud server accounts.
//!
//! Accounts, metadata and the default selection live in `SQLite`; passwords
//! and tokens go to the system keyring.

#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![forbid(unsafe_code)]

mod cli;
mod commands;

use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use cloudid_core::{AccountStore, KeyringVault, SqliteBackend, StoreConfig};
use tracing::{debug, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use cli::Cli;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    init_logging(cli.verbose);

    let config_path = cli.config.clone().unwrap_or_else(StoreConfig::default_path);
    let mut config = StoreConfig::load(&config_path)
        .await
        .with_context(|| format!("Failed to load config from {}", config_path.display()))?;
    if let Some(database) = cli.database {
        config.database_path = database;
    }

    let store = open_store(&config).await?;
    commands::run(&store, cli.command, &mut std::io::stdout().lock()).await
}

fn init_logging(verbose: bool) {
    let default_filter = if verbose {
        "cloudid=debug,cloudid_core=debug"
    } else {
        "cloudid=warn,cloudid_core=warn"
    };

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| default_filter.into()),
        )
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .init();
}

async fn open_store(config: &StoreConfig) -> Result<AccountStore<SqliteBackend>> {
    if let Some(parent) = config.database_path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .with_context(|| format!("Failed to create {}", parent.display()))?;
    }

    let path = config.database_url_path()?;
    let backend = SqliteBackend::new(path)
        .await
        .with_context(|| format!("Failed to open account database {path}"))?;
    let vault = KeyringVault::with_service(&config.keyring_service);
    debug!("Using keyring service {}", config.keyring_service);

    info!("Account store ready at {path}");
    Ok(AccountStore::new(Arc::new(backend), Arc::new(vault), config))
}
