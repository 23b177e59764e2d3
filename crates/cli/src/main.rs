mod cli;
mod commands;
mod config;

use std::sync::Arc;

use clap::Parser;
use hatch_engine::ScriptEngine;
use hatch_storage::FilesystemPackageStore;
use hatch_store::{Installer, RegistryClient, Validator};

use crate::cli::Commands;
use crate::config::Config;

#[tokio::main]
async fn main() -> eyre::Result<()> {
    let cli = cli::Cli::parse();

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    let config_path = cli.config.unwrap_or_else(Config::default_path);

    if let Commands::Config { command } = cli.command {
        return commands::handle_config_command(command, &config_path).await;
    }

    let config = Config::load(&config_path).await?;
    let installer = build_installer(&config)?;

    commands::handle_package_command(cli.command, &installer, &config).await
}

fn build_installer(config: &Config) -> eyre::Result<Installer> {
    let registry = RegistryClient::new(config.registry.clone())?;
    let store = FilesystemPackageStore::for_origin(&config.storage.path, &config.storage.origin);
    tracing::debug!("Package store at {}", store.root_path().display());

    Ok(Installer::new(
        registry,
        Validator::new(config.validator.clone()),
        Arc::new(store),
        Arc::new(ScriptEngine::new(config.loader.clone())),
    ))
}
