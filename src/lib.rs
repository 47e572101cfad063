pub mod cli;
pub mod core;
pub mod extension;
pub mod providers;

use crate::core::config::AppConfig;
use crate::core::currency::{Currency, CurrencyPair};
use crate::core::registry::Registry;
use crate::extension::{
    DylibActivator, ExtensionLoader, LoaderOptions, ManifestActivator, UnitActivator,
};
use anyhow::{Context, Result};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::{debug, info};

pub enum AppCommand {
    /// Quote one pair with one driver
    Rate {
        from: Currency,
        to: Currency,
        driver: Option<String>,
    },
    /// Quote `C1,C2` lines read from stdin
    Interactive { driver: Option<String> },
    /// List registered drivers
    Drivers,
    /// Load and watch an extension directory
    Watch { dir: Option<PathBuf> },
}

/// Builds a registry holding the built-in drivers enabled in `config`.
pub fn build_registry(config: &AppConfig) -> Result<Arc<Registry>> {
    let registry = Arc::new(Registry::new());
    providers::register_builtin(&registry, &config.providers, &config.http)?;
    debug!(drivers = ?registry.registered(), "Built-in drivers registered");
    Ok(registry)
}

fn unit_activator(config: &AppConfig) -> Result<Arc<UnitActivator>> {
    Ok(Arc::new(UnitActivator::new(
        DylibActivator::new(),
        ManifestActivator::new(&config.http)?,
    )))
}

/// Activates the units in `extensions.dir` once, when it is configured.
async fn load_extensions(registry: &Arc<Registry>, config: &AppConfig) -> Result<()> {
    let Some(dir) = &config.extensions.dir else {
        return Ok(());
    };
    let refreshes = ExtensionLoader::new(
        dir,
        Arc::clone(registry),
        unit_activator(config)?,
        LoaderOptions::from(&config.extensions),
    )
    .load()
    .await
    .with_context(|| format!("Failed to load extension units from {dir}"))?;
    debug!(units = refreshes.len(), "Extension units loaded");
    Ok(())
}

pub async fn run_command(command: AppCommand, config_path: Option<&str>) -> Result<()> {
    info!("forex starting...");

    let config = match config_path {
        Some(path) => AppConfig::load_from_path(path)?,
        None => AppConfig::load()?,
    };
    debug!("Loaded config: {config:#?}");

    let registry = build_registry(&config)?;
    if !matches!(command, AppCommand::Watch { .. }) {
        load_extensions(&registry, &config).await?;
    }

    match command {
        AppCommand::Rate { from, to, driver } => {
            let driver = driver.as_deref().unwrap_or(&config.driver);
            let provider = registry.require(driver)?;
            let rate = provider
                .get_rate(from, to)
                .await
                .with_context(|| format!("{driver} failed to quote {from}{to}"))?;
            println!("{rate}");
        }
        AppCommand::Interactive { driver } => {
            let driver = driver.as_deref().unwrap_or(&config.driver);
            let provider = registry.require(driver)?;
            let stdin = tokio::io::BufReader::new(tokio::io::stdin());
            cli::interactive::run_interactive(
                provider.as_ref(),
                stdin,
                std::io::stdout(),
                std::io::stderr(),
            )
            .await?;
        }
        AppCommand::Drivers => {
            for name in registry.registered() {
                println!("{name}");
            }
        }
        AppCommand::Watch { dir } => {
            let dir = dir
                .or_else(|| config.extensions.dir.as_ref().map(PathBuf::from))
                .context("No extension directory given and extensions.dir is not configured")?;
            let pair = CurrencyPair::new(config.display.base, config.display.quote);
            cli::watch::run_watch(
                registry,
                &dir,
                unit_activator(&config)?,
                LoaderOptions::from(&config.extensions),
                pair,
            )
            .await?;
        }
    }
    Ok(())
}
