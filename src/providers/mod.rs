pub mod currencyapi;
pub mod fixed;
pub mod freeforex;

use crate::core::config::{HttpConfig, ProvidersConfig};
use crate::core::registry::Registry;
use anyhow::{Context, Result};
use std::sync::Arc;
use tracing::debug;

pub const FREEFOREX: &str = "freeforex";
pub const CURRENCYAPI: &str = "currencyapi";

/// Builds the HTTP client shared by the built-in drivers.
pub fn http_client(http: &HttpConfig) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .user_agent("forex/0.1")
        .timeout(http.timeout())
        .build()
        .context("Failed to build HTTP client")
}

/// Registers the drivers compiled into this binary that are enabled in `providers`.
pub fn register_builtin(
    registry: &Registry,
    providers: &ProvidersConfig,
    http: &HttpConfig,
) -> Result<()> {
    let client = http_client(http)?;

    if let Some(freeforex) = &providers.freeforex {
        debug!(base_url = %freeforex.base_url, "Enabling freeforex driver");
        registry.try_register(
            FREEFOREX,
            Arc::new(freeforex::provider(&freeforex.base_url, client.clone())),
        )?;
    }
    if let Some(currencyapi) = &providers.currencyapi {
        debug!(base_url = %currencyapi.base_url, "Enabling currencyapi driver");
        registry.try_register(
            CURRENCYAPI,
            Arc::new(currencyapi::CurrencyApiProvider::new(
                &currencyapi.base_url,
                client,
            )),
        )?;
    }
    Ok(())
}
