use crate::core::currency::Currency;
use anyhow::{Context, Result};
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use std::{fs, path::PathBuf};
use tracing::debug;

pub const DEFAULT_FREEFOREX_URL: &str = "https://www.freeforexapi.com";
pub const DEFAULT_CURRENCYAPI_URL: &str =
    "https://cdn.jsdelivr.net/gh/fawazahmed0/currency-api@1/latest";

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct FreeForexProviderConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct CurrencyApiProviderConfig {
    pub base_url: String,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ProvidersConfig {
    pub freeforex: Option<FreeForexProviderConfig>,
    pub currencyapi: Option<CurrencyApiProviderConfig>,
}

impl Default for ProvidersConfig {
    fn default() -> Self {
        ProvidersConfig {
            freeforex: Some(FreeForexProviderConfig {
                base_url: DEFAULT_FREEFOREX_URL.to_string(),
            }),
            currencyapi: Some(CurrencyApiProviderConfig {
                base_url: DEFAULT_CURRENCYAPI_URL.to_string(),
            }),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct HttpConfig {
    /// Upper bound for one upstream request, in seconds
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

fn default_timeout_secs() -> u64 {
    30
}

impl HttpConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout_secs: default_timeout_secs(),
        }
    }
}

/// What the watcher does when a unit dropped after startup fails to activate.
#[derive(Debug, Deserialize, Serialize, Clone, Copy, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum FailurePolicy {
    /// Stop watching and exit with the error
    #[default]
    Fatal,
    /// Log the unit and the error, keep watching
    Skip,
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct ExtensionsConfig {
    pub dir: Option<String>,
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
    pub activation_timeout_secs: Option<u64>,
    #[serde(default)]
    pub on_failure: FailurePolicy,
}

fn default_settle_delay_ms() -> u64 {
    250
}

impl Default for ExtensionsConfig {
    fn default() -> Self {
        Self {
            dir: None,
            settle_delay_ms: default_settle_delay_ms(),
            activation_timeout_secs: None,
            on_failure: FailurePolicy::default(),
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct DisplayConfig {
    pub base: Currency,
    pub quote: Currency,
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            base: Currency::USD,
            quote: Currency::CAD,
        }
    }
}

#[derive(Debug, Deserialize, Serialize, Clone, PartialEq)]
pub struct AppConfig {
    #[serde(default = "default_driver")]
    pub driver: String,
    #[serde(default)]
    pub providers: ProvidersConfig,
    #[serde(default)]
    pub http: HttpConfig,
    #[serde(default)]
    pub extensions: ExtensionsConfig,
    #[serde(default)]
    pub display: DisplayConfig,
}

fn default_driver() -> String {
    "freeforex".to_string()
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            driver: default_driver(),
            providers: ProvidersConfig::default(),
            http: HttpConfig::default(),
            extensions: ExtensionsConfig::default(),
            display: DisplayConfig::default(),
        }
    }
}

impl AppConfig {
    /// Loads the default config file, falling back to built-in defaults when it does not exist.
    pub fn load() -> Result<Self> {
        debug!("Loading default config");
        let config_path = Self::default_config_path()?;
        if !config_path.exists() {
            debug!(
                "No config at {}, using defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    pub fn default_config_path() -> Result<PathBuf> {
        let proj_dirs = ProjectDirs::from("dev", "forex", "forex")
            .context("Could not determine project directories")?;
        Ok(proj_dirs.config_dir().join("config.yaml"))
    }

    pub fn load_from_path<P: AsRef<std::path::Path>>(path: P) -> Result<Self> {
        let config_str = fs::read_to_string(path.as_ref())
            .with_context(|| format!("Failed to read config file: {}", path.as_ref().display()))?;

        let config: Self = serde_yaml::from_str(&config_str)
            .with_context(|| format!("Failed to parse config file: {}", path.as_ref().display()))?;
        debug!("Successfully loaded config");
        Ok(config)
    }
}
