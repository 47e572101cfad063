//! YAML units that register additional instances of the built-in driver kinds.
//!
//! ```yaml
//! drivers:
//!   - name: freeforex-mirror
//!     kind: freeforex
//!     base_url: "https://mirror.example.com"
//!   - name: pegged
//!     kind: fixed
//!     rates:
//!       EURUSD: 1.0
//! ```

use super::{ActivationError, Activator};
use crate::core::config::{DEFAULT_CURRENCYAPI_URL, DEFAULT_FREEFOREX_URL, HttpConfig};
use crate::core::registry::Registrations;
use crate::providers::currencyapi::CurrencyApiProvider;
use crate::providers::fixed::FixedRates;
use crate::providers::{freeforex, http_client};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use tracing::info;

#[derive(Debug, Deserialize)]
struct Manifest {
    #[serde(default)]
    drivers: Vec<ManifestDriver>,
}

#[derive(Debug, Deserialize)]
struct ManifestDriver {
    name: String,
    #[serde(flatten)]
    kind: DriverKind,
}

#[derive(Debug, Deserialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
enum DriverKind {
    FreeForex { base_url: Option<String> },
    CurrencyApi { base_url: Option<String> },
    Fixed { rates: HashMap<String, f64> },
}

pub struct ManifestActivator {
    client: reqwest::Client,
}

impl ManifestActivator {
    pub fn new(http: &HttpConfig) -> Result<Self> {
        Ok(Self {
            client: http_client(http)?,
        })
    }

    fn build(&self, manifest: Manifest) -> Result<Registrations> {
        let mut registrations = Registrations::new();
        for driver in manifest.drivers {
            match driver.kind {
                DriverKind::FreeForex { base_url } => {
                    let base_url = base_url.as_deref().unwrap_or(DEFAULT_FREEFOREX_URL);
                    registrations.register(
                        driver.name,
                        freeforex::provider(base_url, self.client.clone()),
                    );
                }
                DriverKind::CurrencyApi { base_url } => {
                    let base_url = base_url.as_deref().unwrap_or(DEFAULT_CURRENCYAPI_URL);
                    registrations.register(
                        driver.name,
                        CurrencyApiProvider::new(base_url, self.client.clone()),
                    );
                }
                DriverKind::Fixed { rates } => {
                    let table = FixedRates::from_quotes(
                        rates.iter().map(|(pair, rate)| (pair.as_str(), *rate)),
                    )
                    .with_context(|| format!("Invalid rates for driver {}", driver.name))?;
                    registrations.register(driver.name, table.into_provider());
                }
            }
        }
        Ok(registrations)
    }
}

impl Activator for ManifestActivator {
    fn activate(&self, unit: &Path) -> Result<Registrations, ActivationError> {
        let manifest_error = |source: anyhow::Error| ActivationError::Manifest {
            path: unit.to_path_buf(),
            source,
        };

        let content = std::fs::read_to_string(unit)
            .context("Failed to read manifest")
            .map_err(manifest_error)?;
        let manifest: Manifest = serde_yaml::from_str(&content)
            .context("Failed to parse manifest")
            .map_err(manifest_error)?;
        let registrations = self.build(manifest).map_err(manifest_error)?;

        info!(
            drivers = ?registrations.names(),
            "Loaded driver manifest {}",
            unit.display()
        );
        Ok(registrations)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::currency::Currency;
    use crate::core::rate::RateProvider;
    use crate::core::registry::Registry;
    use tempfile::TempDir;

    fn write_unit(dir: &TempDir, name: &str, content: &str) -> std::path::PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, content).unwrap();
        path
    }

    fn activator() -> ManifestActivator {
        ManifestActivator::new(&HttpConfig::default()).unwrap()
    }

    #[tokio::test]
    async fn test_manifest_registers_every_kind() {
        let temp_dir = TempDir::new().unwrap();
        let unit = write_unit(
            &temp_dir,
            "drivers.yaml",
            r#"
drivers:
  - name: mirror
    kind: freeforex
    base_url: "http://localhost:9"
  - name: jsdelivr
    kind: currencyapi
  - name: pegged
    kind: fixed
    rates:
      EURUSD: 1.25
"#,
        );

        let registrations = activator().activate(&unit).unwrap();
        assert_eq!(registrations.names(), vec!["mirror", "jsdelivr", "pegged"]);

        let registry = Registry::new();
        registry.register_all(registrations).unwrap();
        let pegged = registry.open("pegged").unwrap();
        assert_eq!(
            pegged.get_rate(Currency::USD, Currency::EUR).await.unwrap(),
            800_000
        );
    }

    #[test]
    fn test_empty_manifest_registers_nothing() {
        let temp_dir = TempDir::new().unwrap();
        let unit = write_unit(&temp_dir, "empty.yaml", "drivers: []\n");
        assert!(activator().activate(&unit).unwrap().is_empty());
    }

    #[test]
    fn test_unknown_kind_is_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let unit = write_unit(
            &temp_dir,
            "bad.yaml",
            "drivers:\n  - name: x\n    kind: carrier-pigeon\n",
        );
        let err = activator().activate(&unit).unwrap_err();
        assert!(matches!(err, ActivationError::Manifest { .. }));
        assert!(err.to_string().contains("bad.yaml"));
    }

    #[test]
    fn test_invalid_fixed_rates_are_rejected() {
        let temp_dir = TempDir::new().unwrap();
        let unit = write_unit(
            &temp_dir,
            "bad-rates.yaml",
            "drivers:\n  - name: x\n    kind: fixed\n    rates:\n      EUR-USD: 1.0\n",
        );
        let err = activator().activate(&unit).unwrap_err();
        match err {
            ActivationError::Manifest { source, .. } => {
                assert!(source.to_string().contains("Invalid rates for driver x"))
            }
            other => panic!("expected manifest error, got {other:?}"),
        }
    }

    #[test]
    fn test_non_positive_fixed_rate_fails_activation() {
        let temp_dir = TempDir::new().unwrap();
        let unit = write_unit(
            &temp_dir,
            "negative.yaml",
            "drivers:\n  - name: sterling\n    kind: fixed\n    rates:\n      GBPUSD: -3.0\n",
        );
        match activator().activate(&unit).unwrap_err() {
            ActivationError::Manifest { source, .. } => {
                let message = format!("{source:#}");
                assert!(message.contains("Invalid rates for driver sterling"), "{message}");
                assert!(message.contains("Invalid rate -3 for GBPUSD"), "{message}");
            }
            other => panic!("expected manifest error, got {other:?}"),
        }
    }

    #[tokio::test]
    async fn test_reversed_fixed_rate_quotes_both_directions() {
        let temp_dir = TempDir::new().unwrap();
        let unit = write_unit(
            &temp_dir,
            "loonie.yaml",
            "drivers:\n  - name: loonie\n    kind: fixed\n    rates:\n      CADUSD: 0.8\n",
        );

        let registry = Registry::new();
        registry
            .register_all(activator().activate(&unit).unwrap())
            .unwrap();
        let loonie = registry.open("loonie").unwrap();
        assert_eq!(
            loonie.get_rate(Currency::CAD, Currency::USD).await.unwrap(),
            800_000
        );
        assert_eq!(
            loonie.get_rate(Currency::USD, Currency::CAD).await.unwrap(),
            1_250_000
        );
    }
}
