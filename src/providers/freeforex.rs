use crate::core::canonical::{AsymmetricSource, CanonicalProvider};
use crate::core::currency::CurrencyPair;
use crate::core::rate::RateError;
use async_trait::async_trait;
use serde::Deserialize;
use std::collections::HashMap;
use tracing::{debug, instrument};

/// freeforexapi.com only quotes canonical pairs, so it is served through
/// [`CanonicalProvider`].
pub type FreeForexProvider = CanonicalProvider<FreeForexSource>;

pub fn provider(base_url: &str, client: reqwest::Client) -> FreeForexProvider {
    CanonicalProvider::new(FreeForexSource::new(base_url, client))
}

pub struct FreeForexSource {
    base_url: String,
    client: reqwest::Client,
}

impl FreeForexSource {
    pub fn new(base_url: &str, client: reqwest::Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }
}

#[derive(Debug, Deserialize)]
struct PairResponse {
    #[serde(default)]
    rates: HashMap<String, PairRate>,
}

#[derive(Debug, Deserialize)]
struct PairRate {
    rate: f64,
}

#[async_trait]
impl AsymmetricSource for FreeForexSource {
    #[instrument(name = "FreeForexFetch", skip(self), fields(pair = %pair))]
    async fn fetch_canonical(&self, pair: CurrencyPair) -> Result<f64, RateError> {
        let key = pair.to_string();
        let url = format!("{}/api/live?pairs={}", self.base_url, key);
        debug!("Requesting rate from {}", url);

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(RateError::Status {
                pair,
                status: response.status(),
            });
        }

        let text = response.text().await?;
        let data: PairResponse =
            serde_json::from_str(&text).map_err(|source| RateError::Decode { pair, source })?;

        data.rates
            .get(&key)
            .map(|r| r.rate)
            .ok_or(RateError::MissingRate { pair })
    }
}
