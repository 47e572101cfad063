use crate::core::currency::{Currency, CurrencyPair};
use crate::core::rate::{PARITY, Rate, RateError, RateProvider, to_fixed};
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashMap;
use tracing::{debug, instrument};

/// fawazahmed0/currency-api publishes every direction, so no canonicalization is needed.
pub struct CurrencyApiProvider {
    base_url: String,
    client: reqwest::Client,
}

impl CurrencyApiProvider {
    pub fn new(base_url: &str, client: reqwest::Client) -> Self {
        Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            client,
        }
    }
}

#[async_trait]
impl RateProvider for CurrencyApiProvider {
    #[instrument(name = "CurrencyApiFetch", skip(self), fields(from = %from, to = %to))]
    async fn get_rate(&self, from: Currency, to: Currency) -> Result<Rate, RateError> {
        if from == to {
            return Ok(PARITY);
        }

        let pair = CurrencyPair::new(from, to);
        let (from_code, to_code) = (from.to_lowercase(), to.to_lowercase());
        let url = format!(
            "{}/currencies/{}/{}.json",
            self.base_url, from_code, to_code
        );
        debug!("Requesting rate from {}", url);

        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(RateError::Status {
                pair,
                status: response.status(),
            });
        }

        let text = response.text().await?;
        let body: HashMap<String, Value> =
            serde_json::from_str(&text).map_err(|source| RateError::Decode { pair, source })?;

        let rate = body
            .get(&to_code)
            .and_then(Value::as_f64)
            .ok_or(RateError::MissingRate { pair })?;
        to_fixed(pair, rate)
    }
}
