use crate::core::canonical::{AsymmetricSource, CanonicalProvider, Direction, PriorityTable};
use crate::core::currency::{Currency, CurrencyPair};
use crate::core::rate::RateError;
use anyhow::{Result, anyhow};
use async_trait::async_trait;
use std::collections::HashMap;

/// Static canonical quotes, served through [`CanonicalProvider`].
pub type FixedRateProvider = CanonicalProvider<FixedRates>;

/// In-memory table of canonical rates. Has no I/O, so it is also usable from
/// dynamically loaded drivers that cannot share the host's async runtime.
#[derive(Debug, Clone, Default)]
pub struct FixedRates {
    rates: HashMap<CurrencyPair, f64>,
}

impl FixedRates {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a rate for `pair`, which must already be canonical.
    pub fn with_rate(mut self, pair: CurrencyPair, rate: f64) -> Self {
        self.rates.insert(pair, rate);
        self
    }

    /// Builds the table from keys such as `"EURUSD"`.
    ///
    /// A key quoted against the canonical direction, such as `"CADUSD"`, is
    /// stored inverted under its canonical pair.
    pub fn from_quotes<'a>(quotes: impl IntoIterator<Item = (&'a str, f64)>) -> Result<Self> {
        let priorities = PriorityTable::default();
        let mut rates = HashMap::new();
        for (key, rate) in quotes {
            let pair = parse_pair(key)?;
            if pair.base == pair.quote {
                return Err(anyhow!("Pair {} quotes a currency against itself", pair));
            }
            if !rate.is_finite() || rate <= 0.0 {
                return Err(anyhow!("Invalid rate {} for {}", rate, pair));
            }

            let (canonical, direction) = priorities.canonicalize(pair.base, pair.quote)?;
            let rate = match direction {
                Direction::AsQuoted => rate,
                Direction::Inverted => 1.0 / rate,
            };
            if rates.insert(canonical, rate).is_some() {
                return Err(anyhow!("Rate for {} is given more than once", canonical));
            }
        }
        Ok(Self { rates })
    }

    pub fn into_provider(self) -> FixedRateProvider {
        CanonicalProvider::new(self)
    }
}

fn parse_pair(key: &str) -> Result<CurrencyPair> {
    let key = key.trim();
    if key.len() != 6 || !key.is_ascii() {
        return Err(anyhow!("Invalid currency pair: {}", key));
    }
    let (base, quote) = key.split_at(3);
    Ok(CurrencyPair::new(
        base.parse::<Currency>()?,
        quote.parse::<Currency>()?,
    ))
}

#[async_trait]
impl AsymmetricSource for FixedRates {
    async fn fetch_canonical(&self, pair: CurrencyPair) -> Result<f64, RateError> {
        self.rates
            .get(&pair)
            .copied()
            .ok_or(RateError::MissingRate { pair })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::rate::RateProvider;

    #[tokio::test]
    async fn test_fixed_rates_from_quotes() {
        let provider = FixedRates::from_quotes([("eurusd", 1.1), ("USDCAD", 1.35)])
            .unwrap()
            .into_provider();

        assert_eq!(
            provider.get_rate(Currency::EUR, Currency::USD).await.unwrap(),
            1_100_000
        );
        assert_eq!(
            provider.get_rate(Currency::CAD, Currency::USD).await.unwrap(),
            740_741
        );
        assert!(matches!(
            provider.get_rate(Currency::GBP, Currency::USD).await,
            Err(RateError::MissingRate { .. })
        ));
    }

    #[test]
    fn test_invalid_quote_keys() {
        assert!(FixedRates::from_quotes([("EURUS", 1.0)]).is_err());
        assert!(FixedRates::from_quotes([("EUR/USD", 1.0)]).is_err());
        assert!(FixedRates::from_quotes([("€URUSD", 1.0)]).is_err());
    }

    #[tokio::test]
    async fn test_reversed_quote_is_stored_canonically() {
        let provider = FixedRates::from_quotes([("CADUSD", 0.8)])
            .unwrap()
            .into_provider();

        assert_eq!(
            provider.get_rate(Currency::USD, Currency::CAD).await.unwrap(),
            1_250_000
        );
        assert_eq!(
            provider.get_rate(Currency::CAD, Currency::USD).await.unwrap(),
            800_000
        );
    }

    #[test]
    fn test_unquotable_rates_are_rejected() {
        for rate in [0.0, -3.0, f64::NAN, f64::INFINITY] {
            let err = FixedRates::from_quotes([("GBPUSD", rate)]).unwrap_err();
            assert!(err.to_string().contains("Invalid rate"), "{err}");
        }

        let err = FixedRates::from_quotes([("JPYUSD", 0.0067)]).unwrap_err();
        assert!(err.to_string().contains("no canonical quoting priority"));

        let err = FixedRates::from_quotes([("USDUSD", 1.0)]).unwrap_err();
        assert!(err.to_string().contains("against itself"));

        let err = FixedRates::from_quotes([("USDCAD", 1.25), ("CADUSD", 0.8)]).unwrap_err();
        assert_eq!(err.to_string(), "Rate for USDCAD is given more than once");
    }
}
