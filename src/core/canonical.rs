//! Canonical quoting for sources that publish each pair in one direction only.
//!
//! A source such as freeforex only answers `EURUSD`, never `USDEUR`. The
//! [`PriorityTable`] decides which currency of a pair is the base; the
//! [`CanonicalProvider`] queries that key and inverts the result when the
//! caller asked for the other direction.

use crate::core::currency::{Currency, CurrencyPair};
use crate::core::rate::{PARITY, Rate, RateError, RateProvider, to_fixed, to_fixed_inverse};
use async_trait::async_trait;
use tracing::debug;

/// Ordered currencies; an earlier currency is quoted as the base.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriorityTable {
    currencies: Vec<Currency>,
}

/// Direction of a requested pair relative to its canonical pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    AsQuoted,
    Inverted,
}

impl PriorityTable {
    pub fn new(currencies: Vec<Currency>) -> Self {
        Self { currencies }
    }

    pub fn position(&self, currency: Currency) -> Result<usize, RateError> {
        self.currencies
            .iter()
            .position(|c| *c == currency)
            .ok_or(RateError::UnknownCurrency(currency))
    }

    /// Returns the canonical pair for `(from, to)` and how the request relates to it.
    pub fn canonicalize(
        &self,
        from: Currency,
        to: Currency,
    ) -> Result<(CurrencyPair, Direction), RateError> {
        let requested = CurrencyPair::new(from, to);
        if self.position(from)? <= self.position(to)? {
            Ok((requested, Direction::AsQuoted))
        } else {
            Ok((requested.inverse(), Direction::Inverted))
        }
    }
}

impl Default for PriorityTable {
    fn default() -> Self {
        Self::new(vec![
            Currency::EUR,
            Currency::GBP,
            Currency::USD,
            Currency::CAD,
        ])
    }
}

/// A backing source that only publishes canonical pairs.
#[async_trait]
pub trait AsymmetricSource: Send + Sync {
    /// Fetches the floating point rate for a canonical pair, e.g. `EURUSD`.
    ///
    /// Returns [`RateError::MissingRate`] when the source does not carry the pair.
    async fn fetch_canonical(&self, pair: CurrencyPair) -> Result<f64, RateError>;
}

/// Serves both directions of every pair from an [`AsymmetricSource`].
pub struct CanonicalProvider<S> {
    source: S,
    priorities: PriorityTable,
}

impl<S: AsymmetricSource> CanonicalProvider<S> {
    pub fn new(source: S) -> Self {
        Self::with_priorities(source, PriorityTable::default())
    }

    pub fn with_priorities(source: S, priorities: PriorityTable) -> Self {
        Self { source, priorities }
    }

    pub fn source(&self) -> &S {
        &self.source
    }
}

#[async_trait]
impl<S: AsymmetricSource> RateProvider for CanonicalProvider<S> {
    async fn get_rate(&self, from: Currency, to: Currency) -> Result<Rate, RateError> {
        if from == to {
            return Ok(PARITY);
        }

        let (canonical, direction) = self.priorities.canonicalize(from, to)?;
        debug!(%canonical, ?direction, "Fetching canonical rate");
        let rate = self.source.fetch_canonical(canonical).await?;

        match direction {
            Direction::AsQuoted => to_fixed(canonical, rate),
            Direction::Inverted => to_fixed_inverse(canonical, rate),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::Mutex;

    struct RecordingSource {
        rates: HashMap<String, f64>,
        requested: Mutex<Vec<String>>,
    }

    impl RecordingSource {
        fn new(rates: &[(&str, f64)]) -> Self {
            Self {
                rates: rates.iter().map(|(k, v)| (k.to_string(), *v)).collect(),
                requested: Mutex::new(Vec::new()),
            }
        }

        fn requested(&self) -> Vec<String> {
            self.requested.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl AsymmetricSource for RecordingSource {
        async fn fetch_canonical(&self, pair: CurrencyPair) -> Result<f64, RateError> {
            let key = pair.to_string();
            self.requested.lock().unwrap().push(key.clone());
            self.rates
                .get(&key)
                .copied()
                .ok_or(RateError::MissingRate { pair })
        }
    }

    #[test]
    fn test_canonicalize_orders_by_priority() {
        let table = PriorityTable::default();

        let (pair, direction) = table.canonicalize(Currency::EUR, Currency::USD).unwrap();
        assert_eq!(pair.to_string(), "EURUSD");
        assert_eq!(direction, Direction::AsQuoted);

        let (pair, direction) = table.canonicalize(Currency::CAD, Currency::GBP).unwrap();
        assert_eq!(pair.to_string(), "GBPCAD");
        assert_eq!(direction, Direction::Inverted);
    }

    #[test]
    fn test_unknown_currency_is_an_error() {
        let table = PriorityTable::default();
        let jpy: Currency = "JPY".parse().unwrap();
        let result = table.canonicalize(Currency::USD, jpy);
        assert!(matches!(result, Err(RateError::UnknownCurrency(c)) if c == jpy));
    }

    #[tokio::test]
    async fn test_same_currency_is_parity_without_lookup() {
        let provider = CanonicalProvider::new(RecordingSource::new(&[]));
        for currency in [Currency::USD, Currency::EUR, "JPY".parse().unwrap()] {
            assert_eq!(provider.get_rate(currency, currency).await.unwrap(), PARITY);
        }
        assert!(provider.source().requested().is_empty());
    }

    #[tokio::test]
    async fn test_reversed_request_queries_canonical_key_and_inverts() {
        let provider = CanonicalProvider::new(RecordingSource::new(&[("EURUSD", 1.25)]));

        let rate = provider.get_rate(Currency::USD, Currency::EUR).await.unwrap();
        assert_eq!(rate, 800_000);
        assert_eq!(provider.source().requested(), vec!["EURUSD"]);

        let rate = provider.get_rate(Currency::EUR, Currency::USD).await.unwrap();
        assert_eq!(rate, 1_250_000);
        assert_eq!(provider.source().requested(), vec!["EURUSD", "EURUSD"]);
    }

    #[tokio::test]
    async fn test_both_directions_multiply_to_parity_squared() {
        let provider = CanonicalProvider::new(RecordingSource::new(&[
            ("EURGBP", 0.8567),
            ("EURUSD", 1.0843),
            ("EURCAD", 1.4721),
            ("GBPUSD", 1.2657),
            ("GBPCAD", 1.7183),
            ("USDCAD", 1.3577),
        ]));
        let currencies = [Currency::EUR, Currency::GBP, Currency::USD, Currency::CAD];

        for a in currencies {
            for b in currencies {
                let forward = provider.get_rate(a, b).await.unwrap() as f64;
                let backward = provider.get_rate(b, a).await.unwrap() as f64;
                let product = forward * backward;
                let parity_squared = (PARITY as f64) * (PARITY as f64);
                // Half a fixed-point unit of rounding on each side
                assert!(
                    (product - parity_squared).abs() / parity_squared < 5e-6,
                    "{a}{b}: {forward} * {backward}"
                );
            }
        }
    }

    #[tokio::test]
    async fn test_missing_canonical_rate_names_the_pair() {
        let provider = CanonicalProvider::new(RecordingSource::new(&[]));
        let err = provider
            .get_rate(Currency::CAD, Currency::USD)
            .await
            .unwrap_err();
        assert_eq!(err.to_string(), "response did not include rate USDCAD");
    }

    #[tokio::test]
    async fn test_zero_rate_cannot_be_inverted() {
        let provider = CanonicalProvider::new(RecordingSource::new(&[("GBPUSD", 0.0)]));
        let result = provider.get_rate(Currency::USD, Currency::GBP).await;
        assert!(matches!(result, Err(RateError::InvalidRate { .. })));
    }

    #[tokio::test]
    async fn test_custom_priorities() {
        let table = PriorityTable::new(vec![Currency::USD, Currency::EUR]);
        let provider =
            CanonicalProvider::with_priorities(RecordingSource::new(&[("USDEUR", 0.5)]), table);
        assert_eq!(
            provider.get_rate(Currency::EUR, Currency::USD).await.unwrap(),
            2_000_000
        );
        assert_eq!(provider.source().requested(), vec!["USDEUR"]);
    }
}
