//! Rate quoting abstractions

use crate::core::currency::{Currency, CurrencyPair};
use async_trait::async_trait;

/// Fixed-point exchange rate where [`PARITY`] is a 1:1 exchange.
pub type Rate = i64;

pub const PARITY: Rate = 1_000_000;

#[derive(Debug, thiserror::Error)]
pub enum RateError {
    #[error("response did not include rate {pair}")]
    MissingRate { pair: CurrencyPair },

    #[error("currency {0} has no canonical quoting priority")]
    UnknownCurrency(Currency),

    #[error("source returned unusable rate {rate} for {pair}")]
    InvalidRate { pair: CurrencyPair, rate: f64 },

    #[error("HTTP error: {status} for currency pair: {pair}")]
    Status {
        pair: CurrencyPair,
        status: reqwest::StatusCode,
    },

    #[error("Failed to parse JSON response for {pair}: {source}")]
    Decode {
        pair: CurrencyPair,
        #[source]
        source: serde_json::Error,
    },

    #[error("Request error: {0}")]
    Request(#[from] reqwest::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

/// Converts a floating point rate to fixed point, rounding to the nearest unit.
pub fn to_fixed(pair: CurrencyPair, rate: f64) -> Result<Rate, RateError> {
    if !rate.is_finite() || rate <= 0.0 {
        return Err(RateError::InvalidRate { pair, rate });
    }
    checked_fixed(pair, rate, (rate * PARITY as f64).round())
}

/// Converts the inverse of a floating point rate to fixed point.
pub fn to_fixed_inverse(pair: CurrencyPair, rate: f64) -> Result<Rate, RateError> {
    if !rate.is_finite() || rate <= 0.0 {
        return Err(RateError::InvalidRate { pair, rate });
    }
    checked_fixed(pair, rate, (PARITY as f64 / rate).round())
}

// `as` saturates, so out of range values must be caught before the cast
fn checked_fixed(pair: CurrencyPair, rate: f64, scaled: f64) -> Result<Rate, RateError> {
    if scaled >= Rate::MAX as f64 {
        return Err(RateError::InvalidRate { pair, rate });
    }
    Ok(scaled as Rate)
}

/// A driver that quotes the rate between two currencies.
#[async_trait]
pub trait RateProvider: Send + Sync {
    /// Returns the fixed-point rate for converting `from` into `to`.
    async fn get_rate(&self, from: Currency, to: Currency) -> Result<Rate, RateError>;
}
