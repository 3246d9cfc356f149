//! Error types for the normalization path.
//!
//! Analytics (anomaly detection, trends, seasonality) never return these: an
//! absence of signal is reported as a zero-valued result instead.

use thiserror::Error;

/// No conversion path exists between two currencies
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("No exchange rate available from {from} to {to}")]
pub struct CurrencyConversionError {
    /// Source currency code
    pub from: String,
    /// Target currency code
    pub to: String,
}

impl CurrencyConversionError {
    pub fn new(from: impl Into<String>, to: impl Into<String>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// Base error for normalizing a provider payload into a unified record
#[derive(Debug, Error)]
pub enum NormalizationError {
    /// Currency conversion failed
    #[error("Currency conversion failed: {0}")]
    CurrencyConversion(#[from] CurrencyConversionError),

    /// Validation or variance check failed
    #[error("Data transformation failed: {reason}")]
    DataTransformation { reason: String },

    /// Payload is missing required information
    #[error("Invalid payload: {reason}")]
    InvalidPayload { reason: String },

    /// JSON serialization/deserialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl NormalizationError {
    /// Creates a data transformation error
    pub fn data_transformation(reason: impl Into<String>) -> Self {
        Self::DataTransformation {
            reason: reason.into(),
        }
    }

    /// Creates an invalid payload error
    pub fn invalid_payload(reason: impl Into<String>) -> Self {
        Self::InvalidPayload {
            reason: reason.into(),
        }
    }

    /// Whether the failure came from a missing exchange rate
    pub fn is_currency_error(&self) -> bool {
        matches!(self, Self::CurrencyConversion(_))
    }
}

/// Failure talking to an exchange-rate source. Always absorbed by the converter.
#[derive(Debug, Error)]
pub enum RateFetchError {
    /// Transport failure or timeout
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// Rate service answered with a non-success status
    #[error("Rate service returned status {0}")]
    Status(u16),

    /// Response did not contain the requested currency
    #[error("Rate for {0} missing from response")]
    MissingRate(String),

    /// No rate source is configured
    #[error("Rate source unavailable")]
    Unavailable,

    /// Rate source settings are out of range
    #[error("Rate source misconfigured: {0}")]
    Config(#[from] ConfigError),
}

/// Invalid configuration value
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid configuration: {key}={value} ({reason})")]
pub struct ConfigError {
    pub key: String,
    pub value: String,
    pub reason: String,
}

/// Normalization result type
pub type Result<T> = std::result::Result<T, NormalizationError>;
