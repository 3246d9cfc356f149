//! Currency conversion with a TTL rate cache and a static fallback table
//!
//! Rate resolution: identity, cached API rate, live API rate, then the fallback
//! table (direct pair, inverse pair, or a cross rate through USD). Rate source
//! failures are logged and never surface to callers.

use crate::config::CurrencyConfig;
use crate::error::{CurrencyConversionError, RateFetchError};
use async_trait::async_trait;
use chrono::{DateTime, Duration as ChronoDuration, Utc};
use dashmap::DashMap;
use parking_lot::RwLock;
use reqwest::Client;
use rust_decimal::prelude::FromPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::Deserialize;
use std::collections::{BTreeSet, HashMap};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, warn};

const PIVOT_CURRENCY: &str = "USD";

/// Rates quoted against USD, used when no live rate is available
const FALLBACK_USD_RATES: &[(&str, &str)] = &[
    ("EUR", "0.85"),
    ("GBP", "0.73"),
    ("JPY", "110.0"),
    ("CAD", "1.25"),
    ("AUD", "1.35"),
    ("CHF", "0.92"),
    ("CNY", "6.45"),
    ("INR", "74.5"),
    ("BRL", "5.2"),
    ("MXN", "20.0"),
    ("SEK", "8.6"),
    ("NOK", "8.5"),
    ("DKK", "6.3"),
    ("SGD", "1.35"),
    ("HKD", "7.8"),
    ("KRW", "1180.0"),
    ("NZD", "1.42"),
    ("ZAR", "14.5"),
];

/// Source of live exchange rates
#[async_trait]
pub trait RateProvider: Send + Sync {
    /// Units of `to` per one unit of `from`
    async fn fetch_rate(&self, from: &str, to: &str) -> Result<Decimal, RateFetchError>;
}

/// Rate provider backed by an HTTP exchange-rate API.
///
/// Issues `GET {base_url}/{FROM}` and reads `{"rates": {"EUR": 0.85, ...}}`.
#[derive(Clone)]
pub struct HttpRateProvider {
    client: Client,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct RatesResponse {
    rates: HashMap<String, f64>,
}

impl HttpRateProvider {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, RateFetchError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        })
    }
}

#[async_trait]
impl RateProvider for HttpRateProvider {
    async fn fetch_rate(&self, from: &str, to: &str) -> Result<Decimal, RateFetchError> {
        let url = format!("{}/{}", self.base_url, from);
        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(RateFetchError::Status(response.status().as_u16()));
        }

        let body = response.json::<RatesResponse>().await?;
        body.rates
            .get(to)
            .copied()
            .filter(|rate| rate.is_finite() && *rate > 0.0)
            .and_then(Decimal::from_f64)
            .ok_or_else(|| RateFetchError::MissingRate(to.to_string()))
    }
}

/// Rate provider for offline runs; every lookup falls through to the fallback table
#[derive(Debug, Clone, Copy, Default)]
pub struct OfflineRateProvider;

#[async_trait]
impl RateProvider for OfflineRateProvider {
    async fn fetch_rate(&self, _from: &str, _to: &str) -> Result<Decimal, RateFetchError> {
        Err(RateFetchError::Unavailable)
    }
}

#[derive(Debug, Clone, Copy)]
struct CachedRate {
    rate: Decimal,
    fetched_at: DateTime<Utc>,
}

pub struct CurrencyConverter {
    provider: Arc<dyn RateProvider>,
    cache: DashMap<(String, String), CachedRate>,
    cache_ttl: ChronoDuration,
    fallback_rates: RwLock<HashMap<(String, String), Decimal>>,
}

impl CurrencyConverter {
    pub fn new(provider: Arc<dyn RateProvider>, cache_ttl: ChronoDuration) -> Self {
        let fallback_rates = FALLBACK_USD_RATES
            .iter()
            .filter_map(|(code, rate)| {
                rate.parse::<Decimal>()
                    .ok()
                    .map(|rate| ((PIVOT_CURRENCY.to_string(), code.to_string()), rate))
            })
            .collect();

        Self {
            provider,
            cache: DashMap::new(),
            cache_ttl,
            fallback_rates: RwLock::new(fallback_rates),
        }
    }

    /// Converter that never leaves the process
    pub fn offline() -> Self {
        Self::new(Arc::new(OfflineRateProvider), ChronoDuration::hours(24))
    }

    /// HTTP-backed converter when a rate API is configured, offline otherwise.
    ///
    /// Fails on an out-of-range cache TTL instead of building an unusable cache.
    pub fn from_config(config: &CurrencyConfig) -> Result<Self, RateFetchError> {
        let ttl = config.cache_ttl()?;
        let provider: Arc<dyn RateProvider> = match &config.rate_api_url {
            Some(url) => Arc::new(HttpRateProvider::new(
                url.clone(),
                Duration::from_secs(config.request_timeout_secs),
            )?),
            None => Arc::new(OfflineRateProvider),
        };
        Ok(Self::new(provider, ttl))
    }

    /// Convert `amount`, rounding half away from zero to cents.
    ///
    /// Same-currency conversion returns the amount untouched.
    pub async fn convert_amount(
        &self,
        amount: Decimal,
        from: &str,
        to: &str,
    ) -> Result<Decimal, CurrencyConversionError> {
        if from.eq_ignore_ascii_case(to) {
            return Ok(amount);
        }

        let rate = self.get_exchange_rate(from, to).await?;
        Ok((amount * rate).round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero))
    }

    pub async fn get_exchange_rate(
        &self,
        from: &str,
        to: &str,
    ) -> Result<Decimal, CurrencyConversionError> {
        let from = from.trim().to_uppercase();
        let to = to.trim().to_uppercase();

        if from == to {
            return Ok(Decimal::ONE);
        }

        let key = (from.clone(), to.clone());
        if let Some(cached) = self.cache.get(&key) {
            if Utc::now() - cached.fetched_at < self.cache_ttl {
                return Ok(cached.rate);
            }
        }

        match self.provider.fetch_rate(&from, &to).await {
            Ok(rate) => {
                debug!("Fetched exchange rate {} -> {}: {}", from, to, rate);
                self.cache.insert(
                    key,
                    CachedRate {
                        rate,
                        fetched_at: Utc::now(),
                    },
                );
                return Ok(rate);
            }
            Err(RateFetchError::Unavailable) => {}
            Err(e) => warn!("Exchange rate lookup {} -> {} failed, using fallback: {}", from, to, e),
        }

        self.fallback_rate(&from, &to)
            .ok_or_else(|| CurrencyConversionError::new(from, to))
    }

    fn fallback_rate(&self, from: &str, to: &str) -> Option<Decimal> {
        let table = self.fallback_rates.read();
        let lookup = |a: &str, b: &str| -> Option<Decimal> {
            if a == b {
                return Some(Decimal::ONE);
            }
            if let Some(rate) = table.get(&(a.to_string(), b.to_string())) {
                return Some(*rate);
            }
            table
                .get(&(b.to_string(), a.to_string()))
                .filter(|rate| !rate.is_zero())
                .map(|rate| Decimal::ONE / *rate)
        };

        lookup(from, to).or_else(|| {
            let to_pivot = lookup(from, PIVOT_CURRENCY)?;
            let from_pivot = lookup(PIVOT_CURRENCY, to)?;
            Some(to_pivot * from_pivot)
        })
    }

    /// Add or replace a fallback pair
    pub fn set_fallback_rate(&self, from: &str, to: &str, rate: Decimal) {
        self.fallback_rates
            .write()
            .insert((from.trim().to_uppercase(), to.trim().to_uppercase()), rate);
    }

    /// Currency codes reachable through the fallback table
    pub fn supported_currencies(&self) -> Vec<String> {
        let table = self.fallback_rates.read();
        let codes: BTreeSet<String> = table
            .keys()
            .flat_map(|(a, b)| [a.clone(), b.clone()])
            .collect();
        codes.into_iter().collect()
    }

    pub fn clear_cache(&self) {
        self.cache.clear();
    }

    pub fn cache_size(&self) -> usize {
        self.cache.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FixedRateProvider {
        rate: Decimal,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl RateProvider for FixedRateProvider {
        async fn fetch_rate(&self, _from: &str, _to: &str) -> Result<Decimal, RateFetchError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            Ok(self.rate)
        }
    }

    struct FailingRateProvider;

    #[async_trait]
    impl RateProvider for FailingRateProvider {
        async fn fetch_rate(&self, _from: &str, _to: &str) -> Result<Decimal, RateFetchError> {
            Err(RateFetchError::Status(503))
        }
    }

    #[test]
    fn test_from_config_rejects_out_of_range_ttl() {
        for hours in [0, -1, i64::MAX / 2] {
            let config = CurrencyConfig {
                cache_ttl_hours: hours,
                ..CurrencyConfig::default()
            };
            assert!(matches!(
                CurrencyConverter::from_config(&config),
                Err(RateFetchError::Config(_))
            ));
        }
        assert!(CurrencyConverter::from_config(&CurrencyConfig::default()).is_ok());
    }

    #[tokio::test]
    async fn test_same_currency_is_identity() {
        let converter = CurrencyConverter::offline();
        let amount = dec!(123.456);
        assert_eq!(converter.convert_amount(amount, "USD", "USD").await.unwrap(), amount);
        assert_eq!(converter.convert_amount(amount, "usd", "USD").await.unwrap(), amount);
    }

    #[tokio::test]
    async fn test_direct_fallback_rate() {
        let converter = CurrencyConverter::offline();
        let eur = converter.convert_amount(dec!(100), "USD", "EUR").await.unwrap();
        assert_eq!(eur, dec!(85.00));
    }

    #[tokio::test]
    async fn test_inverse_fallback_rate_rounds_half_away_from_zero() {
        let converter = CurrencyConverter::offline();
        // 100 / 0.85 = 117.647...
        let usd = converter.convert_amount(dec!(100), "EUR", "USD").await.unwrap();
        assert_eq!(usd, dec!(117.65));
    }

    #[tokio::test]
    async fn test_cross_rate_through_usd() {
        let converter = CurrencyConverter::offline();
        let rate = converter.get_exchange_rate("EUR", "GBP").await.unwrap();
        let expected = dec!(0.73) / dec!(0.85);
        assert!((rate - expected).abs() < dec!(0.000001));
    }

    #[tokio::test]
    async fn test_unknown_currency_fails() {
        let converter = CurrencyConverter::offline();
        let err = converter
            .convert_amount(dec!(10), "USD", "XYZ")
            .await
            .unwrap_err();
        assert_eq!(err, CurrencyConversionError::new("USD", "XYZ"));
    }

    #[tokio::test]
    async fn test_live_rates_are_cached() {
        let provider = Arc::new(FixedRateProvider {
            rate: dec!(0.5),
            calls: AtomicUsize::new(0),
        });
        let converter = CurrencyConverter::new(provider.clone(), ChronoDuration::hours(24));

        assert_eq!(converter.convert_amount(dec!(10), "USD", "EUR").await.unwrap(), dec!(5.00));
        assert_eq!(converter.convert_amount(dec!(20), "USD", "EUR").await.unwrap(), dec!(10.00));
        assert_eq!(provider.calls.load(Ordering::SeqCst), 1);
        assert_eq!(converter.cache_size(), 1);

        converter.clear_cache();
        assert_eq!(converter.cache_size(), 0);
    }

    #[tokio::test]
    async fn test_expired_cache_entry_is_refetched() {
        let provider = Arc::new(FixedRateProvider {
            rate: dec!(2),
            calls: AtomicUsize::new(0),
        });
        let converter = CurrencyConverter::new(provider.clone(), ChronoDuration::zero());

        converter.get_exchange_rate("USD", "EUR").await.unwrap();
        converter.get_exchange_rate("USD", "EUR").await.unwrap();
        assert_eq!(provider.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_provider_failure_degrades_to_fallback() {
        let converter =
            CurrencyConverter::new(Arc::new(FailingRateProvider), ChronoDuration::hours(24));
        let rate = converter.get_exchange_rate("USD", "JPY").await.unwrap();
        assert_eq!(rate, dec!(110.0));
        assert_eq!(converter.cache_size(), 0);
    }

    #[tokio::test]
    async fn test_set_fallback_rate_extends_table() {
        let converter = CurrencyConverter::offline();
        assert!(!converter.supported_currencies().contains(&"PLN".to_string()));

        converter.set_fallback_rate("usd", "pln", dec!(4.0));
        assert!(converter.supported_currencies().contains(&"PLN".to_string()));
        assert_eq!(
            converter.convert_amount(dec!(10), "USD", "PLN").await.unwrap(),
            dec!(40.00)
        );
    }
}
