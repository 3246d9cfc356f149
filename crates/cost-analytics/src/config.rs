use crate::error::ConfigError;
use chrono::Duration;
use serde::{Deserialize, Serialize};
use std::str::FromStr;

/// Longest accepted exchange-rate cache lifetime (one year)
pub const MAX_RATE_CACHE_TTL_HOURS: i64 = 24 * 365;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalyticsConfig {
    pub normalizer: NormalizerConfig,
    pub currency: CurrencyConfig,
    pub anomaly: AnomalyConfig,
    pub trend: TrendConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NormalizerConfig {
    /// Currency every record is expressed in
    pub target_currency: String,
    pub enable_cost_validation: bool,
    pub max_cost_variance_percent: f64,
    /// Upper bound on concurrently normalized payloads in a batch
    pub max_concurrency: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CurrencyConfig {
    /// Base URL of the exchange-rate API; `None` runs on the fallback table only
    pub rate_api_url: Option<String>,
    pub cache_ttl_hours: i64,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnomalyConfig {
    pub z_score_threshold: f64,
    pub iqr_multiplier: f64,
    pub min_z_score_points: usize,
    pub min_iqr_points: usize,
    pub spike_threshold_percent: f64,
    pub drop_threshold_percent: f64,
    pub new_service_min_cost: f64,
    pub disappeared_service_min_cost: f64,
    pub budget_deviation_percent: f64,
    pub use_ai: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TrendConfig {
    pub min_data_points: usize,
    pub trend_change_window: usize,
    pub seasonal_period: usize,
    pub forecast_days: usize,
}

impl Default for NormalizerConfig {
    fn default() -> Self {
        Self {
            target_currency: "USD".to_string(),
            enable_cost_validation: true,
            max_cost_variance_percent: 10.0,
            max_concurrency: 10,
        }
    }
}

impl Default for CurrencyConfig {
    fn default() -> Self {
        Self {
            rate_api_url: None,
            cache_ttl_hours: 24,
            request_timeout_secs: 10,
        }
    }
}

impl Default for AnomalyConfig {
    fn default() -> Self {
        Self {
            z_score_threshold: 2.0,
            iqr_multiplier: 1.5,
            min_z_score_points: 3,
            min_iqr_points: 4,
            spike_threshold_percent: 50.0,
            drop_threshold_percent: 30.0,
            new_service_min_cost: 100.0,
            disappeared_service_min_cost: 100.0,
            budget_deviation_percent: 20.0,
            use_ai: false,
        }
    }
}

impl Default for TrendConfig {
    fn default() -> Self {
        Self {
            min_data_points: 7,
            trend_change_window: 14,
            seasonal_period: 7,
            forecast_days: 30,
        }
    }
}

impl CurrencyConfig {
    /// Rate cache lifetime, rejected outside `1..=MAX_RATE_CACHE_TTL_HOURS`
    pub fn cache_ttl(&self) -> Result<Duration, ConfigError> {
        if !(1..=MAX_RATE_CACHE_TTL_HOURS).contains(&self.cache_ttl_hours) {
            return Err(ConfigError {
                key: "cache_ttl_hours".to_string(),
                value: self.cache_ttl_hours.to_string(),
                reason: format!("must be between 1 and {}", MAX_RATE_CACHE_TTL_HOURS),
            });
        }
        Ok(Duration::hours(self.cache_ttl_hours))
    }
}

impl AnalyticsConfig {
    /// Defaults overridden by `ANALYTICS_*` environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each `ANALYTICS_*` key.
    ///
    /// Any unparsable or out-of-range value fails the whole load.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(currency) = lookup("ANALYTICS_TARGET_CURRENCY") {
            config.normalizer.target_currency = currency.trim().to_uppercase();
        }
        config.normalizer.enable_cost_validation = parse_or(
            &lookup,
            "ANALYTICS_ENABLE_COST_VALIDATION",
            config.normalizer.enable_cost_validation,
        )?;
        config.normalizer.max_cost_variance_percent = parse_or(
            &lookup,
            "ANALYTICS_MAX_COST_VARIANCE_PERCENT",
            config.normalizer.max_cost_variance_percent,
        )?;
        config.normalizer.max_concurrency = parse_or(
            &lookup,
            "ANALYTICS_MAX_CONCURRENCY",
            config.normalizer.max_concurrency,
        )?;
        if config.normalizer.max_concurrency == 0 {
            return Err(ConfigError {
                key: "ANALYTICS_MAX_CONCURRENCY".to_string(),
                value: "0".to_string(),
                reason: "must be at least 1".to_string(),
            });
        }

        config.currency.rate_api_url = lookup("ANALYTICS_RATE_API_URL");
        config.currency.cache_ttl_hours = parse_or(
            &lookup,
            "ANALYTICS_RATE_CACHE_TTL_HOURS",
            config.currency.cache_ttl_hours,
        )?;
        config.currency.cache_ttl().map_err(|e| ConfigError {
            key: "ANALYTICS_RATE_CACHE_TTL_HOURS".to_string(),
            ..e
        })?;
        config.currency.request_timeout_secs = parse_or(
            &lookup,
            "ANALYTICS_RATE_TIMEOUT_SECS",
            config.currency.request_timeout_secs,
        )?;

        config.anomaly.z_score_threshold =
            parse_or(&lookup, "ANALYTICS_Z_SCORE_THRESHOLD", config.anomaly.z_score_threshold)?;
        config.anomaly.iqr_multiplier =
            parse_or(&lookup, "ANALYTICS_IQR_MULTIPLIER", config.anomaly.iqr_multiplier)?;

        config.trend.min_data_points =
            parse_or(&lookup, "ANALYTICS_MIN_TREND_POINTS", config.trend.min_data_points)?;
        config.trend.seasonal_period =
            parse_or(&lookup, "ANALYTICS_SEASONAL_PERIOD", config.trend.seasonal_period)?;
        config.trend.forecast_days =
            parse_or(&lookup, "ANALYTICS_FORECAST_DAYS", config.trend.forecast_days)?;

        Ok(config)
    }
}

fn parse_or<F, T>(lookup: &F, key: &str, default: T) -> Result<T, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: FromStr,
    T::Err: std::fmt::Display,
{
    match lookup(key) {
        Some(value) => value.trim().parse().map_err(|e: T::Err| ConfigError {
            key: key.to_string(),
            value,
            reason: e.to_string(),
        }),
        None => Ok(default),
    }
}
