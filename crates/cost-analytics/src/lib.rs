//! Multi-cloud cost analytics: normalization of AWS, GCP and Azure billing payloads
//! into unified daily cost records, plus anomaly detection, trend, seasonality and
//! forecast analysis over those records.

pub mod anomaly;
pub mod config;
pub mod error;
pub mod models;
pub mod normalize;
pub mod stats;
pub mod trend;

pub use anomaly::{AnomalyDetectionEngine, AnomalySummary, BudgetInfo};
pub use config::AnalyticsConfig;
pub use error::{CurrencyConversionError, NormalizationError, Result};
pub use normalize::{CostNormalizer, CurrencyConverter, ServiceCategoryMapper};
pub use trend::{CostForecaster, TrendAnalyzer};
