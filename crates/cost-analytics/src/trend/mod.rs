//! Trend, seasonality and forecast analysis over unified cost records

pub mod analyzer;
pub mod forecast;
pub mod seasonal;
pub mod time_series;

pub use analyzer::{calculate_growth_rates, trend_confidence, TrendAnalyzer};
pub use forecast::CostForecaster;
pub use seasonal::{analyze_seasonality, daily_totals, SeasonalDecomposer};
pub use time_series::{classify_direction, classify_significance, TimeSeriesAnalyzer};
