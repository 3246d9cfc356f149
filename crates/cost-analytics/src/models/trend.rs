use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrendDirection {
    Increasing,
    Decreasing,
    Stable,
    Volatile,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TrendSignificance {
    None,
    Low,
    Medium,
    High,
}

impl TrendSignificance {
    /// Weight used when blending significance into an overall confidence
    pub fn weight(&self) -> f64 {
        match self {
            TrendSignificance::High => 1.0,
            TrendSignificance::Medium => 0.7,
            TrendSignificance::Low => 0.4,
            TrendSignificance::None => 0.0,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Default)]
pub struct ConfidenceInterval {
    pub lower: f64,
    pub upper: f64,
}

/// Linear trend fitted over a daily series
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrendMetrics {
    pub direction: TrendDirection,
    pub slope: f64,
    pub intercept: f64,
    pub r_squared: f64,
    /// Slope relative to the mean, in percent per day
    pub growth_rate: f64,
    /// Coefficient of variation, in percent
    pub volatility: f64,
    pub significance: TrendSignificance,
    pub confidence_interval: ConfidenceInterval,
    pub trend_strength: f64,
    pub data_points: usize,
}

impl TrendMetrics {
    /// Zero-signal result for series too short to fit
    pub fn insufficient(data_points: usize) -> Self {
        Self {
            direction: TrendDirection::Stable,
            slope: 0.0,
            intercept: 0.0,
            r_squared: 0.0,
            growth_rate: 0.0,
            volatility: 0.0,
            significance: TrendSignificance::None,
            confidence_interval: ConfidenceInterval::default(),
            trend_strength: 0.0,
            data_points,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TrendChangePoint {
    pub index: usize,
    pub date: NaiveDate,
    pub slope_before: f64,
    pub slope_after: f64,
    pub change_magnitude: f64,
    pub significance: TrendSignificance,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SeasonalPattern {
    None,
    Weekly,
    Monthly,
    Quarterly,
    Yearly,
}

impl SeasonalPattern {
    /// Pattern label implied by a decomposition period
    pub fn from_period(period_length: usize) -> Self {
        match period_length {
            0 => SeasonalPattern::None,
            1..=7 => SeasonalPattern::Weekly,
            8..=31 => SeasonalPattern::Monthly,
            32..=93 => SeasonalPattern::Quarterly,
            94..=366 => SeasonalPattern::Yearly,
            _ => SeasonalPattern::None,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SeasonalDecomposition {
    pub trend: Vec<f64>,
    pub seasonal: Vec<f64>,
    pub residual: Vec<f64>,
    pub period_length: usize,
    pub seasonal_pattern: SeasonalPattern,
    pub seasonal_strength: f64,
    pub trend_strength: f64,
}

impl SeasonalDecomposition {
    /// Zero components, still labelled with the pattern `period_length` implies
    pub fn empty(len: usize, period_length: usize) -> Self {
        Self {
            trend: vec![0.0; len],
            seasonal: vec![0.0; len],
            residual: vec![0.0; len],
            period_length,
            seasonal_pattern: SeasonalPattern::from_period(period_length),
            seasonal_strength: 0.0,
            trend_strength: 0.0,
        }
    }
}

/// Strength of one calendar grouping (month, weekday or quarter)
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct PatternStrength {
    /// Coefficient of variation of the bucket averages
    pub strength: f64,
    pub bucket_averages: BTreeMap<u32, f64>,
    pub peak_bucket: Option<u32>,
    pub trough_bucket: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct SeasonalityAnalysis {
    /// Buckets 1-12
    pub monthly: PatternStrength,
    /// Buckets 0-6, Monday = 0
    pub weekly: PatternStrength,
    /// Buckets 1-4
    pub quarterly: PatternStrength,
}

impl SeasonalityAnalysis {
    pub fn strongest(&self) -> Option<(SeasonalPattern, f64)> {
        [
            (SeasonalPattern::Weekly, self.weekly.strength),
            (SeasonalPattern::Monthly, self.monthly.strength),
            (SeasonalPattern::Quarterly, self.quarterly.strength),
        ]
        .into_iter()
        .filter(|(_, strength)| *strength > 0.0)
        .max_by(|a, b| a.1.total_cmp(&b.1))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct GrowthRates {
    /// Last 30 days against the 30 before, in percent
    pub month_over_month: Option<f64>,
    /// Last 7 days against the 7 before, in percent
    pub week_over_week: Option<f64>,
    pub compound_daily: Option<f64>,
    pub annualized: Option<f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CostTrendAnalysis {
    pub overall_trend: TrendMetrics,
    pub service_trends: BTreeMap<String, TrendMetrics>,
    pub seasonal_decomposition: SeasonalDecomposition,
    pub seasonality: SeasonalityAnalysis,
    pub growth_rates: GrowthRates,
    pub trend_changes: Vec<TrendChangePoint>,
    pub trend_confidence: f64,
    pub insights: Vec<String>,
    pub data_points: usize,
    pub period_start: Option<NaiveDate>,
    pub period_end: Option<NaiveDate>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ForecastPoint {
    pub date: NaiveDate,
    pub forecasted_cost: f64,
    pub lower_bound: f64,
    pub upper_bound: f64,
    pub confidence: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct CostForecast {
    pub method: String,
    pub historical_start: Option<NaiveDate>,
    pub historical_end: Option<NaiveDate>,
    pub points: Vec<ForecastPoint>,
    pub total_forecasted_cost: f64,
    pub avg_confidence: f64,
}

impl CostForecast {
    pub fn new(
        method: impl Into<String>,
        historical_start: Option<NaiveDate>,
        historical_end: Option<NaiveDate>,
        points: Vec<ForecastPoint>,
    ) -> Self {
        let total_forecasted_cost = points.iter().map(|p| p.forecasted_cost).sum();
        let avg_confidence = if points.is_empty() {
            0.0
        } else {
            points.iter().map(|p| p.confidence).sum::<f64>() / points.len() as f64
        };

        Self {
            method: method.into(),
            historical_start,
            historical_end,
            points,
            total_forecasted_cost,
            avg_confidence,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_insufficient_trend_metrics() {
        let metrics = TrendMetrics::insufficient(3);
        assert_eq!(metrics.direction, TrendDirection::Stable);
        assert_eq!(metrics.significance, TrendSignificance::None);
        assert_eq!(metrics.slope, 0.0);
        assert_eq!(metrics.data_points, 3);
    }

    #[test]
    fn test_significance_weight() {
        assert_eq!(TrendSignificance::High.weight(), 1.0);
        assert_eq!(TrendSignificance::Medium.weight(), 0.7);
        assert_eq!(TrendSignificance::Low.weight(), 0.4);
        assert_eq!(TrendSignificance::None.weight(), 0.0);
    }

    #[test]
    fn test_seasonal_pattern_from_period() {
        assert_eq!(SeasonalPattern::from_period(7), SeasonalPattern::Weekly);
        assert_eq!(SeasonalPattern::from_period(30), SeasonalPattern::Monthly);
        assert_eq!(SeasonalPattern::from_period(31), SeasonalPattern::Monthly);
        assert_eq!(SeasonalPattern::from_period(90), SeasonalPattern::Quarterly);
        assert_eq!(SeasonalPattern::from_period(365), SeasonalPattern::Yearly);
        assert_eq!(SeasonalPattern::from_period(400), SeasonalPattern::None);
    }

    #[test]
    fn test_cost_forecast_aggregates() {
        let date = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap();
        let points = vec![
            ForecastPoint {
                date,
                forecasted_cost: 100.0,
                lower_bound: 90.0,
                upper_bound: 110.0,
                confidence: 0.9,
            },
            ForecastPoint {
                date,
                forecasted_cost: 110.0,
                lower_bound: 95.0,
                upper_bound: 125.0,
                confidence: 0.7,
            },
        ];

        let forecast = CostForecast::new("linear_regression", None, None, points);
        assert!((forecast.total_forecasted_cost - 210.0).abs() < 1e-9);
        assert!((forecast.avg_confidence - 0.8).abs() < 1e-9);
    }

    #[test]
    fn test_strongest_seasonality() {
        let mut analysis = SeasonalityAnalysis::default();
        assert!(analysis.strongest().is_none());

        analysis.weekly.strength = 0.2;
        analysis.monthly.strength = 0.4;
        assert_eq!(analysis.strongest(), Some((SeasonalPattern::Monthly, 0.4)));
    }
}
