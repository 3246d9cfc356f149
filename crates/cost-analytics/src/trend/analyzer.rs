//! Overall and per-service cost trend analysis

use super::seasonal::{analyze_seasonality, daily_totals, SeasonalDecomposer};
use super::time_series::TimeSeriesAnalyzer;
use crate::config::TrendConfig;
use crate::models::{
    CostTrendAnalysis, GrowthRates, SeasonalDecomposition, SeasonalPattern, SeasonalityAnalysis,
    TrendDirection, TrendMetrics, UnifiedCostRecord,
};
use crate::stats::mean;
use chrono::NaiveDate;
use ordered_float::OrderedFloat;
use rust_decimal::prelude::ToPrimitive;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Days of history at which data sufficiency is full
const FULL_HISTORY_DAYS: f64 = 30.0;
const SEASONALITY_INSIGHT_STRENGTH: f64 = 0.2;
const MOM_INSIGHT_PERCENT: f64 = 10.0;
const HIGH_VOLATILITY_PERCENT: f64 = 30.0;
const TOP_SERVICES: usize = 3;

pub struct TrendAnalyzer {
    time_series: TimeSeriesAnalyzer,
    decomposer: SeasonalDecomposer,
    min_data_points: usize,
}

impl TrendAnalyzer {
    pub fn new(config: &TrendConfig) -> Self {
        Self {
            time_series: TimeSeriesAnalyzer::new(config),
            decomposer: SeasonalDecomposer::new(config.seasonal_period),
            min_data_points: config.min_data_points,
        }
    }

    pub fn time_series(&self) -> &TimeSeriesAnalyzer {
        &self.time_series
    }

    /// Full trend analysis of the records, which may arrive in any order
    pub fn analyze_cost_trends(&self, records: &[UnifiedCostRecord]) -> CostTrendAnalysis {
        let period_start = records.iter().map(|r| r.date).min();
        let period_end = records.iter().map(|r| r.date).max();

        if records.len() < self.min_data_points {
            info!(
                "Insufficient data for trend analysis: {} records, need {}",
                records.len(),
                self.min_data_points
            );
            return CostTrendAnalysis {
                overall_trend: TrendMetrics::insufficient(records.len()),
                service_trends: BTreeMap::new(),
                seasonal_decomposition: SeasonalDecomposition::empty(0, self.decomposer.period_length()),
                seasonality: SeasonalityAnalysis::default(),
                growth_rates: GrowthRates::default(),
                trend_changes: Vec::new(),
                trend_confidence: 0.0,
                insights: vec![format!(
                    "Insufficient data for trend analysis ({} records, at least {} required)",
                    records.len(),
                    self.min_data_points
                )],
                data_points: records.len(),
                period_start,
                period_end,
            };
        }

        let daily = daily_totals(records);
        let dates: Vec<NaiveDate> = daily.keys().copied().collect();
        let values: Vec<f64> = daily.values().copied().collect();

        let overall_trend = self.time_series.calculate_linear_trend(&values, &dates);
        let service_trends = self.service_trends(records);
        let seasonal_decomposition = self.decomposer.decompose(&values);
        let seasonality = analyze_seasonality(records);
        let growth_rates = calculate_growth_rates(&dates, &values);
        let trend_changes = self.time_series.detect_trend_changes(&values, &dates);
        let trend_confidence = trend_confidence(&overall_trend);

        let insights = generate_insights(&overall_trend, &service_trends, &seasonality, &growth_rates);

        debug!(
            "Trend over {} days: {:?} slope {:.4} r2 {:.3}, {} change points",
            values.len(),
            overall_trend.direction,
            overall_trend.slope,
            overall_trend.r_squared,
            trend_changes.len()
        );

        CostTrendAnalysis {
            overall_trend,
            service_trends,
            seasonal_decomposition,
            seasonality,
            growth_rates,
            trend_changes,
            trend_confidence,
            insights,
            data_points: records.len(),
            period_start,
            period_end,
        }
    }

    /// Trends of services with enough daily observations
    fn service_trends(&self, records: &[UnifiedCostRecord]) -> BTreeMap<String, TrendMetrics> {
        let mut series: BTreeMap<String, BTreeMap<NaiveDate, f64>> = BTreeMap::new();
        for record in records {
            for service in record.services.values() {
                *series
                    .entry(service.service_name.clone())
                    .or_default()
                    .entry(record.date)
                    .or_insert(0.0) += service.cost.to_f64().unwrap_or(0.0);
            }
        }

        series
            .into_iter()
            .filter(|(_, daily)| daily.len() >= self.time_series.min_data_points())
            .map(|(service, daily)| {
                let dates: Vec<NaiveDate> = daily.keys().copied().collect();
                let values: Vec<f64> = daily.values().copied().collect();
                (service, self.time_series.calculate_linear_trend(&values, &dates))
            })
            .collect()
    }
}

impl Default for TrendAnalyzer {
    fn default() -> Self {
        Self::new(&TrendConfig::default())
    }
}

/// Percentage change between the average of the last `window` values and the `window` before
fn period_over_period(values: &[f64], window: usize) -> Option<f64> {
    if values.len() < window * 2 {
        return None;
    }
    let n = values.len();
    let recent = mean(&values[n - window..]);
    let prior = mean(&values[n - 2 * window..n - window]);
    (prior > 0.0).then(|| (recent - prior) / prior * 100.0)
}

/// Month-over-month, week-over-week and compound growth, all in percent
pub fn calculate_growth_rates(dates: &[NaiveDate], values: &[f64]) -> GrowthRates {
    let month_over_month = period_over_period(values, 30);
    let week_over_week = period_over_period(values, 7);

    let compound_daily = match (dates.first(), dates.last(), values.first(), values.last()) {
        (Some(first_date), Some(last_date), Some(&first), Some(&last)) => {
            let days = (*last_date - *first_date).num_days();
            (first > 0.0 && last > 0.0 && days > 0).then(|| (last / first).powf(1.0 / days as f64) - 1.0)
        }
        _ => None,
    };

    GrowthRates {
        month_over_month,
        week_over_week,
        compound_daily: compound_daily.map(|rate| rate * 100.0),
        annualized: compound_daily.map(|rate| ((1.0 + rate).powf(365.0) - 1.0) * 100.0),
    }
}

/// Mean of fit quality, data sufficiency, stability and significance
pub fn trend_confidence(trend: &TrendMetrics) -> f64 {
    let sufficiency = (trend.data_points as f64 / FULL_HISTORY_DAYS).min(1.0);
    let stability = (1.0 - trend.volatility / 100.0).clamp(0.0, 1.0);
    let confidence = (trend.r_squared + sufficiency + stability + trend.significance.weight()) / 4.0;
    confidence.clamp(0.0, 1.0)
}

fn generate_insights(
    overall: &TrendMetrics,
    service_trends: &BTreeMap<String, TrendMetrics>,
    seasonality: &SeasonalityAnalysis,
    growth: &GrowthRates,
) -> Vec<String> {
    let mut insights = Vec::new();

    insights.push(match overall.direction {
        TrendDirection::Increasing => format!(
            "Costs are increasing by {:.2} per day ({:.1}% of the daily average)",
            overall.slope, overall.growth_rate
        ),
        TrendDirection::Decreasing => format!(
            "Costs are decreasing by {:.2} per day ({:.1}% of the daily average)",
            overall.slope.abs(),
            overall.growth_rate.abs()
        ),
        TrendDirection::Stable => "Costs are stable over the analysed period".to_string(),
        TrendDirection::Volatile => format!(
            "Costs are volatile ({:.1}% coefficient of variation) with no reliable trend",
            overall.volatility
        ),
    });

    let mut rising: Vec<(&String, &TrendMetrics)> = service_trends
        .iter()
        .filter(|(_, trend)| trend.direction == TrendDirection::Increasing)
        .collect();
    rising.sort_by_key(|(_, trend)| std::cmp::Reverse(OrderedFloat(trend.growth_rate)));
    if !rising.is_empty() {
        let names: Vec<String> = rising
            .iter()
            .take(TOP_SERVICES)
            .map(|(name, trend)| format!("{} (+{:.1}%/day)", name, trend.growth_rate))
            .collect();
        insights.push(format!("Fastest growing services: {}", names.join(", ")));
    }

    if let Some((pattern, strength)) = seasonality.strongest() {
        if strength > SEASONALITY_INSIGHT_STRENGTH {
            let label = match pattern {
                SeasonalPattern::Weekly => "weekly",
                SeasonalPattern::Monthly => "monthly",
                SeasonalPattern::Quarterly => "quarterly",
                SeasonalPattern::Yearly => "yearly",
                SeasonalPattern::None => "irregular",
            };
            insights.push(format!(
                "Strong {} seasonality detected (strength {:.2})",
                label, strength
            ));
        }
    }

    if let Some(mom) = growth.month_over_month {
        if mom.abs() > MOM_INSIGHT_PERCENT {
            insights.push(format!(
                "Month-over-month spend {} {:.1}%",
                if mom > 0.0 { "rose" } else { "fell" },
                mom.abs()
            ));
        }
    }

    if overall.volatility > HIGH_VOLATILITY_PERCENT {
        insights.push(format!(
            "High cost volatility ({:.1}%); consider budget alerts and usage reviews",
            overall.volatility
        ));
    }

    insights
}
