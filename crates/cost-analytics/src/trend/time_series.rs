//! Linear trend fitting, moving averages and trend change detection

use crate::config::TrendConfig;
use crate::models::{
    ConfidenceInterval, TrendChangePoint, TrendDirection, TrendMetrics, TrendSignificance,
};
use crate::stats::{coefficient_of_variation, linear_regression, mean};
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Two-sided 95% normal quantile
const Z_95: f64 = 1.96;

const VOLATILE_PERCENT: f64 = 50.0;
const STABLE_SLOPE: f64 = 0.01;

const CHANGE_MIN_R_SQUARED: f64 = 0.3;
const CHANGE_MIN_SLOPE_DELTA: f64 = 0.1;
const CHANGE_HIGH_SLOPE_DELTA: f64 = 0.5;

/// `(min r², min points, significance)` evaluated top-down
const SIGNIFICANCE_BANDS: &[(f64, usize, TrendSignificance)] = &[
    (0.7, 30, TrendSignificance::High),
    (0.5, 14, TrendSignificance::Medium),
    (0.3, 7, TrendSignificance::Low),
];

pub fn classify_significance(r_squared: f64, data_points: usize) -> TrendSignificance {
    SIGNIFICANCE_BANDS
        .iter()
        .find(|(min_r2, min_points, _)| r_squared > *min_r2 && data_points >= *min_points)
        .map(|(_, _, significance)| *significance)
        .unwrap_or(TrendSignificance::None)
}

pub fn classify_direction(slope: f64, volatility_percent: f64) -> TrendDirection {
    if volatility_percent > VOLATILE_PERCENT {
        TrendDirection::Volatile
    } else if slope.abs() < STABLE_SLOPE {
        TrendDirection::Stable
    } else if slope > 0.0 {
        TrendDirection::Increasing
    } else {
        TrendDirection::Decreasing
    }
}

/// Day offsets from the first date, or plain indices when dates do not line up with values
fn x_axis(values: &[f64], dates: &[NaiveDate]) -> Vec<f64> {
    match dates.first() {
        Some(first) if dates.len() == values.len() => dates
            .iter()
            .map(|date| (*date - *first).num_days() as f64)
            .collect(),
        _ => (0..values.len()).map(|i| i as f64).collect(),
    }
}

#[derive(Debug, Clone)]
pub struct TimeSeriesAnalyzer {
    min_data_points: usize,
    change_window: usize,
}

impl TimeSeriesAnalyzer {
    pub fn new(config: &TrendConfig) -> Self {
        Self {
            min_data_points: config.min_data_points.max(2),
            change_window: config.trend_change_window.max(2),
        }
    }

    pub fn min_data_points(&self) -> usize {
        self.min_data_points
    }

    /// Ordinary least squares over (days since first date, value).
    ///
    /// Series shorter than the minimum yield a STABLE trend with no significance.
    pub fn calculate_linear_trend(&self, values: &[f64], dates: &[NaiveDate]) -> TrendMetrics {
        let n = values.len();
        if n < self.min_data_points {
            return TrendMetrics::insufficient(n);
        }

        let xs = x_axis(values, dates);
        let Some(fit) = linear_regression(&xs, values) else {
            return TrendMetrics::insufficient(n);
        };

        let avg = mean(values);
        let growth_rate = if avg.abs() > f64::EPSILON {
            fit.slope / avg * 100.0
        } else {
            0.0
        };
        let volatility = coefficient_of_variation(values) * 100.0;

        let slope_error = if n > 2 && fit.sxx > 0.0 {
            (fit.ss_res / (n - 2) as f64).sqrt() / fit.sxx.sqrt()
        } else {
            0.0
        };

        TrendMetrics {
            direction: classify_direction(fit.slope, volatility),
            slope: fit.slope,
            intercept: fit.intercept,
            r_squared: fit.r_squared,
            growth_rate,
            volatility,
            significance: classify_significance(fit.r_squared, n),
            confidence_interval: ConfidenceInterval {
                lower: fit.slope - Z_95 * slope_error,
                upper: fit.slope + Z_95 * slope_error,
            },
            trend_strength: (fit.slope.abs() * fit.r_squared).min(1.0),
            data_points: n,
        }
    }

    /// Trailing means per window size; positions before the first full window keep the raw value
    pub fn calculate_moving_averages(&self, values: &[f64], windows: &[usize]) -> BTreeMap<usize, Vec<f64>> {
        windows
            .iter()
            .filter(|window| **window > 0)
            .map(|&window| {
                let averages = (0..values.len())
                    .map(|i| {
                        if i + 1 < window {
                            values[i]
                        } else {
                            mean(&values[i + 1 - window..=i])
                        }
                    })
                    .collect();
                (window, averages)
            })
            .collect()
    }

    /// Points where the slope of the window after differs from the window before
    pub fn detect_trend_changes(&self, values: &[f64], dates: &[NaiveDate]) -> Vec<TrendChangePoint> {
        let window = self.change_window;
        if values.len() < window * 2 || dates.len() < values.len() {
            return Vec::new();
        }

        let xs: Vec<f64> = (0..window).map(|i| i as f64).collect();
        let mut changes = Vec::new();

        for i in window..=values.len() - window {
            let (Some(before), Some(after)) = (
                linear_regression(&xs, &values[i - window..i]),
                linear_regression(&xs, &values[i..i + window]),
            ) else {
                continue;
            };

            if before.r_squared <= CHANGE_MIN_R_SQUARED || after.r_squared <= CHANGE_MIN_R_SQUARED {
                continue;
            }

            let magnitude = (after.slope - before.slope).abs();
            if magnitude > CHANGE_MIN_SLOPE_DELTA {
                changes.push(TrendChangePoint {
                    index: i,
                    date: dates[i],
                    slope_before: before.slope,
                    slope_after: after.slope,
                    change_magnitude: magnitude,
                    significance: if magnitude > CHANGE_HIGH_SLOPE_DELTA {
                        TrendSignificance::High
                    } else {
                        TrendSignificance::Medium
                    },
                });
            }
        }

        changes
    }
}

impl Default for TimeSeriesAnalyzer {
    fn default() -> Self {
        Self::new(&TrendConfig::default())
    }
}
