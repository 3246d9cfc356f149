//! Linear-trend cost forecasting

use super::seasonal::daily_totals;
use crate::models::{CostForecast, ForecastPoint, UnifiedCostRecord};
use crate::stats::{linear_regression, mean};
use chrono::{Duration, NaiveDate};
use tracing::debug;

const MIN_FORECAST_POINTS: usize = 3;
const CONFIDENCE_DECAY: f64 = 0.95;
const Z_95: f64 = 1.96;
pub const FORECAST_METHOD: &str = "linear_regression";

pub struct CostForecaster {
    days_ahead: usize,
}

impl CostForecaster {
    pub fn new(days_ahead: usize) -> Self {
        Self { days_ahead }
    }

    /// Forecast daily totals from the records' history
    pub fn forecast(&self, records: &[UnifiedCostRecord]) -> CostForecast {
        let daily = daily_totals(records);
        let dates: Vec<NaiveDate> = daily.keys().copied().collect();
        let values: Vec<f64> = daily.values().copied().collect();
        self.forecast_series(&dates, &values)
    }

    /// Forecast a daily series. Fewer than three points produce an empty forecast.
    pub fn forecast_series(&self, dates: &[NaiveDate], values: &[f64]) -> CostForecast {
        let historical_start = dates.first().copied();
        let historical_end = dates.last().copied();

        let (Some(first), Some(last)) = (historical_start, historical_end) else {
            return CostForecast::new(FORECAST_METHOD, None, None, Vec::new());
        };
        if values.len() < MIN_FORECAST_POINTS || dates.len() != values.len() {
            return CostForecast::new(FORECAST_METHOD, historical_start, historical_end, Vec::new());
        }

        let xs: Vec<f64> = dates.iter().map(|d| (*d - first).num_days() as f64).collect();
        let Some(fit) = linear_regression(&xs, values) else {
            return CostForecast::new(FORECAST_METHOD, historical_start, historical_end, Vec::new());
        };

        let n = values.len() as f64;
        let x_mean = mean(&xs);
        let residual_error = (fit.ss_res / (n - 2.0).max(1.0)).sqrt();
        let base_confidence = 0.5 + 0.4 * fit.r_squared;
        let last_x = (last - first).num_days() as f64;

        let points: Vec<ForecastPoint> = (1..=self.days_ahead)
            .map(|day| {
                let x = last_x + day as f64;
                let predicted = (fit.intercept + fit.slope * x).max(0.0);
                let spread = Z_95 * residual_error * (1.0 + 1.0 / n + (x - x_mean).powi(2) / fit.sxx).sqrt();

                ForecastPoint {
                    date: last + Duration::days(day as i64),
                    forecasted_cost: predicted,
                    lower_bound: (predicted - spread).max(0.0),
                    upper_bound: predicted + spread,
                    confidence: (base_confidence * CONFIDENCE_DECAY.powi(day as i32)).clamp(0.0, 1.0),
                }
            })
            .collect();

        debug!(
            "Forecast {} days from {} points (slope {:.4}, r2 {:.3})",
            self.days_ahead,
            values.len(),
            fit.slope,
            fit.r_squared
        );

        CostForecast::new(FORECAST_METHOD, historical_start, historical_end, points)
    }
}

impl Default for CostForecaster {
    fn default() -> Self {
        Self::new(30)
    }
}
