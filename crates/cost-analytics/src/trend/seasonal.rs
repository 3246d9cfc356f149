//! Seasonal decomposition and calendar pattern strength

use crate::models::{
    PatternStrength, SeasonalDecomposition, SeasonalPattern, SeasonalityAnalysis, UnifiedCostRecord,
};
use crate::stats::{coefficient_of_variation, mean, population_variance};
use chrono::{Datelike, NaiveDate};
use std::collections::BTreeMap;

const MIN_MONTH_BUCKETS: usize = 3;
const MIN_WEEKDAY_BUCKETS: usize = 5;
const MIN_QUARTER_BUCKETS: usize = 2;

#[derive(Debug, Clone)]
pub struct SeasonalDecomposer {
    period_length: usize,
}

impl SeasonalDecomposer {
    pub fn new(period_length: usize) -> Self {
        Self { period_length }
    }

    pub fn period_length(&self) -> usize {
        self.period_length
    }

    /// Additive decomposition `value = trend + seasonal + residual`.
    ///
    /// Needs at least two full periods, otherwise every component is zero and
    /// only the period's pattern label is reported.
    pub fn decompose(&self, values: &[f64]) -> SeasonalDecomposition {
        let n = values.len();
        let period = self.period_length;
        if period < 2 || n < period * 2 {
            return SeasonalDecomposition::empty(n, period);
        }

        let trend = centered_moving_average(values, period);

        let mut position_sums = vec![0.0; period];
        let mut position_counts = vec![0usize; period];
        for (i, (value, level)) in values.iter().zip(&trend).enumerate() {
            position_sums[i % period] += value - level;
            position_counts[i % period] += 1;
        }
        let position_means: Vec<f64> = position_sums
            .iter()
            .zip(&position_counts)
            .map(|(sum, count)| if *count > 0 { sum / *count as f64 } else { 0.0 })
            .collect();

        let seasonal: Vec<f64> = (0..n).map(|i| position_means[i % period]).collect();
        let residual: Vec<f64> = values
            .iter()
            .zip(trend.iter().zip(&seasonal))
            .map(|(value, (level, season))| value - level - season)
            .collect();

        let mean_abs_seasonal = mean(&seasonal.iter().map(|s| s.abs()).collect::<Vec<_>>());
        let seasonal_strength = if mean_abs_seasonal > f64::EPSILON {
            population_variance(&seasonal) / mean_abs_seasonal
        } else {
            0.0
        };

        SeasonalDecomposition {
            trend_strength: monotonicity(&trend),
            trend,
            seasonal,
            residual,
            period_length: period,
            seasonal_pattern: SeasonalPattern::from_period(period),
            seasonal_strength,
        }
    }
}

impl Default for SeasonalDecomposer {
    fn default() -> Self {
        Self::new(7)
    }
}

/// Centered mean over `period` values; windows are truncated at the series edges
fn centered_moving_average(values: &[f64], period: usize) -> Vec<f64> {
    let n = values.len();
    let half = period / 2;
    (0..n)
        .map(|i| {
            let start = i.saturating_sub(half);
            let end = (i + period - half).min(n);
            mean(&values[start..end])
        })
        .collect()
}

/// Share of first differences moving in the dominant direction
fn monotonicity(series: &[f64]) -> f64 {
    if series.len() < 2 {
        return 0.0;
    }

    let (mut rising, mut falling) = (0usize, 0usize);
    for pair in series.windows(2) {
        let delta = pair[1] - pair[0];
        if delta > f64::EPSILON {
            rising += 1;
        } else if delta < -f64::EPSILON {
            falling += 1;
        }
    }
    rising.max(falling) as f64 / (series.len() - 1) as f64
}

/// Daily totals across providers, ordered by date
pub fn daily_totals(records: &[UnifiedCostRecord]) -> BTreeMap<NaiveDate, f64> {
    let mut totals = BTreeMap::new();
    for record in records {
        *totals.entry(record.date).or_insert(0.0) += record.total_cost_f64();
    }
    totals
}

fn pattern_strength<F>(daily: &BTreeMap<NaiveDate, f64>, min_buckets: usize, bucket_of: F) -> PatternStrength
where
    F: Fn(&NaiveDate) -> u32,
{
    let mut buckets: BTreeMap<u32, Vec<f64>> = BTreeMap::new();
    for (date, cost) in daily {
        buckets.entry(bucket_of(date)).or_default().push(*cost);
    }

    let bucket_averages: BTreeMap<u32, f64> = buckets
        .iter()
        .map(|(bucket, costs)| (*bucket, mean(costs)))
        .collect();

    if bucket_averages.len() < min_buckets {
        return PatternStrength {
            bucket_averages,
            ..PatternStrength::default()
        };
    }

    let averages: Vec<f64> = bucket_averages.values().copied().collect();
    let peak_bucket = bucket_averages
        .iter()
        .max_by(|a, b| a.1.total_cmp(b.1))
        .map(|(bucket, _)| *bucket);
    let trough_bucket = bucket_averages
        .iter()
        .min_by(|a, b| a.1.total_cmp(b.1))
        .map(|(bucket, _)| *bucket);

    PatternStrength {
        strength: coefficient_of_variation(&averages),
        bucket_averages,
        peak_bucket,
        trough_bucket,
    }
}

/// Month, weekday and quarter pattern strength over the records' daily totals
pub fn analyze_seasonality(records: &[UnifiedCostRecord]) -> SeasonalityAnalysis {
    let daily = daily_totals(records);

    SeasonalityAnalysis {
        monthly: pattern_strength(&daily, MIN_MONTH_BUCKETS, |date| date.month()),
        weekly: pattern_strength(&daily, MIN_WEEKDAY_BUCKETS, |date| {
            date.weekday().num_days_from_monday()
        }),
        quarterly: pattern_strength(&daily, MIN_QUARTER_BUCKETS, |date| (date.month() - 1) / 3 + 1),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::CloudProvider;
    use rust_decimal::Decimal;

    #[test]
    fn test_short_series_is_all_zero_but_keeps_pattern() {
        let decomposition = SeasonalDecomposer::new(7).decompose(&[1.0; 13]);
        assert_eq!(decomposition.trend, vec![0.0; 13]);
        assert_eq!(decomposition.residual, vec![0.0; 13]);
        assert_eq!(decomposition.period_length, 7);
        assert_eq!(decomposition.seasonal_pattern, SeasonalPattern::Weekly);
        assert_eq!(decomposition.seasonal_strength, 0.0);

        let monthly = SeasonalDecomposer::new(30).decompose(&[5.0; 40]);
        assert_eq!(monthly.seasonal_pattern, SeasonalPattern::Monthly);
        assert_eq!(monthly.trend_strength, 0.0);
    }

    #[test]
    fn test_components_sum_to_values() {
        let values: Vec<f64> = (0..28)
            .map(|i| 100.0 + i as f64 + if i % 7 >= 5 { -20.0 } else { 5.0 })
            .collect();
        let decomposition = SeasonalDecomposer::new(7).decompose(&values);

        assert_eq!(decomposition.seasonal_pattern, SeasonalPattern::Weekly);
        for i in 0..values.len() {
            let rebuilt = decomposition.trend[i] + decomposition.seasonal[i] + decomposition.residual[i];
            assert!((rebuilt - values[i]).abs() < 1e-9);
        }
        // weekend dip shows up as negative seasonal component
        assert!(decomposition.seasonal[5] < 0.0);
        assert!(decomposition.seasonal[1] > 0.0);
        assert!(decomposition.seasonal_strength > 0.0);
        assert!(decomposition.trend_strength > 0.7);
    }

    #[test]
    fn test_constant_series_has_no_seasonality() {
        let decomposition = SeasonalDecomposer::new(7).decompose(&[42.0; 21]);
        assert_eq!(decomposition.seasonal_strength, 0.0);
        assert_eq!(decomposition.trend_strength, 0.0);
    }

    #[test]
    fn test_centered_moving_average_edges() {
        let averages = centered_moving_average(&[1.0, 2.0, 3.0, 4.0, 5.0], 3);
        assert_eq!(averages, vec![1.5, 2.0, 3.0, 4.0, 4.5]);
    }

    fn record(date: NaiveDate, cost: i64) -> UnifiedCostRecord {
        UnifiedCostRecord::new("acme", CloudProvider::Aws, date, "USD").with_total_cost(Decimal::from(cost))
    }

    #[test]
    fn test_weekly_pattern_detected() {
        let start = NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(); // Monday
        let records: Vec<UnifiedCostRecord> = (0..28)
            .map(|i| {
                let date = start + chrono::Duration::days(i);
                let cost = if date.weekday().num_days_from_monday() >= 5 { 20 } else { 100 };
                record(date, cost)
            })
            .collect();

        let analysis = analyze_seasonality(&records);
        assert_eq!(analysis.weekly.bucket_averages.len(), 7);
        assert!(analysis.weekly.strength > 0.3);
        assert!(matches!(analysis.weekly.trough_bucket, Some(5) | Some(6)));
        // a single month is not enough to judge monthly seasonality
        assert_eq!(analysis.monthly.strength, 0.0);
        assert_eq!(analysis.quarterly.strength, 0.0);
    }

    #[test]
    fn test_same_day_records_are_summed() {
        let date = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let totals = daily_totals(&[record(date, 10), record(date, 15)]);
        assert_eq!(totals[&date], 25.0);
    }
}
