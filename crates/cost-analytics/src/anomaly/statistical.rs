//! Z-score and IQR outlier detection over cost series

use crate::config::AnomalyConfig;
use crate::stats::{mean, percentile, sample_std_dev, sorted};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum OutlierDirection {
    Spike,
    Drop,
}

/// One flagged value of the current series
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticalOutlier {
    /// Position in the current series
    pub index: usize,
    pub value: f64,
    /// Z-score, or distance to the nearest IQR bound in IQR units
    pub score: f64,
    pub direction: OutlierDirection,
    pub historical_mean: f64,
    /// Value the outlier is measured against (mean for Z-score, violated bound for IQR)
    pub reference: f64,
}

#[derive(Debug, Clone)]
pub struct StatisticalDetector {
    z_score_threshold: f64,
    iqr_multiplier: f64,
    min_z_score_points: usize,
    min_iqr_points: usize,
}

impl StatisticalDetector {
    pub fn new(config: &AnomalyConfig) -> Self {
        Self {
            z_score_threshold: config.z_score_threshold,
            iqr_multiplier: config.iqr_multiplier,
            min_z_score_points: config.min_z_score_points.max(2),
            min_iqr_points: config.min_iqr_points.max(2),
        }
    }

    /// Values whose distance from the historical mean exceeds the threshold in standard deviations
    pub fn detect_z_score_anomalies(&self, current: &[f64], historical: &[f64]) -> Vec<StatisticalOutlier> {
        if historical.len() < self.min_z_score_points {
            return Vec::new();
        }

        let avg = mean(historical);
        let std_dev = sample_std_dev(historical);
        if !std_dev.is_finite() || std_dev < f64::EPSILON {
            return Vec::new();
        }

        current
            .iter()
            .enumerate()
            .filter_map(|(index, &value)| {
                let z = (value - avg).abs() / std_dev;
                (z > self.z_score_threshold).then(|| StatisticalOutlier {
                    index,
                    value,
                    score: z,
                    direction: if value > avg {
                        OutlierDirection::Spike
                    } else {
                        OutlierDirection::Drop
                    },
                    historical_mean: avg,
                    reference: avg,
                })
            })
            .collect()
    }

    /// Values outside `[Q1 - k*IQR, Q3 + k*IQR]` of the historical series
    pub fn detect_iqr_anomalies(&self, current: &[f64], historical: &[f64]) -> Vec<StatisticalOutlier> {
        if historical.len() < self.min_iqr_points {
            return Vec::new();
        }

        let ordered = sorted(historical);
        let q1 = percentile(&ordered, 25.0);
        let q3 = percentile(&ordered, 75.0);
        let iqr = q3 - q1;
        if !iqr.is_finite() || iqr < f64::EPSILON {
            return Vec::new();
        }

        let lower = q1 - self.iqr_multiplier * iqr;
        let upper = q3 + self.iqr_multiplier * iqr;
        let avg = mean(historical);

        current
            .iter()
            .enumerate()
            .filter_map(|(index, &value)| {
                let (direction, reference) = if value > upper {
                    (OutlierDirection::Spike, upper)
                } else if value < lower {
                    (OutlierDirection::Drop, lower)
                } else {
                    return None;
                };

                Some(StatisticalOutlier {
                    index,
                    value,
                    score: (value - reference).abs() / iqr,
                    direction,
                    historical_mean: avg,
                    reference,
                })
            })
            .collect()
    }
}

impl Default for StatisticalDetector {
    fn default() -> Self {
        Self::new(&AnomalyConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_z_score_flags_spike() {
        let detector = StatisticalDetector::default();
        let historical = [100.0, 102.0, 98.0, 101.0, 99.0];
        let outliers = detector.detect_z_score_anomalies(&[100.0, 150.0], &historical);

        assert_eq!(outliers.len(), 1);
        assert_eq!(outliers[0].index, 1);
        assert_eq!(outliers[0].direction, OutlierDirection::Spike);
        assert!(outliers[0].score > 2.0);
    }

    #[test]
    fn test_z_score_flags_drop() {
        let detector = StatisticalDetector::default();
        let historical = [100.0, 102.0, 98.0, 101.0, 99.0];
        let outliers = detector.detect_z_score_anomalies(&[20.0], &historical);
        assert_eq!(outliers[0].direction, OutlierDirection::Drop);
    }

    #[test]
    fn test_z_score_needs_history_and_variance() {
        let detector = StatisticalDetector::default();
        assert!(detector.detect_z_score_anomalies(&[500.0], &[1.0, 2.0]).is_empty());
        assert!(detector
            .detect_z_score_anomalies(&[500.0, -3.0], &[7.0, 7.0, 7.0, 7.0])
            .is_empty());
    }

    #[test]
    fn test_iqr_bounds_and_score() {
        let detector = StatisticalDetector::default();
        // Q1 = 1.75, Q3 = 3.25, IQR = 1.5, bounds = [-0.5, 5.5]
        let historical = [1.0, 2.0, 3.0, 4.0];
        let outliers = detector.detect_iqr_anomalies(&[3.0, 7.0, -2.0], &historical);

        assert_eq!(outliers.len(), 2);
        assert_eq!(outliers[0].index, 1);
        assert!((outliers[0].reference - 5.5).abs() < 1e-9);
        assert!((outliers[0].score - 1.0).abs() < 1e-9);
        assert_eq!(outliers[1].direction, OutlierDirection::Drop);
        assert!((outliers[1].score - 1.0).abs() < 1e-9);
    }

    #[test]
    fn test_iqr_zero_spread_returns_nothing() {
        let detector = StatisticalDetector::default();
        assert!(detector
            .detect_iqr_anomalies(&[1000.0], &[10.0, 10.0, 10.0, 10.0])
            .is_empty());
        assert!(detector.detect_iqr_anomalies(&[1000.0], &[1.0, 2.0, 3.0]).is_empty());
    }
}
