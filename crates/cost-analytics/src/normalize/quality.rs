//! Data-quality scoring for normalized records

use crate::models::{DataQuality, ServiceCost, COST_TOLERANCE};
use rust_decimal::Decimal;
use std::collections::HashMap;

/// Score a record along completeness, accuracy, timeliness and consistency.
///
/// Each dimension starts at 1.0, is reduced by fixed penalties and floored at 0.
pub fn assess_data_quality(
    total_cost: Decimal,
    services: &HashMap<String, ServiceCost>,
    account_count: usize,
    data_freshness_hours: f64,
) -> DataQuality {
    let mut completeness: f64 = 1.0;
    if services.is_empty() && account_count == 0 {
        completeness -= 0.5;
    }
    if total_cost.is_zero() {
        completeness -= 0.3;
    }

    let mut accuracy: f64 = 1.0;
    let services_total: Decimal = services.values().map(|s| s.cost).sum();
    if (total_cost - services_total).abs() > COST_TOLERANCE {
        accuracy -= 0.2;
    }

    let mut timeliness: f64 = 1.0;
    if data_freshness_hours > 48.0 {
        timeliness -= 0.3;
    } else if data_freshness_hours > 24.0 {
        timeliness -= 0.1;
    }

    let mut consistency: f64 = 1.0;
    if total_cost < Decimal::ZERO {
        consistency -= 0.5;
    }
    let negative_services = services.values().filter(|s| s.cost < Decimal::ZERO).count();
    consistency -= 0.1 * negative_services as f64;

    DataQuality {
        completeness: completeness.max(0.0),
        accuracy: accuracy.max(0.0),
        timeliness: timeliness.max(0.0),
        consistency: consistency.max(0.0),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{ConfidenceLevel, ServiceCategory};
    use rust_decimal_macros::dec;

    fn services(costs: &[(&str, Decimal)]) -> HashMap<String, ServiceCost> {
        costs
            .iter()
            .map(|(name, cost)| {
                (
                    name.to_string(),
                    ServiceCost::new(*name, ServiceCategory::Compute, *cost, "USD"),
                )
            })
            .collect()
    }

    #[test]
    fn test_clean_record_scores_perfectly() {
        let services = services(&[("EC2", dec!(60)), ("S3", dec!(40))]);
        let quality = assess_data_quality(dec!(100), &services, 0, 2.0);
        assert_eq!(quality, DataQuality::default());
        assert_eq!(quality.confidence_level(), ConfidenceLevel::High);
    }

    #[test]
    fn test_empty_zero_record_is_incomplete() {
        let quality = assess_data_quality(Decimal::ZERO, &HashMap::new(), 0, 0.0);
        assert!((quality.completeness - 0.2).abs() < 1e-9);
        assert_eq!(quality.accuracy, 1.0);
    }

    #[test]
    fn test_service_mismatch_penalizes_accuracy() {
        let services = services(&[("EC2", dec!(50))]);
        let quality = assess_data_quality(dec!(100), &services, 0, 0.0);
        assert!((quality.accuracy - 0.8).abs() < 1e-9);

        // within a cent is tolerated
        let quality = assess_data_quality(dec!(50.01), &services, 0, 0.0);
        assert_eq!(quality.accuracy, 1.0);
    }

    #[test]
    fn test_timeliness_bands() {
        let empty = HashMap::new();
        assert_eq!(assess_data_quality(dec!(1), &empty, 1, 24.0).timeliness, 1.0);
        assert!((assess_data_quality(dec!(1), &empty, 1, 30.0).timeliness - 0.9).abs() < 1e-9);
        assert!((assess_data_quality(dec!(1), &empty, 1, 72.0).timeliness - 0.7).abs() < 1e-9);
    }

    #[test]
    fn test_negative_costs_floor_consistency() {
        let costs: Vec<(String, Decimal)> = (0..8).map(|i| (format!("svc-{}", i), dec!(-1))).collect();
        let refs: Vec<(&str, Decimal)> = costs.iter().map(|(n, c)| (n.as_str(), *c)).collect();
        let services = services(&refs);

        let quality = assess_data_quality(dec!(-8), &services, 0, 0.0);
        assert_eq!(quality.consistency, 0.0);
    }
}
