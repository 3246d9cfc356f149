//! Threshold rules over per-service costs and budgets
//!
//! Severity bands are ordered `(threshold, severity)` tables evaluated top-down
//! with a strictly-greater-than comparison.

use crate::config::AnomalyConfig;
use crate::models::{Anomaly, AnomalyType, DetectionMethod, Severity};
use serde_json::json;
use std::collections::BTreeMap;
use tracing::debug;

/// Per-service cost, typically a daily average over a period
pub type ServiceCosts = BTreeMap<String, f64>;

const SPIKE_BANDS: &[(f64, Severity)] = &[
    (200.0, Severity::Critical),
    (100.0, Severity::High),
    (75.0, Severity::Medium),
];

const DROP_BANDS: &[(f64, Severity)] = &[(70.0, Severity::High), (50.0, Severity::Medium)];

const SERVICE_COST_BANDS: &[(f64, Severity)] = &[(1000.0, Severity::High), (500.0, Severity::Medium)];

const BUDGET_BANDS: &[(f64, Severity)] = &[(50.0, Severity::Critical), (30.0, Severity::High)];

fn band(value: f64, bands: &[(f64, Severity)], otherwise: Severity) -> Severity {
    bands
        .iter()
        .find(|(threshold, _)| value > *threshold)
        .map(|(_, severity)| *severity)
        .unwrap_or(otherwise)
}

#[derive(Debug, Clone)]
pub struct RuleBasedDetector {
    spike_threshold_percent: f64,
    drop_threshold_percent: f64,
    new_service_min_cost: f64,
    disappeared_service_min_cost: f64,
    budget_deviation_percent: f64,
}

impl RuleBasedDetector {
    pub fn new(config: &AnomalyConfig) -> Self {
        Self {
            spike_threshold_percent: config.spike_threshold_percent,
            drop_threshold_percent: config.drop_threshold_percent,
            new_service_min_cost: config.new_service_min_cost,
            disappeared_service_min_cost: config.disappeared_service_min_cost,
            budget_deviation_percent: config.budget_deviation_percent,
        }
    }

    pub fn spike_severity(percentage_change: f64) -> Severity {
        band(percentage_change, SPIKE_BANDS, Severity::Low)
    }

    pub fn drop_severity(percentage_drop: f64) -> Severity {
        band(percentage_drop, DROP_BANDS, Severity::Low)
    }

    pub fn service_cost_severity(cost: f64) -> Severity {
        band(cost, SERVICE_COST_BANDS, Severity::Low)
    }

    pub fn budget_severity(deviation_percent: f64) -> Severity {
        band(deviation_percent, BUDGET_BANDS, Severity::Medium)
    }

    /// Spikes and drops of services present in both periods
    pub fn detect_cost_changes(&self, current: &ServiceCosts, baseline: &ServiceCosts) -> Vec<Anomaly> {
        let mut anomalies = Vec::new();

        for (service, &cost) in current {
            let Some(&base) = baseline.get(service) else {
                continue;
            };
            if base <= 0.0 {
                continue;
            }

            let change = (cost - base) * 100.0 / base;

            if change > self.spike_threshold_percent {
                debug!("{} spiked {:.1}% ({:.2} -> {:.2})", service, change, base, cost);
                anomalies.push(
                    Anomaly::new(
                        AnomalyType::CostSpike,
                        Self::spike_severity(change),
                        format!("{} cost increased {:.1}% from {:.2} to {:.2}", service, change, base, cost),
                        DetectionMethod::RuleBased,
                    )
                    .with_services([service.clone()])
                    .with_cost_impact(cost - base)
                    .with_confidence((0.5 + change / 400.0).min(1.0))
                    .with_actions([
                        format!("Review recent usage and deployments for {}", service),
                        "Check for unintended resource scaling".to_string(),
                    ])
                    .with_metadata("percentage_change", json!(change))
                    .with_metadata("baseline_cost", json!(base)),
                );
            } else if -change > self.drop_threshold_percent {
                let dropped = -change;
                debug!("{} dropped {:.1}% ({:.2} -> {:.2})", service, dropped, base, cost);
                anomalies.push(
                    Anomaly::new(
                        AnomalyType::CostDrop,
                        Self::drop_severity(dropped),
                        format!("{} cost decreased {:.1}% from {:.2} to {:.2}", service, dropped, base, cost),
                        DetectionMethod::RuleBased,
                    )
                    .with_services([service.clone()])
                    .with_cost_impact(cost - base)
                    .with_confidence((0.5 + dropped / 200.0).min(1.0))
                    .with_actions([format!(
                        "Confirm the reduction in {} is expected and not a collection gap",
                        service
                    )])
                    .with_metadata("percentage_change", json!(change))
                    .with_metadata("baseline_cost", json!(base)),
                );
            }
        }

        anomalies
    }

    /// Services billed now that were absent from the baseline
    pub fn detect_new_services(&self, current: &ServiceCosts, baseline: &ServiceCosts) -> Vec<Anomaly> {
        current
            .iter()
            .filter(|(service, cost)| !baseline.contains_key(*service) && **cost > self.new_service_min_cost)
            .map(|(service, &cost)| {
                Anomaly::new(
                    AnomalyType::NewService,
                    Self::service_cost_severity(cost),
                    format!("New service {} appeared with cost {:.2}", service, cost),
                    DetectionMethod::RuleBased,
                )
                .with_services([service.clone()])
                .with_cost_impact(cost)
                .with_confidence(0.9)
                .with_actions([
                    format!("Verify that {} was provisioned intentionally", service),
                    "Add the service to budget tracking".to_string(),
                ])
            })
            .collect()
    }

    /// Baseline services no longer billed
    pub fn detect_disappeared_services(&self, current: &ServiceCosts, baseline: &ServiceCosts) -> Vec<Anomaly> {
        baseline
            .iter()
            .filter(|(service, cost)| {
                !current.contains_key(*service) && **cost > self.disappeared_service_min_cost
            })
            .map(|(service, &cost)| {
                Anomaly::new(
                    AnomalyType::ServiceDisappeared,
                    Self::service_cost_severity(cost),
                    format!("Service {} (historical average {:.2}) is no longer billed", service, cost),
                    DetectionMethod::RuleBased,
                )
                .with_services([service.clone()])
                .with_cost_impact(-cost)
                .with_confidence(0.9)
                .with_actions([format!(
                    "Confirm {} was decommissioned and no workload depends on it",
                    service
                )])
            })
            .collect()
    }

    /// Deviation of `current_total` from `budget` in either direction
    pub fn detect_budget_deviation(&self, current_total: f64, budget: f64) -> Option<Anomaly> {
        if budget <= 0.0 || !current_total.is_finite() {
            return None;
        }

        let deviation = (current_total - budget).abs() * 100.0 / budget;
        if deviation <= self.budget_deviation_percent {
            return None;
        }

        let over = current_total > budget;
        let mut actions = vec![format!(
            "Reconcile spend of {:.2} against the budget of {:.2}",
            current_total, budget
        )];
        if over {
            actions.push("Identify the services driving the overrun".to_string());
        } else {
            actions.push("Consider reallocating unused budget".to_string());
        }

        Some(
            Anomaly::new(
                AnomalyType::BudgetDeviation,
                Self::budget_severity(deviation),
                format!(
                    "Spend of {:.2} is {:.1}% {} the budget of {:.2}",
                    current_total,
                    deviation,
                    if over { "over" } else { "under" },
                    budget
                ),
                DetectionMethod::RuleBased,
            )
            .with_cost_impact(current_total - budget)
            .with_confidence(0.9)
            .with_actions(actions)
            .with_metadata("deviation_percent", json!(deviation)),
        )
    }

    /// Every rule in one pass; the budget rule runs only when a budget is given
    pub fn detect_all(
        &self,
        current: &ServiceCosts,
        baseline: &ServiceCosts,
        current_total: f64,
        budget: Option<f64>,
    ) -> Vec<Anomaly> {
        let mut anomalies = self.detect_cost_changes(current, baseline);
        anomalies.extend(self.detect_new_services(current, baseline));
        anomalies.extend(self.detect_disappeared_services(current, baseline));
        if let Some(budget) = budget {
            anomalies.extend(self.detect_budget_deviation(current_total, budget));
        }
        anomalies
    }
}

impl Default for RuleBasedDetector {
    fn default() -> Self {
        Self::new(&AnomalyConfig::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn costs(entries: &[(&str, f64)]) -> ServiceCosts {
        entries.iter().map(|(k, v)| (k.to_string(), *v)).collect()
    }

    #[test]
    fn test_spike_severity_bands() {
        assert_eq!(RuleBasedDetector::spike_severity(60.0), Severity::Low);
        assert_eq!(RuleBasedDetector::spike_severity(75.0), Severity::Low);
        assert_eq!(RuleBasedDetector::spike_severity(80.0), Severity::Medium);
        assert_eq!(RuleBasedDetector::spike_severity(110.0), Severity::High);
        assert_eq!(RuleBasedDetector::spike_severity(210.0), Severity::Critical);
    }

    #[test]
    fn test_spike_and_drop_detection() {
        let detector = RuleBasedDetector::default();
        let baseline = costs(&[("EC2", 100.0), ("S3", 100.0), ("RDS", 100.0)]);
        let current = costs(&[("EC2", 160.0), ("S3", 20.0), ("RDS", 120.0)]);

        let anomalies = detector.detect_cost_changes(&current, &baseline);
        assert_eq!(anomalies.len(), 2);

        let spike = anomalies.iter().find(|a| a.anomaly_type == AnomalyType::CostSpike).unwrap();
        assert_eq!(spike.affected_services, vec!["EC2".to_string()]);
        assert_eq!(spike.severity, Severity::Low);
        assert!((spike.cost_impact - 60.0).abs() < 1e-9);

        let drop = anomalies.iter().find(|a| a.anomaly_type == AnomalyType::CostDrop).unwrap();
        assert_eq!(drop.severity, Severity::High);
    }

    #[test]
    fn test_zero_baseline_is_ignored() {
        let detector = RuleBasedDetector::default();
        let anomalies = detector.detect_cost_changes(&costs(&[("EC2", 50.0)]), &costs(&[("EC2", 0.0)]));
        assert!(anomalies.is_empty());
    }

    #[test]
    fn test_new_service_bands() {
        let detector = RuleBasedDetector::default();
        let baseline = costs(&[("EC2", 10.0)]);
        let current = costs(&[("Lambda", 150.0), ("SageMaker", 1500.0), ("Tiny", 99.0)]);

        let anomalies = detector.detect_new_services(&current, &baseline);
        assert_eq!(anomalies.len(), 2);
        let lambda = anomalies.iter().find(|a| a.affected_services[0] == "Lambda").unwrap();
        assert_eq!(lambda.severity, Severity::Low);
        let sagemaker = anomalies.iter().find(|a| a.affected_services[0] == "SageMaker").unwrap();
        assert_eq!(sagemaker.severity, Severity::High);
    }

    #[test]
    fn test_disappeared_service() {
        let detector = RuleBasedDetector::default();
        let baseline = costs(&[("EC2", 600.0), ("S3", 50.0)]);
        let anomalies = detector.detect_disappeared_services(&ServiceCosts::new(), &baseline);

        assert_eq!(anomalies.len(), 1);
        assert_eq!(anomalies[0].anomaly_type, AnomalyType::ServiceDisappeared);
        assert_eq!(anomalies[0].severity, Severity::Medium);
        assert!((anomalies[0].cost_impact + 600.0).abs() < 1e-9);
    }

    #[test]
    fn test_budget_deviation_bands() {
        let detector = RuleBasedDetector::default();
        assert!(detector.detect_budget_deviation(1200.0, 1000.0).is_none());
        assert_eq!(
            detector.detect_budget_deviation(1300.0, 1000.0).unwrap().severity,
            Severity::Medium
        );
        assert_eq!(
            detector.detect_budget_deviation(1350.0, 1000.0).unwrap().severity,
            Severity::High
        );
        assert_eq!(
            detector.detect_budget_deviation(1600.0, 1000.0).unwrap().severity,
            Severity::Critical
        );
        // underspend counts as a deviation too
        assert_eq!(
            detector.detect_budget_deviation(600.0, 1000.0).unwrap().severity,
            Severity::High
        );
        assert!(detector.detect_budget_deviation(100.0, 0.0).is_none());
    }
}
