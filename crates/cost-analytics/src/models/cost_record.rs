//! The unified, provider-agnostic daily cost record.

use super::mapping::ConfidenceLevel;
use super::provider::{CloudProvider, ServiceCategory};
use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};
use uuid::Uuid;

/// Largest tolerated gap between `total_cost` and the sum of service costs
pub const COST_TOLERANCE: Decimal = Decimal::from_parts(1, 0, 0, false, 2);

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceCost {
    pub service_name: String,
    pub unified_category: ServiceCategory,
    pub cost: Decimal,
    pub currency: String,
    #[serde(default)]
    pub usage_metrics: HashMap<String, f64>,
    #[serde(default)]
    pub provider_specific_data: serde_json::Map<String, serde_json::Value>,
    pub mapping_confidence: ConfidenceLevel,
}

impl ServiceCost {
    pub fn new(
        service_name: impl Into<String>,
        unified_category: ServiceCategory,
        cost: Decimal,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            service_name: service_name.into(),
            unified_category,
            cost,
            currency: currency.into(),
            usage_metrics: HashMap::new(),
            provider_specific_data: serde_json::Map::new(),
            mapping_confidence: ConfidenceLevel::High,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegionCost {
    pub region: String,
    pub cost: Decimal,
    #[serde(default)]
    pub services: HashMap<String, Decimal>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AccountCost {
    pub account_id: String,
    pub account_name: Option<String>,
    pub cost: Decimal,
    #[serde(default)]
    pub services: HashMap<String, ServiceCost>,
    #[serde(default)]
    pub regions: HashMap<String, RegionCost>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CollectionMetadata {
    pub collection_timestamp: DateTime<Utc>,
    pub collection_duration_seconds: f64,
    pub api_calls_made: u32,
    pub data_freshness_hours: f64,
    pub source_currency: String,
    /// Sub-entries dropped during normalization
    #[serde(default)]
    pub skipped_entries: Vec<String>,
}

impl Default for CollectionMetadata {
    fn default() -> Self {
        Self {
            collection_timestamp: Utc::now(),
            collection_duration_seconds: 0.0,
            api_calls_made: 0,
            data_freshness_hours: 0.0,
            source_currency: "USD".to_string(),
            skipped_entries: Vec::new(),
        }
    }
}

/// Four-dimension quality score, each in [0, 1]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DataQuality {
    pub completeness: f64,
    pub accuracy: f64,
    pub timeliness: f64,
    pub consistency: f64,
}

impl DataQuality {
    pub fn overall_score(&self) -> f64 {
        (self.completeness + self.accuracy + self.timeliness + self.consistency) / 4.0
    }

    pub fn confidence_level(&self) -> ConfidenceLevel {
        ConfidenceLevel::from_score(self.overall_score())
    }
}

impl Default for DataQuality {
    fn default() -> Self {
        Self {
            completeness: 1.0,
            accuracy: 1.0,
            timeliness: 1.0,
            consistency: 1.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UnifiedCostRecord {
    pub record_id: Uuid,
    pub client_id: String,
    pub provider: CloudProvider,
    pub date: NaiveDate,
    pub total_cost: Decimal,
    pub currency: String,
    #[serde(default)]
    pub services: HashMap<String, ServiceCost>,
    #[serde(default)]
    pub accounts: HashMap<String, AccountCost>,
    #[serde(default)]
    pub regions: HashMap<String, RegionCost>,
    pub collection_metadata: CollectionMetadata,
    pub data_quality: DataQuality,
}

impl UnifiedCostRecord {
    pub fn new(
        client_id: impl Into<String>,
        provider: CloudProvider,
        date: NaiveDate,
        currency: impl Into<String>,
    ) -> Self {
        Self {
            record_id: Uuid::new_v4(),
            client_id: client_id.into(),
            provider,
            date,
            total_cost: Decimal::ZERO,
            currency: currency.into(),
            services: HashMap::new(),
            accounts: HashMap::new(),
            regions: HashMap::new(),
            collection_metadata: CollectionMetadata::default(),
            data_quality: DataQuality::default(),
        }
    }

    pub fn with_total_cost(mut self, total_cost: Decimal) -> Self {
        self.total_cost = total_cost;
        self
    }

    /// Insert (or replace) a service entry and recompute the total
    pub fn add_service_cost(&mut self, service: ServiceCost) {
        self.services.insert(service.service_name.clone(), service);
        self.recompute_total();
    }

    /// Insert (or replace) an account entry and recompute the total
    pub fn add_account_cost(&mut self, account: AccountCost) {
        self.accounts.insert(account.account_id.clone(), account);
        self.recompute_total();
    }

    pub fn add_region_cost(&mut self, region: RegionCost) {
        self.regions.insert(region.region.clone(), region);
    }

    pub fn services_total(&self) -> Decimal {
        self.services.values().map(|s| s.cost).sum()
    }

    pub fn accounts_total(&self) -> Decimal {
        self.accounts.values().map(|a| a.cost).sum()
    }

    /// Services are authoritative when present, then accounts.
    fn recompute_total(&mut self) {
        if !self.services.is_empty() {
            self.total_cost = self.services_total();
        } else if !self.accounts.is_empty() {
            self.total_cost = self.accounts_total();
        }
    }

    pub fn total_cost_f64(&self) -> f64 {
        self.total_cost.to_f64().unwrap_or(0.0)
    }

    pub fn cost_by_category(&self) -> BTreeMap<ServiceCategory, Decimal> {
        let mut totals = BTreeMap::new();
        for service in self.services.values() {
            *totals.entry(service.unified_category).or_insert(Decimal::ZERO) += service.cost;
        }
        totals
    }

    /// Invariant violations; empty when the record is consistent
    pub fn validate(&self) -> Vec<String> {
        let mut issues = Vec::new();

        if self.total_cost < Decimal::ZERO {
            issues.push(format!("negative total cost: {}", self.total_cost));
        }

        if !self.services.is_empty() {
            let services_total = self.services_total();
            if (self.total_cost - services_total).abs() > COST_TOLERANCE {
                issues.push(format!(
                    "total cost {} differs from service sum {}",
                    self.total_cost, services_total
                ));
            }
        }

        for service in self.services.values() {
            if service.cost < Decimal::ZERO {
                issues.push(format!("negative cost for service {}", service.service_name));
            }
        }
        for account in self.accounts.values() {
            if account.cost < Decimal::ZERO {
                issues.push(format!("negative cost for account {}", account.account_id));
            }
        }
        for region in self.regions.values() {
            if region.cost < Decimal::ZERO {
                issues.push(format!("negative cost for region {}", region.region));
            }
        }

        issues
    }

    /// Partition and sort key used by the persistence layer
    pub fn storage_key(&self) -> (String, String) {
        (
            format!("CLIENT#{}", self.client_id),
            format!("COST#{}#{}", self.provider, self.date.format("%Y-%m-%d")),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn record() -> UnifiedCostRecord {
        UnifiedCostRecord::new(
            "acme",
            CloudProvider::Aws,
            NaiveDate::from_ymd_opt(2024, 1, 15).unwrap(),
            "USD",
        )
    }

    #[test]
    fn test_add_service_cost_recomputes_total() {
        let mut record = record().with_total_cost(dec!(999.00));
        record.add_service_cost(ServiceCost::new("EC2", ServiceCategory::Compute, dec!(100.25), "USD"));
        record.add_service_cost(ServiceCost::new("S3", ServiceCategory::Storage, dec!(20.10), "USD"));

        assert_eq!(record.total_cost, dec!(120.35));
        assert!(record.validate().is_empty());
    }

    #[test]
    fn test_add_account_cost_without_services() {
        let mut record = record();
        record.add_account_cost(AccountCost {
            account_id: "111".to_string(),
            account_name: None,
            cost: dec!(40.00),
            services: HashMap::new(),
            regions: HashMap::new(),
        });
        record.add_account_cost(AccountCost {
            account_id: "222".to_string(),
            account_name: Some("prod".to_string()),
            cost: dec!(60.00),
            services: HashMap::new(),
            regions: HashMap::new(),
        });

        assert_eq!(record.total_cost, dec!(100.00));
    }

    #[test]
    fn test_services_take_precedence_over_accounts() {
        let mut record = record();
        record.add_service_cost(ServiceCost::new("EC2", ServiceCategory::Compute, dec!(10.00), "USD"));
        record.add_account_cost(AccountCost {
            account_id: "111".to_string(),
            account_name: None,
            cost: dec!(500.00),
            services: HashMap::new(),
            regions: HashMap::new(),
        });

        assert_eq!(record.total_cost, dec!(10.00));
    }

    #[test]
    fn test_validate_reports_mismatch_and_negatives() {
        let mut record = record();
        record.add_service_cost(ServiceCost::new("EC2", ServiceCategory::Compute, dec!(-5.00), "USD"));
        record.total_cost = dec!(10.00);

        let issues = record.validate();
        assert!(issues.iter().any(|i| i.contains("differs from service sum")));
        assert!(issues.iter().any(|i| i.contains("negative cost for service EC2")));
    }

    #[test]
    fn test_cost_by_category() {
        let mut record = record();
        record.add_service_cost(ServiceCost::new("EC2", ServiceCategory::Compute, dec!(10.00), "USD"));
        record.add_service_cost(ServiceCost::new("Lambda", ServiceCategory::Compute, dec!(5.00), "USD"));
        record.add_service_cost(ServiceCost::new("S3", ServiceCategory::Storage, dec!(2.50), "USD"));

        let totals = record.cost_by_category();
        assert_eq!(totals[&ServiceCategory::Compute], dec!(15.00));
        assert_eq!(totals[&ServiceCategory::Storage], dec!(2.50));
    }

    #[test]
    fn test_storage_key() {
        let (pk, sk) = record().storage_key();
        assert_eq!(pk, "CLIENT#acme");
        assert_eq!(sk, "COST#AWS#2024-01-15");
    }

    #[test]
    fn test_data_quality_confidence() {
        let quality = DataQuality {
            completeness: 1.0,
            accuracy: 0.8,
            timeliness: 0.7,
            consistency: 1.0,
        };
        assert!((quality.overall_score() - 0.875).abs() < 1e-9);
        assert_eq!(quality.confidence_level(), ConfidenceLevel::Medium);
        assert_eq!(DataQuality::default().confidence_level(), ConfidenceLevel::High);
    }

    #[test]
    fn test_cost_tolerance_is_one_cent() {
        assert_eq!(COST_TOLERANCE, dec!(0.01));
    }

    #[test]
    fn test_record_serializes_date_as_iso() {
        let json = serde_json::to_value(record()).unwrap();
        assert_eq!(json["date"], "2024-01-15");
        assert_eq!(json["provider"], "AWS");
    }
}
