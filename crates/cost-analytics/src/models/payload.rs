//! Raw per-provider cost payloads as produced by the provider adapters.
//!
//! Service, account and region entries stay as raw JSON so the normalizer can
//! skip a malformed entry without rejecting the whole payload.

use super::provider::CloudProvider;
use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    pub fn single_day(date: NaiveDate) -> Self {
        Self { start: date, end: date }
    }

    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawCollectionMetadata {
    #[serde(default)]
    pub api_calls_made: u32,
    /// Hours since the billing data was produced; derived from the date range when absent
    pub data_freshness_hours: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProviderCostPayload {
    pub client_id: Option<String>,
    pub provider: CloudProvider,
    pub date_range: DateRange,
    pub total_cost: Decimal,
    #[serde(default = "default_currency")]
    pub currency: String,
    #[serde(default)]
    pub accounts: Vec<serde_json::Value>,
    #[serde(default)]
    pub services: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub regions: HashMap<String, serde_json::Value>,
    #[serde(default)]
    pub collection_metadata: RawCollectionMetadata,
}

fn default_currency() -> String {
    "USD".to_string()
}

impl ProviderCostPayload {
    pub fn new(provider: CloudProvider, date: NaiveDate, total_cost: Decimal) -> Self {
        Self {
            client_id: None,
            provider,
            date_range: DateRange::single_day(date),
            total_cost,
            currency: default_currency(),
            accounts: Vec::new(),
            services: HashMap::new(),
            regions: HashMap::new(),
            collection_metadata: RawCollectionMetadata::default(),
        }
    }

    pub fn with_client_id(mut self, client_id: impl Into<String>) -> Self {
        self.client_id = Some(client_id.into());
        self
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = currency.into();
        self
    }

    pub fn with_service(mut self, name: impl Into<String>, entry: serde_json::Value) -> Self {
        self.services.insert(name.into(), entry);
        self
    }

    pub fn with_account(mut self, entry: serde_json::Value) -> Self {
        self.accounts.push(entry);
        self
    }

    pub fn with_region(mut self, name: impl Into<String>, entry: serde_json::Value) -> Self {
        self.regions.insert(name.into(), entry);
        self
    }
}
