//! Provider payload to unified cost record transformation

use super::currency::CurrencyConverter;
use super::quality::assess_data_quality;
use super::service_mapper::ServiceCategoryMapper;
use crate::config::NormalizerConfig;
use crate::error::{NormalizationError, Result};
use crate::models::{
    AccountCost, CloudProvider, CollectionMetadata, ProviderCostPayload, RegionCost, ServiceCost,
    UnifiedCostRecord,
};
use chrono::{Duration as ChronoDuration, Utc};
use parking_lot::RwLock;
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Instant;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};

/// Running totals across every normalization call on this normalizer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NormalizationStatistics {
    pub total_records_processed: u64,
    pub successful_normalizations: u64,
    pub failed_normalizations: u64,
    pub currency_conversions: u64,
    pub service_mappings: u64,
}

impl NormalizationStatistics {
    /// Successful share of processed records, 0.0 before any call
    pub fn success_rate(&self) -> f64 {
        if self.total_records_processed == 0 {
            return 0.0;
        }
        self.successful_normalizations as f64 / self.total_records_processed as f64
    }
}

/// Statistics snapshot returned to callers
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatisticsSnapshot {
    #[serde(flatten)]
    pub counters: NormalizationStatistics,
    pub success_rate: f64,
}

/// Keys of a service entry object that are not provider-specific data
const RESERVED_SERVICE_KEYS: &[&str] = &["cost", "amount", "usage_metrics", "usage"];

#[derive(Clone)]
pub struct CostNormalizer {
    config: NormalizerConfig,
    mapper: Arc<ServiceCategoryMapper>,
    converter: Arc<CurrencyConverter>,
    stats: Arc<RwLock<NormalizationStatistics>>,
}

impl CostNormalizer {
    pub fn new(
        config: NormalizerConfig,
        mapper: Arc<ServiceCategoryMapper>,
        converter: Arc<CurrencyConverter>,
    ) -> Self {
        Self {
            config,
            mapper,
            converter,
            stats: Arc::new(RwLock::new(NormalizationStatistics::default())),
        }
    }

    /// Default configuration, built-in mapping tables and an offline converter
    pub fn with_defaults() -> Self {
        Self::new(
            NormalizerConfig::default(),
            Arc::new(ServiceCategoryMapper::new()),
            Arc::new(CurrencyConverter::offline()),
        )
    }

    pub fn mapper(&self) -> &Arc<ServiceCategoryMapper> {
        &self.mapper
    }

    pub fn converter(&self) -> &Arc<CurrencyConverter> {
        &self.converter
    }

    /// Normalize one payload. `client_id` overrides the payload's own client id.
    pub async fn normalize_cost_data(
        &self,
        payload: &ProviderCostPayload,
        client_id: Option<&str>,
    ) -> Result<UnifiedCostRecord> {
        let started = Instant::now();
        self.stats.write().total_records_processed += 1;

        match self.build_record(payload, client_id, started).await {
            Ok(record) => {
                self.stats.write().successful_normalizations += 1;
                info!(
                    "Normalized {} cost data for client {} on {}: {} {} across {} services",
                    record.provider,
                    record.client_id,
                    record.date,
                    record.total_cost,
                    record.currency,
                    record.services.len()
                );
                Ok(record)
            }
            Err(e) => {
                self.stats.write().failed_normalizations += 1;
                error!(
                    "Failed to normalize {} cost data for {}: {}",
                    payload.provider, payload.date_range.start, e
                );
                Err(e)
            }
        }
    }

    async fn build_record(
        &self,
        payload: &ProviderCostPayload,
        client_id: Option<&str>,
        started: Instant,
    ) -> Result<UnifiedCostRecord> {
        let client_id = client_id
            .map(str::to_string)
            .or_else(|| payload.client_id.clone())
            .filter(|id| !id.trim().is_empty())
            .ok_or_else(|| NormalizationError::invalid_payload("missing client_id"))?;

        let source_currency = payload.currency.trim().to_uppercase();
        let target_currency = self.config.target_currency.trim().to_uppercase();
        let provider = payload.provider;

        let reported_total = self
            .convert(payload.total_cost, &source_currency, &target_currency)
            .await?;

        let mut record = UnifiedCostRecord::new(
            client_id.clone(),
            provider,
            payload.date_range.start,
            target_currency.clone(),
        )
        .with_total_cost(reported_total);

        let mut skipped = Vec::new();

        let mut service_names: Vec<&String> = payload.services.keys().collect();
        service_names.sort();
        for name in service_names {
            let entry = &payload.services[name];
            match self
                .normalize_service(provider, name, entry, &source_currency, &target_currency, &client_id)
                .await
            {
                Ok(service) => record.add_service_cost(service),
                Err(e) => {
                    warn!("Skipping service '{}' for client {}: {}", name, client_id, e);
                    skipped.push(format!("service:{}", name));
                }
            }
        }

        for (index, entry) in payload.accounts.iter().enumerate() {
            match self
                .normalize_account(provider, entry, &source_currency, &target_currency, &client_id, &mut skipped)
                .await
            {
                Ok(account) => {
                    // accounts are a breakdown and never override the reported total
                    record.accounts.insert(account.account_id.clone(), account);
                }
                Err(e) => {
                    warn!("Skipping account #{} for client {}: {}", index, client_id, e);
                    skipped.push(format!("account:{}", index));
                }
            }
        }

        let mut region_names: Vec<&String> = payload.regions.keys().collect();
        region_names.sort();
        for name in region_names {
            match self
                .normalize_region(name, &payload.regions[name], &source_currency, &target_currency)
                .await
            {
                Ok(region) => record.add_region_cost(region),
                Err(e) => {
                    warn!("Skipping region '{}' for client {}: {}", name, client_id, e);
                    skipped.push(format!("region:{}", name));
                }
            }
        }

        let freshness = payload
            .collection_metadata
            .data_freshness_hours
            .unwrap_or_else(|| {
                let end_of_range = payload.date_range.end + ChronoDuration::days(1);
                let elapsed = Utc::now().naive_utc() - end_of_range.and_time(chrono::NaiveTime::MIN);
                (elapsed.num_seconds() as f64 / 3600.0).max(0.0)
            });

        record.collection_metadata = CollectionMetadata {
            collection_timestamp: Utc::now(),
            collection_duration_seconds: started.elapsed().as_secs_f64(),
            api_calls_made: payload.collection_metadata.api_calls_made,
            data_freshness_hours: freshness,
            source_currency: source_currency.clone(),
            skipped_entries: skipped,
        };

        record.data_quality = assess_data_quality(
            reported_total,
            &record.services,
            record.accounts.len(),
            freshness,
        );

        if self.config.enable_cost_validation {
            self.validate_cost_variance(reported_total, record.total_cost)?;
        }

        debug!(
            "Record {} quality {:.2} ({})",
            record.record_id,
            record.data_quality.overall_score(),
            record.data_quality.confidence_level()
        );

        Ok(record)
    }

    fn validate_cost_variance(&self, original: Decimal, normalized: Decimal) -> Result<()> {
        if original.is_zero() {
            return Ok(());
        }

        let variance = ((normalized - original).abs() / original.abs() * Decimal::ONE_HUNDRED)
            .to_f64()
            .unwrap_or(f64::INFINITY);

        if variance > self.config.max_cost_variance_percent {
            return Err(NormalizationError::data_transformation(format!(
                "normalized total {} differs from reported total {} by {:.2}% (max {:.2}%)",
                normalized, original, variance, self.config.max_cost_variance_percent
            )));
        }
        Ok(())
    }

    async fn convert(&self, amount: Decimal, from: &str, to: &str) -> Result<Decimal> {
        let converted = self.converter.convert_amount(amount, from, to).await?;
        if from != to {
            self.stats.write().currency_conversions += 1;
        }
        Ok(converted)
    }

    async fn normalize_service(
        &self,
        provider: CloudProvider,
        name: &str,
        entry: &Value,
        source_currency: &str,
        target_currency: &str,
        client_id: &str,
    ) -> Result<ServiceCost> {
        let (cost, usage_metrics, provider_specific_data) = parse_service_entry(entry)?;
        let cost = self.convert(cost, source_currency, target_currency).await?;

        let mapping = self.mapper.map_service(provider, name, Some(client_id));
        self.stats.write().service_mappings += 1;

        let mut service = ServiceCost::new(name, mapping.unified_category, cost, target_currency);
        service.usage_metrics = usage_metrics;
        service.provider_specific_data = provider_specific_data;
        service.mapping_confidence = mapping.confidence;
        Ok(service)
    }

    async fn normalize_account(
        &self,
        provider: CloudProvider,
        entry: &Value,
        source_currency: &str,
        target_currency: &str,
        client_id: &str,
        skipped: &mut Vec<String>,
    ) -> Result<AccountCost> {
        let object = entry
            .as_object()
            .ok_or_else(|| NormalizationError::data_transformation("account entry is not an object"))?;

        let account_id = match object.get("account_id").or_else(|| object.get("id")) {
            Some(Value::String(id)) => id.clone(),
            Some(Value::Number(id)) => id.to_string(),
            _ => return Err(NormalizationError::data_transformation("account entry has no account_id")),
        };
        let account_name = object
            .get("account_name")
            .or_else(|| object.get("name"))
            .and_then(Value::as_str)
            .map(str::to_string);

        let raw_cost = object
            .get("cost")
            .and_then(decimal_from_value)
            .ok_or_else(|| NormalizationError::data_transformation(format!("account {} has no cost", account_id)))?;
        let cost = self.convert(raw_cost, source_currency, target_currency).await?;

        let mut account = AccountCost {
            account_id: account_id.clone(),
            account_name,
            cost,
            services: HashMap::new(),
            regions: HashMap::new(),
        };

        if let Some(Value::Object(services)) = object.get("services") {
            for (name, service_entry) in services {
                match self
                    .normalize_service(provider, name, service_entry, source_currency, target_currency, client_id)
                    .await
                {
                    Ok(service) => {
                        account.services.insert(name.clone(), service);
                    }
                    Err(e) => {
                        warn!("Skipping service '{}' in account {}: {}", name, account_id, e);
                        skipped.push(format!("account:{}/service:{}", account_id, name));
                    }
                }
            }
        }

        if let Some(Value::Object(regions)) = object.get("regions") {
            for (name, region_entry) in regions {
                match self
                    .normalize_region(name, region_entry, source_currency, target_currency)
                    .await
                {
                    Ok(region) => {
                        account.regions.insert(name.clone(), region);
                    }
                    Err(e) => {
                        warn!("Skipping region '{}' in account {}: {}", name, account_id, e);
                        skipped.push(format!("account:{}/region:{}", account_id, name));
                    }
                }
            }
        }

        Ok(account)
    }

    async fn normalize_region(
        &self,
        name: &str,
        entry: &Value,
        source_currency: &str,
        target_currency: &str,
    ) -> Result<RegionCost> {
        let (raw_cost, raw_services) = match entry {
            Value::Object(object) => {
                let cost = object.get("cost").and_then(decimal_from_value).ok_or_else(|| {
                    NormalizationError::data_transformation(format!("region {} has no cost", name))
                })?;
                (cost, object.get("services").and_then(Value::as_object))
            }
            other => (
                decimal_from_value(other).ok_or_else(|| {
                    NormalizationError::data_transformation(format!("region {} cost is not numeric", name))
                })?,
                None,
            ),
        };

        let cost = self.convert(raw_cost, source_currency, target_currency).await?;

        let mut services = HashMap::new();
        for (service, value) in raw_services.into_iter().flatten() {
            let Some(amount) = decimal_from_value(value) else {
                warn!("Ignoring non-numeric cost for service '{}' in region {}", service, name);
                continue;
            };
            let amount = self.convert(amount, source_currency, target_currency).await?;
            services.insert(service.clone(), amount);
        }

        Ok(RegionCost {
            region: name.to_string(),
            cost,
            services,
        })
    }

    /// Normalize payloads concurrently, bounded by `max_concurrency`.
    ///
    /// Failed payloads are logged and dropped; the rest keep their input order.
    /// Dropping the returned future aborts every in-flight task.
    pub async fn batch_normalize(
        &self,
        payloads: Vec<ProviderCostPayload>,
        client_id: Option<&str>,
    ) -> Vec<UnifiedCostRecord> {
        let total = payloads.len();
        let semaphore = Arc::new(Semaphore::new(self.config.max_concurrency.max(1)));
        let client_id = client_id.map(str::to_string);

        let mut tasks = JoinSet::new();
        for (index, payload) in payloads.into_iter().enumerate() {
            let normalizer = self.clone();
            let semaphore = semaphore.clone();
            let client_id = client_id.clone();

            tasks.spawn(async move {
                let _permit = semaphore.acquire_owned().await.ok()?;
                let record = normalizer
                    .normalize_cost_data(&payload, client_id.as_deref())
                    .await
                    .ok()?;
                Some((index, record))
            });
        }

        let mut slots: Vec<Option<UnifiedCostRecord>> = vec![None; total];
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok(Some((index, record))) => slots[index] = Some(record),
                Ok(None) => {}
                Err(e) => error!("Normalization task failed: {}", e),
            }
        }

        let records: Vec<UnifiedCostRecord> = slots.into_iter().flatten().collect();
        info!("Batch normalized {}/{} payloads", records.len(), total);
        records
    }

    pub fn get_normalization_statistics(&self) -> StatisticsSnapshot {
        let counters = self.stats.read().clone();
        let success_rate = counters.success_rate();
        StatisticsSnapshot {
            counters,
            success_rate,
        }
    }

    pub fn reset_statistics(&self) {
        *self.stats.write() = NormalizationStatistics::default();
    }
}

/// Number, numeric string, or `null`-free JSON value to a decimal
fn decimal_from_value(value: &Value) -> Option<Decimal> {
    match value {
        Value::Number(n) => match n.as_i64() {
            Some(i) => Some(Decimal::from(i)),
            None => n.as_f64().filter(|f| f.is_finite()).and_then(Decimal::from_f64),
        },
        Value::String(s) => {
            let s = s.trim();
            s.parse::<Decimal>()
                .ok()
                .or_else(|| Decimal::from_scientific(s).ok())
        }
        _ => None,
    }
}

/// A service entry is either a bare cost or an object with `cost` and optional usage data
fn parse_service_entry(entry: &Value) -> Result<(Decimal, HashMap<String, f64>, Map<String, Value>)> {
    match entry {
        Value::Object(object) => {
            let cost = object
                .get("cost")
                .or_else(|| object.get("amount"))
                .and_then(decimal_from_value)
                .ok_or_else(|| NormalizationError::data_transformation("service entry has no numeric cost"))?;

            let usage_metrics = object
                .get("usage_metrics")
                .or_else(|| object.get("usage"))
                .and_then(Value::as_object)
                .map(|usage| {
                    usage
                        .iter()
                        .filter_map(|(k, v)| v.as_f64().map(|v| (k.clone(), v)))
                        .collect()
                })
                .unwrap_or_default();

            let provider_specific_data = object
                .iter()
                .filter(|(k, _)| !RESERVED_SERVICE_KEYS.contains(&k.as_str()))
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect();

            Ok((cost, usage_metrics, provider_specific_data))
        }
        other => decimal_from_value(other)
            .map(|cost| (cost, HashMap::new(), Map::new()))
            .ok_or_else(|| NormalizationError::data_transformation("service cost is not numeric")),
    }
}
