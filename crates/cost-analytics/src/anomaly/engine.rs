//! Combines statistical, rule-based and optional AI detection
//!
//! Detection is advisory: any internal failure is logged and yields no anomalies.

use super::ai::{parse_ai_response, AiAnomalyDetector, NoopAiDetector};
use super::rules::{RuleBasedDetector, ServiceCosts};
use super::statistical::{OutlierDirection, StatisticalDetector, StatisticalOutlier};
use crate::config::AnomalyConfig;
use crate::models::{Anomaly, AnomalyType, DetectionMethod, Severity, UnifiedCostRecord};
use crate::stats::{mean, sample_std_dev};
use chrono::NaiveDate;
use ordered_float::OrderedFloat;
use rust_decimal::prelude::ToPrimitive;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Label used for anomalies on the daily total rather than a single service
pub const TOTAL_SERIES: &str = "total";

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BudgetInfo {
    /// Compared against the summed spend of the current period
    pub monthly_budget: f64,
}

/// Aggregate view over a list of anomalies
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnomalySummary {
    pub total_anomalies: usize,
    pub by_severity: BTreeMap<Severity, usize>,
    pub by_type: BTreeMap<AnomalyType, usize>,
    /// Sum of absolute cost impacts
    pub total_cost_impact: f64,
    pub highest_severity: Option<Severity>,
}

pub fn summarize_anomalies(anomalies: &[Anomaly]) -> AnomalySummary {
    let mut summary = AnomalySummary {
        total_anomalies: anomalies.len(),
        ..AnomalySummary::default()
    };

    for anomaly in anomalies {
        *summary.by_severity.entry(anomaly.severity).or_insert(0) += 1;
        *summary.by_type.entry(anomaly.anomaly_type).or_insert(0) += 1;
        summary.total_cost_impact += anomaly.cost_impact.abs();
    }
    summary.highest_severity = anomalies.iter().map(|a| a.severity).max();
    summary
}

/// Keep the most confident member of each `(type, services)` group, most severe first
pub fn deduplicate_and_rank(anomalies: Vec<Anomaly>) -> Vec<Anomaly> {
    let mut best: HashMap<(AnomalyType, Vec<String>), Anomaly> = HashMap::new();

    for anomaly in anomalies {
        let key = anomaly.dedup_key();
        let replace = match best.get(&key) {
            Some(kept) => {
                (OrderedFloat(anomaly.confidence_score), anomaly.severity.rank())
                    > (OrderedFloat(kept.confidence_score), kept.severity.rank())
            }
            None => true,
        };
        if replace {
            best.insert(key, anomaly);
        }
    }

    let mut ranked: Vec<Anomaly> = best.into_values().collect();
    ranked.sort_by(|a, b| {
        (b.severity.rank(), OrderedFloat(b.confidence_score))
            .cmp(&(a.severity.rank(), OrderedFloat(a.confidence_score)))
            .then_with(|| a.description.cmp(&b.description))
    });
    ranked
}

fn z_score_severity(z: f64) -> Severity {
    if z > 4.0 {
        Severity::Critical
    } else if z > 3.0 {
        Severity::High
    } else if z > 2.5 {
        Severity::Medium
    } else {
        Severity::Low
    }
}

fn iqr_severity(score: f64) -> Severity {
    if score > 3.0 {
        Severity::Critical
    } else if score > 2.0 {
        Severity::High
    } else if score > 1.0 {
        Severity::Medium
    } else {
        Severity::Low
    }
}

/// Daily totals and per-service daily costs of one period
#[derive(Debug, Default)]
struct PeriodSeries {
    daily_totals: BTreeMap<NaiveDate, f64>,
    service_daily: BTreeMap<String, BTreeMap<NaiveDate, f64>>,
}

impl PeriodSeries {
    fn from_records(records: &[UnifiedCostRecord]) -> Self {
        let mut series = PeriodSeries::default();
        for record in records {
            *series.daily_totals.entry(record.date).or_insert(0.0) += record.total_cost_f64();
            for service in record.services.values() {
                *series
                    .service_daily
                    .entry(service.service_name.clone())
                    .or_default()
                    .entry(record.date)
                    .or_insert(0.0) += service.cost.to_f64().unwrap_or(0.0);
            }
        }
        series
    }

    fn totals(&self) -> Vec<f64> {
        self.daily_totals.values().copied().collect()
    }

    fn days(&self) -> usize {
        self.daily_totals.len()
    }

    /// Average daily cost per service over the whole period
    fn service_averages(&self) -> ServiceCosts {
        let days = self.days().max(1) as f64;
        self.service_daily
            .iter()
            .map(|(service, daily)| (service.clone(), daily.values().sum::<f64>() / days))
            .collect()
    }

    fn service_values(&self, service: &str) -> (Vec<NaiveDate>, Vec<f64>) {
        self.service_daily
            .get(service)
            .map(|daily| (daily.keys().copied().collect(), daily.values().copied().collect()))
            .unwrap_or_default()
    }
}

pub struct AnomalyDetectionEngine {
    statistical: StatisticalDetector,
    rules: RuleBasedDetector,
    ai_detector: Arc<dyn AiAnomalyDetector>,
    use_ai: bool,
}

impl AnomalyDetectionEngine {
    /// Statistical and rule-based detection only
    pub fn new(config: &AnomalyConfig) -> Self {
        Self {
            statistical: StatisticalDetector::new(config),
            rules: RuleBasedDetector::new(config),
            ai_detector: Arc::new(NoopAiDetector),
            use_ai: false,
        }
    }

    /// AI detection is consulted only when `config.use_ai` is set
    pub fn with_ai_detector(config: &AnomalyConfig, ai_detector: Arc<dyn AiAnomalyDetector>) -> Self {
        Self {
            ai_detector,
            use_ai: config.use_ai,
            ..Self::new(config)
        }
    }

    pub fn uses_ai(&self) -> bool {
        self.use_ai
    }

    /// Detect anomalies in `current` against the `historical` baseline.
    ///
    /// Never fails; internal errors are logged and produce an empty list.
    pub async fn detect_anomalies(
        &self,
        current: &[UnifiedCostRecord],
        historical: &[UnifiedCostRecord],
        budget: Option<&BudgetInfo>,
    ) -> Vec<Anomaly> {
        match self.try_detect(current, historical, budget).await {
            Ok(anomalies) => {
                info!(
                    "Detected {} anomalies across {} current and {} historical records",
                    anomalies.len(),
                    current.len(),
                    historical.len()
                );
                anomalies
            }
            Err(e) => {
                error!("Anomaly detection failed, returning no anomalies: {:#}", e);
                Vec::new()
            }
        }
    }

    async fn try_detect(
        &self,
        current: &[UnifiedCostRecord],
        historical: &[UnifiedCostRecord],
        budget: Option<&BudgetInfo>,
    ) -> anyhow::Result<Vec<Anomaly>> {
        if current.is_empty() {
            return Ok(Vec::new());
        }

        let current_series = PeriodSeries::from_records(current);
        let historical_series = PeriodSeries::from_records(historical);

        let mut anomalies = self.statistical_anomalies(
            TOTAL_SERIES,
            &current_series.daily_totals.keys().copied().collect::<Vec<_>>(),
            &current_series.totals(),
            &historical_series.totals(),
        );

        for service in current_series.service_daily.keys() {
            let (dates, values) = current_series.service_values(service);
            let (_, baseline) = historical_series.service_values(service);
            anomalies.extend(self.statistical_anomalies(service, &dates, &values, &baseline));
        }

        let current_averages = current_series.service_averages();
        let historical_averages = historical_series.service_averages();
        let current_total: f64 = current_series.totals().iter().sum();
        anomalies.extend(self.rules.detect_all(
            &current_averages,
            &historical_averages,
            current_total,
            budget.map(|b| b.monthly_budget),
        ));

        if self.use_ai {
            anomalies.extend(
                self.ai_anomalies(&current_series, &historical_series, &current_averages, &historical_averages)
                    .await?,
            );
        }

        debug!("{} raw anomalies before deduplication", anomalies.len());
        Ok(deduplicate_and_rank(anomalies))
    }

    fn statistical_anomalies(
        &self,
        series: &str,
        dates: &[NaiveDate],
        current: &[f64],
        historical: &[f64],
    ) -> Vec<Anomaly> {
        let z_scores = self
            .statistical
            .detect_z_score_anomalies(current, historical)
            .into_iter()
            .map(|outlier| {
                let confidence = (outlier.score / 5.0).min(1.0);
                to_anomaly(series, dates, &outlier, z_score_severity(outlier.score), confidence, DetectionMethod::ZScore)
            });

        let iqr = self
            .statistical
            .detect_iqr_anomalies(current, historical)
            .into_iter()
            .map(|outlier| {
                let confidence = (outlier.score / 3.0).min(1.0);
                to_anomaly(series, dates, &outlier, iqr_severity(outlier.score), confidence, DetectionMethod::Iqr)
            });

        z_scores.chain(iqr).collect()
    }

    /// Empty when the collaborator fails or answers in an unexpected shape
    async fn ai_anomalies(
        &self,
        current: &PeriodSeries,
        historical: &PeriodSeries,
        current_averages: &ServiceCosts,
        historical_averages: &ServiceCosts,
    ) -> anyhow::Result<Vec<Anomaly>> {
        let historical_totals = historical.totals();
        let current_payload = json!({
            "daily_totals": serde_json::to_value(&current.daily_totals)?,
            "service_averages": serde_json::to_value(current_averages)?,
        });
        let historical_payload = json!({
            "daily_totals": serde_json::to_value(&historical.daily_totals)?,
            "service_averages": serde_json::to_value(historical_averages)?,
        });
        let context = json!({
            "historical_mean": mean(&historical_totals),
            "historical_std_dev": sample_std_dev(&historical_totals),
            "current_days": current.days(),
            "historical_days": historical.days(),
        });

        match self
            .ai_detector
            .analyze(&current_payload, &historical_payload, &context)
            .await
        {
            Ok(response) => match parse_ai_response(response) {
                Some(anomalies) => Ok(anomalies),
                None => {
                    warn!("AI anomaly response had an unexpected shape, ignoring it");
                    Ok(Vec::new())
                }
            },
            Err(e) => {
                warn!("AI anomaly detection unavailable: {:#}", e);
                Ok(Vec::new())
            }
        }
    }
}

impl Default for AnomalyDetectionEngine {
    fn default() -> Self {
        Self::new(&AnomalyConfig::default())
    }
}

fn to_anomaly(
    series: &str,
    dates: &[NaiveDate],
    outlier: &StatisticalOutlier,
    severity: Severity,
    confidence: f64,
    method: DetectionMethod,
) -> Anomaly {
    let (anomaly_type, verb) = match outlier.direction {
        OutlierDirection::Spike => (AnomalyType::CostSpike, "above"),
        OutlierDirection::Drop => (AnomalyType::CostDrop, "below"),
    };
    let label = if series == TOTAL_SERIES { "Total daily cost" } else { series };
    let date = dates.get(outlier.index).map(|d| d.to_string());

    let mut anomaly = Anomaly::new(
        anomaly_type,
        severity,
        format!(
            "{} of {:.2}{} is {} the historical mean of {:.2} (score {:.2})",
            label,
            outlier.value,
            date.as_ref().map(|d| format!(" on {}", d)).unwrap_or_default(),
            verb,
            outlier.historical_mean,
            outlier.score
        ),
        method,
    )
    .with_services([series.to_string()])
    .with_cost_impact(outlier.value - outlier.historical_mean)
    .with_confidence(confidence)
    .with_actions([format!("Review {} activity for the flagged period", label)])
    .with_metadata("score", json!(outlier.score))
    .with_metadata("reference_value", json!(outlier.reference));

    if let Some(date) = date {
        anomaly = anomaly.with_metadata("date", json!(date));
    }
    anomaly
}
