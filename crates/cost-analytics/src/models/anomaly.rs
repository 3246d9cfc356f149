use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnomalyType {
    CostSpike,
    CostDrop,
    NewService,
    ServiceDisappeared,
    BudgetDeviation,
    StatisticalOutlier,
    UnusualPattern,
}

impl AnomalyType {
    /// Lenient parse used for collaborator output
    pub fn parse_lenient(value: &str) -> Self {
        match value.trim().to_lowercase().replace(['-', ' '], "_").as_str() {
            "cost_spike" | "spike" => AnomalyType::CostSpike,
            "cost_drop" | "drop" => AnomalyType::CostDrop,
            "new_service" => AnomalyType::NewService,
            "service_disappeared" | "disappeared_service" => AnomalyType::ServiceDisappeared,
            "budget_deviation" | "budget_overrun" => AnomalyType::BudgetDeviation,
            "statistical_outlier" | "outlier" => AnomalyType::StatisticalOutlier,
            _ => AnomalyType::UnusualPattern,
        }
    }
}

impl std::fmt::Display for AnomalyType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            AnomalyType::CostSpike => "COST_SPIKE",
            AnomalyType::CostDrop => "COST_DROP",
            AnomalyType::NewService => "NEW_SERVICE",
            AnomalyType::ServiceDisappeared => "SERVICE_DISAPPEARED",
            AnomalyType::BudgetDeviation => "BUDGET_DEVIATION",
            AnomalyType::StatisticalOutlier => "STATISTICAL_OUTLIER",
            AnomalyType::UnusualPattern => "UNUSUAL_PATTERN",
        };
        f.write_str(name)
    }
}

/// Ordered so that `Critical` compares greatest
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    /// critical:4, high:3, medium:2, low:1
    pub fn rank(&self) -> u8 {
        match self {
            Severity::Critical => 4,
            Severity::High => 3,
            Severity::Medium => 2,
            Severity::Low => 1,
        }
    }

    pub fn parse_lenient(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "critical" | "urgent" => Severity::Critical,
            "high" => Severity::High,
            "low" => Severity::Low,
            _ => Severity::Medium,
        }
    }
}

impl std::fmt::Display for Severity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Severity::Critical => write!(f, "CRITICAL"),
            Severity::High => write!(f, "HIGH"),
            Severity::Medium => write!(f, "MEDIUM"),
            Severity::Low => write!(f, "LOW"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DetectionMethod {
    ZScore,
    Iqr,
    RuleBased,
    AiAnalysis,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Anomaly {
    pub id: Uuid,
    pub anomaly_type: AnomalyType,
    pub severity: Severity,
    pub description: String,
    pub affected_services: Vec<String>,
    /// Signed cost difference against the expected value
    pub cost_impact: f64,
    pub detection_method: DetectionMethod,
    /// In [0, 1]
    pub confidence_score: f64,
    pub recommended_actions: Vec<String>,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub metadata: HashMap<String, serde_json::Value>,
}

impl Anomaly {
    pub fn new(
        anomaly_type: AnomalyType,
        severity: Severity,
        description: impl Into<String>,
        detection_method: DetectionMethod,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            anomaly_type,
            severity,
            description: description.into(),
            affected_services: Vec::new(),
            cost_impact: 0.0,
            detection_method,
            confidence_score: 0.0,
            recommended_actions: Vec::new(),
            timestamp: Utc::now(),
            metadata: HashMap::new(),
        }
    }

    pub fn with_services<I, S>(mut self, services: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.affected_services = services.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_cost_impact(mut self, cost_impact: f64) -> Self {
        self.cost_impact = cost_impact;
        self
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence_score = if confidence.is_finite() {
            confidence.clamp(0.0, 1.0)
        } else {
            0.0
        };
        self
    }

    pub fn with_actions<I, S>(mut self, actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.recommended_actions = actions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_metadata(mut self, key: impl Into<String>, value: serde_json::Value) -> Self {
        self.metadata.insert(key.into(), value);
        self
    }

    /// Grouping key used for deduplication
    pub fn dedup_key(&self) -> (AnomalyType, Vec<String>) {
        let mut services = self.affected_services.clone();
        services.sort();
        (self.anomaly_type, services)
    }
}
