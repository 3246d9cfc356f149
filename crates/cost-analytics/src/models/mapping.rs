use super::provider::{CloudProvider, ServiceCategory};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Confidence bucket shared by service mappings and record data quality
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ConfidenceLevel {
    Unknown,
    Low,
    Medium,
    High,
}

impl ConfidenceLevel {
    /// HIGH >= 0.9, MEDIUM >= 0.7, LOW >= 0.5, otherwise UNKNOWN
    pub fn from_score(score: f64) -> Self {
        if score >= 0.9 {
            ConfidenceLevel::High
        } else if score >= 0.7 {
            ConfidenceLevel::Medium
        } else if score >= 0.5 {
            ConfidenceLevel::Low
        } else {
            ConfidenceLevel::Unknown
        }
    }
}

impl std::fmt::Display for ConfidenceLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfidenceLevel::High => write!(f, "HIGH"),
            ConfidenceLevel::Medium => write!(f, "MEDIUM"),
            ConfidenceLevel::Low => write!(f, "LOW"),
            ConfidenceLevel::Unknown => write!(f, "UNKNOWN"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ServiceMapping {
    pub provider_service_name: String,
    pub unified_category: ServiceCategory,
    pub confidence: ConfidenceLevel,
    #[serde(default)]
    pub aliases: Vec<String>,
    #[serde(default)]
    pub tags: Vec<String>,
}

impl ServiceMapping {
    pub fn new(
        provider_service_name: impl Into<String>,
        unified_category: ServiceCategory,
        confidence: ConfidenceLevel,
    ) -> Self {
        Self {
            provider_service_name: provider_service_name.into(),
            unified_category,
            confidence,
            aliases: Vec::new(),
            tags: Vec::new(),
        }
    }

    pub fn with_aliases<I, S>(mut self, aliases: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.aliases = aliases.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_tags<I, S>(mut self, tags: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags = tags.into_iter().map(Into::into).collect();
        self
    }

    /// Fallback mapping for names nothing else matched
    pub fn unmapped(service_name: impl Into<String>) -> Self {
        Self::new(service_name, ServiceCategory::Other, ConfidenceLevel::Unknown)
            .with_tags(["unmapped"])
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RuleType {
    /// Case-sensitive equality
    Exact,
    /// Case-insensitive substring
    Contains,
    /// Case-insensitive regex search
    Regex,
}

/// Per-client override of the base mapping tables
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CustomMappingRule {
    pub rule_id: String,
    pub client_id: String,
    pub provider: CloudProvider,
    pub service_pattern: String,
    pub rule_type: RuleType,
    pub target_category: ServiceCategory,
    #[serde(default)]
    pub priority: i32,
    #[serde(default = "default_active")]
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
}

fn default_active() -> bool {
    true
}

impl CustomMappingRule {
    pub fn new(
        client_id: impl Into<String>,
        provider: CloudProvider,
        service_pattern: impl Into<String>,
        rule_type: RuleType,
        target_category: ServiceCategory,
        priority: i32,
    ) -> Self {
        Self {
            rule_id: uuid::Uuid::new_v4().to_string(),
            client_id: client_id.into(),
            provider,
            service_pattern: service_pattern.into(),
            rule_type,
            target_category,
            priority,
            is_active: true,
            created_at: Utc::now(),
        }
    }

    pub fn inactive(mut self) -> Self {
        self.is_active = false;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_confidence_from_score_boundaries() {
        assert_eq!(ConfidenceLevel::from_score(0.95), ConfidenceLevel::High);
        assert_eq!(ConfidenceLevel::from_score(0.9), ConfidenceLevel::High);
        assert_eq!(ConfidenceLevel::from_score(0.75), ConfidenceLevel::Medium);
        assert_eq!(ConfidenceLevel::from_score(0.5), ConfidenceLevel::Low);
        assert_eq!(ConfidenceLevel::from_score(0.49), ConfidenceLevel::Unknown);
    }

    #[test]
    fn test_confidence_ordering() {
        assert!(ConfidenceLevel::High > ConfidenceLevel::Medium);
        assert!(ConfidenceLevel::Low > ConfidenceLevel::Unknown);
    }

    #[test]
    fn test_unmapped_mapping() {
        let mapping = ServiceMapping::unmapped("Mystery Service");
        assert_eq!(mapping.unified_category, ServiceCategory::Other);
        assert_eq!(mapping.confidence, ConfidenceLevel::Unknown);
        assert_eq!(mapping.provider_service_name, "Mystery Service");
    }

    #[test]
    fn test_custom_rule_deserialization_defaults() {
        let rule: CustomMappingRule = serde_json::from_value(serde_json::json!({
            "rule_id": "r-1",
            "client_id": "acme",
            "provider": "AWS",
            "service_pattern": "ml-",
            "rule_type": "contains",
            "target_category": "MACHINE_LEARNING",
            "created_at": "2024-01-01T00:00:00Z"
        }))
        .unwrap();

        assert!(rule.is_active);
        assert_eq!(rule.priority, 0);
        assert_eq!(rule.rule_type, RuleType::Contains);
    }
}
