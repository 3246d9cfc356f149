//! Optional AI-assisted anomaly detection
//!
//! The detector is an injected collaborator. Its raw JSON response is parsed
//! here; any shape violation is treated as "no AI result".

use crate::models::{Anomaly, AnomalyType, DetectionMethod, Severity};
use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{json, Value};

/// External analysis service.
///
/// Receives the current period, the historical baseline and statistical context,
/// and answers `{"anomalies_detected": [...]}`.
#[async_trait]
pub trait AiAnomalyDetector: Send + Sync {
    async fn analyze(&self, current: &Value, historical: &Value, context: &Value) -> anyhow::Result<Value>;
}

/// Stand-in when no AI service is configured
#[derive(Debug, Clone, Copy, Default)]
pub struct NoopAiDetector;

#[async_trait]
impl AiAnomalyDetector for NoopAiDetector {
    async fn analyze(&self, _current: &Value, _historical: &Value, _context: &Value) -> anyhow::Result<Value> {
        Ok(json!({ "anomalies_detected": [] }))
    }
}

#[derive(Debug, Deserialize)]
struct AiResponse {
    anomalies_detected: Vec<AiFinding>,
}

#[derive(Debug, Deserialize)]
struct AiFinding {
    #[serde(rename = "type")]
    kind: String,
    #[serde(default)]
    urgency: Option<String>,
    #[serde(default)]
    description: String,
    #[serde(default)]
    service: Option<String>,
    #[serde(default)]
    current_cost: Option<f64>,
    #[serde(default)]
    expected_cost: Option<f64>,
    #[serde(default)]
    confidence: Option<f64>,
    #[serde(default)]
    potential_causes: Vec<String>,
}

impl From<AiFinding> for Anomaly {
    fn from(finding: AiFinding) -> Self {
        let severity = finding
            .urgency
            .as_deref()
            .map(Severity::parse_lenient)
            .unwrap_or(Severity::Medium);
        let cost_impact = match (finding.current_cost, finding.expected_cost) {
            (Some(current), Some(expected)) => current - expected,
            _ => 0.0,
        };
        let description = if finding.description.is_empty() {
            format!("AI detected {}", finding.kind)
        } else {
            finding.description
        };

        let mut anomaly = Anomaly::new(
            AnomalyType::parse_lenient(&finding.kind),
            severity,
            description,
            DetectionMethod::AiAnalysis,
        )
        .with_services(finding.service)
        .with_cost_impact(cost_impact)
        .with_confidence(finding.confidence.unwrap_or(0.5))
        .with_actions(
            finding
                .potential_causes
                .iter()
                .map(|cause| format!("Investigate possible cause: {}", cause)),
        );

        if !finding.potential_causes.is_empty() {
            anomaly = anomaly.with_metadata("potential_causes", json!(finding.potential_causes));
        }
        anomaly
    }
}

/// Parse a collaborator response, `None` when it does not match the expected shape
pub fn parse_ai_response(response: Value) -> Option<Vec<Anomaly>> {
    let parsed: AiResponse = serde_json::from_value(response).ok()?;
    Some(parsed.anomalies_detected.into_iter().map(Anomaly::from).collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_ai_response() {
        let response = json!({
            "anomalies_detected": [{
                "type": "cost_spike",
                "urgency": "high",
                "description": "EC2 usage jumped",
                "service": "EC2",
                "current_cost": 300.0,
                "expected_cost": 100.0,
                "confidence": 0.8,
                "potential_causes": ["autoscaling"]
            }]
        });

        let anomalies = parse_ai_response(response).unwrap();
        assert_eq!(anomalies.len(), 1);
        let anomaly = &anomalies[0];
        assert_eq!(anomaly.anomaly_type, AnomalyType::CostSpike);
        assert_eq!(anomaly.severity, Severity::High);
        assert_eq!(anomaly.detection_method, DetectionMethod::AiAnalysis);
        assert_eq!(anomaly.affected_services, vec!["EC2".to_string()]);
        assert!((anomaly.cost_impact - 200.0).abs() < 1e-9);
        assert_eq!(anomaly.recommended_actions.len(), 1);
    }

    #[test]
    fn test_minimal_finding_defaults() {
        let anomalies = parse_ai_response(json!({"anomalies_detected": [{"type": "weird"}]})).unwrap();
        assert_eq!(anomalies[0].anomaly_type, AnomalyType::UnusualPattern);
        assert_eq!(anomalies[0].severity, Severity::Medium);
        assert_eq!(anomalies[0].confidence_score, 0.5);
        assert!(anomalies[0].affected_services.is_empty());
    }

    #[test]
    fn test_malformed_response_is_rejected() {
        assert!(parse_ai_response(json!({"unexpected": true})).is_none());
        assert!(parse_ai_response(json!({"anomalies_detected": [{"urgency": "low"}]})).is_none());
        assert!(parse_ai_response(json!("text")).is_none());
    }

    #[tokio::test]
    async fn test_noop_detector_reports_nothing() {
        let response = NoopAiDetector
            .analyze(&json!({}), &json!({}), &json!({}))
            .await
            .unwrap();
        assert_eq!(parse_ai_response(response).unwrap().len(), 0);
    }
}
