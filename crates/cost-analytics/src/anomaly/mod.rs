//! Cost anomaly detection

pub mod ai;
pub mod engine;
pub mod rules;
pub mod statistical;

pub use ai::{parse_ai_response, AiAnomalyDetector, NoopAiDetector};
pub use engine::{
    deduplicate_and_rank, summarize_anomalies, AnomalyDetectionEngine, AnomalySummary, BudgetInfo,
    TOTAL_SERIES,
};
pub use rules::{RuleBasedDetector, ServiceCosts};
pub use statistical::{OutlierDirection, StatisticalDetector, StatisticalOutlier};
