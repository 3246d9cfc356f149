pub mod anomaly;
pub mod cost_record;
pub mod mapping;
pub mod payload;
pub mod provider;
pub mod trend;

pub use anomaly::{Anomaly, AnomalyType, DetectionMethod, Severity};
pub use cost_record::{
    AccountCost, CollectionMetadata, DataQuality, RegionCost, ServiceCost, UnifiedCostRecord,
    COST_TOLERANCE,
};
pub use mapping::{ConfidenceLevel, CustomMappingRule, RuleType, ServiceMapping};
pub use payload::{DateRange, ProviderCostPayload, RawCollectionMetadata};
pub use provider::{CloudProvider, ServiceCategory};
pub use trend::{
    ConfidenceInterval, CostForecast, CostTrendAnalysis, ForecastPoint, GrowthRates,
    PatternStrength, SeasonalDecomposition, SeasonalPattern, SeasonalityAnalysis,
    TrendChangePoint, TrendDirection, TrendMetrics, TrendSignificance,
};
