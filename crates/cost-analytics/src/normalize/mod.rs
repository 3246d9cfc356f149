//! Normalization of provider cost payloads into unified cost records

pub mod currency;
mod mapping_tables;
pub mod normalizer;
pub mod quality;
pub mod service_mapper;

pub use currency::{CurrencyConverter, HttpRateProvider, OfflineRateProvider, RateProvider};
pub use normalizer::{CostNormalizer, NormalizationStatistics, StatisticsSnapshot};
pub use quality::assess_data_quality;
pub use service_mapper::{similarity, ImportSummary, MappingExport, ServiceCategoryMapper};
