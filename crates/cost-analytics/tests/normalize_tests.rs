use chrono::NaiveDate;
use cost_analytics::{
    models::{CloudProvider, ConfidenceLevel, CustomMappingRule, ProviderCostPayload, RuleType, ServiceCategory},
    normalize::assess_data_quality,
    CostNormalizer, CurrencyConverter, NormalizationError, ServiceCategoryMapper,
};
use rust_decimal_macros::dec;
use serde_json::json;
use std::collections::HashMap;

fn day(d: u32) -> NaiveDate {
    NaiveDate::from_ymd_opt(2024, 3, d).unwrap()
}

fn aws_payload() -> ProviderCostPayload {
    ProviderCostPayload::new(CloudProvider::Aws, day(1), dec!(300.00))
        .with_client_id("acme")
        .with_service("EC2", json!({"cost": 200.0, "usage_metrics": {"hours": 720.0}}))
        .with_service("S3", json!(100.0))
        .with_account(json!({"account_id": "123456789012", "cost": 300.0}))
        .with_region("us-east-1", json!({"cost": 300.0}))
}

#[tokio::test]
async fn test_normalized_total_matches_service_sum() {
    let normalizer = CostNormalizer::with_defaults();
    let record = normalizer.normalize_cost_data(&aws_payload(), None).await.unwrap();

    assert_eq!(record.total_cost, dec!(300.00));
    assert_eq!(record.total_cost, record.services_total());
    assert!(record.validate().is_empty());
    assert_eq!(record.client_id, "acme");
    assert_eq!(record.currency, "USD");
    assert_eq!(record.services.len(), 2);
    assert_eq!(record.services["EC2"].unified_category, ServiceCategory::Compute);
    assert_eq!(record.services["S3"].unified_category, ServiceCategory::Storage);
    assert_eq!(record.services["EC2"].usage_metrics["hours"], 720.0);
}

#[tokio::test]
async fn test_explicit_client_id_overrides_payload() {
    let normalizer = CostNormalizer::with_defaults();
    let record = normalizer
        .normalize_cost_data(&aws_payload(), Some("globex"))
        .await
        .unwrap();
    assert_eq!(record.client_id, "globex");
}

#[tokio::test]
async fn test_missing_client_id_is_rejected() {
    let normalizer = CostNormalizer::with_defaults();
    let payload = ProviderCostPayload::new(CloudProvider::Gcp, day(1), dec!(10));

    let err = normalizer.normalize_cost_data(&payload, None).await.unwrap_err();
    assert!(matches!(err, NormalizationError::InvalidPayload { .. }));

    let stats = normalizer.get_normalization_statistics();
    assert_eq!(stats.counters.total_records_processed, 1);
    assert_eq!(stats.counters.failed_normalizations, 1);
    assert_eq!(stats.success_rate, 0.0);
}

#[tokio::test]
async fn test_unknown_currency_fails_normalization() {
    let normalizer = CostNormalizer::with_defaults();
    let payload = ProviderCostPayload::new(CloudProvider::Azure, day(1), dec!(10))
        .with_client_id("acme")
        .with_currency("XYZ")
        .with_service("Virtual Machines", json!(10.0));

    let err = normalizer.normalize_cost_data(&payload, None).await.unwrap_err();
    assert!(err.is_currency_error());
}

#[tokio::test]
async fn test_malformed_entries_are_skipped() {
    let normalizer = CostNormalizer::with_defaults();
    let payload = ProviderCostPayload::new(CloudProvider::Aws, day(2), dec!(50))
        .with_client_id("acme")
        .with_service("EC2", json!(50.0))
        .with_service("Broken", json!({"note": "no cost here"}));

    let record = normalizer.normalize_cost_data(&payload, None).await.unwrap();
    assert_eq!(record.services.len(), 1);
    assert_eq!(record.total_cost, dec!(50));
    assert_eq!(record.collection_metadata.skipped_entries, vec!["service:Broken".to_string()]);
}

#[tokio::test]
async fn test_cost_variance_rejected_when_validating() {
    let normalizer = CostNormalizer::with_defaults();
    // services sum to 50 against a reported 100
    let payload = ProviderCostPayload::new(CloudProvider::Aws, day(3), dec!(100))
        .with_client_id("acme")
        .with_service("EC2", json!(50.0));

    let err = normalizer.normalize_cost_data(&payload, None).await.unwrap_err();
    assert!(matches!(err, NormalizationError::DataTransformation { .. }));
}

#[tokio::test]
async fn test_eur_payload_converted_to_usd() {
    let normalizer = CostNormalizer::with_defaults();
    let payload = ProviderCostPayload::new(CloudProvider::Gcp, day(4), dec!(85))
        .with_client_id("acme")
        .with_currency("EUR")
        .with_service("Compute Engine", json!(85.0));

    let record = normalizer.normalize_cost_data(&payload, None).await.unwrap();
    assert_eq!(record.currency, "USD");
    assert_eq!(record.total_cost, dec!(100.00));
    assert_eq!(record.collection_metadata.source_currency, "EUR");

    let stats = normalizer.get_normalization_statistics();
    assert!(stats.counters.currency_conversions >= 1);
}

#[tokio::test]
async fn test_batch_normalize_drops_failures_and_keeps_order() {
    let normalizer = CostNormalizer::with_defaults();
    let payloads = vec![
        aws_payload(),
        ProviderCostPayload::new(CloudProvider::Aws, day(2), dec!(1)),
        ProviderCostPayload::new(CloudProvider::Aws, day(3), dec!(40))
            .with_client_id("acme")
            .with_service("Lambda", json!(40.0)),
    ];

    let records = normalizer.batch_normalize(payloads, None).await;
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].date, day(1));
    assert_eq!(records[1].date, day(3));

    let stats = normalizer.get_normalization_statistics();
    assert_eq!(stats.counters.total_records_processed, 3);
    assert_eq!(stats.counters.successful_normalizations, 2);

    normalizer.reset_statistics();
    assert_eq!(normalizer.get_normalization_statistics().counters.total_records_processed, 0);
}

#[tokio::test]
async fn test_usd_identity_conversion() {
    let converter = CurrencyConverter::offline();
    let amount = dec!(123.456);
    assert_eq!(converter.convert_amount(amount, "USD", "USD").await.unwrap(), amount);
    assert_eq!(converter.get_exchange_rate("usd", "USD").await.unwrap(), dec!(1));
}

#[tokio::test]
async fn test_cross_rate_through_usd() {
    let converter = CurrencyConverter::offline();
    let rate = converter.get_exchange_rate("EUR", "GBP").await.unwrap();
    // 0.73 / 0.85
    assert!((rate - dec!(0.8588)).abs() < dec!(0.0001));
    assert!(converter.supported_currencies().contains(&"JPY".to_string()));
}

#[test]
fn test_mapper_is_idempotent() {
    let mapper = ServiceCategoryMapper::new();
    let first = mapper.map_service(CloudProvider::Aws, "Amazon EC2 Instances", None);
    let second = mapper.map_service(CloudProvider::Aws, "Amazon EC2 Instances", None);
    assert_eq!(first, second);
}

#[test]
fn test_unknown_service_maps_to_other() {
    let mapper = ServiceCategoryMapper::new();
    let mapping = mapper.map_service(CloudProvider::Gcp, "qqqq-zzzz", None);
    assert_eq!(mapping.unified_category, ServiceCategory::Other);
    assert_eq!(mapping.confidence, ConfidenceLevel::Unknown);
}

#[test]
fn test_custom_rule_takes_priority_for_its_client() {
    let mapper = ServiceCategoryMapper::new();
    let rule = CustomMappingRule::new(
        "acme",
        CloudProvider::Aws,
        "^EC2$",
        RuleType::Regex,
        ServiceCategory::MachineLearning,
        10,
    );
    let rule_id = mapper.add_custom_rule(rule);

    let mapped = mapper.map_service(CloudProvider::Aws, "EC2", Some("acme"));
    assert_eq!(mapped.unified_category, ServiceCategory::MachineLearning);
    assert!(mapped.tags.contains(&rule_id));

    let other_client = mapper.map_service(CloudProvider::Aws, "EC2", Some("globex"));
    assert_eq!(other_client.unified_category, ServiceCategory::Compute);

    assert!(mapper.remove_custom_rule("acme", &rule_id));
    assert!(mapper.get_custom_rules("acme").is_empty());
}

#[test]
fn test_mapping_export_import() {
    let source = ServiceCategoryMapper::new();
    source.add_custom_rule(CustomMappingRule::new(
        "acme",
        CloudProvider::Azure,
        "batch",
        RuleType::Contains,
        ServiceCategory::Compute,
        1,
    ));
    let json = source.export_mappings_json().unwrap();

    let target = ServiceCategoryMapper::new();
    let summary = target.import_mappings_json(&json).unwrap();
    assert_eq!(summary.custom_rules_imported, 1);
    assert!(summary.base_mappings_imported > 0);
    assert_eq!(target.get_custom_rules("acme").len(), 1);
}

#[test]
fn test_quality_penalizes_missing_breakdown() {
    let quality = assess_data_quality(dec!(100), &HashMap::new(), 0, 1.0);
    assert!(quality.completeness < 1.0);
    assert!(quality.overall_score() < 1.0);
}
