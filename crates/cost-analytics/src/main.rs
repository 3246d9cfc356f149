use anyhow::Context;
use chrono::Duration;
use clap::Parser;
use cost_analytics::{
    anomaly::summarize_anomalies,
    models::{ProviderCostPayload, UnifiedCostRecord},
    AnalyticsConfig, AnomalyDetectionEngine, BudgetInfo, CostForecaster, CostNormalizer,
    CurrencyConverter, ServiceCategoryMapper, TrendAnalyzer,
};
use serde_json::json;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// Days at the end of the history treated as the current period
const CURRENT_PERIOD_DAYS: i64 = 7;

#[derive(Debug, Parser)]
#[command(name = "cost-analytics", about = "Normalize cloud cost payloads and report anomalies and trends")]
struct Args {
    /// JSON file holding an array of provider cost payloads
    input: PathBuf,

    /// Client id applied to every payload
    #[arg(long, env = "ANALYTICS_CLIENT_ID")]
    client_id: Option<String>,

    /// Monthly budget for budget deviation checks
    #[arg(long)]
    monthly_budget: Option<f64>,

    /// Override the number of forecast days
    #[arg(long)]
    forecast_days: Option<usize>,

    /// Emit logs as JSON
    #[arg(long)]
    json_logs: bool,
}

fn init_tracing(json: bool) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    let builder = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr);

    if json {
        builder.json().init();
    } else {
        builder.init();
    }
}

/// Split records into (current, historical) around the last `CURRENT_PERIOD_DAYS` days
fn split_periods(records: &[UnifiedCostRecord]) -> (Vec<UnifiedCostRecord>, Vec<UnifiedCostRecord>) {
    let Some(latest) = records.iter().map(|r| r.date).max() else {
        return (Vec::new(), Vec::new());
    };
    let cutoff = latest - Duration::days(CURRENT_PERIOD_DAYS);
    records.iter().cloned().partition(|r| r.date > cutoff)
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    init_tracing(args.json_logs);

    let mut config = AnalyticsConfig::from_env().context("loading ANALYTICS_* configuration")?;
    if let Some(days) = args.forecast_days {
        config.trend.forecast_days = days;
    }

    let raw = std::fs::read_to_string(&args.input)
        .with_context(|| format!("reading {}", args.input.display()))?;
    let payloads: Vec<ProviderCostPayload> =
        serde_json::from_str(&raw).context("parsing provider cost payloads")?;
    info!("Loaded {} payloads from {}", payloads.len(), args.input.display());

    let converter = CurrencyConverter::from_config(&config.currency)?;
    let normalizer = CostNormalizer::new(
        config.normalizer.clone(),
        Arc::new(ServiceCategoryMapper::new()),
        Arc::new(converter),
    );

    let records = normalizer
        .batch_normalize(payloads, args.client_id.as_deref())
        .await;

    let trends = TrendAnalyzer::new(&config.trend).analyze_cost_trends(&records);
    let forecast = CostForecaster::new(config.trend.forecast_days).forecast(&records);

    let (current, historical) = split_periods(&records);
    let budget = args.monthly_budget.map(|monthly_budget| BudgetInfo { monthly_budget });
    let engine = AnomalyDetectionEngine::new(&config.anomaly);
    let anomalies = engine
        .detect_anomalies(&current, &historical, budget.as_ref())
        .await;

    let report = json!({
        "normalization": normalizer.get_normalization_statistics(),
        "records": records.len(),
        "trends": trends,
        "forecast": forecast,
        "anomaly_summary": summarize_anomalies(&anomalies),
        "anomalies": anomalies,
    });

    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(())
}
