//! API call counters
//!
//! Counters live in a dedicated prometheus registry so the embedding exporter
//! can merge them into its own output.

use anyhow::{Context, Result};
use prometheus::{Encoder, IntCounter, IntCounterVec, Opts, Registry, TextEncoder};
use std::sync::OnceLock;

/// Counters incremented by the clients
pub struct ApiMetrics {
    pub registry: Registry,
    /// Provider calls, labelled by operation
    pub api_calls: IntCounterVec,
    /// Failed provider calls, labelled by operation
    pub api_errors: IntCounterVec,
    /// Individual metric queries submitted through GetMetricData
    pub get_metric_data_metrics: IntCounter,
    /// GetMetricData pages retrieved
    pub get_metric_data_requests: IntCounter,
    pub get_metric_statistics_requests: IntCounter,
    /// Tagging API pages retrieved
    pub resource_tagging_requests: IntCounter,
}

static METRICS: OnceLock<ApiMetrics> = OnceLock::new();

fn build() -> prometheus::Result<ApiMetrics> {
    let registry = Registry::new();

    let api_calls = IntCounterVec::new(
        Opts::new("api_calls_total", "Number of calls made to the provider APIs"),
        &["operation"],
    )?;
    let api_errors = IntCounterVec::new(
        Opts::new("api_errors_total", "Number of failed calls to the provider APIs"),
        &["operation"],
    )?;
    let get_metric_data_metrics = IntCounter::new(
        "get_metric_data_metrics_total",
        "Number of metrics requested through GetMetricData",
    )?;
    let get_metric_data_requests = IntCounter::new(
        "get_metric_data_requests_total",
        "Number of GetMetricData pages retrieved",
    )?;
    let get_metric_statistics_requests = IntCounter::new(
        "get_metric_statistics_requests_total",
        "Number of GetMetricStatistics calls made",
    )?;
    let resource_tagging_requests = IntCounter::new(
        "resource_tagging_requests_total",
        "Number of resource tagging API pages retrieved",
    )?;

    registry.register(Box::new(api_calls.clone()))?;
    registry.register(Box::new(api_errors.clone()))?;
    registry.register(Box::new(get_metric_data_metrics.clone()))?;
    registry.register(Box::new(get_metric_data_requests.clone()))?;
    registry.register(Box::new(get_metric_statistics_requests.clone()))?;
    registry.register(Box::new(resource_tagging_requests.clone()))?;

    Ok(ApiMetrics {
        registry,
        api_calls,
        api_errors,
        get_metric_data_metrics,
        get_metric_data_requests,
        get_metric_statistics_requests,
        resource_tagging_requests,
    })
}

/// Get the process-wide counters (registered on first access)
pub fn metrics() -> &'static ApiMetrics {
    METRICS.get_or_init(|| {
        build().unwrap_or_else(|e| panic!("Failed to register API counters: {}", e))
    })
}

/// Count one provider call for `operation`
pub fn record_call(operation: &str) {
    metrics().api_calls.with_label_values(&[operation]).inc();
}

/// Count one failed provider call for `operation`
pub fn record_error(operation: &str) {
    metrics().api_errors.with_label_values(&[operation]).inc();
}

/// Render all counters in the Prometheus text exposition format
pub fn render() -> Result<String> {
    let families = metrics().registry.gather();
    let mut buffer = Vec::new();
    TextEncoder::new()
        .encode(&families, &mut buffer)
        .context("Failed to encode metrics")?;
    String::from_utf8(buffer).context("Metrics output is not UTF-8")
}
