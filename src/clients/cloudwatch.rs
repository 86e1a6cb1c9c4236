//! Metric Client
//!
//! Discovers metric descriptors and retrieves metric values. Retrieval calls
//! degrade to empty results on provider failure so that one failing namespace
//! does not abort a collection cycle; the error counters are the only signal.

use crate::aws::api::MonitoringApi;
use crate::aws::pagination::Paginator;
use crate::aws::types::{
    GetMetricDataInput, GetMetricStatisticsInput, ListMetricsInput, MetricDataQuery, MetricStat,
    WireDatapoint, WireDimension, WireMetric, WireMetricDataResult,
};
use crate::error::DegradedError;
use crate::model::{
    is_standard_statistic, CloudwatchData, Datapoint, Dimension, Metric, MetricConfig,
    MetricDataResult,
};
use crate::telemetry;
use anyhow::Result;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;

/// Lookback accepted by ListMetrics for recently active metrics
pub const RECENTLY_ACTIVE_WINDOW: &str = "PT3H";

const SCAN_BY_TIMESTAMP_DESCENDING: &str = "TimestampDescending";

/// Metric client for one region
#[derive(Clone)]
pub struct MetricClient {
    api: Arc<dyn MonitoringApi>,
}

impl MetricClient {
    pub fn new(api: Arc<dyn MonitoringApi>) -> Self {
        Self { api }
    }

    /// Page through metric descriptors for `namespace` and `metric.name`.
    ///
    /// `on_page` is invoked once per page, in order, with the decoded metrics
    /// and whether this was the last page. A provider error stops paging and
    /// is returned.
    pub async fn list_metrics<F>(
        &self,
        namespace: &str,
        metric: &MetricConfig,
        recently_active_only: bool,
        mut on_page: F,
    ) -> Result<()>
    where
        F: FnMut(Vec<Metric>, bool) + Send,
    {
        let input = ListMetricsInput {
            namespace: namespace.to_string(),
            metric_name: Some(metric.name.clone()),
            recently_active: recently_active_only.then(|| RECENTLY_ACTIVE_WINDOW.to_string()),
        };
        tracing::debug!(?input, "ListMetrics");

        let api = self.api.as_ref();
        let input = &input;
        let mut pages = Paginator::new(move |token: Option<String>| async move {
            api.list_metrics(input, token.as_deref()).await
        });

        while let Some(page) = pages.next_page().await {
            let page = match page {
                Ok(page) => {
                    telemetry::record_call("ListMetrics");
                    page
                }
                Err(err) => {
                    telemetry::record_error("ListMetrics");
                    tracing::error!("ListMetrics error: {:#}", err);
                    return Err(err);
                }
            };

            let last_page = page.is_last();
            let metrics = to_model_metrics(page.items);
            tracing::debug!(output = ?metrics, last_page, "ListMetrics");
            on_page(metrics, last_page);
        }

        Ok(())
    }

    /// Submit one batched request for `queries` over `[start, end)`.
    ///
    /// Returns exactly one result per query, in request order. Queries the
    /// provider returned nothing for get a placeholder without value or
    /// timestamp. On provider failure the result is empty.
    pub async fn get_metric_data(
        &self,
        queries: &[CloudwatchData],
        namespace: &str,
        start: DateTime<Utc>,
        end: DateTime<Utc>,
    ) -> Vec<MetricDataResult> {
        let input = GetMetricDataInput {
            metric_data_queries: queries
                .iter()
                .map(|data| to_metric_data_query(data, namespace))
                .collect(),
            start_time: start,
            end_time: end,
            scan_by: SCAN_BY_TIMESTAMP_DESCENDING.to_string(),
        };
        telemetry::metrics()
            .get_metric_data_metrics
            .inc_by(input.metric_data_queries.len() as u64);
        tracing::debug!(?input, "GetMetricData");

        let api = self.api.as_ref();
        let input = &input;
        let mut pages = Paginator::new(move |token: Option<String>| async move {
            api.get_metric_data(input, token.as_deref()).await
        });

        let mut raw_results = Vec::new();
        while let Some(page) = pages.next_page().await {
            telemetry::metrics().get_metric_data_requests.inc();
            match page {
                Ok(page) => {
                    telemetry::record_call("GetMetricData");
                    raw_results.extend(page.items);
                }
                Err(source) => {
                    telemetry::record_error("GetMetricData");
                    let err = DegradedError::MetricData {
                        namespace: namespace.to_string(),
                        source,
                    };
                    tracing::error!("{}", err);
                    return Vec::new();
                }
            }
        }

        tracing::debug!(output = ?raw_results, "GetMetricData");
        to_metric_data_results(queries, raw_results)
    }

    /// Fetch statistics for a single metric, one datapoint per period bucket,
    /// sorted by timestamp. On provider failure, or when the metric's
    /// length/delay do not yield a usable window, the result is empty.
    pub async fn get_metric_statistics(
        &self,
        dimensions: &[Dimension],
        namespace: &str,
        metric: &MetricConfig,
    ) -> Vec<Datapoint> {
        let degraded = |source: anyhow::Error| -> Vec<Datapoint> {
            telemetry::record_error("GetMetricStatistics");
            let err = DegradedError::Statistics {
                namespace: namespace.to_string(),
                metric: metric.name.clone(),
                source,
            };
            tracing::error!("{}", err);
            Vec::new()
        };

        let Some(input) = get_metric_statistics_input(dimensions, namespace, metric, Utc::now()) else {
            return degraded(anyhow::anyhow!(
                "no usable time window for length={}s delay={}s",
                metric.length,
                metric.delay
            ));
        };
        tracing::debug!(?input, "GetMetricStatistics");

        let response = self.api.get_metric_statistics(&input).await;
        telemetry::metrics().get_metric_statistics_requests.inc();

        match response {
            Ok(output) => {
                telemetry::record_call("GetMetricStatistics");
                tracing::debug!(output = ?output.datapoints, "GetMetricStatistics");
                to_model_datapoints(output.datapoints)
            }
            Err(source) => degraded(source),
        }
    }
}

fn to_model_metrics(page: Vec<WireMetric>) -> Vec<Metric> {
    page.into_iter()
        .map(|m| Metric {
            metric_name: m.metric_name.unwrap_or_default(),
            namespace: m.namespace.unwrap_or_default(),
            dimensions: m
                .dimensions
                .into_iter()
                .map(|d| Dimension {
                    name: d.name,
                    value: d.value,
                })
                .collect(),
        })
        .collect()
}

fn to_wire_dimensions(dimensions: &[Dimension]) -> Vec<WireDimension> {
    dimensions
        .iter()
        .map(|d| WireDimension {
            name: d.name.clone(),
            value: d.value.clone(),
        })
        .collect()
}

fn to_metric_data_query(data: &CloudwatchData, namespace: &str) -> MetricDataQuery {
    MetricDataQuery {
        id: data.processing.query_id.clone(),
        metric_stat: MetricStat {
            metric: WireMetric {
                namespace: Some(namespace.to_string()),
                metric_name: Some(data.metric_name.clone()),
                dimensions: to_wire_dimensions(&data.dimensions),
            },
            period: data.processing.period,
            stat: data.processing.statistic.clone(),
        },
        return_data: true,
    }
}

/// Merge results per query id and keep the most recent value of each.
///
/// A query's values can be split across pages, and nothing guarantees the
/// provider ordered them, so the latest timestamp is picked explicitly.
fn to_metric_data_results(
    queries: &[CloudwatchData],
    raw_results: Vec<WireMetricDataResult>,
) -> Vec<MetricDataResult> {
    let mut latest: HashMap<String, (f64, DateTime<Utc>)> = HashMap::new();

    for raw in raw_results {
        let Some(id) = raw.id else { continue };
        if raw.values.len() != raw.timestamps.len() {
            tracing::warn!(
                id = %id,
                values = raw.values.len(),
                timestamps = raw.timestamps.len(),
                "GetMetricData returned mismatched values and timestamps"
            );
        }
        let newest = raw
            .values
            .into_iter()
            .zip(raw.timestamps)
            .max_by_key(|(_, ts)| *ts);
        if let Some((value, ts)) = newest {
            latest
                .entry(id)
                .and_modify(|current| {
                    if ts > current.1 {
                        *current = (value, ts);
                    }
                })
                .or_insert((value, ts));
        }
    }

    queries
        .iter()
        .map(|query| {
            let id = &query.processing.query_id;
            match latest.get(id) {
                Some((value, ts)) => MetricDataResult {
                    id: id.clone(),
                    datapoint: Some(*value),
                    timestamp: Some(*ts),
                },
                None => MetricDataResult::empty(id),
            }
        })
        .collect()
}

/// Build the statistics request; standard statistics and extended
/// statistics (percentiles etc.) go into separate fields
fn get_metric_statistics_input(
    dimensions: &[Dimension],
    namespace: &str,
    metric: &MetricConfig,
    now: DateTime<Utc>,
) -> Option<GetMetricStatisticsInput> {
    let (start_time, end_time) = metric.window(now)?;
    let (statistics, extended_statistics): (Vec<String>, Vec<String>) = metric
        .statistics
        .iter()
        .cloned()
        .partition(|s| is_standard_statistic(s));

    Some(GetMetricStatisticsInput {
        namespace: namespace.to_string(),
        metric_name: metric.name.clone(),
        dimensions: to_wire_dimensions(dimensions),
        start_time,
        end_time,
        period: metric.period,
        statistics,
        extended_statistics,
    })
}

fn to_model_datapoints(datapoints: Vec<WireDatapoint>) -> Vec<Datapoint> {
    let mut output: Vec<Datapoint> = datapoints
        .into_iter()
        .map(|dp| Datapoint {
            average: dp.average,
            maximum: dp.maximum,
            minimum: dp.minimum,
            sample_count: dp.sample_count,
            sum: dp.sum,
            extended_statistics: dp.extended_statistics.unwrap_or_default(),
            timestamp: dp.timestamp,
        })
        .collect();
    output.sort_by_key(|dp| dp.timestamp);
    output
}
