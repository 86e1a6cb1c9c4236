//! Provider API contracts
//!
//! The clients only talk to the cloud through these traits. [`AwsClient`]
//! implements them over HTTP; tests substitute in-memory fakes.
//!
//! [`AwsClient`]: super::client::AwsClient

use super::pagination::Page;
use super::types::{
    GetMetricDataInput, GetMetricStatisticsInput, GetMetricStatisticsOutput, GetResourcesInput,
    ListMetricsInput, ResourceTagMapping, WireMetric, WireMetricDataResult,
};
use anyhow::Result;
use async_trait::async_trait;
use serde_json::Value;

/// Monitoring API: metric descriptors, batched data queries, statistics
#[async_trait]
pub trait MonitoringApi: Send + Sync {
    /// One page of metric descriptors
    async fn list_metrics(
        &self,
        input: &ListMetricsInput,
        next_token: Option<&str>,
    ) -> Result<Page<WireMetric>>;

    /// One page of results for a batched metric-data request
    async fn get_metric_data(
        &self,
        input: &GetMetricDataInput,
        next_token: Option<&str>,
    ) -> Result<Page<WireMetricDataResult>>;

    async fn get_metric_statistics(
        &self,
        input: &GetMetricStatisticsInput,
    ) -> Result<GetMetricStatisticsOutput>;
}

/// Resource tagging API
#[async_trait]
pub trait TaggingApi: Send + Sync {
    /// One page of resources matching the input's resource-type filters
    async fn get_resources(
        &self,
        input: &GetResourcesInput,
        pagination_token: Option<&str>,
    ) -> Result<Page<ResourceTagMapping>>;
}

/// Per-service APIs reachable only from extension hooks.
///
/// `service` is the short service name (`dms`, `storagegateway`, `shield`),
/// `action` the API action and `params` its JSON request body.
#[async_trait]
pub trait AuxiliaryApi: Send + Sync {
    async fn invoke(&self, service: &str, action: &str, params: &Value) -> Result<Value>;
}
