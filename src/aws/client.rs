//! AWS Client
//!
//! Per-region provider handle combining the HTTP transport with endpoint
//! resolution. Implements the monitoring, tagging and auxiliary API traits.

use super::api::{AuxiliaryApi, MonitoringApi, TaggingApi};
use super::http::AwsHttpClient;
use super::pagination::Page;
use super::types::{
    GetMetricDataInput, GetMetricDataOutput, GetMetricStatisticsInput, GetMetricStatisticsOutput,
    GetResourcesInput, GetResourcesOutput, ListMetricsInput, ListMetricsOutput,
    ResourceTagMapping, WireMetric, WireMetricDataResult,
};
use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::Serialize;
use serde_json::Value;
use url::Url;

/// How to reach one JSON-protocol service
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ServiceProtocol {
    /// Hostname prefix, e.g. `monitoring` in `monitoring.us-east-1.amazonaws.com`
    pub endpoint_prefix: &'static str,
    /// `X-Amz-Target` prefix
    pub target_prefix: &'static str,
    pub json_version: &'static str,
    /// Region the service is pinned to, for global services
    pub global_region: Option<&'static str>,
}

pub const MONITORING: ServiceProtocol = ServiceProtocol {
    endpoint_prefix: "monitoring",
    target_prefix: "GraniteServiceVersion20100801",
    json_version: "1.0",
    global_region: None,
};

pub const TAGGING: ServiceProtocol = ServiceProtocol {
    endpoint_prefix: "tagging",
    target_prefix: "ResourceGroupsTaggingAPI_20170126",
    json_version: "1.1",
    global_region: None,
};

/// Resolve an auxiliary service name to its protocol
pub fn auxiliary_protocol(service: &str) -> Option<ServiceProtocol> {
    match service {
        "dms" => Some(ServiceProtocol {
            endpoint_prefix: "dms",
            target_prefix: "AmazonDMSv20160101",
            json_version: "1.1",
            global_region: None,
        }),
        "storagegateway" => Some(ServiceProtocol {
            endpoint_prefix: "storagegateway",
            target_prefix: "StorageGateway_20130630",
            json_version: "1.1",
            global_region: None,
        }),
        "shield" => Some(ServiceProtocol {
            endpoint_prefix: "shield",
            target_prefix: "AWSShield_20160616",
            json_version: "1.1",
            global_region: Some("us-east-1"),
        }),
        // The services below are not JSON-protocol on AWS itself; they are
        // reached through `endpoint_url` gateways that accept this framing
        "autoscaling" => Some(ServiceProtocol {
            endpoint_prefix: "autoscaling",
            target_prefix: "AutoScaling_2011_01_01",
            json_version: "1.1",
            global_region: None,
        }),
        "ec2" => Some(ServiceProtocol {
            endpoint_prefix: "ec2",
            target_prefix: "AmazonEC2",
            json_version: "1.1",
            global_region: None,
        }),
        "apigateway" => Some(ServiceProtocol {
            endpoint_prefix: "apigateway",
            target_prefix: "BackplaneControlService",
            json_version: "1.1",
            global_region: None,
        }),
        "apigatewayv2" => Some(ServiceProtocol {
            endpoint_prefix: "apigateway",
            target_prefix: "ApiGatewayV2",
            json_version: "1.1",
            global_region: None,
        }),
        "aps" => Some(ServiceProtocol {
            endpoint_prefix: "aps",
            target_prefix: "AmazonPrometheusService",
            json_version: "1.1",
            global_region: None,
        }),
        _ => None,
    }
}

/// Main AWS client, one per region
#[derive(Clone)]
pub struct AwsClient {
    pub http: AwsHttpClient,
    pub region: String,
    endpoint_override: Option<Url>,
}

impl AwsClient {
    /// Create a client for `region`. With `endpoint_url` set, every service is
    /// routed to that base URL instead of the regional AWS endpoint.
    pub fn new(region: &str, endpoint_url: Option<&str>) -> Result<Self> {
        let endpoint_override = endpoint_url
            .map(|raw| Url::parse(raw).with_context(|| format!("Invalid endpoint URL: {}", raw)))
            .transpose()?;

        Ok(Self {
            http: AwsHttpClient::new()?,
            region: region.to_string(),
            endpoint_override,
        })
    }

    /// Build the endpoint URL for a service
    pub fn service_url(&self, protocol: &ServiceProtocol) -> String {
        if let Some(base) = &self.endpoint_override {
            return base.to_string();
        }
        let region = protocol.global_region.unwrap_or(self.region.as_str());
        format!("https://{}.{}.amazonaws.com/", protocol.endpoint_prefix, region)
    }

    /// Invoke `action` on a service with a JSON body
    pub async fn call(&self, protocol: &ServiceProtocol, action: &str, body: &Value) -> Result<Value> {
        let url = self.service_url(protocol);
        let target = format!("{}.{}", protocol.target_prefix, action);
        self.http
            .call(&url, protocol.json_version, &target, body)
            .await
            .with_context(|| format!("{} failed", action))
    }

    /// Serialize `input`, attach the continuation token under `token_field`
    /// and invoke `action`
    async fn call_paged<I: Serialize>(
        &self,
        protocol: &ServiceProtocol,
        action: &str,
        input: &I,
        token_field: &str,
        token: Option<&str>,
    ) -> Result<Value> {
        let mut body = serde_json::to_value(input).context("Failed to serialize request")?;
        if let (Some(token), Value::Object(map)) = (token, &mut body) {
            map.insert(token_field.to_string(), Value::String(token.to_string()));
        }
        self.call(protocol, action, &body).await
    }
}

#[async_trait]
impl MonitoringApi for AwsClient {
    async fn list_metrics(
        &self,
        input: &ListMetricsInput,
        next_token: Option<&str>,
    ) -> Result<Page<WireMetric>> {
        let response = self
            .call_paged(&MONITORING, "ListMetrics", input, "NextToken", next_token)
            .await?;
        let output: ListMetricsOutput =
            serde_json::from_value(response).context("Failed to parse ListMetrics response")?;
        Ok(Page::new(output.metrics, output.next_token))
    }

    async fn get_metric_data(
        &self,
        input: &GetMetricDataInput,
        next_token: Option<&str>,
    ) -> Result<Page<WireMetricDataResult>> {
        let response = self
            .call_paged(&MONITORING, "GetMetricData", input, "NextToken", next_token)
            .await?;
        let output: GetMetricDataOutput =
            serde_json::from_value(response).context("Failed to parse GetMetricData response")?;
        Ok(Page::new(output.metric_data_results, output.next_token))
    }

    async fn get_metric_statistics(
        &self,
        input: &GetMetricStatisticsInput,
    ) -> Result<GetMetricStatisticsOutput> {
        let body = serde_json::to_value(input).context("Failed to serialize request")?;
        let response = self.call(&MONITORING, "GetMetricStatistics", &body).await?;
        serde_json::from_value(response).context("Failed to parse GetMetricStatistics response")
    }
}

#[async_trait]
impl TaggingApi for AwsClient {
    async fn get_resources(
        &self,
        input: &GetResourcesInput,
        pagination_token: Option<&str>,
    ) -> Result<Page<ResourceTagMapping>> {
        let response = self
            .call_paged(&TAGGING, "GetResources", input, "PaginationToken", pagination_token)
            .await?;
        let output: GetResourcesOutput =
            serde_json::from_value(response).context("Failed to parse GetResources response")?;
        Ok(Page::new(output.resource_tag_mapping_list, output.pagination_token))
    }
}

#[async_trait]
impl AuxiliaryApi for AwsClient {
    async fn invoke(&self, service: &str, action: &str, params: &Value) -> Result<Value> {
        tracing::debug!("invoke: service={}, action={}", service, action);

        let Some(protocol) = auxiliary_protocol(service) else {
            return Err(anyhow::anyhow!("Unknown service: {}", service));
        };
        self.call(&protocol, action, params).await
    }
}
