//! Call and error counter accounting
//!
//! Kept in its own test binary: the counters are process-wide, so exact
//! before/after comparisons need a process no other test shares.

use serde_json::json;
use std::sync::Arc;
use tagwatch::aws::client::AwsClient;
use tagwatch::clients::{MetricClient, ResourceDiscovery, TaggingClient};
use tagwatch::model::{Job, MetricConfig};
use tagwatch::telemetry;
use wiremock::matchers::{body_partial_json, header, method};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn calls(operation: &str) -> u64 {
    telemetry::metrics()
        .api_calls
        .with_label_values(&[operation])
        .get()
}

fn errors(operation: &str) -> u64 {
    telemetry::metrics()
        .api_errors
        .with_label_values(&[operation])
        .get()
}

/// Delivered pages count as calls; failed ones only as errors
#[tokio::test]
async fn test_calls_count_delivered_pages_only() {
    let server = MockServer::start().await;

    // Tagging: one good page, then a throttled second page
    Mock::given(method("POST"))
        .and(header("X-Amz-Target", "ResourceGroupsTaggingAPI_20170126.GetResources"))
        .and(body_partial_json(json!({ "PaginationToken": "p1" })))
        .respond_with(ResponseTemplate::new(400).set_body_json(json!({
            "__type": "ThrottlingException"
        })))
        .with_priority(1)
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(header("X-Amz-Target", "ResourceGroupsTaggingAPI_20170126.GetResources"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "ResourceTagMappingList": [
                { "ResourceARN": "arn:aws:ec2:eu-west-1:1:instance/i-1", "Tags": [] }
            ],
            "PaginationToken": "p1"
        })))
        .mount(&server)
        .await;

    // Every monitoring call fails
    Mock::given(method("POST"))
        .and(header("X-Amz-Target", "GraniteServiceVersion20100801.ListMetrics"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(header("X-Amz-Target", "GraniteServiceVersion20100801.GetMetricData"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    Mock::given(method("POST"))
        .and(header("X-Amz-Target", "GraniteServiceVersion20100801.GetMetricStatistics"))
        .respond_with(ResponseTemplate::new(500))
        .mount(&server)
        .await;

    let aws = Arc::new(AwsClient::new("eu-west-1", Some(&server.uri())).expect("valid endpoint"));
    let tagging = TaggingClient::new(aws.clone(), aws.clone());
    let metrics = MetricClient::new(aws);

    let ops = ["GetResources", "ListMetrics", "GetMetricData", "GetMetricStatistics"];
    let calls_before: Vec<u64> = ops.iter().map(|op| calls(op)).collect();
    let errors_before: Vec<u64> = ops.iter().map(|op| errors(op)).collect();

    assert!(tagging
        .get_resources(&Job::new("AWS/EC2", vec![]), "eu-west-1")
        .await
        .is_err());

    let metric = MetricConfig::new("CPUUtilization", &["Average"]);
    assert!(metrics
        .list_metrics("AWS/EC2", &metric, false, |_, _| {})
        .await
        .is_err());
    let (start, end) = metric.window(chrono::Utc::now()).expect("default window");
    assert!(metrics.get_metric_data(&[], "AWS/EC2", start, end).await.is_empty());
    assert!(metrics
        .get_metric_statistics(&[], "AWS/EC2", &metric)
        .await
        .is_empty());

    let calls_after: Vec<u64> = ops.iter().map(|op| calls(op)).collect();
    let errors_after: Vec<u64> = ops.iter().map(|op| errors(op)).collect();

    // GetResources: one delivered page, one failed
    assert_eq!(calls_after[0] - calls_before[0], 1);
    assert_eq!(errors_after[0] - errors_before[0], 1);

    for i in 1..ops.len() {
        assert_eq!(calls_after[i], calls_before[i], "{} counted a failed call", ops[i]);
        assert_eq!(errors_after[i] - errors_before[i], 1, "{} error not counted", ops[i]);
    }
}
