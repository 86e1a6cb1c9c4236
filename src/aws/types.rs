//! Wire shapes for the monitoring and tagging APIs
//!
//! Field names follow the AWS JSON protocol (PascalCase). Timestamps travel as
//! epoch seconds.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Epoch-seconds (de)serialization for chrono timestamps
pub mod epoch_seconds {
    use chrono::{DateTime, Utc};
    use serde::de::Error as _;
    use serde::{Deserialize, Deserializer, Serializer};

    pub fn from_secs(secs: f64) -> Option<DateTime<Utc>> {
        if !secs.is_finite() {
            return None;
        }
        DateTime::from_timestamp_millis((secs * 1000.0).round() as i64)
    }

    pub fn serialize<S: Serializer>(ts: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(ts.timestamp())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<DateTime<Utc>, D::Error> {
        let secs = f64::deserialize(deserializer)?;
        from_secs(secs).ok_or_else(|| D::Error::custom(format!("timestamp out of range: {}", secs)))
    }

    pub mod option {
        use super::from_secs;
        use chrono::{DateTime, Utc};
        use serde::de::Error as _;
        use serde::{Deserialize, Deserializer};

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Option<DateTime<Utc>>, D::Error> {
            match Option::<f64>::deserialize(deserializer)? {
                Some(secs) => from_secs(secs)
                    .map(Some)
                    .ok_or_else(|| D::Error::custom(format!("timestamp out of range: {}", secs))),
                None => Ok(None),
            }
        }
    }

    pub mod vec {
        use super::from_secs;
        use chrono::{DateTime, Utc};
        use serde::de::Error as _;
        use serde::{Deserialize, Deserializer};

        pub fn deserialize<'de, D: Deserializer<'de>>(
            deserializer: D,
        ) -> Result<Vec<DateTime<Utc>>, D::Error> {
            let raw = Option::<Vec<f64>>::deserialize(deserializer)?.unwrap_or_default();
            raw.into_iter()
                .map(|secs| {
                    from_secs(secs)
                        .ok_or_else(|| D::Error::custom(format!("timestamp out of range: {}", secs)))
                })
                .collect()
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireDimension {
    pub name: String,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireMetric {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub namespace: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metric_name: Option<String>,
    #[serde(default)]
    pub dimensions: Vec<WireDimension>,
}

// =============================================================================
// ListMetrics
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct ListMetricsInput {
    pub namespace: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metric_name: Option<String>,
    /// Only `PT3H` is accepted by the API
    #[serde(skip_serializing_if = "Option::is_none")]
    pub recently_active: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ListMetricsOutput {
    #[serde(default)]
    pub metrics: Vec<WireMetric>,
    #[serde(default)]
    pub next_token: Option<String>,
}

// =============================================================================
// GetMetricData
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct MetricStat {
    pub metric: WireMetric,
    pub period: i64,
    pub stat: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct MetricDataQuery {
    pub id: String,
    pub metric_stat: MetricStat,
    pub return_data: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetMetricDataInput {
    pub metric_data_queries: Vec<MetricDataQuery>,
    #[serde(with = "epoch_seconds")]
    pub start_time: DateTime<Utc>,
    #[serde(with = "epoch_seconds")]
    pub end_time: DateTime<Utc>,
    pub scan_by: String,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireMetricDataResult {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default, deserialize_with = "epoch_seconds::vec::deserialize")]
    pub timestamps: Vec<DateTime<Utc>>,
    #[serde(default)]
    pub values: Vec<f64>,
    #[serde(default)]
    pub status_code: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetMetricDataOutput {
    #[serde(default)]
    pub metric_data_results: Vec<WireMetricDataResult>,
    #[serde(default)]
    pub next_token: Option<String>,
}

// =============================================================================
// GetMetricStatistics
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetMetricStatisticsInput {
    pub namespace: String,
    pub metric_name: String,
    pub dimensions: Vec<WireDimension>,
    #[serde(with = "epoch_seconds")]
    pub start_time: DateTime<Utc>,
    #[serde(with = "epoch_seconds")]
    pub end_time: DateTime<Utc>,
    pub period: i64,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub statistics: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub extended_statistics: Vec<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireDatapoint {
    #[serde(default, deserialize_with = "epoch_seconds::option::deserialize")]
    pub timestamp: Option<DateTime<Utc>>,
    #[serde(default)]
    pub sample_count: Option<f64>,
    #[serde(default)]
    pub average: Option<f64>,
    #[serde(default)]
    pub sum: Option<f64>,
    #[serde(default)]
    pub minimum: Option<f64>,
    #[serde(default)]
    pub maximum: Option<f64>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub extended_statistics: Option<BTreeMap<String, f64>>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetMetricStatisticsOutput {
    #[serde(default)]
    pub label: Option<String>,
    #[serde(default)]
    pub datapoints: Vec<WireDatapoint>,
}

// =============================================================================
// Resource Groups Tagging API
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetResourcesInput {
    pub resource_type_filters: Vec<String>,
    pub resources_per_page: i32,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct WireTag {
    pub key: String,
    #[serde(default)]
    pub value: String,
}

#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ResourceTagMapping {
    #[serde(default, rename = "ResourceARN")]
    pub resource_arn: Option<String>,
    #[serde(default)]
    pub tags: Vec<WireTag>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct GetResourcesOutput {
    #[serde(default)]
    pub resource_tag_mapping_list: Vec<ResourceTagMapping>,
    #[serde(default)]
    pub pagination_token: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;
    use serde_json::json;

    #[test]
    fn test_metric_data_result_timestamps_parse_from_epoch() {
        let parsed: GetMetricDataOutput = serde_json::from_value(json!({
            "MetricDataResults": [{
                "Id": "q1",
                "Timestamps": [1714564800, 1714564500.5],
                "Values": [10.0, 9.0],
                "StatusCode": "Complete"
            }],
            "NextToken": "abc"
        }))
        .unwrap();

        let result = &parsed.metric_data_results[0];
        assert_eq!(result.id.as_deref(), Some("q1"));
        assert_eq!(
            result.timestamps[0],
            Utc.with_ymd_and_hms(2024, 5, 1, 12, 0, 0).unwrap()
        );
        assert_eq!(result.timestamps[1].timestamp_subsec_millis(), 500);
        assert_eq!(parsed.next_token.as_deref(), Some("abc"));
    }

    #[test]
    fn test_missing_lists_default_to_empty() {
        let parsed: GetResourcesOutput = serde_json::from_value(json!({})).unwrap();
        assert!(parsed.resource_tag_mapping_list.is_empty());
        assert!(parsed.pagination_token.is_none());
    }

    #[test]
    fn test_list_metrics_input_skips_unset_fields() {
        let input = ListMetricsInput {
            namespace: "AWS/EC2".to_string(),
            metric_name: None,
            recently_active: None,
        };
        assert_eq!(serde_json::to_value(&input).unwrap(), json!({"Namespace": "AWS/EC2"}));
    }

    #[test]
    fn test_resource_arn_field_name() {
        let mapping: ResourceTagMapping = serde_json::from_value(json!({
            "ResourceARN": "arn:aws:sqs:us-east-1:1:queue",
            "Tags": [{"Key": "env", "Value": "prod"}]
        }))
        .unwrap();
        assert_eq!(mapping.resource_arn.as_deref(), Some("arn:aws:sqs:us-east-1:1:queue"));
        assert_eq!(mapping.tags[0].key, "env");
    }
}
