//! Domain model
//!
//! Normalized objects produced by the clients and consumed by the collection
//! pipeline. Everything here is created fresh per collection cycle.

use chrono::{DateTime, TimeDelta, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Statistics CloudWatch accepts in the `Statistics` field; anything else is
/// treated as an extended statistic (percentiles, trimmed means, ...)
pub const STANDARD_STATISTICS: &[&str] = &["Average", "Maximum", "Minimum", "SampleCount", "Sum"];

/// Returns true if `stat` is one of the standard CloudWatch statistics
pub fn is_standard_statistic(stat: &str) -> bool {
    STANDARD_STATISTICS.contains(&stat)
}

/// A named qualifier narrowing a metric to a resource instance
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Dimension {
    pub name: String,
    pub value: String,
}

/// Metric descriptor returned by discovery
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Metric {
    pub metric_name: String,
    pub namespace: String,
    pub dimensions: Vec<Dimension>,
}

fn default_period() -> i64 {
    300
}

fn default_length() -> i64 {
    300
}

/// Per-metric settings from the job configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricConfig {
    pub name: String,
    pub statistics: Vec<String>,
    /// Aggregation period in seconds
    #[serde(default = "default_period")]
    pub period: i64,
    /// Lookback window in seconds
    #[serde(default = "default_length")]
    pub length: i64,
    /// Offset from now in seconds, for metrics that land late
    #[serde(default)]
    pub delay: i64,
}

impl MetricConfig {
    pub fn new(name: &str, statistics: &[&str]) -> Self {
        Self {
            name: name.to_string(),
            statistics: statistics.iter().map(|s| s.to_string()).collect(),
            period: default_period(),
            length: default_length(),
            delay: 0,
        }
    }

    /// Collection window `[start, end)` relative to `now`.
    ///
    /// `None` when `length` is not positive, `delay` is negative, or either
    /// pushes the window out of the representable time range.
    pub fn window(&self, now: DateTime<Utc>) -> Option<(DateTime<Utc>, DateTime<Utc>)> {
        if self.length <= 0 || self.delay < 0 {
            return None;
        }
        let end = now.checked_sub_signed(TimeDelta::try_seconds(self.delay)?)?;
        let start = end.checked_sub_signed(TimeDelta::try_seconds(self.length)?)?;
        Some((start, end))
    }
}

/// Processing parameters attached to a single GetMetricData query
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GetMetricDataProcessingParams {
    /// Caller-assigned id correlating the query with its result
    pub query_id: String,
    pub period: i64,
    pub statistic: String,
}

/// One metric-data request unit
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CloudwatchData {
    pub metric_name: String,
    pub dimensions: Vec<Dimension>,
    pub processing: GetMetricDataProcessingParams,
}

/// Result of one GetMetricData query.
///
/// `datapoint` and `timestamp` are both `None` when the provider returned no
/// value for the query.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MetricDataResult {
    pub id: String,
    pub datapoint: Option<f64>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl MetricDataResult {
    /// Placeholder for a query that produced no data
    pub fn empty(id: &str) -> Self {
        Self {
            id: id.to_string(),
            datapoint: None,
            timestamp: None,
        }
    }

    pub fn has_data(&self) -> bool {
        self.datapoint.is_some()
    }
}

/// Aggregates for one time bucket of a GetMetricStatistics response
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct Datapoint {
    pub average: Option<f64>,
    pub maximum: Option<f64>,
    pub minimum: Option<f64>,
    pub sample_count: Option<f64>,
    pub sum: Option<f64>,
    pub extended_statistics: BTreeMap<String, f64>,
    pub timestamp: Option<DateTime<Utc>>,
}

impl Datapoint {
    /// Look up a statistic by its CloudWatch name
    pub fn statistic(&self, name: &str) -> Option<f64> {
        match name {
            "Average" => self.average,
            "Maximum" => self.maximum,
            "Minimum" => self.minimum,
            "SampleCount" => self.sample_count,
            "Sum" => self.sum,
            other => self.extended_statistics.get(other).copied(),
        }
    }
}

/// Resource tag, also used as a search-tag requirement on jobs
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Tag {
    pub key: String,
    pub value: String,
}

impl Tag {
    pub fn new(key: &str, value: &str) -> Self {
        Self {
            key: key.to_string(),
            value: value.to_string(),
        }
    }
}

/// A discovered cloud resource. The ARN identifies it within (namespace, region).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TaggedResource {
    pub arn: String,
    pub namespace: String,
    pub region: String,
    pub tags: Vec<Tag>,
}

impl TaggedResource {
    /// Check the resource against a job's search tags.
    ///
    /// Every search tag must be present with the same value. An empty filter
    /// matches every resource.
    pub fn filter_through_tags(&self, search_tags: &[Tag]) -> bool {
        search_tags.iter().all(|wanted| {
            self.tags
                .iter()
                .any(|tag| tag.key == wanted.key && tag.value == wanted.value)
        })
    }

    /// Value of the first tag with the given key
    pub fn tag_value(&self, key: &str) -> Option<&str> {
        self.tags
            .iter()
            .find(|t| t.key == key)
            .map(|t| t.value.as_str())
    }
}

/// Discovery job: which service to enumerate and which tags a resource needs
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Job {
    /// Service namespace or alias, e.g. `AWS/EC2` or `ec2`
    #[serde(rename = "type")]
    pub job_type: String,
    #[serde(default)]
    pub search_tags: Vec<Tag>,
}

impl Job {
    pub fn new(job_type: &str, search_tags: Vec<Tag>) -> Self {
        Self {
            job_type: job_type.to_string(),
            search_tags,
        }
    }
}
