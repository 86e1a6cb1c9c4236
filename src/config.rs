//! Configuration Management
//!
//! Loads and validates the YAML job file driving a collection cycle.

use crate::model::{Job, MetricConfig, Tag};
use crate::services;
use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// CloudWatch retention (15 months); windows reaching further back return nothing
pub const MAX_LOOKBACK_SECONDS: i64 = 455 * 24 * 60 * 60;

fn default_tagging_api_concurrency() -> usize {
    5
}

fn default_metrics_per_query() -> usize {
    500
}

/// Top-level configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub jobs: Vec<JobConfig>,
    /// Send every request to this URL instead of the regional endpoints
    #[serde(default)]
    pub endpoint_url: Option<String>,
    /// Max tagging calls in flight per region
    #[serde(default = "default_tagging_api_concurrency")]
    pub tagging_api_concurrency: usize,
    /// Queries per GetMetricData request
    #[serde(default = "default_metrics_per_query")]
    pub metrics_per_query: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            jobs: Vec::new(),
            endpoint_url: None,
            tagging_api_concurrency: default_tagging_api_concurrency(),
            metrics_per_query: default_metrics_per_query(),
        }
    }
}

/// One discovery job
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    /// Service namespace or alias
    #[serde(rename = "type")]
    pub job_type: String,
    pub regions: Vec<String>,
    #[serde(default)]
    pub search_tags: Vec<Tag>,
    #[serde(default)]
    pub metrics: Vec<MetricConfig>,
    #[serde(default)]
    pub recently_active_only: bool,
    #[serde(default)]
    pub use_get_metric_statistics: bool,
}

impl JobConfig {
    /// Job as seen by the tagging client; aliases resolve to the namespace
    pub fn to_job(&self) -> Job {
        let namespace = services::get_service(&self.job_type)
            .map(|s| s.namespace.as_str())
            .unwrap_or(self.job_type.as_str());
        Job::new(namespace, self.search_tags.clone())
    }
}

impl Config {
    /// Default config file location
    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|p| p.join("tagwatch").join("config.yml"))
    }

    /// Load and validate configuration from `path`
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        Self::from_yaml(&content).with_context(|| format!("Invalid config file {}", path.display()))
    }

    /// Parse and validate configuration from a YAML string
    pub fn from_yaml(content: &str) -> Result<Self> {
        let config: Config = serde_yaml::from_str(content).context("Failed to parse YAML")?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.tagging_api_concurrency == 0 {
            anyhow::bail!("tagging_api_concurrency must be greater than 0");
        }
        if self.metrics_per_query == 0 {
            anyhow::bail!("metrics_per_query must be greater than 0");
        }
        if let Some(endpoint) = &self.endpoint_url {
            url::Url::parse(endpoint).with_context(|| format!("Invalid endpoint_url: {}", endpoint))?;
        }

        for (idx, job) in self.jobs.iter().enumerate() {
            if services::get_service(&job.job_type).is_none() {
                anyhow::bail!(
                    "jobs[{}]: unknown service type '{}' (supported: {})",
                    idx,
                    job.job_type,
                    services::all_namespaces().join(", ")
                );
            }
            if job.regions.is_empty() {
                anyhow::bail!("jobs[{}] ({}): at least one region is required", idx, job.job_type);
            }
            for metric in &job.metrics {
                if metric.statistics.is_empty() {
                    anyhow::bail!(
                        "jobs[{}] ({}): metric {} has no statistics",
                        idx,
                        job.job_type,
                        metric.name
                    );
                }
                if metric.period <= 0 {
                    anyhow::bail!(
                        "jobs[{}] ({}): metric {} needs a positive period",
                        idx,
                        job.job_type,
                        metric.name
                    );
                }
                if metric.length <= 0 || metric.length > MAX_LOOKBACK_SECONDS {
                    anyhow::bail!(
                        "jobs[{}] ({}): metric {} length must be in 1..={} seconds",
                        idx,
                        job.job_type,
                        metric.name,
                        MAX_LOOKBACK_SECONDS
                    );
                }
                if metric.delay < 0 || metric.delay > MAX_LOOKBACK_SECONDS {
                    anyhow::bail!(
                        "jobs[{}] ({}): metric {} delay must be in 0..={} seconds",
                        idx,
                        job.job_type,
                        metric.name,
                        MAX_LOOKBACK_SECONDS
                    );
                }
            }
        }
        Ok(())
    }

    /// Distinct regions across all jobs, in first-seen order
    pub fn regions(&self) -> Vec<String> {
        let mut regions: Vec<String> = Vec::new();
        for region in self.jobs.iter().flat_map(|j| &j.regions) {
            if !regions.contains(region) {
                regions.push(region.clone());
            }
        }
        regions
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
endpoint_url: http://localhost:4566
jobs:
  - type: ec2
    regions: [us-east-1, eu-west-1]
    search_tags:
      - key: env
        value: prod
    metrics:
      - name: CPUUtilization
        statistics: [Average, p99]
  - type: AWS/DMS
    regions: [eu-west-1]
    use_get_metric_statistics: true
    metrics:
      - name: CDCLatencySource
        statistics: [Maximum]
        period: 60
        length: 600
        delay: 120
"#;

    #[test]
    fn test_parse_sample() {
        let config = Config::from_yaml(SAMPLE).unwrap();
        assert_eq!(config.jobs.len(), 2);
        assert_eq!(config.tagging_api_concurrency, 5);
        assert_eq!(config.metrics_per_query, 500);
        assert_eq!(config.endpoint_url.as_deref(), Some("http://localhost:4566"));

        let ec2 = &config.jobs[0];
        assert_eq!(ec2.search_tags, vec![Tag::new("env", "prod")]);
        assert_eq!(ec2.metrics[0].period, 300);
        assert_eq!(ec2.metrics[0].length, 300);
        assert!(!ec2.recently_active_only);

        let dms = &config.jobs[1];
        assert!(dms.use_get_metric_statistics);
        assert_eq!(dms.metrics[0].delay, 120);
    }

    #[test]
    fn test_alias_resolves_to_namespace() {
        let config = Config::from_yaml(SAMPLE).unwrap();
        let job = config.jobs[0].to_job();
        assert_eq!(job.job_type, "AWS/EC2");
        assert_eq!(job.search_tags.len(), 1);
    }

    #[test]
    fn test_regions_are_deduplicated() {
        let config = Config::from_yaml(SAMPLE).unwrap();
        assert_eq!(config.regions(), vec!["us-east-1", "eu-west-1"]);
    }

    #[test]
    fn test_unknown_service_rejected() {
        let err = Config::from_yaml("jobs:\n  - type: AWS/Nope\n    regions: [us-east-1]\n").unwrap_err();
        assert!(format!("{:#}", err).contains("unknown service type"));
    }

    #[test]
    fn test_missing_regions_rejected() {
        let err = Config::from_yaml("jobs:\n  - type: ec2\n    regions: []\n").unwrap_err();
        assert!(format!("{:#}", err).contains("at least one region"));
    }

    #[test]
    fn test_metric_without_statistics_rejected() {
        let yaml = "jobs:\n  - type: ec2\n    regions: [us-east-1]\n    metrics:\n      - name: CPUUtilization\n        statistics: []\n";
        assert!(Config::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_zero_period_rejected() {
        let yaml = "jobs:\n  - type: ec2\n    regions: [us-east-1]\n    metrics:\n      - name: CPUUtilization\n        statistics: [Sum]\n        period: 0\n";
        assert!(Config::from_yaml(yaml).is_err());
    }

    #[test]
    fn test_negative_length_rejected() {
        let yaml = "jobs:\n  - type: ec2\n    regions: [us-east-1]\n    metrics:\n      - name: CPUUtilization\n        statistics: [Sum]\n        length: -600\n";
        let err = Config::from_yaml(yaml).unwrap_err();
        assert!(format!("{:#}", err).contains("length must be"));
    }

    #[test]
    fn test_out_of_range_delay_rejected() {
        let negative = "jobs:\n  - type: ec2\n    regions: [us-east-1]\n    metrics:\n      - name: CPUUtilization\n        statistics: [Sum]\n        delay: -1\n";
        assert!(Config::from_yaml(negative).is_err());

        let huge = "jobs:\n  - type: ec2\n    regions: [us-east-1]\n    metrics:\n      - name: CPUUtilization\n        statistics: [Sum]\n        delay: 100000000000000\n";
        let err = Config::from_yaml(huge).unwrap_err();
        assert!(format!("{:#}", err).contains("delay must be"));
    }

    #[test]
    fn test_lookback_bound_is_inclusive() {
        let yaml = format!(
            "jobs:\n  - type: ec2\n    regions: [us-east-1]\n    metrics:\n      - name: CPUUtilization\n        statistics: [Sum]\n        length: {}\n        delay: 0\n",
            MAX_LOOKBACK_SECONDS
        );
        let config = Config::from_yaml(&yaml).unwrap();
        assert!(config.jobs[0].metrics[0].window(chrono::Utc::now()).is_some());
    }

    #[test]
    fn test_zero_concurrency_rejected() {
        assert!(Config::from_yaml("tagging_api_concurrency: 0\n").is_err());
    }

    #[test]
    fn test_bad_endpoint_rejected() {
        assert!(Config::from_yaml("endpoint_url: not a url\n").is_err());
    }

    #[test]
    fn test_empty_document_uses_defaults() {
        let config = Config::from_yaml("{}").unwrap();
        assert!(config.jobs.is_empty());
        assert_eq!(config.tagging_api_concurrency, 5);
    }
}
