//! Error kinds surfaced by the clients

use thiserror::Error;

/// Failures of a `get_resources` call. All of them are fatal for the
/// (job, region) pair; no partial results accompany them.
#[derive(Error, Debug)]
pub enum TaggingError {
    #[error("unknown service: {0}")]
    UnknownService(String),

    #[error("resource discovery for {namespace} in {region} aborted: {source:#}")]
    DiscoveryAborted {
        namespace: String,
        region: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to apply ResourceFunc for {namespace}: {source:#}")]
    ExtensionResource {
        namespace: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("failed to apply FilterFunc for {namespace}: {source:#}")]
    ExtensionFilter {
        namespace: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("expected to discover resources for {namespace} in {region} but none were found")]
    ExpectedResourcesNotFound { namespace: String, region: String },

    /// The limiter was shut down with `LimitedConcurrencyClient::close`
    #[error("concurrency limiter is closed")]
    LimiterClosed,
}

impl TaggingError {
    /// True for the post-condition failure that usually points at misconfiguration
    pub fn is_expected_resources_not_found(&self) -> bool {
        matches!(self, TaggingError::ExpectedResourcesNotFound { .. })
    }
}

/// Non-fatal metric retrieval failures. These are logged and counted; callers
/// only ever see an empty result.
#[derive(Error, Debug)]
pub enum DegradedError {
    #[error("GetMetricData for {namespace} degraded to empty result: {source:#}")]
    MetricData {
        namespace: String,
        #[source]
        source: anyhow::Error,
    },

    #[error("GetMetricStatistics for {namespace}/{metric} degraded to empty result: {source:#}")]
    Statistics {
        namespace: String,
        metric: String,
        #[source]
        source: anyhow::Error,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_messages_carry_stage_and_namespace() {
        let err = TaggingError::ExtensionFilter {
            namespace: "AWS/DMS".to_string(),
            source: anyhow::anyhow!("throttled"),
        };
        assert_eq!(
            err.to_string(),
            "failed to apply FilterFunc for AWS/DMS: throttled"
        );
    }

    #[test]
    fn test_expected_resources_not_found_predicate() {
        let err = TaggingError::ExpectedResourcesNotFound {
            namespace: "AWS/EC2".to_string(),
            region: "eu-west-1".to_string(),
        };
        assert!(err.is_expected_resources_not_found());
        assert!(!TaggingError::LimiterClosed.is_expected_resources_not_found());
    }
}
