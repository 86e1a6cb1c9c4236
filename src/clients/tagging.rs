//! Resource Tagging Client
//!
//! Enumerates resources for a (job, region) through the tagging API and the
//! namespace's extension hooks, producing one combined resource set.

use super::registry::ExtensionRegistry;
use crate::aws::api::{AuxiliaryApi, TaggingApi};
use crate::aws::pagination::Paginator;
use crate::aws::types::{GetResourcesInput, ResourceTagMapping};
use crate::error::TaggingError;
use crate::model::{Job, Tag, TaggedResource};
use crate::services::{self, ServiceConfig};
use crate::telemetry;
use async_trait::async_trait;
use std::sync::Arc;

/// Max allowed value according to the tagging API docs
pub const MAX_RESOURCES_PER_PAGE: i32 = 100;

/// Anything that can discover resources for a (job, region)
#[async_trait]
pub trait ResourceDiscovery: Send + Sync {
    async fn get_resources(&self, job: &Job, region: &str) -> Result<Vec<TaggedResource>, TaggingError>;
}

#[async_trait]
impl<T: ResourceDiscovery + ?Sized> ResourceDiscovery for Arc<T> {
    async fn get_resources(&self, job: &Job, region: &str) -> Result<Vec<TaggedResource>, TaggingError> {
        (**self).get_resources(job, region).await
    }
}

/// Tagging client for one region
#[derive(Clone)]
pub struct TaggingClient {
    tagging_api: Arc<dyn TaggingApi>,
    auxiliary_api: Arc<dyn AuxiliaryApi>,
    registry: Arc<ExtensionRegistry>,
}

impl TaggingClient {
    /// Create a client using the built-in extension registry
    pub fn new(tagging_api: Arc<dyn TaggingApi>, auxiliary_api: Arc<dyn AuxiliaryApi>) -> Self {
        Self::with_registry(tagging_api, auxiliary_api, ExtensionRegistry::builtin())
    }

    pub fn with_registry(
        tagging_api: Arc<dyn TaggingApi>,
        auxiliary_api: Arc<dyn AuxiliaryApi>,
        registry: Arc<ExtensionRegistry>,
    ) -> Self {
        Self {
            tagging_api,
            auxiliary_api,
            registry,
        }
    }

    /// Per-service APIs, for extension hooks
    pub fn auxiliary(&self) -> &dyn AuxiliaryApi {
        self.auxiliary_api.as_ref()
    }

    pub fn registry(&self) -> &ExtensionRegistry {
        &self.registry
    }

    /// Page through the tagging API for the service's resource types, keeping
    /// resources that match the job's search tags
    async fn discover_tagged(
        &self,
        svc: &ServiceConfig,
        job: &Job,
        region: &str,
    ) -> Result<Vec<TaggedResource>, TaggingError> {
        let input = GetResourcesInput {
            resource_type_filters: svc.resource_filters.clone(),
            resources_per_page: MAX_RESOURCES_PER_PAGE,
        };
        tracing::debug!(namespace = %svc.namespace, region, ?input, "GetResources");

        let api = self.tagging_api.as_ref();
        let input = &input;
        let mut pages = Paginator::new(move |token: Option<String>| async move {
            api.get_resources(input, token.as_deref()).await
        });

        let mut resources = Vec::new();
        while let Some(page) = pages.next_page().await {
            let page = page.map_err(|source| {
                telemetry::record_error("GetResources");
                TaggingError::DiscoveryAborted {
                    namespace: svc.namespace.clone(),
                    region: region.to_string(),
                    source,
                }
            })?;
            telemetry::record_call("GetResources");
            telemetry::metrics().resource_tagging_requests.inc();

            for mapping in page.items {
                let Some(resource) = to_tagged_resource(mapping, job, region) else {
                    tracing::trace!("Skipping tag mapping without ARN");
                    continue;
                };

                if resource.filter_through_tags(&job.search_tags) {
                    resources.push(resource);
                } else {
                    tracing::trace!(arn = %resource.arn, "Skipping resource because search tags do not match");
                }
            }
        }

        tracing::debug!(
            namespace = %svc.namespace,
            pages = pages.pages_fetched(),
            total = resources.len(),
            "GetResources pages finished"
        );
        Ok(resources)
    }
}

fn to_tagged_resource(mapping: ResourceTagMapping, job: &Job, region: &str) -> Option<TaggedResource> {
    let arn = mapping.resource_arn.filter(|arn| !arn.is_empty())?;
    Some(TaggedResource {
        arn,
        namespace: job.job_type.clone(),
        region: region.to_string(),
        tags: mapping
            .tags
            .into_iter()
            .map(|t| Tag {
                key: t.key,
                value: t.value,
            })
            .collect(),
    })
}

#[async_trait]
impl ResourceDiscovery for TaggingClient {
    /// Generic discovery, then the namespace's ResourceFunc, then its
    /// FilterFunc. Any failure aborts the whole call.
    async fn get_resources(&self, job: &Job, region: &str) -> Result<Vec<TaggedResource>, TaggingError> {
        let svc = services::get_service(&job.job_type)
            .ok_or_else(|| TaggingError::UnknownService(job.job_type.clone()))?;

        let mut resources = Vec::new();
        let mut should_have_discovered_resources = false;

        if svc.has_resource_filters() {
            should_have_discovered_resources = true;
            resources = self.discover_tagged(svc, job, region).await?;
        }

        if let Some(ext) = self.registry.get(&svc.namespace) {
            if let Some(resource_func) = ext.resource_func() {
                should_have_discovered_resources = true;
                let discovered = resource_func(self, job, region).await.map_err(|source| {
                    TaggingError::ExtensionResource {
                        namespace: svc.namespace.clone(),
                        source,
                    }
                })?;
                resources.extend(discovered);
                tracing::debug!(namespace = %svc.namespace, total = resources.len(), "ResourceFunc finished");
            }

            if let Some(filter_func) = ext.filter_func() {
                resources = filter_func(self, resources).await.map_err(|source| {
                    TaggingError::ExtensionFilter {
                        namespace: svc.namespace.clone(),
                        source,
                    }
                })?;
                tracing::debug!(namespace = %svc.namespace, total = resources.len(), "FilterFunc finished");
            }
        }

        if should_have_discovered_resources && resources.is_empty() {
            return Err(TaggingError::ExpectedResourcesNotFound {
                namespace: svc.namespace.clone(),
                region: region.to_string(),
            });
        }

        Ok(resources)
    }
}
