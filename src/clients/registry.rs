//! Extension Registry
//!
//! Maps a service namespace to optional discovery hooks for resource kinds the
//! tagging API cannot enumerate or filter on its own. The built-in registry is
//! assembled once and shared read-only afterwards.

use super::extensions;
use super::tagging::TaggingClient;
use crate::model::{Job, TaggedResource};
use anyhow::Result;
use futures::future::BoxFuture;
use std::collections::HashMap;
use std::sync::{Arc, OnceLock};

/// Discovers additional resources for a (job, region)
pub type ResourceFunc =
    for<'a> fn(&'a TaggingClient, &'a Job, &'a str) -> BoxFuture<'a, Result<Vec<TaggedResource>>>;

/// Transforms the accumulated resource set; its output replaces the input
pub type FilterFunc =
    for<'a> fn(&'a TaggingClient, Vec<TaggedResource>) -> BoxFuture<'a, Result<Vec<TaggedResource>>>;

/// Hook pair registered for one namespace
#[derive(Clone, Copy, Default)]
pub struct ServiceExtension {
    resource_func: Option<ResourceFunc>,
    filter_func: Option<FilterFunc>,
}

impl ServiceExtension {
    pub fn resource_func(&self) -> Option<ResourceFunc> {
        self.resource_func
    }

    pub fn filter_func(&self) -> Option<FilterFunc> {
        self.filter_func
    }

    pub fn has_resource_func(&self) -> bool {
        self.resource_func.is_some()
    }

    pub fn has_filter_func(&self) -> bool {
        self.filter_func.is_some()
    }
}

impl std::fmt::Debug for ServiceExtension {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ServiceExtension")
            .field("resource_func", &self.has_resource_func())
            .field("filter_func", &self.has_filter_func())
            .finish()
    }
}

/// Namespace-keyed hook registry
#[derive(Debug, Clone, Default)]
pub struct ExtensionRegistry {
    extensions: HashMap<String, ServiceExtension>,
}

static BUILTIN: OnceLock<Arc<ExtensionRegistry>> = OnceLock::new();

impl ExtensionRegistry {
    /// Registry without any hooks
    pub fn empty() -> Self {
        Self::default()
    }

    /// The shared built-in registry
    pub fn builtin() -> Arc<Self> {
        BUILTIN
            .get_or_init(|| Arc::new(extensions::register_builtin(Self::empty())))
            .clone()
    }

    /// Register a resource hook for `namespace`
    pub fn with_resource_func(mut self, namespace: &str, func: ResourceFunc) -> Self {
        self.extensions
            .entry(namespace.to_string())
            .or_default()
            .resource_func = Some(func);
        self
    }

    /// Register a filter hook for `namespace`
    pub fn with_filter_func(mut self, namespace: &str, func: FilterFunc) -> Self {
        self.extensions
            .entry(namespace.to_string())
            .or_default()
            .filter_func = Some(func);
        self
    }

    pub fn get(&self, namespace: &str) -> Option<&ServiceExtension> {
        self.extensions.get(namespace)
    }

    pub fn has_resource_func(&self, namespace: &str) -> bool {
        self.get(namespace).is_some_and(ServiceExtension::has_resource_func)
    }

    pub fn has_filter_func(&self, namespace: &str) -> bool {
        self.get(namespace).is_some_and(ServiceExtension::has_filter_func)
    }

    /// Registered namespaces, sorted
    pub fn namespaces(&self) -> Vec<&str> {
        let mut namespaces: Vec<&str> = self.extensions.keys().map(|s| s.as_str()).collect();
        namespaces.sort_unstable();
        namespaces
    }

    /// Compare hook capabilities with a paired registry.
    ///
    /// Returns one message per namespace where one side has a hook of a kind
    /// the other side lacks. Empty means both registries are symmetric.
    pub fn symmetry_violations(&self, other: &ExtensionRegistry) -> Vec<String> {
        let mut namespaces: Vec<&str> = self.namespaces();
        namespaces.extend(other.namespaces());
        namespaces.sort_unstable();
        namespaces.dedup();

        let mut violations = Vec::new();
        for ns in namespaces {
            if self.has_resource_func(ns) != other.has_resource_func(ns) {
                violations.push(format!("{}: ResourceFunc registered on one side only", ns));
            }
            if self.has_filter_func(ns) != other.has_filter_func(ns) {
                violations.push(format!("{}: FilterFunc registered on one side only", ns));
            }
        }
        violations
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services;

    fn no_resources<'a>(
        _client: &'a TaggingClient,
        _job: &'a Job,
        _region: &'a str,
    ) -> BoxFuture<'a, Result<Vec<TaggedResource>>> {
        Box::pin(async { Ok(Vec::new()) })
    }

    fn keep_all<'a>(
        _client: &'a TaggingClient,
        resources: Vec<TaggedResource>,
    ) -> BoxFuture<'a, Result<Vec<TaggedResource>>> {
        Box::pin(async move { Ok(resources) })
    }

    #[test]
    fn test_builtin_hooks_are_registered() {
        let registry = ExtensionRegistry::builtin();
        assert!(registry.has_resource_func("AWS/StorageGateway"));
        assert!(registry.has_resource_func("AWS/DDoSProtection"));
        assert!(registry.has_filter_func("AWS/DMS"));
        assert!(!registry.has_resource_func("AWS/DMS"));
        assert!(registry.has_resource_func("AWS/AutoScaling"));
        assert!(registry.has_filter_func("AWS/ApiGateway"));
        assert!(!registry.has_resource_func("AWS/ApiGateway"));
        assert!(registry.has_resource_func("AWS/TransitGateway"));
        assert!(registry.has_resource_func("AWS/Prometheus"));
        assert!(registry.get("AWS/EC2").is_none());
    }

    #[test]
    fn test_builtin_namespaces_are_supported_services() {
        for ns in ExtensionRegistry::builtin().namespaces() {
            assert!(
                services::get_service(ns).is_some(),
                "{} has hooks but is not a supported service",
                ns
            );
        }
    }

    #[test]
    fn test_builtin_is_shared() {
        let a = ExtensionRegistry::builtin();
        let b = ExtensionRegistry::builtin();
        assert!(Arc::ptr_eq(&a, &b));
    }

    #[test]
    fn test_builder_sets_capabilities() {
        let registry = ExtensionRegistry::empty()
            .with_resource_func("AWS/Custom", no_resources)
            .with_filter_func("AWS/Custom", keep_all);

        let ext = registry.get("AWS/Custom").unwrap();
        assert!(ext.has_resource_func());
        assert!(ext.has_filter_func());
        assert!(!registry.has_filter_func("AWS/Other"));
    }

    #[test]
    fn test_symmetric_registries() {
        let a = ExtensionRegistry::empty()
            .with_resource_func("AWS/A", no_resources)
            .with_filter_func("AWS/B", keep_all);
        let b = ExtensionRegistry::empty()
            .with_filter_func("AWS/B", keep_all)
            .with_resource_func("AWS/A", no_resources);

        assert!(a.symmetry_violations(&b).is_empty());
        assert!(b.symmetry_violations(&a).is_empty());
    }

    #[test]
    fn test_asymmetric_registries_are_reported() {
        let a = ExtensionRegistry::empty()
            .with_resource_func("AWS/A", no_resources)
            .with_filter_func("AWS/A", keep_all);
        let b = ExtensionRegistry::empty().with_resource_func("AWS/A", no_resources);

        let violations = a.symmetry_violations(&b);
        assert_eq!(violations, vec!["AWS/A: FilterFunc registered on one side only"]);
        assert_eq!(a.symmetry_violations(&ExtensionRegistry::empty()).len(), 2);
    }

    #[test]
    fn test_builtin_is_symmetric_with_itself() {
        let registry = ExtensionRegistry::builtin();
        assert!(registry.symmetry_violations(&registry).is_empty());
    }
}
