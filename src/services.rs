//! Supported services
//!
//! Loads the table of supported service namespaces from embedded JSON. Each
//! entry names the resource-type filters the tagging API is queried with;
//! services without filters are discovered only through extension hooks, or
//! not at all.

use serde::Deserialize;
use std::sync::OnceLock;

/// Embedded service definitions (compiled into the binary)
const SERVICES_FILE: &str = include_str!("resources/services.json");

/// One supported service
#[derive(Debug, Clone, Deserialize)]
pub struct ServiceConfig {
    pub namespace: String,
    pub alias: String,
    #[serde(default)]
    pub resource_filters: Vec<String>,
}

impl ServiceConfig {
    /// Whether generic tag-API discovery applies to this service
    pub fn has_resource_filters(&self) -> bool {
        !self.resource_filters.is_empty()
    }
}

#[derive(Debug, Clone, Deserialize)]
struct ServicesFile {
    services: Vec<ServiceConfig>,
}

static SERVICES: OnceLock<Vec<ServiceConfig>> = OnceLock::new();

/// All supported services (parsed from embedded JSON on first access)
pub fn supported_services() -> &'static [ServiceConfig] {
    SERVICES.get_or_init(|| {
        let parsed: ServicesFile = serde_json::from_str(SERVICES_FILE)
            .unwrap_or_else(|e| panic!("Failed to parse embedded services JSON: {}", e));
        parsed.services
    })
}

/// Find a service by namespace or alias
pub fn get_service(name: &str) -> Option<&'static ServiceConfig> {
    supported_services()
        .iter()
        .find(|s| s.namespace == name || s.alias == name)
}

/// All namespaces (for config validation messages)
pub fn all_namespaces() -> Vec<&'static str> {
    supported_services()
        .iter()
        .map(|s| s.namespace.as_str())
        .collect()
}
