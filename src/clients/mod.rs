//! Monitoring and tagging clients
//!
//! # Module Structure
//!
//! - [`cloudwatch`] - Metric listing, batched data queries, statistics
//! - [`tagging`] - Resource discovery through the tagging API and hooks
//! - [`registry`] - Per-namespace extension hook registry
//! - [`extensions`] - Built-in hooks (Storage Gateway, Shield, DMS)
//! - [`limiter`] - Concurrency-bounded wrapper around a discovery client

pub mod cloudwatch;
pub mod extensions;
pub mod limiter;
pub mod registry;
pub mod tagging;

#[cfg(test)]
pub(crate) mod testing;

pub use cloudwatch::MetricClient;
pub use limiter::LimitedConcurrencyClient;
pub use registry::ExtensionRegistry;
pub use tagging::{ResourceDiscovery, TaggingClient};
