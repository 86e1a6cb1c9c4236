//! AWS API interaction module
//!
//! Provider boundary for the clients: the API traits they depend on, the wire
//! shapes, pagination, and an HTTP implementation of the traits.
//!
//! # Module Structure
//!
//! - [`api`] - Monitoring, tagging and auxiliary API traits
//! - [`client`] - Per-region client implementing the traits over HTTP
//! - [`http`] - JSON-protocol HTTP transport
//! - [`pagination`] - Page type and lazy page sequence
//! - [`types`] - Request/response wire shapes
//!
//! # Example
//!
//! ```ignore
//! use tagwatch::aws::client::AwsClient;
//!
//! fn example() -> anyhow::Result<()> {
//!     let client = AwsClient::new("us-east-1", None)?;
//!     let url = client.service_url(&tagwatch::aws::client::MONITORING);
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod client;
pub mod http;
pub mod pagination;
pub mod types;
