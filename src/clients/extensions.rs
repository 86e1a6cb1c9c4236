//! Built-in Extension Hooks
//!
//! Discovery for resource kinds the tagging API misses or reports under ARNs
//! that do not line up with metric dimensions. Each hook talks to its
//! service through [`AuxiliaryApi`].

use super::registry::ExtensionRegistry;
use super::tagging::TaggingClient;
use crate::aws::api::AuxiliaryApi;
use crate::aws::pagination::{Page, Paginator};
use crate::model::{Job, Tag, TaggedResource};
use anyhow::{Context, Result};
use futures::future::BoxFuture;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap};

/// Region that global resources report metrics in
const GLOBAL_REGION: &str = "us-east-1";

/// Add the built-in hooks to `registry`
pub fn register_builtin(registry: ExtensionRegistry) -> ExtensionRegistry {
    registry
        .with_resource_func("AWS/StorageGateway", storage_gateway_resources)
        .with_resource_func("AWS/DDoSProtection", ddos_protection_resources)
        .with_filter_func("AWS/DMS", dms_filter)
        .with_resource_func("AWS/AutoScaling", auto_scaling_resources)
        .with_filter_func("AWS/ApiGateway", api_gateway_filter)
        .with_resource_func("AWS/TransitGateway", transit_gateway_resources)
        .with_resource_func("AWS/Prometheus", prometheus_resources)
}

// =============================================================================
// Storage Gateway
// =============================================================================

fn storage_gateway_resources<'a>(
    client: &'a TaggingClient,
    job: &'a Job,
    region: &'a str,
) -> BoxFuture<'a, Result<Vec<TaggedResource>>> {
    Box::pin(async move {
        let aux = client.auxiliary();
        let gateways = list_all(aux, "storagegateway", "ListGateways", "Marker", "Gateways").await?;

        let mut resources = Vec::new();
        for gateway in &gateways {
            let Some(arn) = get_str(gateway, "GatewayARN") else {
                continue;
            };

            let response = aux
                .invoke("storagegateway", "ListTagsForResource", &json!({ "ResourceARN": arn }))
                .await
                .with_context(|| format!("Failed to list tags for gateway {}", arn))?;

            // Metrics are keyed on GatewayId and GatewayName, so both ride on the ARN
            let resource = TaggedResource {
                arn: format!(
                    "{}/{}/{}",
                    arn,
                    get_str(gateway, "GatewayId").unwrap_or_default(),
                    get_str(gateway, "GatewayName").unwrap_or_default()
                ),
                namespace: job.job_type.clone(),
                region: region.to_string(),
                tags: parse_tags(&response),
            };
            if resource.filter_through_tags(&job.search_tags) {
                resources.push(resource);
            }
        }

        tracing::debug!(gateways = gateways.len(), kept = resources.len(), "Storage gateways listed");
        Ok(resources)
    })
}

// =============================================================================
// DDoS Protection (Shield)
// =============================================================================

fn ddos_protection_resources<'a>(
    client: &'a TaggingClient,
    job: &'a Job,
    region: &'a str,
) -> BoxFuture<'a, Result<Vec<TaggedResource>>> {
    Box::pin(async move {
        let protections =
            list_all(client.auxiliary(), "shield", "ListProtections", "NextToken", "Protections").await?;

        let mut resources = Vec::new();
        for protection in &protections {
            let (Some(resource_arn), Some(protection_arn)) =
                (get_str(protection, "ResourceArn"), get_str(protection, "ProtectionArn"))
            else {
                continue;
            };

            if !in_region(resource_arn, region) {
                continue;
            }

            resources.push(TaggedResource {
                arn: resource_arn.to_string(),
                namespace: job.job_type.clone(),
                region: region.to_string(),
                tags: vec![Tag::new("ProtectionArn", protection_arn)],
            });
        }

        Ok(resources)
    })
}

/// Whether a protected resource reports its metrics in `region`
fn in_region(resource_arn: &str, region: &str) -> bool {
    // arn:partition:service:region:account:resource
    let arn_region = resource_arn.split(':').nth(3).unwrap_or_default();
    if arn_region.is_empty() {
        region == GLOBAL_REGION
    } else {
        arn_region == region
    }
}

// =============================================================================
// Database Migration Service
// =============================================================================

fn dms_filter<'a>(
    client: &'a TaggingClient,
    resources: Vec<TaggedResource>,
) -> BoxFuture<'a, Result<Vec<TaggedResource>>> {
    Box::pin(async move {
        if resources.is_empty() {
            return Ok(resources);
        }

        let aux = client.auxiliary();
        let mut identifiers: HashMap<String, String> = HashMap::new();

        let instances = list_all(
            aux,
            "dms",
            "DescribeReplicationInstances",
            "Marker",
            "ReplicationInstances",
        )
        .await?;
        for instance in &instances {
            if let (Some(arn), Some(id)) = (
                get_str(instance, "ReplicationInstanceArn"),
                get_str(instance, "ReplicationInstanceIdentifier"),
            ) {
                identifiers.insert(arn.to_string(), id.to_string());
            }
        }

        let tasks = list_all(aux, "dms", "DescribeReplicationTasks", "Marker", "ReplicationTasks").await?;
        for task in &tasks {
            let (Some(task_arn), Some(instance_arn)) = (
                get_str(task, "ReplicationTaskArn"),
                get_str(task, "ReplicationInstanceArn"),
            ) else {
                continue;
            };
            if let Some(id) = identifiers.get(instance_arn).cloned() {
                identifiers.insert(task_arn.to_string(), id);
            }
        }

        Ok(resources
            .into_iter()
            .map(|mut resource| {
                if let Some(id) = identifiers.get(&resource.arn) {
                    resource.arn = format!("{}/{}", resource.arn, id);
                }
                resource
            })
            .collect())
    })
}

// =============================================================================
// Auto Scaling
// =============================================================================

fn auto_scaling_resources<'a>(
    client: &'a TaggingClient,
    job: &'a Job,
    region: &'a str,
) -> BoxFuture<'a, Result<Vec<TaggedResource>>> {
    Box::pin(async move {
        let groups = list_all(
            client.auxiliary(),
            "autoscaling",
            "DescribeAutoScalingGroups",
            "NextToken",
            "AutoScalingGroups",
        )
        .await?;

        let resources: Vec<TaggedResource> = groups
            .iter()
            .filter_map(|group| {
                Some(TaggedResource {
                    arn: get_str(group, "AutoScalingGroupARN")?.to_string(),
                    namespace: job.job_type.clone(),
                    region: region.to_string(),
                    tags: parse_tags(group),
                })
            })
            .filter(|r| r.filter_through_tags(&job.search_tags))
            .collect();

        tracing::debug!(groups = groups.len(), kept = resources.len(), "Auto Scaling groups listed");
        Ok(resources)
    })
}

// =============================================================================
// API Gateway
// =============================================================================

/// Metrics name REST APIs by `ApiName`, while the tagging API reports
/// `arn:...::/restapis/<id>`. REST API ARNs get the id swapped for the name;
/// HTTP and WebSocket API ARNs (`/apis/<id>`) pass through when the API still
/// exists. Anything else is dropped.
fn api_gateway_filter<'a>(
    client: &'a TaggingClient,
    resources: Vec<TaggedResource>,
) -> BoxFuture<'a, Result<Vec<TaggedResource>>> {
    Box::pin(async move {
        if resources.is_empty() {
            return Ok(resources);
        }

        let aux = client.auxiliary();
        let rest_apis: HashMap<String, String> =
            list_all(aux, "apigateway", "GetRestApis", "position", "items")
                .await?
                .iter()
                .filter_map(|api| Some((get_str(api, "id")?.to_string(), get_str(api, "name")?.to_string())))
                .collect();
        let http_apis: Vec<String> = list_all(aux, "apigatewayv2", "GetApis", "nextToken", "items")
            .await?
            .iter()
            .filter_map(|api| get_str(api, "apiId").map(String::from))
            .collect();

        let mut output = Vec::with_capacity(resources.len());
        for mut resource in resources {
            // arn:aws:apigateway:<region>::/restapis/<id>[/stages/<stage>]
            let mut segments = resource.arn.split('/');
            let (Some(_), Some(kind), Some(id)) = (segments.next(), segments.next(), segments.next()) else {
                continue;
            };
            let (kind, id) = (kind.to_string(), id.to_string());

            match kind.as_str() {
                "restapis" => {
                    if let Some(name) = rest_apis.get(&id) {
                        resource.arn = resource
                            .arn
                            .replacen(&format!("/restapis/{}", id), &format!("/restapis/{}", name), 1);
                        output.push(resource);
                    }
                }
                "apis" => {
                    if http_apis.contains(&id) {
                        output.push(resource);
                    }
                }
                _ => {}
            }
        }
        Ok(output)
    })
}

// =============================================================================
// Transit Gateway
// =============================================================================

/// Attachments carry `TransitGatewayId/TransitGatewayAttachmentId` as their
/// ARN, the pair their metric dimensions use
fn transit_gateway_resources<'a>(
    client: &'a TaggingClient,
    job: &'a Job,
    region: &'a str,
) -> BoxFuture<'a, Result<Vec<TaggedResource>>> {
    Box::pin(async move {
        let attachments = list_all(
            client.auxiliary(),
            "ec2",
            "DescribeTransitGatewayAttachments",
            "NextToken",
            "TransitGatewayAttachments",
        )
        .await?;

        let mut resources = Vec::new();
        for attachment in &attachments {
            let (Some(gateway_id), Some(attachment_id)) = (
                get_str(attachment, "TransitGatewayId"),
                get_str(attachment, "TransitGatewayAttachmentId"),
            ) else {
                continue;
            };

            let resource = TaggedResource {
                arn: format!("{}/{}", gateway_id, attachment_id),
                namespace: job.job_type.clone(),
                region: region.to_string(),
                tags: parse_tags(attachment),
            };
            if resource.filter_through_tags(&job.search_tags) {
                resources.push(resource);
            }
        }
        Ok(resources)
    })
}

// =============================================================================
// Managed Prometheus
// =============================================================================

fn prometheus_resources<'a>(
    client: &'a TaggingClient,
    job: &'a Job,
    region: &'a str,
) -> BoxFuture<'a, Result<Vec<TaggedResource>>> {
    Box::pin(async move {
        let workspaces = list_all(client.auxiliary(), "aps", "ListWorkspaces", "nextToken", "workspaces").await?;

        let mut resources = Vec::new();
        for workspace in &workspaces {
            let Some(arn) = get_str(workspace, "arn") else {
                continue;
            };

            // Tags arrive as a map; sorted so resources compare stably
            let tags: Vec<Tag> = workspace
                .get("tags")
                .and_then(Value::as_object)
                .map(|map| {
                    map.iter()
                        .filter_map(|(k, v)| Some((k.as_str(), v.as_str()?)))
                        .collect::<BTreeMap<_, _>>()
                        .into_iter()
                        .map(|(k, v)| Tag::new(k, v))
                        .collect()
                })
                .unwrap_or_default();

            let resource = TaggedResource {
                arn: arn.to_string(),
                namespace: job.job_type.clone(),
                region: region.to_string(),
                tags,
            };
            if resource.filter_through_tags(&job.search_tags) {
                resources.push(resource);
            }
        }
        Ok(resources)
    })
}

// =============================================================================
// Helpers
// =============================================================================

/// Drain a paged listing, passing the continuation token back under
/// `token_key` and collecting the `items_key` array of every page
async fn list_all(
    aux: &dyn AuxiliaryApi,
    service: &str,
    action: &str,
    token_key: &str,
    items_key: &str,
) -> Result<Vec<Value>> {
    let pages = Paginator::new(move |token: Option<String>| async move {
        let mut params = json!({});
        if let Some(token) = token {
            params[token_key] = Value::String(token);
        }

        let response = aux
            .invoke(service, action, &params)
            .await
            .with_context(|| format!("{}.{} failed", service, action))?;

        let items = response
            .get(items_key)
            .and_then(Value::as_array)
            .cloned()
            .unwrap_or_default();
        let next = get_str(&response, token_key).map(String::from);
        Ok::<_, anyhow::Error>(Page::new(items, next))
    });
    pages.collect_all().await
}

fn get_str<'v>(value: &'v Value, key: &str) -> Option<&'v str> {
    value.get(key).and_then(Value::as_str)
}

fn parse_tags(response: &Value) -> Vec<Tag> {
    response
        .get("Tags")
        .and_then(Value::as_array)
        .map(|tags| {
            tags.iter()
                .filter_map(|t| Some(Tag::new(get_str(t, "Key")?, get_str(t, "Value").unwrap_or_default())))
                .collect()
        })
        .unwrap_or_default()
}
