//! HTTP utilities for AWS JSON-protocol API calls

use anyhow::{Context, Result};
use reqwest::Client;
use serde_json::Value;

/// Maximum length of response body to log (to avoid logging sensitive data)
const MAX_LOG_BODY_LENGTH: usize = 200;

/// Sanitize response body for logging
/// Truncates long responses and strips control characters
fn sanitize_for_log(body: &str) -> String {
    let truncated = if body.len() > MAX_LOG_BODY_LENGTH {
        let mut cut = MAX_LOG_BODY_LENGTH;
        while !body.is_char_boundary(cut) {
            cut -= 1;
        }
        format!("{}... [truncated, {} bytes total]", &body[..cut], body.len())
    } else {
        body.to_string()
    };

    truncated.replace(|c: char| !c.is_ascii_graphic() && c != ' ', "")
}

/// Extract the short error code from an AWS JSON error body.
///
/// `__type` is either a bare code or `namespace#Code`.
fn error_code(body: &str) -> Option<String> {
    let value: Value = serde_json::from_str(body).ok()?;
    let raw = value
        .get("__type")
        .or_else(|| value.get("code"))
        .and_then(|v| v.as_str())?;
    Some(raw.rsplit('#').next().unwrap_or(raw).to_string())
}

/// HTTP client wrapper for AWS JSON-protocol calls
#[derive(Clone)]
pub struct AwsHttpClient {
    client: Client,
}

impl AwsHttpClient {
    /// Create a new HTTP client
    pub fn new() -> Result<Self> {
        let client = Client::builder()
            .user_agent(concat!("tagwatch/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("Failed to create HTTP client")?;

        Ok(Self { client })
    }

    /// POST a JSON-protocol request.
    ///
    /// `json_version` is `1.0` or `1.1`, `target` the full
    /// `<TargetPrefix>.<Action>` value of the `X-Amz-Target` header.
    pub async fn call(&self, url: &str, json_version: &str, target: &str, body: &Value) -> Result<Value> {
        tracing::debug!("POST {} target={}", url, target);

        let response = self
            .client
            .post(url)
            .header("Content-Type", format!("application/x-amz-json-{}", json_version))
            .header("X-Amz-Target", target)
            .body(body.to_string())
            .send()
            .await
            .context("Failed to send request")?;

        let status = response.status();
        let response_body = response
            .text()
            .await
            .context("Failed to read response body")?;

        if !status.is_success() {
            // Only log sanitized/truncated error body
            tracing::error!("API error: {} - {}", status, sanitize_for_log(&response_body));
            return match error_code(&response_body) {
                Some(code) => Err(anyhow::anyhow!("API request failed: {} ({})", status, code)),
                None => Err(anyhow::anyhow!("API request failed: {}", status)),
            };
        }

        // Handle empty response
        if response_body.is_empty() {
            return Ok(Value::Object(serde_json::Map::new()));
        }

        serde_json::from_str(&response_body).context("Failed to parse response JSON")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sanitize_truncates_long_bodies() {
        let body = "x".repeat(500);
        let sanitized = sanitize_for_log(&body);
        assert!(sanitized.starts_with(&"x".repeat(200)));
        assert!(sanitized.contains("[truncated, 500 bytes total]"));
    }

    #[test]
    fn test_sanitize_strips_control_characters() {
        assert_eq!(sanitize_for_log("a\nb\tc"), "abc");
    }

    #[test]
    fn test_error_code_strips_namespace() {
        let body = r#"{"__type":"com.amazonaws.cloudwatch#InvalidParameterValueException","message":"bad"}"#;
        assert_eq!(
            error_code(body).as_deref(),
            Some("InvalidParameterValueException")
        );
        assert_eq!(error_code("not json"), None);
    }
}
