//! Capability registry client.
//!
//! Provides [`RegistryClient`] for fetching the set of capabilities the
//! backend currently offers from its discovery endpoint.
//!
//! The client performs exactly one GET per call and never retries; the
//! one-fetch-per-session guard lives in [`crate::session::Session`].
//!
//! # Wire format
//!
//! The discovery body is a JSON object mapping capability id to status:
//!
//! ```json
//! {
//!   "deepseek-api": {"available": true, "type": "cloud", "description": "DeepSeek API"},
//!   "local-llama3": {"available": false, "type": "local", "description": "Llama 3 via Ollama"}
//! }
//! ```
//!
//! The same mapping wrapped as `{"models": {...}, "environment": ...}` is
//! accepted too. Entries that do not match the shape are skipped, not fatal.

use std::sync::Arc;
use std::time::Duration;

use serde_json::{Map, Value};
use tracing::Instrument;

use crate::capability::{Capability, CapabilityKind};
use crate::config::DashboardConfig;
use crate::error::{ErrorCategory, Failure};
use crate::observability::{FIELD_URL, SPAN_REGISTRY_FETCH};
use crate::transport::{HttpRequest, HttpTransport};

#[cfg(test)]
mod discovery_tests;

/// Fetches capabilities from the discovery endpoint.
#[derive(Clone)]
pub struct RegistryClient {
    transport: Arc<dyn HttpTransport>,
    url: String,
    timeout: Duration,
}

impl std::fmt::Debug for RegistryClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RegistryClient")
            .field("url", &self.url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl RegistryClient {
    /// Create a client for an absolute discovery URL.
    pub fn new(transport: Arc<dyn HttpTransport>, url: impl Into<String>, timeout: Duration) -> Self {
        Self {
            transport,
            url: url.into(),
            timeout,
        }
    }

    /// Create a client from the dashboard config.
    pub fn from_config(config: &DashboardConfig, transport: Arc<dyn HttpTransport>) -> Self {
        Self::new(transport, config.registry_url(), config.registry_timeout())
    }

    /// The discovery URL this client queries.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Issue one discovery request and parse the result.
    ///
    /// Every failure (transport, timeout, non-2xx, non-JSON, unparseable
    /// body) is reported as [`ErrorCategory::RegistryError`].
    pub async fn fetch_registry(&self) -> Result<Vec<Capability>, Failure> {
        let span = tracing::info_span!(SPAN_REGISTRY_FETCH, { FIELD_URL } = %self.url);
        self.fetch_inner().instrument(span).await
    }

    async fn fetch_inner(&self) -> Result<Vec<Capability>, Failure> {
        let start = std::time::Instant::now();
        let send = self.transport.send(HttpRequest::get(&self.url));
        let resp = match tokio::time::timeout(self.timeout, send).await {
            Ok(Ok(resp)) => resp,
            Ok(Err(e)) => {
                return Err(registry_failure(&self.url, format!("discovery request failed: {e}")));
            }
            Err(_) => {
                return Err(registry_failure(
                    &self.url,
                    format!(
                        "discovery request timed out after {}s",
                        self.timeout.as_secs()
                    ),
                ));
            }
        };
        let latency_ms = start.elapsed().as_millis();

        if !resp.is_success() {
            return Err(registry_failure(
                &self.url,
                format!("Failed to load models: {}", resp.status_line()),
            ));
        }
        if !resp.is_json() {
            return Err(registry_failure(
                &self.url,
                format!(
                    "Failed to load models: expected JSON, got '{}'",
                    resp.content_type.as_deref().unwrap_or("no content type")
                ),
            ));
        }

        let capabilities = parse_discovery_response(&resp.body)
            .map_err(|detail| registry_failure(&self.url, detail))?;

        tracing::info!(
            url = %self.url,
            count = capabilities.len(),
            latency_ms = latency_ms as u64,
            "capability registry fetched"
        );
        Ok(capabilities)
    }
}

fn registry_failure(url: &str, detail: String) -> Failure {
    tracing::warn!(url = %url, detail = %detail, "capability registry fetch failed");
    Failure::new(ErrorCategory::RegistryError, detail)
}

/// Parse a discovery body into capabilities, in response key order.
///
/// # Errors
/// Returns a diagnostic message if the body is not a JSON object.
/// Individual malformed entries are skipped.
pub fn parse_discovery_response(body: &str) -> Result<Vec<Capability>, String> {
    let root: Value =
        serde_json::from_str(body).map_err(|e| format!("discovery body is not valid JSON: {e}"))?;
    let root = root
        .as_object()
        .ok_or_else(|| "discovery body is not a JSON object".to_string())?;

    let mapping = unwrap_models(root);
    Ok(mapping
        .iter()
        .filter_map(|(id, entry)| parse_entry(id, entry))
        .collect())
}

/// Accept `{"models": {...}}` as well as the bare mapping.
fn unwrap_models(root: &Map<String, Value>) -> &Map<String, Value> {
    match root.get("models").and_then(Value::as_object) {
        // A capability literally named "models" has an `available` flag.
        Some(inner) if !inner.contains_key("available") => inner,
        _ => root,
    }
}

fn parse_entry(id: &str, entry: &Value) -> Option<Capability> {
    if id.trim().is_empty() {
        tracing::warn!("skipping discovery entry with empty id");
        return None;
    }
    let Some(obj) = entry.as_object() else {
        tracing::warn!(id, "skipping discovery entry: not an object");
        return None;
    };
    let Some(available) = obj.get("available").and_then(Value::as_bool) else {
        tracing::warn!(id, "skipping discovery entry: missing boolean 'available'");
        return None;
    };
    let Some(kind) = obj
        .get("type")
        .and_then(Value::as_str)
        .and_then(CapabilityKind::from_wire)
    else {
        tracing::warn!(id, "skipping discovery entry: 'type' must be \"cloud\" or \"local\"");
        return None;
    };
    let description = obj
        .get("description")
        .and_then(Value::as_str)
        .unwrap_or_default();

    let capability = Capability::new(id, kind, available, description);
    Some(match obj.get("requires").and_then(Value::as_str) {
        Some(requires) => capability.with_requires(requires),
        None => capability,
    })
}
