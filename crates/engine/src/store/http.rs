//! REST store backend
//!
//! `HttpStore` attaches to an already running document store cluster over its
//! REST API. It does not launch processes: `start` hands out a handle to the
//! cluster at the configured URL and `stop` only detaches, so it is normally
//! paired with `InstancePolicy::Shared` or a disposable cluster per test run.
//!
//! Endpoints used:
//!
//! | Operation | Request |
//! |-----------|---------|
//! | is_ready | `GET /_cluster/health` |
//! | exists | `HEAD /{index}` |
//! | create_index | `PUT /{index}` with `{"settings": {...}}` |
//! | put_mapping | `PUT /{index}/{type}/_mapping` with `{type: mapping}` |
//! | get_mapping | `GET /{index}/{type}/_mapping` |
//! | delete_index | `DELETE /{index}` |

use serde_json::{json, Map, Value};
use std::time::Duration;
use strata_fixture_core::{StoreError, StoreResult};
use tracing::{debug, info};

use super::{IndexAdmin, InstanceControl, InstanceHandle};
use crate::fixture::config::InstanceConfig;

/// Default per-request timeout
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);

/// Store backend speaking the REST API of a running cluster
pub struct HttpStore {
    agent: ureq::Agent,
    base_url: String,
}

impl std::fmt::Debug for HttpStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpStore")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl HttpStore {
    /// Attach to the cluster at `base_url` (e.g. `http://localhost:9200`)
    pub fn new(base_url: impl Into<String>) -> Self {
        Self::with_timeout(base_url, DEFAULT_TIMEOUT)
    }

    /// Attach with a custom per-request timeout
    pub fn with_timeout(base_url: impl Into<String>, timeout: Duration) -> Self {
        let config = ureq::Agent::config_builder()
            .timeout_global(Some(timeout))
            .http_status_as_error(false)
            .build();
        Self {
            agent: ureq::Agent::new_with_config(config),
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Cluster URL without a trailing slash
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn get(&self, url: &str) -> StoreResult<(u16, String)> {
        debug!(target: "strata::http", url, "GET");
        finish(self.agent.get(url).call())
    }

    fn head(&self, url: &str) -> StoreResult<(u16, String)> {
        debug!(target: "strata::http", url, "HEAD");
        finish(self.agent.head(url).call())
    }

    fn delete(&self, url: &str) -> StoreResult<(u16, String)> {
        debug!(target: "strata::http", url, "DELETE");
        finish(self.agent.delete(url).call())
    }

    fn put_json(&self, url: &str, body: &Value) -> StoreResult<(u16, String)> {
        debug!(target: "strata::http", url, "PUT");
        let bytes = serde_json::to_vec(body)
            .map_err(|e| StoreError::Rejected(format!("failed to serialize request: {}", e)))?;
        finish(
            self.agent
                .put(url)
                .header("Content-Type", "application/json")
                .send(&bytes[..]),
        )
    }
}

fn finish(
    result: std::result::Result<ureq::http::Response<ureq::Body>, ureq::Error>,
) -> StoreResult<(u16, String)> {
    let mut response = result.map_err(|e| StoreError::Transport(e.to_string()))?;
    let status = response.status().as_u16();
    let text = response
        .body_mut()
        .read_to_string()
        .map_err(|e| StoreError::Transport(format!("failed to read response: {}", e)))?;
    Ok((status, text))
}

// ============================================================================
// Request/response helpers
// ============================================================================

fn index_url(base: &str, index: &str) -> String {
    format!("{}/{}", base, index)
}

fn mapping_url(base: &str, index: &str, type_name: &str) -> String {
    format!("{}/{}/{}/_mapping", base, index, type_name)
}

fn health_url(base: &str) -> String {
    format!("{}/_cluster/health", base)
}

fn create_index_body(settings: &Map<String, Value>) -> Value {
    if settings.is_empty() {
        json!({})
    } else {
        json!({ "settings": settings })
    }
}

fn mapping_body(type_name: &str, mapping: &Value) -> Value {
    let mut body = Map::new();
    body.insert(type_name.to_string(), mapping.clone());
    Value::Object(body)
}

/// Cluster health is usable once it is yellow or green
fn health_is_ready(health: &Value) -> bool {
    matches!(
        health.get("status").and_then(Value::as_str),
        Some("green") | Some("yellow")
    )
}

/// Pull one type's mapping out of a `GET _mapping` response.
///
/// Older clusters answer `{type: mapping}`; newer ones nest it as
/// `{index: {mappings: {type: mapping}}}`.
fn extract_mapping(response: &Value, index: &str, type_name: &str) -> Option<Value> {
    if let Some(mapping) = response.get(type_name) {
        return Some(mapping.clone());
    }
    response
        .get(index)
        .and_then(|i| i.get("mappings"))
        .and_then(|m| m.get(type_name))
        .cloned()
}

fn status_error(status: u16, body: &str, index: &str) -> StoreError {
    let lowered = body.to_ascii_lowercase();
    match status {
        404 => StoreError::IndexNotFound(index.to_string()),
        400 if lowered.contains("indexalreadyexists")
            || lowered.contains("index_already_exists") =>
        {
            StoreError::IndexExists(index.to_string())
        }
        _ => StoreError::Rejected(format!(
            "HTTP {}: {}",
            status,
            body.chars().take(200).collect::<String>()
        )),
    }
}

fn is_success(status: u16) -> bool {
    (200..300).contains(&status)
}

impl InstanceControl for HttpStore {
    fn start(&self, config: &InstanceConfig) -> StoreResult<InstanceHandle> {
        let name = config.name.clone().unwrap_or_else(|| "http".to_string());
        let handle = InstanceHandle::new(name).with_endpoint(self.base_url.clone());
        info!(
            target: "strata::http",
            instance = %handle,
            url = %self.base_url,
            "Attached to cluster"
        );
        Ok(handle)
    }

    fn stop(&self, handle: &InstanceHandle) -> StoreResult<()> {
        info!(target: "strata::http", instance = %handle, "Detached from cluster");
        Ok(())
    }

    fn is_ready(&self, _handle: &InstanceHandle) -> StoreResult<bool> {
        let (status, body) = self.get(&health_url(&self.base_url))?;
        if !is_success(status) {
            return Ok(false);
        }
        let health: Value = serde_json::from_str(&body)
            .map_err(|e| StoreError::Rejected(format!("invalid health response: {}", e)))?;
        Ok(health_is_ready(&health))
    }
}

impl IndexAdmin for HttpStore {
    fn exists(&self, _handle: &InstanceHandle, index: &str) -> StoreResult<bool> {
        let (status, body) = self.head(&index_url(&self.base_url, index))?;
        match status {
            404 => Ok(false),
            s if is_success(s) => Ok(true),
            s => Err(status_error(s, &body, index)),
        }
    }

    fn create_index(
        &self,
        _handle: &InstanceHandle,
        index: &str,
        settings: &Map<String, Value>,
    ) -> StoreResult<()> {
        let (status, body) =
            self.put_json(&index_url(&self.base_url, index), &create_index_body(settings))?;
        if is_success(status) {
            Ok(())
        } else {
            Err(status_error(status, &body, index))
        }
    }

    fn put_mapping(
        &self,
        _handle: &InstanceHandle,
        index: &str,
        type_name: &str,
        mapping: &Value,
    ) -> StoreResult<()> {
        let url = mapping_url(&self.base_url, index, type_name);
        let (status, body) = self.put_json(&url, &mapping_body(type_name, mapping))?;
        if is_success(status) {
            Ok(())
        } else {
            Err(status_error(status, &body, index))
        }
    }

    fn delete_index(&self, _handle: &InstanceHandle, index: &str) -> StoreResult<()> {
        let (status, body) = self.delete(&index_url(&self.base_url, index))?;
        if is_success(status) {
            Ok(())
        } else {
            Err(status_error(status, &body, index))
        }
    }

    fn get_mapping(
        &self,
        handle: &InstanceHandle,
        index: &str,
        type_name: &str,
    ) -> StoreResult<Option<Value>> {
        let (status, body) = self.get(&mapping_url(&self.base_url, index, type_name))?;
        if status == 404 {
            // Missing type and missing index both answer 404
            return if self.exists(handle, index)? {
                Ok(None)
            } else {
                Err(StoreError::IndexNotFound(index.to_string()))
            };
        }
        if !is_success(status) {
            return Err(status_error(status, &body, index));
        }
        let response: Value = serde_json::from_str(&body)
            .map_err(|e| StoreError::Rejected(format!("invalid mapping response: {}", e)))?;
        Ok(extract_mapping(&response, index, type_name))
    }
}
