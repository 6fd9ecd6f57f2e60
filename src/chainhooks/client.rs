//! HTTP client for the hosted chainhooks management API

use super::definition::{ChainhookDefinition, CreateChainhookParams, StacksNetwork};
use super::error::{ChainhookError, Result};
use super::metrics::ChainhookMetrics;
use crate::config::ChainhooksConfig;
use backoff::ExponentialBackoffBuilder;
use reqwest::{Client, Method};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

/// Header carrying the management API key
pub const API_KEY_HEADER: &str = "x-api-key";

const DEFAULT_RETRY_INTERVAL: Duration = Duration::from_millis(500);

/// Pagination of the chainhook listing
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct Pagination {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub limit: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<u32>,
}

/// Registration response; only the uuid is interpreted
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RegisteredChainhook {
    pub uuid: String,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, Value>,
}

/// Client for registering and managing chainhooks
pub struct ChainhooksClient {
    http: Client,
    base_url: Url,
    api_key: SecretString,
    network: StacksNetwork,
    webhook_url: String,
    retry_attempts: u32,
    retry_interval: Duration,
}

impl std::fmt::Debug for ChainhooksClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChainhooksClient")
            .field("base_url", &self.base_url.as_str())
            .field("network", &self.network)
            .field("webhook_url", &self.webhook_url)
            .finish_non_exhaustive()
    }
}

impl ChainhooksClient {
    /// Create a client from configuration
    pub fn new(config: &ChainhooksConfig) -> Result<Self> {
        let http = Client::builder()
            .user_agent(format!("chainhook-relay/{}", env!("CARGO_PKG_VERSION")))
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;

        let base_url = Url::parse(config.resolved_base_url())?;
        if base_url.cannot_be_a_base() {
            return Err(ChainhookError::InvalidRequest(format!(
                "Chainhooks base URL '{base_url}' cannot carry a path"
            )));
        }

        Ok(Self {
            http,
            base_url,
            api_key: SecretString::from(config.api_key.clone()),
            network: config.network,
            webhook_url: config.webhook_url.clone(),
            retry_attempts: config.retry_attempts,
            retry_interval: DEFAULT_RETRY_INTERVAL,
        })
    }

    /// Override the initial delay between read retries
    pub fn with_retry_interval(mut self, interval: Duration) -> Self {
        self.retry_interval = interval;
        self
    }

    pub fn network(&self) -> StacksNetwork {
        self.network
    }

    /// Register a chainhook delivering to the configured webhook URL
    pub async fn register(&self, params: &CreateChainhookParams) -> Result<RegisteredChainhook> {
        params.validate().map_err(ChainhookError::InvalidRequest)?;

        let definition = ChainhookDefinition::from_params(params, self.network, &self.webhook_url);
        debug!(
            "Registering chainhook '{}' on {} with {} filter(s)",
            definition.name,
            self.network,
            definition.filters.events.len()
        );

        let body = serde_json::to_value(&definition)?;
        let url = self.endpoint(&[""])?;
        let response = self.call("register", Method::POST, url, Some(&body)).await?;

        Ok(serde_json::from_value(response)?)
    }

    /// List chainhooks owned by the API key
    pub async fn list(&self, pagination: &Pagination) -> Result<Value> {
        let mut url = self.endpoint(&[""])?;
        {
            let mut query = url.query_pairs_mut();
            if let Some(limit) = pagination.limit {
                query.append_pair("limit", &limit.to_string());
            }
            if let Some(offset) = pagination.offset {
                query.append_pair("offset", &offset.to_string());
            }
        }
        if url.query() == Some("") {
            url.set_query(None);
        }

        self.call_with_retry("list", url).await
    }

    /// Fetch a single chainhook
    pub async fn get(&self, uuid: &str) -> Result<Value> {
        let url = self.endpoint(&[checked_uuid(uuid)?])?;
        self.call_with_retry("get", url).await
    }

    /// Apply a partial update to a chainhook
    pub async fn update(&self, uuid: &str, changes: &Value) -> Result<Value> {
        if !changes.is_object() {
            return Err(ChainhookError::InvalidRequest(
                "Update body must be a JSON object".to_string(),
            ));
        }

        let url = self.endpoint(&[checked_uuid(uuid)?])?;
        self.call("update", Method::PATCH, url, Some(changes)).await
    }

    /// Delete a chainhook
    pub async fn delete(&self, uuid: &str) -> Result<Value> {
        let url = self.endpoint(&[checked_uuid(uuid)?])?;
        self.call("delete", Method::DELETE, url, None).await
    }

    /// Enable or disable a chainhook
    pub async fn set_enabled(&self, uuid: &str, enabled: bool) -> Result<Value> {
        let url = self.endpoint(&[checked_uuid(uuid)?, "enabled"])?;
        let body = json!({ "enabled": enabled });
        self.call("toggle", Method::PATCH, url, Some(&body)).await
    }

    /// Ask the API to evaluate a chainhook against a past block
    pub async fn evaluate(&self, uuid: &str, block_height: u64) -> Result<Value> {
        let url = self.endpoint(&[checked_uuid(uuid)?, "evaluate"])?;
        let body = json!({ "block_height": block_height });
        self.call("evaluate", Method::POST, url, Some(&body)).await
    }

    fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ChainhookError::Other("Base URL cannot carry a path".to_string()))?
            .pop_if_empty()
            .extend(["chainhooks", "v1", "me"])
            .extend(segments);
        Ok(url)
    }

    async fn call(
        &self,
        operation: &'static str,
        method: Method,
        url: Url,
        body: Option<&Value>,
    ) -> Result<Value> {
        let result = self.send(method, url, body).await;
        ChainhookMetrics::global().record_api_call(operation, result.is_ok());
        result
    }

    /// GET with exponential backoff on transport errors and 5xx
    async fn call_with_retry(&self, operation: &'static str, url: Url) -> Result<Value> {
        let policy = ExponentialBackoffBuilder::new()
            .with_initial_interval(self.retry_interval)
            .with_max_elapsed_time(None)
            .build();

        let mut attempt = 0u32;
        let result = backoff::future::retry(policy, || {
            attempt += 1;
            let current = attempt;
            let url = url.clone();
            async move {
                self.send(Method::GET, url, None).await.map_err(|e| {
                    if current <= self.retry_attempts && is_transient(&e) {
                        warn!(
                            "Chainhooks API {} failed (attempt {}/{}): {}. Retrying...",
                            operation,
                            current,
                            self.retry_attempts + 1,
                            e
                        );
                        backoff::Error::transient(e)
                    } else {
                        backoff::Error::permanent(e)
                    }
                })
            }
        })
        .await;

        ChainhookMetrics::global().record_api_call(operation, result.is_ok());
        result
    }

    async fn send(&self, method: Method, url: Url, body: Option<&Value>) -> Result<Value> {
        debug!("Chainhooks API request: {} {}", method, url.path());

        let mut request = self
            .http
            .request(method, url)
            .header(API_KEY_HEADER, self.api_key.expose_secret());
        if let Some(body) = body {
            request = request.json(body);
        }

        let response = request.send().await?;
        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            return Err(ChainhookError::Api {
                status: status.as_u16(),
                body: text,
            });
        }

        Ok(parse_body(&text))
    }
}

fn checked_uuid(uuid: &str) -> Result<&str> {
    let uuid = uuid.trim();
    if uuid.is_empty() {
        return Err(ChainhookError::InvalidRequest(
            "Chainhook uuid cannot be empty".to_string(),
        ));
    }
    Ok(uuid)
}

fn parse_body(text: &str) -> Value {
    if text.trim().is_empty() {
        return Value::Null;
    }
    serde_json::from_str(text).unwrap_or_else(|_| Value::String(text.to_string()))
}

fn is_transient(error: &ChainhookError) -> bool {
    match error {
        ChainhookError::Http(e) => e.is_timeout() || e.is_connect() || e.is_request(),
        ChainhookError::Api { status, .. } => *status >= 500,
        _ => false,
    }
}
