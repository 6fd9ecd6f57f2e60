use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationError};

use super::metrics_config::MetricsConfig;
use crate::chainhooks::definition::StacksNetwork;
use crate::chainhooks::dispatcher::DEFAULT_QUEUE_CAPACITY;

/// The main configuration structure for the relay
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate)]
pub struct RelayConfig {
    /// HTTP listener configuration
    #[serde(default)]
    #[validate]
    pub server: ServerConfig,

    /// Inbound webhook configuration
    #[serde(default)]
    #[validate]
    pub webhook: WebhookConfig,

    /// Chainhooks management API (optional; management routes are disabled without it)
    #[serde(default)]
    #[validate]
    pub chainhooks: Option<ChainhooksConfig>,

    /// Metrics configuration
    #[serde(default)]
    pub metrics: MetricsConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP listener configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ServerConfig {
    /// Address to bind (default: "0.0.0.0")
    #[serde(default = "default_host")]
    pub host: String,

    /// Port to bind (default: 3000)
    #[serde(default = "default_port")]
    #[validate(range(min = 1))]
    pub port: u16,

    /// Path receiving webhook deliveries
    #[serde(default = "default_webhook_path")]
    #[validate(custom = "validate_route_path")]
    pub webhook_path: String,

    /// Prefix of the management routes
    #[serde(default = "default_api_prefix")]
    #[validate(custom = "validate_route_path")]
    pub api_prefix: String,

    /// Maximum accepted request body size in bytes
    #[serde(default = "default_max_body_bytes")]
    #[validate(range(min = 1024))]
    pub max_body_bytes: usize,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            webhook_path: default_webhook_path(),
            api_prefix: default_api_prefix(),
            max_body_bytes: default_max_body_bytes(),
        }
    }
}

impl ServerConfig {
    /// Socket address string for binding
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Inbound webhook configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct WebhookConfig {
    /// Shared secret for `x-chainhook-signature` verification (can use ${SECRET_KEY}).
    /// Verification is disabled when absent or empty.
    #[serde(default)]
    pub secret_key: Option<String>,

    /// Number of accepted payloads that may wait for processing
    #[serde(default = "default_queue_capacity")]
    #[validate(range(min = 1))]
    pub queue_capacity: usize,
}

impl Default for WebhookConfig {
    fn default() -> Self {
        Self {
            secret_key: None,
            queue_capacity: default_queue_capacity(),
        }
    }
}

impl WebhookConfig {
    /// The configured secret, if any and non-empty
    pub fn secret(&self) -> Option<&str> {
        self.secret_key.as_deref().filter(|s| !s.is_empty())
    }
}

/// Chainhooks management API configuration
#[derive(Debug, Clone, Serialize, Deserialize, Validate)]
pub struct ChainhooksConfig {
    /// API key (can use ${CHAINHOOKS_API_KEY})
    #[validate(length(min = 32))]
    pub api_key: String,

    /// Public URL of this relay's webhook endpoint, used when registering chainhooks
    #[validate(custom = "validate_http_url")]
    pub webhook_url: String,

    /// Stacks network (default: testnet)
    #[serde(default)]
    pub network: StacksNetwork,

    /// Override of the chainhooks API base URL
    #[serde(default)]
    #[validate(custom = "validate_http_url")]
    pub base_url: Option<String>,

    /// Request timeout in seconds
    #[serde(default = "default_timeout")]
    #[validate(range(min = 1))]
    pub timeout_seconds: u64,

    /// Retry attempts for idempotent reads
    #[serde(default = "default_retry_attempts")]
    pub retry_attempts: u32,
}

impl ChainhooksConfig {
    /// Base URL of the chainhooks API
    pub fn resolved_base_url(&self) -> &str {
        self.base_url
            .as_deref()
            .unwrap_or_else(|| self.network.default_base_url())
    }
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Default filter directive, overridden by RUST_LOG (default: "info")
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_webhook_path() -> String {
    "/api/chainhooks/webhook".to_string()
}

fn default_api_prefix() -> String {
    "/api/chainhooks".to_string()
}

fn default_max_body_bytes() -> usize {
    10 * 1024 * 1024
}

fn default_queue_capacity() -> usize {
    DEFAULT_QUEUE_CAPACITY
}

fn default_timeout() -> u64 {
    30
}

fn default_retry_attempts() -> u32 {
    3
}

fn default_log_level() -> String {
    "info".to_string()
}

fn validate_route_path(path: &str) -> Result<(), ValidationError> {
    if !path.starts_with('/') || path.len() < 2 || path.ends_with('/') {
        return Err(ValidationError::new("invalid_route_path"));
    }
    Ok(())
}

fn validate_http_url(url: &str) -> Result<(), ValidationError> {
    match url::Url::parse(url) {
        Ok(parsed) if parsed.scheme() == "http" || parsed.scheme() == "https" => Ok(()),
        _ => Err(ValidationError::new("invalid_http_url")),
    }
}
