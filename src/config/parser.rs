use std::env;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;
use validator::Validate;

use super::models::RelayConfig;

/// Minimum length of a non-empty webhook secret
pub const MIN_SECRET_LENGTH: usize = 32;

/// Errors that can occur during configuration parsing
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to open config file: {0}")]
    FileError(#[from] std::io::Error),

    #[error("Failed to parse YAML: {0}")]
    ParseError(#[from] serde_yaml::Error),

    #[error("Configuration validation error: {0}")]
    ValidationError(#[from] validator::ValidationErrors),

    #[error("Configuration error: {0}")]
    Other(String),
}

/// Provides default configuration file path
pub fn default_config_path() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".chainhook-relay")
        .join("config.yaml")
}

/// Loads and validates the relay configuration
pub fn load_config<P: AsRef<Path>>(config_path: P) -> Result<RelayConfig, ConfigError> {
    let mut file = File::open(&config_path).map_err(ConfigError::FileError)?;

    let mut content = String::new();
    file.read_to_string(&mut content)
        .map_err(ConfigError::FileError)?;

    parse_config(&content)
}

/// Parses and validates configuration from YAML text
pub fn parse_config(content: &str) -> Result<RelayConfig, ConfigError> {
    let mut config: RelayConfig =
        serde_yaml::from_str(content).map_err(ConfigError::ParseError)?;

    // Secrets and URLs may reference the environment
    if let Some(secret) = config.webhook.secret_key.as_mut() {
        *secret = substitute_env_vars(secret);
    }
    if let Some(chainhooks) = config.chainhooks.as_mut() {
        chainhooks.api_key = substitute_env_vars(&chainhooks.api_key);
        chainhooks.webhook_url = substitute_env_vars(&chainhooks.webhook_url);
        if let Some(base_url) = chainhooks.base_url.as_mut() {
            *base_url = substitute_env_vars(base_url);
        }
    }

    if let Some(secret) = config.webhook.secret_key.as_deref() {
        if has_placeholder(secret) {
            return Err(ConfigError::Other(
                "webhook.secret_key references an environment variable that is not set"
                    .to_string(),
            ));
        }
        if !secret.is_empty() && secret.len() < MIN_SECRET_LENGTH {
            return Err(ConfigError::Other(format!(
                "webhook.secret_key must be at least {MIN_SECRET_LENGTH} characters"
            )));
        }
    }

    if let Some(chainhooks) = &config.chainhooks {
        if has_placeholder(&chainhooks.api_key) {
            return Err(ConfigError::Other(
                "chainhooks.api_key references an environment variable that is not set"
                    .to_string(),
            ));
        }
    }

    config.validate().map_err(ConfigError::ValidationError)?;

    let reserved = [
        config.server.api_prefix.clone(),
        format!("{}/evaluate", config.server.api_prefix),
    ];
    if config.chainhooks.is_some() && reserved.contains(&config.server.webhook_path) {
        return Err(ConfigError::Other(format!(
            "server.webhook_path '{}' collides with the management routes",
            config.server.webhook_path
        )));
    }

    if let Some(port) = config.metrics.serving_port() {
        if port == config.server.port {
            return Err(ConfigError::Other(format!(
                "metrics.port {port} conflicts with server.port"
            )));
        }
    }

    Ok(config)
}

/// Substitute environment variables in a string.
/// Format: ${VAR_NAME} is replaced with the value of VAR_NAME; unknown
/// variables are left in place.
pub fn substitute_env_vars(input: &str) -> String {
    let mut result = String::with_capacity(input.len());
    let mut rest = input;

    while let Some(start) = rest.find("${") {
        let Some(end) = rest[start..].find('}') else {
            break;
        };

        result.push_str(&rest[..start]);
        let var_name = &rest[start + 2..start + end];
        match env::var(var_name) {
            Ok(value) => result.push_str(&value),
            Err(_) => {
                debug!(
                    "Environment variable {} not found, keeping placeholder",
                    var_name
                );
                result.push_str(&rest[start..start + end + 1]);
            }
        }
        rest = &rest[start + end + 1..];
    }

    result.push_str(rest);
    result
}

fn has_placeholder(value: &str) -> bool {
    value
        .find("${")
        .is_some_and(|start| value[start..].contains('}'))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_minimal_config() {
        let config = parse_config("{}").unwrap();
        assert_eq!(config.server.port, 3000);
        assert!(config.webhook.secret().is_none());
        assert!(config.chainhooks.is_none());
    }

    #[test]
    fn test_substitute_env_vars() {
        env::set_var("CHAINHOOK_RELAY_PARSER_TEST_VAR", "value");
        assert_eq!(
            substitute_env_vars("a-${CHAINHOOK_RELAY_PARSER_TEST_VAR}-b"),
            "a-value-b"
        );
        assert_eq!(
            substitute_env_vars("${CHAINHOOK_RELAY_PARSER_MISSING}"),
            "${CHAINHOOK_RELAY_PARSER_MISSING}"
        );
        assert_eq!(
            substitute_env_vars("${CHAINHOOK_RELAY_PARSER_MISSING}/${CHAINHOOK_RELAY_PARSER_TEST_VAR}"),
            "${CHAINHOOK_RELAY_PARSER_MISSING}/value"
        );
        assert_eq!(substitute_env_vars("no vars ${unterminated"), "no vars ${unterminated");
    }

    #[test]
    fn test_webhook_path_collision() {
        let yaml = r#"
server:
  webhook_path: /api/chainhooks/evaluate
chainhooks:
  api_key: 0123456789abcdef0123456789abcdef
  webhook_url: https://relay.example.com/api/chainhooks/evaluate
"#;
        assert!(matches!(parse_config(yaml), Err(ConfigError::Other(_))));

        let yaml = "server:\n  webhook_path: /api/chainhooks/evaluate\n";
        assert!(parse_config(yaml).is_ok());
    }

    #[test]
    fn test_has_placeholder() {
        assert!(has_placeholder("${X}"));
        assert!(!has_placeholder("plain"));
        assert!(!has_placeholder("${open"));
    }
}
