#[cfg(test)]
mod tests {
    use std::io::Write;
    use tempfile::NamedTempFile;
    use crate::chainhooks::definition::StacksNetwork;
    use crate::config::parser::{load_config, ConfigError};

    // Helper function to create a temporary file with content
    fn create_temp_file(content: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("Failed to create temp file");
        file.write_all(content.as_bytes()).expect("Failed to write to temp file");
        file.flush().expect("Failed to flush temp file");
        file
    }

    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    #[test]
    fn test_valid_configuration() {
        let config_yaml = format!(
            r#"
        server:
          host: 127.0.0.1
          port: 8080
          webhook_path: /hooks/stacks
          api_prefix: /admin/chainhooks
        webhook:
          secret_key: {SECRET}
          queue_capacity: 64
        chainhooks:
          api_key: {SECRET}
          webhook_url: https://relay.example.com/hooks/stacks
          network: mainnet
          timeout_seconds: 10
          retry_attempts: 5
        metrics:
          enabled: true
          port: 9100
        logging:
          level: debug
        "#
        );

        let temp_file = create_temp_file(&config_yaml);
        let config = load_config(temp_file.path()).expect("Failed to load valid config");

        assert_eq!(config.server.bind_addr(), "127.0.0.1:8080");
        assert_eq!(config.server.webhook_path, "/hooks/stacks");
        assert_eq!(config.server.api_prefix, "/admin/chainhooks");
        assert_eq!(config.webhook.secret(), Some(SECRET));
        assert_eq!(config.webhook.queue_capacity, 64);

        let chainhooks = config.chainhooks.expect("chainhooks section");
        assert_eq!(chainhooks.network, StacksNetwork::Mainnet);
        assert_eq!(chainhooks.resolved_base_url(), "https://api.mainnet.hiro.so");
        assert_eq!(chainhooks.timeout_seconds, 10);
        assert_eq!(chainhooks.retry_attempts, 5);

        assert_eq!(config.metrics.serving_port(), Some(9100));
        assert_eq!(config.logging.level, "debug");
    }

    #[test]
    fn test_minimal_valid_configuration() {
        let temp_file = create_temp_file("webhook: {}\n");
        let config = load_config(temp_file.path()).expect("Failed to load minimal config");

        assert_eq!(config.server.port, 3000);
        assert!(config.webhook.secret().is_none());
        assert!(config.chainhooks.is_none());
        assert_eq!(config.metrics.port, 9090);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_secret_from_environment() {
        std::env::set_var("CHAINHOOK_RELAY_TEST_SECRET", SECRET);
        let temp_file = create_temp_file(
            r#"
        webhook:
          secret_key: ${CHAINHOOK_RELAY_TEST_SECRET}
        "#,
        );

        let config = load_config(temp_file.path()).expect("Failed to load config");
        assert_eq!(config.webhook.secret(), Some(SECRET));
    }

    #[test]
    fn test_unset_secret_variable() {
        let temp_file = create_temp_file(
            r#"
        webhook:
          secret_key: ${CHAINHOOK_RELAY_TEST_UNSET_SECRET}
        "#,
        );

        let result = load_config(temp_file.path());
        assert!(matches!(result, Err(ConfigError::Other(_))));
    }

    #[test]
    fn test_short_secret() {
        let temp_file = create_temp_file(
            r#"
        webhook:
          secret_key: too-short
        "#,
        );

        let result = load_config(temp_file.path());
        assert!(matches!(result, Err(ConfigError::Other(_))));
        if let Err(ConfigError::Other(err)) = result {
            assert!(err.contains("at least 32"));
        }
    }

    #[test]
    fn test_empty_secret_disables_verification() {
        let temp_file = create_temp_file(
            r#"
        webhook:
          secret_key: ""
        "#,
        );

        let config = load_config(temp_file.path()).expect("Failed to load config");
        assert!(config.webhook.secret().is_none());
    }

    #[test]
    fn test_short_api_key() {
        let temp_file = create_temp_file(
            r#"
        chainhooks:
          api_key: short
          webhook_url: https://relay.example.com/api/chainhooks/webhook
        "#,
        );

        let result = load_config(temp_file.path());
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_invalid_webhook_url() {
        let config_yaml = format!(
            r#"
        chainhooks:
          api_key: {SECRET}
          webhook_url: not-a-url
        "#
        );

        let temp_file = create_temp_file(&config_yaml);
        let result = load_config(temp_file.path());
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_invalid_route_path() {
        let temp_file = create_temp_file(
            r#"
        server:
          webhook_path: webhook
        "#,
        );

        let result = load_config(temp_file.path());
        assert!(matches!(result, Err(ConfigError::ValidationError(_))));
    }

    #[test]
    fn test_metrics_port_conflict() {
        let temp_file = create_temp_file(
            r#"
        server:
          port: 9090
        "#,
        );

        let result = load_config(temp_file.path());
        assert!(matches!(result, Err(ConfigError::Other(_))));

        let temp_file = create_temp_file(
            r#"
        server:
          port: 9090
        metrics:
          enabled: false
        "#,
        );
        assert!(load_config(temp_file.path()).is_ok());
    }

    #[test]
    fn test_unknown_network() {
        let config_yaml = format!(
            r#"
        chainhooks:
          api_key: {SECRET}
          webhook_url: https://relay.example.com/api/chainhooks/webhook
          network: devnet
        "#
        );

        let temp_file = create_temp_file(&config_yaml);
        let result = load_config(temp_file.path());
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_invalid_yaml() {
        let temp_file = create_temp_file("server: [unclosed");
        let result = load_config(temp_file.path());
        assert!(matches!(result, Err(ConfigError::ParseError(_))));
    }

    #[test]
    fn test_missing_file() {
        let result = load_config("/nonexistent/chainhook-relay/config.yaml");
        assert!(matches!(result, Err(ConfigError::FileError(_))));
    }
}
