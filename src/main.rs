use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Parser;
use tracing::{error, info, warn};
use tracing_subscriber::EnvFilter;

use chainhook_relay::chainhooks::{
    ChainhooksClient, EventDispatcher, EventProcessor, WebhookVerifier,
};
use chainhook_relay::cli::{handle_hook_command, Cli, Commands};
use chainhook_relay::config::{self, ConfigError, RelayConfig};
use chainhook_relay::metrics::start_metrics_server;
use chainhook_relay::server::{self, WebhookState};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv::dotenv().ok();

    let cli = Cli::parse();

    let config_path = cli
        .config
        .clone()
        .unwrap_or_else(config::default_config_path);
    let loaded = load(&config_path, cli.config.is_some());

    // Logging level comes from the config unless RUST_LOG is set
    let level = loaded
        .as_ref()
        .map(|c| c.logging.level.clone())
        .unwrap_or_else(|_| "info".to_string());
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)),
        )
        .init();

    let config = match loaded {
        Ok(cfg) => {
            info!("Configuration loaded successfully");
            cfg
        }
        Err(e) => {
            error!("Failed to load configuration from {:?}: {}", config_path, e);
            return Err(anyhow::anyhow!("Configuration error: {}", e));
        }
    };

    match cli.command {
        Some(Commands::Hooks { command }) => {
            let chainhooks = config
                .chainhooks
                .as_ref()
                .context("The chainhooks section is required to manage chainhooks")?;
            let client = ChainhooksClient::new(chainhooks)?;
            handle_hook_command(&client, command).await
        }
        Some(Commands::Serve) | None => run(config).await,
    }
}

fn load(path: &Path, explicit: bool) -> Result<RelayConfig, ConfigError> {
    if !explicit && !path.exists() {
        return Ok(RelayConfig::default());
    }
    config::load_config(path)
}

async fn run(config: RelayConfig) -> Result<()> {
    info!("Chainhook relay starting up...");

    if let Some(port) = config.metrics.serving_port() {
        start_metrics_server(port).await?;
    }

    let verifier = WebhookVerifier::from_secret(config.webhook.secret());
    if !verifier.is_enabled() {
        warn!("No webhook secret configured, deliveries are accepted without signature verification");
    }

    let client = match &config.chainhooks {
        Some(chainhooks) => {
            info!(
                "Chainhooks API configured for {} at {}",
                chainhooks.network,
                chainhooks.resolved_base_url()
            );
            Some(Arc::new(ChainhooksClient::new(chainhooks)?))
        }
        None => None,
    };

    let processor = Arc::new(EventProcessor::log_only());
    let (dispatcher, worker) = EventDispatcher::spawn(processor, config.webhook.queue_capacity);

    let router = server::build_router(
        &config.server,
        WebhookState::new(verifier, dispatcher),
        client,
    );

    server::serve(&config.server, router, shutdown_signal()).await?;

    // The router owned the last dispatcher handle; wait for queued payloads.
    info!("Draining processing queue...");
    if let Err(e) = worker.await {
        error!("Processing worker failed: {}", e);
    }

    info!("Chainhook relay stopped");
    Ok(())
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!("Failed to listen for shutdown signal: {}", e);
        std::future::pending::<()>().await;
    }
    info!("Shutdown signal received");
}
