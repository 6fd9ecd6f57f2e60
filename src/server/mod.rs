//! HTTP surface of the relay
//!
//! The webhook path serves deliveries (POST) and a health probe (GET). When a
//! chainhooks API key is configured, management routes are mounted under the
//! API prefix.

pub mod management;
pub mod responses;
pub mod webhook;

use crate::chainhooks::client::ChainhooksClient;
use crate::config::ServerConfig;
use crate::error::Result;
use axum::extract::DefaultBodyLimit;
use axum::Router;
use std::future::Future;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::info;

pub use webhook::WebhookState;

/// Build the relay router
pub fn build_router(
    config: &ServerConfig,
    state: WebhookState,
    client: Option<Arc<ChainhooksClient>>,
) -> Router {
    let mut router = webhook::router(&config.webhook_path, state);

    if let Some(client) = client {
        info!("Management routes enabled under {}", config.api_prefix);
        router = router.merge(management::router(&config.api_prefix, client));
    }

    router.layer(DefaultBodyLimit::max(config.max_body_bytes))
}

/// Serve until `shutdown` resolves
pub async fn serve<F>(config: &ServerConfig, router: Router, shutdown: F) -> Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let listener = TcpListener::bind(config.bind_addr()).await?;
    info!(
        "Chainhook relay listening on http://{}{}",
        listener.local_addr()?,
        config.webhook_path
    );

    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown)
        .await?;

    info!("HTTP server stopped");
    Ok(())
}
