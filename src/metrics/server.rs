use axum::http::{header, StatusCode};
use axum::response::IntoResponse;
use axum::routing::get;
use axum::Router;
use prometheus::{Encoder, TextEncoder};
use std::net::SocketAddr;
use tokio::net::TcpListener;
use tracing::{error, info};

use crate::error::Result;

/// Router exposing the default Prometheus registry at /metrics
pub fn metrics_router() -> Router {
    Router::new().route("/metrics", get(render_metrics))
}

/// Start the Prometheus metrics server in the background
pub async fn start_metrics_server(port: u16) -> Result<()> {
    let addr = SocketAddr::from(([0, 0, 0, 0], port));
    let listener = TcpListener::bind(addr).await?;

    info!(
        "Starting Prometheus metrics server on http://{}/metrics",
        addr
    );

    tokio::spawn(async move {
        if let Err(e) = axum::serve(listener, metrics_router()).await {
            error!("Metrics server error: {}", e);
        }
    });

    Ok(())
}

async fn render_metrics() -> impl IntoResponse {
    let encoder = TextEncoder::new();
    let metric_families = prometheus::gather();
    let mut buffer = Vec::new();

    match encoder.encode(&metric_families, &mut buffer) {
        Ok(()) => (
            StatusCode::OK,
            [(header::CONTENT_TYPE, encoder.format_type().to_string())],
            buffer,
        )
            .into_response(),
        Err(e) => {
            error!("Failed to encode metrics: {}", e);
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chainhooks::metrics::ChainhookMetrics;
    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tower::ServiceExt;

    #[tokio::test]
    async fn test_metrics_endpoint_renders_registry() {
        ChainhookMetrics::global().record_delivery("accepted");

        let request = Request::builder().uri("/metrics").body(Body::empty()).unwrap();
        let response = metrics_router().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let text = String::from_utf8(bytes.to_vec()).unwrap();
        assert!(text.contains("chainhook_relay_deliveries_total"));
    }
}
