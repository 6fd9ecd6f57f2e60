//! Inbound webhook endpoint and its health probe

use super::responses::{HealthStatus, WebhookAccepted, WebhookFailure};
use crate::chainhooks::dispatcher::EventDispatcher;
use crate::chainhooks::error::ChainhookError;
use crate::chainhooks::metrics::ChainhookMetrics;
use crate::chainhooks::models::WebhookPayload;
use crate::chainhooks::verifier::{WebhookVerifier, SIGNATURE_HEADER};
use axum::body::Bytes;
use axum::extract::State;
use axum::http::{HeaderMap, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::routing::get;
use axum::{Json, Router};
use std::sync::Arc;
use tracing::{error, info, warn};

/// State shared by the webhook routes
#[derive(Clone)]
pub struct WebhookState {
    pub verifier: Arc<WebhookVerifier>,
    pub dispatcher: EventDispatcher,
}

impl WebhookState {
    pub fn new(verifier: WebhookVerifier, dispatcher: EventDispatcher) -> Self {
        Self {
            verifier: Arc::new(verifier),
            dispatcher,
        }
    }
}

/// Webhook delivery (POST) and health probe (GET) on the same path
pub fn router(path: &str, state: WebhookState) -> Router {
    Router::new()
        .route(path, get(health).post(receive))
        .with_state(state)
}

/// Verify, parse and enqueue a delivery
async fn receive(State(state): State<WebhookState>, headers: HeaderMap, body: Bytes) -> Response {
    let metrics = ChainhookMetrics::global();
    let signature = headers
        .get(SIGNATURE_HEADER)
        .and_then(|value| value.to_str().ok());

    if !state.verifier.verify(&body, signature) {
        warn!("Rejected webhook delivery: {}", ChainhookError::AuthenticationFailure);
        metrics.record_delivery("rejected");
        return (
            StatusCode::UNAUTHORIZED,
            Json(WebhookFailure::invalid_signature()),
        )
            .into_response();
    }

    let payload: WebhookPayload = match serde_json::from_slice(&body) {
        Ok(payload) => payload,
        Err(e) => {
            let err = ChainhookError::MalformedPayload(e);
            error!("Error processing webhook: {}", err);
            metrics.record_delivery("malformed");
            return internal_error(err);
        }
    };

    info!(
        "Received chainhook '{}' ({}): {} apply block(s), {} rollback block(s)",
        payload.chainhook.name,
        payload.chainhook.uuid,
        payload.apply.len(),
        payload.rollback.len()
    );

    if let Err(err) = state.dispatcher.dispatch(payload) {
        error!("Error processing webhook: {}", err);
        metrics.record_delivery("unavailable");
        return internal_error(err);
    }

    metrics.record_delivery("accepted");
    (StatusCode::OK, Json(WebhookAccepted::new())).into_response()
}

async fn health() -> Json<HealthStatus> {
    Json(HealthStatus {
        status: "ok",
        message: "Chainhooks webhook endpoint is ready",
        timestamp: chrono::Utc::now().to_rfc3339(),
    })
}

fn internal_error(err: ChainhookError) -> Response {
    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(WebhookFailure::internal(err.to_string())),
    )
        .into_response()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::chainhooks::processor::EventProcessor;
    use crate::chainhooks::verifier::sign_payload;
    use crate::test_utils::{
        BlockBuilder, PayloadBuilder, RecordingHandler, TestHook, TransactionBuilder,
    };
    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request};
    use serde_json::{json, Value};
    use tokio::task::JoinHandle;
    use tower::ServiceExt;

    const PATH: &str = "/api/chainhooks/webhook";
    const SECRET: &str = "0123456789abcdef0123456789abcdef";

    struct Harness {
        app: Router,
        dispatcher: EventDispatcher,
        worker: JoinHandle<()>,
        handler: Arc<RecordingHandler>,
    }

    impl Harness {
        fn new(secret: Option<&str>) -> Self {
            let handler = Arc::new(RecordingHandler::new());
            let processor = Arc::new(EventProcessor::new(handler.clone()));
            let (dispatcher, worker) = EventDispatcher::spawn(processor, 16);
            let state = WebhookState::new(WebhookVerifier::from_secret(secret), dispatcher.clone());
            Self {
                app: router(PATH, state),
                dispatcher,
                worker,
                handler,
            }
        }

        async fn send(&self, body: &str, signature: Option<&str>) -> (StatusCode, Value) {
            let mut request = Request::builder()
                .method(Method::POST)
                .uri(PATH)
                .header("content-type", "application/json");
            if let Some(signature) = signature {
                request = request.header(SIGNATURE_HEADER, signature);
            }
            let request = request.body(Body::from(body.to_string())).unwrap();

            let response = self.app.clone().oneshot(request).await.unwrap();
            let status = response.status();
            let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
            (status, serde_json::from_slice(&bytes).unwrap())
        }

        /// Stop the worker after it drained every accepted payload
        async fn finish(self) -> Arc<RecordingHandler> {
            drop(self.app);
            drop(self.dispatcher);
            self.worker.await.unwrap();
            self.handler
        }
    }

    fn scenario_body() -> String {
        PayloadBuilder::new("abc", "test")
            .apply(
                BlockBuilder::new(100, "0xB")
                    .with_transaction(
                        TransactionBuilder::new("0xT")
                            .with_contract_call("SP1.foo", "transfer")
                            .build(),
                    )
                    .build(),
            )
            .to_json()
    }

    #[tokio::test]
    async fn test_signed_delivery_is_accepted_and_processed() {
        let harness = Harness::new(Some(SECRET));
        let body = scenario_body();
        let signature = sign_payload(body.as_bytes(), SECRET);

        let (status, json) = harness.send(&body, Some(&signature)).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(json, json!({"success": true, "message": "Webhook received"}));

        let handler = harness.finish().await;
        let calls = handler.contract_calls();
        assert_eq!(calls.len(), 1);
        assert_eq!(calls[0].contract_id, "SP1.foo");
        assert_eq!(calls[0].function_name, "transfer");
        assert_eq!(calls[0].block.index, 100);
    }

    #[tokio::test]
    async fn test_missing_signature_is_rejected_without_processing() {
        let harness = Harness::new(Some(SECRET));

        let (status, json) = harness.send(&scenario_body(), None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(json, json!({"error": "Invalid signature"}));

        let handler = harness.finish().await;
        assert!(handler.hooks().is_empty());
    }

    #[tokio::test]
    async fn test_signature_over_different_body_is_rejected() {
        let harness = Harness::new(Some(SECRET));
        let signature = sign_payload(b"{}", SECRET);

        let (status, _) = harness.send(&scenario_body(), Some(&signature)).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert!(harness.finish().await.hooks().is_empty());
    }

    #[tokio::test]
    async fn test_no_secret_accepts_any_header() {
        let harness = Harness::new(None);

        let (status, _) = harness.send(&scenario_body(), Some("sha256=garbage")).await;
        assert_eq!(status, StatusCode::OK);

        let handler = harness.finish().await;
        assert_eq!(handler.hooks().len(), 1);
    }

    #[tokio::test]
    async fn test_malformed_payload_returns_500() {
        let harness = Harness::new(None);

        let (status, json) = harness.send("{\"apply\": []}", None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["error"], "Internal server error");
        assert!(json["message"].as_str().unwrap().contains("Malformed payload"));

        assert!(harness.finish().await.hooks().is_empty());
    }

    #[tokio::test]
    async fn test_rollback_only_delivery() {
        let harness = Harness::new(None);
        let body = PayloadBuilder::new("abc", "test")
            .rollback(BlockBuilder::new(7, "0x7").build())
            .to_json();

        let (status, _) = harness.send(&body, None).await;
        assert_eq!(status, StatusCode::OK);

        let handler = harness.finish().await;
        assert_eq!(handler.hooks(), vec![TestHook::Rollback(7)]);
    }

    #[tokio::test]
    async fn test_stopped_worker_returns_500() {
        let harness = Harness::new(None);
        harness.worker.abort();

        let handle = &harness.worker;
        while !handle.is_finished() {
            tokio::task::yield_now().await;
        }

        let (status, json) = harness.send(&scenario_body(), None).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(json["message"], "Processing queue is closed");
    }

    #[tokio::test]
    async fn test_health() {
        let harness = Harness::new(Some(SECRET));
        let request = Request::builder().uri(PATH).body(Body::empty()).unwrap();

        let response = harness.app.clone().oneshot(request).await.unwrap();
        assert_eq!(response.status(), StatusCode::OK);

        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(json["status"], "ok");
        assert!(chrono::DateTime::parse_from_rfc3339(json["timestamp"].as_str().unwrap()).is_ok());
    }
}
