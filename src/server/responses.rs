//! JSON envelopes returned by the HTTP routes

use crate::chainhooks::client::Pagination;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::Value;

/// Body of a successful webhook delivery
#[derive(Debug, Serialize)]
pub struct WebhookAccepted {
    pub success: bool,
    pub message: &'static str,
}

impl WebhookAccepted {
    pub fn new() -> Self {
        Self {
            success: true,
            message: "Webhook received",
        }
    }
}

impl Default for WebhookAccepted {
    fn default() -> Self {
        Self::new()
    }
}

/// Body of a rejected or failed webhook delivery
#[derive(Debug, Serialize)]
pub struct WebhookFailure {
    pub error: &'static str,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl WebhookFailure {
    pub fn invalid_signature() -> Self {
        Self {
            error: "Invalid signature",
            message: None,
        }
    }

    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            error: "Internal server error",
            message: Some(message.into()),
        }
    }
}

/// Health probe body
#[derive(Debug, Serialize)]
pub struct HealthStatus {
    pub status: &'static str,
    pub message: &'static str,
    pub timestamp: String,
}

/// Envelope of the management routes
#[derive(Debug, Default, Serialize)]
pub struct ApiResponse {
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pagination: Option<Pagination>,
}

impl ApiResponse {
    pub fn ok(data: Option<Value>) -> Self {
        Self {
            success: true,
            data,
            ..Default::default()
        }
    }

    pub fn failure(error: impl Into<String>, message: Option<String>) -> Self {
        Self {
            success: false,
            error: Some(error.into()),
            message,
            ..Default::default()
        }
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    pub fn with_pagination(mut self, pagination: Pagination) -> Self {
        self.pagination = Some(pagination);
        self
    }

    pub fn respond(self, status: StatusCode) -> Response {
        (status, Json(self)).into_response()
    }
}

impl IntoResponse for ApiResponse {
    fn into_response(self) -> Response {
        let status = if self.success {
            StatusCode::OK
        } else {
            StatusCode::INTERNAL_SERVER_ERROR
        };
        self.respond(status)
    }
}
