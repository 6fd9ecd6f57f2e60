//! Management routes proxying the chainhooks API

use super::responses::ApiResponse;
use crate::chainhooks::client::{ChainhooksClient, Pagination};
use crate::chainhooks::definition::CreateChainhookParams;
use crate::chainhooks::error::ChainhookError;
use axum::body::Bytes;
use axum::extract::rejection::QueryRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Response;
use axum::routing::{get, post};
use axum::Router;
use serde::de::DeserializeOwned;
use serde::Deserialize;
use serde_json::Value;
use std::sync::Arc;
use tracing::{error, info};

type ClientState = Arc<ChainhooksClient>;

/// Routes mounted under `prefix`
pub fn router(prefix: &str, client: ClientState) -> Router {
    Router::new()
        .route(prefix, get(list).post(register))
        .route(&format!("{prefix}/evaluate"), post(evaluate))
        .route(
            &format!("{prefix}/:uuid"),
            get(fetch).put(update).delete(remove),
        )
        .route(&format!("{prefix}/:uuid/toggle"), post(toggle))
        .with_state(client)
}

#[derive(Debug, Deserialize)]
struct ToggleBody {
    enabled: Option<Value>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EvaluateBody {
    #[serde(default)]
    uuid: Option<String>,
    #[serde(default)]
    block_height: Option<u64>,
}

async fn list(
    State(client): State<ClientState>,
    query: Result<Query<Pagination>, QueryRejection>,
) -> Response {
    let pagination = match query {
        Ok(Query(pagination)) => pagination,
        Err(rejection) => return bad_request(format!("Invalid query: {}", rejection.body_text())),
    };

    match client.list(&pagination).await {
        Ok(data) => ApiResponse::ok(Some(data))
            .with_pagination(pagination)
            .respond(StatusCode::OK),
        Err(e) => remote_failure("list", "Failed to list chainhooks", e),
    }
}

async fn register(State(client): State<ClientState>, body: Bytes) -> Response {
    let params: CreateChainhookParams = match parse_body(&body) {
        Ok(params) => params,
        Err(response) => return response,
    };

    if let Err(reason) = params.validate() {
        return bad_request(reason);
    }

    match client.register(&params).await {
        Ok(registered) => {
            info!("Registered chainhook '{}' ({})", params.name, registered.uuid);
            ApiResponse::ok(serde_json::to_value(&registered).ok())
                .with_message("Chainhook registered successfully")
                .respond(StatusCode::OK)
        }
        Err(e) => remote_failure("create", "Failed to create chainhook", e),
    }
}

async fn fetch(State(client): State<ClientState>, Path(uuid): Path<String>) -> Response {
    match client.get(&uuid).await {
        Ok(data) => ApiResponse::ok(Some(data)).respond(StatusCode::OK),
        Err(e) => remote_failure("fetch", "Failed to fetch chainhook", e),
    }
}

async fn update(
    State(client): State<ClientState>,
    Path(uuid): Path<String>,
    body: Bytes,
) -> Response {
    let changes: Value = match parse_body(&body) {
        Ok(changes) => changes,
        Err(response) => return response,
    };

    match client.update(&uuid, &changes).await {
        Ok(data) => ApiResponse::ok(Some(data))
            .with_message("Chainhook updated successfully")
            .respond(StatusCode::OK),
        Err(e) => remote_failure("update", "Failed to update chainhook", e),
    }
}

async fn remove(State(client): State<ClientState>, Path(uuid): Path<String>) -> Response {
    match client.delete(&uuid).await {
        Ok(_) => {
            info!("Deleted chainhook {}", uuid);
            ApiResponse::ok(None)
                .with_message("Chainhook deleted successfully")
                .respond(StatusCode::OK)
        }
        Err(e) => remote_failure("delete", "Failed to delete chainhook", e),
    }
}

async fn toggle(
    State(client): State<ClientState>,
    Path(uuid): Path<String>,
    body: Bytes,
) -> Response {
    let body: ToggleBody = match parse_body(&body) {
        Ok(body) => body,
        Err(response) => return response,
    };

    let Some(enabled) = body.enabled.as_ref().and_then(Value::as_bool) else {
        return bad_request("Missing or invalid field: enabled (must be boolean)");
    };

    match client.set_enabled(&uuid, enabled).await {
        Ok(data) => {
            let state = if enabled { "enabled" } else { "disabled" };
            ApiResponse::ok(Some(data))
                .with_message(format!("Chainhook {state} successfully"))
                .respond(StatusCode::OK)
        }
        Err(e) => remote_failure("toggle", "Failed to toggle chainhook", e),
    }
}

async fn evaluate(State(client): State<ClientState>, body: Bytes) -> Response {
    let body: EvaluateBody = match parse_body(&body) {
        Ok(body) => body,
        Err(response) => return response,
    };

    let (Some(uuid), Some(block_height)) = (
        body.uuid.filter(|uuid| !uuid.is_empty()),
        body.block_height.filter(|height| *height > 0),
    ) else {
        return bad_request("Missing required fields: uuid, blockHeight");
    };

    match client.evaluate(&uuid, block_height).await {
        Ok(_) => ApiResponse::ok(None)
            .with_message("Chainhook evaluation completed")
            .respond(StatusCode::OK),
        Err(e) => remote_failure("evaluate", "Failed to evaluate chainhook", e),
    }
}

fn parse_body<T: DeserializeOwned>(body: &Bytes) -> Result<T, Response> {
    serde_json::from_slice(body)
        .map_err(|e| bad_request(format!("Invalid request body: {e}")))
}

fn bad_request(error: impl Into<String>) -> Response {
    ApiResponse::failure(error, None).respond(StatusCode::BAD_REQUEST)
}

fn remote_failure(action: &str, error: &str, err: ChainhookError) -> Response {
    if let ChainhookError::InvalidRequest(reason) = err {
        return bad_request(reason);
    }

    error!("Error during chainhook {}: {}", action, err);
    ApiResponse::failure(error, Some(err.to_string())).respond(StatusCode::INTERNAL_SERVER_ERROR)
}
