//! Request pipeline.
//!
//! Each proxied request runs the same explicit sequence:
//! auth gate → operation plan → unary call or stream relay. Any stage may
//! end the request with a terminal response; nothing is shared between
//! stages except the values passed along.

use std::time::Instant;

use axum::{
    body::{Body, Bytes},
    extract::State,
    http::{header, HeaderMap, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde_json::{json, Value};

use crate::http::error::ApiError;
use crate::http::relay;
use crate::http::server::AppState;
use crate::observability::metrics;
use crate::routing::{Operation, ProxyRequest};
use crate::upstream::CallMode;

/// Entry point for every proxied operation.
pub async fn handle(state: &AppState, operation: Operation, headers: &HeaderMap, body: Bytes) -> Response {
    let start = Instant::now();
    let request = ProxyRequest::from_bytes(body);

    let response = match run(state, operation, headers, request).await {
        Ok(response) => response,
        Err(error) => {
            match &error {
                ApiError::Auth(reason) => {
                    tracing::warn!(operation = operation.label(), reason = reason.reason(), "Request rejected");
                    metrics::record_auth_rejection(reason.reason());
                }
                other => {
                    tracing::error!(operation = operation.label(), error = %other, "Request failed");
                }
            }
            error.into_response()
        }
    };

    metrics::record_request(operation.label(), response.status().as_u16(), start);
    response
}

async fn run(
    state: &AppState,
    operation: Operation,
    headers: &HeaderMap,
    request: ProxyRequest,
) -> Result<Response, ApiError> {
    state.gate.authorize(headers, request.json())?;

    tracing::debug!(
        operation = operation.label(),
        model = request.model().unwrap_or("-"),
        stream = request.wants_stream(),
        "Forwarding request"
    );

    let call = operation
        .plan(request)
        .map_err(|source| ApiError::Encode { operation, source })?;

    match call.mode {
        CallMode::Unary => {
            let body = state
                .upstream
                .send(call)
                .await
                .map_err(|source| ApiError::upstream(operation, source))?;
            Ok(json_response(body))
        }
        CallMode::Streaming => Ok(relay::relay(&state.upstream, operation, call).await),
    }
}

/// Backend JSON, passed through byte for byte.
fn json_response(body: Bytes) -> Response {
    let mut response = Response::new(Body::from(body));
    response
        .headers_mut()
        .insert(header::CONTENT_TYPE, HeaderValue::from_static("application/json"));
    response
}

/// Liveness probe. Outside the auth gate.
pub async fn health() -> Json<Value> {
    Json(json!({ "status": "ok" }))
}

/// Fallback for unknown paths.
pub async fn not_found() -> impl IntoResponse {
    (StatusCode::NOT_FOUND, Json(json!({ "error": "Not found" })))
}

/// Axum-facing handler; the router binds `operation` per route.
pub(crate) async fn operation_handler(
    operation: Operation,
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    handle(&state, operation, &headers, body).await
}
