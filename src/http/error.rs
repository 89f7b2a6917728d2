//! Error mapping to caller-visible responses.
//!
//! # Design Decisions
//! - Body is always `{"error": "<message>"}`
//! - Auth failures are 401, everything else 500
//! - Upstream detail is logged, never returned

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

use crate::routing::Operation;
use crate::security::AuthError;
use crate::upstream::UpstreamError;

/// JSON error body.
#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub error: &'static str,
}

/// Any failure that ends a request with a structured response.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("{} failed: {source}", .operation.label())]
    Upstream {
        operation: Operation,
        source: UpstreamError,
    },

    #[error("{} failed to encode backend body: {source}", .operation.label())]
    Encode {
        operation: Operation,
        source: serde_json::Error,
    },
}

impl ApiError {
    pub fn upstream(operation: Operation, source: UpstreamError) -> Self {
        ApiError::Upstream { operation, source }
    }

    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Auth(_) => StatusCode::UNAUTHORIZED,
            ApiError::Upstream { .. } | ApiError::Encode { .. } => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Message shown to the caller.
    pub fn public_message(&self) -> &'static str {
        match self {
            ApiError::Auth(AuthError::MissingKey) => "API key is required",
            ApiError::Auth(AuthError::InvalidKey) => "Invalid API key",
            ApiError::Upstream { operation, .. } | ApiError::Encode { operation, .. } => {
                operation.failure_message()
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        (
            self.status(),
            Json(ErrorBody {
                error: self.public_message(),
            }),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn auth_errors_are_401() {
        let response = ApiError::from(AuthError::MissingKey).into_response();
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({"error": "API key is required"})
        );

        let response = ApiError::from(AuthError::InvalidKey).into_response();
        assert_eq!(
            body_json(response).await,
            serde_json::json!({"error": "Invalid API key"})
        );
    }

    #[tokio::test]
    async fn upstream_detail_is_not_leaked() {
        let err = ApiError::upstream(
            Operation::Embeddings,
            UpstreamError::Status(StatusCode::NOT_FOUND),
        );
        assert!(err.to_string().contains("404"));

        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({"error": "Failed to process embeddings request"})
        );
    }
}
