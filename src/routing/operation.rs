//! Operation table.
//!
//! Every proxied endpoint maps to exactly one backend call. Chat and
//! generate stream when the caller asks for it; everything else is unary.

use axum::body::Bytes;
use axum::http::Method;
use axum::routing::MethodFilter;
use serde::Serialize;
use serde_json::Value;

use crate::routing::request::ProxyRequest;
use crate::upstream::UpstreamCall;

/// A logical operation exposed by the gate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    Chat,
    Generate,
    Embeddings,
    ListModels,
    ShowModel,
    PullModel,
    DeleteModel,
    CopyModel,
    Version,
}

/// `{name}` body for model lifecycle calls.
#[derive(Serialize)]
struct ModelName<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    name: Option<&'a Value>,
}

#[derive(Serialize)]
struct CopyModel<'a> {
    #[serde(skip_serializing_if = "Option::is_none")]
    source: Option<&'a Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    destination: Option<&'a Value>,
}

impl Operation {
    pub const ALL: [Operation; 9] = [
        Operation::Chat,
        Operation::Generate,
        Operation::Embeddings,
        Operation::ListModels,
        Operation::ShowModel,
        Operation::PullModel,
        Operation::DeleteModel,
        Operation::CopyModel,
        Operation::Version,
    ];

    /// HTTP method, identical on the caller side and the backend side.
    pub fn method(self) -> Method {
        match self {
            Operation::ListModels | Operation::Version => Method::GET,
            Operation::DeleteModel => Method::DELETE,
            _ => Method::POST,
        }
    }

    pub fn method_filter(self) -> MethodFilter {
        match self {
            Operation::ListModels | Operation::Version => MethodFilter::GET,
            Operation::DeleteModel => MethodFilter::DELETE,
            _ => MethodFilter::POST,
        }
    }

    /// Caller-facing path, relative to the API prefix.
    pub fn route(self) -> &'static str {
        match self {
            Operation::Chat => "/chat",
            Operation::Generate => "/generate",
            Operation::Embeddings => "/embeddings",
            Operation::ListModels => "/tags",
            Operation::ShowModel => "/show",
            Operation::PullModel => "/pull",
            Operation::DeleteModel => "/delete",
            Operation::CopyModel => "/copy",
            Operation::Version => "/version",
        }
    }

    /// Path on the backend.
    pub fn upstream_path(self) -> &'static str {
        match self {
            Operation::Chat => "/api/chat",
            Operation::Generate => "/api/generate",
            Operation::Embeddings => "/api/embeddings",
            Operation::ListModels => "/api/tags",
            Operation::ShowModel => "/api/show",
            Operation::PullModel => "/api/pull",
            Operation::DeleteModel => "/api/delete",
            Operation::CopyModel => "/api/copy",
            Operation::Version => "/api/version",
        }
    }

    /// Short name for logs and metric labels.
    pub fn label(self) -> &'static str {
        match self {
            Operation::Chat => "chat",
            Operation::Generate => "generate",
            Operation::Embeddings => "embeddings",
            Operation::ListModels => "list_models",
            Operation::ShowModel => "show_model",
            Operation::PullModel => "pull_model",
            Operation::DeleteModel => "delete_model",
            Operation::CopyModel => "copy_model",
            Operation::Version => "version",
        }
    }

    /// Caller-visible message when the operation fails.
    pub fn failure_message(self) -> &'static str {
        match self {
            Operation::Chat => "Failed to process chat request",
            Operation::Generate => "Failed to process generate request",
            Operation::Embeddings => "Failed to process embeddings request",
            Operation::ListModels => "Failed to list models",
            Operation::ShowModel => "Failed to get model details",
            Operation::PullModel => "Failed to pull model",
            Operation::DeleteModel => "Failed to delete model",
            Operation::CopyModel => "Failed to copy model",
            Operation::Version => "Failed to get version information",
        }
    }

    /// Build the backend call for a request.
    pub fn plan(self, request: ProxyRequest) -> Result<UpstreamCall, serde_json::Error> {
        let method = self.method();
        let path = self.upstream_path();

        let call = match self {
            Operation::Chat | Operation::Generate if request.wants_stream() => {
                UpstreamCall::streaming(method, path, Some(request.into_raw()))
            }
            Operation::Chat | Operation::Generate | Operation::Embeddings => {
                UpstreamCall::unary(method, path, Some(request.into_raw()))
            }
            Operation::ListModels | Operation::Version => UpstreamCall::unary(method, path, None),
            Operation::ShowModel | Operation::PullModel | Operation::DeleteModel => {
                let body = serde_json::to_vec(&ModelName {
                    name: request.field("name"),
                })?;
                UpstreamCall::unary(method, path, Some(Bytes::from(body)))
            }
            Operation::CopyModel => {
                let body = serde_json::to_vec(&CopyModel {
                    source: request.field("source"),
                    destination: request.field("destination"),
                })?;
                UpstreamCall::unary(method, path, Some(Bytes::from(body)))
            }
        };
        Ok(call)
    }
}
