//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with all handlers
//! - Wire up middleware (tracing, request ID, CORS, body limit)
//! - Bind server to listener
//! - Dispatch requests through the auth gate to the upstream client

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::{Body, Bytes},
    extract::{DefaultBodyLimit, State},
    http::{header, HeaderMap, HeaderName, HeaderValue, Method, Request},
    routing::{get, on},
    Router,
};
use tokio::net::TcpListener;
use tokio::sync::broadcast;
use tower::ServiceBuilder;
use tower_http::{
    cors::{AllowOrigin, Any, CorsLayer},
    request_id::{PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::config::{CorsConfig, ProxyConfig};
use crate::http::handlers;
use crate::http::request::{request_id, UuidRequestId, X_REQUEST_ID};
use crate::routing::Operation;
use crate::security::{AuthGate, CredentialSet};
use crate::upstream::{UpstreamClient, UpstreamError};

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub gate: Arc<AuthGate>,
    pub upstream: UpstreamClient,
}

/// HTTP server for the gate.
pub struct HttpServer {
    router: Router,
    config: ProxyConfig,
    upstream: UpstreamClient,
}

impl HttpServer {
    /// Create a new HTTP server with the given configuration.
    pub fn new(config: ProxyConfig) -> Result<Self, UpstreamError> {
        let credentials = CredentialSet::new(config.auth.api_keys.iter().cloned());
        if credentials.is_empty() {
            tracing::warn!("No API keys configured, every proxied request will be rejected");
        }

        let upstream = UpstreamClient::new(&config.upstream)?;
        let state = AppState {
            gate: Arc::new(AuthGate::new(credentials)),
            upstream: upstream.clone(),
        };

        let router = Self::build_router(&config, state);
        Ok(Self {
            router,
            config,
            upstream,
        })
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(config: &ProxyConfig, state: AppState) -> Router {
        let mut api = Router::new();
        for operation in Operation::ALL {
            api = api.route(
                operation.route(),
                on(
                    operation.method_filter(),
                    move |state: State<AppState>, headers: HeaderMap, body: Bytes| {
                        handlers::operation_handler(operation, state, headers, body)
                    },
                ),
            );
        }

        let app = Router::new().route("/health", get(handlers::health));
        let prefix = config.listener.api_prefix.trim_end_matches('/');
        let app = if prefix.is_empty() {
            app.merge(api)
        } else {
            app.nest(prefix, api)
        };

        app.fallback(handlers::not_found)
            .with_state(state)
            .layer(DefaultBodyLimit::max(config.listener.max_body_size))
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::new(X_REQUEST_ID, UuidRequestId))
                    .layer(TraceLayer::new_for_http().make_span_with(|req: &Request<Body>| {
                        tracing::info_span!(
                            "request",
                            request_id = %request_id(req),
                            method = %req.method(),
                            uri = %req.uri(),
                        )
                    }))
                    .layer(PropagateRequestIdLayer::new(X_REQUEST_ID))
                    .layer(build_cors(&config.cors)),
            )
    }

    /// The fully layered router, for serving or in-process testing.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Run the server until the shutdown signal fires.
    pub async fn run(
        self,
        listener: TcpListener,
        mut shutdown: broadcast::Receiver<()>,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(
            address = %addr,
            upstream = %self.upstream.base_url(),
            max_sockets = self.upstream.pool().capacity(),
            api_prefix = %self.config.listener.api_prefix,
            "HTTP server starting"
        );

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                let _ = shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }

    /// The shared upstream client (and its socket pool).
    pub fn upstream(&self) -> &UpstreamClient {
        &self.upstream
    }
}

/// Build the cross-origin layer. Credentials are only allowed for a concrete origin.
fn build_cors(config: &CorsConfig) -> CorsLayer {
    let base = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            HeaderName::from_static("x-api-key"),
            header::AUTHORIZATION,
            HeaderName::from_static("x-requested-with"),
        ])
        .expose_headers([header::CONTENT_LENGTH, header::CONTENT_TYPE])
        .max_age(Duration::from_secs(86400));

    if config.allowed_origin == "*" {
        return base.allow_origin(Any);
    }

    match HeaderValue::from_str(&config.allowed_origin) {
        Ok(origin) => base
            .allow_origin(AllowOrigin::exact(origin))
            .allow_credentials(true),
        Err(_) => {
            tracing::warn!(origin = %config.allowed_origin, "Invalid CORS origin, allowing any");
            base.allow_origin(Any)
        }
    }
}
