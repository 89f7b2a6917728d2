//! Pooled HTTP client for the inference backend.
//!
//! # Responsibilities
//! - Own the persistent connection pool and the backend base URL
//! - Send unary calls and return the complete JSON body
//! - Open streaming calls and hand back a live byte source
//!
//! # Design Decisions
//! - One client per process, shared by every request
//! - `http` and `https` backends share one pool and one socket cap
//! - No per-call timeout or retry: a hung backend hangs its caller
//! - Bodies are never inspected beyond a JSON well-formedness check on
//!   unary responses

use std::time::Duration;

use axum::body::{Body, BodyDataStream, Bytes};
use axum::http::{header, Request, Response, StatusCode, Uri};
use futures_util::StreamExt;
use hyper::body::Incoming;
use hyper_rustls::{HttpsConnector, HttpsConnectorBuilder};
use hyper_util::{
    client::legacy::{connect::HttpConnector, Client},
    rt::TokioExecutor,
};
use serde::de::IgnoredAny;
use thiserror::Error;

use crate::config::UpstreamConfig;
use crate::upstream::call::UpstreamCall;
use crate::upstream::connector::CappedConnector;
use crate::upstream::pool::SocketPool;

/// Failures talking to the backend.
#[derive(Debug, Error)]
pub enum UpstreamError {
    #[error("invalid upstream URI `{0}`")]
    InvalidUri(String),

    #[error("failed to build upstream request: {0}")]
    Request(#[from] axum::http::Error),

    #[error("backend unreachable: {0}")]
    Connect(#[from] hyper_util::client::legacy::Error),

    #[error("backend returned {0}")]
    Status(StatusCode),

    #[error("failed reading backend body: {0}")]
    Body(#[source] axum::Error),

    #[error("backend returned malformed JSON: {0}")]
    Malformed(#[from] serde_json::Error),

    #[error("failed to set up TLS: {0}")]
    Tls(#[from] rustls::Error),
}

/// Shared client bound to one backend origin.
#[derive(Debug, Clone)]
pub struct UpstreamClient {
    base_url: String,
    client: Client<HttpsConnector<CappedConnector>, Body>,
    pool: SocketPool,
}

impl UpstreamClient {
    /// Create a client from validated upstream settings.
    pub fn new(config: &UpstreamConfig) -> Result<Self, UpstreamError> {
        let mut tcp = HttpConnector::new();
        tcp.set_keepalive(Some(Duration::from_secs(config.tcp_keepalive_secs)));
        tcp.set_nodelay(true);
        // TLS is layered on top, so the connector must accept https URIs.
        tcp.enforce_http(false);

        let pool = SocketPool::new(config.max_sockets);
        let connector = HttpsConnectorBuilder::new()
            .with_provider_and_webpki_roots(rustls::crypto::ring::default_provider())?
            .https_or_http()
            .enable_http1()
            .wrap_connector(CappedConnector::new(tcp, pool.clone()));

        let client = Client::builder(TokioExecutor::new())
            .pool_idle_timeout(Duration::from_secs(config.pool_idle_timeout_secs))
            .pool_max_idle_per_host(config.max_sockets)
            .build(connector);

        Ok(Self {
            base_url: config.base_url.trim_end_matches('/').to_string(),
            client,
            pool,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// The socket cap shared by every connection to the backend.
    pub fn pool(&self) -> &SocketPool {
        &self.pool
    }

    /// Send a unary call and return the backend body unchanged.
    pub async fn send(&self, call: UpstreamCall) -> Result<Bytes, UpstreamError> {
        let path = call.path;
        let response = self.dispatch(call).await?;
        let status = response.status();

        // Read the body even on error so the connection returns to the pool.
        let body = axum::body::to_bytes(Body::new(response.into_body()), usize::MAX)
            .await
            .map_err(UpstreamError::Body)?;

        if !status.is_success() {
            tracing::debug!(
                path,
                status = %status,
                body = %String::from_utf8_lossy(&body),
                "Backend rejected call"
            );
            return Err(UpstreamError::Status(status));
        }

        serde_json::from_slice::<IgnoredAny>(&body)?;
        Ok(body)
    }

    /// Open a streaming call. Resolves once the backend response head arrives.
    pub async fn open_stream(&self, call: UpstreamCall) -> Result<UpstreamStream, UpstreamError> {
        let path = call.path;
        let response = self.dispatch(call).await?;
        let status = response.status();

        if !status.is_success() {
            tracing::debug!(path, status = %status, "Backend rejected streaming call");
            return Err(UpstreamError::Status(status));
        }

        Ok(UpstreamStream {
            body: Body::new(response.into_body()).into_data_stream(),
        })
    }

    async fn dispatch(&self, call: UpstreamCall) -> Result<Response<Incoming>, UpstreamError> {
        let target = format!("{}{}", self.base_url, call.path);
        let uri: Uri = target
            .parse()
            .map_err(|_| UpstreamError::InvalidUri(target.clone()))?;

        let mut builder = Request::builder().method(call.method).uri(uri);
        let body = match call.body {
            Some(bytes) => {
                builder = builder.header(header::CONTENT_TYPE, "application/json");
                Body::from(bytes)
            }
            None => Body::empty(),
        };
        let request = builder.body(body)?;

        Ok(self.client.request(request).await?)
    }
}

/// Live byte source for one streaming call.
///
/// The backend socket stays checked out of the pool until the stream ends
/// or is dropped.
pub struct UpstreamStream {
    body: BodyDataStream,
}

impl UpstreamStream {
    /// Next chunk as the backend sent it. `None` at end of stream.
    pub async fn next_chunk(&mut self) -> Option<Result<Bytes, UpstreamError>> {
        self.body
            .next()
            .await
            .map(|chunk| chunk.map_err(UpstreamError::Body))
    }

    /// Drop the backend connection without reading the rest of the stream.
    pub fn abort(self) {
        tracing::debug!("Aborting upstream stream");
    }
}

impl std::fmt::Debug for UpstreamStream {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UpstreamStream").finish_non_exhaustive()
    }
}
