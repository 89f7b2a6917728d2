//! Outbound call description.

use axum::body::Bytes;
use axum::http::Method;

/// How the backend response is consumed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallMode {
    /// One complete JSON body.
    Unary,
    /// Open-ended byte stream handed to the relay.
    Streaming,
}

/// One request to the backend, consumed once by the upstream client.
#[derive(Debug, Clone)]
pub struct UpstreamCall {
    pub method: Method,
    /// Path on the backend, appended to the base URL.
    pub path: &'static str,
    /// JSON payload, if any. Sent byte-for-byte.
    pub body: Option<Bytes>,
    pub mode: CallMode,
}

impl UpstreamCall {
    pub fn unary(method: Method, path: &'static str, body: Option<Bytes>) -> Self {
        Self {
            method,
            path,
            body,
            mode: CallMode::Unary,
        }
    }

    pub fn streaming(method: Method, path: &'static str, body: Option<Bytes>) -> Self {
        Self {
            method,
            path,
            body,
            mode: CallMode::Streaming,
        }
    }
}
