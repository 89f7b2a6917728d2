//! Streaming relay.
//!
//! # State Machine
//! ```text
//! Idle ──(backend head, 2xx)──▶ HeadersSent ──(chunk)──▶ Relaying ──(eof)──▶ Completed
//!   │                              │                        │
//!   └──────────────(backend error)─┴────────────────────────┴──────────────▶ Failed
//! ```
//!
//! Before headers are sent a failure becomes a JSON 500. After that the
//! caller already holds a chunked `text/event-stream` response, so the only
//! signal left is terminating the body early.
//!
//! # Design Decisions
//! - Byte-transparent: chunks go out exactly as they arrived, in order
//! - The backend reader and the caller writer are joined by an unbounded
//!   channel; there is no flow control between them
//! - A caller that disconnects is detected as a failed send; the backend
//!   stream is then drained and discarded, not aborted

use std::io;

use axum::{
    body::{Body, Bytes},
    http::{header, response::Builder, HeaderValue, StatusCode},
    response::{IntoResponse, Response},
};
use futures_util::Stream;
use tokio::sync::mpsc;

use crate::http::error::ApiError;
use crate::observability::metrics;
use crate::routing::Operation;
use crate::upstream::{UpstreamCall, UpstreamClient, UpstreamError, UpstreamStream};

/// Where a streaming exchange currently is.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Idle,
    HeadersSent,
    Relaying,
    Completed,
    Failed,
}

impl SessionState {
    pub fn is_terminal(self) -> bool {
        matches!(self, SessionState::Completed | SessionState::Failed)
    }
}

/// What to do with a failure.
#[derive(Debug)]
pub enum Failure {
    /// Headers not sent yet: answer with this structured error.
    Respond(Response),
    /// Headers already sent: cut the caller stream.
    Terminate,
}

/// Runtime state of one caller ↔ backend stream.
#[derive(Debug)]
pub struct StreamSession {
    operation: Operation,
    state: SessionState,
    headers_sent: bool,
}

impl StreamSession {
    pub fn new(operation: Operation) -> Self {
        Self {
            operation,
            state: SessionState::Idle,
            headers_sent: false,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn headers_sent(&self) -> bool {
        self.headers_sent
    }

    /// Idle → HeadersSent. Returns the response head for the caller.
    pub fn commit_headers(&mut self) -> Builder {
        self.headers_sent = true;
        if self.state == SessionState::Idle {
            self.state = SessionState::HeadersSent;
        }
        Response::builder()
            .status(StatusCode::OK)
            .header(header::CONTENT_TYPE, HeaderValue::from_static("text/event-stream"))
            .header(header::CACHE_CONTROL, HeaderValue::from_static("no-cache, no-transform"))
            .header("x-accel-buffering", HeaderValue::from_static("no"))
    }

    /// A backend chunk arrived.
    pub fn record_chunk(&mut self) {
        if self.state == SessionState::HeadersSent {
            self.state = SessionState::Relaying;
        }
    }

    /// Backend reached end of stream.
    pub fn complete(&mut self) {
        if !self.state.is_terminal() {
            self.state = SessionState::Completed;
        }
    }

    /// Backend failed. `headers_sent` decides whether a structured error is still possible.
    pub fn fail(&mut self, error: UpstreamError) -> Failure {
        let before = self.state;
        self.state = SessionState::Failed;

        if self.headers_sent {
            tracing::warn!(
                operation = self.operation.label(),
                state = ?before,
                error = %error,
                "Backend stream failed after headers were sent, terminating caller stream"
            );
            Failure::Terminate
        } else {
            tracing::error!(
                operation = self.operation.label(),
                error = %error,
                "Backend stream failed before headers were sent"
            );
            Failure::Respond(ApiError::upstream(self.operation, error).into_response())
        }
    }
}

/// Run one streaming exchange and produce the caller response.
pub async fn relay(client: &UpstreamClient, operation: Operation, call: UpstreamCall) -> Response {
    let mut session = StreamSession::new(operation);

    let upstream = match client.open_stream(call).await {
        Ok(stream) => stream,
        Err(error) => return failure_response(session.fail(error)),
    };

    let (tx, rx) = mpsc::unbounded_channel();
    let response = match session.commit_headers().body(Body::from_stream(receiver_stream(rx))) {
        Ok(response) => response,
        Err(e) => {
            tracing::error!(operation = operation.label(), error = %e, "Failed to build stream response");
            return StatusCode::INTERNAL_SERVER_ERROR.into_response();
        }
    };

    tokio::spawn(pump(session, upstream, tx));
    response
}

fn failure_response(failure: Failure) -> Response {
    match failure {
        Failure::Respond(response) => response,
        Failure::Terminate => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
    }
}

type Chunk = Result<Bytes, io::Error>;

fn receiver_stream(rx: mpsc::UnboundedReceiver<Chunk>) -> impl Stream<Item = Chunk> + Send + 'static {
    futures_util::stream::unfold(rx, |mut rx| async move {
        rx.recv().await.map(|chunk| (chunk, rx))
    })
}

/// Copy backend chunks to the caller until the backend finishes.
async fn pump(
    mut session: StreamSession,
    mut upstream: UpstreamStream,
    tx: mpsc::UnboundedSender<Chunk>,
) {
    let operation = session.operation.label();
    let mut caller_gone = false;
    let mut relayed = 0usize;
    let mut discarded = 0usize;

    while let Some(next) = upstream.next_chunk().await {
        match next {
            Ok(chunk) => {
                session.record_chunk();
                if caller_gone {
                    discarded += chunk.len();
                    continue;
                }
                let len = chunk.len();
                if tx.send(Ok(chunk)).is_err() {
                    tracing::warn!(operation, relayed, "Caller disconnected mid-stream, discarding remaining backend output");
                    caller_gone = true;
                    discarded += len;
                } else {
                    relayed += len;
                }
            }
            Err(error) => {
                if let Failure::Terminate = session.fail(error) {
                    let _ = tx.send(Err(io::Error::other("upstream stream failed")));
                }
                metrics::record_stream(operation, "failed");
                return;
            }
        }
    }

    session.complete();
    tracing::debug!(operation, relayed, discarded, "Stream completed");
    metrics::record_stream(operation, if caller_gone { "caller_gone" } else { "completed" });
}
