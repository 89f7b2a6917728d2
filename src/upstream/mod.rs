//! Upstream subsystem.
//!
//! # Data Flow
//! ```text
//! UpstreamCall (method, path, body, mode)
//!     → client.rs (pooled keep-alive connection to the backend)
//!     → connector.rs (new sockets wait for a slot in pool.rs; TLS for https)
//!     → Unary: full body (JSON-checked)
//!     → Streaming: UpstreamStream (chunks in arrival order)
//! ```
//!
//! # Design Decisions
//! - Single backend origin, fixed at startup
//! - A slot belongs to a socket, not to a request; it is released when the
//!   socket closes
//! - No timeouts, no retries

pub mod call;
pub mod client;
pub mod connector;
pub mod pool;

pub use call::{CallMode, UpstreamCall};
pub use client::{UpstreamClient, UpstreamError, UpstreamStream};
pub use connector::{CappedConnector, CappedStream};
pub use pool::{SocketGuard, SocketPool};
