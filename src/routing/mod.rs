//! Routing subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming body bytes
//!     → request.rs (verbatim bytes + best-effort JSON view)
//!     → operation.rs (operation → method, backend path, body shape, mode)
//!     → Return: UpstreamCall
//! ```
//!
//! # Design Decisions
//! - Operation table is fixed at compile time
//! - Bodies are forwarded verbatim except for model lifecycle calls,
//!   which are narrowed to `{name}` or `{source, destination}`
//! - Only an explicit `"stream": true` selects streaming

pub mod operation;
pub mod request;

pub use operation::Operation;
pub use request::ProxyRequest;
