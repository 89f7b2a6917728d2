//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, CORS, request ID, trace span, body limit)
//!     → handlers.rs (auth gate → operation plan)
//!         → unary: upstream client → JSON pass-through
//!         → streaming: relay.rs (header commit, chunk relay)
//!     → error.rs (structured errors while headers are unsent)
//!     → Send to client
//! ```

pub mod error;
pub mod handlers;
pub mod relay;
pub mod request;
pub mod server;

pub use error::ApiError;
pub use relay::{SessionState, StreamSession};
pub use request::{UuidRequestId, X_REQUEST_ID};
pub use server::{AppState, HttpServer};
