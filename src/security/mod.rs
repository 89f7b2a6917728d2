//! Security subsystem.
//!
//! # Data Flow
//! ```text
//! Incoming request (headers + parsed body):
//!     → auth.rs (extract key: x-api-key > Authorization > body apiKey)
//!     → credentials.rs (membership test)
//!     → Pass to routing, or terminal 401
//! ```
//!
//! # Design Decisions
//! - Fail closed: an empty credential set rejects every request
//! - No trust in client input

pub mod auth;
pub mod credentials;

pub use auth::{AuthError, AuthGate, KeySource};
pub use credentials::CredentialSet;
