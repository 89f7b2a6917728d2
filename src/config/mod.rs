//! Configuration management subsystem.
//!
//! # Data Flow
//! ```text
//! config file (TOML, optional)
//!     → loader.rs (parse & deserialize)
//!     → environment overrides (PORT, OLLAMA_BASE_URL, CORS_ORIGIN, API_KEYS)
//!     → validation.rs (semantic checks)
//!     → ProxyConfig (validated, immutable)
//!     → passed by value into the auth gate and upstream client constructors
//! ```
//!
//! # Design Decisions
//! - Config is immutable once loaded; changes require a restart
//! - All fields have defaults to allow minimal configs
//! - Validation separates syntactic (serde) from semantic checks

pub mod loader;
pub mod schema;
pub mod validation;

pub use loader::{load, ConfigError};
pub use schema::{
    AuthConfig, CorsConfig, ListenerConfig, ObservabilityConfig, ProxyConfig, UpstreamConfig,
};
pub use validation::{validate_config, ValidationError};
