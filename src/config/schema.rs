//! Configuration schema definitions.
//!
//! This module defines the complete configuration structure for the gate.
//! All types derive Serde traits for deserialization from config files.

use serde::{Deserialize, Serialize};

/// Root configuration for the gate.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct ProxyConfig {
    /// Listener configuration (bind address, route prefix, body limit).
    pub listener: ListenerConfig,

    /// The single inference backend and its connection pool.
    pub upstream: UpstreamConfig,

    /// Authorized API keys.
    pub auth: AuthConfig,

    /// Cross-origin policy.
    pub cors: CorsConfig,

    /// Observability settings.
    pub observability: ObservabilityConfig,
}

/// Listener configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ListenerConfig {
    /// Bind address (e.g., "0.0.0.0:7777").
    pub bind_address: String,

    /// Prefix under which every proxied operation is mounted.
    pub api_prefix: String,

    /// Maximum accepted request body size in bytes.
    pub max_body_size: usize,
}

impl Default for ListenerConfig {
    fn default() -> Self {
        Self {
            bind_address: "0.0.0.0:7777".to_string(),
            api_prefix: "/api".to_string(),
            max_body_size: 2 * 1024 * 1024, // 2MB
        }
    }
}

/// Backend connection settings.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct UpstreamConfig {
    /// Base URL of the inference backend (e.g., "http://localhost:11434").
    pub base_url: String,

    /// Hard cap on concurrently open backend sockets.
    pub max_sockets: usize,

    /// How long an idle pooled connection is kept before closing.
    pub pool_idle_timeout_secs: u64,

    /// TCP keepalive interval for backend sockets.
    pub tcp_keepalive_secs: u64,
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:11434".to_string(),
            max_sockets: 100,
            pool_idle_timeout_secs: 90,
            tcp_keepalive_secs: 1,
        }
    }
}

/// API key configuration.
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
#[serde(default)]
pub struct AuthConfig {
    /// Keys accepted by the auth gate. Empty means every request is rejected.
    pub api_keys: Vec<String>,
}

/// Cross-origin configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CorsConfig {
    /// Allowed origin, or "*" for any.
    pub allowed_origin: String,
}

impl Default for CorsConfig {
    fn default() -> Self {
        Self {
            allowed_origin: "*".to_string(),
        }
    }
}

/// Observability configuration.
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct ObservabilityConfig {
    /// Log level (trace, debug, info, warn, error).
    pub log_level: String,

    /// Enable metrics endpoint.
    pub metrics_enabled: bool,

    /// Metrics endpoint bind address.
    pub metrics_address: String,
}

impl Default for ObservabilityConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_string(),
            metrics_enabled: false,
            metrics_address: "0.0.0.0:9090".to_string(),
        }
    }
}
