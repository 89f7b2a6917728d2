//! Configuration validation.
//!
//! # Responsibilities
//! - Semantic validation (serde handles syntactic)
//! - Validate addresses, URLs and value ranges
//!
//! # Design Decisions
//! - Returns all validation errors, not just first
//! - Validation is pure function: ProxyConfig → Result<(), Vec<ValidationError>>
//! - Runs before config is accepted into the system

use std::net::SocketAddr;

use axum::http::HeaderValue;
use thiserror::Error;
use url::Url;

use crate::config::schema::ProxyConfig;

/// A single semantic problem found in a configuration.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ValidationError {
    #[error("listener.bind_address `{0}` is not a socket address")]
    BindAddress(String),

    #[error("listener.api_prefix `{0}` must start with '/'")]
    ApiPrefix(String),

    #[error("listener.max_body_size must be greater than zero")]
    BodyLimit,

    #[error("upstream.base_url `{0}` is not a valid URL")]
    BaseUrl(String),

    #[error("upstream.base_url scheme `{0}` is not supported (use http or https)")]
    BaseUrlScheme(String),

    #[error("upstream.max_sockets must be greater than zero")]
    SocketCap,

    #[error("cors.allowed_origin `{0}` is not a valid header value")]
    CorsOrigin(String),

    #[error("observability.metrics_address `{0}` is not a socket address")]
    MetricsAddress(String),
}

/// Check a configuration, collecting every violation.
pub fn validate_config(config: &ProxyConfig) -> Result<(), Vec<ValidationError>> {
    let mut errors = Vec::new();

    if config.listener.bind_address.parse::<SocketAddr>().is_err() {
        errors.push(ValidationError::BindAddress(config.listener.bind_address.clone()));
    }
    let prefix = &config.listener.api_prefix;
    if !prefix.starts_with('/') {
        errors.push(ValidationError::ApiPrefix(prefix.clone()));
    }
    if config.listener.max_body_size == 0 {
        errors.push(ValidationError::BodyLimit);
    }

    match Url::parse(&config.upstream.base_url) {
        Ok(url) if !matches!(url.scheme(), "http" | "https") => {
            errors.push(ValidationError::BaseUrlScheme(url.scheme().to_string()));
        }
        Ok(url) if url.host_str().is_none() => {
            errors.push(ValidationError::BaseUrl(config.upstream.base_url.clone()));
        }
        Ok(_) => {}
        Err(_) => errors.push(ValidationError::BaseUrl(config.upstream.base_url.clone())),
    }
    if config.upstream.max_sockets == 0 {
        errors.push(ValidationError::SocketCap);
    }

    let origin = &config.cors.allowed_origin;
    if origin != "*" && HeaderValue::from_str(origin).is_err() {
        errors.push(ValidationError::CorsOrigin(origin.clone()));
    }

    if config.observability.metrics_enabled
        && config.observability.metrics_address.parse::<SocketAddr>().is_err()
    {
        errors.push(ValidationError::MetricsAddress(
            config.observability.metrics_address.clone(),
        ));
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}
