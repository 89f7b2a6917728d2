//! Configuration loading from disk and environment.

use std::fs;
use std::path::Path;

use thiserror::Error;

use crate::config::schema::ProxyConfig;
use crate::config::validation::{validate_config, ValidationError};

/// Error type for configuration loading.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation failed: {}", join_errors(.0))]
    Validation(Vec<ValidationError>),
}

fn join_errors(errors: &[ValidationError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join(", ")
}

/// Parse a TOML file. Missing sections fall back to defaults.
fn read_config(path: &Path) -> Result<ProxyConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    Ok(toml::from_str(&content)?)
}

/// Build the runtime configuration: optional file, then process environment.
pub fn load(path: Option<&Path>) -> Result<ProxyConfig, ConfigError> {
    let mut config = match path {
        Some(path) => read_config(path)?,
        None => ProxyConfig::default(),
    };

    apply_env(&mut config, |name| std::env::var(name).ok());
    validate_config(&config).map_err(ConfigError::Validation)?;

    Ok(config)
}

/// Overlay `PORT`, `OLLAMA_BASE_URL`, `CORS_ORIGIN` and `API_KEYS` onto a config.
pub fn apply_env<F>(config: &mut ProxyConfig, lookup: F)
where
    F: Fn(&str) -> Option<String>,
{
    if let Some(port) = lookup("PORT") {
        config.listener.bind_address = format!("0.0.0.0:{}", port.trim());
    }
    if let Some(base_url) = lookup("OLLAMA_BASE_URL") {
        config.upstream.base_url = base_url;
    }
    if let Some(origin) = lookup("CORS_ORIGIN") {
        config.cors.allowed_origin = origin;
    }
    if let Some(keys) = lookup("API_KEYS") {
        config.auth.api_keys = split_keys(&keys);
    }
}

/// Split a comma-separated key list, dropping empty entries.
pub fn split_keys(raw: &str) -> Vec<String> {
    raw.split(',')
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .map(String::from)
        .collect()
}
