//! API key auth gate.
//!
//! # Responsibilities
//! - Extract a candidate key from the request
//! - Accept or reject it against the credential set
//!
//! # Design Decisions
//! - Sources are tried in a fixed order; the first non-empty value wins
//! - A present-but-unknown key never falls through to a later source
//! - The gate has no side effects; on success the pipeline simply continues

use axum::http::{header::AUTHORIZATION, HeaderMap};
use serde_json::Value;
use thiserror::Error;

use crate::security::credentials::CredentialSet;

/// Dedicated API key header.
pub const X_API_KEY: &str = "x-api-key";

/// Body field carrying the key when no header is present.
pub const BODY_KEY_FIELD: &str = "apiKey";

const BEARER_PREFIX: &str = "Bearer ";

/// Why a request was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AuthError {
    #[error("API key is required")]
    MissingKey,

    #[error("Invalid API key")]
    InvalidKey,
}

impl AuthError {
    /// Short label for logs and metrics.
    pub fn reason(&self) -> &'static str {
        match self {
            AuthError::MissingKey => "missing_key",
            AuthError::InvalidKey => "invalid_key",
        }
    }
}

/// Places a key can come from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeySource {
    /// `x-api-key` header.
    ApiKeyHeader,
    /// `Authorization` header, `Bearer ` stripped when present.
    Authorization,
    /// `apiKey` field of a JSON object body.
    BodyField,
}

impl KeySource {
    /// Extraction order. First match wins.
    pub const PRECEDENCE: [KeySource; 3] = [
        KeySource::ApiKeyHeader,
        KeySource::Authorization,
        KeySource::BodyField,
    ];

    /// Pull a non-empty candidate from this source.
    pub fn extract(self, headers: &HeaderMap, body: Option<&Value>) -> Option<String> {
        let candidate = match self {
            KeySource::ApiKeyHeader => header_str(headers, X_API_KEY).map(str::to_string),
            KeySource::Authorization => header_str(headers, AUTHORIZATION.as_str()).map(|value| {
                value
                    .strip_prefix(BEARER_PREFIX)
                    .unwrap_or(value)
                    .to_string()
            }),
            KeySource::BodyField => body.and_then(|b| b.get(BODY_KEY_FIELD)).and_then(body_key),
        };
        candidate.filter(|key| !key.is_empty())
    }
}

fn header_str<'a>(headers: &'a HeaderMap, name: &str) -> Option<&'a str> {
    headers.get(name).and_then(|v| v.to_str().ok())
}

// Falsy JSON values (null, false, 0, "") count as absent. Strings are used
// as-is; other values become a key that can never match, so they are
// rejected as invalid rather than missing.
fn body_key(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Null | Value::Bool(false) => None,
        Value::Number(n) if n.as_f64() == Some(0.0) => None,
        other => Some(other.to_string()),
    }
}

/// Authenticates requests against a fixed credential set.
#[derive(Debug, Clone)]
pub struct AuthGate {
    credentials: CredentialSet,
}

impl AuthGate {
    pub fn new(credentials: CredentialSet) -> Self {
        Self { credentials }
    }

    /// Find the first candidate key in precedence order.
    pub fn extract_key(headers: &HeaderMap, body: Option<&Value>) -> Option<String> {
        KeySource::PRECEDENCE
            .iter()
            .find_map(|source| source.extract(headers, body))
    }

    /// Accept or reject a request.
    pub fn authorize(&self, headers: &HeaderMap, body: Option<&Value>) -> Result<(), AuthError> {
        let key = Self::extract_key(headers, body).ok_or(AuthError::MissingKey)?;
        if self.credentials.contains(&key) {
            Ok(())
        } else {
            Err(AuthError::InvalidKey)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use serde_json::json;

    fn gate() -> AuthGate {
        AuthGate::new(CredentialSet::new(["good", "other"]))
    }

    fn headers(pairs: &[(&'static str, &'static str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.insert(*name, HeaderValue::from_static(value));
        }
        map
    }

    #[test]
    fn missing_everywhere() {
        assert_eq!(gate().authorize(&HeaderMap::new(), None), Err(AuthError::MissingKey));
        assert_eq!(
            gate().authorize(&HeaderMap::new(), Some(&json!({"model": "m"}))),
            Err(AuthError::MissingKey)
        );
    }

    #[test]
    fn header_key_accepted() {
        assert_eq!(gate().authorize(&headers(&[("x-api-key", "good")]), None), Ok(()));
    }

    #[test]
    fn bearer_prefix_is_stripped() {
        let h = headers(&[("authorization", "Bearer good")]);
        assert_eq!(gate().authorize(&h, None), Ok(()));
    }

    #[test]
    fn raw_authorization_used_as_is() {
        let h = headers(&[("authorization", "good")]);
        assert_eq!(gate().authorize(&h, None), Ok(()));

        let h = headers(&[("authorization", "Basic good")]);
        assert_eq!(gate().authorize(&h, None), Err(AuthError::InvalidKey));
    }

    #[test]
    fn body_field_accepted() {
        let body = json!({"model": "m", "apiKey": "good"});
        assert_eq!(gate().authorize(&HeaderMap::new(), Some(&body)), Ok(()));
    }

    #[test]
    fn header_wins_over_authorization_and_body() {
        let h = headers(&[("x-api-key", "bad"), ("authorization", "Bearer good")]);
        let body = json!({"apiKey": "good"});
        assert_eq!(
            AuthGate::extract_key(&h, Some(&body)).as_deref(),
            Some("bad")
        );
        assert_eq!(gate().authorize(&h, Some(&body)), Err(AuthError::InvalidKey));
    }

    #[test]
    fn authorization_wins_over_body() {
        let h = headers(&[("authorization", "Bearer other")]);
        let body = json!({"apiKey": "good"});
        assert_eq!(
            AuthGate::extract_key(&h, Some(&body)).as_deref(),
            Some("other")
        );
    }

    #[test]
    fn empty_values_fall_through() {
        let h = headers(&[("x-api-key", ""), ("authorization", "Bearer ")]);
        let body = json!({"apiKey": "good"});
        assert_eq!(gate().authorize(&h, Some(&body)), Ok(()));
        assert_eq!(gate().authorize(&h, None), Err(AuthError::MissingKey));
    }

    #[test]
    fn non_string_body_key_is_invalid() {
        let body = json!({"apiKey": 42});
        assert_eq!(gate().authorize(&HeaderMap::new(), Some(&body)), Err(AuthError::InvalidKey));

        let body = json!({"apiKey": true});
        assert_eq!(gate().authorize(&HeaderMap::new(), Some(&body)), Err(AuthError::InvalidKey));
    }

    #[test]
    fn falsy_body_key_is_missing() {
        for value in [json!(null), json!(false), json!(0), json!(0.0), json!("")] {
            let body = json!({"apiKey": value});
            assert_eq!(
                gate().authorize(&HeaderMap::new(), Some(&body)),
                Err(AuthError::MissingKey),
                "apiKey = {value}"
            );
        }
    }

    #[test]
    fn keys_are_compared_as_sent() {
        let h = headers(&[("x-api-key", " good")]);
        assert_eq!(gate().authorize(&h, None), Err(AuthError::InvalidKey));

        let body = json!({"apiKey": "good "});
        assert_eq!(gate().authorize(&HeaderMap::new(), Some(&body)), Err(AuthError::InvalidKey));
    }

    #[test]
    fn unknown_key_rejected() {
        assert_eq!(
            gate().authorize(&headers(&[("x-api-key", "bad")]), None),
            Err(AuthError::InvalidKey)
        );
    }

    #[test]
    fn empty_credential_set_rejects_all() {
        let gate = AuthGate::new(CredentialSet::default());
        assert_eq!(
            gate.authorize(&headers(&[("x-api-key", "good")]), None),
            Err(AuthError::InvalidKey)
        );
    }
}
