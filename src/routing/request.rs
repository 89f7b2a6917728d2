//! Inbound request body.

use axum::body::Bytes;
use serde_json::Value;

/// The caller's body, kept verbatim alongside a best-effort JSON parse.
///
/// Nothing is validated: a body that does not parse is still forwarded
/// as-is, it just has no fields to read.
#[derive(Debug, Clone)]
pub struct ProxyRequest {
    raw: Bytes,
    parsed: Option<Value>,
}

impl ProxyRequest {
    pub fn from_bytes(raw: Bytes) -> Self {
        let parsed = if raw.is_empty() {
            None
        } else {
            serde_json::from_slice(&raw).ok()
        };
        Self { raw, parsed }
    }

    /// Parsed body, when it was valid JSON.
    pub fn json(&self) -> Option<&Value> {
        self.parsed.as_ref()
    }

    /// Field of a JSON object body.
    pub fn field(&self, name: &str) -> Option<&Value> {
        self.parsed.as_ref().and_then(|v| v.get(name))
    }

    pub fn model(&self) -> Option<&str> {
        self.field("model").and_then(Value::as_str)
    }

    /// True only for an explicit `"stream": true`.
    pub fn wants_stream(&self) -> bool {
        self.field("stream").and_then(Value::as_bool) == Some(true)
    }

    pub fn into_raw(self) -> Bytes {
        self.raw
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stream_flag() {
        let req = ProxyRequest::from_bytes(Bytes::from_static(br#"{"model":"m","stream":true}"#));
        assert!(req.wants_stream());
        assert_eq!(req.model(), Some("m"));

        let req = ProxyRequest::from_bytes(Bytes::from_static(br#"{"model":"m","stream":false}"#));
        assert!(!req.wants_stream());

        let req = ProxyRequest::from_bytes(Bytes::from_static(br#"{"model":"m"}"#));
        assert!(!req.wants_stream());

        let req = ProxyRequest::from_bytes(Bytes::from_static(br#"{"stream":"yes"}"#));
        assert!(!req.wants_stream());
    }

    #[test]
    fn invalid_json_is_kept_raw() {
        let raw = Bytes::from_static(b"not json {");
        let req = ProxyRequest::from_bytes(raw.clone());
        assert!(req.json().is_none());
        assert!(!req.wants_stream());
        assert_eq!(req.into_raw(), raw);
    }

    #[test]
    fn empty_body() {
        let req = ProxyRequest::from_bytes(Bytes::new());
        assert!(req.json().is_none());
        assert!(req.field("name").is_none());
    }
}
