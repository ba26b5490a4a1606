//! Deterministic request fingerprints.
//!
//! Cache keys are SHA-256 over the endpoint tag plus the canonical form of
//! the outbound request, so semantically identical requests collapse to one
//! entry regardless of incidental formatting upstream, and keys stay stable
//! across processes and restarts.

use serde_json::Value;
use sha2::{Digest, Sha256};

/// Collapse whitespace runs to single spaces and trim the ends.
pub fn normalize_text(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Canonical form of a request parameter tree: every string leaf is
/// whitespace-normalized; arrays and objects are rebuilt recursively.
///
/// Key order is handled by serialization: serde_json's map is backed by a
/// BTreeMap (the `preserve_order` feature must stay off), so object keys
/// serialize sorted.
fn canonicalize(value: &Value) -> Value {
    match value {
        Value::String(s) => Value::String(normalize_text(s)),
        Value::Array(items) => Value::Array(items.iter().map(canonicalize).collect()),
        Value::Object(map) => Value::Object(
            map.iter()
                .map(|(k, v)| (k.clone(), canonicalize(v)))
                .collect(),
        ),
        other => other.clone(),
    }
}

/// Fingerprint of an outbound request, hex-encoded.
pub fn request_key(endpoint_tag: &str, params: &Value) -> String {
    let canonical = canonicalize(params);
    let mut hasher = Sha256::new();
    hasher.update(endpoint_tag.as_bytes());
    hasher.update(b"\n");
    hasher.update(canonical.to_string().as_bytes());
    format!("{:x}", hasher.finalize())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn normalize_collapses_runs_and_trims() {
        assert_eq!(normalize_text("  what\tshould I\n\nwear  "), "what should I wear");
        assert_eq!(normalize_text(""), "");
    }

    #[test]
    fn key_is_deterministic() {
        let params = json!({"query": "2+2", "units": "metric"});
        assert_eq!(request_key("fact", &params), request_key("fact", &params));
    }

    #[test]
    fn key_ignores_field_order_and_whitespace() {
        let a = json!({"model": "gemma", "messages": [{"role": "user", "content": "what  time\nis it"}]});
        let b = json!({"messages": [{"role": "user", "content": "what time is it"}], "model": "gemma"});
        assert_eq!(request_key("chat", &a), request_key("chat", &b));
    }

    #[test]
    fn key_differs_on_endpoint() {
        let params = json!({"query": "2+2"});
        assert_ne!(request_key("fact", &params), request_key("chat", &params));
    }

    #[test]
    fn key_differs_on_content() {
        assert_ne!(
            request_key("fact", &json!({"query": "population of France"})),
            request_key("fact", &json!({"query": "population of Italy"})),
        );
    }
}
