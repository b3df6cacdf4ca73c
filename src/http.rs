//! Pure tag builders for outbound HTTP traffic.
//!
//! These functions only shape data; they never perform I/O, never touch the
//! request or response they describe, and are safe to call with tracing
//! disabled (the result is simply unused). They are invoked manually by
//! call sites that want to tag the active span, for example:
//!
//! ```ignore
//! if let Some(span) = TracerRegistry::current() {
//!     for (key, value) in request_tags("post", url, &headers, &body) {
//!         span.set_tag(key, value);
//!     }
//! }
//! ```

use std::collections::{BTreeMap, HashMap};

use crate::span::TagValue;

/// Tags describing an outbound request.
///
/// The exact shape: `type`, `uri` (as given), `method` (upper-cased),
/// `body` (raw, unmodified) and `headers` (deterministic sorted-key JSON).
pub fn request_tags<K: AsRef<str>, V: AsRef<str>>(
    method: &str,
    uri: &str,
    headers: &[(K, V)],
    body: &str,
) -> HashMap<String, TagValue> {
    let mut tags = HashMap::new();
    tags.insert("type".to_string(), TagValue::from("request"));
    tags.insert("uri".to_string(), TagValue::from(uri));
    tags.insert("method".to_string(), TagValue::from(method.to_uppercase()));
    tags.insert("body".to_string(), TagValue::from(body));
    tags.insert(
        "headers".to_string(),
        TagValue::from(serialize_headers(headers)),
    );
    tags
}

/// Tags describing the matching response: same shape, `type: "response"`
/// plus an integer `status`.
pub fn response_tags<K: AsRef<str>, V: AsRef<str>>(
    status: u16,
    headers: &[(K, V)],
    body: &str,
) -> HashMap<String, TagValue> {
    let mut tags = HashMap::new();
    tags.insert("type".to_string(), TagValue::from("response"));
    tags.insert("status".to_string(), TagValue::Int(status.into()));
    tags.insert("body".to_string(), TagValue::from(body));
    tags.insert(
        "headers".to_string(),
        TagValue::from(serialize_headers(headers)),
    );
    tags
}

/// Deterministic serialization of a multi-valued header list: names folded
/// to lower case, values grouped in input order, keys sorted by the map.
fn serialize_headers<K: AsRef<str>, V: AsRef<str>>(headers: &[(K, V)]) -> String {
    let mut folded: BTreeMap<String, Vec<&str>> = BTreeMap::new();
    for (name, value) in headers {
        folded
            .entry(name.as_ref().to_ascii_lowercase())
            .or_default()
            .push(value.as_ref());
    }
    serde_json::to_string(&folded).unwrap_or_default()
}
