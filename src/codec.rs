//! Opaque serialization of a [`TraceContext`] for embedding in job payloads.
//!
//! The encoding is JSON wrapped in URL-safe base64, so the result is a plain
//! string value that survives any payload format a queue might use. Decoding
//! never fails: an empty, missing or malformed string yields `None`, which
//! callers treat as "start a root trace".

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine as _};

use crate::context::TraceContext;

/// Encode a context to a transport-safe string.
///
/// Round-trip fidelity holds for every field: `decode(&encode(ctx))` yields
/// a value equal to `ctx`.
pub fn encode(ctx: &TraceContext) -> String {
    match serde_json::to_vec(ctx) {
        Ok(bytes) => URL_SAFE_NO_PAD.encode(bytes),
        Err(_) => String::new(),
    }
}

/// Decode a context previously produced by [`encode`].
///
/// Returns `None` for anything that is not a valid encoding. Never panics
/// and never returns an error; a broken context is not an error condition,
/// it just means the trace starts fresh.
pub fn decode(raw: &str) -> Option<TraceContext> {
    if raw.is_empty() {
        return None;
    }
    let bytes = URL_SAFE_NO_PAD.decode(raw).ok()?;
    serde_json::from_slice(&bytes).ok()
}
