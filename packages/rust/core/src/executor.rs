//! Step executor: one non-streaming model call checked against a field contract.
//!
//! Transport and provider failures propagate as `Err`. A reply that is not
//! JSON, or that breaks its contract, never does: it degrades to a
//! [`ParseFailure`] carrying a prefix of the raw text.

use std::sync::LazyLock;

use regex::Regex;
use serde::Serialize;
use serde_json::Value;
use tracing::{debug, warn};

use bidcraft_provider::{CompletionRequest, ModelProvider};
use bidcraft_shared::{BidcraftError, Contract, ParseFailure, Parsed, Result};

static OPENING_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"(?i)^```(?:json)?\s*").expect("opening fence pattern is valid"));
static CLOSING_FENCE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"\s*```$").expect("closing fence pattern is valid"));

/// Remove an optional Markdown code fence around a model reply.
pub fn strip_fences(raw: &str) -> &str {
    let trimmed = raw.trim();
    let start = OPENING_FENCE.find(trimmed).map_or(0, |m| m.end());
    let body = &trimmed[start..];
    let end = CLOSING_FENCE.find(body).map_or(body.len(), |m| m.start());
    &body[..end]
}

/// Serialize a prompt payload as pretty-printed JSON.
pub(crate) fn pretty_json(value: &impl Serialize) -> Result<String> {
    serde_json::to_string_pretty(value)
        .map_err(|e| BidcraftError::input(format!("payload is not serializable: {e}")))
}

/// Run one model call and check the reply against `T`'s contract.
pub async fn execute<T: Contract>(
    provider: &dyn ModelProvider,
    request: &CompletionRequest,
) -> Result<Parsed<T>> {
    let raw = provider.complete(request).await?;
    Ok(parse_reply(&raw))
}

/// Parse a raw reply into `T`, or a parse-failure marker.
pub fn parse_reply<T: Contract>(raw: &str) -> Parsed<T> {
    match parse_json(raw).and_then(conform::<T>) {
        Ok(value) => Parsed::Valid(value),
        Err(e) => {
            warn!(error = %e, "model reply broke its contract");
            Parsed::Failed(ParseFailure::from_raw(raw))
        }
    }
}

/// Decode a fenced or bare reply as a JSON value.
pub(crate) fn parse_json(raw: &str) -> Result<Value> {
    let body = strip_fences(raw);
    serde_json::from_str(body).map_err(|e| {
        debug!(chars = raw.len(), "reply is not JSON");
        BidcraftError::schema(format!("reply is not JSON: {e}"))
    })
}

/// Check a decoded value against `T`: object shape, required keys, then
/// typed decode and semantic validation.
pub(crate) fn conform<T: Contract>(value: Value) -> Result<T> {
    let Value::Object(map) = &value else {
        return Err(BidcraftError::schema("expected a JSON object"));
    };
    if let Some(missing) = T::REQUIRED_KEYS.iter().find(|key| !map.contains_key(**key)) {
        return Err(BidcraftError::schema(format!("missing key `{missing}`")));
    }

    let typed: T = serde_json::from_value(value).map_err(|e| BidcraftError::schema(e.to_string()))?;
    typed.validate().map_err(BidcraftError::schema)?;
    Ok(typed)
}
