//! Record-count derivation from heterogeneous provider response shapes.
//!
//! Providers wrap generated content differently (OpenAI `choices`, Gemini
//! `candidates`, a generic `output` field) and models often wrap JSON
//! payloads in markdown code fences. This module recovers the payload and
//! counts the business records it holds. Every function here is pure and
//! total: structural failures fall back, they never propagate.

use crate::models::{Derived, FallbackReason};
use serde_json::Value;

type ContentExtractor = fn(&Value) -> Option<&str>;

fn openai_content(resp: &Value) -> Option<&str> {
    resp.get("choices")?
        .get(0)?
        .get("message")?
        .get("content")?
        .as_str()
}

fn gemini_content(resp: &Value) -> Option<&str> {
    resp.get("candidates")?
        .get(0)?
        .get("content")?
        .get("parts")?
        .get(0)?
        .get("text")?
        .as_str()
}

fn generic_output(resp: &Value) -> Option<&str> {
    resp.get("output")?.as_str()
}

/// Tried in priority order; first hit wins. Supporting another provider
/// means appending an extractor here.
const CONTENT_EXTRACTORS: &[ContentExtractor] = &[openai_content, gemini_content, generic_output];

/// Generated text content from a parsed response body, if any known
/// provider shape carries one.
pub fn extract_content(resp: &Value) -> Option<&str> {
    CONTENT_EXTRACTORS.iter().find_map(|extract| extract(resp))
}

/// Strips a single wrapping markdown code fence: a leading fence line
/// (any language tag) and a trailing fence, then trims. Unfenced input
/// passes through trimmed, so the function is idempotent.
pub fn strip_code_fence(content: &str) -> &str {
    let mut s = content.trim();
    if s.starts_with("```") {
        s = match s.find('\n') {
            Some(newline) => &s[newline + 1..],
            None => "",
        };
        s = s.strip_suffix("```").unwrap_or(s);
        s = s.trim();
    }
    s
}

/// Derives the number of business records a response produced.
///
/// The content text is accepted as a JSON candidate only when its first
/// non-whitespace character is `{` or `[`. A top-level array counts by
/// length; an object counts by the length of its first array-valued field
/// among `results`, `items`, `data`. Anything else is a fallback whose
/// numeric value is 0: "generated records" strictly means array entries
/// extracted from this exchange.
pub fn derive_record_count(resp: &Value) -> Derived<u64> {
    let Some(content) = extract_content(resp) else {
        return Derived::Fallback(FallbackReason::NoContentField);
    };

    let text = strip_code_fence(content);
    if !(text.starts_with('{') || text.starts_with('[')) {
        return Derived::Fallback(FallbackReason::ContentNotJson);
    }

    let Ok(payload) = serde_json::from_str::<Value>(text) else {
        return Derived::Fallback(FallbackReason::ContentNotJson);
    };

    match payload {
        Value::Array(items) => Derived::Extracted(items.len() as u64),
        Value::Object(map) => {
            for field in ["results", "items", "data"] {
                if let Some(Value::Array(items)) = map.get(field) {
                    return Derived::Extracted(items.len() as u64);
                }
            }
            Derived::Fallback(FallbackReason::NoArrayField)
        }
        _ => Derived::Fallback(FallbackReason::ContentNotJson),
    }
}

/// Like [`derive_record_count`] but starting from a raw body string.
pub fn derive_record_count_from_body(body: &str) -> Derived<u64> {
    match serde_json::from_str::<Value>(body) {
        Ok(resp) => derive_record_count(&resp),
        Err(_) => Derived::Fallback(FallbackReason::BodyNotJson),
    }
}

/// Marker groups tried in order against the raw request body; the first
/// group with a non-zero occurrence total wins.
const IMAGE_MARKER_GROUPS: &[&[&str]] = &[
    // OpenAI-style content parts
    &["\"type\": \"image_url\"", "\"type\":\"image_url\""],
    // Gemini-style inline data
    &[
        "\"inline_data\"",
        "\"mime_type\": \"image",
        "\"mime_type\":\"image",
    ],
    // Generic data URIs
    &["\"data:image"],
];

/// Counts provider image markers in a request body. When no marker is
/// found the exchange is assumed to be a single text-only one, so the
/// count is 1.
pub fn count_request_images(body: &str) -> u64 {
    for group in IMAGE_MARKER_GROUPS {
        let found: usize = group.iter().map(|marker| body.matches(marker).count()).sum();
        if found > 0 {
            return found as u64;
        }
    }
    1
}
