use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// In-flight timing/model data written on the request leg of an exchange
/// and taken back (read then cleared) on the response leg.
///
/// If the response leg never fires the record is orphaned in the store;
/// no TTL or cleanup is performed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PendingRequest {
    pub correlation_key: String,
    pub start_time_ms: i64,
    pub requested_model: String,
    pub platform: String,
    pub url: String,
    /// Provider image markers counted in the request body; 1 for a
    /// text-only exchange.
    #[serde(default = "default_image_count")]
    pub image_count: u64,
}

fn default_image_count() -> u64 {
    1
}

/// Cumulative statistics for one platform+model pair. Counters only ever
/// increase; records are never deleted.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AggregateRecord {
    pub platform: String,
    pub model: String,
    pub request_count: u64,
    pub total_ms: f64,
    pub avg_ms: f64,
    pub total_records: u64,
    pub total_tokens: u64,
    pub updated_at: DateTime<Utc>,
}

impl AggregateRecord {
    pub fn new(platform: &str, model: &str) -> Self {
        Self {
            platform: platform.to_string(),
            model: model.to_string(),
            request_count: 0,
            total_ms: 0.0,
            avg_ms: 0.0,
            total_records: 0,
            total_tokens: 0,
            updated_at: Utc::now(),
        }
    }
}

/// Key under which an [`AggregateRecord`] is grouped. Case-sensitive and
/// untrimmed: `("OpenAI", "gpt-4")` and `("OpenAI", "gpt-4 ")` are distinct
/// keys, which can silently fragment statistics when callers pass
/// unnormalized values.
pub fn aggregate_key(platform: &str, model: &str) -> String {
    format!("{platform}::{model}")
}

/// The whole persisted statistics mapping, serialized as one JSON value and
/// read-modify-written on every update.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StatsHistory {
    pub version: u32,
    pub by_key: HashMap<String, AggregateRecord>,
}

impl Default for StatsHistory {
    fn default() -> Self {
        Self {
            version: 1,
            by_key: HashMap::new(),
        }
    }
}

/// Token usage extracted from one response. Not persisted beyond the
/// aggregate's cumulative totals.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UsageInfo {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
    /// False when the response carried no usage object at all.
    pub present: bool,
}

/// A formatted user-facing notification, handed to the host's notifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notification {
    pub title: String,
    pub subtitle: String,
    pub body: String,
}

/// The request object supplied by the host on both legs of an exchange.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostRequest {
    pub url: String,
    pub body: String,
    /// Host-assigned request identifier; absent on hosts that do not
    /// provide one.
    pub id: Option<String>,
}

/// The response object supplied by the host on the response leg.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HostResponse {
    pub body: String,
}

/// Why a derivation fell back to its default instead of extracting a value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FallbackReason {
    /// The body was not parseable JSON.
    BodyNotJson,
    /// No known provider shape carried a content field.
    NoContentField,
    /// The content text was not a JSON candidate or failed to parse.
    ContentNotJson,
    /// The content parsed but held no countable array.
    NoArrayField,
}

/// Result of a best-effort derivation that must never raise: either a value
/// was extracted, or the derivation fell back for a recorded reason.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Derived<T> {
    Extracted(T),
    Fallback(FallbackReason),
}

impl<T: Copy> Derived<T> {
    pub fn value_or(&self, fallback: T) -> T {
        match self {
            Derived::Extracted(v) => *v,
            Derived::Fallback(_) => fallback,
        }
    }

    pub fn is_extracted(&self) -> bool {
        matches!(self, Derived::Extracted(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn aggregate_key_is_case_sensitive_and_untrimmed() {
        assert_eq!(aggregate_key("OpenAI", "gpt-4"), "OpenAI::gpt-4");
        assert_ne!(
            aggregate_key("OpenAI", "gpt-4"),
            aggregate_key("openai", "gpt-4")
        );
        assert_ne!(
            aggregate_key("OpenAI", "gpt-4"),
            aggregate_key("OpenAI", "gpt-4 ")
        );
    }

    #[test]
    fn derived_value_or_uses_fallback_only_on_fallback() {
        assert_eq!(Derived::Extracted(3u64).value_or(0), 3);
        assert_eq!(
            Derived::<u64>::Fallback(FallbackReason::BodyNotJson).value_or(0),
            0
        );
    }

    #[test]
    fn pending_request_round_trips_through_json() {
        let pending = PendingRequest {
            correlation_key: "abc".to_string(),
            start_time_ms: 1_700_000_000_000,
            requested_model: "gpt-x".to_string(),
            platform: "OpenAI".to_string(),
            url: "https://api.openai.com/v1/chat/completions".to_string(),
            image_count: 2,
        };
        let json = serde_json::to_string(&pending).unwrap();
        let back: PendingRequest = serde_json::from_str(&json).unwrap();
        assert_eq!(back, pending);
    }
}
