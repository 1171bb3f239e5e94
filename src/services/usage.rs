use crate::models::UsageInfo;
use serde_json::Value;

/// Extracts token usage from a parsed response body.
///
/// Numeric fields are coerced permissively (integer, float, or numeric
/// string); anything else counts as 0. A missing `total_tokens` derives as
/// prompt+completion. `present` is false only when the response carries no
/// usage object at all. Never errors.
pub fn derive_usage(resp: &Value) -> UsageInfo {
    let Some(usage) = resp.get("usage").filter(|u| u.is_object()) else {
        return UsageInfo::default();
    };

    let prompt_tokens = coerce_count(usage.get("prompt_tokens"));
    let completion_tokens = coerce_count(usage.get("completion_tokens"));
    let total_tokens = match usage.get("total_tokens") {
        Some(v) => {
            let total = coerce_count(Some(v));
            if total > 0 {
                total
            } else {
                prompt_tokens + completion_tokens
            }
        }
        None => prompt_tokens + completion_tokens,
    };

    UsageInfo {
        prompt_tokens,
        completion_tokens,
        total_tokens,
        present: true,
    }
}

fn coerce_count(value: Option<&Value>) -> u64 {
    match value {
        Some(Value::Number(n)) => n
            .as_u64()
            .or_else(|| {
                n.as_f64()
                    .filter(|f| f.is_finite() && *f >= 0.0)
                    .map(|f| f as u64)
            })
            .unwrap_or(0),
        Some(Value::String(s)) => s.trim().parse().unwrap_or(0),
        _ => 0,
    }
}
