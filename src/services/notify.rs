use crate::models::{AggregateRecord, Notification, UsageInfo};

/// Sentinel shown when no start record was found for the exchange.
pub const UNKNOWN_DURATION: &str = "unknown";

/// Renders a duration in seconds with two decimals, or the unknown
/// sentinel for absent/garbled values.
pub fn format_duration_ms(duration_ms: Option<f64>) -> String {
    match duration_ms {
        Some(d) if d.is_finite() && d >= 0.0 => format!("{:.2}s", d / 1000.0),
        _ => UNKNOWN_DURATION.to_string(),
    }
}

/// Builds the user-facing notification for one completed exchange. Pure
/// formatting; posting is the caller's business.
pub fn format_notification(
    platform: &str,
    model: &str,
    duration_ms: Option<f64>,
    record_count: u64,
    image_count: u64,
    usage: &UsageInfo,
    aggregate: &AggregateRecord,
) -> Notification {
    let mut lines = Vec::new();

    lines.push(format!("Model: {model}"));
    lines.push(format!("Duration: {}", format_duration_ms(duration_ms)));
    lines.push(format!("Records: {record_count}"));

    if image_count > 1 {
        lines.push(format!("Images: {image_count}"));
    }

    if usage.present {
        lines.push(format!(
            "Tokens: {} (P{}/C{})",
            usage.total_tokens, usage.prompt_tokens, usage.completion_tokens
        ));
    }

    let per_record = match duration_ms {
        Some(d) if d.is_finite() && d >= 0.0 && record_count > 0 => {
            format!("{:.2}s", d / 1000.0 / record_count as f64)
        }
        _ => "-".to_string(),
    };
    lines.push(format!("Per record: {per_record}"));

    lines.push(String::new());
    lines.push(format!("History requests: {}", aggregate.request_count));
    lines.push(format!(
        "History avg duration: {}",
        format_duration_ms(Some(aggregate.avg_ms))
    ));
    lines.push(format!("History records: {}", aggregate.total_records));
    if aggregate.total_tokens > 0 {
        lines.push(format!("History tokens: {}", aggregate.total_tokens));
    }

    Notification {
        title: format!("LLM Usage | {platform}"),
        subtitle: String::new(),
        body: lines.join("\n"),
    }
}
