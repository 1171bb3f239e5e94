use serde_json::Value;

/// Default tag when the URL matches no known provider or the model field
/// is missing or unparseable.
pub const UNKNOWN: &str = "Unknown";

/// Ordered (substring, tag) table for provider classification. First match
/// wins. Matching is case-sensitive against observed provider hostnames;
/// new providers are added by appending a row, not by branching.
const PLATFORM_TABLE: &[(&str, &str)] = &[
    ("api.deepseek.com", "DeepSeek"),
    ("api.siliconflow.cn", "SiliconFlow"),
    ("ark.cn-beijing.volces.com", "Volcengine"),
    ("openrouter.ai", "OpenRouter"),
    ("api.moonshot.cn", "Moonshot"),
    ("generativelanguage.googleapis.com", "Google"),
    ("api.openai.com", "OpenAI"),
    ("api.anthropic.com", "Anthropic"),
];

/// Classifies the upstream provider from the request URL.
pub fn derive_platform(url: &str) -> &'static str {
    PLATFORM_TABLE
        .iter()
        .find(|(needle, _)| url.contains(needle))
        .map(|(_, tag)| *tag)
        .unwrap_or(UNKNOWN)
}

/// Extracts the requested model from a JSON request body. Missing, blank,
/// or unparseable input yields [`UNKNOWN`]; never errors.
pub fn derive_requested_model(body: &str) -> String {
    let Ok(parsed) = serde_json::from_str::<Value>(body) else {
        return UNKNOWN.to_string();
    };
    trimmed_model(&parsed).unwrap_or_else(|| UNKNOWN.to_string())
}

/// Non-empty trimmed `model` string field, if the value carries one.
pub fn trimmed_model(value: &Value) -> Option<String> {
    value
        .get("model")
        .and_then(Value::as_str)
        .map(str::trim)
        .filter(|m| !m.is_empty())
        .map(str::to_string)
}
