pub mod article;
pub mod generation;

pub use article::parse_article_search_event;
pub use generation::parse_generation_event;

use serde_json::Value;

/// SSE servers either name the event (`event: chunk`) or send a default `message`
/// event whose JSON body carries a `type` field. Both resolve to one lowercase kind.
pub(crate) fn resolve_event_kind(event_type: &str, json: Option<&Value>) -> String {
    let named = event_type.trim();
    if !named.is_empty() && named != "message" {
        return normalize_kind(named);
    }
    json.and_then(|v| v.get("type"))
        .and_then(Value::as_str)
        .map(normalize_kind)
        .unwrap_or_else(|| "message".to_string())
}

fn normalize_kind(kind: &str) -> String {
    kind.trim()
        .chars()
        .filter(|c| *c != '_' && *c != '-')
        .collect::<String>()
        .to_ascii_lowercase()
}

pub(crate) fn extract_error_message(json: Option<&Value>, raw: &str) -> String {
    if let Some(json) = json {
        if let Some(message) = json.get("message").and_then(Value::as_str) {
            return message.to_string();
        }
        if let Some(error) = json.get("error") {
            if let Some(message) = error.get("message").and_then(Value::as_str) {
                return message.to_string();
            }
            if let Some(message) = error.as_str() {
                return message.to_string();
            }
        }
    }
    if raw.trim().is_empty() {
        "An error occurred during streaming".to_string()
    } else {
        raw.trim().to_string()
    }
}
