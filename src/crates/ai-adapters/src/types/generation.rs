use super::{extract_error_message, resolve_event_kind};
use log::warn;
use scribe_core_types::{GenerationPayload, StreamEvent};
use serde_json::Value;

const STREAM_DONE_SENTINEL: &str = "[DONE]";

/// Map one raw SSE event of the generation channel to a typed event.
///
/// Returns `None` for events that carry no content (keepalives, metadata,
/// progress pings, the `[DONE]` sentinel, chunks with an empty delta).
pub fn parse_generation_event(event_type: &str, data: &str) -> Option<StreamEvent> {
    if data.trim() == STREAM_DONE_SENTINEL {
        return None;
    }

    let json = serde_json::from_str::<Value>(data).ok();
    let kind = resolve_event_kind(event_type, json.as_ref());

    match kind.as_str() {
        "chunk" | "delta" | "content" | "token" | "message" => {
            extract_chunk_text(json.as_ref(), data).map(|text| StreamEvent::Chunk { text })
        }
        "complete" | "completed" | "done" | "result" => Some(StreamEvent::Complete {
            payload: extract_payload(json, data),
        }),
        "error" => Some(StreamEvent::Error {
            message: extract_error_message(json.as_ref(), data),
        }),
        "queriesextracted" => Some(StreamEvent::QueriesExtracted {
            info: json.unwrap_or_else(|| Value::String(data.to_string())),
        }),
        _ => None,
    }
}

fn extract_chunk_text(json: Option<&Value>, raw: &str) -> Option<String> {
    let text = match json {
        Some(Value::String(s)) => Some(s.clone()),
        Some(Value::Object(_)) => json.and_then(content_delta).map(str::to_string),
        // Anything that is not an object is still text the model produced.
        Some(Value::Number(_) | Value::Bool(_) | Value::Array(_) | Value::Null) => {
            Some(raw.to_string())
        }
        None => Some(raw.to_string()),
    };
    text.filter(|t| !t.is_empty())
}

fn content_delta(value: &Value) -> Option<&str> {
    if let Some(content) = value.get("content").and_then(Value::as_str) {
        return Some(content);
    }
    if let Some(text) = value.get("text").and_then(Value::as_str) {
        return Some(text);
    }
    match value.get("delta") {
        Some(Value::String(delta)) => return Some(delta),
        Some(delta) => {
            if let Some(content) = delta.get("content").and_then(Value::as_str) {
                return Some(content);
            }
        }
        None => {}
    }
    value
        .get("choices")
        .and_then(|choices| choices.get(0))
        .and_then(|choice| choice.get("delta"))
        .and_then(|delta| delta.get("content"))
        .and_then(Value::as_str)
}

fn extract_payload(json: Option<Value>, raw: &str) -> GenerationPayload {
    let Some(Value::Object(mut body)) = json else {
        if raw.trim().is_empty() {
            return GenerationPayload::default();
        }
        return GenerationPayload::with_content(raw);
    };

    let candidate = match body.remove("payload").or_else(|| body.remove("result")) {
        Some(inner @ Value::Object(_)) => inner,
        Some(Value::String(content)) => return GenerationPayload::with_content(content),
        _ => {
            body.remove("type");
            Value::Object(body)
        }
    };

    let text_fallback = candidate
        .get("text")
        .and_then(Value::as_str)
        .map(str::to_string);

    let mut payload = match serde_json::from_value::<GenerationPayload>(candidate.clone()) {
        Ok(payload) => payload,
        Err(e) => {
            warn!("Complete payload did not match expected shape: error={}", e);
            let mut extra = candidate.as_object().cloned().unwrap_or_default();
            let content = extra
                .remove("content")
                .and_then(|v| v.as_str().map(str::to_string));
            extra.remove("ctas");
            GenerationPayload {
                content,
                ctas: Vec::new(),
                extra,
            }
        }
    };

    if payload.content.is_none() {
        payload.content = text_fallback;
    }
    payload
}
