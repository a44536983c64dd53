use crate::account::Cta;
use crate::related::Article;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::HashMap;

/// Final result of one generation tier.
///
/// Only `content` (and `ctas`, when present) are interpreted; every other field is
/// carried in `extra` and handed to callers unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationPayload {
    #[serde(default)]
    pub content: Option<String>,
    #[serde(default)]
    pub ctas: Vec<Cta>,
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

impl GenerationPayload {
    pub fn with_content(content: impl Into<String>) -> Self {
        Self {
            content: Some(content.into()),
            ..Default::default()
        }
    }

    /// Content if it carries any non-whitespace text.
    pub fn non_empty_content(&self) -> Option<&str> {
        self.content.as_deref().filter(|c| !c.trim().is_empty())
    }

    /// Opaque metadata to persist next to the content.
    pub fn metadata(&self) -> Value {
        Value::Object(self.extra.clone())
    }
}

/// Discriminated event delivered by a generation stream, in arrival order.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum StreamEvent {
    Chunk { text: String },
    Complete { payload: GenerationPayload },
    Error { message: String },
    /// Progress narration only; never content-bearing.
    QueriesExtracted { info: Value },
}

/// Events of the separately-streamed article search.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ArticleSearchEvent {
    QueriesExtracted { info: Value },
    Articles { articles: Vec<Article> },
    Error { message: String },
}

/// Opaque connection descriptor for a one-way event channel.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StreamDescriptor {
    pub url: String,
    #[serde(default)]
    pub body: Value,
    #[serde(default)]
    pub headers: HashMap<String, String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn payload_keeps_unknown_fields() {
        let payload: GenerationPayload = serde_json::from_value(serde_json::json!({
            "content": "Body",
            "seo": { "score": 71 },
            "wordCount": 1200
        }))
        .expect("valid payload");

        assert_eq!(payload.non_empty_content(), Some("Body"));
        assert_eq!(payload.extra["wordCount"], 1200);

        let round = serde_json::to_value(&payload).expect("serializable");
        assert_eq!(round["seo"]["score"], 71);
    }

    #[test]
    fn blank_content_is_treated_as_absent() {
        let payload = GenerationPayload::with_content("  \n ");
        assert!(payload.non_empty_content().is_none());
    }
}
