use crate::service::config::GenerationConfig;
use crate::util::errors::{ScribeError, ScribeResult};
use async_trait::async_trait;
use scribe_core_types::{Cta, GenerationRequest, Topic};
use serde_json::{Map, Value};

/// Turns a topic and its organization context into backend request fields.
///
/// Implementations are opaque to the orchestrator; it only forwards the result.
#[async_trait]
pub trait PromptCompiler: Send + Sync {
    async fn compile(&self, topic: &Topic, ctas: &[Cta]) -> ScribeResult<GenerationRequest>;
}

pub struct DefaultPromptCompiler {
    target_words: usize,
    tone: String,
}

impl DefaultPromptCompiler {
    pub fn new(config: &GenerationConfig) -> Self {
        Self {
            target_words: config.target_words,
            tone: config.tone.clone(),
        }
    }
}

#[async_trait]
impl PromptCompiler for DefaultPromptCompiler {
    async fn compile(&self, topic: &Topic, ctas: &[Cta]) -> ScribeResult<GenerationRequest> {
        let title = topic.title.trim();
        if title.is_empty() {
            return Err(ScribeError::Validation("Topic has no title".to_string()));
        }

        let mut fields = Map::new();
        fields.insert("targetWords".to_string(), Value::from(self.target_words));
        fields.insert("tone".to_string(), Value::from(self.tone.clone()));
        fields.insert("keywords".to_string(), Value::from(topic.keywords.clone()));

        Ok(GenerationRequest {
            topic_ref: topic.id.clone(),
            title: title.to_string(),
            prompt: build_article_prompt(topic, ctas, self.target_words, &self.tone),
            ctas: ctas.to_vec(),
            fields,
        })
    }
}

fn build_article_prompt(topic: &Topic, ctas: &[Cta], target_words: usize, tone: &str) -> String {
    let title = topic.title.trim();
    let summary = topic
        .summary
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| format!("\nSummary:\n{}\n", s))
        .unwrap_or_default();
    let keywords = if topic.keywords.is_empty() {
        String::new()
    } else {
        format!("\nKeywords: {}\n", topic.keywords.join(", "))
    };
    let cta_lines = ctas
        .iter()
        .map(|cta| format!("- [{}]({})", cta.text, cta.href))
        .collect::<Vec<_>>()
        .join("\n");
    let cta_section = if cta_lines.is_empty() {
        String::new()
    } else {
        format!(
            "\nCalls to action (link each one naturally, exactly once, using markdown links):\n{}\n",
            cta_lines
        )
    };

    format!(
        r#"Write a long-form article in markdown.

Title:
{title}
{summary}{keywords}{cta_section}
Requirements:
- About {target_words} words, {tone} tone.
- Use `#`/`##` headings, short paragraphs, lists where they help.
- Keep every heading under 120 characters.
- Place media with markers on their own line: {{{{heroImage:0}}}} once near the top,
  then {{{{tweet:N}}}}, {{{{article:N}}}} and {{{{video:N}}}} (N is 0-based) where they support the text.
- Do not output raw HTML.
"#
    )
}
