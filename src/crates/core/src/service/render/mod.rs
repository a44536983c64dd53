//! Markdown render pipeline
//!
//! markdown -> placeholder slots -> sanitizer -> CTA tagging. The same input
//! snapshot always yields byte-identical output.

pub mod cta;
pub mod markdown;
pub mod placeholders;
pub mod sanitize;

pub use cta::{normalize_url, CtaTagger, CTA_CLASS};
pub use markdown::MarkdownRenderer;
pub use placeholders::{PlaceholderResolver, PlaceholderSlot, SlotState};
pub use sanitize::sanitize_html;

use crate::service::config::RenderConfig;
use crate::util::errors::ScribeResult;
use scribe_core_types::{Cta, RelatedContentStep, RelatedResults};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenderedDocument {
    pub html: String,
    pub placeholders: Vec<PlaceholderSlot>,
    pub cta_links: usize,
}

impl RenderedDocument {
    pub fn pending_slots(&self) -> usize {
        self.placeholders
            .iter()
            .filter(|slot| slot.state == SlotState::Loading)
            .count()
    }
}

pub struct RenderPipeline {
    markdown: MarkdownRenderer,
    placeholders: PlaceholderResolver,
    ctas: CtaTagger,
}

impl RenderPipeline {
    pub fn new(config: &RenderConfig) -> ScribeResult<Self> {
        Ok(Self {
            markdown: MarkdownRenderer::new(config)?,
            placeholders: PlaceholderResolver::new()?,
            ctas: CtaTagger::new()?,
        })
    }

    pub fn render(
        &self,
        text: &str,
        related: &RelatedResults,
        steps: &[RelatedContentStep],
        ctas: &[Cta],
    ) -> RenderedDocument {
        let html = self.markdown.to_html(text);
        let (html, placeholders) = self.placeholders.resolve(&html, related, steps);
        let html = sanitize_html(&html);
        let (html, cta_links) = self.ctas.tag(&html, ctas);

        RenderedDocument {
            html,
            placeholders,
            cta_links,
        }
    }

    /// Render a buffer that is still growing. A trailing unterminated marker is withheld.
    pub fn render_partial(
        &self,
        text: &str,
        related: &RelatedResults,
        steps: &[RelatedContentStep],
        ctas: &[Cta],
    ) -> RenderedDocument {
        self.render(
            self.placeholders.hide_incomplete_marker(text),
            related,
            steps,
            ctas,
        )
    }
}

/// Escape text for HTML content and attribute values. Braces are escaped so
/// embedded text can never be mistaken for a placeholder marker.
pub(crate) fn escape_html(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for ch in text.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            '{' => out.push_str("&#123;"),
            '}' => out.push_str("&#125;"),
            _ => out.push(ch),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use scribe_core_types::{RelatedStepId, SocialPost, StepStatus};

    fn pipeline() -> RenderPipeline {
        RenderPipeline::new(&RenderConfig::default()).expect("pipeline")
    }

    fn done_steps() -> Vec<RelatedContentStep> {
        RelatedStepId::ALL
            .iter()
            .map(|id| RelatedContentStep {
                id: *id,
                status: StepStatus::Done,
                count: 0,
            })
            .collect()
    }

    #[test]
    fn full_pass_resolves_sanitizes_and_tags() {
        let related = RelatedResults {
            tweets: vec![SocialPost {
                id: "9".to_string(),
                author: "lin".to_string(),
                text: "hello".to_string(),
                url: "https://social.example.com/9".to_string(),
            }],
            ..RelatedResults::default()
        };
        let ctas = vec![Cta {
            text: "Try it free".to_string(),
            href: "https://example.com/trial".to_string(),
            cta_type: "button".to_string(),
            placement: None,
        }];
        let text = "# Guide\n\n<script>alert(1)</script>Intro\n\n{{tweet:0}}\n\n[Try it free](https://example.com/trial)";

        let doc = pipeline().render(text, &related, &done_steps(), &ctas);

        assert!(!doc.html.contains("script"));
        assert!(doc.html.contains("<h1>Guide</h1>"));
        assert!(doc.html.contains("data-kind=\"tweet\""));
        assert!(doc.html.contains("class=\"cta-link\""));
        assert_eq!(doc.cta_links, 1);
        assert_eq!(doc.placeholders.len(), 1);
        assert_eq!(doc.pending_slots(), 0);
        sanitize::assert_within_allow_list(&doc.html);
    }

    #[test]
    fn marker_at_heading_cap_keeps_its_slot() {
        let text = format!("# {}{{{{tweet:0}}}}", "x".repeat(245));
        let doc = pipeline().render(&text, &RelatedResults::default(), &done_steps(), &[]);

        assert_eq!(doc.placeholders.len(), 1);
        assert!(doc.html.contains("data-kind=\"tweet\""));
        assert!(!doc.html.contains("{{"));
        assert!(!doc.html.contains("}}"));
    }

    #[test]
    fn rendering_is_deterministic() {
        let p = pipeline();
        let text = "Lead {{article:1}}\n\n{{video:0}}";
        let steps = RelatedContentStep::initial_set();
        let a = p.render(text, &RelatedResults::default(), &steps, &[]);
        let b = p.render(text, &RelatedResults::default(), &steps, &[]);
        assert_eq!(a, b);
        assert_eq!(a.pending_slots(), 2);
    }

    #[test]
    fn partial_render_hides_trailing_marker() {
        let doc = pipeline().render_partial(
            "Intro text {{twe",
            &RelatedResults::default(),
            &RelatedContentStep::initial_set(),
            &[],
        );
        assert_eq!(doc.html, "<p>Intro text</p>");
        assert!(doc.placeholders.is_empty());
    }

    #[test]
    fn escape_covers_markup_and_braces() {
        assert_eq!(
            escape_html("<a href='x'>{{tweet:0}} & \"q\"</a>"),
            "&lt;a href=&#39;x&#39;&gt;&#123;&#123;tweet:0&#125;&#125; &amp; &quot;q&quot;&lt;/a&gt;"
        );
    }
}
