//! Placeholder marker resolution
//!
//! Markers look like `{{tweet:2}}`. A marker alone in a paragraph becomes a block
//! `<figure>` slot, a marker inside prose becomes an inline `<span>` slot. The slot
//! element and its attributes never change between loading and resolved states.

use super::escape_html;
use crate::util::errors::{ScribeError, ScribeResult};
use regex::{Captures, Regex};
use scribe_core_types::{PlaceholderKind, PlaceholderToken, RelatedContentStep, RelatedResults};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SlotState {
    Loading,
    Resolved,
    /// The category finished without an entry at this index.
    Unavailable,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceholderSlot {
    pub token: PlaceholderToken,
    pub state: SlotState,
}

pub struct PlaceholderResolver {
    block: Regex,
    inline: Regex,
    trailing_fragment: Regex,
}

#[derive(Clone, Copy)]
enum SlotForm {
    Block,
    Inline,
}

impl PlaceholderResolver {
    pub fn new() -> ScribeResult<Self> {
        Ok(Self {
            block: compile(r"<p>\s*\{\{\s*([A-Za-z]+)\s*:\s*(\d{1,6})\s*\}\}\s*</p>")?,
            inline: compile(r"\{\{\s*([A-Za-z]+)\s*:\s*(\d{1,6})\s*\}\}")?,
            trailing_fragment: compile(
                r"(?:\{\{[ \t]*[A-Za-z]*[ \t]*(?::[ \t]*\d*[ \t]*)?\}?|\{)$",
            )?,
        })
    }

    /// Cut an unterminated marker off the end of a still-growing buffer.
    pub fn hide_incomplete_marker<'a>(&self, text: &'a str) -> &'a str {
        match self.trailing_fragment.find(text) {
            // A complete marker at the very end is not a fragment.
            Some(m) if !m.as_str().ends_with("}}") => &text[..m.start()],
            _ => text,
        }
    }

    /// Replace every recognised marker in rendered HTML with its slot.
    pub fn resolve(
        &self,
        html: &str,
        related: &RelatedResults,
        steps: &[RelatedContentStep],
    ) -> (String, Vec<PlaceholderSlot>) {
        let mut slots = Vec::new();

        let html = self.block.replace_all(html, |caps: &Captures| {
            self.replace_marker(caps, SlotForm::Block, related, steps, &mut slots)
        });
        let html = self.inline.replace_all(&html, |caps: &Captures| {
            self.replace_marker(caps, SlotForm::Inline, related, steps, &mut slots)
        });

        (html.into_owned(), slots)
    }

    fn replace_marker(
        &self,
        caps: &Captures,
        form: SlotForm,
        related: &RelatedResults,
        steps: &[RelatedContentStep],
        slots: &mut Vec<PlaceholderSlot>,
    ) -> String {
        let parsed = PlaceholderKind::parse(&caps[1])
            .zip(caps[2].parse::<usize>().ok())
            .map(|(kind, index)| PlaceholderToken { kind, index });
        let Some(token) = parsed else {
            // Unknown kinds stay as written.
            return caps[0].to_string();
        };

        let (state, body) = slot_body(token, form, related, steps);
        slots.push(PlaceholderSlot { token, state });
        render_slot(token, form, state, &body)
    }
}

fn slot_body(
    token: PlaceholderToken,
    form: SlotForm,
    related: &RelatedResults,
    steps: &[RelatedContentStep],
) -> (SlotState, String) {
    let body = match token.kind {
        PlaceholderKind::Tweet => related.tweets.get(token.index).map(|post| match form {
            SlotForm::Block => format!(
                "<blockquote><p>{}</p><p>@{}</p></blockquote><a href=\"{}\">View post</a>",
                escape_html(&post.text),
                escape_html(&post.author),
                escape_html(&post.url)
            ),
            SlotForm::Inline => format!(
                "<a href=\"{}\">@{}</a>",
                escape_html(&post.url),
                escape_html(&post.author)
            ),
        }),
        PlaceholderKind::Article => related.articles.get(token.index).map(|article| {
            let link = format!(
                "<a href=\"{}\">{}</a>",
                escape_html(&article.url),
                escape_html(&article.title)
            );
            match (form, article.source.as_deref()) {
                (SlotForm::Block, Some(source)) => {
                    format!("{}<figcaption>{}</figcaption>", link, escape_html(source))
                }
                _ => link,
            }
        }),
        PlaceholderKind::Video => related.videos.get(token.index).map(|video| {
            let label = match &video.thumbnail_url {
                Some(thumb) => format!(
                    "<img src=\"{}\" alt=\"{}\">",
                    escape_html(thumb),
                    escape_html(&video.title)
                ),
                None => escape_html(&video.title),
            };
            let link = format!("<a href=\"{}\">{}</a>", escape_html(&video.url), label);
            match form {
                SlotForm::Block => {
                    format!("{}<figcaption>{}</figcaption>", link, escape_html(&video.title))
                }
                SlotForm::Inline => link,
            }
        }),
        PlaceholderKind::HeroImage => related
            .articles
            .get(token.index)
            .and_then(|article| {
                article.image_url.as_deref().map(|src| {
                    format!(
                        "<img src=\"{}\" alt=\"{}\">",
                        escape_html(src),
                        escape_html(&article.title)
                    )
                })
            }),
    };

    match body {
        Some(body) => (SlotState::Resolved, body),
        None if source_finished(token.kind, steps) => (SlotState::Unavailable, String::new()),
        None => (SlotState::Loading, String::new()),
    }
}

fn source_finished(kind: PlaceholderKind, steps: &[RelatedContentStep]) -> bool {
    let source = kind.source_step();
    steps
        .iter()
        .find(|step| step.id == source)
        .map(|step| step.status.is_finished())
        .unwrap_or(false)
}

fn render_slot(token: PlaceholderToken, form: SlotForm, state: SlotState, body: &str) -> String {
    let tag = match form {
        SlotForm::Block => "figure",
        SlotForm::Inline => "span",
    };
    let modifier = match state {
        SlotState::Resolved => "",
        SlotState::Loading => " embed-loading",
        SlotState::Unavailable => " embed-unavailable",
    };
    format!(
        "<{tag} class=\"embed embed-{kind_class}{modifier}\" data-kind=\"{kind}\" data-index=\"{index}\">{body}</{tag}>",
        kind_class = kind_class(token.kind),
        kind = token.kind.as_str(),
        index = token.index,
    )
}

pub(crate) fn kind_class(kind: PlaceholderKind) -> &'static str {
    match kind {
        PlaceholderKind::HeroImage => "hero-image",
        PlaceholderKind::Tweet => "tweet",
        PlaceholderKind::Article => "article",
        PlaceholderKind::Video => "video",
    }
}

fn compile(pattern: &str) -> ScribeResult<Regex> {
    Regex::new(pattern)
        .map_err(|e| ScribeError::Config(format!("Invalid placeholder pattern {}: {}", pattern, e)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use scribe_core_types::{Article, RelatedStepId, SocialPost, StepStatus};

    fn resolver() -> PlaceholderResolver {
        PlaceholderResolver::new().expect("patterns compile")
    }

    fn related() -> RelatedResults {
        RelatedResults {
            tweets: vec![SocialPost {
                id: "1".to_string(),
                author: "ada".to_string(),
                text: "Ship it <now>".to_string(),
                url: "https://social.example.com/1".to_string(),
            }],
            articles: vec![Article {
                title: "Async Rust".to_string(),
                url: "https://news.example.com/async".to_string(),
                source: Some("News".to_string()),
                snippet: None,
                image_url: Some("https://img.example.com/a.png".to_string()),
            }],
            videos: vec![],
        }
    }

    fn steps(status: StepStatus) -> Vec<RelatedContentStep> {
        RelatedStepId::ALL
            .iter()
            .map(|id| RelatedContentStep {
                id: *id,
                status,
                count: 0,
            })
            .collect()
    }

    #[test]
    fn block_marker_resolves_to_figure() {
        let (html, slots) = resolver().resolve(
            "<p>{{tweet:0}}</p>",
            &related(),
            &steps(StepStatus::Done),
        );
        assert_eq!(
            html,
            "<figure class=\"embed embed-tweet\" data-kind=\"tweet\" data-index=\"0\">\
             <blockquote><p>Ship it &lt;now&gt;</p><p>@ada</p></blockquote>\
             <a href=\"https://social.example.com/1\">View post</a></figure>"
        );
        assert_eq!(slots.len(), 1);
        assert_eq!(slots[0].state, SlotState::Resolved);
    }

    #[test]
    fn missing_entry_is_loading_until_category_finishes() {
        let r = resolver();
        let (loading, slots) = r.resolve(
            "<p>{{video:0}}</p>",
            &related(),
            &steps(StepStatus::Running),
        );
        assert_eq!(
            loading,
            "<figure class=\"embed embed-video embed-loading\" data-kind=\"video\" data-index=\"0\"></figure>"
        );
        assert_eq!(slots[0].state, SlotState::Loading);

        let (unavailable, slots) =
            r.resolve("<p>{{video:0}}</p>", &related(), &steps(StepStatus::Failed));
        assert_eq!(
            unavailable,
            "<figure class=\"embed embed-video embed-unavailable\" data-kind=\"video\" data-index=\"0\"></figure>"
        );
        assert_eq!(slots[0].state, SlotState::Unavailable);
    }

    #[test]
    fn inline_marker_uses_span_and_hero_uses_article_image() {
        let (html, _) = resolver().resolve(
            "<p>Lead {{heroImage:0}} text</p>",
            &related(),
            &steps(StepStatus::Done),
        );
        assert_eq!(
            html,
            "<p>Lead <span class=\"embed embed-hero-image\" data-kind=\"heroImage\" data-index=\"0\">\
             <img src=\"https://img.example.com/a.png\" alt=\"Async Rust\"></span> text</p>"
        );
    }

    #[test]
    fn resolution_is_idempotent() {
        let r = resolver();
        let input = "<p>{{article:0}}</p><p>See {{tweet:3}}</p>";
        let first = r.resolve(input, &related(), &steps(StepStatus::Running));
        let second = r.resolve(input, &related(), &steps(StepStatus::Running));
        assert_eq!(first, second);
    }

    #[test]
    fn unknown_kinds_are_left_alone() {
        let (html, slots) =
            resolver().resolve("<p>{{podcast:1}}</p>", &related(), &steps(StepStatus::Done));
        assert_eq!(html, "<p>{{podcast:1}}</p>");
        assert!(slots.is_empty());
    }

    #[test]
    fn trailing_fragments_are_hidden() {
        let r = resolver();
        assert_eq!(r.hide_incomplete_marker("Intro {{twe"), "Intro ");
        assert_eq!(r.hide_incomplete_marker("Intro {{tweet:1"), "Intro ");
        assert_eq!(r.hide_incomplete_marker("Intro {{tweet:1}"), "Intro ");
        assert_eq!(r.hide_incomplete_marker("Intro {"), "Intro ");
        assert_eq!(r.hide_incomplete_marker("Intro {{tweet:1}}"), "Intro {{tweet:1}}");
        assert_eq!(r.hide_incomplete_marker("Plain text"), "Plain text");
    }
}
