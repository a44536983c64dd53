//! CTA link tagging
//!
//! Runs on sanitized output, so anchors are in ammonia's normalized form and carry
//! no class of their own. The attributes added here are listed in
//! `sanitize::CTA_LINK_ATTRIBUTES`.

use crate::util::errors::{ScribeError, ScribeResult};
use regex::{Captures, Regex};
use reqwest::Url;
use scribe_core_types::Cta;

pub const CTA_CLASS: &str = "cta-link";

pub struct CtaTagger {
    anchor: Regex,
    href: Regex,
    tags: Regex,
}

impl CtaTagger {
    pub fn new() -> ScribeResult<Self> {
        Ok(Self {
            anchor: compile(r"(?s)<a(\s[^>]*)?>(.*?)</a>")?,
            href: compile(r#"\bhref="([^"]*)""#)?,
            tags: compile(r"<[^>]*>")?,
        })
    }

    /// Tag every anchor that matches a known CTA. Returns the html and the tagged count.
    pub fn tag(&self, html: &str, ctas: &[Cta]) -> (String, usize) {
        if ctas.is_empty() {
            return (html.to_string(), 0);
        }

        let targets: Vec<(Option<String>, String)> = ctas
            .iter()
            .map(|cta| (normalize_url(&cta.href), normalize_text(&cta.text)))
            .collect();

        let mut tagged = 0;
        let html = self.anchor.replace_all(html, |caps: &Captures| {
            let attrs = caps.get(1).map(|m| m.as_str()).unwrap_or("");
            let inner = &caps[2];

            let href = self
                .href
                .captures(attrs)
                .and_then(|c| normalize_url(&unescape_entities(&c[1])));
            let text = normalize_text(&unescape_entities(&self.tags.replace_all(inner, "")));

            let matched = targets.iter().any(|(cta_href, cta_text)| {
                let url_match = matches!((&href, cta_href), (Some(a), Some(b)) if a == b);
                url_match || text_contains_cta(&text, cta_text)
            });

            if matched {
                tagged += 1;
                format!(
                    "<a{} class=\"{}\" data-cta=\"true\">{}</a>",
                    attrs, CTA_CLASS, inner
                )
            } else {
                caps[0].to_string()
            }
        });

        (html.into_owned(), tagged)
    }
}

fn compile(pattern: &str) -> ScribeResult<Regex> {
    Regex::new(pattern)
        .map_err(|e| ScribeError::Config(format!("Invalid CTA pattern {}: {}", pattern, e)))
}

/// Scheme and host lowercased, fragment and trailing slashes dropped.
pub fn normalize_url(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return None;
    }

    let normalized = match Url::parse(trimmed) {
        Ok(mut url) => {
            url.set_fragment(None);
            url.to_string()
        }
        Err(_) => trimmed
            .split('#')
            .next()
            .unwrap_or(trimmed)
            .to_ascii_lowercase(),
    };

    let normalized = normalized.trim_end_matches('/').to_string();
    (!normalized.is_empty()).then_some(normalized)
}

fn normalize_text(text: &str) -> String {
    text.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// The link text must contain the whole CTA text. Empty strings never match.
fn text_contains_cta(link_text: &str, cta_text: &str) -> bool {
    !link_text.is_empty() && !cta_text.is_empty() && link_text.contains(cta_text)
}

fn unescape_entities(text: &str) -> String {
    text.replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&quot;", "\"")
        .replace("&#39;", "'")
        .replace("&nbsp;", " ")
        .replace("&amp;", "&")
}
