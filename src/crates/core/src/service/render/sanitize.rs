//! Allow-list HTML sanitizer
//!
//! Anything outside the lists below is removed, never escaped and shown.
//! `script` and `style` lose their content as well as their tags.

use ammonia::Builder;
use std::collections::{HashMap, HashSet};

pub const ALLOWED_TAGS: &[&str] = &[
    "p",
    "br",
    "hr",
    "h1",
    "h2",
    "h3",
    "h4",
    "h5",
    "h6",
    "blockquote",
    "ul",
    "ol",
    "li",
    "strong",
    "em",
    "code",
    "a",
    "figure",
    "figcaption",
    "img",
    "span",
];

pub const ALLOWED_GENERIC_ATTRIBUTES: &[&str] = &["data-kind", "data-index"];

pub const ALLOWED_URL_SCHEMES: &[&str] = &["http", "https", "mailto"];

pub const SLOT_CLASSES: &[&str] = &[
    "embed",
    "embed-loading",
    "embed-unavailable",
    "embed-hero-image",
    "embed-tweet",
    "embed-article",
    "embed-video",
];

pub const LINK_REL: &str = "noopener noreferrer";

/// Added to matching `<a>` elements by the CTA tagger after sanitization, with a
/// fixed `cta-link` class and `data-cta="true"`. Never accepted from input.
pub const CTA_LINK_ATTRIBUTES: &[&str] = &["class", "data-cta"];

/// Tag-specific attributes, as `(tag, attributes)`.
pub fn allowed_tag_attributes() -> HashMap<&'static str, HashSet<&'static str>> {
    HashMap::from([
        ("a", HashSet::from(["href", "title"])),
        ("img", HashSet::from(["src", "alt"])),
    ])
}

fn builder() -> Builder<'static> {
    let slot_classes: HashSet<&'static str> = SLOT_CLASSES.iter().copied().collect();

    let mut builder = Builder::empty();
    builder
        .tags(ALLOWED_TAGS.iter().copied().collect())
        .tag_attributes(allowed_tag_attributes())
        .generic_attributes(ALLOWED_GENERIC_ATTRIBUTES.iter().copied().collect())
        .allowed_classes(HashMap::from([
            ("figure", slot_classes.clone()),
            ("span", slot_classes),
        ]))
        .url_schemes(ALLOWED_URL_SCHEMES.iter().copied().collect())
        .link_rel(Some(LINK_REL))
        .clean_content_tags(HashSet::from(["script", "style"]))
        .strip_comments(true);
    builder
}

/// Never fails; hostile or malformed input degrades to stripped output.
pub fn sanitize_html(html: &str) -> String {
    builder().clean(html).to_string()
}

/// Checks rendered output against the allow-lists above plus the CTA link attributes.
#[cfg(test)]
pub(crate) fn assert_within_allow_list(html: &str) {
    use regex::Regex;

    let tag_re = Regex::new(r"<\s*/?\s*([A-Za-z][A-Za-z0-9-]*)([^>]*)>").expect("valid");
    let attr_re = Regex::new(r#"([A-Za-z][A-Za-z0-9_-]*)\s*=\s*"([^"]*)""#).expect("valid");
    let tag_attributes = allowed_tag_attributes();

    for caps in tag_re.captures_iter(html) {
        let tag = caps[1].to_ascii_lowercase();
        assert!(ALLOWED_TAGS.contains(&tag.as_str()), "tag <{}> in {}", tag, html);

        for attr in attr_re.captures_iter(&caps[2]) {
            let name = attr[1].to_ascii_lowercase();
            let value = &attr[2];
            let cta_link = tag == "a"
                && CTA_LINK_ATTRIBUTES.contains(&name.as_str())
                && matches!(value, "cta-link" | "true");
            let allowed = ALLOWED_GENERIC_ATTRIBUTES.contains(&name.as_str())
                || (name == "class" && (tag == "figure" || tag == "span"))
                || (name == "rel" && tag == "a")
                || cta_link
                || tag_attributes
                    .get(tag.as_str())
                    .map(|set| set.contains(name.as_str()))
                    .unwrap_or(false);
            assert!(allowed, "attribute {} on <{}> in {}", name, tag, html);
        }
    }
}
