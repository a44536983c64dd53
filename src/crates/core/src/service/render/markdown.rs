//! Line-oriented markdown to HTML
//!
//! Every rule matches within one source line, so a truncated document can never
//! let a rule swallow the rest of the buffer. Raw HTML is passed through untouched;
//! the sanitizer decides what survives.

use super::escape_html;
use crate::service::config::RenderConfig;
use crate::util::errors::{ScribeError, ScribeResult};
use regex::{Captures, Regex};

pub struct MarkdownRenderer {
    heading_max_chars: usize,
    quote_max_chars: usize,
    heading: Regex,
    rule: Regex,
    quote: Regex,
    bullet: Regex,
    ordered: Regex,
    code_span: Regex,
    link: Regex,
    strong: Regex,
    em_star: Regex,
    em_underscore: Regex,
    marker: Regex,
}

enum Block {
    None,
    Paragraph(Vec<String>),
    Quote(Vec<String>),
    List { ordered: bool, items: Vec<String> },
}

impl MarkdownRenderer {
    pub fn new(config: &RenderConfig) -> ScribeResult<Self> {
        Ok(Self {
            heading_max_chars: config.heading_max_chars,
            quote_max_chars: config.quote_max_chars,
            heading: compile(r"^(#{1,6})[ \t]+(.*)$")?,
            rule: compile(r"^[ \t]*([-*_])(?:[ \t]*[-*_]){2,}[ \t]*$")?,
            quote: compile(r"^[ \t]*>[ \t]?(.*)$")?,
            bullet: compile(r"^[ \t]*[-*+][ \t]+(.*)$")?,
            ordered: compile(r"^[ \t]*\d{1,9}[.)][ \t]+(.*)$")?,
            code_span: compile(r"`([^`\n]+)`")?,
            link: compile(r#"\[([^\]\n]+)\]\(([^)\s]+)(?:[ \t]+"([^"\n]*)")?\)"#)?,
            strong: compile(r"\*\*([^*\s](?:[^*\n]*[^*\s])?)\*\*")?,
            em_star: compile(r"\*([^*\s](?:[^*\n]*[^*\s])?)\*")?,
            em_underscore: compile(r"(^|[^A-Za-z0-9_])_([^_\s](?:[^_\n]*[^_\s])?)_")?,
            marker: compile(r"\{\{\s*[A-Za-z]+\s*:\s*\d{1,6}\s*\}\}")?,
        })
    }

    pub fn heading_max_chars(&self) -> usize {
        self.heading_max_chars
    }

    pub fn quote_max_chars(&self) -> usize {
        self.quote_max_chars
    }

    pub fn to_html(&self, text: &str) -> String {
        let mut html = String::with_capacity(text.len() + text.len() / 4);
        let mut block = Block::None;

        for raw_line in text.lines() {
            let line = raw_line.trim_end_matches('\r');

            if line.trim().is_empty() {
                self.flush(&mut block, &mut html);
                continue;
            }

            if let Some(caps) = self.heading.captures(line) {
                self.flush(&mut block, &mut html);
                let level = caps[1].len();
                let (head, overflow) = self.split_capped(caps[2].trim(), self.heading_max_chars);
                html.push_str(&format!("<h{level}>{}</h{level}>", self.inline(head.trim_end())));
                if let Some(rest) = overflow.filter(|r| !r.trim().is_empty()) {
                    html.push_str(&format!("<p>{}</p>", self.inline(rest.trim_start())));
                }
                continue;
            }

            if self.rule.is_match(line) {
                self.flush(&mut block, &mut html);
                html.push_str("<hr>");
                continue;
            }

            if let Some(caps) = self.quote.captures(line) {
                if !matches!(block, Block::Quote(_)) {
                    self.flush(&mut block, &mut html);
                    block = Block::Quote(Vec::new());
                }
                let (head, overflow) = self.split_capped(&caps[1], self.quote_max_chars);
                if let Block::Quote(lines) = &mut block {
                    lines.push(self.inline(head));
                }
                if let Some(rest) = overflow.filter(|r| !r.trim().is_empty()) {
                    self.flush(&mut block, &mut html);
                    block = Block::Paragraph(vec![self.inline(rest.trim_start())]);
                }
                continue;
            }

            let list_item = self
                .bullet
                .captures(line)
                .map(|caps| (false, caps))
                .or_else(|| self.ordered.captures(line).map(|caps| (true, caps)));
            if let Some((ordered, caps)) = list_item {
                let item = self.inline(caps[1].trim());
                match &mut block {
                    Block::List {
                        ordered: current,
                        items,
                    } if *current == ordered => items.push(item),
                    _ => {
                        self.flush(&mut block, &mut html);
                        block = Block::List {
                            ordered,
                            items: vec![item],
                        };
                    }
                }
                continue;
            }

            // Indented lines continue the previous list item.
            if line.starts_with([' ', '\t']) {
                if let Block::List { items, .. } = &mut block {
                    if let Some(last) = items.last_mut() {
                        last.push('\n');
                        last.push_str(&self.inline(line.trim()));
                        continue;
                    }
                }
            }

            match &mut block {
                Block::Paragraph(lines) => lines.push(self.inline(line.trim())),
                _ => {
                    self.flush(&mut block, &mut html);
                    block = Block::Paragraph(vec![self.inline(line.trim())]);
                }
            }
        }

        self.flush(&mut block, &mut html);
        html
    }

    /// Cap `text` at `max_chars`, moving the cut back before any placeholder marker
    /// it would otherwise split.
    fn split_capped<'a>(&self, text: &'a str, max_chars: usize) -> (&'a str, Option<&'a str>) {
        let (head, overflow) = split_at_chars(text, max_chars);
        if overflow.is_none() {
            return (head, None);
        }
        let cut = head.len();
        match self
            .marker
            .find_iter(text)
            .find(|m| m.start() < cut && cut < m.end())
        {
            Some(m) => (&text[..m.start()], Some(&text[m.start()..])),
            None => (head, overflow),
        }
    }

    fn flush(&self, block: &mut Block, html: &mut String) {
        match std::mem::replace(block, Block::None) {
            Block::None => {}
            Block::Paragraph(lines) => {
                html.push_str("<p>");
                html.push_str(&lines.join("\n"));
                html.push_str("</p>");
            }
            Block::Quote(lines) => {
                html.push_str("<blockquote><p>");
                html.push_str(&lines.join("\n"));
                html.push_str("</p></blockquote>");
            }
            Block::List { ordered, items } => {
                let tag = if ordered { "ol" } else { "ul" };
                html.push_str(&format!("<{}>", tag));
                for item in items {
                    html.push_str("<li>");
                    html.push_str(&item);
                    html.push_str("</li>");
                }
                html.push_str(&format!("</{}>", tag));
            }
        }
    }

    /// Inline formatting for a single line. Code spans are opaque to the other rules.
    fn inline(&self, line: &str) -> String {
        let mut out = String::with_capacity(line.len());
        let mut last = 0;
        for caps in self.code_span.captures_iter(line) {
            let Some(whole) = caps.get(0) else { continue };
            out.push_str(&self.links(&line[last..whole.start()]));
            out.push_str("<code>");
            out.push_str(&escape_html(&caps[1]));
            out.push_str("</code>");
            last = whole.end();
        }
        out.push_str(&self.links(&line[last..]));
        out
    }

    fn links(&self, text: &str) -> String {
        let mut out = String::with_capacity(text.len());
        let mut last = 0;
        for caps in self.link.captures_iter(text) {
            let Some(whole) = caps.get(0) else { continue };
            out.push_str(&self.emphasis(&text[last..whole.start()]));
            out.push_str(&format!("<a href=\"{}\"", escape_html(&caps[2])));
            if let Some(title) = caps.get(3) {
                out.push_str(&format!(" title=\"{}\"", escape_html(title.as_str())));
            }
            out.push('>');
            out.push_str(&self.emphasis(&caps[1]));
            out.push_str("</a>");
            last = whole.end();
        }
        out.push_str(&self.emphasis(&text[last..]));
        out
    }

    fn emphasis(&self, text: &str) -> String {
        let text = self.strong.replace_all(text, "<strong>$1</strong>");
        let text = self.em_star.replace_all(&text, "<em>$1</em>");
        self.em_underscore
            .replace_all(&text, |caps: &Captures| format!("{}<em>{}</em>", &caps[1], &caps[2]))
            .into_owned()
    }
}

fn compile(pattern: &str) -> ScribeResult<Regex> {
    Regex::new(pattern)
        .map_err(|e| ScribeError::Config(format!("Invalid render pattern {}: {}", pattern, e)))
}

/// Split after `max_chars` characters, never inside a code point.
fn split_at_chars(text: &str, max_chars: usize) -> (&str, Option<&str>) {
    match text.char_indices().nth(max_chars) {
        Some((idx, _)) => (&text[..idx], Some(&text[idx..])),
        None => (text, None),
    }
}
