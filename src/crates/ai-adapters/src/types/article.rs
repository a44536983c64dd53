use super::{extract_error_message, resolve_event_kind};
use log::warn;
use scribe_core_types::{Article, ArticleSearchEvent};
use serde_json::Value;

/// Map one raw SSE event of the article search channel to a typed event.
pub fn parse_article_search_event(event_type: &str, data: &str) -> Option<ArticleSearchEvent> {
    let json = serde_json::from_str::<Value>(data).ok();
    let kind = resolve_event_kind(event_type, json.as_ref());

    match kind.as_str() {
        "queriesextracted" | "queries" => Some(ArticleSearchEvent::QueriesExtracted {
            info: json.unwrap_or_else(|| Value::String(data.to_string())),
        }),
        "articles" | "results" | "complete" | "done" => {
            let articles = json.map(extract_articles).unwrap_or_default();
            Some(ArticleSearchEvent::Articles { articles })
        }
        "error" => Some(ArticleSearchEvent::Error {
            message: extract_error_message(json.as_ref(), data),
        }),
        _ => None,
    }
}

fn extract_articles(json: Value) -> Vec<Article> {
    let list = match json {
        Value::Array(items) => items,
        Value::Object(mut body) => match body
            .remove("articles")
            .or_else(|| body.remove("results"))
        {
            Some(Value::Array(items)) => items,
            _ => Vec::new(),
        },
        _ => Vec::new(),
    };

    list.into_iter()
        .filter_map(|item| match serde_json::from_value::<Article>(item) {
            Ok(article) => Some(article),
            Err(e) => {
                warn!("Skipping malformed article entry: error={}", e);
                None
            }
        })
        .collect()
}
