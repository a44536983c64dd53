use crate::types::parse_article_search_event;
use eventsource_stream::Eventsource;
use futures::StreamExt;
use log::{debug, error, trace};
use reqwest::Response;
use scribe_core_types::ArticleSearchEvent;
use tokio::sync::mpsc;

/// Forward article search narration and the final article list.
///
/// Closing the channel before an `articles` event is reported as an error so the
/// consumer can resolve the category as failed instead of waiting forever.
pub async fn handle_article_search_stream(
    response: Response,
    tx_event: mpsc::UnboundedSender<ArticleSearchEvent>,
) {
    let mut stream = response.bytes_stream().eventsource();

    while let Some(next) = stream.next().await {
        let sse = match next {
            Ok(sse) => sse,
            Err(e) => {
                let error_msg = format!("Article search SSE error: {}", e);
                error!("{}", error_msg);
                let _ = tx_event.send(ArticleSearchEvent::Error { message: error_msg });
                return;
            }
        };

        trace!("Article search SSE: event={}, data={:?}", sse.event, sse.data);

        let Some(event) = parse_article_search_event(&sse.event, &sse.data) else {
            continue;
        };

        let terminal = !matches!(event, ArticleSearchEvent::QueriesExtracted { .. });
        if tx_event.send(event).is_err() {
            debug!("Article search consumer dropped; stopping handler");
            return;
        }
        if terminal {
            return;
        }
    }

    let error_msg = "Article search stream closed before results arrived";
    error!("{}", error_msg);
    let _ = tx_event.send(ArticleSearchEvent::Error {
        message: error_msg.to_string(),
    });
}
