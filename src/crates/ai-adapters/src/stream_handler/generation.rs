use crate::types::parse_generation_event;
use eventsource_stream::Eventsource;
use futures::StreamExt;
use log::{debug, error, trace};
use reqwest::Response;
use scribe_core_types::StreamEvent;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;

/// Convert a generation SSE byte stream into ordered typed events
///
/// Events are forwarded exactly in arrival order. The handler stops after the
/// first terminal event (`complete` or `error`); if the server closes the
/// channel without one, the sender is simply dropped and the consumer decides
/// what the accumulated chunks mean.
///
/// # Arguments
/// * `response` - HTTP response of the opened channel
/// * `tx_event` - parsed event sender
/// * `idle_timeout` - optional gap after which the channel is reported as failed
pub async fn handle_generation_stream(
    response: Response,
    tx_event: mpsc::UnboundedSender<StreamEvent>,
    idle_timeout: Option<Duration>,
) {
    let mut stream = response.bytes_stream().eventsource();

    loop {
        let next = match idle_timeout {
            Some(limit) => match timeout(limit, stream.next()).await {
                Ok(next) => next,
                Err(_) => {
                    let error_msg = format!("SSE stream idle for {}s", limit.as_secs());
                    error!("{}", error_msg);
                    let _ = tx_event.send(StreamEvent::Error { message: error_msg });
                    return;
                }
            },
            None => stream.next().await,
        };

        let sse = match next {
            Some(Ok(sse)) => sse,
            Some(Err(e)) => {
                let error_msg = format!("SSE stream error: {}", e);
                error!("{}", error_msg);
                let _ = tx_event.send(StreamEvent::Error { message: error_msg });
                return;
            }
            None => {
                debug!("Generation SSE stream closed by server");
                return;
            }
        };

        trace!("Generation SSE: event={}, data={:?}", sse.event, sse.data);

        let Some(event) = parse_generation_event(&sse.event, &sse.data) else {
            continue;
        };

        let terminal = matches!(
            event,
            StreamEvent::Complete { .. } | StreamEvent::Error { .. }
        );
        if tx_event.send(event).is_err() {
            debug!("Generation stream consumer dropped; stopping handler");
            return;
        }
        if terminal {
            return;
        }
    }
}
