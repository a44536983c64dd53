//! One-way event channels over SSE

use crate::stream_handler::{handle_article_search_stream, handle_generation_stream};
use anyhow::{anyhow, Result};
use async_trait::async_trait;
use log::{debug, warn};
use reqwest::header::{HeaderName, HeaderValue, ACCEPT};
use reqwest::{Client, Response};
use scribe_core_types::{ArticleSearchEvent, StreamDescriptor, StreamEvent};
use std::str::FromStr;
use std::time::Duration;
use tokio::sync::mpsc;

const EVENT_STREAM_MIME_TYPE: &str = "text/event-stream";

/// Opens a generation channel and yields its events in arrival order.
///
/// An `Err` from `open` means the channel never came up. Once open, a channel
/// failure arrives as a terminal `StreamEvent::Error`; the transport never
/// reconnects on its own.
#[async_trait]
pub trait StreamTransport: Send + Sync {
    async fn open(
        &self,
        descriptor: &StreamDescriptor,
    ) -> Result<mpsc::UnboundedReceiver<StreamEvent>>;
}

/// SSE transport backed by reqwest.
#[derive(Clone)]
pub struct SseStreamTransport {
    client: Client,
    idle_timeout: Option<Duration>,
}

impl SseStreamTransport {
    pub fn new(client: Client) -> Self {
        Self {
            client,
            idle_timeout: None,
        }
    }

    /// Report a channel as failed after this much silence. Off by default.
    pub fn with_idle_timeout(mut self, idle_timeout: Option<Duration>) -> Self {
        self.idle_timeout = idle_timeout;
        self
    }

    /// Open the article search channel used by related-content lookups.
    pub async fn open_article_search(
        &self,
        descriptor: &StreamDescriptor,
    ) -> Result<mpsc::UnboundedReceiver<ArticleSearchEvent>> {
        let response = self.connect(descriptor).await?;
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(handle_article_search_stream(response, tx));
        Ok(rx)
    }

    async fn connect(&self, descriptor: &StreamDescriptor) -> Result<Response> {
        let mut request = if descriptor.body.is_null() {
            self.client.get(&descriptor.url)
        } else {
            self.client.post(&descriptor.url).json(&descriptor.body)
        };
        request = request.header(ACCEPT, EVENT_STREAM_MIME_TYPE);

        for (name, value) in &descriptor.headers {
            let Ok(header_name) = HeaderName::from_str(name) else {
                warn!("Invalid stream header name (skipping): {}", name);
                continue;
            };
            let Ok(header_value) = HeaderValue::from_str(value.trim()) else {
                warn!("Invalid stream header value (skipping): header={}", name);
                continue;
            };
            request = request.header(header_name, header_value);
        }

        let response = request
            .send()
            .await
            .map_err(|e| anyhow!("Failed to open stream {}: {}", descriptor.url, e))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(anyhow!(
                "Stream open rejected: url={}, status={}, body={}",
                descriptor.url,
                status.as_u16(),
                body.trim()
            ));
        }

        debug!("Stream opened: url={}, status={}", descriptor.url, status);
        Ok(response)
    }
}

#[async_trait]
impl StreamTransport for SseStreamTransport {
    async fn open(
        &self,
        descriptor: &StreamDescriptor,
    ) -> Result<mpsc::UnboundedReceiver<StreamEvent>> {
        let response = self.connect(descriptor).await?;
        let (tx, rx) = mpsc::unbounded_channel();
        tokio::spawn(handle_generation_stream(response, tx, self.idle_timeout));
        Ok(rx)
    }
}
