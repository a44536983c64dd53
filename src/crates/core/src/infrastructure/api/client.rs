//! Shared HTTP client for the Scribe backend

use crate::service::config::ApiConfig;
use crate::util::errors::{ScribeError, ScribeResult};
use log::{debug, warn};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, AUTHORIZATION, USER_AGENT};
use reqwest::{Client, RequestBuilder, Response};
use scribe_ai_adapters::SseStreamTransport;
use scribe_core_types::StreamDescriptor;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;
use std::collections::HashMap;
use std::str::FromStr;
use std::time::Duration;

const CLIENT_USER_AGENT: &str = "Scribe-Client/1.0";

#[derive(Clone)]
pub struct ApiClient {
    http: Client,
    base_url: String,
    authorization: Option<String>,
    extra_headers: HashMap<String, String>,
    request_timeout: Duration,
    streams: SseStreamTransport,
}

impl ApiClient {
    pub fn new(config: &ApiConfig) -> ScribeResult<Self> {
        Self::with_stream_idle_timeout(config, None)
    }

    pub fn with_stream_idle_timeout(
        config: &ApiConfig,
        stream_idle_timeout: Option<Duration>,
    ) -> ScribeResult<Self> {
        let base_url = config.base_url.trim().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(ScribeError::Config("api.base_url must not be empty".to_string()));
        }

        let authorization = config
            .token
            .as_deref()
            .and_then(normalize_authorization_value);

        // No client-wide timeout: it would also cut long-lived streams.
        let http = Client::builder()
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .default_headers(build_default_headers(&config.headers))
            .build()
            .map_err(|e| ScribeError::Config(format!("Failed to create HTTP client: {}", e)))?;

        let streams = SseStreamTransport::new(http.clone()).with_idle_timeout(stream_idle_timeout);

        Ok(Self {
            http,
            base_url,
            authorization,
            extra_headers: config.headers.clone(),
            request_timeout: Duration::from_secs(config.request_timeout_secs),
            streams,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn streams(&self) -> &SseStreamTransport {
        &self.streams
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    /// Describe a streaming endpoint, carrying the same auth the JSON calls use.
    pub fn descriptor_for(&self, path: &str, body: Value) -> StreamDescriptor {
        let mut headers = self.extra_headers.clone();
        headers.retain(|name, _| !name.eq_ignore_ascii_case(AUTHORIZATION.as_str()));
        if let Some(authorization) = &self.authorization {
            headers.insert(AUTHORIZATION.as_str().to_string(), authorization.clone());
        }
        StreamDescriptor {
            url: self.url(path),
            body,
            headers,
        }
    }

    pub async fn get_json<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, String)],
    ) -> ScribeResult<T> {
        let request = self.http.get(self.url(path)).query(query);
        self.send(request, path, true).await
    }

    pub async fn post_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> ScribeResult<T> {
        let request = self.http.post(self.url(path)).json(body);
        self.send(request, path, true).await
    }

    /// POST without the per-request timeout, for calls that may block for a long time.
    pub async fn post_json_unbounded<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> ScribeResult<T> {
        let request = self.http.post(self.url(path)).json(body);
        self.send(request, path, false).await
    }

    pub async fn put_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> ScribeResult<T> {
        let request = self.http.put(self.url(path)).json(body);
        self.send(request, path, true).await
    }

    async fn send<T: DeserializeOwned>(
        &self,
        mut request: RequestBuilder,
        path: &str,
        bounded: bool,
    ) -> ScribeResult<T> {
        if let Some(authorization) = &self.authorization {
            request = request.header(AUTHORIZATION, authorization);
        }
        if bounded {
            request = request.timeout(self.request_timeout);
        }

        let response = request.send().await?;
        debug!("API response: path={}, status={}", path, response.status());
        decode_response(response).await
    }
}

async fn decode_response<T: DeserializeOwned>(response: Response) -> ScribeResult<T> {
    let status = response.status();
    let body = response.text().await?;

    if !status.is_success() {
        return Err(ScribeError::Api {
            status: status.as_u16(),
            message: extract_api_message(&body),
        });
    }

    Ok(serde_json::from_str(&body)?)
}

fn extract_api_message(body: &str) -> String {
    if let Ok(json) = serde_json::from_str::<Value>(body) {
        for key in ["message", "error"] {
            match json.get(key) {
                Some(Value::String(message)) => return message.clone(),
                Some(Value::Object(inner)) => {
                    if let Some(Value::String(message)) = inner.get("message") {
                        return message.clone();
                    }
                }
                _ => {}
            }
        }
    }
    body.trim().to_string()
}

pub(crate) fn normalize_authorization_value(value: &str) -> Option<String> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return None;
    }

    // Values that already carry a scheme are kept as-is.
    if trimmed.to_ascii_lowercase().starts_with("bearer ") || trimmed.contains(char::is_whitespace)
    {
        return Some(trimmed.to_string());
    }

    Some(format!("Bearer {}", trimmed))
}

fn build_default_headers(headers: &HashMap<String, String>) -> HeaderMap {
    let mut header_map = HeaderMap::new();

    for (name, value) in headers {
        let Ok(header_name) = HeaderName::from_str(name) else {
            warn!("Invalid HTTP header name in config (skipping): {}", name);
            continue;
        };
        if header_name == AUTHORIZATION {
            continue;
        }
        let Ok(header_value) = HeaderValue::from_str(value.trim()) else {
            warn!("Invalid HTTP header value in config (skipping): header={}", name);
            continue;
        };
        header_map.insert(header_name, header_value);
    }

    if !header_map.contains_key(USER_AGENT) {
        header_map.insert(USER_AGENT, HeaderValue::from_static(CLIENT_USER_AGENT));
    }

    header_map
}
