//! The three generation tiers
//!
//! Each tier runs at most once per attempt and stops at the first cancellation.
//! Tiers report what they observe through a `TierSink`; the orchestrator owns the
//! session state and decides what to do with it.

use crate::infrastructure::api::GenerationApi;
use crate::util::errors::{ScribeError, ScribeResult};
use log::{debug, warn};
use scribe_ai_adapters::StreamTransport;
use scribe_core_types::{
    GenerationPayload, GenerationRequest, JobState, JobStatus, StreamDescriptor, StreamEvent,
};
use serde_json::Value;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub trait TierSink: Send + Sync {
    /// Ordered content delta from the stream tier.
    fn on_chunk(&self, text: &str);

    /// Cumulative partial content reported by a job poll.
    fn on_partial_content(&self, content: &str);

    fn on_job_status(&self, job_id: &str, status: &JobStatus);

    fn on_narration(&self, info: Value);
}

/// The complete payload wins when it has content; otherwise the accumulated text is used.
pub fn prefer_payload(mut payload: GenerationPayload, accumulated: &str) -> GenerationPayload {
    if payload.non_empty_content().is_none() && !accumulated.trim().is_empty() {
        payload.content = Some(accumulated.to_string());
    }
    payload
}

/// Consume a stream until it completes, fails or closes.
///
/// Only a `Complete` event finishes the tier. A channel that closes first is a
/// transport error, whatever text has arrived.
pub async fn run_stream_tier(
    transport: &dyn StreamTransport,
    descriptor: &StreamDescriptor,
    cancel: &CancellationToken,
    sink: &dyn TierSink,
) -> ScribeResult<GenerationPayload> {
    let mut rx = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(ScribeError::Cancelled),
        opened = transport.open(descriptor) => {
            opened.map_err(|e| ScribeError::Transport(e.to_string()))?
        }
    };

    let mut accumulated = String::new();
    let mut chunk_count = 0usize;

    loop {
        let event = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ScribeError::Cancelled),
            event = rx.recv() => event,
        };

        match event {
            Some(StreamEvent::Chunk { text }) => {
                chunk_count += 1;
                accumulated.push_str(&text);
                sink.on_chunk(&text);
            }
            Some(StreamEvent::Complete { payload }) => {
                debug!(
                    "Stream completed: chunks={}, payload_content={}",
                    chunk_count,
                    payload.non_empty_content().is_some()
                );
                return Ok(prefer_payload(payload, &accumulated));
            }
            Some(StreamEvent::Error { message }) => {
                return Err(ScribeError::Transport(message));
            }
            Some(StreamEvent::QueriesExtracted { info }) => sink.on_narration(info),
            None => {
                warn!(
                    "Stream closed before response completed: chunks={}, chars={}",
                    chunk_count,
                    accumulated.chars().count()
                );
                return Err(ScribeError::Transport(
                    "Stream closed before response completed".to_string(),
                ));
            }
        }
    }
}

/// Submit a job. Any failure here means job generation is unavailable.
pub async fn submit_job(
    api: &dyn GenerationApi,
    request: &GenerationRequest,
    cancel: &CancellationToken,
) -> ScribeResult<String> {
    let submission = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(ScribeError::Cancelled),
        submitted = api.submit_job(request) => submitted,
    };
    submission
        .map(|s| s.job_id)
        .map_err(|e| ScribeError::Unavailable(format!("Job submission failed: {}", e)))
}

/// Ask the backend to resume a job, returning the id to poll.
pub async fn resume_job(
    api: &dyn GenerationApi,
    job_id: &str,
    cancel: &CancellationToken,
) -> ScribeResult<String> {
    let resumed = tokio::select! {
        biased;
        _ = cancel.cancelled() => return Err(ScribeError::Cancelled),
        resumed = api.retry_job(job_id) => resumed,
    };
    resumed.map(|s| s.job_id).map_err(|e| ScribeError::Job {
        job_id: Some(job_id.to_string()),
        message: format!("Job retry failed: {}", e),
    })
}

/// Poll a job until it completes or fails. Every failure carries the job id so
/// the user can resume it.
pub async fn poll_job(
    api: &dyn GenerationApi,
    job_id: &str,
    interval: Duration,
    cancel: &CancellationToken,
    sink: &dyn TierSink,
) -> ScribeResult<GenerationPayload> {
    let job_error = |message: String| ScribeError::Job {
        job_id: Some(job_id.to_string()),
        message,
    };
    let mut partial = String::new();

    loop {
        let status = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ScribeError::Cancelled),
            polled = api.poll_job(job_id) => {
                polled.map_err(|e| job_error(format!("Job poll failed: {}", e)))?
            }
        };

        sink.on_job_status(job_id, &status);
        if let Some(content) = status.partial_content.as_deref() {
            if !content.is_empty() && content != partial {
                partial = content.to_string();
                sink.on_partial_content(&partial);
            }
        }

        match status.status {
            JobState::Completed => {
                let payload = status.result.clone().unwrap_or_default();
                debug!("Job completed: job_id={}", job_id);
                return Ok(prefer_payload(payload, &partial));
            }
            JobState::Failed => {
                let message = status
                    .error
                    .clone()
                    .unwrap_or_else(|| "Job reported failure".to_string());
                return Err(job_error(message));
            }
            JobState::Unknown => {
                warn!("Unrecognised job state; continuing to poll: job_id={}", job_id);
            }
            JobState::Queued | JobState::Running => {}
        }

        tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(ScribeError::Cancelled),
            _ = tokio::time::sleep(interval) => {}
        }
    }
}

/// The last resort. Blocks this flow, not the runtime, until one result arrives.
pub async fn run_sync_tier(
    api: &dyn GenerationApi,
    request: &GenerationRequest,
    cancel: &CancellationToken,
) -> ScribeResult<GenerationPayload> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(ScribeError::Cancelled),
        result = api.generate_sync(request) => result,
    }
}
