//! Error types
//!
//! The first five variants are the generation taxonomy; the rest are plumbing.

use scribe_core_types::RelatedStepId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ScribeError {
    /// Stream channel failure. Non-fatal, triggers the next fallback tier.
    #[error("Transport error: {0}")]
    Transport(String),

    /// Job submission or poll failure. With a job id the user can resume it.
    #[error("Job error: {message}")]
    Job {
        job_id: Option<String>,
        message: String,
    },

    /// Missing title or content at commit time; no draft is created.
    #[error("Validation error: {0}")]
    Validation(String),

    /// Hard stop before any network attempt.
    #[error("Quota exceeded: {available} credits available")]
    QuotaExceeded { available: i64 },

    /// One related-content category failed; it degrades to an empty result.
    #[error("Related content fetch failed: step={step:?}, error={message}")]
    PartialFetch { step: RelatedStepId, message: String },

    #[error("Generation already in progress (token {0})")]
    AlreadyRunning(u64),

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("API error: status={status}, message={message}")]
    Api { status: u16, message: String },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Persistence error: {0}")]
    Persistence(String),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Operation cancelled")]
    Cancelled,
}

impl ScribeError {
    /// Job id to offer in a retry prompt, if the failure left one behind.
    pub fn retry_job_id(&self) -> Option<&str> {
        match self {
            ScribeError::Job { job_id, .. } => job_id.as_deref(),
            _ => None,
        }
    }

    /// Whether the user can act on this error without starting over.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            ScribeError::Validation(_)
                | ScribeError::Job { job_id: Some(_), .. }
                | ScribeError::Persistence(_)
        )
    }
}

pub type ScribeResult<T> = Result<T, ScribeError>;
