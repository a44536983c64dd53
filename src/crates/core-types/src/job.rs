use crate::stream::GenerationPayload;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobSubmission {
    pub job_id: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum JobState {
    #[serde(alias = "pending")]
    Queued,
    #[serde(alias = "processing", alias = "in_progress")]
    Running,
    #[serde(alias = "succeeded", alias = "success", alias = "done")]
    Completed,
    #[serde(alias = "error")]
    Failed,
    #[serde(other)]
    Unknown,
}

/// One poll response from the job API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobStatus {
    #[serde(default)]
    pub progress: f64,
    #[serde(default)]
    pub current_step: Option<String>,
    pub status: JobState,
    /// Advisory only, never enforced as a deadline.
    #[serde(default)]
    pub estimated_time_remaining: Option<u64>,
    #[serde(default)]
    pub result: Option<GenerationPayload>,
    #[serde(default)]
    pub partial_content: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl JobStatus {
    pub fn percent(&self) -> u8 {
        if !self.progress.is_finite() {
            return 0;
        }
        self.progress.clamp(0.0, 100.0).round() as u8
    }
}
