use super::client::ApiClient;
use crate::util::errors::ScribeResult;
use async_trait::async_trait;
use scribe_core_types::{
    GenerationPayload, GenerationRequest, JobStatus, JobSubmission, StreamDescriptor,
};

const STREAM_PATH: &str = "/api/generation/stream";
const JOBS_PATH: &str = "/api/generation/jobs";
const SYNC_PATH: &str = "/api/generation/sync";

/// The three generation tiers as the backend exposes them.
#[async_trait]
pub trait GenerationApi: Send + Sync {
    /// Descriptor for the live stream; opening it is the transport's job.
    fn stream_descriptor(&self, request: &GenerationRequest) -> ScribeResult<StreamDescriptor>;

    async fn submit_job(&self, request: &GenerationRequest) -> ScribeResult<JobSubmission>;

    async fn poll_job(&self, job_id: &str) -> ScribeResult<JobStatus>;

    /// Resume an existing job. The backend may hand back the same id or a new one.
    async fn retry_job(&self, job_id: &str) -> ScribeResult<JobSubmission>;

    /// Blocks until the backend returns a single result.
    async fn generate_sync(&self, request: &GenerationRequest) -> ScribeResult<GenerationPayload>;
}

#[async_trait]
impl GenerationApi for ApiClient {
    fn stream_descriptor(&self, request: &GenerationRequest) -> ScribeResult<StreamDescriptor> {
        let body = serde_json::to_value(request)?;
        Ok(self.descriptor_for(STREAM_PATH, body))
    }

    async fn submit_job(&self, request: &GenerationRequest) -> ScribeResult<JobSubmission> {
        self.post_json(JOBS_PATH, request).await
    }

    async fn poll_job(&self, job_id: &str) -> ScribeResult<JobStatus> {
        self.get_json(&format!("{}/{}", JOBS_PATH, job_id), &[]).await
    }

    async fn retry_job(&self, job_id: &str) -> ScribeResult<JobSubmission> {
        self.post_json(
            &format!("{}/{}/retry", JOBS_PATH, job_id),
            &serde_json::json!({}),
        )
        .await
    }

    async fn generate_sync(&self, request: &GenerationRequest) -> ScribeResult<GenerationPayload> {
        self.post_json_unbounded(SYNC_PATH, request).await
    }
}
