use super::client::ApiClient;
use crate::util::errors::ScribeResult;
use async_trait::async_trait;
use scribe_core_types::{PostRecord, SavedPost};

const POSTS_PATH: &str = "/api/posts";

#[async_trait]
pub trait PostStore: Send + Sync {
    /// Returns the server-assigned id.
    async fn create(&self, record: &PostRecord) -> ScribeResult<SavedPost>;

    async fn update(&self, id: &str, record: &PostRecord) -> ScribeResult<SavedPost>;
}

#[async_trait]
impl PostStore for ApiClient {
    async fn create(&self, record: &PostRecord) -> ScribeResult<SavedPost> {
        self.post_json(POSTS_PATH, record).await
    }

    async fn update(&self, id: &str, record: &PostRecord) -> ScribeResult<SavedPost> {
        self.put_json(&format!("{}/{}", POSTS_PATH, id), record).await
    }
}
