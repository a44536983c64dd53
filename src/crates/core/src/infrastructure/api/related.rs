use super::client::ApiClient;
use crate::util::errors::{ScribeError, ScribeResult};
use async_trait::async_trait;
use scribe_core_types::{ArticleSearchEvent, SocialPost, Video};
use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

const SOCIAL_VIDEOS_PATH: &str = "/api/related/social-videos";
const ARTICLE_SEARCH_PATH: &str = "/api/related/articles/stream";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelatedQuery {
    pub topic_ref: String,
    pub query: String,
    #[serde(default)]
    pub keywords: Vec<String>,
}

/// Tweets and videos come back from one round trip.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocialVideoBundle {
    #[serde(default)]
    pub tweets: Vec<SocialPost>,
    #[serde(default)]
    pub videos: Vec<Video>,
}

#[async_trait]
pub trait RelatedContentApi: Send + Sync {
    async fn fetch_social_and_videos(
        &self,
        query: &RelatedQuery,
        max_tweets: usize,
        max_videos: usize,
    ) -> ScribeResult<SocialVideoBundle>;

    async fn search_articles(
        &self,
        query: &RelatedQuery,
    ) -> ScribeResult<mpsc::UnboundedReceiver<ArticleSearchEvent>>;
}

#[async_trait]
impl RelatedContentApi for ApiClient {
    async fn fetch_social_and_videos(
        &self,
        query: &RelatedQuery,
        max_tweets: usize,
        max_videos: usize,
    ) -> ScribeResult<SocialVideoBundle> {
        let mut bundle: SocialVideoBundle = self
            .get_json(
                SOCIAL_VIDEOS_PATH,
                &[
                    ("query", query.query.clone()),
                    ("topicRef", query.topic_ref.clone()),
                    ("maxTweets", max_tweets.to_string()),
                    ("maxVideos", max_videos.to_string()),
                ],
            )
            .await?;
        // The backend treats the limits as hints.
        bundle.tweets.truncate(max_tweets);
        bundle.videos.truncate(max_videos);
        Ok(bundle)
    }

    async fn search_articles(
        &self,
        query: &RelatedQuery,
    ) -> ScribeResult<mpsc::UnboundedReceiver<ArticleSearchEvent>> {
        let descriptor = self.descriptor_for(ARTICLE_SEARCH_PATH, serde_json::to_value(query)?);
        self.streams()
            .open_article_search(&descriptor)
            .await
            .map_err(|e| ScribeError::Transport(e.to_string()))
    }
}
