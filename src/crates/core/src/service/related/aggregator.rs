//! Concurrent related-content lookups with per-category failure isolation

use crate::infrastructure::api::{RelatedContentApi, RelatedQuery};
use crate::service::config::RelatedConfig;
use crate::util::errors::ScribeError;
use log::{debug, warn};
use scribe_core_types::{
    Article, ArticleSearchEvent, RelatedContentStep, RelatedResults, RelatedStepId, SocialPost,
    StepStatus, Video,
};
use serde_json::Value;
use std::sync::Arc;
use tokio::sync::mpsc;

/// Incremental output of `fetch_all`, published as each category settles.
#[derive(Debug, Clone, PartialEq)]
pub enum RelatedUpdate {
    Step(RelatedContentStep),
    Tweets(Vec<SocialPost>),
    Articles(Vec<Article>),
    Videos(Vec<Video>),
    /// Progress narration from the article search.
    QueriesExtracted(Value),
}

pub struct RelatedContentAggregator {
    api: Arc<dyn RelatedContentApi>,
    max_tweets: usize,
    max_videos: usize,
}

impl RelatedContentAggregator {
    pub fn new(api: Arc<dyn RelatedContentApi>, config: &RelatedConfig) -> Self {
        Self {
            api,
            max_tweets: config.max_tweets,
            max_videos: config.max_videos,
        }
    }

    /// Run all lookups concurrently and return the combined results.
    ///
    /// A failed lookup resolves its categories to empty and marks their steps
    /// `failed`; it never delays or aborts the others. Dropping `updates`' receiver
    /// does not stop the lookups.
    pub async fn fetch_all(
        &self,
        query: &RelatedQuery,
        known_ctas: usize,
        updates: mpsc::UnboundedSender<RelatedUpdate>,
    ) -> RelatedResults {
        // CTAs are already known by the time generation starts.
        publish(&updates, RelatedUpdate::Step(running(RelatedStepId::Ctas)));
        publish(
            &updates,
            RelatedUpdate::Step(finished(RelatedStepId::Ctas, StepStatus::Done, known_ctas)),
        );

        let ((tweets, videos), articles) = tokio::join!(
            self.fetch_social_and_videos(query, &updates),
            self.fetch_articles(query, &updates),
        );

        RelatedResults {
            tweets,
            articles,
            videos,
        }
    }

    async fn fetch_social_and_videos(
        &self,
        query: &RelatedQuery,
        updates: &mpsc::UnboundedSender<RelatedUpdate>,
    ) -> (Vec<SocialPost>, Vec<Video>) {
        publish(updates, RelatedUpdate::Step(running(RelatedStepId::Tweets)));
        publish(updates, RelatedUpdate::Step(running(RelatedStepId::Videos)));

        match self
            .api
            .fetch_social_and_videos(query, self.max_tweets, self.max_videos)
            .await
        {
            Ok(bundle) => {
                debug!(
                    "Social and video lookup done: tweets={}, videos={}",
                    bundle.tweets.len(),
                    bundle.videos.len()
                );
                let tweet_count = bundle.tweets.len();
                let video_count = bundle.videos.len();
                publish(updates, RelatedUpdate::Tweets(bundle.tweets.clone()));
                publish(
                    updates,
                    RelatedUpdate::Step(finished(RelatedStepId::Tweets, StepStatus::Done, tweet_count)),
                );
                publish(updates, RelatedUpdate::Videos(bundle.videos.clone()));
                publish(
                    updates,
                    RelatedUpdate::Step(finished(RelatedStepId::Videos, StepStatus::Done, video_count)),
                );
                (bundle.tweets, bundle.videos)
            }
            Err(e) => {
                for step in [RelatedStepId::Tweets, RelatedStepId::Videos] {
                    let failure = ScribeError::PartialFetch {
                        step,
                        message: e.to_string(),
                    };
                    warn!("{}", failure);
                    publish(
                        updates,
                        RelatedUpdate::Step(finished(step, StepStatus::Failed, 0)),
                    );
                }
                (Vec::new(), Vec::new())
            }
        }
    }

    async fn fetch_articles(
        &self,
        query: &RelatedQuery,
        updates: &mpsc::UnboundedSender<RelatedUpdate>,
    ) -> Vec<Article> {
        publish(updates, RelatedUpdate::Step(running(RelatedStepId::Articles)));

        let outcome = match self.api.search_articles(query).await {
            Ok(mut rx) => loop {
                match rx.recv().await {
                    Some(ArticleSearchEvent::QueriesExtracted { info }) => {
                        publish(updates, RelatedUpdate::QueriesExtracted(info));
                    }
                    Some(ArticleSearchEvent::Articles { articles }) => break Ok(articles),
                    Some(ArticleSearchEvent::Error { message }) => break Err(message),
                    None => break Err("article search channel closed".to_string()),
                }
            },
            Err(e) => Err(e.to_string()),
        };

        match outcome {
            Ok(articles) => {
                debug!("Article search done: articles={}", articles.len());
                publish(updates, RelatedUpdate::Articles(articles.clone()));
                publish(
                    updates,
                    RelatedUpdate::Step(finished(
                        RelatedStepId::Articles,
                        StepStatus::Done,
                        articles.len(),
                    )),
                );
                articles
            }
            Err(message) => {
                warn!(
                    "{}",
                    ScribeError::PartialFetch {
                        step: RelatedStepId::Articles,
                        message,
                    }
                );
                publish(
                    updates,
                    RelatedUpdate::Step(finished(RelatedStepId::Articles, StepStatus::Failed, 0)),
                );
                Vec::new()
            }
        }
    }
}

fn running(id: RelatedStepId) -> RelatedContentStep {
    RelatedContentStep {
        id,
        status: StepStatus::Running,
        count: 0,
    }
}

fn finished(id: RelatedStepId, status: StepStatus, count: usize) -> RelatedContentStep {
    RelatedContentStep { id, status, count }
}

fn publish(updates: &mpsc::UnboundedSender<RelatedUpdate>, update: RelatedUpdate) {
    if updates.send(update).is_err() {
        debug!("Related update consumer gone; continuing lookups");
    }
}
