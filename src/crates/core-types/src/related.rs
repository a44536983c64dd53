use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocialPost {
    #[serde(default)]
    pub id: String,
    #[serde(default)]
    pub author: String,
    #[serde(default)]
    pub text: String,
    #[serde(default)]
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Article {
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub snippet: Option<String>,
    #[serde(default)]
    pub image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Video {
    #[serde(default)]
    pub id: String,
    pub title: String,
    pub url: String,
    #[serde(default)]
    pub thumbnail_url: Option<String>,
    #[serde(default)]
    pub channel: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelatedResults {
    #[serde(default)]
    pub tweets: Vec<SocialPost>,
    #[serde(default)]
    pub articles: Vec<Article>,
    #[serde(default)]
    pub videos: Vec<Video>,
}

impl RelatedResults {
    /// Number of visible related items across the three media categories.
    pub fn visible_count(&self) -> usize {
        self.tweets.len() + self.articles.len() + self.videos.len()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RelatedStepId {
    Ctas,
    Tweets,
    Articles,
    Videos,
}

impl RelatedStepId {
    pub const ALL: [RelatedStepId; 4] = [
        RelatedStepId::Ctas,
        RelatedStepId::Tweets,
        RelatedStepId::Articles,
        RelatedStepId::Videos,
    ];
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StepStatus {
    Pending,
    Running,
    Done,
    Failed,
}

impl StepStatus {
    pub fn is_finished(&self) -> bool {
        matches!(self, StepStatus::Done | StepStatus::Failed)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RelatedContentStep {
    pub id: RelatedStepId,
    pub status: StepStatus,
    pub count: usize,
}

impl RelatedContentStep {
    pub fn pending(id: RelatedStepId) -> Self {
        Self {
            id,
            status: StepStatus::Pending,
            count: 0,
        }
    }

    pub fn initial_set() -> Vec<RelatedContentStep> {
        RelatedStepId::ALL.iter().map(|id| Self::pending(*id)).collect()
    }
}
