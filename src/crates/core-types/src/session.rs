use crate::account::Cta;
use crate::related::{RelatedContentStep, RelatedResults, RelatedStepId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum GenerationStatus {
    Idle,
    FetchingRelated,
    Streaming,
    Polling,
    Syncing,
    Complete,
    Failed,
}

/// The fallback tier that produced (or is producing) the session's text.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationTier {
    Stream,
    Job,
    Sync,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationProgress {
    pub percent: u8,
    #[serde(default)]
    pub current_step: Option<String>,
    #[serde(default)]
    pub eta_seconds: Option<u64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationSession {
    pub topic_ref: String,
    #[serde(default)]
    pub topic_title: String,
    pub status: GenerationStatus,
    #[serde(default)]
    pub accumulated_text: String,
    #[serde(default)]
    pub final_content: Option<String>,
    #[serde(default)]
    pub final_tier: Option<GenerationTier>,
    #[serde(default)]
    pub ctas: Vec<Cta>,
    #[serde(default)]
    pub related_results: RelatedResults,
    #[serde(default = "RelatedContentStep::initial_set")]
    pub related_steps: Vec<RelatedContentStep>,
    #[serde(default)]
    pub progress: GenerationProgress,
    pub generation_token: u64,
    /// Set once a job has been submitted, so the user can resume it after a failure.
    #[serde(default)]
    pub job_id: Option<String>,
    #[serde(default)]
    pub error: Option<String>,
}

impl GenerationSession {
    pub fn idle() -> Self {
        Self::new(String::new(), String::new(), 0)
    }

    pub fn new(topic_ref: String, topic_title: String, generation_token: u64) -> Self {
        Self {
            topic_ref,
            topic_title,
            status: GenerationStatus::Idle,
            accumulated_text: String::new(),
            final_content: None,
            final_tier: None,
            ctas: Vec::new(),
            related_results: RelatedResults::default(),
            related_steps: RelatedContentStep::initial_set(),
            progress: GenerationProgress::default(),
            generation_token,
            job_id: None,
            error: None,
        }
    }

    pub fn step(&self, id: RelatedStepId) -> Option<&RelatedContentStep> {
        self.related_steps.iter().find(|s| s.id == id)
    }

    pub fn set_step(&mut self, step: RelatedContentStep) {
        match self.related_steps.iter_mut().find(|s| s.id == step.id) {
            Some(existing) => *existing = step,
            None => self.related_steps.push(step),
        }
    }
}
