use crate::account::Cta;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// The evolving, persistable document produced by a generation session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Draft {
    /// Assigned by the server on first successful save.
    #[serde(default)]
    pub id: Option<String>,
    pub title: String,
    pub content: String,
    pub topic_ref: String,
    #[serde(default)]
    pub ctas: Vec<Cta>,
    #[serde(default)]
    pub generation_metadata: Value,
    #[serde(default)]
    pub last_saved_content: String,
    #[serde(default)]
    pub last_saved_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub autosave_error: Option<String>,
}

impl Draft {
    pub fn new(title: String, content: String, topic_ref: String) -> Self {
        Self {
            id: None,
            title,
            content,
            topic_ref,
            ctas: Vec::new(),
            generation_metadata: Value::Null,
            last_saved_content: String::new(),
            last_saved_at: None,
            autosave_error: None,
        }
    }

    pub fn has_unsaved_changes(&self) -> bool {
        self.content != self.last_saved_content
    }

    pub fn to_record(&self, status: PostStatus) -> PostRecord {
        PostRecord {
            title: self.title.clone(),
            content: self.content.clone(),
            status,
            topic_ref: self.topic_ref.clone(),
            generation_metadata: self.generation_metadata.clone(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PostStatus {
    Draft,
    Published,
}

/// Body of a create/update call against the persistence API.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PostRecord {
    pub title: String,
    pub content: String,
    pub status: PostStatus,
    pub topic_ref: String,
    #[serde(default)]
    pub generation_metadata: Value,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SavedPost {
    pub id: String,
    pub saved_at: DateTime<Utc>,
}
