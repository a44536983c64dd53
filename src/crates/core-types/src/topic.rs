use crate::account::Cta;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The topic chosen by the user; `id` becomes the session's topic reference.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Topic {
    pub id: String,
    pub title: String,
    #[serde(default)]
    pub summary: Option<String>,
    #[serde(default)]
    pub keywords: Vec<String>,
}

/// Request fields produced by the prompt compiler and sent to every tier.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GenerationRequest {
    pub topic_ref: String,
    pub title: String,
    pub prompt: String,
    #[serde(default)]
    pub ctas: Vec<Cta>,
    #[serde(flatten)]
    pub fields: Map<String, Value>,
}
