use crate::related::RelatedStepId;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum PlaceholderKind {
    HeroImage,
    Tweet,
    Article,
    Video,
}

impl PlaceholderKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            PlaceholderKind::HeroImage => "heroImage",
            PlaceholderKind::Tweet => "tweet",
            PlaceholderKind::Article => "article",
            PlaceholderKind::Video => "video",
        }
    }

    /// Lenient parse of the marker name found in generated text.
    pub fn parse(name: &str) -> Option<Self> {
        match name.trim().to_ascii_lowercase().as_str() {
            "heroimage" | "hero" => Some(PlaceholderKind::HeroImage),
            "tweet" => Some(PlaceholderKind::Tweet),
            "article" => Some(PlaceholderKind::Article),
            "video" => Some(PlaceholderKind::Video),
            _ => None,
        }
    }

    /// The related-content step whose completion decides whether a missing entry
    /// is still loading or will never arrive.
    pub fn source_step(&self) -> RelatedStepId {
        match self {
            PlaceholderKind::HeroImage | PlaceholderKind::Article => RelatedStepId::Articles,
            PlaceholderKind::Tweet => RelatedStepId::Tweets,
            PlaceholderKind::Video => RelatedStepId::Videos,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlaceholderToken {
    pub kind: PlaceholderKind,
    pub index: usize,
}
