use serde::{Deserialize, Serialize};

/// Call to action, either organization-level or returned with a generation result.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Cta {
    pub text: String,
    pub href: String,
    #[serde(rename = "type", default)]
    pub cta_type: String,
    #[serde(default)]
    pub placement: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CtaList {
    #[serde(default)]
    pub ctas: Vec<Cta>,
    #[serde(default)]
    pub sufficient: bool,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreditBalance {
    pub total_credits: i64,
    pub used_credits: i64,
    pub available_credits: i64,
    #[serde(default)]
    pub is_unlimited: bool,
}

impl CreditBalance {
    pub fn has_remaining(&self) -> bool {
        self.is_unlimited || self.available_credits > 0
    }
}
