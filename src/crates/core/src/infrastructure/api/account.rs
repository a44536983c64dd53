use super::client::ApiClient;
use crate::util::errors::ScribeResult;
use async_trait::async_trait;
use scribe_core_types::{CreditBalance, Cta, CtaList};

const CREDITS_PATH: &str = "/api/credits";
const CTAS_PATH: &str = "/api/ctas";

/// Only the pass/fail contract of the balance matters to generation.
#[async_trait]
pub trait CreditsApi: Send + Sync {
    async fn balance(&self) -> ScribeResult<CreditBalance>;
}

/// Organization-level calls to action.
#[async_trait]
pub trait CtaApi: Send + Sync {
    async fn list(&self) -> ScribeResult<CtaList>;

    async fn add(&self, ctas: &[Cta]) -> ScribeResult<CtaList>;
}

#[async_trait]
impl CreditsApi for ApiClient {
    async fn balance(&self) -> ScribeResult<CreditBalance> {
        self.get_json(CREDITS_PATH, &[]).await
    }
}

#[async_trait]
impl CtaApi for ApiClient {
    async fn list(&self) -> ScribeResult<CtaList> {
        self.get_json(CTAS_PATH, &[]).await
    }

    async fn add(&self, ctas: &[Cta]) -> ScribeResult<CtaList> {
        self.post_json(CTAS_PATH, &serde_json::json!({ "ctas": ctas }))
            .await
    }
}
