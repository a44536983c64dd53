//! HTTP clients for the Scribe backend
//!
//! Each collaborator is a trait so the core can run against fakes; `ApiClient`
//! implements all of them over one reqwest client.

pub mod account;
pub mod client;
pub mod generation;
pub mod posts;
pub mod related;

pub use account::{CreditsApi, CtaApi};
pub use client::ApiClient;
pub use generation::GenerationApi;
pub use posts::PostStore;
pub use related::{RelatedContentApi, RelatedQuery, SocialVideoBundle};
