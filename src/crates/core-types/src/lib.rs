//! Scribe shared DTOs
//!
//! Low-level data shapes shared by the adapters, the core library and the CLI.
//! Everything here is plain serde data; behaviour lives in `scribe-core`.

pub mod account;
pub mod draft;
pub mod job;
pub mod placeholder;
pub mod related;
pub mod session;
pub mod stream;
pub mod topic;

pub use account::{CreditBalance, Cta, CtaList};
pub use draft::{Draft, PostRecord, PostStatus, SavedPost};
pub use job::{JobState, JobStatus, JobSubmission};
pub use placeholder::{PlaceholderKind, PlaceholderToken};
pub use related::{
    Article, RelatedContentStep, RelatedResults, RelatedStepId, SocialPost, StepStatus, Video,
};
pub use session::{GenerationProgress, GenerationSession, GenerationStatus, GenerationTier};
pub use stream::{ArticleSearchEvent, GenerationPayload, StreamDescriptor, StreamEvent};
pub use topic::{GenerationRequest, Topic};
