//! Service layer
//!
//! Configuration, related content, rendering and draft persistence.

pub mod config;
pub mod draft;
pub mod related;
pub mod render;

pub use config::ScribeConfig;
pub use draft::{CloseOutcome, DraftPersistenceManager, KeyChord, SaveOutcome};
pub use related::{RelatedContentAggregator, RelatedUpdate};
pub use render::{RenderPipeline, RenderedDocument};
