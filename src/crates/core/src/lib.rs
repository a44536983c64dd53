// Scribe Core Library - long-form article generation client
// Four-layer architecture: Util -> Infrastructure -> Service -> Generation

pub mod generation; // Generation layer - token guard, tier chain, orchestrator
pub mod infrastructure; // Infrastructure layer - backend client, event bus
pub mod service; // Service layer - config, related content, rendering, drafts
pub mod util; // Utility layer - errors

// Export main types
pub use util::errors::*;

// Export service layer components
pub use service::{
    config::ScribeConfig,
    draft::{CloseOutcome, DraftPersistenceManager, KeyChord, SaveOutcome},
    render::{RenderPipeline, RenderedDocument},
};

// Export infrastructure components
pub use infrastructure::{ApiClient, EventBus, GenerationEvent};

// Export generation layer core types
pub use generation::{
    GenerationOrchestrator, GenerationServices, PromptCompiler, SessionSnapshot, StartOutcome,
};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const CORE_NAME: &str = "Scribe Core";
