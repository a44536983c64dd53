//! Generation layer
//!
//! Token guard, prompt compilation, the tier chain and the orchestrator that ties
//! them to the session.

pub mod guard;
pub mod orchestrator;
pub mod prompt;
pub mod tiers;

#[cfg(test)]
mod orchestrator_tests;

pub use guard::GenerationGuard;
pub use orchestrator::{GenerationOrchestrator, GenerationServices, SessionSnapshot, StartOutcome};
pub use prompt::{DefaultPromptCompiler, PromptCompiler};
pub use tiers::TierSink;
