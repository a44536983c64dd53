//! Event system module

pub mod event_system;

pub use event_system::{EventBus, GenerationEvent};
