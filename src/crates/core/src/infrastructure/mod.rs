//! Infrastructure layer
//!
//! Event bus and backend clients.

pub mod api;
pub mod events;

pub use api::ApiClient;
pub use events::{EventBus, GenerationEvent};
