//! Draft persistence service

pub mod manager;
pub mod shortcut;

pub use manager::{CloseOutcome, DraftPersistenceManager, SaveOutcome};
pub use shortcut::KeyChord;
