//! Scribe stream adapters
//!
//! Turns server-sent event channels into typed, ordered event receivers:
//! - generation output (`chunk | complete | error | queriesExtracted`)
//! - article search narration and results

pub mod stream_handler;
pub mod transport;
pub mod types;

pub use stream_handler::{handle_article_search_stream, handle_generation_stream};
pub use transport::{SseStreamTransport, StreamTransport};
pub use types::{parse_article_search_event, parse_generation_event};
