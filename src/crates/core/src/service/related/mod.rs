//! Related content service

pub mod aggregator;

pub use aggregator::{RelatedContentAggregator, RelatedUpdate};
