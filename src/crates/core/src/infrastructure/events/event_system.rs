//! Generation event bus
//!
//! Broadcasts session activity to any number of display surfaces. Emitting never
//! blocks and never fails the caller; a bus with no subscribers drops events.

use chrono::{DateTime, Utc};
use log::trace;
use scribe_core_types::{
    GenerationProgress, GenerationStatus, GenerationTier, RelatedContentStep,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio::sync::broadcast;

const DEFAULT_CAPACITY: usize = 256;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum GenerationEvent {
    #[serde(rename_all = "camelCase")]
    StatusChanged {
        token: u64,
        status: GenerationStatus,
    },
    Chunk {
        token: u64,
        text: String,
    },
    Progress {
        token: u64,
        progress: GenerationProgress,
    },
    QueriesExtracted {
        token: u64,
        info: Value,
    },
    RelatedStep {
        token: u64,
        step: RelatedContentStep,
    },
    #[serde(rename_all = "camelCase")]
    Rendered {
        token: u64,
        pending_slots: usize,
        cta_links: usize,
    },
    TierFallback {
        token: u64,
        from: GenerationTier,
        to: GenerationTier,
        reason: String,
    },
    #[serde(rename_all = "camelCase")]
    Completed {
        token: u64,
        tier: GenerationTier,
        draft_id: Option<String>,
    },
    #[serde(rename_all = "camelCase")]
    Failed {
        token: u64,
        message: String,
        retry_job_id: Option<String>,
    },
    Cancelled {
        token: u64,
    },
    QuotaExceeded {
        available: i64,
    },
    #[serde(rename_all = "camelCase")]
    CtaInputRequired {
        topic_ref: String,
    },
    #[serde(rename_all = "camelCase")]
    DraftSaved {
        draft_id: String,
        saved_at: DateTime<Utc>,
        manual: bool,
    },
    /// `surfaced` is false for silent autosave failures.
    DraftSaveFailed {
        message: String,
        surfaced: bool,
    },
}

pub struct EventBus {
    sender: broadcast::Sender<GenerationEvent>,
}

impl EventBus {
    pub fn new() -> Self {
        Self::with_capacity(DEFAULT_CAPACITY)
    }

    pub fn with_capacity(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity.max(1));
        Self { sender }
    }

    pub fn subscribe(&self) -> broadcast::Receiver<GenerationEvent> {
        self.sender.subscribe()
    }

    pub fn emit(&self, event: GenerationEvent) {
        if let Err(e) = self.sender.send(event) {
            trace!("Generation event dropped, no subscribers: {:?}", e.0);
        }
    }
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn subscribers_receive_events_in_order() {
        let bus = EventBus::new();
        let mut rx = bus.subscribe();

        bus.emit(GenerationEvent::Chunk {
            token: 1,
            text: "a".to_string(),
        });
        bus.emit(GenerationEvent::Cancelled { token: 1 });

        assert_eq!(
            rx.recv().await.expect("first event"),
            GenerationEvent::Chunk {
                token: 1,
                text: "a".to_string()
            }
        );
        assert_eq!(
            rx.recv().await.expect("second event"),
            GenerationEvent::Cancelled { token: 1 }
        );
    }

    #[test]
    fn emit_without_subscribers_is_silent() {
        let bus = EventBus::with_capacity(0);
        bus.emit(GenerationEvent::QuotaExceeded { available: 0 });
    }

    #[test]
    fn events_serialize_with_type_tag() {
        let value = serde_json::to_value(GenerationEvent::CtaInputRequired {
            topic_ref: "t1".to_string(),
        })
        .expect("serializable");
        assert_eq!(value["type"], "ctaInputRequired");
        assert_eq!(value["topicRef"], "t1");
    }
}
