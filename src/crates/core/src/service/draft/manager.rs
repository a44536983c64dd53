//! Draft persistence
//!
//! Saves are serialized through one lock, so a second save never races the first
//! into a duplicate create. Each draft replacement bumps an epoch; a save that
//! finishes after its draft was replaced is dropped.

use super::shortcut::KeyChord;
use crate::infrastructure::api::PostStore;
use crate::infrastructure::events::{EventBus, GenerationEvent};
use crate::util::errors::{ScribeError, ScribeResult};
use log::{debug, info, warn};
use scribe_core_types::{Draft, PostStatus, SavedPost};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;

#[derive(Debug, Clone, PartialEq)]
pub enum SaveOutcome {
    Saved(SavedPost),
    /// No draft, or nothing changed since the last save.
    Skipped,
    Failed(String),
    /// The draft was replaced while the save was in flight.
    Discarded,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CloseOutcome {
    Clean,
    SavedOnClose,
    /// The final save failed; unsaved changes are kept until `confirm_discard`.
    NeedsConfirmation { error: String },
}

#[derive(Default)]
struct DraftState {
    draft: Option<Draft>,
    epoch: u64,
}

pub struct DraftPersistenceManager {
    store: Arc<dyn PostStore>,
    events: Arc<EventBus>,
    state: Mutex<DraftState>,
    save_lock: Mutex<()>,
    manual_in_progress: AtomicBool,
    autosave: std::sync::Mutex<Option<CancellationToken>>,
    interval: Duration,
}

impl DraftPersistenceManager {
    pub fn new(store: Arc<dyn PostStore>, events: Arc<EventBus>, interval: Duration) -> Self {
        Self {
            store,
            events,
            state: Mutex::new(DraftState::default()),
            save_lock: Mutex::new(()),
            manual_in_progress: AtomicBool::new(false),
            autosave: std::sync::Mutex::new(None),
            interval,
        }
    }

    pub async fn current(&self) -> Option<Draft> {
        self.state.lock().await.draft.clone()
    }

    /// Install a freshly generated draft and save it right away.
    pub async fn commit_generated(&self, draft: Draft) -> SaveOutcome {
        {
            let mut state = self.state.lock().await;
            state.epoch += 1;
            state.draft = Some(draft);
        }
        self.persist(false).await
    }

    pub async fn edit_content(&self, content: impl Into<String>) -> ScribeResult<()> {
        let mut state = self.state.lock().await;
        let draft = state.draft.as_mut().ok_or_else(no_draft)?;
        draft.content = content.into();
        Ok(())
    }

    /// Titles ride along with the next save; they do not make a draft dirty on their own.
    pub async fn edit_title(&self, title: impl Into<String>) -> ScribeResult<()> {
        let mut state = self.state.lock().await;
        let draft = state.draft.as_mut().ok_or_else(no_draft)?;
        draft.title = title.into();
        Ok(())
    }

    /// One autosave pass. Failures are recorded on the draft, never returned.
    pub async fn autosave_tick(&self) -> SaveOutcome {
        self.persist(false).await
    }

    /// Always issues a save, and always reports the result.
    pub async fn manual_save(&self) -> ScribeResult<SavedPost> {
        self.manual_in_progress.store(true, Ordering::SeqCst);
        let outcome = self.persist(true).await;
        self.manual_in_progress.store(false, Ordering::SeqCst);

        match outcome {
            SaveOutcome::Saved(saved) => Ok(saved),
            SaveOutcome::Skipped => Err(no_draft()),
            SaveOutcome::Failed(message) => Err(ScribeError::Persistence(message)),
            SaveOutcome::Discarded => Err(ScribeError::Cancelled),
        }
    }

    /// Route a key press; only the save chord does anything.
    pub async fn handle_key(&self, chord: &KeyChord) -> Option<ScribeResult<SavedPost>> {
        if chord.is_manual_save() {
            Some(self.manual_save().await)
        } else {
            None
        }
    }

    pub async fn close(&self) -> CloseOutcome {
        self.stop_autosave();

        let dirty = self
            .state
            .lock()
            .await
            .draft
            .as_ref()
            .map(Draft::has_unsaved_changes)
            .unwrap_or(false);
        if !dirty {
            return CloseOutcome::Clean;
        }

        match self.persist(false).await {
            SaveOutcome::Saved(_) => CloseOutcome::SavedOnClose,
            SaveOutcome::Failed(error) => CloseOutcome::NeedsConfirmation { error },
            SaveOutcome::Skipped | SaveOutcome::Discarded => CloseOutcome::Clean,
        }
    }

    pub async fn confirm_discard(&self) {
        info!("Unsaved draft changes discarded by user");
        self.reset().await;
    }

    /// Drop the current draft. Saves still in flight for it are discarded.
    pub async fn reset(&self) {
        self.stop_autosave();
        let mut state = self.state.lock().await;
        state.epoch += 1;
        state.draft = None;
    }

    pub fn start_autosave(self: &Arc<Self>) {
        let token = CancellationToken::new();
        if let Some(previous) = self.autosave_slot().replace(token.clone()) {
            previous.cancel();
        }

        let manager = Arc::clone(self);
        let interval = self.interval;
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            // The first tick completes immediately.
            ticker.tick().await;

            loop {
                tokio::select! {
                    _ = token.cancelled() => break,
                    _ = ticker.tick() => {
                        manager.autosave_tick().await;
                    }
                }
            }
            debug!("Autosave timer stopped");
        });
        debug!("Autosave timer started: interval={:?}", interval);
    }

    pub fn stop_autosave(&self) {
        if let Some(token) = self.autosave_slot().take() {
            token.cancel();
        }
    }

    pub fn autosave_running(&self) -> bool {
        self.autosave_slot().is_some()
    }

    fn autosave_slot(&self) -> std::sync::MutexGuard<'_, Option<CancellationToken>> {
        self.autosave.lock().unwrap_or_else(|e| e.into_inner())
    }

    async fn persist(&self, manual: bool) -> SaveOutcome {
        let _serial = self.save_lock.lock().await;

        let (epoch, snapshot) = {
            let state = self.state.lock().await;
            match &state.draft {
                Some(draft) => (state.epoch, draft.clone()),
                None => return SaveOutcome::Skipped,
            }
        };

        if !manual && !snapshot.has_unsaved_changes() {
            return SaveOutcome::Skipped;
        }

        let record = snapshot.to_record(PostStatus::Draft);
        let result = match snapshot.id.as_deref() {
            Some(id) => self.store.update(id, &record).await,
            None => self.store.create(&record).await,
        };

        let mut state = self.state.lock().await;
        if state.epoch != epoch {
            debug!("Draft replaced during save; result dropped: epoch={}", epoch);
            return SaveOutcome::Discarded;
        }
        let Some(draft) = state.draft.as_mut() else {
            return SaveOutcome::Discarded;
        };

        match result {
            Ok(saved) => {
                draft.id = Some(saved.id.clone());
                // Edits made while the save was in flight stay dirty.
                draft.last_saved_content = snapshot.content;
                draft.last_saved_at = Some(saved.saved_at);
                draft.autosave_error = None;
                debug!("Draft saved: id={}, manual={}", saved.id, manual);
                self.events.emit(GenerationEvent::DraftSaved {
                    draft_id: saved.id.clone(),
                    saved_at: saved.saved_at,
                    manual,
                });
                SaveOutcome::Saved(saved)
            }
            Err(e) => {
                let message = e.to_string();
                let surfaced = manual || self.manual_in_progress.load(Ordering::SeqCst);
                warn!("Draft save failed: manual={}, error={}", manual, message);
                draft.autosave_error = Some(message.clone());
                self.events.emit(GenerationEvent::DraftSaveFailed {
                    message: message.clone(),
                    surfaced,
                });
                SaveOutcome::Failed(message)
            }
        }
    }
}

impl Drop for DraftPersistenceManager {
    fn drop(&mut self) {
        self.stop_autosave();
    }
}

fn no_draft() -> ScribeError {
    ScribeError::NotFound("No draft to save".to_string())
}
