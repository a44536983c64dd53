//! Generation orchestrator
//!
//! Owns the session. Checks preconditions, then runs the related-content lookups,
//! their consumer and the stream -> job -> sync chain as three futures joined on
//! one task. Every write into the session is compared against the attempt's token.

use super::guard::GenerationGuard;
use super::prompt::{DefaultPromptCompiler, PromptCompiler};
use super::tiers::{self, TierSink};
use crate::infrastructure::api::{
    ApiClient, CreditsApi, CtaApi, GenerationApi, PostStore, RelatedContentApi, RelatedQuery,
};
use crate::infrastructure::events::{EventBus, GenerationEvent};
use crate::service::config::{GenerationConfig, ScribeConfig};
use crate::service::draft::{DraftPersistenceManager, SaveOutcome};
use crate::service::related::{RelatedContentAggregator, RelatedUpdate};
use crate::service::render::{RenderPipeline, RenderedDocument};
use crate::util::errors::{ScribeError, ScribeResult};
use log::{debug, info, warn};
use scribe_ai_adapters::StreamTransport;
use scribe_core_types::{
    Cta, Draft, GenerationPayload, GenerationProgress, GenerationRequest, GenerationSession,
    GenerationStatus, GenerationTier, JobStatus, Topic,
};
use serde::Serialize;
use serde_json::Value;
use std::sync::{Arc, Mutex, MutexGuard, RwLock, RwLockReadGuard, RwLockWriteGuard};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

/// External collaborators of a generation session.
#[derive(Clone)]
pub struct GenerationServices {
    pub generation: Arc<dyn GenerationApi>,
    pub transport: Arc<dyn StreamTransport>,
    pub related: Arc<dyn RelatedContentApi>,
    pub credits: Arc<dyn CreditsApi>,
    pub ctas: Arc<dyn CtaApi>,
    pub posts: Arc<dyn PostStore>,
    pub prompt: Arc<dyn PromptCompiler>,
}

impl GenerationServices {
    /// Wire every collaborator to one backend client.
    pub fn from_client(client: Arc<ApiClient>, config: &ScribeConfig) -> Self {
        let transport = Arc::new(client.streams().clone());
        Self {
            generation: client.clone(),
            transport,
            related: client.clone(),
            credits: client.clone(),
            ctas: client.clone(),
            posts: client,
            prompt: Arc::new(DefaultPromptCompiler::new(&config.generation)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "outcome", rename_all = "camelCase")]
pub enum StartOutcome {
    #[serde(rename_all = "camelCase")]
    Completed {
        tier: GenerationTier,
        draft_id: Option<String>,
    },
    /// Paused at the CTA gate; resume with `provide_ctas` or `skip_cta_gate`.
    AwaitingCtaInput,
    Cancelled,
    /// A newer attempt took over before this one could commit.
    Superseded,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionSnapshot {
    pub session: GenerationSession,
    pub document: RenderedDocument,
}

enum Entry {
    Fresh(GenerationRequest),
    Resume(String),
}

#[derive(Default)]
struct CtaGate {
    skipped: bool,
    pending: Option<Topic>,
}

pub struct GenerationOrchestrator {
    services: GenerationServices,
    config: GenerationConfig,
    aggregator: RelatedContentAggregator,
    pipeline: RenderPipeline,
    drafts: Arc<DraftPersistenceManager>,
    events: Arc<EventBus>,
    guard: GenerationGuard,
    session: RwLock<GenerationSession>,
    document: RwLock<RenderedDocument>,
    cta_gate: Mutex<CtaGate>,
    cancel_token: Mutex<Option<CancellationToken>>,
    last_topic: Mutex<Option<Topic>>,
}

impl GenerationOrchestrator {
    pub fn new(
        services: GenerationServices,
        config: &ScribeConfig,
        events: Arc<EventBus>,
    ) -> ScribeResult<Self> {
        let drafts = Arc::new(DraftPersistenceManager::new(
            services.posts.clone(),
            events.clone(),
            config.autosave.interval(),
        ));

        Ok(Self {
            aggregator: RelatedContentAggregator::new(services.related.clone(), &config.related),
            pipeline: RenderPipeline::new(&config.render)?,
            config: config.generation.clone(),
            services,
            drafts,
            events,
            guard: GenerationGuard::new(),
            session: RwLock::new(GenerationSession::idle()),
            document: RwLock::new(RenderedDocument::default()),
            cta_gate: Mutex::new(CtaGate::default()),
            cancel_token: Mutex::new(None),
            last_topic: Mutex::new(None),
        })
    }

    pub fn drafts(&self) -> &Arc<DraftPersistenceManager> {
        &self.drafts
    }

    pub fn events(&self) -> &Arc<EventBus> {
        &self.events
    }

    pub fn snapshot(&self) -> SessionSnapshot {
        SessionSnapshot {
            session: self.session_read().clone(),
            document: self.document_read().clone(),
        }
    }

    /// Start generating for `topic`.
    ///
    /// Preconditions are checked in order and each one short-circuits: no active
    /// attempt, credits remaining, then the CTA gate.
    pub async fn start(&self, topic: Topic) -> ScribeResult<StartOutcome> {
        if let Some(owner) = self.guard.owner() {
            return Err(ScribeError::AlreadyRunning(owner));
        }

        let balance = self.services.credits.balance().await?;
        if !balance.has_remaining() {
            warn!(
                "Generation blocked, no credits: topic_ref={}, available={}",
                topic.id, balance.available_credits
            );
            self.events.emit(GenerationEvent::QuotaExceeded {
                available: balance.available_credits,
            });
            return Err(ScribeError::QuotaExceeded {
                available: balance.available_credits,
            });
        }

        let Some(ctas) = self.pass_cta_gate(&topic).await? else {
            return Ok(StartOutcome::AwaitingCtaInput);
        };

        let request = self.services.prompt.compile(&topic, &ctas).await?;
        let token = self.guard.acquire().map_err(ScribeError::AlreadyRunning)?;
        self.run(token, topic, ctas, Entry::Fresh(request)).await
    }

    /// Add organization CTAs and resume the start that is waiting for them.
    pub async fn provide_ctas(&self, ctas: Vec<Cta>) -> ScribeResult<StartOutcome> {
        let pending = self.gate().pending.clone().ok_or_else(nothing_pending)?;
        if ctas.is_empty() {
            return Err(ScribeError::Validation(
                "At least one call to action is required".to_string(),
            ));
        }

        self.services.ctas.add(&ctas).await?;
        self.gate().pending = None;
        self.start(pending).await
    }

    /// Skip the CTA gate for the rest of this session and resume the waiting start.
    /// The skip is remembered even when nothing is waiting.
    pub async fn skip_cta_gate(&self) -> ScribeResult<StartOutcome> {
        let pending = {
            let mut gate = self.gate();
            gate.skipped = true;
            gate.pending.take()
        };
        match pending {
            Some(topic) => self.start(topic).await,
            None => Err(nothing_pending()),
        }
    }

    /// Resume polling a job from the last session, skipping the stream tier.
    pub async fn retry(&self, job_id: &str) -> ScribeResult<StartOutcome> {
        let topic = self
            .last_topic_slot()
            .as_ref()
            .cloned()
            .ok_or_else(|| ScribeError::NotFound("No previous generation to retry".to_string()))?;
        self.resume_job(topic, job_id).await
    }

    /// Resume polling `job_id` for `topic`, skipping the stream tier.
    pub async fn resume_job(&self, topic: Topic, job_id: &str) -> ScribeResult<StartOutcome> {
        if let Some(owner) = self.guard.owner() {
            return Err(ScribeError::AlreadyRunning(owner));
        }

        let known_ctas = {
            let session = self.session_read();
            (session.topic_ref == topic.id).then(|| session.ctas.clone())
        };
        let ctas = match known_ctas {
            Some(ctas) => ctas,
            None => match self.services.ctas.list().await {
                Ok(list) => list.ctas,
                Err(e) => {
                    warn!("CTA lookup failed for retry, continuing without: error={}", e);
                    Vec::new()
                }
            },
        };

        let token = self.guard.acquire().map_err(ScribeError::AlreadyRunning)?;
        self.run(token, topic, ctas, Entry::Resume(job_id.to_string()))
            .await
    }

    /// Start over: stop consuming the active tier and reset to idle.
    ///
    /// Client-side only. Remote work already in flight may still finish.
    pub async fn cancel(&self) {
        let revoked = self.guard.invalidate();
        if let Some(cancel) = self.cancel_slot().take() {
            cancel.cancel();
        }

        let previous = {
            let mut session = self.session_write();
            std::mem::replace(&mut *session, GenerationSession::idle()).generation_token
        };
        *self.document_write() = RenderedDocument::default();
        *self.gate() = CtaGate::default();
        self.drafts.reset().await;

        let token = revoked.unwrap_or(previous);
        info!("Generation cancelled: token={}", token);
        self.events.emit(GenerationEvent::Cancelled { token });
    }

    async fn pass_cta_gate(&self, topic: &Topic) -> ScribeResult<Option<Vec<Cta>>> {
        let list = self.services.ctas.list().await?;
        if !list.ctas.is_empty() {
            return Ok(Some(list.ctas));
        }

        {
            let mut gate = self.gate();
            if gate.skipped {
                return Ok(Some(Vec::new()));
            }
            gate.pending = Some(topic.clone());
        }

        info!("Generation paused for CTA input: topic_ref={}", topic.id);
        self.events.emit(GenerationEvent::CtaInputRequired {
            topic_ref: topic.id.clone(),
        });
        Ok(None)
    }

    async fn run(
        &self,
        token: u64,
        topic: Topic,
        ctas: Vec<Cta>,
        entry: Entry,
    ) -> ScribeResult<StartOutcome> {
        let cancel = CancellationToken::new();
        if let Some(previous) = self.cancel_slot().replace(cancel.clone()) {
            previous.cancel();
        }
        *self.last_topic_slot() = Some(topic.clone());
        self.drafts.reset().await;

        let mut session = GenerationSession::new(topic.id.clone(), topic.title.clone(), token);
        session.ctas = ctas.clone();
        session.status = GenerationStatus::FetchingRelated;
        *self.session_write() = session;
        *self.document_write() = RenderedDocument::default();

        info!(
            "Generation started: token={}, topic_ref={}, ctas={}",
            token,
            topic.id,
            ctas.len()
        );
        self.events.emit(GenerationEvent::StatusChanged {
            token,
            status: GenerationStatus::FetchingRelated,
        });

        let query = RelatedQuery {
            topic_ref: topic.id.clone(),
            query: topic.title.clone(),
            keywords: topic.keywords.clone(),
        };
        let (tx_related, rx_related) = mpsc::unbounded_channel();

        let related = async {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {}
                _ = self.aggregator.fetch_all(&query, ctas.len(), tx_related) => {}
            }
        };
        let consume = self.consume_related(token, rx_related);
        let generate = async {
            let result = self.run_chain(token, &cancel, entry).await;
            self.finish(token, &topic, result).await
        };

        let ((), (), outcome) = tokio::join!(related, consume, generate);
        outcome
    }

    async fn run_chain(
        &self,
        token: u64,
        cancel: &CancellationToken,
        entry: Entry,
    ) -> ScribeResult<(GenerationTier, GenerationPayload)> {
        let api = self.services.generation.as_ref();
        let sink = SessionSink {
            orchestrator: self,
            token,
        };
        let interval = self.config.job_poll_interval();

        let request = match entry {
            Entry::Resume(job_id) => {
                self.set_status(token, GenerationStatus::Polling);
                let job_id = tiers::resume_job(api, &job_id, cancel).await?;
                self.update_session(token, |s| s.job_id = Some(job_id.clone()));
                let payload = tiers::poll_job(api, &job_id, interval, cancel, &sink).await?;
                return Ok((GenerationTier::Job, payload));
            }
            Entry::Fresh(request) => request,
        };

        let stream_failure = match api.stream_descriptor(&request) {
            Ok(descriptor) => {
                self.set_status(token, GenerationStatus::Streaming);
                match tiers::run_stream_tier(
                    self.services.transport.as_ref(),
                    &descriptor,
                    cancel,
                    &sink,
                )
                .await
                {
                    Ok(payload) => return Ok((GenerationTier::Stream, payload)),
                    Err(ScribeError::Cancelled) => return Err(ScribeError::Cancelled),
                    Err(e) => e,
                }
            }
            Err(e) => ScribeError::Transport(e.to_string()),
        };
        self.fall_back(token, GenerationTier::Stream, GenerationTier::Job, &stream_failure);

        self.set_status(token, GenerationStatus::Polling);
        match tiers::submit_job(api, &request, cancel).await {
            Ok(job_id) => {
                debug!("Job submitted: token={}, job_id={}", token, job_id);
                self.update_session(token, |s| s.job_id = Some(job_id.clone()));
                let payload = tiers::poll_job(api, &job_id, interval, cancel, &sink).await?;
                return Ok((GenerationTier::Job, payload));
            }
            Err(ScribeError::Cancelled) => return Err(ScribeError::Cancelled),
            Err(e) => self.fall_back(token, GenerationTier::Job, GenerationTier::Sync, &e),
        }

        self.set_status(token, GenerationStatus::Syncing);
        let payload = tiers::run_sync_tier(api, &request, cancel).await?;
        Ok((GenerationTier::Sync, payload))
    }

    async fn finish(
        &self,
        token: u64,
        topic: &Topic,
        result: ScribeResult<(GenerationTier, GenerationPayload)>,
    ) -> ScribeResult<StartOutcome> {
        let outcome = match result {
            Ok((tier, payload)) => self.commit(token, topic, tier, payload).await,
            Err(ScribeError::Cancelled) => {
                debug!("Generation attempt stopped: token={}", token);
                Ok(StartOutcome::Cancelled)
            }
            Err(e) => {
                self.fail(token, &e);
                Err(e)
            }
        };
        self.guard.release(token);
        outcome
    }

    async fn commit(
        &self,
        token: u64,
        topic: &Topic,
        tier: GenerationTier,
        payload: GenerationPayload,
    ) -> ScribeResult<StartOutcome> {
        if !self.guard.is_current(token) {
            debug!("Discarding result from superseded attempt: token={}", token);
            return Ok(StartOutcome::Superseded);
        }

        let title = topic.title.trim();
        let content = payload.content.clone().unwrap_or_default();
        let missing = if title.is_empty() {
            Some("Generated post has no title")
        } else if content.trim().is_empty() {
            Some("Generated post has no content")
        } else {
            None
        };
        if let Some(message) = missing {
            let err = ScribeError::Validation(message.to_string());
            self.fail(token, &err);
            return Err(err);
        }

        let mut job_id = None;
        let mut ctas = Vec::new();
        let applied = self.update_session(token, |s| {
            merge_ctas(&mut s.ctas, &payload.ctas);
            s.final_content = Some(content.clone());
            s.final_tier = Some(tier);
            s.progress.percent = 100;
            s.error = None;
            job_id = s.job_id.clone();
            ctas = s.ctas.clone();
        });
        if !applied {
            return Ok(StartOutcome::Superseded);
        }
        self.rerender(token);

        let mut draft = Draft::new(title.to_string(), content, topic.id.clone());
        draft.ctas = ctas;
        draft.generation_metadata = generation_metadata(tier, job_id.as_deref(), &payload);

        let draft_id = match self.drafts.commit_generated(draft).await {
            SaveOutcome::Saved(saved) => Some(saved.id),
            SaveOutcome::Failed(message) => {
                warn!(
                    "Initial draft save failed, autosave will retry: token={}, error={}",
                    token, message
                );
                None
            }
            SaveOutcome::Discarded => {
                // The draft was dropped mid-save; nothing was committed.
                debug!("Draft dropped during initial save: token={}", token);
                if self.update_session(token, |s| *s = GenerationSession::idle()) {
                    *self.document_write() = RenderedDocument::default();
                }
                return Ok(StartOutcome::Superseded);
            }
            SaveOutcome::Skipped => None,
        };
        self.set_status(token, GenerationStatus::Complete);
        if self.guard.is_current(token) {
            self.drafts.start_autosave();
        }

        info!(
            "Generation completed: token={}, tier={:?}, draft_id={:?}",
            token, tier, draft_id
        );
        self.events.emit(GenerationEvent::Completed {
            token,
            tier,
            draft_id: draft_id.clone(),
        });
        Ok(StartOutcome::Completed { tier, draft_id })
    }

    fn fail(&self, token: u64, err: &ScribeError) {
        let message = err.to_string();
        let retry_job_id = err.retry_job_id().map(str::to_string);
        let applied = self.update_session(token, |s| {
            s.status = GenerationStatus::Failed;
            s.error = Some(message.clone());
            if let Some(job_id) = &retry_job_id {
                s.job_id = Some(job_id.clone());
            }
        });
        if !applied {
            return;
        }

        warn!("Generation failed: token={}, error={}", token, message);
        self.events.emit(GenerationEvent::StatusChanged {
            token,
            status: GenerationStatus::Failed,
        });
        self.events.emit(GenerationEvent::Failed {
            token,
            message,
            retry_job_id,
        });
    }

    fn fall_back(&self, token: u64, from: GenerationTier, to: GenerationTier, err: &ScribeError) {
        warn!(
            "Generation tier failed, falling back: token={}, from={:?}, to={:?}, error={}",
            token, from, to, err
        );
        // Text from the failed tier never mixes into the next one.
        let applied = self.update_session(token, |s| {
            s.accumulated_text.clear();
            s.progress = GenerationProgress::default();
        });
        if applied {
            self.events.emit(GenerationEvent::TierFallback {
                token,
                from,
                to,
                reason: err.to_string(),
            });
            self.rerender(token);
        }
    }

    async fn consume_related(&self, token: u64, mut rx: mpsc::UnboundedReceiver<RelatedUpdate>) {
        while let Some(update) = rx.recv().await {
            let update = match update {
                RelatedUpdate::QueriesExtracted(info) => {
                    self.events
                        .emit(GenerationEvent::QueriesExtracted { token, info });
                    continue;
                }
                other => other,
            };

            let mut changed_step = None;
            let applied = self.update_session(token, |s| match update {
                RelatedUpdate::Step(step) => {
                    s.set_step(step);
                    changed_step = Some(step);
                }
                RelatedUpdate::Tweets(tweets) => s.related_results.tweets = tweets,
                RelatedUpdate::Articles(articles) => s.related_results.articles = articles,
                RelatedUpdate::Videos(videos) => s.related_results.videos = videos,
                RelatedUpdate::QueriesExtracted(_) => {}
            });
            if !applied {
                continue;
            }

            if let Some(step) = changed_step {
                self.events.emit(GenerationEvent::RelatedStep { token, step });
            }
            self.rerender(token);
        }
    }

    fn set_status(&self, token: u64, status: GenerationStatus) {
        if self.update_session(token, |s| s.status = status) {
            self.events
                .emit(GenerationEvent::StatusChanged { token, status });
        }
    }

    /// Apply `f` only if the session still belongs to `token`.
    fn update_session<F: FnOnce(&mut GenerationSession)>(&self, token: u64, f: F) -> bool {
        let mut session = self.session_write();
        if session.generation_token != token {
            return false;
        }
        f(&mut session);
        true
    }

    fn rerender(&self, token: u64) {
        let session = self.session_read();
        if session.generation_token != token {
            return;
        }

        let document = match &session.final_content {
            Some(content) => self.pipeline.render(
                content,
                &session.related_results,
                &session.related_steps,
                &session.ctas,
            ),
            None => self.pipeline.render_partial(
                &session.accumulated_text,
                &session.related_results,
                &session.related_steps,
                &session.ctas,
            ),
        };
        let pending_slots = document.pending_slots();
        let cta_links = document.cta_links;
        *self.document_write() = document;
        drop(session);

        self.events.emit(GenerationEvent::Rendered {
            token,
            pending_slots,
            cta_links,
        });
    }

    fn session_read(&self) -> RwLockReadGuard<'_, GenerationSession> {
        self.session.read().unwrap_or_else(|e| e.into_inner())
    }

    fn session_write(&self) -> RwLockWriteGuard<'_, GenerationSession> {
        self.session.write().unwrap_or_else(|e| e.into_inner())
    }

    fn document_read(&self) -> RwLockReadGuard<'_, RenderedDocument> {
        self.document.read().unwrap_or_else(|e| e.into_inner())
    }

    fn document_write(&self) -> RwLockWriteGuard<'_, RenderedDocument> {
        self.document.write().unwrap_or_else(|e| e.into_inner())
    }

    fn gate(&self) -> MutexGuard<'_, CtaGate> {
        self.cta_gate.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn cancel_slot(&self) -> MutexGuard<'_, Option<CancellationToken>> {
        self.cancel_token.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn last_topic_slot(&self) -> MutexGuard<'_, Option<Topic>> {
        self.last_topic.lock().unwrap_or_else(|e| e.into_inner())
    }
}

/// Feeds tier observations into the session owned by `token`.
struct SessionSink<'a> {
    orchestrator: &'a GenerationOrchestrator,
    token: u64,
}

impl TierSink for SessionSink<'_> {
    fn on_chunk(&self, text: &str) {
        let o = self.orchestrator;
        if o.update_session(self.token, |s| s.accumulated_text.push_str(text)) {
            o.events.emit(GenerationEvent::Chunk {
                token: self.token,
                text: text.to_string(),
            });
            o.rerender(self.token);
        }
    }

    fn on_partial_content(&self, content: &str) {
        let o = self.orchestrator;
        if o.update_session(self.token, |s| s.accumulated_text = content.to_string()) {
            o.rerender(self.token);
        }
    }

    fn on_job_status(&self, job_id: &str, status: &JobStatus) {
        let o = self.orchestrator;
        let progress = GenerationProgress {
            percent: status.percent(),
            current_step: status.current_step.clone(),
            eta_seconds: status.estimated_time_remaining,
        };
        let applied = o.update_session(self.token, |s| {
            s.job_id = Some(job_id.to_string());
            s.progress = progress.clone();
        });
        if applied {
            o.events.emit(GenerationEvent::Progress {
                token: self.token,
                progress,
            });
        }
    }

    fn on_narration(&self, info: Value) {
        self.orchestrator.events.emit(GenerationEvent::QueriesExtracted {
            token: self.token,
            info,
        });
    }
}

fn merge_ctas(existing: &mut Vec<Cta>, returned: &[Cta]) {
    for cta in returned {
        if !existing.iter().any(|known| known.href == cta.href) {
            existing.push(cta.clone());
        }
    }
}

fn generation_metadata(
    tier: GenerationTier,
    job_id: Option<&str>,
    payload: &GenerationPayload,
) -> Value {
    let mut metadata = payload.extra.clone();
    metadata.insert("tier".to_string(), serde_json::json!(tier));
    if let Some(job_id) = job_id {
        metadata.insert("jobId".to_string(), Value::from(job_id));
    }
    Value::Object(metadata)
}

fn nothing_pending() -> ScribeError {
    ScribeError::NotFound("No generation is waiting for CTA input".to_string())
}
