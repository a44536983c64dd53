use super::orchestrator::{GenerationOrchestrator, GenerationServices, StartOutcome};
use super::prompt::DefaultPromptCompiler;
use crate::infrastructure::api::{
    CreditsApi, CtaApi, GenerationApi, PostStore, RelatedContentApi, RelatedQuery,
    SocialVideoBundle,
};
use crate::infrastructure::events::{EventBus, GenerationEvent};
use crate::service::config::ScribeConfig;
use crate::service::render::SlotState;
use crate::util::errors::{ScribeError, ScribeResult};
use async_trait::async_trait;
use chrono::Utc;
use scribe_ai_adapters::StreamTransport;
use scribe_core_types::{
    Article, ArticleSearchEvent, CreditBalance, Cta, CtaList, GenerationPayload,
    GenerationRequest, GenerationStatus, GenerationTier, JobState, JobStatus, JobSubmission,
    PostRecord, RelatedStepId, SavedPost, SocialPost, StepStatus, StreamDescriptor, StreamEvent,
    Topic, Video,
};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tokio::sync::{broadcast, mpsc, Semaphore};

#[derive(Default)]
struct Backend {
    credits: i64,
    ctas: Mutex<Vec<Cta>>,
    stream_events: Vec<StreamEvent>,
    stream_open_fails: bool,
    /// Keep the stream open after the scripted events.
    stream_hangs: bool,
    held_streams: Mutex<Vec<mpsc::UnboundedSender<StreamEvent>>>,
    submit_fails: bool,
    job_statuses: Mutex<Vec<JobStatus>>,
    sync_content: Option<String>,
    tweets: Vec<SocialPost>,
    articles: Vec<Article>,
    videos: Vec<Video>,
    /// Hold related lookups until a permit is added.
    related_gate: Option<Arc<Semaphore>>,
    /// Hold post creation until a permit is added.
    create_gate: Option<Arc<Semaphore>>,
    calls: Mutex<Vec<String>>,
    creates: Mutex<Vec<PostRecord>>,
}

impl Backend {
    fn record(&self, call: &str) {
        self.calls.lock().expect("lock").push(call.to_string());
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().expect("lock").clone()
    }

    fn count(&self, call: &str) -> usize {
        self.calls().iter().filter(|c| c.as_str() == call).count()
    }
}

async fn pass(gate: &Option<Arc<Semaphore>>) {
    if let Some(gate) = gate {
        let _permit = gate.acquire().await.expect("gate open");
    }
}

#[async_trait]
impl StreamTransport for Backend {
    async fn open(
        &self,
        _descriptor: &StreamDescriptor,
    ) -> anyhow::Result<mpsc::UnboundedReceiver<StreamEvent>> {
        self.record("stream");
        if self.stream_open_fails {
            anyhow::bail!("connection refused");
        }
        let (tx, rx) = mpsc::unbounded_channel();
        for event in &self.stream_events {
            tx.send(event.clone())?;
        }
        if self.stream_hangs {
            self.held_streams.lock().expect("lock").push(tx);
        }
        Ok(rx)
    }
}

#[async_trait]
impl GenerationApi for Backend {
    fn stream_descriptor(&self, _request: &GenerationRequest) -> ScribeResult<StreamDescriptor> {
        Ok(StreamDescriptor::default())
    }

    async fn submit_job(&self, _request: &GenerationRequest) -> ScribeResult<JobSubmission> {
        self.record("submit");
        if self.submit_fails {
            return Err(ScribeError::Api {
                status: 503,
                message: "jobs disabled".to_string(),
            });
        }
        Ok(JobSubmission {
            job_id: "job-7".to_string(),
        })
    }

    async fn poll_job(&self, _job_id: &str) -> ScribeResult<JobStatus> {
        self.record("poll");
        let mut statuses = self.job_statuses.lock().expect("lock");
        if statuses.is_empty() {
            return Err(ScribeError::Api {
                status: 502,
                message: "bad gateway".to_string(),
            });
        }
        Ok(statuses.remove(0))
    }

    async fn retry_job(&self, job_id: &str) -> ScribeResult<JobSubmission> {
        self.record("retry");
        Ok(JobSubmission {
            job_id: job_id.to_string(),
        })
    }

    async fn generate_sync(&self, _request: &GenerationRequest) -> ScribeResult<GenerationPayload> {
        self.record("sync");
        match &self.sync_content {
            Some(content) => Ok(GenerationPayload::with_content(content.clone())),
            None => Err(ScribeError::Api {
                status: 500,
                message: "sync failed".to_string(),
            }),
        }
    }
}

#[async_trait]
impl RelatedContentApi for Backend {
    async fn fetch_social_and_videos(
        &self,
        _query: &RelatedQuery,
        _max_tweets: usize,
        _max_videos: usize,
    ) -> ScribeResult<SocialVideoBundle> {
        pass(&self.related_gate).await;
        Ok(SocialVideoBundle {
            tweets: self.tweets.clone(),
            videos: self.videos.clone(),
        })
    }

    async fn search_articles(
        &self,
        _query: &RelatedQuery,
    ) -> ScribeResult<mpsc::UnboundedReceiver<ArticleSearchEvent>> {
        let (tx, rx) = mpsc::unbounded_channel();
        let gate = self.related_gate.clone();
        let articles = self.articles.clone();
        tokio::spawn(async move {
            pass(&gate).await;
            let _ = tx.send(ArticleSearchEvent::Articles { articles });
        });
        Ok(rx)
    }
}

#[async_trait]
impl CreditsApi for Backend {
    async fn balance(&self) -> ScribeResult<CreditBalance> {
        self.record("credits");
        Ok(CreditBalance {
            total_credits: 10,
            used_credits: 10 - self.credits,
            available_credits: self.credits,
            is_unlimited: false,
        })
    }
}

#[async_trait]
impl CtaApi for Backend {
    async fn list(&self) -> ScribeResult<CtaList> {
        let ctas = self.ctas.lock().expect("lock").clone();
        Ok(CtaList {
            sufficient: !ctas.is_empty(),
            ctas,
        })
    }

    async fn add(&self, ctas: &[Cta]) -> ScribeResult<CtaList> {
        self.record("add_ctas");
        let mut stored = self.ctas.lock().expect("lock");
        stored.extend_from_slice(ctas);
        Ok(CtaList {
            ctas: stored.clone(),
            sufficient: true,
        })
    }
}

#[async_trait]
impl PostStore for Backend {
    async fn create(&self, record: &PostRecord) -> ScribeResult<SavedPost> {
        self.record("create");
        self.creates.lock().expect("lock").push(record.clone());
        pass(&self.create_gate).await;
        Ok(SavedPost {
            id: "post-1".to_string(),
            saved_at: Utc::now(),
        })
    }

    async fn update(&self, id: &str, _record: &PostRecord) -> ScribeResult<SavedPost> {
        self.record("update");
        Ok(SavedPost {
            id: id.to_string(),
            saved_at: Utc::now(),
        })
    }
}

fn cta(text: &str, href: &str) -> Cta {
    Cta {
        text: text.to_string(),
        href: href.to_string(),
        cta_type: "link".to_string(),
        placement: None,
    }
}

fn tweet(i: usize) -> SocialPost {
    SocialPost {
        id: format!("tw-{}", i),
        author: "@dev".to_string(),
        text: format!("tweet {}", i),
        url: format!("https://x.com/dev/status/{}", i),
    }
}

fn article(i: usize) -> Article {
    Article {
        title: format!("Article {}", i),
        url: format!("https://news.example.com/{}", i),
        source: None,
        snippet: None,
        image_url: Some(format!("https://img.example.com/{}.png", i)),
    }
}

fn video(i: usize) -> Video {
    Video {
        id: format!("v{}", i),
        title: format!("Video {}", i),
        url: format!("https://video.example.com/{}", i),
        thumbnail_url: None,
        channel: None,
    }
}

fn job_status(progress: f64, state: JobState) -> JobStatus {
    JobStatus {
        progress,
        current_step: Some("Writing".to_string()),
        status: state,
        estimated_time_remaining: None,
        result: None,
        partial_content: None,
        error: None,
    }
}

fn topic() -> Topic {
    Topic {
        id: "topic-42".to_string(),
        title: "Shipping async Rust".to_string(),
        summary: None,
        keywords: vec!["tokio".to_string()],
    }
}

fn article_body() -> String {
    let mut body = String::from("# Shipping async Rust\n\n{{tweet:0}}\n\nRead [the guide](https://example.com/guide).\n\n");
    while body.chars().count() < 1400 {
        body.push('x');
    }
    body.truncate(1400);
    body
}

fn orchestrator(backend: &Arc<Backend>) -> Arc<GenerationOrchestrator> {
    let mut config = ScribeConfig::default();
    config.generation.job_poll_interval_ms = 1;
    config.autosave.interval_secs = 3600;

    let services = GenerationServices {
        generation: backend.clone(),
        transport: backend.clone(),
        related: backend.clone(),
        credits: backend.clone(),
        ctas: backend.clone(),
        posts: backend.clone(),
        prompt: Arc::new(DefaultPromptCompiler::new(&config.generation)),
    };
    Arc::new(
        GenerationOrchestrator::new(services, &config, Arc::new(EventBus::new()))
            .expect("orchestrator"),
    )
}

fn drain(rx: &mut broadcast::Receiver<GenerationEvent>) -> Vec<GenerationEvent> {
    let mut events = Vec::new();
    while let Ok(event) = rx.try_recv() {
        events.push(event);
    }
    events
}

async fn wait_for(
    rx: &mut broadcast::Receiver<GenerationEvent>,
    matches: impl Fn(&GenerationEvent) -> bool,
) {
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            if let Ok(event) = rx.recv().await {
                if matches(&event) {
                    return;
                }
            }
        }
    })
    .await
    .expect("expected event");
}

async fn wait_for_chunk(rx: &mut broadcast::Receiver<GenerationEvent>) {
    wait_for(rx, |e| matches!(e, GenerationEvent::Chunk { .. })).await;
}

async fn wait_for_call(backend: &Backend, call: &str) {
    tokio::time::timeout(Duration::from_secs(5), async {
        while backend.count(call) == 0 {
            tokio::time::sleep(Duration::from_millis(1)).await;
        }
    })
    .await
    .expect("expected call");
}

#[tokio::test]
async fn streamed_generation_commits_once_with_all_related_content() {
    let body = article_body();
    let mut stream_events: Vec<StreamEvent> = (0..12)
        .map(|i| StreamEvent::Chunk {
            text: format!("part {} ", i),
        })
        .collect();
    stream_events.push(StreamEvent::Complete {
        payload: GenerationPayload::with_content(body.clone()),
    });

    let backend = Arc::new(Backend {
        credits: 5,
        ctas: Mutex::new(vec![
            cta("the guide", "https://example.com/guide"),
            cta("Book a call", "https://example.com/call"),
        ]),
        stream_events,
        tweets: (0..2).map(tweet).collect(),
        articles: (0..3).map(article).collect(),
        videos: (0..4).map(video).collect(),
        ..Default::default()
    });
    let orchestrator = orchestrator(&backend);
    let mut rx = orchestrator.events().subscribe();

    let outcome = orchestrator.start(topic()).await.expect("started");

    assert_eq!(
        outcome,
        StartOutcome::Completed {
            tier: GenerationTier::Stream,
            draft_id: Some("post-1".to_string()),
        }
    );
    assert_eq!(backend.count("create"), 1);
    assert_eq!(backend.count("submit"), 0);
    assert_eq!(backend.count("sync"), 0);

    let draft = orchestrator.drafts().current().await.expect("draft");
    assert_eq!(draft.last_saved_content, body);
    assert_eq!(draft.id.as_deref(), Some("post-1"));

    let snapshot = orchestrator.snapshot();
    assert_eq!(snapshot.session.status, GenerationStatus::Complete);
    assert_eq!(snapshot.session.final_tier, Some(GenerationTier::Stream));
    for (id, count) in [
        (RelatedStepId::Ctas, 2),
        (RelatedStepId::Tweets, 2),
        (RelatedStepId::Articles, 3),
        (RelatedStepId::Videos, 4),
    ] {
        let step = snapshot.session.step(id).expect("step");
        assert_eq!(step.status, StepStatus::Done, "{:?}", id);
        assert_eq!(step.count, count, "{:?}", id);
    }
    assert_eq!(snapshot.document.pending_slots(), 0);
    assert_eq!(snapshot.document.cta_links, 1);
    assert!(snapshot.document.html.contains("embed-tweet"));

    let chunks = drain(&mut rx)
        .into_iter()
        .filter(|e| matches!(e, GenerationEvent::Chunk { .. }))
        .count();
    assert_eq!(chunks, 12);
}

#[tokio::test]
async fn stream_failure_falls_back_to_job_polling() {
    let mut done = job_status(100.0, JobState::Completed);
    done.result = Some(GenerationPayload::with_content("Content from the job"));

    let backend = Arc::new(Backend {
        credits: 5,
        ctas: Mutex::new(vec![cta("Book a call", "https://example.com/call")]),
        stream_events: vec![StreamEvent::Error {
            message: "upstream reset".to_string(),
        }],
        job_statuses: Mutex::new(vec![
            job_status(10.0, JobState::Queued),
            job_status(40.0, JobState::Running),
            job_status(75.0, JobState::Running),
            done,
        ]),
        ..Default::default()
    });
    let orchestrator = orchestrator(&backend);
    let mut rx = orchestrator.events().subscribe();

    let outcome = orchestrator.start(topic()).await.expect("started");

    assert!(matches!(
        outcome,
        StartOutcome::Completed {
            tier: GenerationTier::Job,
            ..
        }
    ));
    assert_eq!(backend.count("sync"), 0);
    assert_eq!(backend.count("create"), 1);

    let session = orchestrator.snapshot().session;
    assert_eq!(session.final_content.as_deref(), Some("Content from the job"));
    assert_eq!(session.job_id.as_deref(), Some("job-7"));

    let events = drain(&mut rx);
    let percents: Vec<u8> = events
        .iter()
        .filter_map(|e| match e {
            GenerationEvent::Progress { progress, .. } => Some(progress.percent),
            _ => None,
        })
        .collect();
    assert_eq!(percents, vec![10, 40, 75, 100]);
    assert!(events.iter().any(|e| matches!(
        e,
        GenerationEvent::TierFallback {
            from: GenerationTier::Stream,
            to: GenerationTier::Job,
            ..
        }
    )));

    let record = &backend.creates.lock().expect("lock")[0];
    assert_eq!(record.generation_metadata["jobId"], "job-7");
    assert_eq!(record.generation_metadata["tier"], "job");
}

#[tokio::test]
async fn no_credits_blocks_before_any_generation_call() {
    let backend = Arc::new(Backend {
        credits: 0,
        ctas: Mutex::new(vec![cta("Book a call", "https://example.com/call")]),
        ..Default::default()
    });
    let orchestrator = orchestrator(&backend);
    let mut rx = orchestrator.events().subscribe();

    let err = orchestrator.start(topic()).await.unwrap_err();

    assert!(matches!(err, ScribeError::QuotaExceeded { available: 0 }));
    assert_eq!(backend.calls(), vec!["credits"]);
    assert!(orchestrator.drafts().current().await.is_none());
    assert!(drain(&mut rx)
        .iter()
        .any(|e| matches!(e, GenerationEvent::QuotaExceeded { available: 0 })));
}

#[tokio::test]
async fn missing_ctas_pause_until_skipped() {
    let backend = Arc::new(Backend {
        credits: 5,
        sync_content: Some("Sync body".to_string()),
        stream_open_fails: true,
        submit_fails: true,
        ..Default::default()
    });
    let orchestrator = orchestrator(&backend);

    let outcome = orchestrator.start(topic()).await.expect("gate");
    assert_eq!(outcome, StartOutcome::AwaitingCtaInput);
    assert_eq!(backend.count("stream"), 0);

    let outcome = orchestrator.skip_cta_gate().await.expect("resumed");
    assert!(matches!(
        outcome,
        StartOutcome::Completed {
            tier: GenerationTier::Sync,
            ..
        }
    ));
    assert_eq!(
        backend.calls(),
        vec!["credits", "credits", "stream", "submit", "sync", "create"]
    );
}

#[tokio::test]
async fn provided_ctas_are_stored_before_resuming() {
    let backend = Arc::new(Backend {
        credits: 5,
        stream_events: vec![StreamEvent::Complete {
            payload: GenerationPayload::with_content("Body with [Book](https://example.com/book)"),
        }],
        ..Default::default()
    });
    let orchestrator = orchestrator(&backend);

    assert_eq!(
        orchestrator.start(topic()).await.expect("gate"),
        StartOutcome::AwaitingCtaInput
    );
    let outcome = orchestrator
        .provide_ctas(vec![cta("Book", "https://example.com/book")])
        .await
        .expect("resumed");

    assert!(matches!(outcome, StartOutcome::Completed { .. }));
    assert_eq!(backend.count("add_ctas"), 1);
    assert_eq!(orchestrator.snapshot().document.cta_links, 1);
}

#[tokio::test]
async fn provide_ctas_without_pending_start_is_rejected() {
    let backend = Arc::new(Backend::default());
    let orchestrator = orchestrator(&backend);
    let err = orchestrator
        .provide_ctas(vec![cta("Book", "https://example.com/book")])
        .await
        .unwrap_err();
    assert!(matches!(err, ScribeError::NotFound(_)));
}

#[tokio::test]
async fn blank_content_fails_validation_without_saving() {
    let backend = Arc::new(Backend {
        credits: 5,
        ctas: Mutex::new(vec![cta("Book", "https://example.com/book")]),
        stream_events: vec![StreamEvent::Complete {
            payload: GenerationPayload::with_content("   \n"),
        }],
        ..Default::default()
    });
    let orchestrator = orchestrator(&backend);

    let err = orchestrator.start(topic()).await.unwrap_err();

    assert!(matches!(err, ScribeError::Validation(_)));
    assert_eq!(backend.count("create"), 0);
    let session = orchestrator.snapshot().session;
    assert_eq!(session.status, GenerationStatus::Failed);
    assert!(session.error.is_some());
}

#[tokio::test]
async fn poll_failure_is_job_error_and_retry_resumes_polling() {
    let backend = Arc::new(Backend {
        credits: 5,
        ctas: Mutex::new(vec![cta("Book", "https://example.com/book")]),
        stream_open_fails: true,
        job_statuses: Mutex::new(vec![job_status(20.0, JobState::Running)]),
        sync_content: Some("never used".to_string()),
        ..Default::default()
    });
    let orchestrator = orchestrator(&backend);
    let mut rx = orchestrator.events().subscribe();

    let err = orchestrator.start(topic()).await.unwrap_err();
    assert_eq!(err.retry_job_id(), Some("job-7"));
    assert_eq!(backend.count("sync"), 0);
    assert!(drain(&mut rx).iter().any(|e| matches!(
        e,
        GenerationEvent::Failed { retry_job_id: Some(id), .. } if id == "job-7"
    )));

    let mut done = job_status(100.0, JobState::Completed);
    done.result = Some(GenerationPayload::with_content("Recovered body"));
    backend.job_statuses.lock().expect("lock").push(done);

    let outcome = orchestrator.retry("job-7").await.expect("retried");
    assert!(matches!(
        outcome,
        StartOutcome::Completed {
            tier: GenerationTier::Job,
            ..
        }
    ));
    assert_eq!(backend.count("retry"), 1);
    assert_eq!(backend.count("stream"), 1);
    assert_eq!(
        orchestrator.snapshot().session.final_content.as_deref(),
        Some("Recovered body")
    );
}

#[tokio::test]
async fn retry_without_previous_session_is_not_found() {
    let backend = Arc::new(Backend::default());
    let orchestrator = orchestrator(&backend);
    assert!(matches!(
        orchestrator.retry("job-1").await,
        Err(ScribeError::NotFound(_))
    ));
}

#[tokio::test]
async fn cancel_resets_session_and_blocks_commit() {
    let backend = Arc::new(Backend {
        credits: 5,
        ctas: Mutex::new(vec![cta("Book", "https://example.com/book")]),
        stream_events: vec![StreamEvent::Chunk {
            text: "Opening paragraph".to_string(),
        }],
        stream_hangs: true,
        ..Default::default()
    });
    let orchestrator = orchestrator(&backend);
    let mut rx = orchestrator.events().subscribe();

    let running = {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move { orchestrator.start(topic()).await })
    };
    wait_for_chunk(&mut rx).await;

    let err = orchestrator.start(topic()).await.unwrap_err();
    assert!(matches!(err, ScribeError::AlreadyRunning(_)));

    orchestrator.cancel().await;
    let outcome = running.await.expect("joined").expect("finished");

    assert!(matches!(
        outcome,
        StartOutcome::Cancelled | StartOutcome::Superseded
    ));
    assert_eq!(backend.count("create"), 0);
    let snapshot = orchestrator.snapshot();
    assert_eq!(snapshot.session.status, GenerationStatus::Idle);
    assert!(snapshot.session.accumulated_text.is_empty());
    assert!(snapshot.document.html.is_empty());
    assert!(orchestrator.drafts().current().await.is_none());
}

#[tokio::test]
async fn new_attempt_after_cancel_gets_fresh_token() {
    let backend = Arc::new(Backend {
        credits: 5,
        ctas: Mutex::new(vec![cta("Book", "https://example.com/book")]),
        stream_events: vec![StreamEvent::Complete {
            payload: GenerationPayload::with_content("First body"),
        }],
        ..Default::default()
    });
    let orchestrator = orchestrator(&backend);

    orchestrator.start(topic()).await.expect("first");
    let first = orchestrator.snapshot().session.generation_token;
    orchestrator.cancel().await;
    orchestrator.start(topic()).await.expect("second");
    let second = orchestrator.snapshot().session.generation_token;

    assert!(second > first);
    assert_eq!(backend.count("create"), 2);
}

#[tokio::test]
async fn stream_closed_before_complete_falls_back_to_job() {
    let mut done = job_status(100.0, JobState::Completed);
    done.result = Some(GenerationPayload::with_content("Full body from the job"));

    let backend = Arc::new(Backend {
        credits: 5,
        ctas: Mutex::new(vec![cta("Book", "https://example.com/book")]),
        stream_events: vec![StreamEvent::Chunk {
            text: "The first half of a sen".to_string(),
        }],
        job_statuses: Mutex::new(vec![done]),
        ..Default::default()
    });
    let orchestrator = orchestrator(&backend);

    let outcome = orchestrator.start(topic()).await.expect("started");

    assert!(matches!(
        outcome,
        StartOutcome::Completed {
            tier: GenerationTier::Job,
            ..
        }
    ));
    assert_eq!(backend.count("submit"), 1);
    assert_eq!(backend.count("create"), 1);
    assert_eq!(
        backend.creates.lock().expect("lock")[0].content,
        "Full body from the job"
    );
    assert_eq!(
        orchestrator.snapshot().session.final_content.as_deref(),
        Some("Full body from the job")
    );
}

#[tokio::test]
async fn related_content_arriving_after_completion_fills_slots() {
    let body = "Intro paragraph.\n\n{{tweet:0}}\n\n{{article:0}}\n\n{{video:0}}\n\nClosing paragraph.";
    let gate = Arc::new(Semaphore::new(0));
    let backend = Arc::new(Backend {
        credits: 5,
        ctas: Mutex::new(vec![cta("Book", "https://example.com/book")]),
        stream_events: vec![StreamEvent::Complete {
            payload: GenerationPayload::with_content(body),
        }],
        tweets: vec![tweet(0)],
        articles: vec![article(0)],
        videos: vec![video(0)],
        related_gate: Some(gate.clone()),
        ..Default::default()
    });
    let orchestrator = orchestrator(&backend);
    let mut rx = orchestrator.events().subscribe();

    let running = {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move { orchestrator.start(topic()).await })
    };
    wait_for(&mut rx, |e| matches!(e, GenerationEvent::Completed { .. })).await;

    let before = orchestrator.snapshot();
    assert_eq!(before.session.status, GenerationStatus::Complete);
    assert_eq!(before.session.final_content.as_deref(), Some(body));
    assert_eq!(before.document.placeholders.len(), 3);
    assert_eq!(before.document.pending_slots(), 3);

    gate.add_permits(2);
    let outcome = running.await.expect("joined").expect("finished");

    assert_eq!(
        outcome,
        StartOutcome::Completed {
            tier: GenerationTier::Stream,
            draft_id: Some("post-1".to_string()),
        }
    );
    let after = orchestrator.snapshot();
    assert_eq!(after.session.final_content.as_deref(), Some(body));
    assert_eq!(after.document.placeholders.len(), 3);
    assert!(after
        .document
        .placeholders
        .iter()
        .all(|slot| slot.state == SlotState::Resolved));
    assert!(after.document.html.contains("embed-tweet"));
    assert!(after.document.html.contains("embed-article"));
    assert!(after.document.html.contains("embed-video"));
    assert_eq!(backend.count("create"), 1);
    assert_eq!(backend.count("update"), 0);
}

#[tokio::test]
async fn draft_dropped_during_initial_save_is_not_marked_complete() {
    let gate = Arc::new(Semaphore::new(0));
    let backend = Arc::new(Backend {
        credits: 5,
        ctas: Mutex::new(vec![cta("Book", "https://example.com/book")]),
        stream_events: vec![StreamEvent::Complete {
            payload: GenerationPayload::with_content("Finished body"),
        }],
        create_gate: Some(gate.clone()),
        ..Default::default()
    });
    let orchestrator = orchestrator(&backend);
    let mut rx = orchestrator.events().subscribe();

    let running = {
        let orchestrator = orchestrator.clone();
        tokio::spawn(async move { orchestrator.start(topic()).await })
    };
    wait_for_call(&backend, "create").await;
    assert_ne!(
        orchestrator.snapshot().session.status,
        GenerationStatus::Complete
    );

    orchestrator.drafts().reset().await;
    gate.add_permits(1);
    let outcome = running.await.expect("joined").expect("finished");

    assert_eq!(outcome, StartOutcome::Superseded);
    let snapshot = orchestrator.snapshot();
    assert_eq!(snapshot.session.status, GenerationStatus::Idle);
    assert!(snapshot.session.final_content.is_none());
    assert!(snapshot.document.html.is_empty());
    assert!(orchestrator.drafts().current().await.is_none());
    assert!(!drain(&mut rx)
        .iter()
        .any(|e| matches!(e, GenerationEvent::Completed { .. })));
}
