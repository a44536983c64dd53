use crate::{GenerateArgs, OutputArgs, RenderArgs, RetryArgs};
use anyhow::{anyhow, bail, Context, Result};
use log::{debug, info, warn};
use scribe_core::generation::{GenerationOrchestrator, GenerationServices, StartOutcome};
use scribe_core::{
    ApiClient, CloseOutcome, EventBus, GenerationEvent, RenderPipeline, ScribeConfig, ScribeError,
    ScribeResult,
};
use scribe_core_types::{
    Cta, RelatedContentStep, RelatedResults, RelatedStepId, StepStatus, Topic,
};
use std::future::Future;
use std::path::Path;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tokio::task::JoinHandle;

pub fn load_config(
    path: Option<&Path>,
    base_url: Option<String>,
    token: Option<String>,
) -> Result<ScribeConfig> {
    let mut config = ScribeConfig::load(path)?;
    config.apply_overrides(base_url, token);
    config.validate()?;
    debug!("Using backend: base_url={}", config.api.base_url);
    Ok(config)
}

fn build_orchestrator(config: &ScribeConfig) -> Result<GenerationOrchestrator> {
    let client = ApiClient::with_stream_idle_timeout(
        &config.api,
        config.generation.stream_idle_timeout(),
    )?;
    let services = GenerationServices::from_client(Arc::new(client), config);
    Ok(GenerationOrchestrator::new(
        services,
        config,
        Arc::new(EventBus::new()),
    )?)
}

pub async fn generate(config: &ScribeConfig, args: GenerateArgs) -> Result<()> {
    let ctas = parse_ctas(&args.ctas)?;
    let topic = Topic {
        id: args
            .topic_id
            .clone()
            .unwrap_or_else(|| slugify(&args.title)),
        title: args.title.clone(),
        summary: args.summary.clone(),
        keywords: args.keywords.clone(),
    };

    let orchestrator = build_orchestrator(config)?;
    let printer = spawn_progress_printer(orchestrator.events());

    let result = until_interrupted(&orchestrator, async {
        let outcome = orchestrator.start(topic).await?;
        if outcome != StartOutcome::AwaitingCtaInput {
            return Ok(outcome);
        }
        if !ctas.is_empty() {
            info!("Registering CTAs from the command line: count={}", ctas.len());
            orchestrator.provide_ctas(ctas).await
        } else if args.skip_ctas {
            orchestrator.skip_cta_gate().await
        } else {
            Err(ScribeError::Validation(
                "The organization has no calls to action; pass --cta \"Text=https://url\" or --skip-ctas"
                    .to_string(),
            ))
        }
    })
    .await;

    printer.abort();
    report(&orchestrator, result, &args.output).await
}

pub async fn retry(config: &ScribeConfig, args: RetryArgs) -> Result<()> {
    let topic = Topic {
        id: args
            .topic_id
            .clone()
            .unwrap_or_else(|| slugify(&args.title)),
        title: args.title.clone(),
        ..Default::default()
    };

    let orchestrator = build_orchestrator(config)?;
    let printer = spawn_progress_printer(orchestrator.events());
    let result = until_interrupted(&orchestrator, orchestrator.resume_job(topic, &args.job_id)).await;
    printer.abort();
    report(&orchestrator, result, &args.output).await
}

pub fn render(config: &ScribeConfig, args: RenderArgs) -> Result<()> {
    let text = std::fs::read_to_string(&args.input)
        .with_context(|| format!("Failed to read {}", args.input.display()))?;
    let ctas = parse_ctas(&args.ctas)?;

    // Nothing is fetched here, so every marker resolves as unavailable.
    let steps: Vec<RelatedContentStep> = RelatedStepId::ALL
        .iter()
        .map(|id| RelatedContentStep {
            id: *id,
            status: StepStatus::Done,
            count: 0,
        })
        .collect();

    let pipeline = RenderPipeline::new(&config.render)?;
    let document = pipeline.render(&text, &RelatedResults::default(), &steps, &ctas);
    eprintln!(
        "Rendered {} placeholder(s), {} CTA link(s)",
        document.placeholders.len(),
        document.cta_links
    );

    if args.output.json {
        println!("{}", serde_json::to_string_pretty(&document)?);
    } else {
        write_html(&document.html, args.output.output.as_deref())?;
    }
    Ok(())
}

/// Run `work`, cancelling the session on Ctrl+C.
async fn until_interrupted<F>(
    orchestrator: &GenerationOrchestrator,
    work: F,
) -> ScribeResult<StartOutcome>
where
    F: Future<Output = ScribeResult<StartOutcome>>,
{
    tokio::select! {
        outcome = work => outcome,
        _ = tokio::signal::ctrl_c() => {
            warn!("Interrupted, cancelling generation");
            orchestrator.cancel().await;
            Ok(StartOutcome::Cancelled)
        }
    }
}

async fn report(
    orchestrator: &GenerationOrchestrator,
    result: ScribeResult<StartOutcome>,
    output: &OutputArgs,
) -> Result<()> {
    let outcome = match result {
        Ok(outcome) => outcome,
        Err(ScribeError::QuotaExceeded { available }) => {
            bail!("No generation credits left (available: {})", available)
        }
        Err(e) => {
            if let Some(job_id) = e.retry_job_id() {
                eprintln!("The job can be resumed with: scribe retry {} --title <TITLE>", job_id);
            }
            return Err(e.into());
        }
    };

    match outcome {
        StartOutcome::Completed { tier, draft_id } => {
            eprintln!(
                "Generated via {:?} tier, draft {}",
                tier,
                draft_id.as_deref().unwrap_or("not saved yet")
            );
        }
        StartOutcome::Cancelled | StartOutcome::Superseded => {
            eprintln!("Generation cancelled");
            return Ok(());
        }
        StartOutcome::AwaitingCtaInput => {
            return Err(anyhow!("Generation is still waiting for CTA input"));
        }
    }

    let snapshot = orchestrator.snapshot();
    if output.json {
        println!("{}", serde_json::to_string_pretty(&snapshot)?);
    } else {
        write_html(&snapshot.document.html, output.output.as_deref())?;
    }

    match orchestrator.drafts().close().await {
        CloseOutcome::Clean | CloseOutcome::SavedOnClose => Ok(()),
        CloseOutcome::NeedsConfirmation { error } => {
            orchestrator.drafts().confirm_discard().await;
            bail!("Draft could not be saved: {}", error)
        }
    }
}

fn write_html(html: &str, path: Option<&Path>) -> Result<()> {
    match path {
        Some(path) => std::fs::write(path, html)
            .with_context(|| format!("Failed to write {}", path.display())),
        None => {
            println!("{}", html);
            Ok(())
        }
    }
}

fn spawn_progress_printer(events: &EventBus) -> JoinHandle<()> {
    let mut rx = events.subscribe();
    tokio::spawn(async move {
        loop {
            match rx.recv().await {
                Ok(event) => print_event(&event),
                Err(RecvError::Lagged(skipped)) => {
                    debug!("Progress printer lagged: skipped={}", skipped)
                }
                Err(RecvError::Closed) => break,
            }
        }
    })
}

fn print_event(event: &GenerationEvent) {
    match event {
        GenerationEvent::StatusChanged { status, .. } => eprintln!("[status] {:?}", status),
        GenerationEvent::RelatedStep { step, .. } if step.status.is_finished() => {
            eprintln!("[related] {:?}: {:?} ({})", step.id, step.status, step.count)
        }
        GenerationEvent::Progress { progress, .. } => eprintln!(
            "[job] {}% {}",
            progress.percent,
            progress.current_step.as_deref().unwrap_or("")
        ),
        GenerationEvent::TierFallback { from, to, reason, .. } => {
            eprintln!("[fallback] {:?} -> {:?}: {}", from, to, reason)
        }
        GenerationEvent::Failed { message, .. } => eprintln!("[failed] {}", message),
        GenerationEvent::CtaInputRequired { .. } => {
            eprintln!("[cta] The organization has no calls to action")
        }
        GenerationEvent::DraftSaved { draft_id, manual, .. } => {
            eprintln!("[draft] saved {} (manual: {})", draft_id, manual)
        }
        GenerationEvent::DraftSaveFailed { message, .. } => {
            eprintln!("[draft] save failed: {}", message)
        }
        _ => {}
    }
}

/// Parse `Text=https://url` pairs.
fn parse_ctas(raw: &[String]) -> Result<Vec<Cta>> {
    raw.iter()
        .map(|entry| {
            let (text, href) = entry
                .split_once('=')
                .ok_or_else(|| anyhow!("Invalid CTA '{}', expected Text=https://url", entry))?;
            let (text, href) = (text.trim(), href.trim());
            if text.is_empty() || !(href.starts_with("https://") || href.starts_with("http://")) {
                bail!("Invalid CTA '{}', expected Text=https://url", entry);
            }
            Ok(Cta {
                text: text.to_string(),
                href: href.to_string(),
                cta_type: "link".to_string(),
                placement: None,
            })
        })
        .collect()
}

fn slugify(title: &str) -> String {
    let mut slug = String::with_capacity(title.len());
    for ch in title.trim().chars() {
        if ch.is_alphanumeric() {
            slug.extend(ch.to_lowercase());
        } else if !slug.ends_with('-') && !slug.is_empty() {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}
