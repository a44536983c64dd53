//! Logging Configuration

use anyhow::{anyhow, Context, Result};
use chrono::Local;
use std::fs::OpenOptions;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;
use tracing_subscriber::{fmt, EnvFilter};

const LOG_LEVEL_ENV_VAR: &str = "SCRIBE_LOG_LEVEL";
const LOG_FILE_NAME: &str = "scribe.log";
const SESSION_DIR_PATTERN: &str = r"^\d{8}T\d{6}$";
const MAX_LOG_SESSIONS: usize = 20;
const LOG_RETENTION_DAYS: i64 = 7;

#[derive(Debug, Clone)]
pub struct LogConfig {
    pub level: log::LevelFilter,
    pub verbose: bool,
    pub session_log_dir: PathBuf,
}

impl LogConfig {
    pub fn new(verbose: bool, requested_level: Option<&str>) -> Self {
        let level = match requested_level {
            Some(raw) => parse_log_level(raw).unwrap_or_else(|| {
                eprintln!("Warning: Invalid --log-level '{}', falling back to default", raw);
                resolve_default_level(verbose)
            }),
            None => resolve_default_level(verbose),
        };

        Self {
            level,
            verbose,
            session_log_dir: create_session_log_dir(&logs_root()),
        }
    }
}

fn resolve_default_level(verbose: bool) -> log::LevelFilter {
    let fallback = if verbose || cfg!(debug_assertions) {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Info
    };
    match std::env::var(LOG_LEVEL_ENV_VAR) {
        Ok(val) => parse_log_level(&val).unwrap_or_else(|| {
            eprintln!(
                "Warning: Invalid {} '{}', falling back to default",
                LOG_LEVEL_ENV_VAR, val
            );
            fallback
        }),
        Err(_) => fallback,
    }
}

pub fn parse_log_level(value: &str) -> Option<log::LevelFilter> {
    match value.trim().to_lowercase().as_str() {
        "trace" => Some(log::LevelFilter::Trace),
        "debug" => Some(log::LevelFilter::Debug),
        "info" => Some(log::LevelFilter::Info),
        "warn" => Some(log::LevelFilter::Warn),
        "error" => Some(log::LevelFilter::Error),
        "off" => Some(log::LevelFilter::Off),
        _ => None,
    }
}

pub fn level_to_str(level: log::LevelFilter) -> &'static str {
    match level {
        log::LevelFilter::Trace => "trace",
        log::LevelFilter::Debug => "debug",
        log::LevelFilter::Info => "info",
        log::LevelFilter::Warn => "warn",
        log::LevelFilter::Error => "error",
        log::LevelFilter::Off => "off",
    }
}

pub fn logs_root() -> PathBuf {
    dirs::data_local_dir()
        .unwrap_or_else(std::env::temp_dir)
        .join("scribe")
        .join("logs")
}

pub fn create_session_log_dir(logs_root: &Path) -> PathBuf {
    let timestamp = Local::now().format("%Y%m%dT%H%M%S").to_string();
    let session_dir = logs_root.join(&timestamp);

    if let Err(e) = std::fs::create_dir_all(&session_dir) {
        eprintln!("Warning: Failed to create log session directory: {}", e);
        return logs_root.to_path_buf();
    }

    session_dir
}

/// Install the global subscriber. `log` records from the core crates are bridged
/// into it, so everything lands in the session's `scribe.log`.
pub fn init(config: &LogConfig) -> Result<()> {
    let log_path = config.session_log_dir.join(LOG_FILE_NAME);
    let file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("Failed to open log file {}", log_path.display()))?;

    // HTTP internals stay quiet unless asked for explicitly.
    let level = level_to_str(config.level);
    let filter = EnvFilter::new(format!("{level},hyper=warn,hyper_util=warn,reqwest=warn"));

    let file_layer = fmt::layer()
        .with_ansi(false)
        .with_thread_ids(true)
        .with_target(true)
        .with_writer(Mutex::new(file));
    let stderr_layer = config.verbose.then(|| {
        fmt::layer()
            .with_thread_ids(true)
            .with_target(true)
            .with_writer(std::io::stderr)
    });

    tracing_subscriber::registry()
        .with(filter)
        .with(file_layer)
        .with(stderr_layer)
        .try_init()
        .map_err(|e| anyhow!("Failed to install log subscriber: {}", e))?;

    log::info!(
        "Logging initialized: level={}, session_log_dir={}",
        level,
        config.session_log_dir.display()
    );
    Ok(())
}

fn parse_session_timestamp(name: &str) -> Option<chrono::NaiveDateTime> {
    chrono::NaiveDateTime::parse_from_str(name, "%Y%m%dT%H%M%S").ok()
}

/// Remove the oldest session directories once there are more than `max_sessions`,
/// but only those past the retention window.
pub async fn cleanup_log_sessions(logs_root: &Path, max_sessions: usize) -> std::io::Result<usize> {
    let regex = regex::Regex::new(SESSION_DIR_PATTERN).map_err(|e| {
        std::io::Error::new(
            std::io::ErrorKind::InvalidInput,
            format!("Invalid session dir pattern: {}", e),
        )
    })?;
    let mut entries = tokio::fs::read_dir(logs_root).await?;
    let mut session_dirs: Vec<String> = Vec::new();

    while let Some(entry) = entries.next_entry().await? {
        if !entry.metadata().await?.is_dir() {
            continue;
        }
        let name = entry.file_name().to_string_lossy().to_string();
        if regex.is_match(&name) {
            session_dirs.push(name);
        }
    }

    session_dirs.sort();
    if session_dirs.len() <= max_sessions {
        return Ok(0);
    }

    let retention_threshold = Local::now().naive_local() - chrono::Duration::days(LOG_RETENTION_DAYS);
    let excess_count = session_dirs.len() - max_sessions;
    let to_delete: Vec<_> = session_dirs
        .into_iter()
        .take(excess_count)
        .filter(|name| {
            parse_session_timestamp(name)
                .map(|ts| ts < retention_threshold)
                .unwrap_or(false)
        })
        .collect();

    let mut removed = 0;
    for session_name in to_delete {
        match tokio::fs::remove_dir_all(logs_root.join(&session_name)).await {
            Ok(_) => {
                log::debug!("Removed old log session: {}", session_name);
                removed += 1;
            }
            Err(e) => log::warn!("Failed to remove log session {}: {}", session_name, e),
        }
    }
    Ok(removed)
}

pub fn spawn_log_cleanup_task() {
    tokio::spawn(async {
        if let Err(e) = cleanup_log_sessions(&logs_root(), MAX_LOG_SESSIONS).await {
            log::warn!("Failed to cleanup old log sessions: {}", e);
        }
    });
}
