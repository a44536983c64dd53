//! Scribe configuration
//!
//! Every field has a default, so an empty file (or no file at all) is valid.

use crate::util::errors::{ScribeError, ScribeResult};
use log::{debug, info};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

pub const CONFIG_ENV_VAR: &str = "SCRIBE_CONFIG";
pub const BASE_URL_ENV_VAR: &str = "SCRIBE_API_BASE_URL";
pub const TOKEN_ENV_VAR: &str = "SCRIBE_API_TOKEN";

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct ScribeConfig {
    pub api: ApiConfig,
    pub generation: GenerationConfig,
    pub related: RelatedConfig,
    pub render: RenderConfig,
    pub autosave: AutosaveConfig,
}

/// Backend connection settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ApiConfig {
    pub base_url: String,
    /// Raw token or full `Authorization` value.
    pub token: Option<String>,
    pub connect_timeout_secs: u64,
    /// Applies to JSON calls only. Streams and the synchronous tier are not bounded by it.
    pub request_timeout_secs: u64,
    pub headers: HashMap<String, String>,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: "http://127.0.0.1:3000".to_string(),
            token: None,
            connect_timeout_secs: 10,
            request_timeout_secs: 60,
            headers: HashMap::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GenerationConfig {
    pub job_poll_interval_ms: u64,
    /// Silence after which an open stream counts as failed. Unset means no limit.
    pub stream_idle_timeout_secs: Option<u64>,
    pub target_words: usize,
    pub tone: String,
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            job_poll_interval_ms: 2000,
            stream_idle_timeout_secs: None,
            target_words: 1200,
            tone: "informative".to_string(),
        }
    }
}

impl GenerationConfig {
    pub fn job_poll_interval(&self) -> Duration {
        Duration::from_millis(self.job_poll_interval_ms)
    }

    pub fn stream_idle_timeout(&self) -> Option<Duration> {
        self.stream_idle_timeout_secs.map(Duration::from_secs)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RelatedConfig {
    pub max_tweets: usize,
    pub max_videos: usize,
}

impl Default for RelatedConfig {
    fn default() -> Self {
        Self {
            max_tweets: 5,
            max_videos: 4,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenderConfig {
    pub heading_max_chars: usize,
    pub quote_max_chars: usize,
}

impl Default for RenderConfig {
    fn default() -> Self {
        Self {
            heading_max_chars: 250,
            quote_max_chars: 500,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct AutosaveConfig {
    pub interval_secs: u64,
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self { interval_secs: 15 }
    }
}

impl AutosaveConfig {
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_secs)
    }
}

impl ScribeConfig {
    /// Load from `path`, `$SCRIBE_CONFIG`, or the user config dir, in that order,
    /// then apply environment overrides and validate.
    pub fn load(path: Option<&Path>) -> ScribeResult<Self> {
        let candidate = path
            .map(Path::to_path_buf)
            .or_else(|| std::env::var_os(CONFIG_ENV_VAR).map(PathBuf::from))
            .or_else(Self::default_path);

        let mut config = match candidate {
            Some(path) if path.exists() => Self::from_file(&path)?,
            Some(path) => {
                debug!("Config file not found, using defaults: path={}", path.display());
                Self::default()
            }
            None => Self::default(),
        };

        config.apply_overrides(
            std::env::var(BASE_URL_ENV_VAR).ok(),
            std::env::var(TOKEN_ENV_VAR).ok(),
        );
        config.validate()?;
        Ok(config)
    }

    pub fn default_path() -> Option<PathBuf> {
        dirs::config_dir().map(|dir| dir.join("scribe").join("config.toml"))
    }

    pub fn from_file(path: &Path) -> ScribeResult<Self> {
        let raw = std::fs::read_to_string(path).map_err(|e| {
            ScribeError::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        let config = Self::from_toml_str(&raw)
            .map_err(|e| ScribeError::Config(format!("{}: {}", path.display(), e)))?;
        info!("Config loaded: path={}", path.display());
        Ok(config)
    }

    pub fn from_toml_str(raw: &str) -> ScribeResult<Self> {
        toml::from_str(raw).map_err(|e| ScribeError::Config(e.to_string()))
    }

    /// Blank values are ignored.
    pub fn apply_overrides(&mut self, base_url: Option<String>, token: Option<String>) {
        if let Some(base_url) = base_url.filter(|v| !v.trim().is_empty()) {
            self.api.base_url = base_url.trim().to_string();
        }
        if let Some(token) = token.filter(|v| !v.trim().is_empty()) {
            self.api.token = Some(token);
        }
    }

    pub fn validate(&self) -> ScribeResult<()> {
        if self.api.base_url.trim().is_empty() {
            return Err(ScribeError::Config("api.base_url must not be empty".to_string()));
        }
        if self.autosave.interval_secs == 0 {
            return Err(ScribeError::Config(
                "autosave.interval_secs must be greater than zero".to_string(),
            ));
        }
        if self.generation.job_poll_interval_ms == 0 {
            return Err(ScribeError::Config(
                "generation.job_poll_interval_ms must be greater than zero".to_string(),
            ));
        }
        if self.render.heading_max_chars == 0 || self.render.quote_max_chars == 0 {
            return Err(ScribeError::Config(
                "render caps must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}
