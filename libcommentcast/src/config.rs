//! Configuration management for Commentcast
//!
//! Settings come from an optional TOML file. Every section has defaults, so a
//! scheduled run works without any file at all; credentials never live here
//! (see [`crate::credentials`]).

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::error::{ConfigError, Result};

/// Upper bound of SoundCloud track identifiers worth sampling.
pub const DEFAULT_MAX_TRACK_ID: u64 = 784_514_266;

/// Longest comment (in characters, after trimming) that is still posted.
pub const DEFAULT_MAX_LENGTH: usize = 360;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub soundcloud: SoundCloudConfig,
    pub filter: FilterConfig,
    pub language: LanguageConfig,
    pub selection: SelectionConfig,
    pub token_store: TokenStoreConfig,
    pub http: HttpConfig,
    pub mastodon: Option<MastodonConfig>,
    pub bluesky: Option<BlueskyConfig>,
    pub defaults: DefaultsConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SoundCloudConfig {
    pub api_base: String,
    pub token_url: String,
    pub max_track_id: u64,
}

impl Default for SoundCloudConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.soundcloud.com".to_string(),
            token_url: "https://secure.soundcloud.com/oauth/token".to_string(),
            max_track_id: DEFAULT_MAX_TRACK_ID,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterConfig {
    pub max_length: usize,
    /// Minimum detector confidence for an English verdict
    pub min_confidence: f64,
    /// Replaces the built-in denylist when set
    pub denylist_file: Option<String>,
    /// Plain substrings appended to whichever denylist is active
    pub extra_words: Vec<String>,
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            max_length: DEFAULT_MAX_LENGTH,
            min_confidence: 0.0,
            denylist_file: None,
            extra_words: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LanguageConfig {
    pub endpoint: String,
}

impl Default for LanguageConfig {
    fn default() -> Self {
        Self {
            endpoint: "https://translation.googleapis.com/language/translate/v2/detect"
                .to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SelectionConfig {
    /// Fetch attempts before giving up; `None` retries forever
    pub max_attempts: Option<u32>,
    /// Wall-clock budget such as "10m"; `None` means no deadline
    pub deadline: Option<String>,
}

impl Default for SelectionConfig {
    fn default() -> Self {
        Self {
            max_attempts: Some(500),
            deadline: Some("15m".to_string()),
        }
    }
}

impl SelectionConfig {
    /// `"off"` or `"none"` disable the deadline
    pub fn deadline_duration(&self) -> Result<Option<Duration>> {
        match self.deadline.as_deref().map(str::trim) {
            None | Some("off") | Some("none") => Ok(None),
            Some(raw) => parse_duration("selection.deadline", raw).map(Some),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TokenStoreConfig {
    pub path: String,
}

impl Default for TokenStoreConfig {
    fn default() -> Self {
        Self {
            path: "~/.local/share/commentcast/keys.json".to_string(),
        }
    }
}

impl TokenStoreConfig {
    /// Expand `~` and environment variables in the configured path
    pub fn expand_path(&self) -> Result<PathBuf> {
        let expanded = shellexpand::full(&self.path).map_err(|e| ConfigError::InvalidValue {
            field: "token_store.path".to_string(),
            reason: e.to_string(),
        })?;
        Ok(PathBuf::from(expanded.as_ref()))
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpConfig {
    /// Per-request deadline such as "30s"
    pub timeout: String,
    pub user_agent: String,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            timeout: "30s".to_string(),
            user_agent: format!("commentcast/{}", env!("CARGO_PKG_VERSION")),
        }
    }
}

impl HttpConfig {
    pub fn timeout_duration(&self) -> Result<Duration> {
        parse_duration("http.timeout", &self.timeout)
    }
}

/// Opt-in retry for a publisher whose client may be briefly unavailable
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct RetryConfig {
    pub attempts: u32,
    pub delay: String,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            attempts: 1,
            delay: "5s".to_string(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MastodonConfig {
    pub enabled: bool,
    pub instance: String,
    #[serde(default)]
    pub retry: RetryConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlueskyConfig {
    pub enabled: bool,
    #[serde(default = "default_bluesky_service")]
    pub service: String,
    #[serde(default)]
    pub retry: RetryConfig,
}

fn default_bluesky_service() -> String {
    "https://bsky.social".to_string()
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DefaultsConfig {
    pub platforms: Vec<String>,
}

impl Default for DefaultsConfig {
    fn default() -> Self {
        Self {
            platforms: vec!["mastodon".to_string(), "bluesky".to_string()],
        }
    }
}

impl Config {
    /// Load configuration from the default location, falling back to defaults
    pub fn load() -> Result<Self> {
        let config_path = resolve_config_path()?;
        if !config_path.exists() {
            tracing::debug!(
                "No config file at {}, using defaults",
                config_path.display()
            );
            return Ok(Self::default());
        }
        Self::load_from_path(&config_path)
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(ConfigError::ReadError)?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content).map_err(ConfigError::ParseError)?;
        config.validate()?;
        Ok(config)
    }

    /// Reject values that would make a run meaningless
    pub fn validate(&self) -> Result<()> {
        if self.filter.max_length == 0 {
            return Err(ConfigError::InvalidValue {
                field: "filter.max_length".to_string(),
                reason: "must be at least 1".to_string(),
            }
            .into());
        }
        if !(0.0..=1.0).contains(&self.filter.min_confidence) {
            return Err(ConfigError::InvalidValue {
                field: "filter.min_confidence".to_string(),
                reason: format!("{} is outside 0.0..=1.0", self.filter.min_confidence),
            }
            .into());
        }
        if self.selection.max_attempts == Some(0) {
            return Err(ConfigError::InvalidValue {
                field: "selection.max_attempts".to_string(),
                reason: "must be at least 1".to_string(),
            }
            .into());
        }
        self.selection.deadline_duration()?;
        self.http.timeout_duration()?;
        Ok(())
    }

    /// Names of enabled platforms, in the order they are published to
    pub fn enabled_platforms(&self) -> Vec<String> {
        self.defaults
            .platforms
            .iter()
            .filter(|name| match name.as_str() {
                "mastodon" => self.mastodon.as_ref().is_some_and(|m| m.enabled),
                "bluesky" => self.bluesky.as_ref().is_some_and(|b| b.enabled),
                _ => false,
            })
            .cloned()
            .collect()
    }
}

pub(crate) fn parse_duration(field: &str, raw: &str) -> Result<Duration> {
    humantime::parse_duration(raw).map_err(|e| {
        ConfigError::InvalidValue {
            field: field.to_string(),
            reason: format!("'{}': {}", raw, e),
        }
        .into()
    })
}

/// Resolve the configuration file path following XDG Base Directory spec
pub fn resolve_config_path() -> Result<PathBuf> {
    if let Ok(path) = std::env::var("COMMENTCAST_CONFIG") {
        return Ok(PathBuf::from(shellexpand::tilde(&path).to_string()));
    }

    let config_dir = dirs::config_dir()
        .ok_or_else(|| ConfigError::MissingField("config directory".to_string()))?;

    Ok(config_dir.join("commentcast").join("config.toml"))
}
