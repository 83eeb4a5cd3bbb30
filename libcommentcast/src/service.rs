//! Service facade for Commentcast
//!
//! `CommentcastService` wires configuration and credentials into the
//! selection pipeline and the publishers, so both binaries share one entry
//! point.
//!
//! # Example
//!
//! ```no_run
//! use libcommentcast::service::CommentcastService;
//! use libcommentcast::selection::SelectionLimits;
//! use libcommentcast::Config;
//!
//! # async fn example() -> libcommentcast::Result<()> {
//! let config = Config::load()?;
//! let limits = SelectionLimits::from_config(&config.selection)?;
//! let service = CommentcastService::from_env(config, None)?;
//!
//! let report = service.run(limits, false).await?;
//! println!("Posted '{}' to {} networks", report.comment, report.results.len());
//! # Ok(())
//! # }
//! ```

use std::sync::Arc;

use tracing::{debug, info};

use crate::config::{BlueskyConfig, Config, MastodonConfig};
use crate::credentials::Credentials;
use crate::error::{CommentcastError, ConfigError, Result};
use crate::filter::{CommentFilter, GoogleTranslateDetector};
use crate::http::build_client;
use crate::platforms::bluesky::BlueskyPlatform;
use crate::platforms::mastodon::MastodonPlatform;
use crate::platforms::Platform;
use crate::poster::{Publisher, RetryPolicy};
use crate::selection::{SelectionContext, SelectionLimits, Selector};
use crate::source::SoundCloudSource;
use crate::token::{TokenProvider, TokenStore};
use crate::types::{RunReport, SelectedComment};

pub const KNOWN_PLATFORMS: [&str; 2] = ["mastodon", "bluesky"];

/// Decide which networks a run publishes to
///
/// An explicit request wins over `[defaults].platforms` and must only name
/// known networks; duplicates are dropped while keeping the first position.
pub fn resolve_platforms(config: &Config, requested: Option<&[String]>) -> Result<Vec<String>> {
    let Some(requested) = requested else {
        return Ok(config.enabled_platforms());
    };

    let mut platforms: Vec<String> = Vec::with_capacity(requested.len());
    for name in requested {
        let name = name.trim().to_lowercase();
        if !KNOWN_PLATFORMS.contains(&name.as_str()) {
            return Err(CommentcastError::InvalidInput(format!(
                "Unknown platform '{}'. Valid platforms: {}",
                name,
                KNOWN_PLATFORMS.join(", ")
            )));
        }
        if !platforms.contains(&name) {
            platforms.push(name);
        }
    }
    Ok(platforms)
}

pub struct CommentcastService {
    selector: Selector,
    publisher: Publisher,
}

impl CommentcastService {
    /// Assemble a service from already-built parts
    pub fn new(selector: Selector, publisher: Publisher) -> Self {
        Self {
            selector,
            publisher,
        }
    }

    /// Build from configuration, reading credentials from the environment
    ///
    /// `platforms` overrides `[defaults].platforms`; pass an empty slice to
    /// build a selection-only service.
    pub fn from_env(config: Config, platforms: Option<&[String]>) -> Result<Self> {
        let platforms = resolve_platforms(&config, platforms)?;
        let credentials = Credentials::from_env(&platforms)?;
        Self::build(&config, &credentials, &platforms)
    }

    /// Build from configuration and explicit credentials
    pub fn build(config: &Config, credentials: &Credentials, platforms: &[String]) -> Result<Self> {
        let client = build_client(&config.http)?;

        let store = TokenStore::new(config.token_store.expand_path()?);
        let tokens = Arc::new(TokenProvider::new(
            client.clone(),
            config.soundcloud.token_url.clone(),
            credentials.soundcloud.client_id.clone(),
            credentials.soundcloud.client_secret.clone(),
            store,
        ));

        let source = Arc::new(SoundCloudSource::new(
            client.clone(),
            config.soundcloud.api_base.clone(),
            config.soundcloud.max_track_id,
            tokens,
        ));

        let publisher = build_publisher(config, credentials, platforms, &client)?;

        // Selected comments must fit the tightest platform limit
        let mut filter_config = config.filter.clone();
        if let Some(limit) = publisher.character_limit() {
            if limit < filter_config.max_length {
                debug!(
                    configured = filter_config.max_length,
                    limit,
                    "Capping comment length at the platform limit"
                );
                filter_config.max_length = limit;
            }
        }

        let detector = Arc::new(GoogleTranslateDetector::new(
            client.clone(),
            config.language.endpoint.clone(),
            credentials.translate_api_key.clone(),
        ));
        let filter = CommentFilter::from_config(&filter_config, detector)?;

        info!(
            platforms = ?publisher.platform_names(),
            max_length = filter_config.max_length,
            "Commentcast ready"
        );

        Ok(Self::new(Selector::new(source, filter), publisher))
    }

    /// Select a comment without publishing it
    pub async fn pick(&self, limits: SelectionLimits) -> Result<SelectedComment> {
        let mut ctx = SelectionContext::new(limits);
        Ok(self.selector.get_comment(&mut ctx).await?)
    }

    /// Select a comment and publish it to every configured network
    ///
    /// With `dry_run` the comment is selected and reported but never sent.
    pub async fn run(&self, limits: SelectionLimits, dry_run: bool) -> Result<RunReport> {
        let selected = self.pick(limits).await?;

        let results = if dry_run {
            info!("Dry run, skipping publish");
            Vec::new()
        } else {
            self.publisher.publish_all(&selected.text).await
        };

        Ok(RunReport::new(selected, results))
    }

    pub fn platform_names(&self) -> Vec<&str> {
        self.publisher.platform_names()
    }

    pub fn filter(&self) -> &CommentFilter {
        self.selector.filter()
    }
}

fn build_publisher(
    config: &Config,
    credentials: &Credentials,
    platforms: &[String],
    client: &reqwest::Client,
) -> Result<Publisher> {
    let mut targets: Vec<(Box<dyn Platform>, RetryPolicy)> = Vec::new();

    for name in platforms {
        match name.as_str() {
            "mastodon" => {
                let section: &MastodonConfig = config
                    .mastodon
                    .as_ref()
                    .ok_or_else(|| ConfigError::MissingField("mastodon.instance".to_string()))?;
                let token = credentials.mastodon_access_token.as_ref().ok_or_else(|| {
                    ConfigError::MissingCredential(
                        crate::credentials::MASTODON_ACCESS_TOKEN.to_string(),
                    )
                })?;
                let policy = RetryPolicy::from_config("mastodon.retry.delay", &section.retry)?;
                let platform = MastodonPlatform::from_config(section, token)?;
                targets.push((Box::new(platform), policy));
            }
            "bluesky" => {
                let section = config.bluesky.clone().unwrap_or_else(|| BlueskyConfig {
                    enabled: true,
                    service: "https://bsky.social".to_string(),
                    retry: Default::default(),
                });
                let bluesky_credentials = credentials.bluesky.as_ref().ok_or_else(|| {
                    ConfigError::MissingCredential(crate::credentials::BLUESKY_USERNAME.to_string())
                })?;
                let policy = RetryPolicy::from_config("bluesky.retry.delay", &section.retry)?;
                let platform = BlueskyPlatform::from_config(client.clone(), &section, bluesky_credentials);
                targets.push((Box::new(platform), policy));
            }
            other => {
                return Err(CommentcastError::InvalidInput(format!(
                    "Unknown platform '{}'",
                    other
                )))
            }
        }
    }

    Ok(Publisher::new(targets))
}
