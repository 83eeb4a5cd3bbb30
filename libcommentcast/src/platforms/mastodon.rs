//! Mastodon publishing through megalodon
//!
//! Works with any Fediverse server that implements the Mastodon client API.

use async_trait::async_trait;
use megalodon::entities::StatusVisibility;
use megalodon::megalodon::{PostStatusInputOptions, PostStatusOutput};
use megalodon::{Megalodon, SNS};
use secrecy::{ExposeSecret, SecretString};
use tracing::debug;

use crate::config::MastodonConfig;
use crate::error::PlatformError;
use crate::platforms::{extract_http_status, Platform, PlatformResult};
use crate::types::PostReference;

const DEFAULT_CHARACTER_LIMIT: usize = 500;

pub struct MastodonPlatform {
    client: Box<dyn Megalodon + Send + Sync>,
    instance_url: String,
    character_limit: usize,
}

impl MastodonPlatform {
    pub fn new(instance_url: String, access_token: &SecretString) -> PlatformResult<Self> {
        let client = megalodon::generator(
            SNS::Mastodon,
            instance_url.clone(),
            Some(access_token.expose_secret().to_string()),
            Some(format!("commentcast/{}", env!("CARGO_PKG_VERSION"))),
        )
        .map_err(|e| {
            PlatformError::Authentication(format!("Failed to create Mastodon client: {:?}", e))
        })?;

        Ok(Self {
            client,
            instance_url,
            character_limit: DEFAULT_CHARACTER_LIMIT,
        })
    }

    /// Accepts bare host names such as "mastodon.social"
    pub fn from_config(config: &MastodonConfig, access_token: &SecretString) -> PlatformResult<Self> {
        if config.instance.trim().is_empty() {
            return Err(PlatformError::Authentication(
                "Mastodon instance is not configured".to_string(),
            ));
        }

        let instance_url =
            if config.instance.starts_with("http://") || config.instance.starts_with("https://") {
                config.instance.trim_end_matches('/').to_string()
            } else {
                format!("https://{}", config.instance.trim_end_matches('/'))
            };

        Self::new(instance_url, access_token)
    }

    pub fn instance_url(&self) -> &str {
        &self.instance_url
    }
}

#[async_trait]
impl Platform for MastodonPlatform {
    async fn publish(&self, content: &str) -> PlatformResult<PostReference> {
        self.validate_content(content)?;

        let options = PostStatusInputOptions {
            visibility: Some(StatusVisibility::Public),
            ..Default::default()
        };

        let response = self
            .client
            .post_status(content.to_string(), Some(&options))
            .await
            .map_err(|e| map_megalodon_error(e, "post status"))?;

        let reference = match response.json {
            PostStatusOutput::Status(status) => PostReference {
                platform: "mastodon".to_string(),
                id: status.id,
                url: status.url,
            },
            PostStatusOutput::ScheduledStatus(scheduled) => PostReference {
                platform: "mastodon".to_string(),
                id: scheduled.id,
                url: None,
            },
        };

        debug!(id = %reference.id, "Mastodon status created");
        Ok(reference)
    }

    fn name(&self) -> &str {
        "mastodon"
    }

    fn character_limit(&self) -> Option<usize> {
        Some(self.character_limit)
    }
}

/// Classify a megalodon failure
///
/// - 401/403: `Authentication`
/// - 422: `Validation`
/// - 429: `RateLimit`
/// - 5xx and transport failures: `Network`
/// - unparseable responses: `Posting`
fn map_megalodon_error(error: megalodon::error::Error, context: &str) -> PlatformError {
    let message = error.to_string();
    classify_failure(&message, context)
}

fn classify_failure(message: &str, context: &str) -> PlatformError {
    let lower = message.to_lowercase();

    match extract_http_status(message) {
        Some(401) | Some(403) => PlatformError::Authentication(format!(
            "Mastodon rejected the access token ({}): {}",
            context, message
        )),
        Some(422) => PlatformError::Validation(format!(
            "Mastodon refused the status ({}): {}",
            context, message
        )),
        Some(429) => PlatformError::RateLimit(format!(
            "Mastodon rate limit exceeded ({}): {}",
            context, message
        )),
        Some(500..=599) => PlatformError::Network(format!(
            "Mastodon server error ({}): {}",
            context, message
        )),
        Some(_) => PlatformError::Posting(format!(
            "Mastodon HTTP error ({}): {}",
            context, message
        )),
        None if lower.contains("unauthorized") || lower.contains("forbidden") => {
            PlatformError::Authentication(format!(
                "Mastodon rejected the access token ({}): {}",
                context, message
            ))
        }
        None if lower.contains("parse") || lower.contains("json") || lower.contains("deserialize") => {
            PlatformError::Posting(format!(
                "Mastodon returned an unexpected response ({}): {}",
                context, message
            ))
        }
        None if lower.contains("rate limit") || lower.contains("too many requests") => {
            PlatformError::RateLimit(format!(
                "Mastodon rate limit exceeded ({}): {}",
                context, message
            ))
        }
        None => PlatformError::Network(format!(
            "Mastodon unreachable ({}): {}",
            context, message
        )),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn token() -> SecretString {
        SecretString::from("test-token".to_string())
    }

    #[test]
    fn test_from_config_adds_scheme() {
        let config = MastodonConfig {
            enabled: true,
            instance: "mastodon.social/".to_string(),
            retry: Default::default(),
        };
        let platform = MastodonPlatform::from_config(&config, &token()).unwrap();
        assert_eq!(platform.instance_url(), "https://mastodon.social");
        assert_eq!(platform.name(), "mastodon");
        assert_eq!(platform.character_limit(), Some(500));
    }

    #[test]
    fn test_from_config_requires_instance() {
        let config = MastodonConfig {
            enabled: true,
            instance: " ".to_string(),
            retry: Default::default(),
        };
        assert!(matches!(
            MastodonPlatform::from_config(&config, &token()),
            Err(PlatformError::Authentication(_))
        ));
    }

    #[test]
    fn test_validate_rejects_over_limit() {
        let platform =
            MastodonPlatform::new("https://example.social".to_string(), &token()).unwrap();
        assert!(platform.validate_content(&"x".repeat(500)).is_ok());
        assert!(platform.validate_content(&"x".repeat(501)).is_err());
    }

    #[test]
    fn test_classify_failure_by_status() {
        assert!(matches!(
            classify_failure("HTTP 401 Unauthorized", "post status"),
            PlatformError::Authentication(_)
        ));
        assert!(matches!(
            classify_failure("status 422 Validation failed", "post status"),
            PlatformError::Validation(_)
        ));
        assert!(matches!(
            classify_failure("status 429", "post status"),
            PlatformError::RateLimit(_)
        ));
        assert!(matches!(
            classify_failure("status 502", "post status"),
            PlatformError::Network(_)
        ));
    }

    #[test]
    fn test_classify_failure_by_message() {
        assert!(matches!(
            classify_failure("error decoding response: expected value", "post status"),
            PlatformError::Network(_)
        ));
        assert!(matches!(
            classify_failure("failed to parse JSON", "post status"),
            PlatformError::Posting(_)
        ));
        assert!(matches!(
            classify_failure("connection refused", "post status"),
            PlatformError::Network(_)
        ));
    }

    #[test]
    fn test_context_included() {
        let error = classify_failure("status 500", "post status");
        assert!(error.to_string().contains("post status"));
    }
}
