//! Sequential publishing to every configured network

use std::time::Duration;

use tokio::time::sleep;
use tracing::{info, warn};

use crate::config::{parse_duration, RetryConfig};
use crate::error::{PlatformError, Result};
use crate::platforms::{Platform, PlatformResult};
use crate::types::{PostReference, PostResult};

/// Per-network retry for an unavailable client; a single attempt by default
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::none()
    }
}

impl RetryPolicy {
    pub fn none() -> Self {
        Self {
            max_attempts: 1,
            delay: Duration::ZERO,
        }
    }

    pub fn new(max_attempts: u32, delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            delay,
        }
    }

    pub fn from_config(field: &str, config: &RetryConfig) -> Result<Self> {
        let delay = parse_duration(field, &config.delay)?;
        Ok(Self::new(config.attempts, delay))
    }
}

/// Only a client that could not be reached is worth another try
fn is_retryable(error: &PlatformError) -> bool {
    matches!(error, PlatformError::Network(_))
}

async fn publish_with_retry(
    platform: &dyn Platform,
    policy: RetryPolicy,
    content: &str,
) -> PlatformResult<PostReference> {
    let name = platform.name();
    let mut attempt = 1;

    loop {
        match platform.publish(content).await {
            Ok(reference) => {
                if attempt > 1 {
                    info!(platform = name, attempt, "Published after retrying");
                }
                return Ok(reference);
            }
            Err(e) if is_retryable(&e) && attempt < policy.max_attempts => {
                warn!(
                    platform = name,
                    attempt,
                    max_attempts = policy.max_attempts,
                    "{}. Retrying in {}",
                    e,
                    humantime::format_duration(policy.delay)
                );
                sleep(policy.delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}

/// Publishes one text to each platform in order
///
/// A failing network never stops the ones after it and nothing is rolled
/// back; each outcome ends up in the returned results.
pub struct Publisher {
    targets: Vec<(Box<dyn Platform>, RetryPolicy)>,
}

impl Publisher {
    pub fn new(targets: Vec<(Box<dyn Platform>, RetryPolicy)>) -> Self {
        Self { targets }
    }

    /// Single-attempt publishing to every platform
    pub fn without_retry(platforms: Vec<Box<dyn Platform>>) -> Self {
        Self::new(
            platforms
                .into_iter()
                .map(|p| (p, RetryPolicy::none()))
                .collect(),
        )
    }

    pub fn platform_names(&self) -> Vec<&str> {
        self.targets.iter().map(|(p, _)| p.name()).collect()
    }

    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Tightest character limit among the target platforms
    pub fn character_limit(&self) -> Option<usize> {
        self.targets
            .iter()
            .filter_map(|(p, _)| p.character_limit())
            .min()
    }

    pub async fn publish_all(&self, content: &str) -> Vec<PostResult> {
        let mut results = Vec::with_capacity(self.targets.len());

        for (platform, policy) in &self.targets {
            let result = match publish_with_retry(platform.as_ref(), *policy, content).await {
                Ok(reference) => {
                    info!(
                        platform = platform.name(),
                        id = %reference.id,
                        url = reference.url.as_deref().unwrap_or(""),
                        "Published comment"
                    );
                    PostResult::succeeded(reference)
                }
                Err(e) => {
                    warn!(platform = platform.name(), "Failed to publish: {}", e);
                    PostResult::failed(platform.name(), e.to_string())
                }
            };
            results.push(result);
        }

        results
    }
}
