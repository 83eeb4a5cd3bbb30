//! Configurable in-process platform
//!
//! Records every publish call so tests can verify orchestration without
//! credentials or network access.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::sleep;

use crate::error::PlatformError;
use crate::platforms::{Platform, PlatformResult};
use crate::types::PostReference;

#[derive(Debug, Clone)]
pub struct MockConfig {
    pub name: String,

    /// Error returned by every publish call once `transient_failures` are used up
    pub publish_error: Option<PlatformError>,

    /// Number of leading calls that fail with `PlatformError::Network`
    pub transient_failures: usize,

    /// Simulated latency per call
    pub delay: Duration,

    pub character_limit: Option<usize>,

    pub publish_call_count: Arc<AtomicUsize>,

    pub published_content: Arc<Mutex<Vec<String>>>,
}

impl Default for MockConfig {
    fn default() -> Self {
        Self {
            name: "mock".to_string(),
            publish_error: None,
            transient_failures: 0,
            delay: Duration::ZERO,
            character_limit: None,
            publish_call_count: Arc::new(AtomicUsize::new(0)),
            published_content: Arc::new(Mutex::new(Vec::new())),
        }
    }
}

pub struct MockPlatform {
    config: MockConfig,
}

impl MockPlatform {
    pub fn new(config: MockConfig) -> Self {
        Self { config }
    }

    pub fn success(name: &str) -> Self {
        Self::new(MockConfig {
            name: name.to_string(),
            ..Default::default()
        })
    }

    /// Every publish fails with `error`
    pub fn failing(name: &str, error: PlatformError) -> Self {
        Self::new(MockConfig {
            name: name.to_string(),
            publish_error: Some(error),
            ..Default::default()
        })
    }

    /// The first `failures` publishes fail with a network error, later ones succeed
    pub fn flaky(name: &str, failures: usize) -> Self {
        Self::new(MockConfig {
            name: name.to_string(),
            transient_failures: failures,
            ..Default::default()
        })
    }

    pub fn with_delay(name: &str, delay: Duration) -> Self {
        Self::new(MockConfig {
            name: name.to_string(),
            delay,
            ..Default::default()
        })
    }

    pub fn with_limit(name: &str, limit: usize) -> Self {
        Self::new(MockConfig {
            name: name.to_string(),
            character_limit: Some(limit),
            ..Default::default()
        })
    }

    /// Shared handles stay valid after the platform is boxed and moved
    pub fn call_counter(&self) -> Arc<AtomicUsize> {
        Arc::clone(&self.config.publish_call_count)
    }

    pub fn content_log(&self) -> Arc<Mutex<Vec<String>>> {
        Arc::clone(&self.config.published_content)
    }

    pub fn publish_call_count(&self) -> usize {
        self.config.publish_call_count.load(Ordering::SeqCst)
    }

    pub fn published_content(&self) -> Vec<String> {
        self.config
            .published_content
            .lock()
            .map(|log| log.clone())
            .unwrap_or_default()
    }
}

#[async_trait]
impl Platform for MockPlatform {
    async fn publish(&self, content: &str) -> PlatformResult<PostReference> {
        let call = self.config.publish_call_count.fetch_add(1, Ordering::SeqCst);

        if !self.config.delay.is_zero() {
            sleep(self.config.delay).await;
        }

        self.validate_content(content)?;

        if call < self.config.transient_failures {
            return Err(PlatformError::Network(format!(
                "{} unavailable (call {})",
                self.config.name,
                call + 1
            )));
        }

        if let Some(error) = &self.config.publish_error {
            return Err(error.clone());
        }

        if let Ok(mut log) = self.config.published_content.lock() {
            log.push(content.to_string());
        }

        let id = uuid::Uuid::new_v4().to_string();
        Ok(PostReference {
            platform: self.config.name.clone(),
            url: Some(format!("https://{}.example/posts/{}", self.config.name, id)),
            id,
        })
    }

    fn name(&self) -> &str {
        &self.config.name
    }

    fn character_limit(&self) -> Option<usize> {
        self.config.character_limit
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_mock_success() {
        let platform = MockPlatform::success("test");

        let reference = platform.publish("Test content").await.unwrap();
        assert_eq!(reference.platform, "test");
        assert!(reference.url.unwrap().ends_with(&reference.id));
        assert_eq!(platform.publish_call_count(), 1);
        assert_eq!(platform.published_content(), vec!["Test content"]);
    }

    #[tokio::test]
    async fn test_mock_failure() {
        let platform =
            MockPlatform::failing("test", PlatformError::Posting("Server said no".to_string()));

        let err = platform.publish("Test content").await.unwrap_err();
        assert!(err.to_string().contains("Server said no"));
        assert_eq!(platform.publish_call_count(), 1);
        assert!(platform.published_content().is_empty());
    }

    #[tokio::test]
    async fn test_mock_flaky_recovers() {
        let platform = MockPlatform::flaky("test", 2);

        assert!(matches!(
            platform.publish("x").await,
            Err(PlatformError::Network(_))
        ));
        assert!(platform.publish("x").await.is_err());
        assert!(platform.publish("x").await.is_ok());
        assert_eq!(platform.publish_call_count(), 3);
    }

    #[tokio::test]
    async fn test_mock_with_delay() {
        let platform = MockPlatform::with_delay("test", Duration::from_millis(50));

        let start = std::time::Instant::now();
        platform.publish("Test").await.unwrap();
        assert!(start.elapsed() >= Duration::from_millis(50));
    }

    #[tokio::test]
    async fn test_mock_counter_survives_boxing() {
        let platform = MockPlatform::success("boxed");
        let counter = platform.call_counter();
        let boxed: Box<dyn Platform> = Box::new(platform);

        boxed.publish("hello").await.unwrap();
        assert_eq!(counter.load(Ordering::SeqCst), 1);
    }
}
