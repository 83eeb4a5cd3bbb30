//! Publishing targets
//!
//! Each network is a [`Platform`] that turns one text into one public post.
//! Implementations own their authentication; callers only see `publish`.
//!
//! # Examples
//!
//! ```no_run
//! use libcommentcast::platforms::{mock::MockPlatform, Platform};
//!
//! # async fn example() {
//! let platform = MockPlatform::success("mastodon");
//! if platform.validate_content("ok classic comment").is_ok() {
//!     let reference = platform.publish("ok classic comment").await.unwrap();
//!     println!("Posted {} to {}", reference.id, reference.platform);
//! }
//! # }
//! ```

use async_trait::async_trait;

use crate::error::PlatformError;
use crate::types::PostReference;

pub mod bluesky;
pub mod mastodon;

// Available outside tests so integration tests can drive the publisher
pub mod mock;

pub type PlatformResult<T> = std::result::Result<T, PlatformError>;

#[async_trait]
pub trait Platform: Send + Sync {
    /// Publish `content` as a public post
    ///
    /// # Errors
    ///
    /// - `PlatformError::Authentication` when the credentials are rejected
    /// - `PlatformError::Validation` when the network refuses the content
    /// - `PlatformError::Network` when the network cannot be reached
    async fn publish(&self, content: &str) -> PlatformResult<PostReference>;

    /// Lowercase identifier, e.g. "mastodon"
    fn name(&self) -> &str;

    /// Maximum post length in characters, `None` when unbounded
    fn character_limit(&self) -> Option<usize>;

    /// Check content against the network's limits before sending it
    fn validate_content(&self, content: &str) -> PlatformResult<()> {
        if content.trim().is_empty() {
            return Err(PlatformError::Validation(
                "Content cannot be empty".to_string(),
            ));
        }

        if let Some(limit) = self.character_limit() {
            let count = content.chars().count();
            if count > limit {
                return Err(PlatformError::Validation(format!(
                    "Content exceeds {}'s {} character limit (got {} characters)",
                    self.name(),
                    limit,
                    count
                )));
            }
        }

        Ok(())
    }
}

/// Pull an HTTP status code out of a client library's error text
///
/// Looks for "HTTP 401", "status 403", "code: 429" style prefixes first, then
/// for a standalone three digit number followed by ':' or ' '.
pub(crate) fn extract_http_status(message: &str) -> Option<u16> {
    const PREFIXES: [&str; 4] = ["HTTP ", "status ", "code: ", "status_code: "];

    for prefix in PREFIXES {
        if let Some(pos) = message.find(prefix) {
            let code = message[pos + prefix.len()..]
                .get(0..3)
                .and_then(|s| s.parse::<u16>().ok());
            if let Some(code) = code.filter(|c| (100..=599).contains(c)) {
                return Some(code);
            }
        }
    }

    let bytes = message.as_bytes();
    bytes.windows(4).enumerate().find_map(|(i, w)| {
        let digits = w[..3].iter().all(u8::is_ascii_digit);
        let terminated = w[3] == b':' || w[3] == b' ';
        let standalone = i == 0 || !bytes[i - 1].is_ascii_digit();
        if !(digits && terminated && standalone) {
            return None;
        }
        std::str::from_utf8(&w[..3])
            .ok()
            .and_then(|s| s.parse::<u16>().ok())
            .filter(|c| (100..=599).contains(c))
    })
}
