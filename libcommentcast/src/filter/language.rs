//! Language detection backends

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use tracing::debug;

use crate::error::DetectError;

/// Detected language with the backend's confidence in `0.0..=1.0`
#[derive(Debug, Clone, PartialEq)]
pub struct Detection {
    pub language: String,
    pub confidence: f64,
}

impl Detection {
    pub fn new(language: impl Into<String>, confidence: f64) -> Self {
        Self {
            language: language.into(),
            confidence,
        }
    }

    pub fn is_english(&self, min_confidence: f64) -> bool {
        self.language.eq_ignore_ascii_case("en") && self.confidence >= min_confidence
    }
}

#[async_trait]
pub trait LanguageDetector: Send + Sync {
    async fn detect(&self, text: &str) -> Result<Detection, DetectError>;
}

#[derive(Debug, Deserialize)]
struct DetectResponse {
    data: DetectData,
}

#[derive(Debug, Deserialize)]
struct DetectData {
    detections: Vec<Vec<DetectEntry>>,
}

#[derive(Debug, Deserialize)]
struct DetectEntry {
    language: String,
    #[serde(default)]
    confidence: f64,
}

/// Google Cloud Translation v2 `detect` endpoint
pub struct GoogleTranslateDetector {
    client: reqwest::Client,
    endpoint: String,
    api_key: SecretString,
}

impl GoogleTranslateDetector {
    pub fn new(client: reqwest::Client, endpoint: impl Into<String>, api_key: SecretString) -> Self {
        Self {
            client,
            endpoint: endpoint.into(),
            api_key,
        }
    }
}

#[async_trait]
impl LanguageDetector for GoogleTranslateDetector {
    /// The key travels in the query string, so reqwest errors are stripped of
    /// their URL before they are reported.
    async fn detect(&self, text: &str) -> Result<Detection, DetectError> {
        let response = self
            .client
            .post(&self.endpoint)
            .query(&[("key", self.api_key.expose_secret()), ("q", text)])
            .send()
            .await
            .map_err(|e| DetectError::Network(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(DetectError::Rejected(status.as_u16()));
        }

        let payload: DetectResponse = response
            .json()
            .await
            .map_err(|e| DetectError::Malformed(e.without_url().to_string()))?;

        let entry = payload
            .data
            .detections
            .into_iter()
            .next()
            .and_then(|group| group.into_iter().next())
            .ok_or_else(|| DetectError::Malformed("no detections returned".to_string()))?;

        debug!(
            language = %entry.language,
            confidence = entry.confidence,
            "Detected comment language"
        );

        Ok(Detection::new(entry.language, entry.confidence))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_is_english_threshold() {
        assert!(Detection::new("en", 0.0).is_english(0.0));
        assert!(Detection::new("EN", 0.9).is_english(0.5));
        assert!(!Detection::new("en", 0.4).is_english(0.5));
        assert!(!Detection::new("de", 1.0).is_english(0.0));
    }

    #[test]
    fn test_response_shape() {
        let payload: DetectResponse = serde_json::from_str(
            r#"{"data":{"detections":[[{"language":"en","isReliable":false,"confidence":0.98}]]}}"#,
        )
        .unwrap();
        assert_eq!(payload.data.detections[0][0].language, "en");
        assert_eq!(payload.data.detections[0][0].confidence, 0.98);
    }
}
