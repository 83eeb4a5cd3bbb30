//! Comment acceptance predicates
//!
//! Checks run in a fixed order and stop at the first failure:
//!
//! 1. trimmed text is empty: [`FilterVerdict::TooShort`]
//! 2. trimmed text is longer than `max_length` characters: [`FilterVerdict::TooLong`]
//! 3. a denylist pattern matches: [`FilterVerdict::Blacklisted`]
//! 4. the detector does not report English: [`FilterVerdict::NotEnglish`]
//!
//! The detector is only consulted for text that passed the local checks.

use std::fmt;
use std::sync::Arc;

use tracing::{debug, warn};

use crate::config::FilterConfig;
use crate::error::Result;
use crate::source::Candidate;

pub mod denylist;
pub mod language;

pub use denylist::{DenyPattern, Denylist};
pub use language::{Detection, GoogleTranslateDetector, LanguageDetector};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterVerdict {
    Accepted,
    TooShort,
    TooLong,
    Blacklisted,
    NotEnglish,
    /// The language backend could not answer; the comment is skipped
    SourceUnavailable,
}

impl FilterVerdict {
    pub fn is_accepted(self) -> bool {
        self == FilterVerdict::Accepted
    }
}

impl fmt::Display for FilterVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            FilterVerdict::Accepted => "accepted",
            FilterVerdict::TooShort => "too_short",
            FilterVerdict::TooLong => "too_long",
            FilterVerdict::Blacklisted => "blacklisted",
            FilterVerdict::NotEnglish => "not_english",
            FilterVerdict::SourceUnavailable => "source_unavailable",
        };
        f.write_str(label)
    }
}

pub struct CommentFilter {
    max_length: usize,
    min_confidence: f64,
    denylist: Denylist,
    detector: Arc<dyn LanguageDetector>,
}

impl CommentFilter {
    pub fn new(
        max_length: usize,
        min_confidence: f64,
        denylist: Denylist,
        detector: Arc<dyn LanguageDetector>,
    ) -> Self {
        Self {
            max_length,
            min_confidence,
            denylist,
            detector,
        }
    }

    pub fn from_config(config: &FilterConfig, detector: Arc<dyn LanguageDetector>) -> Result<Self> {
        let denylist = Denylist::from_config(config)?;
        debug!(patterns = denylist.len(), "Loaded denylist");
        Ok(Self::new(
            config.max_length,
            config.min_confidence,
            denylist,
            detector,
        ))
    }

    /// Checks that need no network access
    pub fn classify_local(&self, text: &str) -> Option<FilterVerdict> {
        let trimmed = text.trim();
        let length = trimmed.chars().count();

        if length < 1 {
            return Some(FilterVerdict::TooShort);
        }
        if length > self.max_length {
            return Some(FilterVerdict::TooLong);
        }
        if let Some(pattern) = self.denylist.find(trimmed) {
            debug!(pattern = %pattern.pattern.escape_debug(), "Denylist match");
            return Some(FilterVerdict::Blacklisted);
        }
        None
    }

    pub async fn classify(&self, text: &str) -> FilterVerdict {
        if let Some(verdict) = self.classify_local(text) {
            return verdict;
        }

        match self.detector.detect(text.trim()).await {
            Ok(detection) if detection.is_english(self.min_confidence) => FilterVerdict::Accepted,
            Ok(detection) => {
                debug!(
                    language = %detection.language,
                    confidence = detection.confidence,
                    "Rejected non-English comment"
                );
                FilterVerdict::NotEnglish
            }
            Err(e) => {
                warn!("Language detection unavailable: {}", e);
                FilterVerdict::SourceUnavailable
            }
        }
    }

    /// Trimmed texts of the accepted candidates, in input order
    pub async fn accepted(&self, candidates: &[Candidate]) -> Vec<String> {
        let mut accepted = Vec::new();
        for candidate in candidates {
            let verdict = self.classify(&candidate.raw_text).await;
            debug!(comment_id = candidate.id, %verdict, "Classified comment");
            if verdict.is_accepted() {
                accepted.push(candidate.raw_text.trim().to_string());
            }
        }
        accepted
    }
}
