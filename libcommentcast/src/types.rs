//! Values passed between selection, publishing and reporting

use serde::{Deserialize, Serialize};

/// A comment that passed every filter
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectedComment {
    pub text: String,
    pub source_url: String,
    /// Number of candidate fetches it took to find this comment
    pub attempts: u32,
}

/// Where a published comment ended up
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PostReference {
    pub platform: String,
    pub id: String,
    /// User-facing permalink, when the network provides one
    pub url: Option<String>,
}

/// Outcome of publishing to one network
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PostResult {
    pub platform: String,
    pub success: bool,
    pub reference: Option<PostReference>,
    pub error: Option<String>,
}

impl PostResult {
    pub fn succeeded(reference: PostReference) -> Self {
        Self {
            platform: reference.platform.clone(),
            success: true,
            reference: Some(reference),
            error: None,
        }
    }

    pub fn failed(platform: impl Into<String>, error: impl Into<String>) -> Self {
        Self {
            platform: platform.into(),
            success: false,
            reference: None,
            error: Some(error.into()),
        }
    }
}

/// Everything a single run did
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunReport {
    pub comment: String,
    pub attempts: u32,
    pub source_url: String,
    pub results: Vec<PostResult>,
}

impl RunReport {
    pub fn new(selected: SelectedComment, results: Vec<PostResult>) -> Self {
        Self {
            comment: selected.text,
            attempts: selected.attempts,
            source_url: selected.source_url,
            results,
        }
    }

    /// True when nothing was requested or at least one network accepted the post
    pub fn any_published(&self) -> bool {
        self.results.is_empty() || self.results.iter().any(|r| r.success)
    }

    pub fn failures(&self) -> impl Iterator<Item = &PostResult> {
        self.results.iter().filter(|r| !r.success)
    }
}
