//! Random track and comment retrieval

use std::sync::Arc;

use async_trait::async_trait;
use rand::Rng;
use reqwest::StatusCode;
use serde::Deserialize;
use tracing::debug;

use crate::error::SourceError;
use crate::token::AccessTokenSource;

/// One comment fetched for a selection attempt
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Candidate {
    pub id: u64,
    pub raw_text: String,
    pub source_url: String,
}

/// Comments of one resource, in upstream order
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CandidateBatch {
    pub resource_id: u64,
    pub permalink_url: String,
    pub candidates: Vec<Candidate>,
}

#[async_trait]
pub trait CandidateSource: Send + Sync {
    /// Pick a resource and return its comments
    async fn fetch_candidates(&self) -> Result<CandidateBatch, SourceError>;
}

#[derive(Debug, Deserialize)]
struct TrackResponse {
    #[serde(default)]
    id: Option<u64>,
    #[serde(default)]
    code: Option<u16>,
    #[serde(default)]
    permalink_url: Option<String>,
    #[serde(default)]
    comment_count: Option<u64>,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum CommentsResponse {
    Bare(Vec<CommentEntry>),
    Paged { collection: Vec<CommentEntry> },
}

impl CommentsResponse {
    fn into_entries(self) -> Vec<CommentEntry> {
        match self {
            CommentsResponse::Bare(entries) => entries,
            CommentsResponse::Paged { collection } => collection,
        }
    }
}

#[derive(Debug, Deserialize)]
struct CommentEntry {
    #[serde(default)]
    id: Option<u64>,
    #[serde(default)]
    body: Option<String>,
}

/// SoundCloud track comments, addressed by a uniformly drawn track ID
pub struct SoundCloudSource {
    client: reqwest::Client,
    api_base: String,
    max_track_id: u64,
    tokens: Arc<dyn AccessTokenSource>,
}

impl SoundCloudSource {
    pub fn new(
        client: reqwest::Client,
        api_base: impl Into<String>,
        max_track_id: u64,
        tokens: Arc<dyn AccessTokenSource>,
    ) -> Self {
        Self {
            client,
            api_base: api_base.into().trim_end_matches('/').to_string(),
            max_track_id,
            tokens,
        }
    }

    fn draw_track_id(&self) -> u64 {
        rand::thread_rng().gen_range(0..=self.max_track_id)
    }

    /// Fetch the comments of a specific track
    pub async fn fetch_track(&self, id: u64) -> Result<CandidateBatch, SourceError> {
        let token = self.tokens.access_token().await?;
        let authorization = format!("OAuth {}", token);

        let track_url = format!("{}/tracks/{}", self.api_base, id);
        debug!(track_id = id, "Fetching track");

        let response = self
            .client
            .get(&track_url)
            .header(reqwest::header::AUTHORIZATION, &authorization)
            .header(reqwest::header::ACCEPT, "application/json; charset=utf-8")
            .send()
            .await
            .map_err(|e| SourceError::Network(e.to_string()))?;

        check_status(response.status(), id)?;

        let track: TrackResponse = response
            .json()
            .await
            .map_err(|e| SourceError::Malformed(e.to_string()))?;

        match track.code {
            Some(401) | Some(403) => return Err(SourceError::Unauthorized(id)),
            Some(404) => return Err(SourceError::NotFound(id)),
            Some(other) => {
                return Err(SourceError::Malformed(format!(
                    "track {} answered with code {}",
                    id, other
                )))
            }
            None => {}
        }

        let resource_id = track.id.unwrap_or(id);
        let permalink_url = track
            .permalink_url
            .ok_or_else(|| SourceError::Malformed(format!("track {} has no permalink_url", id)))?;

        if track.comment_count.unwrap_or(0) == 0 {
            return Err(SourceError::NoComments(id));
        }

        let response = self
            .client
            .get(format!("{}/comments", track_url))
            .header(reqwest::header::AUTHORIZATION, &authorization)
            .header(reqwest::header::ACCEPT, "application/json; charset=utf-8")
            .send()
            .await
            .map_err(|e| SourceError::Network(e.to_string()))?;

        check_status(response.status(), id)?;

        let comments: CommentsResponse = response
            .json()
            .await
            .map_err(|e| SourceError::Malformed(e.to_string()))?;

        let candidates: Vec<Candidate> = comments
            .into_entries()
            .into_iter()
            .enumerate()
            .map(|(index, entry)| Candidate {
                id: entry.id.unwrap_or(index as u64),
                raw_text: entry.body.unwrap_or_default(),
                source_url: permalink_url.clone(),
            })
            .collect();

        if candidates.is_empty() {
            return Err(SourceError::NoComments(id));
        }

        debug!(
            track_id = id,
            comments = candidates.len(),
            "Fetched track comments"
        );

        Ok(CandidateBatch {
            resource_id,
            permalink_url,
            candidates,
        })
    }
}

#[async_trait]
impl CandidateSource for SoundCloudSource {
    async fn fetch_candidates(&self) -> Result<CandidateBatch, SourceError> {
        let id = self.draw_track_id();
        self.fetch_track(id).await
    }
}

fn check_status(status: StatusCode, id: u64) -> Result<(), SourceError> {
    match status {
        s if s.is_success() => Ok(()),
        StatusCode::NOT_FOUND => Err(SourceError::NotFound(id)),
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => Err(SourceError::Unauthorized(id)),
        other => Err(SourceError::Network(format!(
            "track {} answered with status {}",
            id,
            other.as_u16()
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_comments_bare_array() {
        let parsed: CommentsResponse =
            serde_json::from_str(r#"[{"id": 1, "body": "nice"}, {"body": "cool"}]"#).unwrap();
        let entries = parsed.into_entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[1].body.as_deref(), Some("cool"));
        assert_eq!(entries[1].id, None);
    }

    #[test]
    fn test_comments_collection() {
        let parsed: CommentsResponse =
            serde_json::from_str(r#"{"collection": [{"id": 9, "body": "wow"}], "next_href": null}"#)
                .unwrap();
        let entries = parsed.into_entries();
        assert_eq!(entries.len(), 1);
        assert_eq!(entries[0].id, Some(9));
    }

    #[test]
    fn test_check_status_mapping() {
        assert!(check_status(StatusCode::OK, 1).is_ok());
        assert!(matches!(
            check_status(StatusCode::NOT_FOUND, 1),
            Err(SourceError::NotFound(1))
        ));
        assert!(matches!(
            check_status(StatusCode::UNAUTHORIZED, 2),
            Err(SourceError::Unauthorized(2))
        ));
        assert!(matches!(
            check_status(StatusCode::BAD_GATEWAY, 3),
            Err(SourceError::Network(_))
        ));
    }

    #[test]
    fn test_track_with_error_code() {
        let track: TrackResponse = serde_json::from_str(r#"{"code": 404}"#).unwrap();
        assert_eq!(track.code, Some(404));
        assert!(track.permalink_url.is_none());
    }
}
